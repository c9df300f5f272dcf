use crate::EMPTY_HASH;
use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use sha2::{Digest as _, Sha256};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// A 32-byte content digest (the final value of a running hash fold).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}
impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.to_hex())
    }
}
impl Debug for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Digest({})", self.to_hex())
    }
}
impl FromStr for Digest {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).or_raise(|| ErrorKind::InvalidDigest(s.to_string()))?;
        Ok(Self(out))
    }
}

/// Incremental running-hash fold.
///
/// Restartable: a fold interrupted after chunk `i` can be continued later from
/// the checkpoint returned by [`current()`](Self::current) with
/// [`resume()`](Self::resume), given the remaining chunks `[i + 1..]`.
#[derive(Clone, Debug)]
pub struct RunningHash {
    running: [u8; 32],
    folded: u64,
}
impl Default for RunningHash {
    fn default() -> Self {
        Self::new()
    }
}
impl RunningHash {
    #[must_use]
    pub fn new() -> Self {
        Self { running: EMPTY_HASH, folded: 0 }
    }

    /// Continue a fold from a previously computed checkpoint.
    #[must_use]
    pub fn resume(checkpoint: Digest) -> Self {
        Self { running: checkpoint.0, folded: 0 }
    }

    /// Fold the next chunk into the running value.
    pub fn update(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
        let mut hasher = Sha256::new();
        hasher.update(self.running);
        hasher.update(chunk.as_ref());
        self.running = hasher.finalize().into();
        self.folded += 1;
        self
    }

    /// The running value after every chunk folded so far.
    #[must_use]
    pub fn current(&self) -> Digest {
        Digest(self.running)
    }

    /// Number of chunks folded by this instance (not counting any checkpoint
    /// it was resumed from).
    #[must_use]
    pub fn folded(&self) -> u64 {
        self.folded
    }

    #[must_use]
    pub fn finish(self) -> Digest {
        Digest(self.running)
    }
}

/// Digest of an ordered sequence of chunks.
pub fn digest<I>(chunks: I) -> Digest
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut running = RunningHash::new();
    for chunk in chunks {
        running.update(chunk);
    }
    running.finish()
}

/// Digest of a byte buffer split into protocol-sized chunks.
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> Digest {
    digest(crate::split(bytes, crate::CHUNK_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CHUNK_SIZE, split};

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i * 3) % 256) as u8).collect()
    }

    // Reference implementation: hash the concatenation in one go per step.
    fn reference(chunks: &[&[u8]]) -> [u8; 32] {
        let mut running = [0u8; 32];
        for chunk in chunks {
            let mut combined = running.to_vec();
            combined.extend_from_slice(chunk);
            running = Sha256::digest(&combined).into();
        }
        running
    }

    #[test]
    fn matches_reference_fold() {
        let data = sample(CHUNK_SIZE + 3);
        let chunks = split(&data, CHUNK_SIZE);
        assert_eq!(digest(&chunks).as_bytes(), &reference(&chunks));
    }

    #[test]
    fn single_chunk_fold() {
        let data = sample(CHUNK_SIZE);
        let expected: [u8; 32] = {
            let mut hasher = Sha256::new();
            hasher.update([0u8; 32]);
            hasher.update(&data);
            hasher.finalize().into()
        };
        assert_eq!(digest_bytes(&data), Digest::new(expected));
    }

    #[test]
    fn deterministic() {
        let data = sample(CHUNK_SIZE * 4 + 77);
        assert_eq!(digest_bytes(&data), digest_bytes(&data.clone()));
    }

    #[test]
    fn resume_from_checkpoint() {
        let data = sample(CHUNK_SIZE * 5 + 1);
        let chunks = split(&data, CHUNK_SIZE);
        let checkpoint = digest(&chunks[..2]);
        let mut resumed = RunningHash::resume(checkpoint);
        for chunk in &chunks[2..] {
            resumed.update(chunk);
        }
        assert_eq!(resumed.folded(), 4);
        assert_eq!(resumed.finish(), digest(&chunks));
    }

    #[test]
    fn sensitive_to_single_bit_flip() {
        let data = sample(CHUNK_SIZE * 3);
        let original = digest_bytes(&data);
        for position in [0, CHUNK_SIZE - 1, CHUNK_SIZE, data.len() - 1] {
            let mut flipped = data.clone();
            flipped[position] ^= 0x01;
            assert_ne!(digest_bytes(&flipped), original, "flip at {position} went unnoticed");
        }
    }

    #[test]
    fn sensitive_to_reordering_and_truncation() {
        let data = sample(CHUNK_SIZE * 3);
        let chunks = split(&data, CHUNK_SIZE);
        let original = digest(&chunks);
        let swapped = [chunks[1], chunks[0], chunks[2]];
        assert_ne!(digest(swapped), original);
        assert_ne!(digest(&chunks[..2]), original);
        assert_ne!(digest_bytes(&data[..data.len() - 1]), original);
    }

    #[test]
    fn hex_round_trip() {
        let value = digest_bytes(b"hello");
        let parsed: Digest = value.to_string().parse().unwrap();
        assert_eq!(parsed, value);
        let prefixed: Digest = format!("0x{value}").parse().unwrap();
        assert_eq!(prefixed, value);
    }

    #[test]
    fn invalid_hex_is_rejected() {
        let err = "not-a-digest".parse::<Digest>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidDigest(_)));
        assert!("abcd".parse::<Digest>().is_err());
    }
}
