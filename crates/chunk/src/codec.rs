use crate::{CHUNK_SIZE, MAX_BATCH_SIZE};

/// Split `bytes` into consecutive chunks of `chunk_size` bytes.
///
/// The final chunk may be shorter; nothing is padded. Empty input produces no
/// chunks at all. A `chunk_size` of zero is treated as one rather than
/// panicking.
#[must_use]
pub fn split(bytes: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    bytes.chunks(chunk_size.max(1)).collect()
}

/// Group consecutive chunks for batched transmission.
///
/// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
#[must_use]
pub fn batch<T>(chunks: &[T], batch_size: usize) -> Vec<&[T]> {
    chunks.chunks(batch_size.clamp(1, MAX_BATCH_SIZE)).collect()
}

/// Number of chunks required to hold `total_size` bytes at `chunk_size` bytes each.
#[must_use]
pub fn total_chunks(total_size: u64, chunk_size: usize) -> u64 {
    if total_size == 0 {
        return 0;
    }
    total_size.div_ceil(chunk_size.max(1) as u64)
}

/// Number of chunks to expect for an object of `total_size` bytes, given the
/// size of the first chunk actually observed from the store.
///
/// The protocol only records the total byte size of an object, so readers
/// learn the chunk size empirically. An observed size of zero falls back to
/// [`CHUNK_SIZE`].
#[must_use]
pub fn expected_chunk_count(total_size: u64, observed_chunk_size: usize) -> u64 {
    let chunk_size = match observed_chunk_size {
        0 => CHUNK_SIZE,
        n => n,
    };
    total_chunks(total_size, chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn split_with_remainder() {
        let data: Vec<u8> = (0..CHUNK_SIZE * 2 + 10).map(|i| (i % 256) as u8).collect();
        let chunks = split(&data, CHUNK_SIZE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), CHUNK_SIZE);
        assert_eq!(chunks[1].len(), CHUNK_SIZE);
        assert_eq!(chunks[2].len(), 10);
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn split_empty() {
        assert!(split(&[], CHUNK_SIZE).is_empty());
    }

    #[test]
    fn split_zero_chunk_size_does_not_panic() {
        assert_eq!(split(b"abc", 0).len(), 3);
    }

    #[test]
    fn batch_into_groups_of_max() {
        let chunks: Vec<Vec<u8>> = (0..120u8).map(|i| vec![i]).collect();
        let batches = batch(&chunks, MAX_BATCH_SIZE);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), MAX_BATCH_SIZE);
        assert_eq!(batches[1].len(), MAX_BATCH_SIZE);
        assert_eq!(batches[2].len(), 20);
    }

    #[test]
    fn batch_size_is_clamped() {
        let chunks: Vec<u8> = (0..120u8).collect();
        assert_eq!(batch(&chunks, 500).len(), 3);
        assert_eq!(batch(&chunks, 0).len(), 120);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(16_384, 1)]
    #[case(16_385, 2)]
    #[case(16_384 * 3, 3)]
    fn test_total_chunks(#[case] size: u64, #[case] expected: u64) {
        assert_eq!(total_chunks(size, CHUNK_SIZE), expected);
    }

    #[rstest]
    #[case(100, 0, 1)]
    #[case(100, 10, 10)]
    #[case(101, 10, 11)]
    #[case(0, 10, 0)]
    fn test_expected_chunk_count(#[case] size: u64, #[case] observed: usize, #[case] expected: u64) {
        assert_eq!(expected_chunk_count(size, observed), expected);
    }
}
