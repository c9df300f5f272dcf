//! In-memory chunk store for testing.

use crate::error::{ContractError, ErrorKind, Result};
use crate::models::{Address, BeginUpload, ObjectId, Receipt, SealMetadata, UploadState};
use crate::store::ChunkStore;
use async_trait::async_trait;
use inscribe_chunk::{CHUNK_SIZE, Digest, MAX_BATCH_SIZE, RunningHash, split};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

struct PendingUpload {
    state: UploadState,
    chunks: Vec<Vec<u8>>,
    abandoned: bool,
}

#[derive(Default)]
struct Faults {
    /// Index -> number of single-chunk reads that should still fail.
    failing_reads: HashMap<u64, u32>,
    /// Batches larger than this fail as too expensive.
    batch_cost_ceiling: Option<usize>,
    /// Report cost failures only as an unstructured message.
    cost_as_message: bool,
    /// Number of upcoming batch reads that fail with a network error.
    failing_batches: u32,
    /// Indices that come back empty from the next batch read containing them.
    empty_batch_slots: HashSet<u64>,
    /// Bytes of zero padding appended to the final chunk of every object.
    final_chunk_padding: usize,
    /// Number of upcoming chunk submissions that fail with a network error.
    failing_submits: u32,
}

#[derive(Default)]
struct Counters {
    chunk_reads: usize,
    batch_requests: Vec<usize>,
    delivered: BTreeMap<u64, usize>,
    submitted_batches: usize,
    submitted_chunks: usize,
    transactions: u64,
}

#[derive(Default)]
struct Chain {
    block: u64,
    next_object: u64,
    objects: HashMap<ObjectId, Vec<Vec<u8>>>,
    sealed: HashMap<Digest, ObjectId>,
    uploads: HashMap<(Digest, Address), PendingUpload>,
    faults: Faults,
    counters: Counters,
}
impl Chain {
    fn receipt(&mut self) -> Receipt {
        self.counters.transactions += 1;
        Receipt { tx_id: format!("0x{:064x}", self.counters.transactions) }
    }

    fn chunk(&self, object: ObjectId, index: u64) -> Option<Vec<u8>> {
        let chunks = self.objects.get(&object)?;
        let mut chunk = chunks.get(usize::try_from(index).ok()?)?.clone();
        if index + 1 == chunks.len() as u64 {
            chunk.resize(chunk.len() + self.faults.final_chunk_padding, 0);
        }
        Some(chunk)
    }

    fn is_expired(&self, upload: &PendingUpload) -> bool {
        upload.abandoned || upload.state.is_expired_at(self.block)
    }
}

fn contract(err: ContractError) -> crate::error::Error {
    exn::Exn::from(ErrorKind::Contract(err))
}

/// In-memory simulation of the remote contract, for testing.
///
/// All state lives behind a single [`RwLock`], so the trait methods operate
/// on `&self` and the store can be shared between concurrent readers. The
/// simulation enforces the same rules the real contract does: running-hash
/// verification at seal time, per-owner upload slots, expiry measured in
/// blocks (advanced manually with [`advance_blocks()`](Self::advance_blocks))
/// and purge ordering.
///
/// Faults can be injected with the `fail_*`/`with_*` builders, and every read
/// and submission is counted for assertions.
///
/// # Examples
///
/// ```
/// use inscribe_store::{ChunkStore, MockStore, ObjectId};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockStore::default().with_object(ObjectId(1), vec![7u8; 20_000]);
/// let caller = store.sender().clone();
/// let first = store.get_chunk(ObjectId(1), 0, &caller).await?;
/// assert_eq!(first.map(|chunk| chunk.len()), Some(16_384));
/// # Ok(())
/// # }
/// ```
pub struct MockStore {
    name: String,
    sender: Address,
    batch_reads: bool,
    chain: RwLock<Chain>,
}

impl MockStore {
    /// Change the name of the mock store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sign state-changing calls as a different address.
    pub fn connected_as(mut self, sender: impl Into<Address>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Advertise (or hide) batched chunk reads.
    pub fn with_batch_reads(mut self, enabled: bool) -> Self {
        self.batch_reads = enabled;
        self
    }

    /// Add a sealed object, split into [`CHUNK_SIZE`] chunks.
    pub fn with_object(self, object: ObjectId, bytes: impl AsRef<[u8]>) -> Self {
        let chunks = split(bytes.as_ref(), CHUNK_SIZE).into_iter().map(<[u8]>::to_vec).collect();
        self.with_chunks(object, chunks)
    }

    /// Add a sealed object with explicit chunk boundaries.
    pub fn with_chunks(mut self, object: ObjectId, chunks: Vec<Vec<u8>>) -> Self {
        let chain = self.chain.get_mut();
        chain.next_object = chain.next_object.max(object.0 + 1);
        chain.objects.insert(object, chunks);
        self
    }

    /// Fail the next `times` single-chunk reads of `index`.
    pub fn fail_chunk_reads(mut self, index: u64, times: u32) -> Self {
        self.chain.get_mut().faults.failing_reads.insert(index, times);
        self
    }

    /// Fail every batch read of more than `ceiling` chunks as too expensive.
    pub fn with_batch_cost_ceiling(mut self, ceiling: usize) -> Self {
        self.chain.get_mut().faults.batch_cost_ceiling = Some(ceiling);
        self
    }

    /// Report cost failures as an unstructured rejection message instead of
    /// [`ErrorKind::CostExceeded`].
    pub fn with_unstructured_cost_errors(mut self) -> Self {
        self.chain.get_mut().faults.cost_as_message = true;
        self
    }

    /// Fail the next `times` batch reads with a network error.
    pub fn fail_batches(mut self, times: u32) -> Self {
        self.chain.get_mut().faults.failing_batches = times;
        self
    }

    /// Leave `indices` empty the first time a batch read includes them.
    pub fn with_empty_batch_slots(mut self, indices: impl IntoIterator<Item = u64>) -> Self {
        self.chain.get_mut().faults.empty_batch_slots.extend(indices);
        self
    }

    /// Pad the final chunk of every object with `bytes` zero bytes on read.
    pub fn with_final_chunk_padding(mut self, bytes: usize) -> Self {
        self.chain.get_mut().faults.final_chunk_padding = bytes;
        self
    }

    /// Fail the next `times` chunk submissions with a network error.
    pub fn fail_submits(mut self, times: u32) -> Self {
        self.chain.get_mut().faults.failing_submits = times;
        self
    }

    /// Mine `blocks` empty blocks.
    pub async fn advance_blocks(&self, blocks: u64) {
        self.chain.write().await.block += blocks;
    }

    /// Number of single-chunk reads issued (including failed ones).
    pub async fn chunk_reads(&self) -> usize {
        self.chain.read().await.counters.chunk_reads
    }

    /// Size of every batch read requested, in call order.
    pub async fn batch_requests(&self) -> Vec<usize> {
        self.chain.read().await.counters.batch_requests.clone()
    }

    /// How many times each chunk index was successfully returned.
    pub async fn delivered(&self) -> BTreeMap<u64, usize> {
        self.chain.read().await.counters.delivered.clone()
    }

    /// Number of accepted chunk submissions.
    pub async fn submitted_batches(&self) -> usize {
        self.chain.read().await.counters.submitted_batches
    }

    /// Number of chunks across all accepted submissions.
    pub async fn submitted_chunks(&self) -> usize {
        self.chain.read().await.counters.submitted_chunks
    }

    /// Chunks of a sealed object, as stored.
    pub async fn object(&self, object: ObjectId) -> Option<Vec<Vec<u8>>> {
        self.chain.read().await.objects.get(&object).cloned()
    }

    /// Chunks already accepted for an in-progress upload.
    pub async fn pending_chunks(&self, digest: &Digest, owner: &Address) -> Option<Vec<Vec<u8>>> {
        let chain = self.chain.read().await;
        chain.uploads.get(&(*digest, owner.clone())).map(|upload| upload.chunks.clone())
    }
}
impl Default for MockStore {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            sender: Address::new("SP000000000000000000002Q6VF78"),
            batch_reads: true,
            chain: RwLock::new(Chain::default()),
        }
    }
}

#[async_trait]
impl ChunkStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn sender(&self) -> &Address {
        &self.sender
    }

    fn supports_chunk_batch_read(&self) -> bool {
        self.batch_reads
    }

    async fn block_height(&self) -> Result<u64> {
        Ok(self.chain.read().await.block)
    }

    async fn get_chunk(&self, object: ObjectId, index: u64, _caller: &Address) -> Result<Option<Vec<u8>>> {
        let mut chain = self.chain.write().await;
        chain.counters.chunk_reads += 1;
        if let Some(remaining) = chain.faults.failing_reads.get_mut(&index)
            && *remaining > 0
        {
            *remaining -= 1;
            tracing::debug!(store = %self.name, %object, index, remaining = *remaining, "Injecting chunk read failure");
            exn::bail!(ErrorKind::Network(format!("injected read failure for chunk {index}")));
        }
        let chunk = chain.chunk(object, index);
        if chunk.is_some() {
            *chain.counters.delivered.entry(index).or_default() += 1;
        }
        Ok(chunk)
    }

    async fn get_chunk_batch(
        &self,
        object: ObjectId,
        indices: &[u64],
        _caller: &Address,
    ) -> Result<Vec<Option<Vec<u8>>>> {
        if !self.batch_reads {
            exn::bail!(ErrorKind::Unsupported("get_chunk_batch"));
        }
        if indices.len() > MAX_BATCH_SIZE {
            exn::bail!(ErrorKind::InvalidRequest(format!(
                "batch of {} exceeds the maximum of {MAX_BATCH_SIZE}",
                indices.len()
            )));
        }
        let mut chain = self.chain.write().await;
        chain.counters.batch_requests.push(indices.len());
        if let Some(ceiling) = chain.faults.batch_cost_ceiling
            && indices.len() > ceiling
        {
            tracing::debug!(store = %self.name, %object, batch = indices.len(), ceiling, "Rejecting batch over cost ceiling");
            if chain.faults.cost_as_message {
                exn::bail!(ErrorKind::Rejected("Runtime(CostBalanceExceeded(read_length))".to_string()));
            }
            exn::bail!(ErrorKind::CostExceeded);
        }
        if chain.faults.failing_batches > 0 {
            chain.faults.failing_batches -= 1;
            tracing::debug!(store = %self.name, %object, batch = indices.len(), "Injecting batch read failure");
            exn::bail!(ErrorKind::Network("injected batch failure".to_string()));
        }
        if !chain.objects.contains_key(&object) {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(indices.len());
        for &index in indices {
            if chain.faults.empty_batch_slots.remove(&index) {
                tracing::debug!(store = %self.name, %object, index, "Leaving batch slot empty");
                out.push(None);
                continue;
            }
            let chunk = chain.chunk(object, index);
            if chunk.is_some() {
                *chain.counters.delivered.entry(index).or_default() += 1;
            }
            out.push(chunk);
        }
        Ok(out)
    }

    async fn get_upload_state(&self, digest: &Digest, owner: &Address, _caller: &Address) -> Result<Option<UploadState>> {
        let chain = self.chain.read().await;
        Ok(chain.uploads.get(&(*digest, owner.clone())).map(|upload| upload.state.clone()))
    }

    async fn begin_upload(&self, digest: &Digest, upload: &BeginUpload) -> Result<Receipt> {
        let mut chain = self.chain.write().await;
        let key = (*digest, self.sender.clone());
        if chain.sealed.contains_key(digest) || chain.uploads.contains_key(&key) {
            return Err(contract(ContractError::Duplicate));
        }
        if upload.total_chunks == 0 || upload.mime_type.is_empty() {
            return Err(contract(ContractError::InvalidBatch));
        }
        let state = UploadState {
            mime_type: upload.mime_type.clone(),
            total_size: upload.total_size,
            total_chunks: upload.total_chunks,
            current_index: 0,
            running_hash: Digest::default(),
            purge_index: 0,
            last_touched: chain.block,
        };
        chain.uploads.insert(key, PendingUpload { state, chunks: Vec::new(), abandoned: false });
        Ok(chain.receipt())
    }

    async fn submit_chunk_batch(&self, digest: &Digest, chunks: &[Vec<u8>]) -> Result<Receipt> {
        let mut chain = self.chain.write().await;
        if chain.faults.failing_submits > 0 {
            chain.faults.failing_submits -= 1;
            tracing::debug!(store = %self.name, %digest, chunks = chunks.len(), "Injecting submit failure");
            exn::bail!(ErrorKind::Network("injected submit failure".to_string()));
        }
        let block = chain.block;
        let key = (*digest, self.sender.clone());
        let expired = match chain.uploads.get(&key) {
            Some(upload) => chain.is_expired(upload),
            None => return Err(contract(ContractError::NotFound)),
        };
        if expired {
            return Err(contract(ContractError::UploadExpired));
        }
        let Some(upload) = chain.uploads.get_mut(&key) else {
            return Err(contract(ContractError::NotFound));
        };
        let fits = upload.state.current_index + chunks.len() as u64 <= upload.state.total_chunks;
        if chunks.is_empty() || chunks.len() > MAX_BATCH_SIZE || !fits || chunks.iter().any(|c| c.len() > CHUNK_SIZE) {
            return Err(contract(ContractError::InvalidBatch));
        }
        let mut running = RunningHash::resume(upload.state.running_hash);
        for chunk in chunks {
            running.update(chunk);
            upload.chunks.push(chunk.clone());
        }
        upload.state.running_hash = running.finish();
        upload.state.current_index += chunks.len() as u64;
        upload.state.last_touched = block;
        chain.counters.submitted_batches += 1;
        chain.counters.submitted_chunks += chunks.len();
        Ok(chain.receipt())
    }

    async fn seal_upload(&self, digest: &Digest, metadata: &SealMetadata) -> Result<ObjectId> {
        let mut chain = self.chain.write().await;
        let key = (*digest, self.sender.clone());
        let Some(upload) = chain.uploads.get(&key) else {
            return Err(contract(ContractError::NotFound));
        };
        if metadata.token_uri.trim().is_empty() {
            return Err(contract(ContractError::InvalidUri));
        }
        if metadata.dependencies.iter().any(|dep| !chain.objects.contains_key(dep)) {
            return Err(contract(ContractError::DependencyMissing));
        }
        if !upload.state.is_complete() {
            return Err(contract(ContractError::InvalidBatch));
        }
        if upload.state.running_hash != *digest {
            return Err(contract(ContractError::HashMismatch));
        }
        let Some(upload) = chain.uploads.remove(&key) else {
            return Err(contract(ContractError::NotFound));
        };
        let object = ObjectId(chain.next_object);
        chain.next_object += 1;
        chain.objects.insert(object, upload.chunks);
        chain.sealed.insert(*digest, object);
        chain.receipt();
        Ok(object)
    }

    async fn abandon_upload(&self, digest: &Digest) -> Result<Receipt> {
        let mut chain = self.chain.write().await;
        let Some(upload) = chain.uploads.get_mut(&(*digest, self.sender.clone())) else {
            return Err(contract(ContractError::NotFound));
        };
        upload.abandoned = true;
        Ok(chain.receipt())
    }

    async fn purge_expired(&self, digest: &Digest, owner: &Address, indices: &[u64]) -> Result<Receipt> {
        let mut chain = self.chain.write().await;
        let key = (*digest, owner.clone());
        let expired = match chain.uploads.get(&key) {
            Some(upload) => chain.is_expired(upload),
            None => return Err(contract(ContractError::NotFound)),
        };
        if !expired {
            return Err(contract(ContractError::NotExpired));
        }
        let Some(upload) = chain.uploads.get_mut(&key) else {
            return Err(contract(ContractError::NotFound));
        };
        let start = upload.state.purge_index;
        let consecutive = indices.iter().zip(start..).all(|(index, expected)| *index == expected);
        let end = start + indices.len() as u64;
        if indices.is_empty() || indices.len() > MAX_BATCH_SIZE || !consecutive || end > upload.state.total_chunks {
            return Err(contract(ContractError::InvalidBatch));
        }
        upload.state.purge_index = end;
        if end >= upload.state.total_chunks {
            chain.uploads.remove(&key);
        }
        Ok(chain.receipt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UPLOAD_EXPIRY_BLOCKS;
    use inscribe_chunk::digest;

    const OTHER: &str = "SP3OTHER000000000000000000000";

    fn plan(chunks: &[Vec<u8>]) -> (Digest, BeginUpload) {
        let upload = BeginUpload {
            mime_type: "text/plain".to_string(),
            total_size: chunks.iter().map(|c| c.len() as u64).sum(),
            total_chunks: chunks.len() as u64,
        };
        (digest(chunks), upload)
    }

    fn metadata() -> SealMetadata {
        SealMetadata { token_uri: "data:,x".to_string(), dependencies: Vec::new() }
    }

    #[tokio::test]
    async fn reads_split_object() {
        let data: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
        let store = MockStore::default().with_object(ObjectId(3), &data);
        let caller = store.sender().clone();
        let last = store.get_chunk(ObjectId(3), 2, &caller).await.unwrap().unwrap();
        assert_eq!(last.len(), 40_000 - 2 * CHUNK_SIZE);
        assert!(store.get_chunk(ObjectId(3), 3, &caller).await.unwrap().is_none());
        assert!(store.get_chunk(ObjectId(9), 0, &caller).await.unwrap().is_none());
        assert_eq!(store.chunk_reads().await, 3);
    }

    #[tokio::test]
    async fn batch_reads_and_faults() {
        let store = MockStore::default()
            .with_chunks(ObjectId(1), vec![vec![1], vec![2], vec![3]])
            .with_batch_cost_ceiling(2)
            .with_empty_batch_slots([1]);
        let caller = store.sender().clone();

        let err = store.get_chunk_batch(ObjectId(1), &[0, 1, 2], &caller).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CostExceeded));

        let batch = store.get_chunk_batch(ObjectId(1), &[0, 1], &caller).await.unwrap();
        assert_eq!(batch, vec![Some(vec![1]), None]);
        // Empty slots are one-shot.
        let batch = store.get_chunk_batch(ObjectId(1), &[1, 2], &caller).await.unwrap();
        assert_eq!(batch, vec![Some(vec![2]), Some(vec![3])]);

        assert!(store.get_chunk_batch(ObjectId(7), &[0], &caller).await.unwrap().is_empty());
        assert_eq!(store.batch_requests().await, vec![3, 2, 2, 1]);
    }

    #[tokio::test]
    async fn unstructured_cost_errors() {
        let store = MockStore::default()
            .with_chunks(ObjectId(1), vec![vec![1], vec![2]])
            .with_batch_cost_ceiling(1)
            .with_unstructured_cost_errors();
        let caller = store.sender().clone();
        let err = store.get_chunk_batch(ObjectId(1), &[0, 1], &caller).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Rejected(_)));
        assert!(err.is_cost_exceeded());
    }

    #[tokio::test]
    async fn batch_reads_can_be_disabled() {
        let store = MockStore::default().with_batch_reads(false);
        let caller = store.sender().clone();
        assert!(!store.supports_chunk_batch_read());
        let err = store.get_chunk_batch(ObjectId(1), &[0], &caller).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unsupported(_)));
    }

    #[tokio::test]
    async fn failing_reads_recover() {
        let store = MockStore::default().with_object(ObjectId(1), b"abc").fail_chunk_reads(0, 2);
        let caller = store.sender().clone();
        assert!(store.get_chunk(ObjectId(1), 0, &caller).await.is_err());
        assert!(store.get_chunk(ObjectId(1), 0, &caller).await.is_err());
        assert_eq!(store.get_chunk(ObjectId(1), 0, &caller).await.unwrap(), Some(b"abc".to_vec()));
        assert_eq!(store.delivered().await.get(&0), Some(&1));
    }

    #[tokio::test]
    async fn upload_and_seal() {
        let chunks = vec![vec![1u8; CHUNK_SIZE], vec![2u8; CHUNK_SIZE], vec![3u8; 5]];
        let (digest, begin) = plan(&chunks);
        let store = MockStore::default();
        let owner = store.sender().clone();

        store.begin_upload(&digest, &begin).await.unwrap();
        store.submit_chunk_batch(&digest, &chunks[..2]).await.unwrap();
        let state = store.get_upload_state(&digest, &owner, &owner).await.unwrap().unwrap();
        assert_eq!(state.current_index, 2);
        assert_eq!(state.running_hash, inscribe_chunk::digest(&chunks[..2]));

        // Incomplete uploads cannot be sealed.
        let err = store.seal_upload(&digest, &metadata()).await.unwrap_err();
        assert_eq!(err.contract(), Some(ContractError::InvalidBatch));

        store.submit_chunk_batch(&digest, &chunks[2..]).await.unwrap();
        let object = store.seal_upload(&digest, &metadata()).await.unwrap();
        assert_eq!(store.object(object).await, Some(chunks));
        assert!(store.get_upload_state(&digest, &owner, &owner).await.unwrap().is_none());
        assert_eq!(store.submitted_batches().await, 2);
        assert_eq!(store.submitted_chunks().await, 3);
    }

    #[tokio::test]
    async fn seal_rejects_mismatched_hash_and_empty_uri() {
        let chunks = vec![vec![1u8, 2, 3]];
        let (_, begin) = plan(&chunks);
        let wrong = inscribe_chunk::digest_bytes(b"something else");
        let store = MockStore::default();
        store.begin_upload(&wrong, &begin).await.unwrap();
        store.submit_chunk_batch(&wrong, &chunks).await.unwrap();

        let empty_uri = SealMetadata::default();
        let err = store.seal_upload(&wrong, &empty_uri).await.unwrap_err();
        assert_eq!(err.contract(), Some(ContractError::InvalidUri));
        let err = store.seal_upload(&wrong, &metadata()).await.unwrap_err();
        assert_eq!(err.contract(), Some(ContractError::HashMismatch));
    }

    #[tokio::test]
    async fn uploads_are_owned_by_sender() {
        let chunks = vec![vec![9u8]];
        let (digest, begin) = plan(&chunks);
        let store = MockStore::default();
        store.begin_upload(&digest, &begin).await.unwrap();
        let other = MockStore::default().connected_as(OTHER);
        let err = other.submit_chunk_batch(&digest, &chunks).await.unwrap_err();
        assert_eq!(err.contract(), Some(ContractError::NotFound));
    }

    #[tokio::test]
    async fn abandon_then_purge() {
        let chunks = vec![vec![0x31], vec![0x32]];
        let (digest, begin) = plan(&chunks);
        let store = MockStore::default();
        let owner = store.sender().clone();
        store.begin_upload(&digest, &begin).await.unwrap();
        store.submit_chunk_batch(&digest, &chunks[..1]).await.unwrap();

        let err = store.purge_expired(&digest, &owner, &[0, 1]).await.unwrap_err();
        assert_eq!(err.contract(), Some(ContractError::NotExpired));

        store.abandon_upload(&digest).await.unwrap();
        let err = store.submit_chunk_batch(&digest, &chunks[1..]).await.unwrap_err();
        assert_eq!(err.contract(), Some(ContractError::UploadExpired));

        let err = store.purge_expired(&digest, &owner, &[1]).await.unwrap_err();
        assert_eq!(err.contract(), Some(ContractError::InvalidBatch));

        store.purge_expired(&digest, &owner, &[0]).await.unwrap();
        let state = store.get_upload_state(&digest, &owner, &owner).await.unwrap().unwrap();
        assert_eq!(state.purge_index, 1);
        store.purge_expired(&digest, &owner, &[1]).await.unwrap();
        assert!(store.get_upload_state(&digest, &owner, &owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn uploads_expire_after_inactivity() {
        let chunks = vec![vec![1u8], vec![2u8]];
        let (digest, begin) = plan(&chunks);
        let store = MockStore::default();
        store.begin_upload(&digest, &begin).await.unwrap();
        store.advance_blocks(UPLOAD_EXPIRY_BLOCKS + 1).await;
        let err = store.submit_chunk_batch(&digest, &chunks).await.unwrap_err();
        assert_eq!(err.contract(), Some(ContractError::UploadExpired));
    }

    #[tokio::test]
    async fn injected_faults_are_one_shot() {
        let chunks = vec![vec![4u8; 8]];
        let (digest, begin) = plan(&chunks);
        let store = MockStore::default().with_chunks(ObjectId(1), vec![vec![1], vec![2]]).fail_batches(1).fail_submits(1);
        let caller = store.sender().clone();

        let err = store.get_chunk_batch(ObjectId(1), &[0, 1], &caller).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert!(err.is_retryable());
        let batch = store.get_chunk_batch(ObjectId(1), &[0, 1], &caller).await.unwrap();
        assert_eq!(batch, vec![Some(vec![1]), Some(vec![2])]);

        store.begin_upload(&digest, &begin).await.unwrap();
        let err = store.submit_chunk_batch(&digest, &chunks).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        store.submit_chunk_batch(&digest, &chunks).await.unwrap();
        assert_eq!(store.submitted_chunks().await, 1);
    }
}
