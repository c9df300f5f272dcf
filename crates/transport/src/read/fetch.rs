use crate::read::Reader;
use crate::read::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use inscribe_asyncutils::{Backoff, fetch_ordered, retry};
use inscribe_store::ObjectId;
use inscribe_store::error::{Error as StoreError, Result as StoreResult};
use std::ops::Range;

type Chunk = Vec<u8>;

impl Reader {
    fn backoff(&self, retries: u32) -> Backoff {
        Backoff::new(self.config.backoff_base(), retries)
    }

    /// Fetch a single chunk, retrying failed and empty responses with
    /// exponential backoff.
    ///
    /// # Errors
    /// [`MissingChunk`](ErrorKind::MissingChunk) once the retries are
    /// exhausted. The last attempt's error is kept in the tree.
    pub(crate) async fn fetch_chunk(&self, object: ObjectId, index: u64) -> Result<Chunk> {
        let caller = self.store.sender();
        let chunk = retry(
            self.backoff(self.config.chunk_retries),
            |attempt| async move {
                tracing::debug!(%object, index, attempt, "Fetching chunk");
                match self.store.get_chunk(object, index, caller).await {
                    Ok(Some(chunk)) if !chunk.is_empty() => Ok(chunk),
                    Ok(_) => Err(exn::Exn::from(ErrorKind::EmptyChunk)),
                    Err(e) => Err(e).or_raise(|| ErrorKind::Store),
                }
            },
            |err: &Error| err.is_retryable(),
        )
        .await;
        chunk.or_raise(|| ErrorKind::MissingChunk { object, index })
    }

    /// One batched read, retried for transient failures. Cost rejections are
    /// returned straight away: asking again for the same amount is pointless.
    async fn fetch_batch(&self, object: ObjectId, indices: &[u64]) -> StoreResult<Vec<Option<Chunk>>> {
        let caller = self.store.sender();
        retry(
            self.backoff(self.config.batch_retries),
            |attempt| async move {
                tracing::debug!(%object, start = indices.first(), size = indices.len(), attempt, "Fetching chunk batch");
                self.store.get_chunk_batch(object, indices, caller).await
            },
            |err: &StoreError| err.is_retryable() && !err.is_cost_exceeded(),
        )
        .await
    }

    /// Fetch every index individually, at most `concurrency` at a time.
    async fn fetch_pool(&self, object: ObjectId, indices: impl IntoIterator<Item = u64>) -> Result<Vec<(u64, Chunk)>> {
        fetch_ordered(indices, self.config.concurrency, |index| self.fetch_chunk(object, index)).await
    }

    /// Fetch the chunks in `range`, returned in index order.
    ///
    /// Batched reads are used when the store supports them. A batch the store
    /// finds too expensive is retried over the same indices at half the size,
    /// down to individual reads; any other batch failure falls back to
    /// individual reads for that batch only. Slots a batch leaves empty are
    /// fetched individually at the end. Every index is either returned or the
    /// whole call fails.
    pub async fn fetch_range(&self, object: ObjectId, range: Range<u64>) -> Result<Vec<Chunk>> {
        let mut limit = self.config.batch_limit();
        if !self.store.supports_chunk_batch_read() || limit <= 1 {
            let chunks = self.fetch_pool(object, range).await?;
            return Ok(chunks.into_iter().map(|(_, chunk)| chunk).collect());
        }

        let mut chunks: Vec<(u64, Chunk)> = Vec::new();
        let mut missing: Vec<u64> = Vec::new();
        let mut next = range.start;
        while next < range.end {
            if limit <= 1 {
                tracing::warn!(%object, from = next, "Batch reads exhausted; fetching remaining chunks individually");
                chunks.extend(self.fetch_pool(object, next..range.end).await?);
                break;
            }
            let end = range.end.min(next.saturating_add(limit as u64));
            let indices: Vec<u64> = (next..end).collect();
            match self.fetch_batch(object, &indices).await {
                Ok(batch) => {
                    let mut batch = batch.into_iter();
                    for index in indices {
                        match batch.next().flatten() {
                            Some(chunk) if !chunk.is_empty() => chunks.push((index, chunk)),
                            _ => missing.push(index),
                        }
                    }
                    next = end;
                },
                Err(e) if e.is_cost_exceeded() => {
                    limit = (limit / 2).max(1);
                    tracing::warn!(%object, from = next, limit, "Batch read too expensive; shrinking batch size");
                },
                Err(e) => {
                    tracing::warn!(%object, from = next, to = end, error = %e, "Batch read failed; fetching chunks individually");
                    chunks.extend(self.fetch_pool(object, next..end).await?);
                    next = end;
                },
            }
        }

        if !missing.is_empty() {
            tracing::warn!(%object, ?missing, "Batch read returned empty chunks; retrying individually");
            chunks.extend(self.fetch_pool(object, missing).await?);
        }
        chunks.sort_unstable_by_key(|(index, _)| *index);
        Ok(chunks.into_iter().map(|(_, chunk)| chunk).collect())
    }
}
