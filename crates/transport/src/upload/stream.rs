use crate::upload::error::{ErrorKind, Result};
use crate::upload::plan::{ResumeInfo, UploadPlan};
use async_stream::stream;
use exn::{OptionExt, ResultExt};
use futures::Stream;
use inscribe_asyncutils::{Backoff, retry};
use inscribe_chunk::{Digest, batch};
use inscribe_config::UploadConfig;
use inscribe_store::error::{ContractError, Error as StoreError};
use inscribe_store::{ObjectId, SealMetadata, StoreHandle, UploadState};

/// Progress events emitted by [`upload`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`StateConfirmed`](Self::StateConfirmed), exactly once, after the
///    remote state has been found (or created) and checked against the file.
/// 3. [`BatchSubmitted`](Self::BatchSubmitted), once per accepted batch.
/// 4. [`Sealed`](Self::Sealed), exactly once.
/// 5. [`Complete`](Self::Complete), exactly once, signalling the stream is
///    finished.
///
/// Any error terminates the stream; everything the store accepted before it
/// stays accepted and a later call resumes from there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadEvent {
    Started { digest: Digest, total_chunks: u64 },
    StateConfirmed(ResumeInfo),
    /// Batch number `batch` (counting from one) of `of` was accepted.
    BatchSubmitted { batch: u64, of: u64, chunks: u64 },
    Sealed { object: ObjectId },
    Complete,
}

/// Upload `plan`, resuming whatever the sender already has in progress for
/// it, and seal it with `metadata`.
///
/// A file the store has never seen is registered first. A remote upload
/// started from a different file is never overwritten: the stream fails with
/// [`ResumeMismatch`](ErrorKind::ResumeMismatch) or
/// [`Desync`](ErrorKind::Desync) instead.
pub fn upload<'a>(
    store: &'a StoreHandle,
    config: &'a UploadConfig,
    plan: &'a UploadPlan,
    metadata: &'a SealMetadata,
) -> impl Stream<Item = Result<UploadEvent>> + 'a {
    stream!({
        yield Ok(UploadEvent::Started { digest: plan.digest, total_chunks: plan.total_chunks() });

        let state = match remote_state(store, plan).await {
            Ok(state) => state,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        let info = match plan.check_resumable(&state, config.batch_limit()) {
            Ok(info) => info,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        tracing::info!(
            digest = %plan.digest,
            from = info.current_index,
            remaining = info.remaining_chunks,
            batches = info.remaining_batches,
            "Uploading",
        );
        yield Ok(UploadEvent::StateConfirmed(info));

        for await event in resume(store, config, plan, &state) {
            let failed = event.is_err();
            yield event;
            if failed {
                return;
            }
        }

        match seal(store, plan, metadata).await {
            Ok(object) => yield Ok(UploadEvent::Sealed { object }),
            Err(e) => {
                yield Err(e);
                return;
            },
        }
        yield Ok(UploadEvent::Complete);
    })
}

/// Submit the chunks of `plan` the store has not accepted yet, according to
/// `state`. Emits one [`BatchSubmitted`](UploadEvent::BatchSubmitted) per
/// batch; nothing at all if the upload is already complete.
///
/// Accepted batches are not re-verified locally; the store checks the
/// running hash when the upload is sealed.
pub fn resume<'a>(
    store: &'a StoreHandle,
    config: &'a UploadConfig,
    plan: &'a UploadPlan,
    state: &'a UploadState,
) -> impl Stream<Item = Result<UploadEvent>> + 'a {
    stream!({
        let start = match usize::try_from(state.current_index) {
            Ok(start) if start <= plan.chunks.len() => start,
            _ => {
                yield Err(exn::Exn::from(ErrorKind::Desync { remote: state.current_index, local: plan.total_chunks() }));
                return;
            },
        };
        let batches = batch(&plan.chunks[start..], config.batch_limit());
        let of = batches.len() as u64;
        for (number, chunks) in (1..).zip(batches) {
            if let Err(e) = submit(store, config, &plan.digest, chunks).await {
                yield Err(e);
                return;
            }
            tracing::debug!(digest = %plan.digest, batch = number, of, chunks = chunks.len(), "Batch accepted");
            yield Ok(UploadEvent::BatchSubmitted { batch: number, of, chunks: chunks.len() as u64 });
        }
    })
}

/// The sender's remote state for `plan`, registering the upload first if
/// there is none.
async fn remote_state(store: &StoreHandle, plan: &UploadPlan) -> Result<UploadState> {
    let owner = store.sender();
    if let Some(state) = store.get_upload_state(&plan.digest, owner, owner).await.map_err(ErrorKind::store)? {
        return Ok(state);
    }
    let receipt = store.begin_upload(&plan.digest, &plan.begin()).await.map_err(ErrorKind::store)?;
    tracing::info!(digest = %plan.digest, tx = %receipt.tx_id, "Registered upload");
    store.get_upload_state(&plan.digest, owner, owner).await.map_err(ErrorKind::store)?.ok_or_raise(|| ErrorKind::NoUploadState)
}

async fn submit(store: &StoreHandle, config: &UploadConfig, digest: &Digest, chunks: &[Vec<u8>]) -> Result<()> {
    let backoff = Backoff::default().with_retries(config.submit_retries);
    retry(backoff, |_| store.submit_chunk_batch(digest, chunks), |err: &StoreError| err.is_retryable())
        .await
        .map_err(ErrorKind::store)?;
    Ok(())
}

async fn seal(store: &StoreHandle, plan: &UploadPlan, metadata: &SealMetadata) -> Result<ObjectId> {
    match store.seal_upload(&plan.digest, metadata).await {
        Ok(object) => {
            tracing::info!(digest = %plan.digest, %object, "Sealed upload");
            Ok(object)
        },
        Err(e) if e.contract() == Some(ContractError::HashMismatch) => {
            Err(e).or_raise(|| ErrorKind::HashMismatch(plan.digest))
        },
        Err(e) => Err(ErrorKind::store(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::plan::plan_upload;
    use futures::{StreamExt, TryStreamExt};
    use inscribe_chunk::CHUNK_SIZE;
    use inscribe_store::{BeginUpload, ChunkStore, MockStore};
    use std::sync::Arc;

    fn content(chunks: usize) -> Vec<u8> {
        (0..CHUNK_SIZE * chunks + 7).map(|i| (i % 253) as u8).collect()
    }

    fn metadata() -> SealMetadata {
        SealMetadata { token_uri: "ipfs://token.json".to_string(), dependencies: Vec::new() }
    }

    fn config(batch_size: usize) -> UploadConfig {
        UploadConfig { batch_size, ..UploadConfig::default() }
    }

    #[tokio::test]
    async fn test_fresh_upload() {
        let bytes = content(6);
        let plan = plan_upload(&bytes, "audio/mpeg").unwrap();
        let mock = Arc::new(MockStore::default());
        let store: StoreHandle = mock.clone();
        let config = config(3);
        let metadata = metadata();

        let events: Vec<UploadEvent> = upload(&store, &config, &plan, &metadata).try_collect().await.unwrap();
        assert_eq!(events.len(), 7);
        assert_eq!(events[0], UploadEvent::Started { digest: plan.digest, total_chunks: 7 });
        assert!(matches!(events[1], UploadEvent::StateConfirmed(ResumeInfo { current_index: 0, remaining_batches: 3, .. })));
        assert_eq!(events[2], UploadEvent::BatchSubmitted { batch: 1, of: 3, chunks: 3 });
        assert_eq!(events[4], UploadEvent::BatchSubmitted { batch: 3, of: 3, chunks: 1 });
        let UploadEvent::Sealed { object } = events[5] else {
            panic!("expected a sealed event");
        };
        assert_eq!(mock.object(object).await.unwrap().concat(), bytes);
        assert_eq!(mock.submitted_chunks().await, 7);
    }

    #[tokio::test]
    async fn test_resumes_from_remote_index() {
        let plan = plan_upload(&content(4), "image/png").unwrap();
        let mock = Arc::new(MockStore::default());
        mock.begin_upload(&plan.digest, &plan.begin()).await.unwrap();
        mock.submit_chunk_batch(&plan.digest, &plan.chunks[..2]).await.unwrap();
        let store: StoreHandle = mock.clone();
        let config = config(30);
        let metadata = metadata();

        let events: Vec<UploadEvent> = upload(&store, &config, &plan, &metadata).try_collect().await.unwrap();
        assert!(matches!(events[1], UploadEvent::StateConfirmed(ResumeInfo { current_index: 2, remaining_chunks: 3, .. })));
        assert_eq!(events[2], UploadEvent::BatchSubmitted { batch: 1, of: 1, chunks: 3 });
        assert!(matches!(events.last(), Some(UploadEvent::Complete)));
        // One batch from the setup, one from the resume.
        assert_eq!(mock.submitted_batches().await, 2);
    }

    #[tokio::test]
    async fn test_resume_of_complete_upload_submits_nothing() {
        let plan = plan_upload(&content(2), "image/png").unwrap();
        let mock = Arc::new(MockStore::default());
        mock.begin_upload(&plan.digest, &plan.begin()).await.unwrap();
        mock.submit_chunk_batch(&plan.digest, &plan.chunks).await.unwrap();
        let store: StoreHandle = mock.clone();
        let owner = store.sender().clone();
        let state = store.get_upload_state(&plan.digest, &owner, &owner).await.unwrap().unwrap();
        let config = config(30);

        for _ in 0..2 {
            let events: Vec<UploadEvent> = resume(&store, &config, &plan, &state).try_collect().await.unwrap();
            assert!(events.is_empty());
        }
        assert_eq!(mock.submitted_batches().await, 1);
    }

    #[tokio::test]
    async fn test_mismatched_remote_upload_is_not_overwritten() {
        let plan = plan_upload(&content(2), "image/png").unwrap();
        let mock = Arc::new(MockStore::default());
        let other = BeginUpload { mime_type: "image/gif".to_string(), ..plan.begin() };
        mock.begin_upload(&plan.digest, &other).await.unwrap();
        let store: StoreHandle = mock.clone();
        let config = config(30);
        let metadata = metadata();

        let events: Vec<Result<UploadEvent>> = upload(&store, &config, &plan, &metadata).collect().await;
        assert_eq!(events.len(), 2);
        let err = events.into_iter().nth(1).unwrap().unwrap_err();
        assert!(matches!(&*err, ErrorKind::ResumeMismatch("mime type")));
        assert_eq!(mock.submitted_batches().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_submit_failures_are_retried() {
        let plan = plan_upload(&content(1), "text/plain").unwrap();
        let mock = Arc::new(MockStore::default().fail_submits(2));
        let store: StoreHandle = mock.clone();
        let config = config(30);
        let metadata = metadata();

        let events: Vec<UploadEvent> = upload(&store, &config, &plan, &metadata).try_collect().await.unwrap();
        assert!(matches!(events.last(), Some(UploadEvent::Complete)));
        assert_eq!(mock.submitted_batches().await, 1);
    }

    #[tokio::test]
    async fn test_hash_mismatch_at_seal() {
        let plan = plan_upload(&content(1), "text/plain").unwrap();
        // The remote received different bytes under the same digest.
        let mock = Arc::new(MockStore::default());
        mock.begin_upload(&plan.digest, &plan.begin()).await.unwrap();
        let mut corrupted = plan.chunks.clone();
        corrupted[1][0] ^= 0xff;
        mock.submit_chunk_batch(&plan.digest, &corrupted).await.unwrap();
        let store: StoreHandle = mock.clone();
        let config = config(30);
        let metadata = metadata();

        let result: Result<Vec<UploadEvent>> = upload(&store, &config, &plan, &metadata).try_collect().await;
        let err = result.unwrap_err();
        assert!(matches!(&*err, ErrorKind::HashMismatch(digest) if *digest == plan.digest));
    }

    #[tokio::test]
    async fn test_expired_upload_cannot_be_resumed() {
        let plan = plan_upload(&content(3), "text/plain").unwrap();
        let mock = Arc::new(MockStore::default());
        mock.begin_upload(&plan.digest, &plan.begin()).await.unwrap();
        mock.abandon_upload(&plan.digest).await.unwrap();
        let store: StoreHandle = mock.clone();
        let config = config(30);
        let metadata = metadata();

        let result: Result<Vec<UploadEvent>> = upload(&store, &config, &plan, &metadata).try_collect().await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::Expired));
    }
}
