use crate::context::CacheContext;
use crate::read::Reader;
use crate::stream::error::{Error, ErrorKind, Result};
use crate::stream::phase::{Event, Phase, transition};
use crate::stream::sink::MediaSink;
use exn::ResultExt;
use inscribe_cache::{Preview, PreviewShape};
use inscribe_chunk::mime::{is_streamable, stream_mime_candidates};
use inscribe_config::StreamConfig;
use inscribe_store::ObjectId;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;

/// What to stream: the object and the metadata the store reports for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRequest {
    pub object: ObjectId,
    pub total_size: u64,
    pub total_chunks: u64,
    pub mime_type: Option<String>,
}

/// Snapshot of a streaming session, published on every change.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamStatus {
    pub phase: Phase,
    pub buffered_secs: f64,
    /// Chunks handed to the sink so far, including any restored from a
    /// cached preview.
    pub chunks_loaded: u64,
    pub total_chunks: u64,
    /// Format the sink was opened with.
    pub mime_type: Option<String>,
    pub error: Option<String>,
}
impl StreamStatus {
    fn new(request: &StreamRequest) -> Self {
        Self {
            phase: Phase::Idle,
            buffered_secs: 0.0,
            chunks_loaded: 0,
            total_chunks: request.total_chunks,
            mime_type: None,
            error: None,
        }
    }
}

/// How a streaming session ended.
#[derive(Debug)]
pub enum StreamOutcome {
    Complete,
    Cancelled,
    /// Streaming did not work out; read the whole object instead.
    Fallback(Error),
    /// Streaming failed after part of the object was already played.
    Failed(Error),
}

enum Command {
    Play,
}

/// Starts progressive streaming sessions.
#[derive(Clone)]
pub struct StreamEngine {
    reader: Reader,
    config: StreamConfig,
    cache: Option<CacheContext>,
}
impl StreamEngine {
    pub fn new(reader: Reader, config: StreamConfig) -> Self {
        Self { reader, config, cache: None }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheContext) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Start streaming `request` into `sink` on a new task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// [`InvalidShape`](ErrorKind::InvalidShape) if the object has no chunks
    /// or is not audio or video. Nothing is spawned; read it in full instead.
    pub fn start(&self, request: StreamRequest, sink: Box<dyn MediaSink>) -> Result<StreamHandle> {
        if request.total_chunks == 0 {
            exn::bail!(ErrorKind::InvalidShape("object has no chunks"));
        }
        if !is_streamable(request.mime_type.as_deref()) {
            exn::bail!(ErrorKind::InvalidShape("not an audio or video type"));
        }

        let (status_tx, status_rx) = watch::channel(StreamStatus::new(&request));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let full = self
            .cache
            .as_ref()
            .filter(|context| context.prefers_temporary(request.total_size, request.mime_type.as_deref()))
            .map(|_| Vec::new());
        let span = tracing::info_span!("stream", object = %request.object, total_chunks = request.total_chunks);
        let session = Session {
            reader: self.reader.clone(),
            config: self.config.clone(),
            cache: self.cache.clone(),
            request,
            sink,
            status: status_tx,
            commands: commands_rx,
            token: token.clone(),
            next_index: 0,
            bytes_loaded: 0,
            chunk_size: 0,
            prefix: Vec::new(),
            prefix_chunks: 0,
            full,
        };
        let task = tokio::spawn(session.run().instrument(span));
        Ok(StreamHandle {
            _cancel_on_drop: token.clone().drop_guard(),
            token,
            status: status_rx,
            commands: commands_tx,
            task,
        })
    }
}

/// Control handle of a running stream. Dropping it cancels the stream.
pub struct StreamHandle {
    _cancel_on_drop: DropGuard,
    token: CancellationToken,
    status: watch::Receiver<StreamStatus>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<StreamOutcome>,
}
impl StreamHandle {
    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<StreamStatus> {
        self.status.clone()
    }

    /// Playback started: load the remainder now instead of after the
    /// lazy-load delay.
    pub fn play(&self) {
        // The session may already be past waiting for it.
        let _ = self.commands.send(Command::Play);
    }

    /// Stop the stream. No data reaches the sink afterwards and the sink is
    /// closed.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the session to end. A playable stream that is never
    /// [played](Self::play) still completes once the lazy-load delay passes.
    pub async fn finish(mut self) -> StreamOutcome {
        match (&mut self.task).await.or_raise(|| ErrorKind::Task) {
            Ok(outcome) => outcome,
            Err(e) => StreamOutcome::Failed(e),
        }
    }
}

struct Session {
    reader: Reader,
    config: StreamConfig,
    cache: Option<CacheContext>,
    request: StreamRequest,
    sink: Box<dyn MediaSink>,
    status: watch::Sender<StreamStatus>,
    commands: mpsc::UnboundedReceiver<Command>,
    token: CancellationToken,
    next_index: u64,
    bytes_loaded: u64,
    /// Size of the first chunk, recorded in the preview.
    chunk_size: u64,
    /// Bytes buffered before the stream became playable, saved as the
    /// preview.
    prefix: Vec<u8>,
    prefix_chunks: u64,
    /// Complete content, collected only when it will go to the temporary
    /// cache.
    full: Option<Vec<u8>>,
}

impl Session {
    async fn run(mut self) -> StreamOutcome {
        match self.stream().await {
            Ok(()) => StreamOutcome::Complete,
            Err(e) if matches!(&*e, ErrorKind::Cancelled) => {
                self.sink.close().await;
                self.apply(Event::Cancel);
                tracing::info!(chunks_loaded = self.next_index, "Stream cancelled");
                StreamOutcome::Cancelled
            },
            Err(e) => {
                self.sink.close().await;
                let message = e.to_string();
                self.status.send_modify(|status| status.error = Some(message));
                self.apply(Event::Fail);
                let fallback = e.forces_full_load() || self.next_index == 0;
                tracing::warn!(error = ?e, chunks_loaded = self.next_index, fallback, "Streaming failed");
                if fallback { StreamOutcome::Fallback(e) } else { StreamOutcome::Failed(e) }
            },
        }
    }

    async fn stream(&mut self) -> Result<()> {
        self.apply(Event::Open);
        let format = self.open().await?;
        tracing::info!(%format, "Opened sink");
        self.status.send_modify(|status| status.mime_type = Some(format));
        self.hydrate().await?;

        let total = self.request.total_chunks;
        let initial = total.min(self.config.max_initial_chunks);
        while self.next_index < initial && self.sink.buffered_secs() < self.config.target_buffer_secs {
            self.load_batch(initial, true).await?;
        }
        if self.next_index >= total {
            self.finish().await?;
            self.persist_preview().await;
            self.persist_full().await;
            return Ok(());
        }

        self.apply(Event::Buffered);
        self.persist_preview().await;
        self.wait_for_play().await?;
        self.apply(Event::Promote);
        while self.next_index < total {
            self.load_batch(total, false).await?;
        }
        self.finish().await?;
        self.persist_full().await;
        Ok(())
    }

    async fn open(&mut self) -> Result<String> {
        let candidates = stream_mime_candidates(self.request.mime_type.as_deref());
        let declared = self.request.mime_type.clone().unwrap_or_default();
        let sink = &mut self.sink;
        let open = async move { sink.open(&candidates).await.or_raise(|| ErrorKind::Negotiation(declared.clone())) };
        bounded(&self.token, self.config.sink_open_timeout(), "open", open).await
    }

    /// Restore the prefix saved by an earlier session, if it still matches
    /// the object.
    async fn hydrate(&mut self) -> Result<()> {
        let Some(context) = &self.cache else {
            return Ok(());
        };
        let key = context.key(self.request.object);
        let shape = PreviewShape { total_size: self.request.total_size, total_chunks: self.request.total_chunks };
        let preview = match context.cache.get_preview(&key, &shape).await {
            Ok(Some(preview)) => preview,
            Ok(None) => return Ok(()),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Preview cache read failed");
                return Ok(());
            },
        };
        tracing::info!(%key, chunks = preview.chunks, bytes = preview.data.len(), "Resuming from cached preview");
        self.append(&preview.data).await?;
        self.next_index = preview.chunks;
        self.bytes_loaded = preview.data.len() as u64;
        self.chunk_size = preview.chunk_size;
        self.prefix_chunks = preview.chunks;
        if let Some(full) = &mut self.full {
            full.extend_from_slice(&preview.data);
        }
        self.prefix = preview.data;
        self.publish_progress();
        Ok(())
    }

    /// Fetch and append the next batch of chunks, stopping at `until`.
    async fn load_batch(&mut self, until: u64, initial: bool) -> Result<()> {
        let start = self.next_index;
        let end = until.min(start.saturating_add(self.config.batch_limit() as u64));
        let fetch = self.reader.fetch_range(self.request.object, start..end);
        let chunks = cancellable(&self.token, fetch).await?.or_raise(|| ErrorKind::Read)?;
        tracing::debug!(start, end, "Fetched stream batch");
        for mut chunk in chunks {
            // Cut the store's padding off the final chunk.
            let remaining = self.request.total_size.saturating_sub(self.bytes_loaded);
            chunk.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));
            self.append(&chunk).await?;
            self.record(&chunk, initial);
        }
        Ok(())
    }

    async fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let sink = &mut self.sink;
        let append = async move { sink.append(bytes).await.or_raise(|| ErrorKind::Sink) };
        bounded(&self.token, self.config.append_timeout(), "append", append).await?;
        let buffered_secs = self.sink.buffered_secs();
        self.status.send_modify(|status| status.buffered_secs = buffered_secs);
        Ok(())
    }

    fn record(&mut self, chunk: &[u8], initial: bool) {
        if self.chunk_size == 0 {
            self.chunk_size = chunk.len() as u64;
        }
        if initial {
            self.prefix.extend_from_slice(chunk);
            self.prefix_chunks += 1;
        }
        if let Some(full) = &mut self.full {
            full.extend_from_slice(chunk);
        }
        self.bytes_loaded += chunk.len() as u64;
        self.next_index += 1;
        self.publish_progress();
    }

    async fn wait_for_play(&mut self) -> Result<()> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => exn::bail!(ErrorKind::Cancelled),
            Some(Command::Play) = self.commands.recv() => tracing::info!("Playback started; loading remainder"),
            () = tokio::time::sleep(self.config.lazy_load_delay()) => tracing::debug!("Loading remainder in the background"),
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        let sink = &mut self.sink;
        let end = async move { sink.end_of_stream().await.or_raise(|| ErrorKind::Sink) };
        bounded(&self.token, self.config.append_timeout(), "end of stream", end).await?;
        self.apply(Event::Loaded);
        Ok(())
    }

    async fn persist_preview(&mut self) {
        let Some(context) = &self.cache else {
            return;
        };
        if self.prefix_chunks == 0 || self.prefix_chunks > self.request.total_chunks {
            return;
        }
        let preview = Preview {
            data: std::mem::take(&mut self.prefix),
            mime_type: self.request.mime_type.clone(),
            chunks: self.prefix_chunks,
            total_chunks: self.request.total_chunks,
            total_size: self.request.total_size,
            chunk_size: self.chunk_size,
        };
        let key = context.key(self.request.object);
        match context.cache.put_preview(&key, &preview).await {
            Ok(()) => tracing::debug!(%key, chunks = preview.chunks, "Saved stream preview"),
            Err(e) => tracing::warn!(%key, error = %e, "Could not save stream preview"),
        }
    }

    async fn persist_full(&mut self) {
        let (Some(context), Some(mut full)) = (&self.cache, self.full.take()) else {
            return;
        };
        let key = context.key(self.request.object);
        let Ok(total_size) = usize::try_from(self.request.total_size) else {
            return;
        };
        if full.len() < total_size {
            tracing::warn!(%key, loaded = full.len(), total_size, "Not caching incomplete stream");
            return;
        }
        full.truncate(total_size);
        match context.cache.put_temporary(&key, &full, self.request.mime_type.as_deref()).await {
            Ok(()) => tracing::debug!(%key, bytes = full.len(), "Cached streamed object"),
            Err(e) => tracing::warn!(%key, error = %e, "Could not cache streamed object"),
        }
    }

    fn publish_progress(&self) {
        let chunks_loaded = self.next_index;
        self.status.send_modify(|status| status.chunks_loaded = chunks_loaded);
    }

    fn apply(&self, event: Event) {
        let current = self.status.borrow().phase;
        match transition(current, event) {
            Some(next) => {
                self.status.send_modify(|status| status.phase = next);
                tracing::info!(from = %current, to = %next, "Stream phase changed");
            },
            None => tracing::debug!(phase = %current, ?event, "Ignoring stream event"),
        }
    }
}

/// Run `future` unless `token` is cancelled first. A cancelled token wins
/// even if `future` is ready, so nothing runs after cancellation.
async fn cancellable<F: Future>(token: &CancellationToken, future: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        () = token.cancelled() => exn::bail!(ErrorKind::Cancelled),
        output = future => Ok(output),
    }
}

/// A cancellable sink operation that fails with
/// [`SinkTimeout`](ErrorKind::SinkTimeout) after `limit`.
async fn bounded<T>(
    token: &CancellationToken,
    limit: Duration,
    operation: &'static str,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    cancellable(token, tokio::time::timeout(limit, future)).await?.or_raise(|| ErrorKind::SinkTimeout(operation))?
}
