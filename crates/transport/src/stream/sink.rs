use crate::stream::error::Result;
use async_trait::async_trait;

/// Destination that progressive streaming feeds bytes into, such as a media
/// source buffer attached to a player.
///
/// The engine calls the methods strictly in order: [`open()`](Self::open)
/// once, then any number of [`append()`](Self::append) calls in ascending
/// chunk order, then [`end_of_stream()`](Self::end_of_stream) once every
/// chunk is appended. [`close()`](Self::close) is only called when the
/// session is cancelled or fails; nothing is appended after it.
#[async_trait]
pub trait MediaSink: Send {
    /// Open the sink with the first format in `candidates` it supports and
    /// return that format.
    async fn open(&mut self, candidates: &[String]) -> Result<String>;

    async fn append(&mut self, bytes: &[u8]) -> Result<()>;

    /// Seconds of playback currently buffered ahead of the play position.
    fn buffered_secs(&self) -> f64;

    /// Signal that the complete object has been appended.
    async fn end_of_stream(&mut self) -> Result<()>;

    /// Release the sink without finishing the stream.
    async fn close(&mut self);
}
