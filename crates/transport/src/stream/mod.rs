//! Progressive streaming of large media objects.
//!
//! A [`StreamEngine`] session opens a [`MediaSink`] with the first format it
//! accepts, restores any cached preview of the object, and buffers chunks in
//! small batches until the sink holds enough playback (or the initial chunk
//! cap is hit). The stream is then [`Playable`](Phase::Playable): the rest is
//! loaded once playback starts or after a delay, whichever comes first.
//!
//! Every session runs on its own task. Its [`StreamHandle`] publishes
//! [`StreamStatus`] snapshots, forwards the play signal and cancels the
//! session when asked or dropped. Phase changes go through the pure
//! [`transition`] function.
//!
//! Sessions that fail before anything was played end in
//! [`StreamOutcome::Fallback`]: read the object in full instead.

mod engine;
pub mod error;
mod phase;
mod sink;

pub use crate::stream::engine::{StreamEngine, StreamHandle, StreamOutcome, StreamRequest, StreamStatus};
pub use crate::stream::phase::{Event, Phase, transition};
pub use crate::stream::sink::MediaSink;
