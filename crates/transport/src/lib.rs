//! Moving inscription content between a remote chunk store and its callers.
//!
//! - [`read`]: fetch complete objects, batching chunk reads when the store
//!   allows it and degrading to single reads when it does not.
//! - [`upload`]: plan, resume, seal, abandon and purge chunked uploads.
//! - [`stream`]: feed large media into a [`MediaSink`](stream::MediaSink)
//!   progressively so playback can start before the download finishes.
//!
//! [`Transport`] ties the three to one store, one [`Config`](inscribe_config::Config)
//! and an optional cache.

mod context;
pub mod error;
pub mod read;
pub mod stream;
mod transport;
pub mod upload;

pub use crate::context::CacheContext;
pub use crate::transport::Transport;
