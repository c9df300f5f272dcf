//! Small async building blocks: exponential backoff and bounded, index-ordered
//! concurrent fetching.
//!
//! Nothing in here spawns tasks. Concurrency is logical overlap of pending
//! futures polled by whichever task awaits them, so these helpers work the
//! same on a single-threaded runtime.

mod pool;
mod retry;

pub use crate::pool::fetch_ordered;
pub use crate::retry::{Backoff, retry};
