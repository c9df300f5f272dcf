//! SQLite cache for inscription content.
//!
//! The cache is a convenience, never a source of truth: every record can be
//! refetched from the remote store, so callers treat cache errors as misses.
//!
//! # Architecture
//! One table holds four independent key spaces ([`Tier`]), each bounded by
//! its own eviction [`Policy`]:
//! - **Permanent**: full content, overwritten on every successful full read.
//! - **Temporary**: full content of large media, expiring after a TTL and
//!   evicted oldest-first to stay within a byte budget.
//! - **Preview**: a chunk-aligned prefix of an object used to resume
//!   streaming. Only returned when it matches the object's live shape.
//! - **Thumbnail**: small derived images, pruned least-recently-used first.

mod db;
pub mod error;
mod key;
mod models;
mod policy;
mod repo;

pub use crate::db::Database;
pub use crate::key::{CacheKey, Tier};
pub use crate::models::{CachedValue, Preview, PreviewShape, Thumbnail, TierUsage};
pub use crate::policy::{Policies, Policy, TEMP_BUDGET_BYTES, TEMP_MAX_OBJECT_BYTES, TEMP_TTL, THUMBNAIL_LIMIT};
pub use crate::repo::Cache;
