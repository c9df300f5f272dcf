pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod models;
mod store;

#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockStore;
pub use crate::models::{Address, BeginUpload, ObjectId, Receipt, SealMetadata, UPLOAD_EXPIRY_BLOCKS, UploadState};
pub use crate::store::ChunkStore;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn ChunkStore + Send + Sync>;
