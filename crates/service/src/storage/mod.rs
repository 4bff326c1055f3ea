//! Storage abstractions for the service layer
//!
//! The store treats persistence as an opaque blob: one JSON document loaded
//! at start and rewritten wholesale after every mutation.

pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ServiceError;

pub use json_file::JsonFileBlobStore;
pub use memory::MemoryBlobStore;

/// Backend holding the single persisted blob.
/// Implementations can be file-backed, in-memory, or remote KV.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the blob; `None` when nothing was ever saved.
    async fn load(&self) -> Result<Option<Value>, ServiceError>;
    /// Replace the blob.
    async fn save(&self, data: &Value) -> Result<(), ServiceError>;
}
