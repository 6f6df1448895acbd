//! Storage abstraction trait

use async_trait::async_trait;
use beatnexus_core::StorageBackendKind;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage for submitted videos.
///
/// Uploading and resolving the public URL are separate steps so that a
/// failure to resolve is reported distinctly from a failed write.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a file under a fresh key for `owner_id` and return the key
    async fn upload(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Publicly readable URL for a stored object
    fn public_url(&self, storage_key: &str) -> StorageResult<String>;

    fn backend_type(&self) -> StorageBackendKind;
}
