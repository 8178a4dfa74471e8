//! Storage abstraction trait
//!
//! This module defines the Storage trait that durable asset backends implement.

use crate::StagedFile;
use async_trait::async_trait;
use thiserror::Error;
use tubely_core::OrientationBucket;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A durably stored object and the canonical URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Storage abstraction trait
///
/// Implementations generate a fresh key under the bucket's prefix for every call;
/// a key is only returned once the object is fully written.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a staged file and return its key and canonical URL.
    async fn put(
        &self,
        bucket: OrientationBucket,
        file: &mut StagedFile,
        content_type: &str,
    ) -> StorageResult<StoredObject>;
}
