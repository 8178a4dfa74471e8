//! Tubely Storage Library
//!
//! This crate owns every byte of an upload outside the request body: the local
//! staging area where uploads and remuxed copies live while they are processed,
//! and the durable object store the finished asset is written to.
//!
//! # Object key format
//!
//! Keys are `{bucket}/{id}.mp4` where `{bucket}` is the orientation bucket
//! (`landscape`, `portrait` or `other`) and `{id}` is 32 random bytes encoded as
//! unpadded base64url. Keys never contain client-supplied text.

pub mod keys;
pub mod object;
pub mod staging;
pub mod traits;

// Re-export commonly used types
pub use keys::{KeyGenerator, ObjectKey, RandomKeyGenerator};
pub use object::ObjectStorage;
pub use staging::{StagedFile, StagingError, StagingStore};
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
