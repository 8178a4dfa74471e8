//! Tubely Core Library
//!
//! This crate provides the domain models, error types and configuration shared
//! by every Tubely component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, IngestSettings, StorageSettings, TubelyConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{OrientationBucket, Video, VideoResponse};
