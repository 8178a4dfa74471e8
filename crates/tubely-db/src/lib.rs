//! Tubely Database Layer
//!
//! This crate provides the video metadata repository consumed by the ingestion
//! pipeline: a narrow read/update interface over the `videos` table.

// Module declarations
pub mod db;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-exports
pub use db::video::{PgVideoRepository, VideoRepository};
pub use db::MIGRATOR;
