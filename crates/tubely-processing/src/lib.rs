//! Tubely Media Processing Library
//!
//! This crate turns a raw upload into a stored, streamable asset: probing stream
//! geometry with ffprobe, classifying the aspect ratio, remuxing with ffmpeg for
//! progressive playback, and the [`IngestPipeline`] that drives all of it.

pub mod aspect;
pub mod optimize;
pub mod pipeline;
pub mod probe;
pub mod process;

// Re-export commonly used types
pub use aspect::{classify, AspectRatio, ClassificationError};
pub use optimize::{FfmpegOptimizer, OptimizationError, Optimizer};
pub use pipeline::{
    Failed, IngestConfig, IngestError, IngestPipeline, Persisted, PipelineStage, UploadRequest,
};
pub use probe::{FfprobeProber, ProbeError, ProbeResult, Prober};
pub use process::ProcessError;
