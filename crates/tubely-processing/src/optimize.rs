//! Fast-start remuxing.
//!
//! MP4 files written by most cameras put the `moov` index atom after the media
//! data, so a player has to fetch the whole file before it can start. Remuxing
//! with `-movflags +faststart` moves the index to the front without re-encoding.

use crate::process::{self, ProcessError};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::io;
use tubely_storage::{StagedFile, StagingError, StagingStore};

const PROCESSING_PREFIX: &str = "PROCESSING";

#[derive(Debug, thiserror::Error)]
pub enum OptimizationError {
    #[error("ffmpeg failed: {0}")]
    Process(#[from] ProcessError),

    #[error("failed to allocate output file: {0}")]
    Staging(#[from] StagingError),

    #[error("failed to open optimized output: {0}")]
    Io(#[from] io::Error),
}

/// Produces a streaming-friendly copy of a staged file.
///
/// The input is left untouched; the caller owns (and must release) both files.
#[async_trait]
pub trait Optimizer: Send + Sync {
    async fn optimize(&self, input: &StagedFile) -> Result<StagedFile, OptimizationError>;
}

/// [`Optimizer`] that remuxes with `ffmpeg -c copy -movflags +faststart`.
#[derive(Debug, Clone)]
pub struct FfmpegOptimizer {
    ffmpeg_path: String,
    staging: StagingStore,
}

impl FfmpegOptimizer {
    /// Outputs are allocated in `staging`, next to the uploads they come from.
    pub fn new(ffmpeg_path: impl Into<String>, staging: StagingStore) -> Result<Self, ProcessError> {
        let ffmpeg_path = ffmpeg_path.into();
        process::validate_executable(&ffmpeg_path)?;
        Ok(Self {
            ffmpeg_path,
            staging,
        })
    }

    async fn remux(&self, input: &StagedFile, output: &mut StagedFile) -> Result<(), OptimizationError> {
        process::validate_path(&self.ffmpeg_path, input.path())?;
        process::validate_path(&self.ffmpeg_path, output.path())?;

        process::run(
            &self.ffmpeg_path,
            [
                OsStr::new("-y"),
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-i"),
                input.path().as_os_str(),
                OsStr::new("-c"),
                OsStr::new("copy"),
                OsStr::new("-movflags"),
                OsStr::new("+faststart"),
                OsStr::new("-f"),
                OsStr::new("mp4"),
                output.path().as_os_str(),
            ],
        )
        .await?;

        // ffmpeg replaced the file behind our handle.
        output.reopen().await?;
        Ok(())
    }
}

#[async_trait]
impl Optimizer for FfmpegOptimizer {
    #[tracing::instrument(skip(self, input), fields(process.executable.name = %self.ffmpeg_path, input = %input.path().display()))]
    async fn optimize(&self, input: &StagedFile) -> Result<StagedFile, OptimizationError> {
        let start = std::time::Instant::now();
        let mut output = self.staging.allocate(PROCESSING_PREFIX).await?;

        if let Err(e) = self.remux(input, &mut output).await {
            tracing::warn!(
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Fast-start remux failed"
            );
            if let Err(release_err) = output.release().await {
                tracing::warn!(
                    error = %release_err,
                    path = %output.path().display(),
                    "Failed to remove remux output"
                );
            }
            return Err(e);
        }

        tracing::debug!(
            output = %output.path().display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fast-start remux completed"
        );

        Ok(output)
    }
}
