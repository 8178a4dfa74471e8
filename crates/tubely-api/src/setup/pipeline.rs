//! Ingest pipeline wiring

use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoRepository;
use tubely_processing::{FfmpegOptimizer, FfprobeProber, IngestConfig, IngestPipeline};
use tubely_storage::{StagingStore, Storage};

/// Assemble the pipeline from configuration and its external collaborators.
pub async fn setup_pipeline(
    config: &Config,
    storage: Arc<dyn Storage>,
    videos: Arc<dyn VideoRepository>,
) -> Result<IngestPipeline> {
    let ingest = IngestConfig::from_settings(config.ingest());

    tokio::fs::create_dir_all(&ingest.staging_dir)
        .await
        .with_context(|| format!("Failed to create staging dir {}", ingest.staging_dir.display()))?;

    let prober = FfprobeProber::new(config.ffprobe_path()).context("Invalid FFPROBE_PATH")?;
    let optimizer = FfmpegOptimizer::new(
        config.ffmpeg_path(),
        StagingStore::new(ingest.staging_dir.clone()),
    )
    .context("Invalid FFMPEG_PATH")?;

    tracing::info!(
        max_upload_mb = ingest.max_upload_bytes / 1024 / 1024,
        staging_dir = %ingest.staging_dir.display(),
        ffmpeg_path = %config.ffmpeg_path(),
        ffprobe_path = %config.ffprobe_path(),
        "Ingest pipeline ready"
    );

    Ok(IngestPipeline::new(
        ingest,
        Arc::new(prober),
        Arc::new(optimizer),
        storage,
        videos,
    ))
}
