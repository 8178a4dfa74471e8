//! Object storage setup

use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_storage::{ObjectStorage, RandomKeyGenerator, Storage};

/// Build the S3-backed storage used for finished videos.
pub fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let settings = config.storage();
    let storage = ObjectStorage::s3(settings, Arc::new(RandomKeyGenerator))
        .context("Failed to initialize object storage")?;

    tracing::info!(
        bucket = %settings.bucket,
        region = %settings.region,
        endpoint = settings.endpoint.as_deref().unwrap_or("aws"),
        distribution_origin = %settings.distribution_origin,
        "Object storage initialized"
    );

    Ok(Arc::new(storage))
}
