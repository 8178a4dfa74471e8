//! Postgres pool for video metadata

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tubely_core::Config;

/// Connect to Postgres and bring the `videos` schema up to date.
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .connect(config.database_url())
        .await
        .context("Failed to connect to video metadata database")?;

    tubely_db::MIGRATOR
        .run(&pool)
        .await
        .context("Failed to apply videos schema migrations")?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        acquire_timeout_secs = config.db_timeout_seconds(),
        migrations = tubely_db::MIGRATOR.iter().count(),
        "Video metadata store ready"
    );

    Ok(pool)
}
