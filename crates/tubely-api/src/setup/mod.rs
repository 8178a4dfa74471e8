//! Application setup and initialization
//!
//! Everything main.rs needs to go from a loaded `Config` to a ready `Router`.

pub mod database;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod storage;

use crate::auth::JwtValidator;
use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::PgVideoRepository;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config)?;
    let videos = Arc::new(PgVideoRepository::new(pool));
    let pipeline = pipeline::setup_pipeline(&config, storage, videos).await?;

    let state = Arc::new(AppState::new(
        pipeline,
        Arc::new(JwtValidator::new(config.jwt_secret())),
    ));
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
