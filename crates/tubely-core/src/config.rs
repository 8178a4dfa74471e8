//! Configuration module
//!
//! This module provides the configuration structures for the API server and the
//! ingestion pipeline: database, object storage, authentication and media tooling.
//! Values are read once at startup and carried around as an immutable `Config`.

use std::env;
use std::path::PathBuf;

use crate::constants::MAX_UPLOAD_SIZE;

// Common constants
const SERVER_PORT: u16 = 8091;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MIN_JWT_SECRET_LEN: usize = 32;

/// Base configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
}

/// Object storage configuration
#[derive(Clone, Debug)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    /// Public origin prepended to object keys to build canonical asset URLs.
    pub distribution_origin: String,
}

/// Ingestion pipeline configuration
#[derive(Clone, Debug)]
pub struct IngestSettings {
    pub max_upload_bytes: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Directory for staged uploads; `None` means the system temp directory.
    pub staging_dir: Option<PathBuf>,
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct TubelyConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub storage: StorageSettings,
    pub ingest: IngestSettings,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<TubelyConfig>);

impl Config {
    fn inner(&self) -> &TubelyConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.inner().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = TubelyConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.inner().storage
    }

    pub fn ingest(&self) -> &IngestSettings {
        &self.inner().ingest
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.inner().ingest.max_upload_bytes
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.inner().ingest.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.inner().ingest.ffprobe_path
    }
}

fn is_production_env(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

impl TubelyConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let base = BaseConfig {
            server_port: match var("PORT") {
                Some(port) => port
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
                None => SERVER_PORT,
            },
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: var("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
        };

        let database_url =
            var("DATABASE_URL").ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let bucket = var("S3_BUCKET").ok_or_else(|| anyhow::anyhow!("S3_BUCKET must be set"))?;
        let region = var("S3_REGION")
            .or_else(|| var("AWS_REGION"))
            .ok_or_else(|| anyhow::anyhow!("S3_REGION or AWS_REGION must be set"))?;
        let endpoint = var("S3_ENDPOINT").filter(|e| !e.trim().is_empty());
        let distribution_origin = var("DISTRIBUTION_ORIGIN")
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| default_origin(&bucket, &region, endpoint.as_deref()));

        let storage = StorageSettings {
            bucket,
            region,
            endpoint,
            distribution_origin,
        };

        let ingest = IngestSettings {
            max_upload_bytes: MAX_UPLOAD_SIZE,
            ffmpeg_path: var("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe_path: var("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            staging_dir: var("STAGING_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
        };

        Ok(TubelyConfig {
            base,
            database_url,
            storage,
            ingest,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        let origin = &self.storage.distribution_origin;
        if !origin.starts_with("https://") && !origin.starts_with("http://") {
            return Err(anyhow::anyhow!(
                "DISTRIBUTION_ORIGIN must be an absolute http(s) URL"
            ));
        }

        if is_production_env(&self.base.environment) && origin.starts_with("http://") {
            return Err(anyhow::anyhow!(
                "DISTRIBUTION_ORIGIN must use https in production"
            ));
        }

        // A missing staging dir is created at startup; anything else in the way is fatal.
        if let Some(ref dir) = self.ingest.staging_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(anyhow::anyhow!(
                    "STAGING_DIR '{}' exists and is not a directory",
                    dir.display()
                ));
            }
        }

        Ok(())
    }
}

/// Public origin used when no distribution origin is configured.
///
/// AWS buckets resolve to `https://{bucket}.s3.{region}.amazonaws.com`; S3-compatible
/// providers use path-style `{endpoint}/{bucket}`.
fn default_origin(bucket: &str, region: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}
