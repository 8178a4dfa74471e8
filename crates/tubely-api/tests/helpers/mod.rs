//! Test helpers: build AppState and router for integration tests.
//!
//! No external services are needed: metadata lives in `MockVideoRepository`,
//! objects in `object_store`'s in-memory store, and ffprobe/ffmpeg are replaced
//! by in-process fakes. Run with `cargo test -p tubely-api`.

#![allow(dead_code)]

pub mod auth;

use async_trait::async_trait;
use axum_test::TestServer;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{GetOptions, ObjectStore};
use std::sync::Arc;
use tempfile::TempDir;
use tubely_api::setup::routes;
use tubely_api::AppState;
use tubely_db::test_helpers::MockVideoRepository;
use tubely_processing::{
    IngestConfig, IngestPipeline, OptimizationError, Optimizer, ProbeError, ProbeResult, Prober,
};
use tubely_storage::{ObjectStorage, RandomKeyGenerator, StagedFile, StagingStore};

/// Public origin used for stored video URLs in tests.
pub const TEST_ORIGIN: &str = "https://cdn.tubely.test";

/// Reports a fixed geometry for every file.
pub struct StaticProber(pub ProbeResult);

#[async_trait]
impl Prober for StaticProber {
    async fn probe(&self, _file: &StagedFile) -> Result<ProbeResult, ProbeError> {
        Ok(self.0.clone())
    }
}

/// Copies the input unchanged into a new staged file.
pub struct CopyOptimizer {
    staging: StagingStore,
}

#[async_trait]
impl Optimizer for CopyOptimizer {
    async fn optimize(&self, input: &StagedFile) -> Result<StagedFile, OptimizationError> {
        let mut output = self.staging.allocate("PROCESSING").await?;
        tokio::fs::copy(input.path(), output.path()).await?;
        output.reopen().await?;
        Ok(output)
    }
}

/// Knobs for a test application.
pub struct TestOptions {
    pub width: u32,
    pub height: u32,
    pub max_upload_bytes: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            max_upload_bytes: 1024 * 1024,
        }
    }
}

/// Test application: server plus the in-memory backends behind it.
pub struct TestApp {
    pub server: TestServer,
    pub videos: MockVideoRepository,
    pub store: Arc<InMemory>,
    pub staging_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Files currently left in the staging directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging_dir.path())
            .expect("Failed to read staging dir")
            .count()
    }

    /// Bytes stored under the object key derived from a canonical URL.
    pub async fn stored_object(&self, url: &str) -> Option<Vec<u8>> {
        let key = url.strip_prefix(&format!("{}/", TEST_ORIGIN))?;
        let result = self
            .store
            .get_opts(&ObjectPath::from(key), GetOptions::default())
            .await
            .ok()?;
        Some(result.bytes().await.ok()?.to_vec())
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(TestOptions::default())
}

pub fn setup_test_app_with(options: TestOptions) -> TestApp {
    let staging_dir = tempfile::tempdir().expect("Failed to create staging dir");
    let videos = MockVideoRepository::new();
    let store = Arc::new(InMemory::new());

    let storage = ObjectStorage::new(
        store.clone(),
        "tubely-test",
        TEST_ORIGIN,
        Arc::new(RandomKeyGenerator),
    );

    let config = IngestConfig {
        max_upload_bytes: options.max_upload_bytes,
        staging_dir: staging_dir.path().to_path_buf(),
        ..IngestConfig::default()
    };

    let pipeline = IngestPipeline::new(
        config,
        Arc::new(StaticProber(ProbeResult {
            width: options.width,
            height: options.height,
            display_aspect_ratio: None,
        })),
        Arc::new(CopyOptimizer {
            staging: StagingStore::new(staging_dir.path()),
        }),
        Arc::new(storage),
        Arc::new(videos.clone()),
    );

    let state = Arc::new(AppState::new(pipeline, Arc::new(auth::validator())));
    let server = TestServer::new(routes::setup_routes(state)).expect("Failed to start test server");

    TestApp {
        server,
        videos,
        store,
        staging_dir,
    }
}
