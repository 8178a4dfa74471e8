//! Video ingestion pipeline.
//!
//! An upload moves through a fixed sequence of stages:
//!
//! ```text
//! receive -> staging -> probe -> classify -> optimize -> upload -> persist
//! ```
//!
//! Each stage consumes the previous state and yields the next one, or a
//! [`Failed`] naming the stage that stopped the run. Every staged file is owned
//! by exactly one state at a time and is released by the stage that consumes it,
//! so no temporary file outlives a request whichever way it ends.

use crate::aspect::{self, ClassificationError};
use crate::optimize::{OptimizationError, Optimizer};
use crate::probe::{ProbeError, ProbeResult, Prober};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tubely_core::constants::{ACCEPTED_VIDEO_CONTENT_TYPE, MAX_UPLOAD_SIZE};
use tubely_core::{AppError, IngestSettings, OrientationBucket, Video};
use tubely_db::VideoRepository;
use tubely_storage::{StagedFile, StagingError, StagingStore, Storage, StorageError, StoredObject};
use uuid::Uuid;

/// Immutable settings for an [`IngestPipeline`].
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub max_upload_bytes: u64,
    pub accepted_content_type: String,
    pub staging_dir: PathBuf,
}

impl IngestConfig {
    pub fn from_settings(settings: &IngestSettings) -> Self {
        Self {
            max_upload_bytes: settings.max_upload_bytes,
            staging_dir: settings
                .staging_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            ..Self::default()
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_SIZE,
            accepted_content_type: ACCEPTED_VIDEO_CONTENT_TYPE.to_string(),
            staging_dir: std::env::temp_dir(),
        }
    }
}

/// One upload as handed over by the transport layer.
pub struct UploadRequest<R> {
    pub video_id: Uuid,
    /// Authenticated caller.
    pub principal: Uuid,
    /// Declared MIME type of the uploaded part.
    pub content_type: Option<String>,
    pub body: R,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Receive,
    Staging,
    Probe,
    Classify,
    Optimize,
    Upload,
    Persist,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Receive => "receive",
            PipelineStage::Staging => "staging",
            PipelineStage::Probe => "probe",
            PipelineStage::Classify => "classify",
            PipelineStage::Optimize => "optimize",
            PipelineStage::Upload => "upload",
            PipelineStage::Persist => "persist",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Couldn't find video {0}")]
    VideoNotFound(Uuid),

    #[error("Couldn't load video: {0}")]
    Lookup(#[source] AppError),

    #[error("User is not the owner of this video")]
    NotOwner,

    #[error("Invalid file type {actual:?}, expected {expected}")]
    InvalidContentType {
        actual: Option<String>,
        expected: String,
    },

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Optimization(#[from] OptimizationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Couldn't update video: {0}")]
    Persistence(#[source] AppError),
}

/// Terminal state of a run that did not complete.
#[derive(Debug, thiserror::Error)]
#[error("ingest failed at {stage}: {cause}")]
pub struct Failed {
    pub stage: PipelineStage,
    #[source]
    pub cause: IngestError,
}

impl Failed {
    pub fn new(stage: PipelineStage, cause: impl Into<IngestError>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

impl From<Failed> for AppError {
    fn from(failed: Failed) -> Self {
        match failed.cause {
            IngestError::VideoNotFound(_) => AppError::NotFound("Couldn't find video".to_string()),
            IngestError::Lookup(e) | IngestError::Persistence(e) => e,
            IngestError::NotOwner => {
                AppError::Unauthorized("Not authorized to update this video".to_string())
            }
            IngestError::InvalidContentType { expected, .. } => {
                AppError::InvalidInput(format!("Invalid file type, only {} is allowed", expected))
            }
            IngestError::Staging(StagingError::PayloadTooLarge { limit }) => {
                AppError::PayloadTooLarge(format!("Upload exceeds the {} byte limit", limit))
            }
            IngestError::Staging(StagingError::Read(e)) => {
                AppError::BadRequest(format!("Couldn't read upload: {}", e))
            }
            IngestError::Staging(e) => AppError::Internal(e.to_string()),
            IngestError::Probe(e) => AppError::MediaProcessing(e.to_string()),
            IngestError::Classification(e) => AppError::MediaProcessing(e.to_string()),
            IngestError::Optimization(e) => AppError::MediaProcessing(e.to_string()),
            IngestError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}

/// Ownership and content type checked, nothing on disk yet.
#[derive(Debug)]
pub struct Received {
    video: Video,
    content_type: String,
}

/// Raw upload copied to local disk.
#[derive(Debug)]
pub struct Staged {
    video: Video,
    content_type: String,
    raw: StagedFile,
}

#[derive(Debug)]
pub struct Probed {
    video: Video,
    content_type: String,
    raw: StagedFile,
    probe: ProbeResult,
}

#[derive(Debug)]
pub struct Classified {
    video: Video,
    content_type: String,
    raw: StagedFile,
    bucket: OrientationBucket,
}

/// Raw upload released, fast-start copy staged.
#[derive(Debug)]
pub struct Optimized {
    video: Video,
    content_type: String,
    optimized: StagedFile,
    bucket: OrientationBucket,
}

/// Durably stored, local files released.
#[derive(Debug)]
pub struct Uploaded {
    video: Video,
    object: StoredObject,
}

/// Successful end of a run.
#[derive(Debug, Clone)]
pub struct Persisted {
    pub video: Video,
    pub object: StoredObject,
}

/// Drives one upload from request to persisted metadata.
pub struct IngestPipeline {
    config: IngestConfig,
    staging: StagingStore,
    prober: Arc<dyn Prober>,
    optimizer: Arc<dyn Optimizer>,
    storage: Arc<dyn Storage>,
    videos: Arc<dyn VideoRepository>,
}

impl IngestPipeline {
    pub fn new(
        config: IngestConfig,
        prober: Arc<dyn Prober>,
        optimizer: Arc<dyn Optimizer>,
        storage: Arc<dyn Storage>,
        videos: Arc<dyn VideoRepository>,
    ) -> Self {
        let staging = StagingStore::new(config.staging_dir.clone());
        Self {
            config,
            staging,
            prober,
            optimizer,
            storage,
            videos,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run an upload through every stage.
    ///
    /// The body is only read once the caller is known to own the video and the
    /// declared content type is acceptable.
    #[tracing::instrument(skip(self, request), fields(video_id = %request.video_id, user_id = %request.principal))]
    pub async fn ingest<R>(&self, request: UploadRequest<R>) -> Result<Persisted, Failed>
    where
        R: AsyncRead + Unpin + Send,
    {
        let start = std::time::Instant::now();
        let UploadRequest {
            video_id,
            principal,
            content_type,
            body,
        } = request;

        let result = async {
            let received = self.receive(video_id, principal, content_type).await?;
            let staged = self.stage(received, body).await?;
            let probed = self.probe(staged).await?;
            let classified = self.classify(probed).await?;
            let optimized = self.optimize(classified).await?;
            let uploaded = self.upload(optimized).await?;
            self.persist(uploaded).await
        }
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(persisted) => tracing::info!(
                key = %persisted.object.key,
                url = %persisted.object.url,
                duration_ms,
                "Video ingested"
            ),
            Err(failed) => tracing::warn!(
                stage = %failed.stage,
                error = %failed.cause,
                duration_ms,
                "Video ingest failed"
            ),
        }

        result
    }

    async fn receive(
        &self,
        video_id: Uuid,
        principal: Uuid,
        content_type: Option<String>,
    ) -> Result<Received, Failed> {
        let fail = |cause: IngestError| Failed::new(PipelineStage::Receive, cause);

        let video = self
            .videos
            .get_video(video_id)
            .await
            .map_err(|e| fail(IngestError::Lookup(e)))?
            .ok_or_else(|| fail(IngestError::VideoNotFound(video_id)))?;

        if !video.is_owned_by(principal) {
            return Err(fail(IngestError::NotOwner));
        }

        let normalized = content_type.as_deref().map(normalize_mime_type);
        match normalized {
            Some(ref mime) if *mime == self.config.accepted_content_type => Ok(Received {
                video,
                content_type: self.config.accepted_content_type.clone(),
            }),
            _ => Err(fail(IngestError::InvalidContentType {
                actual: content_type,
                expected: self.config.accepted_content_type.clone(),
            })),
        }
    }

    async fn stage<R>(&self, received: Received, body: R) -> Result<Staged, Failed>
    where
        R: AsyncRead + Unpin + Send,
    {
        let Received {
            video,
            content_type,
        } = received;

        let raw = self
            .staging
            .stage(body, self.config.max_upload_bytes)
            .await
            .map_err(|e| Failed::new(PipelineStage::Staging, e))?;

        Ok(Staged {
            video,
            content_type,
            raw,
        })
    }

    async fn probe(&self, staged: Staged) -> Result<Probed, Failed> {
        let Staged {
            video,
            content_type,
            mut raw,
        } = staged;

        match self.prober.probe(&raw).await {
            Ok(probe) => Ok(Probed {
                video,
                content_type,
                raw,
                probe,
            }),
            Err(e) => {
                release(&mut raw).await;
                Err(Failed::new(PipelineStage::Probe, e))
            }
        }
    }

    async fn classify(&self, probed: Probed) -> Result<Classified, Failed> {
        let Probed {
            video,
            content_type,
            mut raw,
            probe,
        } = probed;

        match aspect::classify(&probe) {
            Ok(bucket) => {
                tracing::debug!(
                    width = probe.width,
                    height = probe.height,
                    orientation = %bucket,
                    "Video classified"
                );
                Ok(Classified {
                    video,
                    content_type,
                    raw,
                    bucket,
                })
            }
            Err(e) => {
                release(&mut raw).await;
                Err(Failed::new(PipelineStage::Classify, e))
            }
        }
    }

    async fn optimize(&self, classified: Classified) -> Result<Optimized, Failed> {
        let Classified {
            video,
            content_type,
            mut raw,
            bucket,
        } = classified;

        let result = self.optimizer.optimize(&raw).await;
        // Only the optimized copy is stored.
        release(&mut raw).await;

        match result {
            Ok(optimized) => Ok(Optimized {
                video,
                content_type,
                optimized,
                bucket,
            }),
            Err(e) => Err(Failed::new(PipelineStage::Optimize, e)),
        }
    }

    async fn upload(&self, optimized: Optimized) -> Result<Uploaded, Failed> {
        let Optimized {
            video,
            content_type,
            mut optimized,
            bucket,
        } = optimized;

        let result = self
            .storage
            .put(bucket, &mut optimized, &content_type)
            .await;
        release(&mut optimized).await;

        match result {
            Ok(object) => Ok(Uploaded { video, object }),
            Err(e) => Err(Failed::new(PipelineStage::Upload, e)),
        }
    }

    async fn persist(&self, uploaded: Uploaded) -> Result<Persisted, Failed> {
        let Uploaded { mut video, object } = uploaded;
        video.set_video_url(object.url.clone());

        if let Err(e) = self.videos.update_video(&video).await {
            // Nothing references the object now; it is left for out-of-band cleanup.
            tracing::error!(
                error = %e,
                video_id = %video.id,
                key = %object.key,
                "Stored object orphaned, video update failed"
            );
            return Err(Failed::new(PipelineStage::Persist, IngestError::Persistence(e)));
        }

        Ok(Persisted { video, object })
    }
}

/// Strip parameters and normalize case: `Video/MP4; codecs=avc1` -> `video/mp4`.
fn normalize_mime_type(mime: &str) -> String {
    mime.split(';').next().unwrap_or(mime).trim().to_lowercase()
}

async fn release(file: &mut StagedFile) {
    if let Err(e) = file.release().await {
        tracing::warn!(
            error = %e,
            path = %file.path().display(),
            "Failed to release staged file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectPath;
    use object_store::{GetOptions, ObjectStore};
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::ReadBuf;
    use tubely_core::ErrorMetadata;
    use tubely_db::test_helpers::MockVideoRepository;
    use tubely_storage::{KeyGenerator, ObjectKey, ObjectStorage, StorageResult};

    const BODY: &[u8] = b"\x00\x00\x00\x18ftypmp42 pretend this is a movie";

    struct StaticProber(ProbeResult);

    #[async_trait]
    impl Prober for StaticProber {
        async fn probe(&self, file: &StagedFile) -> Result<ProbeResult, ProbeError> {
            assert!(file.path().exists());
            Ok(self.0.clone())
        }
    }

    struct FailingProber;

    #[async_trait]
    impl Prober for FailingProber {
        async fn probe(&self, _file: &StagedFile) -> Result<ProbeResult, ProbeError> {
            Err(ProbeError::NoVideoStream)
        }
    }

    /// Copies the input into a fresh staged file, prefixed with a marker.
    struct CopyOptimizer {
        staging: StagingStore,
    }

    #[async_trait]
    impl Optimizer for CopyOptimizer {
        async fn optimize(&self, input: &StagedFile) -> Result<StagedFile, OptimizationError> {
            let mut output = self.staging.allocate("PROCESSING").await?;
            let mut contents = b"faststart:".to_vec();
            contents.extend(tokio::fs::read(input.path()).await?);
            tokio::fs::write(output.path(), contents).await?;
            output.reopen().await?;
            Ok(output)
        }
    }

    struct FailingOptimizer;

    #[async_trait]
    impl Optimizer for FailingOptimizer {
        async fn optimize(&self, _input: &StagedFile) -> Result<StagedFile, OptimizationError> {
            Err(OptimizationError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "moov atom not found",
            )))
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn put(
            &self,
            _bucket: OrientationBucket,
            _file: &mut StagedFile,
            _content_type: &str,
        ) -> StorageResult<StoredObject> {
            Err(StorageError::UploadFailed("bucket unreachable".to_string()))
        }
    }

    struct FixedKey;

    impl KeyGenerator for FixedKey {
        fn generate(&self, bucket: OrientationBucket) -> ObjectKey {
            ObjectKey::new(bucket, "fixed")
        }
    }

    /// Records whether the body was ever polled.
    struct WatchedBody {
        touched: Arc<AtomicBool>,
    }

    impl AsyncRead for WatchedBody {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.touched.store(true, Ordering::SeqCst);
            Poll::Ready(Ok(()))
        }
    }

    struct Harness {
        dir: TempDir,
        repo: MockVideoRepository,
        store: Arc<InMemory>,
        owner: Uuid,
        video: Video,
    }

    impl Harness {
        fn new() -> Self {
            let repo = MockVideoRepository::new();
            let owner = Uuid::new_v4();
            let video = repo.create_video(owner, "Boots");
            Self {
                dir: TempDir::new().unwrap(),
                repo,
                store: Arc::new(InMemory::new()),
                owner,
                video,
            }
        }

        fn config(&self) -> IngestConfig {
            IngestConfig {
                staging_dir: self.dir.path().to_path_buf(),
                ..IngestConfig::default()
            }
        }

        fn object_storage(&self) -> Arc<dyn Storage> {
            Arc::new(ObjectStorage::new(
                self.store.clone(),
                "tubely-test",
                "https://cdn.example.com",
                Arc::new(FixedKey),
            ))
        }

        fn pipeline_with(
            &self,
            config: IngestConfig,
            prober: Arc<dyn Prober>,
            optimizer: Arc<dyn Optimizer>,
            storage: Arc<dyn Storage>,
        ) -> IngestPipeline {
            IngestPipeline::new(config, prober, optimizer, storage, Arc::new(self.repo.clone()))
        }

        fn pipeline(&self, width: u32, height: u32, dar: Option<&str>) -> IngestPipeline {
            self.pipeline_with(
                self.config(),
                Arc::new(StaticProber(ProbeResult {
                    width,
                    height,
                    display_aspect_ratio: dar.map(str::to_string),
                })),
                self.optimizer(),
                self.object_storage(),
            )
        }

        fn optimizer(&self) -> Arc<dyn Optimizer> {
            Arc::new(CopyOptimizer {
                staging: StagingStore::new(self.dir.path()),
            })
        }

        fn request<'a>(&self, body: &'a [u8]) -> UploadRequest<&'a [u8]> {
            UploadRequest {
                video_id: self.video.id,
                principal: self.owner,
                content_type: Some("video/mp4".to_string()),
                body,
            }
        }

        fn staged_files(&self) -> usize {
            std::fs::read_dir(self.dir.path()).unwrap().count()
        }

        async fn stored(&self, key: &str) -> Option<Vec<u8>> {
            match self
                .store
                .get_opts(&ObjectPath::from(key), GetOptions::default())
                .await
            {
                Ok(result) => Some(result.bytes().await.unwrap().to_vec()),
                Err(object_store::Error::NotFound { .. }) => None,
                Err(e) => panic!("unexpected store error: {e}"),
            }
        }
    }

    #[tokio::test]
    async fn test_landscape_upload_end_to_end() {
        let h = Harness::new();
        let persisted = h
            .pipeline(1920, 1080, Some("16:9"))
            .ingest(h.request(BODY))
            .await
            .unwrap();

        assert_eq!(persisted.object.key, "landscape/fixed.mp4");
        assert_eq!(
            persisted.object.url,
            "https://cdn.example.com/landscape/fixed.mp4"
        );
        assert_eq!(persisted.video.video_url.as_deref(), Some(persisted.object.url.as_str()));

        let stored = h.stored("landscape/fixed.mp4").await.unwrap();
        let mut expected = b"faststart:".to_vec();
        expected.extend_from_slice(BODY);
        assert_eq!(stored, expected);

        let saved = h.repo.video(h.video.id).unwrap();
        assert_eq!(saved.video_url, persisted.video.video_url);
        assert_eq!(saved.title, "Boots");
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_buckets_follow_orientation() {
        for (width, height, dar, prefix) in [
            (1080, 1920, None, "portrait/"),
            (1000, 1000, None, "other/"),
            (1440, 1080, Some("16:9"), "landscape/"),
            (1920, 1080, Some("N/A"), "landscape/"),
        ] {
            let h = Harness::new();
            let persisted = h
                .pipeline(width, height, dar)
                .ingest(h.request(BODY))
                .await
                .unwrap();
            assert!(
                persisted.object.key.starts_with(prefix),
                "{width}x{height} {dar:?} -> {}",
                persisted.object.key
            );
            assert_eq!(h.staged_files(), 0);
        }
    }

    #[tokio::test]
    async fn test_content_type_parameters_are_ignored() {
        let h = Harness::new();
        let mut request = h.request(BODY);
        request.content_type = Some("Video/MP4; codecs=\"avc1.42E01E\"".to_string());

        let persisted = h.pipeline(1920, 1080, None).ingest(request).await.unwrap();
        assert!(h.stored(&persisted.object.key).await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_video() {
        let h = Harness::new();
        let mut request = h.request(BODY);
        request.video_id = Uuid::new_v4();

        let failed = h.pipeline(1920, 1080, None).ingest(request).await.unwrap_err();
        assert_eq!(failed.stage, PipelineStage::Receive);
        assert!(matches!(failed.cause, IngestError::VideoNotFound(_)));
        assert_eq!(AppError::from(failed).http_status_code(), 404);
    }

    #[tokio::test]
    async fn test_non_owner_is_rejected_before_reading_body() {
        let h = Harness::new();
        let touched = Arc::new(AtomicBool::new(false));
        let request = UploadRequest {
            video_id: h.video.id,
            principal: Uuid::new_v4(),
            content_type: Some("video/mp4".to_string()),
            body: WatchedBody {
                touched: touched.clone(),
            },
        };

        let failed = h.pipeline(1920, 1080, None).ingest(request).await.unwrap_err();
        assert_eq!(failed.stage, PipelineStage::Receive);
        assert!(matches!(failed.cause, IngestError::NotOwner));
        assert!(!touched.load(Ordering::SeqCst));
        assert_eq!(h.staged_files(), 0);
        assert_eq!(AppError::from(failed).http_status_code(), 401);
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_rejected_before_reading_body() {
        for content_type in [Some("video/quicktime"), Some("image/png"), None] {
            let h = Harness::new();
            let touched = Arc::new(AtomicBool::new(false));
            let request = UploadRequest {
                video_id: h.video.id,
                principal: h.owner,
                content_type: content_type.map(str::to_string),
                body: WatchedBody {
                    touched: touched.clone(),
                },
            };

            let failed = h.pipeline(1920, 1080, None).ingest(request).await.unwrap_err();
            assert_eq!(failed.stage, PipelineStage::Receive);
            assert!(matches!(failed.cause, IngestError::InvalidContentType { .. }));
            assert!(!touched.load(Ordering::SeqCst));
            assert_eq!(AppError::from(failed).http_status_code(), 400);
        }
    }

    #[tokio::test]
    async fn test_oversized_upload() {
        let h = Harness::new();
        let config = IngestConfig {
            max_upload_bytes: 16,
            ..h.config()
        };
        let pipeline = h.pipeline_with(
            config,
            Arc::new(StaticProber(ProbeResult {
                width: 1920,
                height: 1080,
                display_aspect_ratio: None,
            })),
            h.optimizer(),
            h.object_storage(),
        );

        let failed = pipeline.ingest(h.request(BODY)).await.unwrap_err();
        assert_eq!(failed.stage, PipelineStage::Staging);
        assert!(matches!(
            failed.cause,
            IngestError::Staging(StagingError::PayloadTooLarge { limit: 16 })
        ));
        assert_eq!(h.staged_files(), 0);
        assert!(h.repo.video(h.video.id).unwrap().video_url.is_none());

        let err = AppError::from(failed);
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_probe_failure_cleans_up() {
        let h = Harness::new();
        let pipeline = h.pipeline_with(
            h.config(),
            Arc::new(FailingProber),
            h.optimizer(),
            h.object_storage(),
        );

        let failed = pipeline.ingest(h.request(BODY)).await.unwrap_err();
        assert_eq!(failed.stage, PipelineStage::Probe);
        assert_eq!(h.staged_files(), 0);
        assert_eq!(AppError::from(failed).http_status_code(), 500);
    }

    #[tokio::test]
    async fn test_degenerate_geometry_cleans_up() {
        let h = Harness::new();
        let failed = h
            .pipeline(0, 1080, Some("16:9"))
            .ingest(h.request(BODY))
            .await
            .unwrap_err();

        assert_eq!(failed.stage, PipelineStage::Classify);
        assert!(matches!(
            failed.cause,
            IngestError::Classification(ClassificationError::DegenerateGeometry { .. })
        ));
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn test_optimize_failure_cleans_up() {
        let h = Harness::new();
        let pipeline = h.pipeline_with(
            h.config(),
            Arc::new(StaticProber(ProbeResult {
                width: 1080,
                height: 1920,
                display_aspect_ratio: None,
            })),
            Arc::new(FailingOptimizer),
            h.object_storage(),
        );

        let failed = pipeline.ingest(h.request(BODY)).await.unwrap_err();
        assert_eq!(failed.stage, PipelineStage::Optimize);
        assert_eq!(h.staged_files(), 0);
        assert!(h.stored("portrait/fixed.mp4").await.is_none());
    }

    #[tokio::test]
    async fn test_upload_failure_leaves_metadata_untouched() {
        let h = Harness::new();
        let pipeline = h.pipeline_with(
            h.config(),
            Arc::new(StaticProber(ProbeResult {
                width: 1920,
                height: 1080,
                display_aspect_ratio: None,
            })),
            h.optimizer(),
            Arc::new(FailingStorage),
        );

        let failed = pipeline.ingest(h.request(BODY)).await.unwrap_err();
        assert_eq!(failed.stage, PipelineStage::Upload);
        assert_eq!(h.staged_files(), 0);
        assert!(h.repo.video(h.video.id).unwrap().video_url.is_none());

        let err = AppError::from(failed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }

    #[tokio::test]
    async fn test_persist_failure_orphans_object() {
        let h = Harness::new();
        h.repo.fail_updates();

        let failed = h
            .pipeline(1920, 1080, None)
            .ingest(h.request(BODY))
            .await
            .unwrap_err();

        assert_eq!(failed.stage, PipelineStage::Persist);
        assert!(matches!(failed.cause, IngestError::Persistence(_)));
        assert_eq!(h.staged_files(), 0);
        // The object was written before the update failed.
        assert!(h.stored("landscape/fixed.mp4").await.is_some());
        assert!(h.repo.video(h.video.id).unwrap().video_url.is_none());
    }

    #[test]
    fn test_normalize_mime_type() {
        assert_eq!(normalize_mime_type("video/mp4"), "video/mp4");
        assert_eq!(normalize_mime_type(" VIDEO/MP4 ; codecs=avc1"), "video/mp4");
        assert_eq!(normalize_mime_type(""), "");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = IngestSettings {
            max_upload_bytes: 42,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            staging_dir: Some(PathBuf::from("/var/tmp/tubely")),
        };
        let config = IngestConfig::from_settings(&settings);
        assert_eq!(config.max_upload_bytes, 42);
        assert_eq!(config.accepted_content_type, "video/mp4");
        assert_eq!(config.staging_dir, PathBuf::from("/var/tmp/tubely"));
    }
}
