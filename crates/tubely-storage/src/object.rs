use crate::keys::KeyGenerator;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StagedFile;
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tubely_core::{OrientationBucket, StorageSettings};

/// Durable video storage on top of any `object_store` backend.
///
/// Production uses S3 (or an S3-compatible provider); tests plug in
/// `object_store::memory::InMemory`.
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    origin: String,
    keys: Arc<dyn KeyGenerator>,
}

impl ObjectStorage {
    /// Create a storage over an existing object store.
    ///
    /// # Arguments
    /// * `bucket` - bucket name, used for logging only
    /// * `origin` - public distribution origin; canonical URLs are `{origin}/{key}`
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        origin: impl Into<String>,
        keys: Arc<dyn KeyGenerator>,
    ) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        Self {
            store,
            bucket: bucket.into(),
            origin,
            keys,
        }
    }

    /// Create an S3-backed storage.
    ///
    /// Credentials come from the standard AWS environment variables; a custom
    /// endpoint switches to an S3-compatible provider (e.g. MinIO on `http://localhost:9000`).
    pub fn s3(settings: &StorageSettings, keys: Arc<dyn KeyGenerator>) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone());

        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self::new(
            Arc::new(store),
            settings.bucket.clone(),
            settings.distribution_origin.clone(),
            keys,
        ))
    }

    /// Canonical URL for a stored key.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.origin, key)
    }
}

#[async_trait]
impl Storage for ObjectStorage {
    #[tracing::instrument(skip(self, file, bucket), fields(storage.bucket = %self.bucket, orientation = %bucket))]
    async fn put(
        &self,
        bucket: OrientationBucket,
        file: &mut StagedFile,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let key = self.keys.generate(bucket).into_string();
        let start = std::time::Instant::now();

        let reader = file.rewind().await?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let mut writer = BufWriter::new(Arc::clone(&self.store), Path::from(key.as_str()))
            .with_attributes(attributes);

        let uploaded = match tokio::io::copy(reader, &mut writer).await {
            Ok(size) => writer.shutdown().await.map(|_| size),
            Err(e) => Err(e),
        };

        let size = match uploaded {
            Ok(size) => size,
            Err(e) => {
                // Drop any parts already sent so the key never becomes visible.
                if let Err(abort_err) = writer.abort().await {
                    tracing::debug!(error = %abort_err, key = %key, "Abort after failed upload failed");
                }
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Object upload failed"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        };

        let url = self.url_for(&key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis() as u64,
            "Object upload successful"
        );

        Ok(StoredObject { key, url })
    }
}
