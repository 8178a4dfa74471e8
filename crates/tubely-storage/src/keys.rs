//! Object key generation.
//!
//! Key format: `{bucket}/{id}.mp4`, see the crate root documentation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tubely_core::constants::VIDEO_FILE_EXTENSION;
use tubely_core::OrientationBucket;

/// Random bytes per key: 256 bits.
const KEY_ENTROPY_BYTES: usize = 32;

/// Storage key for a single stored video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Build a key from a bucket and an already URL-safe identifier.
    pub fn new(bucket: OrientationBucket, id: &str) -> Self {
        ObjectKey(format!(
            "{}{}.{}",
            bucket.key_prefix(),
            id,
            VIDEO_FILE_EXTENSION
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Source of fresh object keys.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self, bucket: OrientationBucket) -> ObjectKey;
}

/// Keys with 256 random bits, unpadded base64url encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self, bucket: OrientationBucket) -> ObjectKey {
        let bytes: [u8; KEY_ENTROPY_BYTES] = rand::random();
        ObjectKey::new(bucket, &URL_SAFE_NO_PAD.encode(bytes))
    }
}
