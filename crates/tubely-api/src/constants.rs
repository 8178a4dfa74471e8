//! HTTP surface constants.

/// Health check route.
pub const HEALTH_PATH: &str = "/health";

/// Video upload route; `video_id` is the record the upload is attached to.
pub const UPLOAD_PATH: &str = "/videos/{video_id}/upload";

/// Allowance for multipart framing on top of the upload cap, so oversized
/// files are rejected by staging rather than by the transport.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Server-wide cap on in-flight requests.
pub const HTTP_CONCURRENCY_LIMIT: usize = 1024;
