//! Application-wide constants.

/// Hard cap on a single video upload body: 1 GiB.
pub const MAX_UPLOAD_SIZE: u64 = 1 << 30;

/// The only container type accepted for video uploads.
pub const ACCEPTED_VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Multipart form field carrying the video file.
pub const VIDEO_FORM_FIELD: &str = "video";

/// Extension appended to every stored video object key.
pub const VIDEO_FILE_EXTENSION: &str = "mp4";

/// Issuer embedded in (and required of) access tokens.
pub const TOKEN_ISSUER: &str = "tubely-access";
