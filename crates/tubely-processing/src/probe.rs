//! Stream geometry probing via ffprobe.

use crate::process::{self, ProcessError};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsStr;
use tubely_storage::StagedFile;

/// Geometry of the first video stream in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    /// Display aspect ratio as reported by the probe, e.g. `"16:9"`.
    pub display_aspect_ratio: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("ffprobe failed: {0}")]
    Process(#[from] ProcessError),

    #[error("failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no video stream found")]
    NoVideoStream,
}

/// Reads the geometry of a staged media file.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, file: &StagedFile) -> Result<ProbeResult, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    display_aspect_ratio: Option<String>,
}

/// [`Prober`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: String,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<String>) -> Result<Self, ProcessError> {
        let ffprobe_path = ffprobe_path.into();
        process::validate_executable(&ffprobe_path)?;
        Ok(Self { ffprobe_path })
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    #[tracing::instrument(skip(self, file), fields(process.executable.name = %self.ffprobe_path, path = %file.path().display()))]
    async fn probe(&self, file: &StagedFile) -> Result<ProbeResult, ProbeError> {
        process::validate_path(&self.ffprobe_path, file.path())?;
        let start = std::time::Instant::now();

        let output = process::run(
            &self.ffprobe_path,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-print_format"),
                OsStr::new("json"),
                OsStr::new("-show_streams"),
                OsStr::new("-select_streams"),
                OsStr::new("v:0"),
                file.path().as_os_str(),
            ],
        )
        .await?;

        let result = parse_output(&output.stdout)?;

        tracing::debug!(
            width = result.width,
            height = result.height,
            display_aspect_ratio = ?result.display_aspect_ratio,
            duration_ms = start.elapsed().as_millis() as u64,
            "Video probe completed"
        );

        Ok(result)
    }
}

/// Extract the first video stream from ffprobe's JSON output.
pub(crate) fn parse_output(stdout: &[u8]) -> Result<ProbeResult, ProbeError> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout)?;

    parsed
        .streams
        .into_iter()
        .filter(|s| s.codec_type.as_deref().map_or(true, |t| t == "video"))
        .find_map(|s| match (s.width, s.height) {
            (Some(width), Some(height)) => Some(ProbeResult {
                width,
                height,
                display_aspect_ratio: s
                    .display_aspect_ratio
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty()),
            }),
            _ => None,
        })
        .ok_or(ProbeError::NoVideoStream)
}
