//! Aspect ratio classification.
//!
//! A video is `landscape` when its reduced ratio is exactly 16:9, `portrait` when it
//! is exactly 9:16 and `other` for everything else. The display aspect ratio from
//! the probe wins over raw pixel dimensions, so anamorphic streams land in the
//! bucket they are actually shown in.

use crate::probe::ProbeResult;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tubely_core::OrientationBucket;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    #[error("invalid video geometry {width}x{height}")]
    DegenerateGeometry { width: u32, height: u32 },

    #[error("invalid aspect ratio {0:?}")]
    InvalidRatio(String),
}

/// A ratio reduced to lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    pub fn new(width: u32, height: u32) -> Result<Self, ClassificationError> {
        if width == 0 || height == 0 {
            return Err(ClassificationError::DegenerateGeometry { width, height });
        }
        let divisor = gcd(width, height);
        Ok(Self {
            width: width / divisor,
            height: height / divisor,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn orientation(&self) -> OrientationBucket {
        match *self {
            Self::LANDSCAPE => OrientationBucket::Landscape,
            Self::PORTRAIT => OrientationBucket::Portrait,
            _ => OrientationBucket::Other,
        }
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = ClassificationError;

    /// Parses `W:H` (ffprobe style) or `W/H`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClassificationError::InvalidRatio(s.to_string());
        let (w, h) = s.trim().split_once([':', '/']).ok_or_else(invalid)?;
        let w = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let h = h.trim().parse::<u32>().map_err(|_| invalid())?;
        AspectRatio::new(w, h).map_err(|_| invalid())
    }
}

/// Greatest common divisor, Euclid's algorithm. `gcd(0, n) == n`.
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Map probed geometry onto an orientation bucket.
///
/// Zero width or height always fails, whatever the reported display ratio. A
/// missing or unusable display ratio (`"N/A"`, `"0:1"`) falls back to the pixel
/// dimensions.
pub fn classify(probe: &ProbeResult) -> Result<OrientationBucket, ClassificationError> {
    let from_dimensions = AspectRatio::new(probe.width, probe.height)?;

    let ratio = match probe.display_aspect_ratio.as_deref() {
        Some(dar) => dar.parse::<AspectRatio>().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Ignoring display aspect ratio, using dimensions");
            from_dimensions
        }),
        None => from_dimensions,
    };

    Ok(ratio.orientation())
}
