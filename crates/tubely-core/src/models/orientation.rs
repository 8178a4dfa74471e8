use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Coarse classification of a video's display aspect ratio.
///
/// The lowercase name doubles as the object key prefix for stored videos.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrientationBucket {
    Landscape,
    Portrait,
    Other,
}

impl OrientationBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrientationBucket::Landscape => "landscape",
            OrientationBucket::Portrait => "portrait",
            OrientationBucket::Other => "other",
        }
    }

    /// Key prefix including the trailing separator, e.g. `landscape/`.
    pub fn key_prefix(&self) -> String {
        format!("{}/", self.as_str())
    }
}

impl Display for OrientationBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefixes() {
        assert_eq!(OrientationBucket::Landscape.key_prefix(), "landscape/");
        assert_eq!(OrientationBucket::Portrait.key_prefix(), "portrait/");
        assert_eq!(OrientationBucket::Other.key_prefix(), "other/");
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&OrientationBucket::Portrait).unwrap();
        assert_eq!(json, "\"portrait\"");
    }
}
