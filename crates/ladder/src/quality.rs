use std::fmt;
use serde::{Deserialize, Serialize};

/// Target output tier of the encoding ladder, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "180p")]
    P180,
}

/// Encoding parameters for one tier of the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingParams {
    /// Argument of the ffmpeg `scale` filter. Height `-2` keeps the aspect ratio
    /// and rounds to an even number of lines.
    pub scale: &'static str,
    /// Value passed to `-maxrate`
    pub max_bitrate: &'static str,
}

impl QualityTier {
    /// Every tier, highest resolution first
    pub const ALL: [QualityTier; 4] = [
        QualityTier::P1080,
        QualityTier::P720,
        QualityTier::P360,
        QualityTier::P180,
    ];

    /// Label used in file names (`clip_720p.mp4`)
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::P1080 => "1080p",
            QualityTier::P720 => "720p",
            QualityTier::P360 => "360p",
            QualityTier::P180 => "180p",
        }
    }

    /// Resolve a file-name label. Matching is exact and case-sensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.label() == label)
    }

    /// Look up the scale geometry and bitrate cap for this tier
    pub fn params(&self) -> EncodingParams {
        match self {
            QualityTier::P1080 => EncodingParams { scale: "1920:-2", max_bitrate: "4000k" },
            QualityTier::P720 => EncodingParams { scale: "1280:-2", max_bitrate: "2500k" },
            QualityTier::P360 => EncodingParams { scale: "640:-2", max_bitrate: "700k" },
            QualityTier::P180 => EncodingParams { scale: "320:-2", max_bitrate: "400k" },
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
