use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AppError;
use crate::utils::parse_quality_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Typed quality metric: vertical resolution for video, bitrate for audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quality {
    Height(u32),
    Kbps(u32),
}

impl Quality {
    pub fn kind(&self) -> StreamKind {
        match self {
            Self::Height(_) => StreamKind::Video,
            Self::Kbps(_) => StreamKind::Audio,
        }
    }

    /// Parses a provider label such as "720p" or "128kbps".
    pub fn parse_label(kind: StreamKind, label: &str) -> Option<Self> {
        let value = parse_quality_label(label)?;
        Some(match kind {
            StreamKind::Video => Self::Height(value),
            StreamKind::Audio => Self::Kbps(value),
        })
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Height(v) => write!(f, "{}p", v),
            Self::Kbps(v) => write!(f, "{}kbps", v),
        }
    }
}

/// The closed list of resolutions accepted for batch downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1080p")]
    P1080,
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "144p")]
    P144,
}

impl Resolution {
    pub const ALL: [Resolution; 6] = [
        Self::P1080,
        Self::P720,
        Self::P480,
        Self::P360,
        Self::P240,
        Self::P144,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::P480 => "480p",
            Self::P360 => "360p",
            Self::P240 => "240p",
            Self::P144 => "144p",
        }
    }

    pub fn quality(&self) -> Quality {
        let height = match self {
            Self::P1080 => 1080,
            Self::P720 => 720,
            Self::P480 => 480,
            Self::P360 => 360,
            Self::P240 => 240,
            Self::P144 => 144,
        };
        Quality::Height(height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Resolution {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.label() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|r| r.label()).collect();
                AppError::InvalidSelection(format!(
                    "unknown resolution '{}', expected one of {}",
                    s.trim(),
                    known.join(", ")
                ))
            })
    }
}

/// One retrievable media variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub format_id: String,
    pub kind: StreamKind,
    pub quality: Quality,
    pub extension: String,
    pub default_filename: String,
    pub url: String,
    /// Sent with the download request.
    pub http_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct VideoHandle {
    pub id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    pub streams: Vec<StreamDescriptor>,
}

impl VideoHandle {
    pub fn streams_of(&self, kind: StreamKind) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(move |s| s.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub author: String,
    pub url: String,
}

/// Distinct qualities of one kind keyed by their 1-based display index.
#[derive(Debug, Clone)]
pub struct QualityMenu {
    kind: StreamKind,
    entries: BTreeMap<usize, Quality>,
}

impl QualityMenu {
    /// `qualities` must already be distinct and ascending.
    pub fn new(kind: StreamKind, qualities: Vec<Quality>) -> Self {
        let entries = qualities
            .into_iter()
            .enumerate()
            .map(|(i, q)| (i + 1, q))
            .collect();
        Self { kind, entries }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Quality, AppError> {
        self.entries.get(&index).copied().ok_or_else(|| {
            AppError::InvalidSelection(format!(
                "{} is not a {} quality choice (1-{})",
                index,
                self.kind,
                self.entries.len()
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Quality)> + '_ {
        self.entries.iter().map(|(i, q)| (*i, *q))
    }
}

/// What a download step left in the working directory (file names, not paths).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadedPair {
    VideoAndAudio { video: String, audio: String },
    AudioOnly { audio: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    /// Video at the chosen quality plus the provider's best audio track.
    DefaultTrack,
    /// A single audio track at the chosen bitrate.
    AudioOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualitySelection {
    MenuIndex(usize),
    Exact(Quality),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    #[default]
    AbortOnFirstFailure,
    ContinueOnFailure,
}

#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub link: String,
    pub error: AppError,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub completed: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
