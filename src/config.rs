use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::ApiConfig;
use crate::domain::{AppError, BatchPolicy, Resolution};

const CONFIG_DIR: &str = "stream-assembler";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTarget {
    /// File extension of converted audio
    pub extension: String,
    /// ffmpeg muxer name
    pub format: String,
}

impl Default for AudioTarget {
    fn default() -> Self {
        Self {
            extension: "mp3".into(),
            format: "mp3".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ytdlp_program: String,
    pub ffmpeg_program: String,
    pub search_limit: u32,
    pub video_container: String,
    pub audio_target: AudioTarget,
    pub connect_timeout_secs: u64,
    pub default_resolution: Resolution,
    pub batch_policy: BatchPolicy,
    pub output_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ytdlp_program: "yt-dlp".into(),
            ffmpeg_program: "ffmpeg".into(),
            search_limit: 10,
            video_container: "mp4".into(),
            audio_target: AudioTarget::default(),
            connect_timeout_secs: 30,
            default_resolution: Resolution::default(),
            batch_policy: BatchPolicy::default(),
            output_dir: None,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Reads `path`, or the per-user file when `path` is `None`. A missing
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let config = Self::from_json(&text).map_err(|e| {
                    AppError::Io(format!("invalid config {}: {}", path.display(), e))
                })?;
                tracing::debug!("[config] loaded {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[config] {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(AppError::Io(format!(
                "cannot read config {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            ytdlp_program: self.ytdlp_program.clone(),
            search_limit: self.search_limit,
            connect_timeout_secs: self.connect_timeout_secs,
        }
    }
}
