use std::collections::BTreeMap;

use serde::Deserialize;

/// One entry of `yt-dlp --dump-json` for a single video
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
}

impl VideoInfo {
    pub fn author(&self) -> String {
        self.uploader
            .clone()
            .or_else(|| self.channel.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// One element of the `formats` array
#[derive(Debug, Clone, Deserialize)]
pub struct FormatInfo {
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    /// Headers yt-dlp expects on the media request (User-Agent, Referer...)
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

impl FormatInfo {
    fn has_codec(codec: &Option<String>) -> bool {
        codec
            .as_deref()
            .is_some_and(|c| !c.is_empty() && c != "none")
    }

    pub fn is_video_only(&self) -> bool {
        Self::has_codec(&self.vcodec) && !Self::has_codec(&self.acodec)
    }

    pub fn is_audio_only(&self) -> bool {
        !Self::has_codec(&self.vcodec) && Self::has_codec(&self.acodec)
    }

    /// Plain HTTP(S) media. HLS and DASH entries point at manifests instead.
    pub fn is_direct(&self) -> bool {
        matches!(self.protocol.as_deref(), None | Some("https" | "http"))
    }
}

/// One line of `yt-dlp --flat-playlist --dump-json ytsearchN:...`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEntry {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Configuration for the provider client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub ytdlp_program: String,
    pub search_limit: u32,
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            ytdlp_program: "yt-dlp".to_string(),
            search_limit: 10,
            connect_timeout_secs: 30,
        }
    }
}
