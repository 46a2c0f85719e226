use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::client::{ApiClient, ApiError, Result};
use super::models::{ApiConfig, FormatInfo, SearchEntry, VideoInfo};
use super::provider::VideoProvider;
use crate::domain::{Quality, SearchResult, StreamDescriptor, StreamKind, VideoHandle};
use crate::utils::sanitize_filename;

const CONNECTIVITY_MARKERS: &[&str] = &[
    "Unable to download",
    "timed out",
    "Temporary failure in name resolution",
    "Name or service not known",
    "Connection refused",
    "Connection reset",
    "Network is unreachable",
];

const LOOKUP_MARKERS: &[&str] = &[
    "Private video",
    "Sign in to confirm",
    "age-restricted",
    "Video unavailable",
    "This video is unavailable",
    "is not a valid URL",
    "Unsupported URL",
    "members-only",
];

/// Metadata through yt-dlp, bytes through [`ApiClient`].
pub struct YtDlpProvider {
    config: ApiConfig,
    client: ApiClient,
    cancel: CancellationToken,
}

impl YtDlpProvider {
    pub fn new(config: ApiConfig, cancel: CancellationToken) -> Result<Self> {
        let client = ApiClient::new(&config)?;
        Ok(Self {
            config,
            client,
            cancel,
        })
    }

    pub async fn is_available(program: &str) -> bool {
        tokio::process::Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        tracing::debug!("[yt-dlp] {} {}", self.config.ytdlp_program, args.join(" "));

        let output = tokio::process::Command::new(&self.config.ytdlp_program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ApiError::Tool {
                program: self.config.ytdlp_program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim()));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl VideoProvider for YtDlpProvider {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let search_query = format!("ytsearch{}:{}", self.config.search_limit.max(1), query);
        let stdout = self.run(&search_args(&search_query)).await?;

        let results = parse_search_output(&String::from_utf8_lossy(&stdout));
        tracing::info!("[yt-dlp] search '{}' -> {} results", query, results.len());
        Ok(results)
    }

    async fn resolve_by_link(&self, url: &str) -> Result<VideoHandle> {
        let stdout = self.run(&resolve_args(url)).await?;

        let handle = parse_video_info(&stdout, url)?;
        tracing::info!(
            "[yt-dlp] resolved {} '{}' by {} with {} streams",
            handle.id,
            handle.title,
            handle.author,
            handle.streams.len()
        );
        Ok(handle)
    }

    async fn download(
        &self,
        stream: &StreamDescriptor,
        destination: &Path,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<()> {
        let bytes = self
            .client
            .download_to_file(
                &stream.url,
                &stream.http_headers,
                destination,
                &self.cancel,
                on_progress,
            )
            .await?;
        tracing::debug!(
            "[yt-dlp] format {} -> {} ({} bytes)",
            stream.format_id,
            destination.display(),
            bytes
        );
        Ok(())
    }
}

fn search_args(search_query: &str) -> [&str; 5] {
    ["--flat-playlist", "--dump-json", "--no-warnings", "--", search_query]
}

/// `--` keeps a link starting with `-` from being read as an option.
fn resolve_args(url: &str) -> [&str; 5] {
    ["--dump-json", "--no-warnings", "--no-playlist", "--", url]
}

fn classify_failure(stderr: &str) -> ApiError {
    let message = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("yt-dlp failed")
        .to_string();

    if LOOKUP_MARKERS.iter().any(|m| stderr.contains(m)) {
        ApiError::Lookup(message)
    } else if CONNECTIVITY_MARKERS.iter().any(|m| stderr.contains(m)) {
        ApiError::Connectivity(message)
    } else {
        ApiError::Lookup(message)
    }
}

fn parse_search_output(stdout: &str) -> Vec<SearchResult> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str::<SearchEntry>(l).ok())
        .filter(|e| !e.id.is_empty())
        .map(|e| SearchResult {
            url: e
                .url
                .clone()
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", e.id)),
            title: e.title.clone().unwrap_or_else(|| "unknown".to_string()),
            author: e
                .uploader
                .clone()
                .or_else(|| e.channel.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            id: e.id,
        })
        .collect()
}

fn parse_video_info(json: &[u8], requested_url: &str) -> Result<VideoHandle> {
    let info: VideoInfo = serde_json::from_slice(json)
        .map_err(|e| ApiError::InvalidResponse(format!("yt-dlp JSON: {}", e)))?;

    let stem = sanitize_filename(&info.title);
    let stem = if stem.is_empty() { info.id.clone() } else { stem };

    let streams = info
        .formats
        .iter()
        .filter_map(|f| descriptor_from_format(f, &stem))
        .collect();

    Ok(VideoHandle {
        author: info.author(),
        url: info
            .webpage_url
            .clone()
            .unwrap_or_else(|| requested_url.to_string()),
        id: info.id,
        title: info.title,
        streams,
    })
}

fn descriptor_from_format(format: &FormatInfo, stem: &str) -> Option<StreamDescriptor> {
    if !format.is_direct() {
        return None;
    }
    let url = format.url.clone()?;
    let label = format
        .format_note
        .as_deref()
        .or(format.resolution.as_deref())
        .unwrap_or_default();

    let (kind, quality) = if format.is_video_only() {
        let quality = match format.height {
            Some(h) if h > 0 => Quality::Height(h),
            _ => Quality::parse_label(StreamKind::Video, label)?,
        };
        (StreamKind::Video, quality)
    } else if format.is_audio_only() {
        let quality = match format.abr {
            Some(abr) if abr >= 1.0 => Quality::Kbps(abr.round() as u32),
            _ => Quality::parse_label(StreamKind::Audio, label)?,
        };
        (StreamKind::Audio, quality)
    } else {
        return None;
    };

    Some(StreamDescriptor {
        format_id: format.format_id.clone(),
        kind,
        quality,
        default_filename: format!("{}.{}", stem, format.ext),
        extension: format.ext.clone(),
        url,
        http_headers: format.http_headers.clone(),
    })
}
