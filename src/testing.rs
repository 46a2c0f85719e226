//! In-memory provider and encoder used by the unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ApiError, Result, VideoProvider};
use crate::application::Encoder;
use crate::domain::{AppError, Quality, SearchResult, StreamDescriptor, StreamKind, VideoHandle};

pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("stream-assembler-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn video_stream(id: &str, height: u32, ext: &str, title: &str) -> StreamDescriptor {
    StreamDescriptor {
        format_id: id.to_string(),
        kind: StreamKind::Video,
        quality: Quality::Height(height),
        extension: ext.to_string(),
        default_filename: format!("{}.{}", title, ext),
        url: format!("https://media.test/{}", id),
        http_headers: Default::default(),
    }
}

pub fn audio_stream(id: &str, kbps: u32, ext: &str, title: &str) -> StreamDescriptor {
    StreamDescriptor {
        format_id: id.to_string(),
        kind: StreamKind::Audio,
        quality: Quality::Kbps(kbps),
        extension: ext.to_string(),
        default_filename: format!("{}.{}", title, ext),
        url: format!("https://media.test/{}", id),
        http_headers: Default::default(),
    }
}

/// Video offering 144p/360p/720p in mp4 (360p twice) and two m4a tracks.
pub fn sample_handle(title: &str) -> VideoHandle {
    VideoHandle {
        id: title.to_lowercase(),
        title: title.to_string(),
        author: "Tester".to_string(),
        url: format!("https://www.youtube.com/watch?v={}", title.to_lowercase()),
        streams: vec![
            video_stream("720", 720, "mp4", title),
            video_stream("144", 144, "mp4", title),
            video_stream("360a", 360, "mp4", title),
            video_stream("360b", 360, "mp4", title),
            video_stream("360w", 360, "webm", title),
            audio_stream("a48", 48, "m4a", title),
            audio_stream("a128", 128, "m4a", title),
        ],
    }
}

#[derive(Default)]
pub struct FakeProvider {
    handles: HashMap<String, VideoHandle>,
    pub downloads: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn with_handle(mut self, link: &str, handle: VideoHandle) -> Self {
        self.handles.insert(link.to_string(), handle);
        self
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let mut results: Vec<SearchResult> = self
            .handles
            .iter()
            .filter(|(_, h)| h.title.contains(query))
            .map(|(link, h)| SearchResult {
                id: h.id.clone(),
                title: h.title.clone(),
                author: h.author.clone(),
                url: link.clone(),
            })
            .collect();
        results.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(results)
    }

    async fn resolve_by_link(&self, url: &str) -> Result<VideoHandle> {
        self.handles
            .get(url)
            .cloned()
            .ok_or_else(|| ApiError::Lookup(format!("no video at {}", url)))
    }

    async fn download(
        &self,
        stream: &StreamDescriptor,
        destination: &Path,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<()> {
        on_progress(0.0);
        tokio::fs::write(destination, format!("{}:{}", stream.format_id, stream.quality)).await?;
        on_progress(1.0);
        self.downloads
            .lock()
            .unwrap()
            .push(stream.format_id.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderBehaviour {
    Succeed,
    Fail,
    /// Exits cleanly but leaves an empty output file.
    WriteNothing,
}

pub struct FakeEncoder {
    behaviour: EncoderBehaviour,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEncoder {
    pub fn new(behaviour: EncoderBehaviour) -> Self {
        Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn produce(&self, inputs: &[&Path], output: &Path) -> std::result::Result<(), AppError> {
        match self.behaviour {
            EncoderBehaviour::Succeed => {
                let mut merged = String::new();
                for input in inputs {
                    merged.push_str(&tokio::fs::read_to_string(input).await?);
                    merged.push('|');
                }
                tokio::fs::write(output, merged).await?;
                Ok(())
            }
            EncoderBehaviour::Fail => {
                tokio::fs::write(output, "partial").await?;
                Err(AppError::Encode("Invalid data found when processing input".into()))
            }
            EncoderBehaviour::WriteNothing => {
                tokio::fs::write(output, "").await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn merge(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
    ) -> std::result::Result<(), AppError> {
        self.calls.lock().unwrap().push("merge".to_string());
        self.produce(&[video, audio], output).await
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: &str,
    ) -> std::result::Result<(), AppError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("transcode:{}", format));
        self.produce(&[input], output).await
    }
}
