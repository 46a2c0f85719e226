use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AudioTarget,
    domain::{AppError, DownloadedPair},
    utils::{converted_audio_name, split_extension, temp_output_name},
};

/// External encode step. Implementations must report failure rather than
/// leave a plausible-looking output behind.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Multiplexes one video and one audio stream into `output`.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), AppError>;

    /// Transcodes `input` into `output` using the muxer `format`.
    async fn transcode(&self, input: &Path, output: &Path, format: &str)
        -> Result<(), AppError>;
}

pub struct FfmpegEncoder {
    program: String,
}

impl FfmpegEncoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub async fn is_available(program: &str) -> bool {
        tokio::process::Command::new(program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn run(&self, args: &[&str]) -> Result<(), AppError> {
        tracing::debug!("[ffmpeg] {} {}", self.program, args.join(" "));

        let output = tokio::process::Command::new(&self.program)
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::Encode(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or_default();
            return Err(AppError::Encode(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                tail.trim()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), AppError> {
        let video = video.to_string_lossy();
        let audio = audio.to_string_lossy();
        let output = output.to_string_lossy();
        self.run(&[
            "-i",
            video.as_ref(),
            "-i",
            audio.as_ref(),
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c",
            "copy",
            output.as_ref(),
        ])
        .await
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        format: &str,
    ) -> Result<(), AppError> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.run(&["-i", input.as_ref(), "-vn", "-f", format, output.as_ref()])
            .await
    }
}

/// Turns downloaded streams into the final file.
///
/// The encoder writes to a temporary name; sources are deleted only once that
/// output is known good, and the rename onto the final name comes last.
/// Not safe to run concurrently on the same file names.
#[derive(Clone)]
pub struct MediaAssembler {
    encoder: Arc<dyn Encoder>,
    audio_target: AudioTarget,
    cancel: CancellationToken,
}

impl MediaAssembler {
    pub fn new(
        encoder: Arc<dyn Encoder>,
        audio_target: AudioTarget,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            encoder,
            audio_target,
            cancel,
        }
    }

    /// Merges or converts depending on what was downloaded.
    pub async fn assemble(&self, dir: &Path, pair: &DownloadedPair) -> Result<PathBuf, AppError> {
        match pair {
            DownloadedPair::VideoAndAudio { video, audio } => {
                self.merge_video_audio(dir, video, audio).await
            }
            DownloadedPair::AudioOnly { audio } => self.convert_audio(dir, audio).await,
        }
    }

    /// Leaves exactly one file at `dir/video` holding both tracks.
    pub async fn merge_video_audio(
        &self,
        dir: &Path,
        video: &str,
        audio: &str,
    ) -> Result<PathBuf, AppError> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let video_path = dir.join(video);
        let audio_path = dir.join(audio);
        let (_, extension) = split_extension(video);
        let temp_path = dir.join(temp_output_name(video, extension));

        tracing::info!("[assemble] merging {} + {}", video, audio);
        let encoded = self.encoder.merge(&video_path, &audio_path, &temp_path).await;
        commit(encoded, &temp_path, &[&video_path, &audio_path], &video_path).await?;

        tracing::info!("[assemble] wrote {}", video_path.display());
        Ok(video_path)
    }

    /// Transcodes `dir/audio` to the target format under the marker-free name.
    pub async fn convert_audio(&self, dir: &Path, audio: &str) -> Result<PathBuf, AppError> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let target = &self.audio_target;
        let source_path = dir.join(audio);
        let temp_path = dir.join(temp_output_name(audio, Some(&target.extension)));
        let final_path = dir.join(converted_audio_name(audio, &target.extension));

        tracing::info!("[assemble] converting {} to {}", audio, target.format);
        let encoded = self
            .encoder
            .transcode(&source_path, &temp_path, &target.format)
            .await;
        commit(encoded, &temp_path, &[&source_path], &final_path).await?;

        tracing::info!("[assemble] wrote {}", final_path.display());
        Ok(final_path)
    }
}

/// Verify, delete sources, rename. On any verification failure the sources
/// stay and the temporary output is discarded.
async fn commit(
    encoded: Result<(), AppError>,
    temp_path: &Path,
    sources: &[&Path],
    final_path: &Path,
) -> Result<(), AppError> {
    if let Err(e) = encoded.and(verify_output(temp_path).await) {
        tracing::warn!("[assemble] keeping sources: {}", e);
        discard(temp_path).await;
        return Err(e);
    }

    for source in sources {
        tokio::fs::remove_file(source).await?;
        tracing::debug!("[assemble] removed {}", source.display());
    }
    tokio::fs::rename(temp_path, final_path).await?;
    Ok(())
}

async fn verify_output(path: &Path) -> Result<(), AppError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(_) => Err(AppError::Encode(format!(
            "encoder produced an empty file at {}",
            path.display()
        ))),
        Err(e) => Err(AppError::Encode(format!(
            "encoder produced no output at {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("[assemble] could not remove {}: {}", path.display(), e);
        }
    }
}
