use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::stream_catalog::StreamCatalog;
use crate::{
    api::VideoProvider,
    domain::{
        AppError, AudioMode, DownloadedPair, Quality, QualitySelection, StreamDescriptor,
        StreamKind, VideoHandle,
    },
    utils::audio_sidecar_name,
};

/// Receives transfer progress for one file at a time.
pub trait ProgressReporter: Send + Sync {
    fn begin(&self, label: &str);
    fn advance(&self, fraction: f32);
    fn finish(&self);
}

pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn begin(&self, _label: &str) {}
    fn advance(&self, _fraction: f32) {}
    fn finish(&self) {}
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    provider: Arc<dyn VideoProvider>,
    catalog: StreamCatalog,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl DownloadCoordinator {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        catalog: StreamCatalog,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            catalog,
            progress: Arc::new(SilentProgress),
            cancel,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn catalog(&self) -> &StreamCatalog {
        &self.catalog
    }

    /// Downloads the selected stream(s) into `dir`.
    ///
    /// Both descriptors are resolved before anything is written, so a missing
    /// audio track never leaves an orphaned video file behind.
    pub async fn fetch(
        &self,
        handle: &VideoHandle,
        dir: &Path,
        selection: QualitySelection,
        mode: AudioMode,
    ) -> Result<DownloadedPair, AppError> {
        match mode {
            AudioMode::DefaultTrack => {
                let quality = self.select(handle, StreamKind::Video, selection)?;
                let video = self.catalog.resolve(handle, StreamKind::Video, quality)?;
                let audio = self.catalog.default_audio(handle)?;
                let audio_name = audio_sidecar_name(&audio.default_filename);

                self.transfer(video, dir, &video.default_filename).await?;
                self.transfer(audio, dir, &audio_name).await?;

                Ok(DownloadedPair::VideoAndAudio {
                    video: video.default_filename.clone(),
                    audio: audio_name,
                })
            }
            AudioMode::AudioOnly => {
                let quality = self.select(handle, StreamKind::Audio, selection)?;
                let audio = self.catalog.resolve(handle, StreamKind::Audio, quality)?;
                let audio_name = audio_sidecar_name(&audio.default_filename);

                self.transfer(audio, dir, &audio_name).await?;

                Ok(DownloadedPair::AudioOnly { audio: audio_name })
            }
        }
    }

    fn select(
        &self,
        handle: &VideoHandle,
        kind: StreamKind,
        selection: QualitySelection,
    ) -> Result<Quality, AppError> {
        match selection {
            QualitySelection::MenuIndex(index) => self.catalog.menu(handle, kind).get(index),
            QualitySelection::Exact(quality) if quality.kind() == kind => Ok(quality),
            QualitySelection::Exact(quality) => Err(AppError::InvalidSelection(format!(
                "{} is not a {} quality",
                quality, kind
            ))),
        }
    }

    async fn transfer(
        &self,
        stream: &StreamDescriptor,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, AppError> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let path = dir.join(filename);
        tracing::info!(
            "[download] {} {} ({}) via {} -> {}",
            stream.kind,
            stream.quality,
            stream.format_id,
            self.provider.name(),
            path.display()
        );

        self.progress.begin(filename);
        let on_progress = |fraction: f32| self.progress.advance(fraction);
        let result = self.provider.download(stream, &path, &on_progress).await;
        self.progress.finish();

        result?;
        Ok(path)
    }
}
