use std::collections::BTreeSet;

use crate::domain::{AppError, Quality, QualityMenu, StreamDescriptor, StreamKind, VideoHandle};

/// Lists and resolves the stream variants of a [`VideoHandle`].
#[derive(Debug, Clone)]
pub struct StreamCatalog {
    video_container: String,
}

impl StreamCatalog {
    pub fn new(video_container: impl Into<String>) -> Self {
        Self {
            video_container: video_container.into(),
        }
    }

    /// Distinct qualities of `kind`, ascending.
    pub fn list_qualities(&self, handle: &VideoHandle, kind: StreamKind) -> Vec<Quality> {
        handle
            .streams_of(kind)
            .map(|s| s.quality)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn menu(&self, handle: &VideoHandle, kind: StreamKind) -> QualityMenu {
        QualityMenu::new(kind, self.list_qualities(handle, kind))
    }

    /// First descriptor of `kind` at exactly `quality`. Video must also be in
    /// the configured container.
    pub fn resolve<'a>(
        &self,
        handle: &'a VideoHandle,
        kind: StreamKind,
        quality: Quality,
    ) -> Result<&'a StreamDescriptor, AppError> {
        let found = handle.streams_of(kind).find(|s| {
            s.quality == quality
                && (kind == StreamKind::Audio || s.extension == self.video_container)
        });

        match found {
            Some(stream) => {
                tracing::debug!(
                    "[catalog] {} {} -> format {}",
                    kind,
                    quality,
                    stream.format_id
                );
                Ok(stream)
            }
            None => {
                tracing::debug!("[catalog] '{}' has no {} {}", handle.title, kind, quality);
                Err(AppError::NotFound {
                    kind,
                    quality: Some(quality),
                })
            }
        }
    }

    /// Highest-bitrate audio track, preferring containers that mux into the
    /// video container. Earlier descriptors win ties.
    pub fn default_audio<'a>(
        &self,
        handle: &'a VideoHandle,
    ) -> Result<&'a StreamDescriptor, AppError> {
        let family = audio_family(&self.video_container);
        let best_of = |preferred: bool| {
            handle
                .streams_of(StreamKind::Audio)
                .filter(|s| !preferred || family.contains(&s.extension.as_str()))
                .fold(None, |best: Option<&'a StreamDescriptor>, s| match best {
                    Some(b) if b.quality >= s.quality => Some(b),
                    _ => Some(s),
                })
        };

        best_of(true).or_else(|| best_of(false)).ok_or_else(|| {
            AppError::NotFound {
                kind: StreamKind::Audio,
                quality: None,
            }
        })
    }
}

fn audio_family(video_container: &str) -> Vec<&str> {
    match video_container {
        "mp4" => vec!["m4a", "mp4"],
        other => vec![other],
    }
}
