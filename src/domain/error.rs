use thiserror::Error;

use super::model::{Quality, StreamKind};

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Invalid video link: {0}")]
    InvalidInput(String),

    #[error("Please check your internet connection ({0})")]
    Connectivity(String),

    #[error("Cannot find the video or the video is age restricted ({0})")]
    Lookup(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Stream not found: no {}", describe_missing(.kind, .quality))]
    NotFound {
        kind: StreamKind,
        /// `None` when no stream of `kind` exists at all.
        quality: Option<Quality>,
    },

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Cancelled")]
    Cancelled,
}

impl AppError {
    /// The user can fix this by choosing again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidSelection(_))
    }

    /// Errors after which the session cannot sensibly continue.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Lookup(_) | Self::Cancelled)
    }
}

fn describe_missing(kind: &StreamKind, quality: &Option<Quality>) -> String {
    match quality {
        Some(quality) => format!("{} {} stream", quality, kind),
        None => format!("{} stream", kind),
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_720p() -> AppError {
        AppError::NotFound {
            kind: StreamKind::Video,
            quality: Some(Quality::Height(720)),
        }
    }

    #[test]
    fn only_invalid_selection_is_recoverable() {
        assert!(AppError::InvalidSelection("0".into()).is_recoverable());
        assert!(!missing_720p().is_recoverable());
        assert!(!AppError::Encode("boom".into()).is_recoverable());
        assert!(!AppError::Cancelled.is_recoverable());
    }

    #[test]
    fn network_and_lookup_failures_end_the_session() {
        assert!(AppError::Connectivity("dns".into()).ends_session());
        assert!(AppError::Lookup("private".into()).ends_session());
        assert!(AppError::Cancelled.ends_session());
        assert!(!AppError::Encode("boom".into()).ends_session());
        assert!(!missing_720p().ends_session());
    }

    #[test]
    fn not_found_names_kind_and_quality() {
        assert_eq!(
            missing_720p().to_string(),
            "Stream not found: no 720p video stream"
        );
        let no_audio = AppError::NotFound {
            kind: StreamKind::Audio,
            quality: None,
        };
        assert_eq!(no_audio.to_string(), "Stream not found: no audio stream");
    }

    #[test]
    fn io_errors_convert() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AppError::Io(msg) if msg.contains("gone")));
    }
}
