pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{
    AudioMode, BatchFailure, BatchPolicy, BatchReport, DownloadedPair, Quality, QualityMenu,
    QualitySelection, Resolution, SearchResult, StreamDescriptor, StreamKind, VideoHandle,
};
