pub mod batch_runner;
pub mod download_coordinator;
pub mod media_assembler;
pub mod stream_catalog;

pub use batch_runner::BatchRunner;
pub use download_coordinator::{DownloadCoordinator, ProgressReporter};
pub use media_assembler::{Encoder, FfmpegEncoder, MediaAssembler};
pub use stream_catalog::StreamCatalog;
