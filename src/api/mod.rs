pub mod client;
pub mod models;
pub mod provider;
pub mod ytdlp;

pub use client::{ApiClient, ApiError, Result};
pub use models::ApiConfig;
pub use provider::VideoProvider;
pub use ytdlp::YtDlpProvider;
