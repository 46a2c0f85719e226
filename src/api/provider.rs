use std::path::Path;

use async_trait::async_trait;

use super::client::Result;
use crate::domain::{SearchResult, StreamDescriptor, VideoHandle};

/// The video host, seen from the download pipeline.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Name of the provider (for logging)
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// Resolves a link to a handle carrying every stream descriptor.
    async fn resolve_by_link(&self, url: &str) -> Result<VideoHandle>;

    /// Retrieves `stream` into `destination`, reporting progress in 0.0..=1.0.
    async fn download(
        &self,
        stream: &StreamDescriptor,
        destination: &Path,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<()>;
}
