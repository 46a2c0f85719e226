use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::models::ApiConfig;
use crate::domain::AppError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Network unreachable: {0}")]
    Connectivity(String),

    #[error("Video lookup failed: {0}")]
    Lookup(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Failed to run {program}: {reason}")]
    Tool { program: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::RequestError(err) => match err.status() {
                Some(StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE) => {
                    AppError::Lookup(err.to_string())
                }
                _ => AppError::Connectivity(err.to_string()),
            },
            ApiError::Connectivity(msg) => AppError::Connectivity(msg),
            ApiError::Lookup(msg) | ApiError::InvalidResponse(msg) => AppError::Lookup(msg),
            err @ ApiError::Tool { .. } => AppError::Io(err.to_string()),
            ApiError::Io(err) => AppError::Io(err.to_string()),
            ApiError::Cancelled => AppError::Cancelled,
        }
    }
}

/// Streams provider media over HTTP.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        download_url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let request = headers
            .iter()
            .fold(self.client.get(download_url), |request, (name, value)| {
                request.header(name.as_str(), value.as_str())
            });
        let response = request
            .send()
            .await?
            .error_for_status()?;

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok((total_size, stream))
    }

    /// Writes the body at `download_url` to `path`, reporting progress in
    /// 0.0..=1.0. A partial file is removed on failure or cancellation.
    pub async fn download_to_file(
        &self,
        download_url: &str,
        headers: &BTreeMap<String, String>,
        path: &Path,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<u64> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let (total, stream) = self.download_file_stream(download_url, headers).await?;
        let mut file = tokio::fs::File::create(path).await?;

        let written = write_stream(&mut file, stream, total, cancel, on_progress).await;
        drop(file);

        if written.is_err() {
            let _ = tokio::fs::remove_file(path).await;
        }
        written
    }
}

async fn write_stream(
    file: &mut tokio::fs::File,
    stream: impl Stream<Item = Result<bytes::Bytes>>,
    total: Option<u64>,
    cancel: &CancellationToken,
    on_progress: &(dyn Fn(f32) + Send + Sync),
) -> Result<u64> {
    tokio::pin!(stream);
    let mut downloaded: u64 = 0;
    on_progress(0.0);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            chunk = stream.next() => chunk,
        };

        match next {
            Some(chunk) => {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                downloaded += chunk.len() as u64;
                on_progress(fraction(downloaded, total));
            }
            None => break,
        }
    }

    file.sync_all().await?;
    on_progress(1.0);
    Ok(downloaded)
}

fn fraction(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => (downloaded as f32 / total as f32).min(1.0),
        _ => 0.0,
    }
}
