use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{download_coordinator::DownloadCoordinator, media_assembler::MediaAssembler};
use crate::{
    api::VideoProvider,
    domain::{
        AppError, AudioMode, BatchFailure, BatchPolicy, BatchReport, QualitySelection, Resolution,
    },
    utils::parse_link,
};

/// Downloads every link of a list file at one resolution, strictly in order.
pub struct BatchRunner {
    provider: Arc<dyn VideoProvider>,
    coordinator: DownloadCoordinator,
    assembler: MediaAssembler,
    policy: BatchPolicy,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        coordinator: DownloadCoordinator,
        assembler: MediaAssembler,
        policy: BatchPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            coordinator,
            assembler,
            policy,
            cancel,
        }
    }

    pub async fn run(
        &self,
        dir: &Path,
        list_file: &Path,
        resolution: Resolution,
    ) -> Result<BatchReport, AppError> {
        let text = tokio::fs::read_to_string(list_file).await.map_err(|e| {
            AppError::Io(format!("cannot read {}: {}", list_file.display(), e))
        })?;
        let links = parse_link_list(&text);
        tracing::info!(
            "[batch] {} links from {} at {} ({:?})",
            links.len(),
            list_file.display(),
            resolution,
            self.policy
        );

        let mut report = BatchReport::default();
        for (n, link) in links.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            tracing::info!("[batch] item {}/{}: {}", n + 1, links.len(), link);
            match self.process(dir, link, resolution).await {
                Ok(path) => report.completed.push(path.display().to_string()),
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => match self.policy {
                    BatchPolicy::AbortOnFirstFailure => {
                        tracing::warn!("[batch] aborting at {}: {}", link, e);
                        return Err(e);
                    }
                    BatchPolicy::ContinueOnFailure => {
                        tracing::warn!("[batch] skipping {}: {}", link, e);
                        report.failed.push(BatchFailure {
                            link: link.to_string(),
                            error: e,
                        });
                    }
                },
            }
        }

        Ok(report)
    }

    async fn process(
        &self,
        dir: &Path,
        link: &str,
        resolution: Resolution,
    ) -> Result<PathBuf, AppError> {
        let url = parse_link(link).ok_or_else(|| AppError::InvalidInput(link.to_string()))?;
        let handle = self.provider.resolve_by_link(url.as_str()).await?;
        let pair = self
            .coordinator
            .fetch(
                &handle,
                dir,
                QualitySelection::Exact(resolution.quality()),
                AudioMode::DefaultTrack,
            )
            .await?;
        self.assembler.assemble(dir, &pair).await
    }
}

/// One link per line; surrounding whitespace and blank lines are ignored.
pub fn parse_link_list(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::StreamCatalog;
    use crate::config::AudioTarget;
    use crate::domain::Quality;
    use crate::testing::{
        files_in, sample_handle, scratch_dir, EncoderBehaviour, FakeEncoder, FakeProvider,
    };

    const FIRST: &str = "https://www.youtube.com/watch?v=first";
    const SECOND: &str = "https://www.youtube.com/watch?v=second";

    fn runner(provider: Arc<FakeProvider>, policy: BatchPolicy) -> BatchRunner {
        let cancel = CancellationToken::new();
        let coordinator =
            DownloadCoordinator::new(provider.clone(), StreamCatalog::new("mp4"), cancel.clone());
        let assembler = MediaAssembler::new(
            Arc::new(FakeEncoder::new(EncoderBehaviour::Succeed)),
            AudioTarget::default(),
            cancel.clone(),
        );
        BatchRunner::new(provider, coordinator, assembler, policy, cancel)
    }

    /// First video lacks 720p, second has it.
    fn provider_with_gap() -> Arc<FakeProvider> {
        let mut first = sample_handle("First");
        first
            .streams
            .retain(|s| s.quality != Quality::Height(720));
        Arc::new(
            FakeProvider::default()
                .with_handle(FIRST, first)
                .with_handle(SECOND, sample_handle("Second")),
        )
    }

    /// Kept outside the working directory so it does not show up in listings.
    fn write_list(body: &str) -> PathBuf {
        let path = scratch_dir().join("links.txt");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_parse_link_list() {
        let text = "  https://a.test/1 \n\n\thttps://a.test/2\r\n   \n";
        assert_eq!(
            parse_link_list(text),
            vec!["https://a.test/1", "https://a.test/2"]
        );
    }

    #[tokio::test]
    async fn test_all_items_merged() {
        let provider = Arc::new(
            FakeProvider::default()
                .with_handle(FIRST, sample_handle("First"))
                .with_handle(SECOND, sample_handle("Second")),
        );
        let dir = scratch_dir();
        let list = write_list(&format!("{}\n{}\n", FIRST, SECOND));

        let report = runner(provider.clone(), BatchPolicy::AbortOnFirstFailure)
            .run(&dir, &list, Resolution::P720)
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.completed.len(), 2);
        assert_eq!(files_in(&dir), vec!["First.mp4", "Second.mp4"]);
        assert_eq!(provider.downloaded(), vec!["720", "a128", "720", "a128"]);
    }

    #[tokio::test]
    async fn test_missing_resolution_aborts_whole_batch_by_default() {
        let provider = provider_with_gap();
        let dir = scratch_dir();
        let list = write_list(&format!("{}\n{}\n", FIRST, SECOND));

        let err = runner(provider.clone(), BatchPolicy::AbortOnFirstFailure)
            .run(&dir, &list, Resolution::P720)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
        // no lower resolution substituted, second item never started
        assert!(provider.downloaded().is_empty());
        assert!(files_in(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_continue_policy_isolates_failed_item() {
        let provider = provider_with_gap();
        let dir = scratch_dir();
        let list = write_list(&format!("{}\n{}\n", FIRST, SECOND));

        let report = runner(provider.clone(), BatchPolicy::ContinueOnFailure)
            .run(&dir, &list, Resolution::P720)
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].link, FIRST);
        assert!(matches!(report.failed[0].error, AppError::NotFound { .. }));
        assert_eq!(report.completed.len(), 1);
        assert_eq!(files_in(&dir), vec!["Second.mp4"]);
    }

    #[tokio::test]
    async fn test_bad_link_and_unknown_video() {
        let provider = Arc::new(
            FakeProvider::default().with_handle(SECOND, sample_handle("Second")),
        );
        let dir = scratch_dir();
        let list = write_list(&format!("not-a-link\n{}\n{}\n", FIRST, SECOND));

        let report = runner(provider, BatchPolicy::ContinueOnFailure)
            .run(&dir, &list, Resolution::P360)
            .await
            .unwrap();

        assert!(matches!(report.failed[0].error, AppError::InvalidInput(_)));
        assert!(matches!(report.failed[1].error, AppError::Lookup(_)));
        assert_eq!(files_in(&dir), vec!["Second.mp4"]);
    }

    #[tokio::test]
    async fn test_missing_list_file() {
        let provider = Arc::new(FakeProvider::default());
        let dir = scratch_dir();
        let err = runner(provider, BatchPolicy::ContinueOnFailure)
            .run(&dir, &dir.join("missing.txt"), Resolution::P720)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
