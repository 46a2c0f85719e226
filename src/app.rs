use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::VideoProvider;
use crate::application::{BatchRunner, DownloadCoordinator, MediaAssembler};
use crate::config::AppConfig;
use crate::domain::{
    AppError, AudioMode, BatchPolicy, BatchReport, QualitySelection, Resolution, StreamKind,
};
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Search,
    Batch,
    Quit,
}

/// Options for one batch run; anything missing is asked for interactively.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub dir: Option<PathBuf>,
    pub list: Option<PathBuf>,
    pub resolution: Option<Resolution>,
    pub keep_going: bool,
}

/// Top-level mode loop and error boundary.
pub struct SessionController {
    config: AppConfig,
    provider: Arc<dyn VideoProvider>,
    coordinator: DownloadCoordinator,
    assembler: MediaAssembler,
    cancel: CancellationToken,
}

impl SessionController {
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn VideoProvider>,
        coordinator: DownloadCoordinator,
        assembler: MediaAssembler,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            provider,
            coordinator,
            assembler,
            cancel,
        }
    }

    /// Runs `modeSelect -> flow -> modeSelect` until the user quits, the run
    /// is cancelled, or an error that ends the session occurs.
    pub async fn run(
        &self,
        first: Option<Mode>,
        mut query: Option<String>,
        mut dir: Option<PathBuf>,
    ) -> Result<(), AppError> {
        ui::banner();
        let mut next = first;

        loop {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let mode = match next.take() {
                Some(mode) => mode,
                None => ui::select_mode()?,
            };
            tracing::debug!("[session] mode {:?}", mode);

            let outcome = match mode {
                Mode::Search => self.search_flow(query.take(), dir.take()).await,
                Mode::Batch => {
                    let options = BatchOptions {
                        dir: dir.take(),
                        ..BatchOptions::default()
                    };
                    self.batch_flow(options).await.map(|_| ())
                }
                Mode::Quit => return Ok(()),
            };

            match outcome {
                Ok(()) => {}
                Err(e) if e.ends_session() => return Err(e),
                Err(e) => {
                    tracing::warn!("[session] {}", e);
                    ui::report_error(&e);
                }
            }
        }
    }

    pub async fn batch_flow(&self, options: BatchOptions) -> Result<BatchReport, AppError> {
        let list = match options.list {
            Some(list) => list,
            None => ui::pick_link_list().await?,
        };
        let dir = self.resolve_dir(options.dir).await?;
        let resolution = match options.resolution {
            Some(resolution) => resolution,
            None => ui::choose_resolution(self.config.default_resolution)?,
        };
        let policy = if options.keep_going {
            BatchPolicy::ContinueOnFailure
        } else {
            self.config.batch_policy
        };

        let runner = BatchRunner::new(
            self.provider.clone(),
            self.coordinator.clone(),
            self.assembler.clone(),
            policy,
            self.cancel.clone(),
        );
        let report = runner.run(&dir, &list, resolution).await?;
        println!("{}", ui::batch_summary(&report));
        Ok(report)
    }

    async fn search_flow(
        &self,
        query: Option<String>,
        dir: Option<PathBuf>,
    ) -> Result<(), AppError> {
        let query = ui::ask_query(query)?;
        let results = self.provider.search(&query).await?;
        if results.is_empty() {
            println!("No results for '{}'.", query);
            return Ok(());
        }

        let picked = ui::choose_search_result(&results)?;
        let result = results
            .get(picked)
            .ok_or_else(|| AppError::InvalidSelection(picked.to_string()))?;
        tracing::debug!("[session] picked {} ({})", result.title, result.id);
        let handle = self.provider.resolve_by_link(&result.url).await?;

        let dir = self.resolve_dir(dir).await?;
        let mode = ui::choose_media()?;
        let kind = match mode {
            AudioMode::DefaultTrack => StreamKind::Video,
            AudioMode::AudioOnly => StreamKind::Audio,
        };

        let pair = loop {
            let menu = self.coordinator.catalog().menu(&handle, kind);
            if menu.is_empty() {
                tracing::debug!("[session] '{}' has no {} streams", handle.title, kind);
                return Err(AppError::NotFound {
                    kind,
                    quality: None,
                });
            }
            let index = ui::choose_quality(&menu)?;
            match self
                .coordinator
                .fetch(&handle, &dir, QualitySelection::MenuIndex(index), mode)
                .await
            {
                Err(e) if e.is_recoverable() => ui::report_error(&e),
                other => break other?,
            }
        };

        let path = self.assembler.assemble(&dir, &pair).await?;
        ui::report_completed(&path);
        Ok(())
    }

    async fn resolve_dir(&self, dir: Option<PathBuf>) -> Result<PathBuf, AppError> {
        let dir = match dir.or_else(|| self.config.output_dir.clone()) {
            Some(dir) => dir,
            None => ui::pick_directory().await?,
        };
        ensure_dir(&dir)?;
        Ok(dir)
    }
}

fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(AppError::Io(format!("{} is not a directory", dir.display())))
    }
}
