mod api;
mod app;
mod application;
mod config;
mod domain;
mod ui;
mod utils;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use api::YtDlpProvider;
use app::{BatchOptions, Mode, SessionController};
use application::{DownloadCoordinator, FfmpegEncoder, MediaAssembler, StreamCatalog};
use config::AppConfig;
use domain::{AppError, BatchReport, Resolution};

#[derive(Parser)]
#[command(name = "stream-assembler")]
#[command(version)]
#[command(about = "Download a video or its audio at a chosen quality and assemble one playable file")]
struct Cli {
    /// -v for progress details, -vv for everything
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a video and download it interactively (default)
    Search {
        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Download every link of a text file at one resolution
    Batch {
        /// File with one video link per line
        #[arg(short, long)]
        list: Option<PathBuf>,

        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// One of 1080p, 720p, 480p, 360p, 240p, 144p
        #[arg(short, long)]
        resolution: Option<Resolution>,

        /// Record failed links and carry on instead of stopping
        #[arg(long, default_value_t = false)]
        keep_going: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// First Ctrl-C cancels cooperatively, a second one exits at once.
fn watch_interrupts(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("[session] interrupt received, stopping after the current step");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

async fn check_dependencies(config: &AppConfig) {
    if !YtDlpProvider::is_available(&config.ytdlp_program).await {
        tracing::warn!("{} is not runnable", config.ytdlp_program);
        eprintln!("⚠ {} was not found; searches and downloads will fail.", config.ytdlp_program);
    }
    if !FfmpegEncoder::is_available(&config.ffmpeg_program).await {
        tracing::warn!("{} is not runnable", config.ffmpeg_program);
        eprintln!("⚠ {} was not found; merging and conversion will fail.", config.ffmpeg_program);
    }
}

/// Non-zero when any link of the batch failed; the summary is already printed.
fn batch_exit_status(report: &BatchReport) -> u8 {
    if report.is_clean() {
        0
    } else {
        1
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<ExitCode, AppError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    check_dependencies(&config).await;

    let provider = Arc::new(YtDlpProvider::new(config.api_config(), cancel.clone())?);
    let coordinator = DownloadCoordinator::new(
        provider.clone(),
        StreamCatalog::new(config.video_container.clone()),
        cancel.clone(),
    )
    .with_progress(Arc::new(ui::TerminalProgress::default()));
    let assembler = MediaAssembler::new(
        Arc::new(FfmpegEncoder::new(config.ffmpeg_program.clone())),
        config.audio_target.clone(),
        cancel.clone(),
    );
    let session = SessionController::new(config, provider, coordinator, assembler, cancel);

    match cli.command {
        Some(Commands::Batch {
            list,
            dir,
            resolution,
            keep_going,
        }) => {
            let report = session
                .batch_flow(BatchOptions {
                    dir,
                    list,
                    resolution,
                    keep_going,
                })
                .await?;
            Ok(ExitCode::from(batch_exit_status(&report)))
        }
        Some(Commands::Search { query, dir }) => {
            session.run(Some(Mode::Search), query, dir).await?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            session.run(None, None, None).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    watch_interrupts(cancel.clone());

    match run(cli, cancel).await {
        Ok(code) => code,
        Err(AppError::Cancelled) => {
            eprintln!("Cancelled.");
            ExitCode::from(130)
        }
        Err(e) => {
            ui::report_error(&e);
            ExitCode::FAILURE
        }
    }
}
