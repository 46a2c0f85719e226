use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};

use crate::app::Mode;
use crate::application::ProgressReporter;
use crate::domain::{AppError, AudioMode, BatchReport, QualityMenu, Resolution, SearchResult};

impl From<dialoguer::Error> for AppError {
    fn from(e: dialoguer::Error) -> Self {
        match e {
            dialoguer::Error::IO(err) if err.kind() == std::io::ErrorKind::Interrupted => {
                AppError::Cancelled
            }
            dialoguer::Error::IO(err) => AppError::Io(err.to_string()),
        }
    }
}

pub fn banner() {
    println!("---- Stream Assembler ----");
    println!("Press Esc in any menu or Ctrl-C to stop.\n");
}

fn select(prompt: &str, items: &[String], default: usize) -> Result<usize, AppError> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(default)
        .interact_opt()?
        .ok_or(AppError::Cancelled)
}

pub fn select_mode() -> Result<Mode, AppError> {
    let items = ["Search".to_string(), "Batch download".into(), "Quit".into()];
    let mode = match Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What do you want to do?")
        .items(&items)
        .default(0)
        .interact_opt()?
    {
        Some(0) => Mode::Search,
        Some(1) => Mode::Batch,
        _ => Mode::Quit,
    };
    Ok(mode)
}

pub fn ask_query(initial: Option<String>) -> Result<String, AppError> {
    if let Some(query) = initial.filter(|q| !q.trim().is_empty()) {
        return Ok(query);
    }
    let query: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter the name of the video to search")
        .interact_text()?;
    Ok(query)
}

pub fn search_labels(results: &[SearchResult]) -> Vec<String> {
    results
        .iter()
        .map(|r| format!("{} | {}", r.title, r.author))
        .collect()
}

pub fn choose_search_result(results: &[SearchResult]) -> Result<usize, AppError> {
    select(
        "Select the video you want to download",
        &search_labels(results),
        0,
    )
}

pub fn choose_media() -> Result<AudioMode, AppError> {
    let items = ["Video".to_string(), "Audio".into()];
    let mode = match select("Do you want video or audio?", &items, 0)? {
        0 => AudioMode::DefaultTrack,
        _ => AudioMode::AudioOnly,
    };
    Ok(mode)
}

pub fn menu_labels(menu: &QualityMenu) -> Vec<(usize, String)> {
    menu.iter().map(|(i, q)| (i, q.to_string())).collect()
}

/// Returns the menu's 1-based index for the chosen entry.
pub fn choose_quality(menu: &QualityMenu) -> Result<usize, AppError> {
    let entries = menu_labels(menu);
    let labels: Vec<String> = entries.iter().map(|(_, l)| l.clone()).collect();
    let prompt = format!("Select a {} quality (1-{})", menu.kind(), menu.len());
    let picked = select(&prompt, &labels, labels.len().saturating_sub(1))?;
    entries
        .get(picked)
        .map(|(i, _)| *i)
        .ok_or_else(|| AppError::InvalidSelection(picked.to_string()))
}

pub fn choose_resolution(default: Resolution) -> Result<Resolution, AppError> {
    let labels: Vec<String> = Resolution::ALL.iter().map(|r| r.to_string()).collect();
    let default_pos = Resolution::ALL
        .iter()
        .position(|r| *r == default)
        .unwrap_or(0);
    let picked = select("Resolution for every video", &labels, default_pos)?;
    Ok(Resolution::ALL.get(picked).copied().unwrap_or(default))
}

/// Native folder picker, falling back to a typed path.
pub async fn pick_directory() -> Result<PathBuf, AppError> {
    let cwd = std::env::current_dir()?;
    let picked = rfd::AsyncFileDialog::new()
        .set_title("Please select a directory")
        .set_directory(&cwd)
        .pick_folder()
        .await
        .map(|handle| handle.path().to_path_buf());

    match picked {
        Some(dir) => Ok(dir),
        None => ask_path("Download directory", &cwd, true),
    }
}

/// Native file picker for the link list, falling back to a typed path.
pub async fn pick_link_list() -> Result<PathBuf, AppError> {
    let cwd = std::env::current_dir()?;
    let picked = rfd::AsyncFileDialog::new()
        .set_title("Please select the list of links")
        .set_directory(&cwd)
        .add_filter("Text", &["txt"])
        .pick_file()
        .await
        .map(|handle| handle.path().to_path_buf());

    match picked {
        Some(file) => Ok(file),
        None => ask_path("File with one link per line", &cwd, false),
    }
}

fn ask_path(prompt: &str, default: &Path, want_dir: bool) -> Result<PathBuf, AppError> {
    loop {
        let typed: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default.display().to_string())
            .interact_text()?;
        let path = PathBuf::from(typed.trim());
        let ok = if want_dir {
            path.is_dir()
        } else {
            path.is_file()
        };
        if ok {
            return Ok(path);
        }
        println!("{} does not exist, try again.", path.display());
    }
}

pub fn report_error(e: &AppError) {
    eprintln!("❌ {}", e);
}

pub fn report_completed(path: &Path) {
    println!("✅ Download completed! {}", path.display());
}

pub fn batch_summary(report: &BatchReport) -> String {
    let mut out = format!(
        "{} completed, {} failed",
        report.completed.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        out.push_str(&format!("\n  {} -> {}", failure.link, failure.error));
    }
    out
}

/// indicatif bar, one per transferred file.
#[derive(Default)]
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter for TerminalProgress {
    fn begin(&self, label: &str) {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message(label.to_string());
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(pb);
        }
    }

    fn advance(&self, fraction: f32) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.set_position((fraction.clamp(0.0, 1.0) * 100.0) as u64);
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish();
            }
        }
    }
}
