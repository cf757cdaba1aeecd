//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::media::{DownloadResult, MediaMetadata, Notice, NoticeLevel};
use crate::storage::MediaEntry;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Output formatter for webdl
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    spinner: Mutex<Option<ProgressBar>>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            spinner: Mutex::new(None),
        }
    }

    /// Show a spinner while a workflow is running
    pub fn start_spinner(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = slot.replace(spinner) {
                previous.finish_and_clear();
            }
        }
    }

    /// Remove the spinner, if any
    pub fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }

    fn spinner_active(&self) -> bool {
        self.spinner.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Print a workflow message, suspending the spinner around it
    pub fn notice(&self, notice: &Notice) {
        let print = || match notice.level {
            NoticeLevel::Info => self.info(&notice.message),
            NoticeLevel::Error => self.error(&notice.message),
        };
        match self.spinner.lock().ok().and_then(|s| s.clone()) {
            Some(spinner) => spinner.suspend(print),
            None => print(),
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("✅ {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Verbose {
            println!("🐛 {}", message);
        }
    }

    /// Print the result of a search
    pub fn print_metadata(&self, metadata: &MediaMetadata) {
        if metadata.is_empty() {
            return;
        }
        // The title is the result; print it even in quiet mode
        println!("📹 {}", metadata.title);
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }
        match &metadata.thumbnail {
            Some(path) => println!("🖼️  {}", path.display()),
            None => println!("🖼️  (no preview)"),
        }
    }

    /// Print the result of a download and where the file landed
    pub fn print_download_result(
        &self,
        result: &DownloadResult,
        content: Option<&Path>,
        elapsed: Duration,
    ) {
        let Some(locator) = &result.locator else {
            return;
        };
        if self.verbosity == VerbosityLevel::Quiet {
            match content {
                Some(path) => println!("{}", path.display()),
                None => println!("{}", locator),
            }
            return;
        }
        println!("💾 Entry: {}", locator);
        if let Some(path) = content {
            println!("📂 File: {}", path.display());
        }
        println!("⏱️  Time: {}", format_duration(elapsed));
    }

    /// Print a listing of storage entries
    pub fn print_entries(&self, entries: &[MediaEntry]) {
        if entries.is_empty() {
            self.info("No saved videos.");
            return;
        }
        for entry in entries {
            println!("{}", format_entry(entry));
        }
    }
}

fn format_entry(entry: &MediaEntry) -> String {
    let state = if entry.is_pending() { " (pending)" } else { "" };
    format!(
        "{}  {}{}{}  {}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        entry.attributes.relative_path,
        entry.attributes.display_name,
        state,
        entry.locator
    )
}

impl Drop for OutputFormatter {
    fn drop(&mut self) {
        if self.spinner_active() {
            self.stop_spinner();
        }
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}
