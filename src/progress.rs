//! Terminal progress reporting using indicatif.
//!
//! Two reporters cover the two long-running operations: a spinner while a
//! scan walks the server, and a per-request progress bar while a batch
//! runs. Both go silent in quiet mode so scripted runs stay clean.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::reclaim::{ItemStatus, ReclaimProgress};

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█>-")
}

/// Spinner shown while a scan is in flight.
pub struct ScanSpinner {
    bar: Option<ProgressBar>,
}

impl ScanSpinner {
    /// Start the spinner; a quiet spinner displays nothing.
    #[must_use]
    pub fn start(quiet: bool) -> Self {
        if quiet {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message("Scanning libraries");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Stop the spinner, leaving `message` on screen.
    pub fn finish(self, message: &str) {
        if let Some(bar) = self.bar {
            bar.finish_with_message(message.to_string());
        }
    }

    /// Stop the spinner and erase it.
    pub fn clear(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Per-request progress bar for reclamation batches.
///
/// Implements [`ReclaimProgress`]; the bar is created on the first request
/// because the total is only known then.
pub struct BatchProgress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl BatchProgress {
    /// Create a reporter; quiet reporters display nothing.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    /// Finish and clear the bar, if any.
    pub fn finish(&self) {
        if let Some(bar) = self.bar.lock().expect("lock poisoned").take() {
            bar.finish_and_clear();
        }
    }
}

impl ReclaimProgress for BatchProgress {
    fn on_start(&self, index: usize, total: usize, label: &str) {
        if self.quiet {
            return;
        }
        let mut guard = self.bar.lock().expect("lock poisoned");
        let bar = guard.get_or_insert_with(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(bar_style());
            bar
        });
        bar.set_position(index as u64);
        bar.set_message(truncate_label(label, 40));
    }

    fn on_finish(&self, label: &str, status: &ItemStatus) {
        if self.quiet {
            return;
        }
        let guard = self.bar.lock().expect("lock poisoned");
        if let Some(bar) = guard.as_ref() {
            bar.inc(1);
            match status {
                ItemStatus::Succeeded => {}
                ItemStatus::Skipped(reason) => {
                    bar.println(format!("skipped {label}: {reason}"));
                }
                ItemStatus::Failed(error) => {
                    bar.println(format!("FAILED {label}: {error}"));
                }
            }
        }
    }
}

fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let prefix: String = label.chars().take(max_len.saturating_sub(3)).collect();
        format!("{prefix}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_label_short() {
        assert_eq!(truncate_label("Heat", 40), "Heat");
    }

    #[test]
    fn test_truncate_label_long() {
        let long = "x".repeat(80);
        let truncated = truncate_label(&long, 40);
        assert_eq!(truncated.chars().count(), 40);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_quiet_reporter_creates_no_bar() {
        let progress = BatchProgress::new(true);
        progress.on_start(0, 10, "Heat");
        progress.on_finish("Heat", &ItemStatus::Succeeded);
        assert!(progress.bar.lock().unwrap().is_none());
    }
}
