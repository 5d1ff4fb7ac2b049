//! Progress reporting for a transform run.
//!
//! Interactive runs get a bar over the pending payloads and a spinner while
//! the crawler trigger waits between status checks. Log-only runs (scheduled
//! jobs, CI) hide both and emit one log line per payload instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressMode {
    #[default]
    Bars,
    LogOnly,
}

impl ProgressMode {
    pub fn from_log_only(log_only: bool) -> Self {
        if log_only {
            ProgressMode::LogOnly
        } else {
            ProgressMode::Bars
        }
    }

    /// Bar over the pending payload files of one run.
    pub fn payload_bar(self, total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        match self {
            ProgressMode::LogOnly => pb.set_draw_target(ProgressDrawTarget::hidden()),
            ProgressMode::Bars => {
                let style = ProgressStyle::default_bar()
                    .template("Transforming payloads [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> ");
                pb.set_style(style);
            }
        }
        pb
    }

    /// Log line for a finished payload. Bars already show this interactively.
    pub fn log_payload(self, done: usize, total: usize, key: &str) {
        if self == ProgressMode::LogOnly {
            info!("[transform] {}/{} {}", done, total, key);
        }
    }

    /// Spinner for one crawler retry wait. Finish it when the wait is over.
    pub fn crawler_spinner(self, job_name: &str, delay: Duration) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        match self {
            ProgressMode::LogOnly => {
                pb.set_draw_target(ProgressDrawTarget::hidden());
                info!("Waiting {} for crawler {}", format_elapsed(delay), job_name);
            }
            ProgressMode::Bars => {
                let style = ProgressStyle::default_spinner()
                    .template("{msg} {spinner} [{elapsed_precise}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                pb.set_style(style);
                pb.enable_steady_tick(Duration::from_millis(100));
            }
        }
        pb.set_message(format!("Waiting on crawler {job_name}"));
        pb
    }
}

/// Short elapsed-time text for summaries: `850ms`, `12.3s`, `2m05s`.
pub fn format_elapsed(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1_000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
