//! Terminal progress for the long reconciliation phases.
//!
//! Bars and spinners are drawn with indicatif. With `--log-only` they are
//! hidden and `log_progress` reports phase progress through `tracing`
//! instead, which keeps redirected output readable.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Base records between two log-only progress lines.
pub const LOG_INTERVAL: u64 = 1_000;

const BAR_TEMPLATE: &str = "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner} [{elapsed_precise}]";

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// "42.0s" below a minute, "1.5m" above.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

fn hidden_when_log_only(pb: &ProgressBar) -> bool {
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    is_log_only()
}

pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if !hidden_when_log_only(&pb) {
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            pb.set_style(style.progress_chars("=> "));
        }
    }
    pb.set_message(msg.to_string());
    pb
}

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if !hidden_when_log_only(&pb) {
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Whether `current` of `total` is due a log-only progress line.
pub fn should_log(current: u64, total: u64, interval: u64) -> bool {
    interval > 0 && (current % interval == 0 || current == total)
}

/// Emit a progress line in log-only mode, every `interval` items and at the end.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && should_log(current, total, interval) {
        let pct = if total == 0 { 100.0 } else { 100.0 * current as f64 / total as f64 };
        tracing::info!(phase, current, total, "{:.1}%", pct);
    }
}
