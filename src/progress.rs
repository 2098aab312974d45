//! Terminal progress indicators.
//!
//! Bars and spinners draw to stderr and only when it is a terminal, so piped
//! output stays byte-for-byte the rendered table.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

fn stderr_is_tty() -> bool {
    std::io::stderr().is_terminal()
}

/// Spinner for work of unknown length, e.g. downloading the index.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    if !stderr_is_tty() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Bar counting finished metadata lookups.
pub fn fetch_progress(total: usize) -> ProgressBar {
    if !stderr_is_tty() || total < 2 {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message("Fetching metadata");
    pb
}
