//! Terminal UI utilities for status messages and the build report.
//!
//! Handles environment detection (NO_COLOR, FORCE_COLOR, TTY) and degrades
//! to plain text when colors are unavailable or disabled with `--no-color`.

mod format;
mod messages;
mod report;

pub use format::{format_duration, format_size};
pub use messages::{error, info, success, warning};
pub use report::print_report;

use std::sync::atomic::{AtomicBool, Ordering};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Initialize color support from the `--no-color` flag and the environment.
///
/// Should be called once in main, before any messages are printed.
pub fn init_colors(no_color: bool) {
    COLORS.store(!no_color && should_use_color(), Ordering::Relaxed);
}

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR environment variables, falls back to
/// terminal capability detection on stderr.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::user_attended_stderr()
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_flag_disables_colors() {
        init_colors(true);
        assert!(!colors_enabled());
    }
}
