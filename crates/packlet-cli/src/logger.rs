//! Logging infrastructure for the packlet CLI.
//!
//! Structured logging via the `tracing` ecosystem with verbosity flags and
//! `RUST_LOG` overrides.
//!
//! # Verbosity Levels
//!
//! The logging level is determined in this order:
//! 1. `--verbose` flag: DEBUG for packlet crates
//! 2. `--quiet` flag: errors only
//! 3. `RUST_LOG` environment variable: custom filter
//! 4. Default: INFO for packlet crates

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified options.
///
/// Call once at the start of the program, before any logging occurs.
///
/// # Examples
///
/// ```rust,no_run
/// use packlet_cli::logger::init_logger;
///
/// // Default logging (INFO level)
/// init_logger(false, false, false);
///
/// // Debug logging
/// init_logger(true, false, false);
/// ```
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("packlet_core=debug,packlet_bundler=debug,packlet_cli=debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("packlet_core=info,packlet_bundler=info,packlet_cli=info")
        })
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tracing subscribers are global and can only be installed once per
    // process, so these tests only cover filter construction.

    #[test]
    fn test_verbose_filter_parses() {
        let _filter =
            EnvFilter::new("packlet_core=debug,packlet_bundler=debug,packlet_cli=debug");
    }

    #[test]
    fn test_quiet_filter_parses() {
        let _filter = EnvFilter::new("error");
    }
}
