//! Error handling for the packlet CLI.
//!
//! `CliError` is the top-level error type returned by commands. Domain
//! errors from packlet-core and packlet-bundler convert automatically via
//! `#[from]`, and `cli_error_to_miette` turns the final error into a
//! miette report for display.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Errors from the build session.
    #[error("Build error: {0}")]
    Build(#[from] packlet_bundler::Error),

    /// Manifest discovery or parsing errors.
    #[error(transparent)]
    Manifest(#[from] packlet_core::Error),

    /// Invalid command-line arguments or unresolvable defaults.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No entry file could be resolved.
    #[error("{0}")]
    EntryNotFound(String),

    /// One or more build units failed; per-unit detail was already printed.
    #[error("{failed} of {total} build units failed")]
    UnitsFailed {
        failed: usize,
        total: usize,
        first_error: String,
    },

    /// I/O errors from file system operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert a CliError into a miette Report.
///
/// Domain errors carry their own diagnostic codes and help text, so they
/// are wrapped directly; the remaining variants get a plain report, with
/// the first unit failure attached as help where one exists.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Build(inner) => miette::Report::new(inner),
        CliError::Manifest(inner) => miette::Report::new(inner),
        CliError::UnitsFailed {
            failed,
            total,
            first_error,
        } => miette::miette!(
            help = format!("first failure: {first_error}"),
            "{failed} of {total} build units failed"
        ),
        other => miette::miette!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_failed_message() {
        let err = CliError::UnitsFailed {
            failed: 2,
            total: 3,
            first_error: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "2 of 3 build units failed");
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = CliError::InvalidArgument("pass --name".to_string());
        assert!(err.to_string().contains("pass --name"));
    }

    #[test]
    fn test_units_failed_report_keeps_the_first_failure() {
        let err = CliError::UnitsFailed {
            failed: 1,
            total: 2,
            first_error: "entry does not exist".to_string(),
        };
        let report = cli_error_to_miette(err);
        let rendered = format!("{report:?}");
        assert!(rendered.contains("entry does not exist"));
    }

    #[test]
    fn test_manifest_errors_keep_their_diagnostic_code() {
        let err = CliError::Manifest(packlet_core::Error::InvalidConfig(
            "bad config".to_string(),
        ));
        let report = cli_error_to_miette(err);
        assert!(report.to_string().contains("bad config"));
    }
}
