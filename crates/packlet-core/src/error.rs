//! Error types for packlet-core operations.

use std::path::PathBuf;

/// Error types for build planning and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or contradictory build configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A message template has no registered error code.
    ///
    /// Raised by the production rewrite pass when a template in source is
    /// missing from the persisted registry. Continuing would emit an id the
    /// published code table cannot decode.
    #[error("Unknown error code for message template: {template:?}")]
    UnknownErrorCode { template: String },

    /// The error-code registry file could not be parsed.
    #[error("Malformed error-code registry at {path}: {source}")]
    MalformedRegistry {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The package manifest could not be parsed.
    #[error("Malformed package manifest at {path}: {source}")]
    MalformedManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A source map could not be parsed or lacked the expected shape.
    #[error("Malformed source map: {0}")]
    MalformedSourceMap(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for packlet-core operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach a path-bearing message to an I/O error.
    pub fn io_context(source: std::io::Error, message: impl Into<String>) -> Self {
        Error::IoError {
            message: message.into(),
            source,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::UnknownErrorCode { .. } => "UNKNOWN_ERROR_CODE",
            Error::MalformedRegistry { .. } => "MALFORMED_REGISTRY",
            Error::MalformedManifest { .. } => "MALFORMED_MANIFEST",
            Error::MalformedSourceMap(_) => "MALFORMED_SOURCE_MAP",
            Error::Io(_) | Error::IoError { .. } => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::UnknownErrorCode { template } => Some(Box::new(format!(
                "Run the build once with --extract-errors so {template:?} is assigned a code, then rebuild.",
            ))),
            Error::MalformedRegistry { path, .. } => Some(Box::new(format!(
                "The registry at '{}' must be a flat JSON object mapping message templates to integer codes.",
                path.display()
            ))),
            _ => None,
        }
    }
}
