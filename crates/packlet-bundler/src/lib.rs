#![cfg_attr(docsrs, feature(doc_cfg))]

//! # packlet-bundler
//!
//! Packlet bundler - Rolldown-backed build sessions on top of packlet-core.
//!
//! This crate interprets the declarative build plans produced by
//! `packlet-core`: it configures the Rolldown engine per plan, runs the
//! enabled pipeline stages as plugins, and orchestrates the whole session
//! of build units concurrently with atomic artifact writes.
//!
//! ## Quick Start
//!
//! ### Build a package
//!
//! ```no_run
//! use packlet_bundler::{ModuleFormat, SessionOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = SessionOptions::new("/work/my-lib", "src/index.ts", "@me/my-lib")
//!     .formats(vec![ModuleFormat::Cjs, ModuleFormat::Esm])
//!     .extract_errors(true);
//!
//! let report = packlet_bundler::build(options).await?;
//! for unit in &report.units {
//!     println!("{}", unit.summary());
//! }
//! std::process::exit(report.exit_code());
//! # }
//! ```
//!
//! ### Run a single unit
//!
//! ```no_run
//! use packlet_bundler::{BuildPlan, BundleEngine, RolldownEngine, UnitContext, decompose};
//! use packlet_bundler::SessionOptions;
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = SessionOptions::new("/work/my-lib", "src/index.ts", "my-lib");
//! let unit = decompose(&options)?.remove(0);
//! let plan = BuildPlan::from_request(&unit);
//!
//! let engine = RolldownEngine::default();
//! let context = UnitContext::default();
//! let bundle = engine.execute(&plan, &context, Path::new("/work/my-lib"), None).await?;
//! println!("{} artifacts emitted", bundle.assets.len());
//! # Ok(()) }
//! ```

// Re-export everything from the foundation crate
pub use packlet_core::*;

// Bundler-specific modules
pub mod diagnostics;
pub mod engine;
pub mod plugins;
pub mod scan;
pub mod session;
pub mod writer;

// Re-export core Rolldown types for library users
pub use rolldown::{
    BundleOutput, Bundler, BundlerOptions, GlobalsOutputOption, InputItem, IsExternal,
    OutputFormat, Platform, RawMinifyOptions, ResolveOptions, SourceMapType,
};
pub use rolldown_common::Output;

// Re-export bundler APIs
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use engine::{BundleEngine, RolldownEngine};
pub use session::{SessionReport, UnitContext, UnitOutcome, UnitReport, build, build_with_engine};
pub use writer::WrittenArtifact;

#[cfg(feature = "dts")]
#[cfg_attr(docsrs, doc(cfg(feature = "dts")))]
pub use plugins::DeclarationsPlugin;

/// Error types for packlet-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Parse or transform failure surfaced by the compile pipeline.
    #[error("Compilation failed: {}", format_diagnostics(.0))]
    Compilation(Vec<Diagnostic>),

    /// Resolution or emit failure surfaced by the bundling engine.
    #[error("Bundling failed: {}", format_diagnostics(.0))]
    Bundling(Vec<Diagnostic>),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

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

    /// Error from the foundation crate.
    #[error(transparent)]
    Core(#[from] packlet_core::Error),
}

/// Result type alias for packlet-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classifies an engine failure into a compilation or bundling error.
    ///
    /// Extracts structured diagnostics from the engine's error value; the
    /// batch is a compile failure when any diagnostic points at parse or
    /// transform stages, a bundling failure otherwise.
    pub fn from_engine_error(error: &dyn std::fmt::Debug) -> Self {
        let extracted = diagnostics::extract_from_engine_error(error);
        if extracted.iter().any(|d| d.kind.is_compilation()) {
            Error::Compilation(extracted)
        } else {
            Error::Bundling(extracted)
        }
    }

    /// Create an I/O error with a context message.
    pub fn io_context(source: std::io::Error, message: impl Into<String>) -> Self {
        Error::IoError {
            message: message.into(),
            source,
        }
    }
}

/// Format extracted diagnostics for display.
fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "unknown engine error".to_string();
    }

    if diagnostics.len() == 1 {
        let diag = &diagnostics[0];
        format!("{}: {}", diag.kind, diag.message)
    } else {
        format!(
            "{} errors: {}",
            diagnostics.len(),
            diagnostics
                .iter()
                .map(|d| format!("{}: {}", d.kind, d.message))
                .collect::<Vec<_>>()
                .join("; ")
        )
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Compilation(_) => Some(Box::new("COMPILATION_ERROR")),
            Error::Bundling(_) => Some(Box::new("BUNDLING_ERROR")),
            Error::InvalidOutputPath(_) => Some(Box::new("INVALID_OUTPUT_PATH")),
            Error::WriteFailure(_) => Some(Box::new("WRITE_FAILURE")),
            Error::Io(_) | Error::IoError { .. } => Some(Box::new("IO_ERROR")),
            Error::Core(inner) => miette::Diagnostic::code(inner),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Compilation(diagnostics) => {
                let diag = diagnostics.first()?;
                let file = diag.file.as_deref()?;
                Some(Box::new(format!("Check the source file: {file}")))
            }
            Error::Bundling(diagnostics) => {
                if diagnostics
                    .iter()
                    .any(|d| d.kind == DiagnosticKind::UnresolvedImport)
                {
                    Some(Box::new(
                        "An import could not be resolved. Check that the specifier is \
                         spelled correctly and the dependency is installed."
                            .to_string(),
                    ))
                } else {
                    None
                }
            }
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{path}' is invalid. Ensure it's within the output \
                 directory and doesn't contain '..' components."
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {msg}"
            ))),
            Error::Core(inner) => miette::Diagnostic::help(inner),
            _ => None,
        }
    }
}
