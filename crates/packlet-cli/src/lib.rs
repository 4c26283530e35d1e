//! Packlet CLI - zero-configuration library packaging.
//!
//! This crate provides the command-line interface for packlet, exposing the
//! session orchestrator from `packlet-bundler` through a single `build`
//! command with package.json-driven defaults.
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing with clap derive
//! - `commands` - Command implementations
//! - [`error`] - CLI error types and miette conversion
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal output: status lines, sizes, report rendering

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
