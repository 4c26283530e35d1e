//! Command implementations for the packlet CLI.
//!
//! Each command lives in its own module and provides an `execute` function
//! that takes the parsed arguments and returns a Result.

pub mod build;

pub use build::execute as build_execute;
