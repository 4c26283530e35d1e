//! Command-line interface definition.
//!
//! The complete CLI structure, built with clap v4 derive macros. Packlet is
//! zero-config: the `build` command reads its defaults from the nearest
//! package.json and every flag is an override.

mod commands;
pub mod enums;

use clap::Parser;

pub use commands::{BuildArgs, Command};
pub use enums::{FormatArg, TargetArg};

/// Packlet - zero-configuration library packaging
#[derive(Parser, Debug)]
#[command(
    name = "packlet",
    version,
    about = "Zero-configuration packaging for JavaScript and TypeScript libraries",
    long_about = "Packlet bundles a library entry point into publishable artifacts:\n\
                  CommonJS development and production builds, an ECMAScript module\n\
                  build, optional UMD builds, declaration files, and source maps,\n\
                  all named after the package and written in one atomic session."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
