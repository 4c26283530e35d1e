use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::enums::{FormatArg, TargetArg};

/// Available packlet subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the package into publishable artifacts
    ///
    /// Expands the requested formats into build units (cjs and umd get
    /// development and production variants), runs them concurrently, and
    /// writes the artifact set plus the CommonJS entry stub to the output
    /// directory.
    Build(BuildArgs),
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Entry source file
    ///
    /// Defaults to the manifest's `source` field, else the first existing
    /// file among src/index.ts, src/index.tsx, src/index.jsx, src/index.js.
    #[arg(long, value_name = "PATH")]
    pub entry: Option<PathBuf>,

    /// Module formats to emit, comma-separated
    ///
    /// - cjs: CommonJS development + production pair with an entry stub
    /// - esm: one ECMAScript module build
    /// - umd: universal development + production pair with a global binding
    #[arg(
        short = 'f',
        long,
        value_enum,
        value_delimiter = ',',
        default_value = "cjs,esm",
        value_name = "FORMATS"
    )]
    pub formats: Vec<FormatArg>,

    /// Package name
    ///
    /// Overrides the manifest name. Output files are named after the
    /// unscoped package name.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Target platform for module resolution
    #[arg(long, value_enum, default_value = "browser")]
    pub target: TargetArg,

    /// TypeScript configuration file
    ///
    /// Defaults to tsconfig.json in the project root when one exists.
    #[arg(long, value_name = "PATH")]
    pub tsconfig: Option<PathBuf>,

    /// Override minification for every unit
    ///
    /// Without this flag, production units are minified and the rest are
    /// not. `--minify` forces it on everywhere, `--minify=false` off.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub minify: Option<bool>,

    /// Extract invariant error templates into errors/codes.json
    ///
    /// Development builds record templates; production builds additionally
    /// rewrite the call sites to numeric codes.
    #[arg(long)]
    pub extract_errors: bool,

    /// Keep building remaining units after a failure
    #[arg(long)]
    pub continue_on_error: bool,

    /// Output directory, relative to the project root unless absolute
    #[arg(short = 'd', long, default_value = "dist", value_name = "DIR")]
    pub out_dir: PathBuf,
}
