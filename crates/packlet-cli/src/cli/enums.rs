use clap::ValueEnum;
use packlet_core::{ModuleFormat, Target};

/// Module format for emitted bundles
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum FormatArg {
    /// CommonJS modules (require/module.exports)
    ///
    /// Decomposes into a development build and a minified production build,
    /// plus the dist/index.js stub that picks one at require time.
    #[value(name = "cjs")]
    Cjs,

    /// ECMAScript modules (import/export syntax)
    ///
    /// One environment-agnostic build; `process.env.NODE_ENV` is left
    /// intact for the consumer's bundler.
    #[value(name = "esm")]
    Esm,

    /// Universal module definition
    ///
    /// Script-tag compatible builds binding a global derived from the
    /// package name.
    #[value(name = "umd")]
    Umd,
}

impl From<FormatArg> for ModuleFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Cjs => ModuleFormat::Cjs,
            FormatArg::Esm => ModuleFormat::Esm,
            FormatArg::Umd => ModuleFormat::Umd,
        }
    }
}

/// Target platform environment
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum TargetArg {
    /// Node.js resolution: node conditions, module/main fields
    #[value(name = "node")]
    Node,

    /// Browser resolution: browser conditions and field first
    #[value(name = "browser")]
    Browser,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Node => Target::Node,
            TargetArg::Browser => Target::Browser,
        }
    }
}
