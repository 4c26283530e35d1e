//! Pipeline stages as engine plugins.
//!
//! Stages that observe or rewrite module source map onto one plugin each;
//! the engine assembles them in the order the build plan's stage list
//! dictates. The remaining stages (type compilation, syntax lowering,
//! sourcemap merging, minification) are handled by the engine's own
//! options and have no plugin here.

mod env_replace;
mod error_codes;
mod externals;
mod shebang;

#[cfg(feature = "dts")]
mod dts;

pub use env_replace::EnvReplacePlugin;
pub use error_codes::ErrorCodesPlugin;
pub use externals::ExternalsPlugin;
pub use shebang::ShebangPlugin;

#[cfg(feature = "dts")]
#[cfg_attr(docsrs, doc(cfg(feature = "dts")))]
pub use dts::DeclarationsPlugin;
