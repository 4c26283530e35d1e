//! External dependency classification.

use std::path::Path;

/// Helper package the syntax-lowering transform injects imports of.
///
/// These must be inlined: consumers cannot be asked to resolve the lowering
/// engine's internals, so the general bare-specifier policy does not apply.
pub const INLINED_HELPER: &str = "@oxc-project/runtime";

/// Decides which import specifiers stay external to the bundle.
///
/// Total over specifier strings: bare specifiers are a consumer concern and
/// stay external, relative and absolute paths are part of the package and
/// get bundled, and the lowering helper is bundled despite being bare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPolicy {
    entry: String,
}

impl ExternalPolicy {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
        }
    }

    pub fn is_external(&self, specifier: &str) -> bool {
        if specifier == self.entry {
            return false;
        }
        if is_inlined_helper(specifier) {
            return false;
        }
        !specifier.starts_with('.') && !Path::new(specifier).is_absolute()
    }
}

fn is_inlined_helper(specifier: &str) -> bool {
    specifier == INLINED_HELPER
        || specifier
            .strip_prefix(INLINED_HELPER)
            .is_some_and(|rest| rest.starts_with('/'))
}
