//! Shebang capture and removal.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use packlet_core::strip_shebang;
use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, Plugin,
    SharedTransformPluginContext,
};

use crate::session::UnitContext;

/// Strips a leading `#!` line before later stages parse the module.
///
/// Every module gets stripped; only the entry module's shebang is recorded
/// on the unit context, which surfaces it on the unit report.
#[derive(Debug, Clone)]
pub struct ShebangPlugin {
    entry: PathBuf,
    context: UnitContext,
}

impl ShebangPlugin {
    pub fn new(entry: PathBuf, context: UnitContext) -> Self {
        Self { entry, context }
    }
}

/// Module ids arrive resolved and absolute; the configured entry may be
/// project-relative.
fn is_entry_module(id: &str, entry: &Path) -> bool {
    let module = Path::new(id);
    if entry.is_absolute() {
        module == entry
    } else {
        module.ends_with(entry)
    }
}

impl Plugin for ShebangPlugin {
    fn name(&self) -> Cow<'static, str> {
        "packlet:shebang".into()
    }

    fn register_hook_usage(&self) -> rolldown_plugin::HookUsage {
        rolldown_plugin::HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let id = args.id.to_string();
        let code = args.code.to_string();
        let entry = self.entry.clone();
        let context = self.context.clone();

        async move {
            let (shebang, body) = strip_shebang(&code);
            let Some(shebang) = shebang else {
                return Ok(None);
            };

            if is_entry_module(&id, &entry) {
                tracing::debug!(module = %id, "captured entry shebang");
                context.record_shebang(shebang);
            }

            Ok(Some(HookTransformOutput {
                code: Some(body.to_string()),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_matching_handles_relative_and_absolute() {
        assert!(is_entry_module(
            "/work/pkg/src/cli.ts",
            Path::new("src/cli.ts")
        ));
        assert!(is_entry_module(
            "/work/pkg/src/cli.ts",
            Path::new("/work/pkg/src/cli.ts")
        ));
        assert!(!is_entry_module(
            "/work/pkg/src/other.ts",
            Path::new("src/cli.ts")
        ));
        // Component-wise, not substring: `i.ts` must not match `cli.ts`.
        assert!(!is_entry_module("/work/pkg/src/cli.ts", Path::new("i.ts")));
    }
}
