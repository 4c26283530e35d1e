//! Error-code extraction and rewrite.

use std::borrow::Cow;

use anyhow::anyhow;
use packlet_core::{ErrorCodeMode, RegistryHandle};
use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, Plugin,
    SharedTransformPluginContext,
};

use crate::scan::{is_scannable, rewrite_invariant_calls, scan_invariant_calls};
use crate::session::UnitContext;

/// Runs the unit's error-code mode over every scannable module.
///
/// Extraction appends unseen invariant message templates to the shared
/// registry; rewrite splices each template's registered code over the
/// literal. A rewrite that meets an unregistered template fails the unit,
/// with the template recorded on the unit context so the session can
/// surface it as a configuration problem rather than a generic bundling
/// failure.
#[derive(Debug, Clone)]
pub struct ErrorCodesPlugin {
    mode: ErrorCodeMode,
    registry: RegistryHandle,
    context: UnitContext,
}

impl ErrorCodesPlugin {
    pub fn new(mode: ErrorCodeMode, registry: RegistryHandle, context: UnitContext) -> Self {
        Self {
            mode,
            registry,
            context,
        }
    }
}

impl Plugin for ErrorCodesPlugin {
    fn name(&self) -> Cow<'static, str> {
        "packlet:error-codes".into()
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
        let mode = self.mode;
        let registry = self.registry.clone();
        let context = self.context.clone();

        async move {
            if !is_scannable(&id) || id.contains("node_modules") {
                return Ok(None);
            }

            let calls = scan_invariant_calls(&code, &id);
            if calls.is_empty() {
                return Ok(None);
            }

            if mode.extracts() {
                for call in &calls {
                    let assigned = registry.record(&call.template);
                    tracing::debug!(
                        module = %id,
                        code = assigned,
                        template = %call.template,
                        "recorded error template"
                    );
                }
            }

            if !mode.rewrites() {
                return Ok(None);
            }

            match rewrite_invariant_calls(&code, &calls, |template| registry.code_for(template)) {
                Ok(rewritten) => Ok(Some(HookTransformOutput {
                    code: Some(rewritten),
                    map: None,
                    side_effects: None,
                    module_type: None,
                })),
                Err(template) => {
                    context.record_unknown_template(&template);
                    Err(anyhow!(
                        "no registered code for error template {template:?} in {id}"
                    ))
                }
            }
        }
    }
}
