//! Bare-specifier externalization.

use std::borrow::Cow;

use packlet_core::ExternalPolicy;
use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, Plugin, PluginContext,
};

/// Marks bare import specifiers external so the consumer's resolver handles
/// them, while relative and absolute imports stay in the bundle.
///
/// The lowering helper package is the one bare specifier that must be
/// inlined; the policy knows about it.
#[derive(Debug, Clone)]
pub struct ExternalsPlugin {
    policy: ExternalPolicy,
}

impl ExternalsPlugin {
    pub fn new(policy: ExternalPolicy) -> Self {
        Self { policy }
    }
}

impl Plugin for ExternalsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "packlet:externals".into()
    }

    fn register_hook_usage(&self) -> rolldown_plugin::HookUsage {
        rolldown_plugin::HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let external = self.policy.is_external(&specifier);

        async move {
            if external {
                return Ok(Some(HookResolveIdOutput {
                    id: specifier.into(),
                    external: Some(ResolvedExternal::Bool(true)),
                    ..Default::default()
                }));
            }
            // Not ours to claim; the default resolver takes over.
            Ok(None)
        }
    }
}
