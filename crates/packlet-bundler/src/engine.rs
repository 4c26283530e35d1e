//! Build plan execution.
//!
//! One [`BuildPlan`] in, one in-memory bundle out. The engine translates
//! the plan's declarative fields into Rolldown options, assembles the
//! stage plugins in plan order, and runs a single generate pass. Writing
//! artifacts to disk is the writer's job; the engine never touches the
//! output directory.

use std::path::Path;
use std::sync::Arc;

use packlet_core::{
    BuildPlan, ErrorCodeMode, ModuleFormat, PipelineStage, RegistryHandle, Target,
};
use rolldown::{
    BundleOutput, BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, GlobalsOutputOption,
    InputItem, OutputFormat, Platform, RawMinifyOptions, ResolveOptions, SourceMapType, TsConfig,
};
use rolldown_plugin::__inner::SharedPluginable;
use rustc_hash::FxHashMap;

use crate::plugins::{EnvReplacePlugin, ErrorCodesPlugin, ExternalsPlugin, ShebangPlugin};
use crate::session::UnitContext;
use crate::{Error, Result};

/// Executes build plans against a bundling engine.
///
/// The session orchestrator only speaks this trait, so tests can substitute
/// an engine that fails or stalls on command.
pub trait BundleEngine: Send + Sync {
    /// Runs the plan to completion, producing in-memory artifacts.
    ///
    /// `registry` is required whenever the plan's error-code mode is not
    /// [`ErrorCodeMode::Off`]. The future is `Send` so the session can run
    /// units on worker tasks.
    fn execute(
        &self,
        plan: &BuildPlan,
        context: &UnitContext,
        project_root: &Path,
        registry: Option<RegistryHandle>,
    ) -> impl std::future::Future<Output = Result<BundleOutput>> + Send;
}

/// The Rolldown-backed engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownEngine;

impl BundleEngine for RolldownEngine {
    fn execute(
        &self,
        plan: &BuildPlan,
        context: &UnitContext,
        project_root: &Path,
        registry: Option<RegistryHandle>,
    ) -> impl std::future::Future<Output = Result<BundleOutput>> + Send {
        let options = configure_options(plan, project_root);
        let plugins = assemble_plugins(plan, context, registry);
        let label = plan.label();
        let input = plan.input.clone();

        async move {
            let plugins = plugins?;

            tracing::debug!(unit = %label, input = %input.display(), "starting bundle");

            let mut bundler = RolldownBundlerBuilder::default()
                .with_options(options)
                .with_plugins(plugins)
                .build()
                .map_err(|e| Error::from_engine_error(&e))?;

            let bundle = bundler
                .generate()
                .await
                .map_err(|e| Error::from_engine_error(&e))?;

            for warning in &bundle.warnings {
                tracing::warn!(unit = %label, "{warning:?}");
            }

            Ok(bundle)
        }
    }
}

/// Translate a plan into Rolldown options.
///
/// The entry chunk is named after the plan's output stem so the default
/// `[name].js` pattern lands the artifact exactly on `plan.output_file`.
fn configure_options(plan: &BuildPlan, project_root: &Path) -> BundlerOptions {
    let format = match plan.format {
        ModuleFormat::Cjs => OutputFormat::Cjs,
        ModuleFormat::Esm => OutputFormat::Esm,
        ModuleFormat::Umd => OutputFormat::Umd,
    };

    let platform = match plan.target {
        Target::Node => Platform::Node,
        Target::Browser => Platform::Browser,
    };

    let mut options = BundlerOptions {
        input: Some(vec![InputItem {
            name: Some(plan.output_stem().to_string()),
            import: plan.input.to_string_lossy().into_owned(),
        }]),
        cwd: Some(project_root.to_path_buf()),
        format: Some(format),
        platform: Some(platform),
        sourcemap: plan.sourcemap.then_some(SourceMapType::File),
        minify: Some(RawMinifyOptions::Bool(plan.minify)),
        entry_filenames: Some("[name].js".to_string().into()),
        chunk_filenames: Some("[name]-[hash].js".to_string().into()),
        resolve: Some(configure_resolution(plan, project_root)),
        tsconfig: plan.tsconfig.clone().map(TsConfig::Manual),
        ..Default::default()
    };

    if plan.format == ModuleFormat::Umd {
        options.name = plan.global_name.clone();
        options.globals = Some(GlobalsOutputOption::from(known_globals()));
    }

    options
}

/// Conventional global names for externals the universal-module wrapper
/// must reference off `window`. Externals outside this map fall back to
/// the engine's derived names, with a warning from the engine.
fn known_globals() -> FxHashMap<String, String> {
    let mut globals = FxHashMap::default();
    globals.insert("react".to_string(), "React".to_string());
    globals.insert("react-native".to_string(), "ReactNative".to_string());
    globals
}

/// Configure module resolution for the plan's target.
fn configure_resolution(plan: &BuildPlan, project_root: &Path) -> ResolveOptions {
    let main_fields = match plan.target {
        Target::Node => vec!["module".to_string(), "main".to_string()],
        Target::Browser => vec![
            "browser".to_string(),
            "module".to_string(),
            "main".to_string(),
        ],
    };

    let condition_names = match plan.target {
        Target::Node => vec![
            "node".to_string(),
            "import".to_string(),
            "require".to_string(),
            "default".to_string(),
        ],
        Target::Browser => vec![
            "browser".to_string(),
            "import".to_string(),
            "default".to_string(),
        ],
    };

    // node_modules walk-up from the project root
    let mut modules = Vec::new();
    let mut current = project_root;
    loop {
        modules.push(current.join("node_modules").to_string_lossy().to_string());
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    modules.push("node_modules".to_string());

    ResolveOptions {
        main_fields: Some(main_fields),
        condition_names: Some(condition_names),
        extensions: Some(vec![
            ".ts".to_string(),
            ".tsx".to_string(),
            ".mjs".to_string(),
            ".js".to_string(),
            ".jsx".to_string(),
            ".json".to_string(),
        ]),
        modules: Some(modules),
        symlinks: Some(true),
        ..Default::default()
    }
}

/// Build the plugin list for the plan's enabled stages, in stage order.
fn assemble_plugins(
    plan: &BuildPlan,
    context: &UnitContext,
    registry: Option<RegistryHandle>,
) -> Result<Vec<SharedPluginable>> {
    let mut plugins: Vec<SharedPluginable> = Vec::new();

    for stage in &plan.stages {
        match stage {
            PipelineStage::ClassifyExternals => {
                plugins.push(Arc::new(ExternalsPlugin::new(plan.external.clone())));
            }
            PipelineStage::CaptureShebang => {
                plugins.push(Arc::new(ShebangPlugin::new(
                    plan.input.clone(),
                    context.clone(),
                )));
            }
            PipelineStage::TransformSyntax if plan.error_codes != ErrorCodeMode::Off => {
                let registry = registry.clone().ok_or_else(|| {
                    packlet_core::Error::InvalidConfig(
                        "error-code handling requires a registry handle".to_string(),
                    )
                })?;
                plugins.push(Arc::new(ErrorCodesPlugin::new(
                    plan.error_codes,
                    registry,
                    context.clone(),
                )));
            }
            PipelineStage::SubstituteEnv => {
                if let Some(value) = &plan.env_substitution {
                    plugins.push(Arc::new(EnvReplacePlugin::new(value)));
                }
            }
            // The remaining stages are engine options, not plugins.
            _ => {}
        }
    }

    #[cfg(feature = "dts")]
    if plan.declarations {
        plugins.push(Arc::new(crate::plugins::DeclarationsPlugin::new(false)));
    }

    #[cfg(not(feature = "dts"))]
    if plan.declarations {
        tracing::warn!("declaration output requested but this build omits the dts feature");
    }

    Ok(plugins)
}
