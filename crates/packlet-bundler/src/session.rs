//! Session orchestration.
//!
//! A session takes one [`SessionOptions`], expands it into build units,
//! resets the output directory once, runs the units concurrently against a
//! [`BundleEngine`], and folds the results into a [`SessionReport`]. The
//! error-code registry is loaded here and handed to units as a shared
//! [`RegistryHandle`]; the session owns the single commit at the end.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use packlet_core::{
    BuildEnv, BuildPlan, ErrorCodeRegistry, ModuleFormat, RegistryHandle, SessionOptions,
};
use parking_lot::Mutex;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::engine::{BundleEngine, RolldownEngine};
use crate::writer::{self, WrittenArtifact};
use crate::{Error, Result};

/// Feedback channel from a unit's transform stages back to the session.
///
/// Plugins run deep inside the engine and have no return path for
/// out-of-band facts like a captured shebang line. They record them here
/// instead; the session reads the slots once the unit settles. Clones share
/// one slot set.
#[derive(Debug, Clone, Default)]
pub struct UnitContext {
    inner: Arc<Mutex<UnitState>>,
}

#[derive(Debug, Default)]
struct UnitState {
    shebang: Option<String>,
    unknown_template: Option<String>,
}

impl UnitContext {
    /// Remembers the entry module's shebang line. First write wins.
    pub fn record_shebang(&self, line: &str) {
        let mut state = self.inner.lock();
        if state.shebang.is_none() {
            state.shebang = Some(line.to_string());
        }
    }

    pub fn shebang(&self) -> Option<String> {
        self.inner.lock().shebang.clone()
    }

    /// Remembers the first error template the rewriter could not map.
    pub fn record_unknown_template(&self, template: &str) {
        let mut state = self.inner.lock();
        if state.unknown_template.is_none() {
            state.unknown_template = Some(template.to_string());
        }
    }

    pub fn unknown_template(&self) -> Option<String> {
        self.inner.lock().unknown_template.clone()
    }
}

/// Terminal state of one build unit.
#[derive(Debug)]
pub enum UnitOutcome {
    /// All artifacts landed in the output directory.
    Succeeded { artifacts: Vec<WrittenArtifact> },
    /// The unit ran and failed.
    Failed { error: Error },
    /// The unit never settled: a sibling failed first, or it exceeded the
    /// session's unit timeout.
    Canceled,
}

/// Per-unit entry in the session report.
#[derive(Debug)]
pub struct UnitReport {
    pub label: String,
    pub format: ModuleFormat,
    pub env: Option<BuildEnv>,
    /// Primary artifact name, e.g. `widget-kit.cjs.production.min.js`.
    pub output_file: String,
    /// Shebang line stripped from the entry source, when one was present.
    /// Artifacts never carry it; callers that need it read it from here.
    pub shebang: Option<String>,
    pub duration: Duration,
    pub outcome: UnitOutcome,
}

impl UnitReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, UnitOutcome::Succeeded { .. })
    }

    /// Artifacts written by this unit, empty unless it succeeded.
    pub fn artifacts(&self) -> &[WrittenArtifact] {
        match &self.outcome {
            UnitOutcome::Succeeded { artifacts } => artifacts,
            _ => &[],
        }
    }

    /// One-line rendering for logs and plain terminal output.
    pub fn summary(&self) -> String {
        match &self.outcome {
            UnitOutcome::Succeeded { artifacts } => format!(
                "{}: {} ({} files, {} ms)",
                self.label,
                self.output_file,
                artifacts.len(),
                self.duration.as_millis()
            ),
            UnitOutcome::Failed { error } => format!("{}: failed: {error}", self.label),
            UnitOutcome::Canceled => format!("{}: canceled", self.label),
        }
    }
}

/// Everything a finished session produced, unit by unit.
#[derive(Debug)]
pub struct SessionReport {
    /// Unit reports in request order.
    pub units: Vec<UnitReport>,
    /// CommonJS entry stub, when one was written.
    pub entry_stub: Option<WrittenArtifact>,
    /// Error templates known to the registry after the session.
    pub error_templates: usize,
    pub duration: Duration,
}

impl SessionReport {
    pub fn succeeded(&self) -> bool {
        self.units.iter().all(UnitReport::succeeded)
    }

    /// Process exit code mirroring the session state.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }
}

/// Runs a full packaging session with the Rolldown engine.
///
/// Session-scoped problems (bad options, an unreadable registry, a failed
/// output-directory reset) surface as `Err`; per-unit failures land in the
/// report with the surviving units intact.
pub async fn build(options: SessionOptions) -> Result<SessionReport> {
    build_with_engine(RolldownEngine, options).await
}

/// Runs a session against any engine. Tests substitute failing or stalling
/// engines here.
pub async fn build_with_engine<E>(engine: E, options: SessionOptions) -> Result<SessionReport>
where
    E: BundleEngine + Clone + 'static,
{
    let session_start = Instant::now();

    let mut options = options;
    options.project_root = absolutize(&options.project_root)?;
    let project_root = options.project_root.clone();
    let dist_dir = options.dist_dir().clean();

    let units = packlet_core::decompose(&options)?;
    packlet_core::validate_units(&units)?;
    let plans: Vec<BuildPlan> = units.iter().map(BuildPlan::from_request).collect();

    let registry = ErrorCodeRegistry::load(ErrorCodeRegistry::default_path(&project_root))?;
    let registry = RegistryHandle::new(registry);

    reset_output_dir(&dist_dir, &project_root).await?;

    tracing::info!(
        package = %options.name,
        units = plans.len(),
        out_dir = %dist_dir.display(),
        "starting build session"
    );

    let max_parallel = num_cpus::get().min(8);
    let semaphore = Arc::new(Semaphore::new(max_parallel));
    let mut join_set = JoinSet::new();

    for (index, plan) in plans.iter().enumerate() {
        let engine = engine.clone();
        let plan = plan.clone();
        let registry = registry.clone();
        let project_root = project_root.clone();
        let dist_dir = dist_dir.clone();
        let unit_timeout = options.unit_timeout;
        let permit = Arc::clone(&semaphore);

        join_set.spawn(async move {
            let _permit = permit
                .acquire()
                .await
                .expect("semaphore closed unexpectedly");

            let started = Instant::now();
            let context = UnitContext::default();
            let unit = run_unit(&engine, &plan, &context, &project_root, &dist_dir, registry);
            let outcome = match unit_timeout {
                Some(budget) => match tokio::time::timeout(budget, unit).await {
                    Ok(result) => settle(result),
                    Err(_) => {
                        tracing::warn!(
                            unit = %plan.label(),
                            budget_ms = budget.as_millis() as u64,
                            "unit timed out"
                        );
                        UnitOutcome::Canceled
                    }
                },
                None => settle(unit.await),
            };

            match &outcome {
                UnitOutcome::Succeeded { artifacts } => {
                    tracing::info!(unit = %plan.label(), files = artifacts.len(), "unit finished");
                }
                UnitOutcome::Failed { error } => {
                    tracing::error!(unit = %plan.label(), "unit failed: {error}");
                }
                UnitOutcome::Canceled => {}
            }

            (index, started.elapsed(), outcome, context.shebang())
        });
    }

    let mut settled: FxHashMap<usize, (Duration, UnitOutcome, Option<String>)> =
        FxHashMap::with_capacity_and_hasher(plans.len(), Default::default());
    let mut panics = 0usize;

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, elapsed, outcome, shebang)) => {
                let failed = !matches!(outcome, UnitOutcome::Succeeded { .. });
                settled.insert(index, (elapsed, outcome, shebang));
                if failed && !options.continue_on_error {
                    join_set.abort_all();
                }
            }
            Err(join_error) if join_error.is_cancelled() => {}
            Err(join_error) => {
                panics += 1;
                tracing::error!("build task panicked: {join_error}");
            }
        }
    }

    let mut unit_reports = Vec::with_capacity(plans.len());
    for (index, plan) in plans.iter().enumerate() {
        let (duration, outcome, shebang) = match settled.remove(&index) {
            Some(entry) => entry,
            // A missing entry is an aborted sibling, unless a panic went
            // unattributed.
            None if panics > 0 => {
                panics -= 1;
                (
                    Duration::ZERO,
                    UnitOutcome::Failed {
                        error: Error::Bundling(vec![Diagnostic {
                            kind: DiagnosticKind::Other,
                            message: "build task panicked".to_string(),
                            file: None,
                            line: None,
                        }]),
                    },
                    None,
                )
            }
            None => (Duration::ZERO, UnitOutcome::Canceled, None),
        };
        unit_reports.push(UnitReport {
            label: plan.label(),
            format: plan.format,
            env: plan.env,
            output_file: plan.output_file.clone(),
            shebang,
            duration,
            outcome,
        });
    }

    let entry_stub = write_stub_if_ready(&unit_reports, &dist_dir, &options.name)?;

    registry.commit()?;

    let report = SessionReport {
        units: unit_reports,
        entry_stub,
        error_templates: registry.len(),
        duration: session_start.elapsed(),
    };

    tracing::info!(
        succeeded = report.units.iter().filter(|u| u.succeeded()).count(),
        total = report.units.len(),
        elapsed_ms = report.duration.as_millis() as u64,
        "session finished"
    );

    Ok(report)
}

/// One unit end to end: engine execution, then artifact writes.
async fn run_unit<E: BundleEngine>(
    engine: &E,
    plan: &BuildPlan,
    context: &UnitContext,
    project_root: &Path,
    dist_dir: &Path,
    registry: RegistryHandle,
) -> Result<Vec<WrittenArtifact>> {
    let bundle = match engine
        .execute(plan, context, project_root, Some(registry))
        .await
    {
        Ok(bundle) => bundle,
        Err(error) => {
            // An unmapped template is a registry problem, not an engine one.
            if let Some(template) = context.unknown_template() {
                return Err(packlet_core::Error::UnknownErrorCode { template }.into());
            }
            return Err(error);
        }
    };

    writer::write_bundle(&bundle, dist_dir, plan, project_root)
}

fn settle(result: Result<Vec<WrittenArtifact>>) -> UnitOutcome {
    match result {
        Ok(artifacts) => UnitOutcome::Succeeded { artifacts },
        Err(error) => UnitOutcome::Failed { error },
    }
}

/// The CommonJS entry stub goes out only when every cjs unit made it;
/// a stub pointing at a missing artifact would break `require`.
fn write_stub_if_ready(
    units: &[UnitReport],
    dist_dir: &Path,
    package_name: &str,
) -> Result<Option<WrittenArtifact>> {
    let cjs: Vec<&UnitReport> = units
        .iter()
        .filter(|u| u.format == ModuleFormat::Cjs)
        .collect();
    if cjs.is_empty() || !cjs.iter().all(|u| u.succeeded()) {
        return Ok(None);
    }
    writer::write_entry_stub(dist_dir, package_name).map(Some)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    let cleaned = path.to_path_buf().clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir()
        .map_err(|err| Error::io_context(err, "Failed to resolve the current directory"))?;
    Ok(cwd.join(cleaned).clean())
}

/// Clears the output directory so stale artifacts never survive a session.
async fn reset_output_dir(dist_dir: &Path, project_root: &Path) -> Result<()> {
    if dist_dir == project_root || project_root.starts_with(dist_dir) {
        return Err(packlet_core::Error::InvalidConfig(format!(
            "Output directory {} contains the project root",
            dist_dir.display()
        ))
        .into());
    }

    match tokio::fs::remove_dir_all(dist_dir).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(Error::io_context(
                err,
                format!("Failed to clear output directory {}", dist_dir.display()),
            ));
        }
    }

    tokio::fs::create_dir_all(dist_dir).await.map_err(|err| {
        Error::io_context(
            err,
            format!("Failed to create output directory {}", dist_dir.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rolldown::BundleOutput;

    use super::*;

    fn failure() -> Error {
        Error::Bundling(vec![Diagnostic {
            kind: DiagnosticKind::Other,
            message: "engine unavailable".to_string(),
            file: None,
            line: None,
        }])
    }

    /// Fails the first `execute` call, stalls on every later one.
    #[derive(Clone, Default)]
    struct FailFirstEngine {
        calls: Arc<AtomicUsize>,
    }

    impl BundleEngine for FailFirstEngine {
        fn execute(
            &self,
            _plan: &BuildPlan,
            _context: &UnitContext,
            _project_root: &Path,
            _registry: Option<RegistryHandle>,
        ) -> impl std::future::Future<Output = Result<BundleOutput>> + Send {
            let first = self.calls.fetch_add(1, Ordering::SeqCst) == 0;
            async move {
                if !first {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                Err(failure())
            }
        }
    }

    /// Never settles.
    #[derive(Clone)]
    struct StallingEngine;

    impl BundleEngine for StallingEngine {
        fn execute(
            &self,
            _plan: &BuildPlan,
            _context: &UnitContext,
            _project_root: &Path,
            _registry: Option<RegistryHandle>,
        ) -> impl std::future::Future<Output = Result<BundleOutput>> + Send {
            async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(failure())
            }
        }
    }

    /// Reports an unmapped error template, then fails.
    #[derive(Clone)]
    struct UnknownTemplateEngine;

    impl BundleEngine for UnknownTemplateEngine {
        fn execute(
            &self,
            _plan: &BuildPlan,
            context: &UnitContext,
            _project_root: &Path,
            _registry: Option<RegistryHandle>,
        ) -> impl std::future::Future<Output = Result<BundleOutput>> + Send {
            context.record_unknown_template("Expected %s");
            async move { Err(failure()) }
        }
    }

    fn options_in(dir: &Path) -> SessionOptions {
        SessionOptions::new(dir, "src/index.ts", "demo-pkg")
    }

    #[test]
    fn context_keeps_the_first_shebang() {
        let context = UnitContext::default();
        context.record_shebang("#!/usr/bin/env node");
        context.record_shebang("#!/bin/sh");
        assert_eq!(context.shebang().as_deref(), Some("#!/usr/bin/env node"));

        let clone = context.clone();
        assert_eq!(clone.shebang().as_deref(), Some("#!/usr/bin/env node"));
    }

    #[tokio::test]
    async fn first_failure_cancels_the_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_in(dir.path()).formats(vec![ModuleFormat::Cjs]);

        let report = build_with_engine(FailFirstEngine::default(), options)
            .await
            .unwrap();

        assert_eq!(report.units.len(), 2);
        assert_eq!(report.exit_code(), 1);
        let failed = report
            .units
            .iter()
            .filter(|u| matches!(u.outcome, UnitOutcome::Failed { .. }))
            .count();
        let canceled = report
            .units
            .iter()
            .filter(|u| matches!(u.outcome, UnitOutcome::Canceled))
            .count();
        assert_eq!(failed, 1);
        assert_eq!(canceled, 1);
        assert!(report.entry_stub.is_none());
    }

    #[tokio::test]
    async fn timed_out_unit_reports_canceled() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options_in(dir.path()).formats(vec![ModuleFormat::Esm]);
        options.unit_timeout = Some(Duration::from_millis(50));

        let report = build_with_engine(StallingEngine, options).await.unwrap();

        assert_eq!(report.units.len(), 1);
        assert!(matches!(report.units[0].outcome, UnitOutcome::Canceled));
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn unknown_template_surfaces_as_registry_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_in(dir.path()).formats(vec![ModuleFormat::Esm]);

        let report = build_with_engine(UnknownTemplateEngine, options)
            .await
            .unwrap();

        match &report.units[0].outcome {
            UnitOutcome::Failed {
                error: Error::Core(packlet_core::Error::UnknownErrorCode { template }),
            } => assert_eq!(template, "Expected %s"),
            other => panic!("expected an unknown-code failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn output_directory_is_reset_before_units_run() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("stale.js"), "old").unwrap();

        let options = options_in(dir.path()).formats(vec![ModuleFormat::Esm]);
        let report = build_with_engine(UnknownTemplateEngine, options)
            .await
            .unwrap();

        assert_eq!(report.exit_code(), 1);
        assert!(dist.exists());
        assert!(!dist.join("stale.js").exists());
    }

    #[tokio::test]
    async fn output_directory_may_not_contain_the_project() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options_in(dir.path());
        options.out_dir = PathBuf::from(".");

        let err = build_with_engine(StallingEngine, options)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Core(packlet_core::Error::InvalidConfig(_))
        ));
    }
}
