//! Build command implementation.
//!
//! Resolves zero-config defaults from the nearest package.json, assembles
//! the session options, and runs the build through packlet-bundler.

use std::path::{Path, PathBuf};
use std::time::Instant;

use packlet_core::manifest::PackageManifest;
use packlet_core::request::SessionOptions;
use packlet_core::{CJS_ENTRY_FILE, ModuleFormat};

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use crate::ui;

/// Entry file candidates probed when neither `--entry` nor the manifest
/// `source` field names one.
const ENTRY_CANDIDATES: &[&str] = &[
    "src/index.ts",
    "src/index.tsx",
    "src/index.jsx",
    "src/index.js",
];

/// Execute the build command.
///
/// Defaults resolve in CLI > manifest > convention order:
///
/// 1. Project root: the directory holding the nearest package.json, else
///    the current directory
/// 2. Package name: `--name`, else the manifest `name` field
/// 3. Entry: `--entry`, else the manifest `source` field, else the first
///    existing src/index.{ts,tsx,jsx,js}
/// 4. tsconfig: `--tsconfig`, else tsconfig.json in the project root
///
/// # Errors
///
/// Returns errors when no package name can be resolved, no entry file
/// exists, or the build session itself fails.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start_time = Instant::now();

    let cwd = std::env::current_dir()?;
    let manifest = match PackageManifest::find_from_dir(&cwd) {
        Ok(manifest) => Some(manifest),
        // A missing manifest is fine; flags can stand in for it. A present
        // but unreadable one is not.
        Err(packlet_core::Error::InvalidConfig(_)) => None,
        Err(err) => return Err(err.into()),
    };

    let project_root = manifest
        .as_ref()
        .and_then(|m| m.root())
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.clone());

    let name = args
        .name
        .or_else(|| manifest.as_ref().and_then(|m| m.name.clone()))
        .ok_or_else(|| {
            CliError::InvalidArgument(
                "No package name found; add a \"name\" field to package.json or pass --name"
                    .to_string(),
            )
        })?;

    let entry = resolve_entry(args.entry, manifest.as_ref(), &project_root)?;

    let tsconfig = args.tsconfig.or_else(|| {
        let default = project_root.join("tsconfig.json");
        default.is_file().then_some(default)
    });

    tracing::debug!(
        root = %project_root.display(),
        entry = %entry.display(),
        name = %name,
        "resolved build defaults"
    );

    let mut options = SessionOptions::new(project_root, entry, name)
        .formats(args.formats.into_iter().map(Into::into).collect())
        .target(args.target.into())
        .extract_errors(args.extract_errors)
        .minify(args.minify)
        .continue_on_error(args.continue_on_error);
    options.tsconfig = tsconfig;
    options.out_dir = args.out_dir;

    if options.formats.contains(&ModuleFormat::Cjs) {
        if let Some(main) = manifest.as_ref().and_then(|m| m.main.as_deref()) {
            if main_field_misses_stub(main, &options.out_dir) {
                ui::warning(&format!(
                    "package.json \"main\" is {main:?}; the require entry is written to {}",
                    options.out_dir.join(CJS_ENTRY_FILE).display()
                ));
            }
        }
    }

    let report = packlet_bundler::build(options).await?;

    ui::print_report(&report);

    if report.exit_code() != 0 {
        let failed = report.units.iter().filter(|u| !u.succeeded()).count();
        let first_error = report
            .units
            .iter()
            .find_map(|unit| match &unit.outcome {
                packlet_bundler::UnitOutcome::Failed { error } => Some(error.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "one or more units were canceled".to_string());
        return Err(CliError::UnitsFailed {
            failed,
            total: report.units.len(),
            first_error,
        });
    }

    ui::success(&format!(
        "Build completed in {}",
        ui::format_duration(start_time.elapsed())
    ));

    Ok(())
}

/// Picks the entry file: explicit flag, manifest `source`, then the
/// conventional src/index.* candidates.
fn resolve_entry(
    flag: Option<PathBuf>,
    manifest: Option<&PackageManifest>,
    project_root: &std::path::Path,
) -> Result<PathBuf> {
    if let Some(entry) = flag {
        return Ok(entry);
    }
    if let Some(source) = manifest.and_then(|m| m.source.as_deref()) {
        return Ok(PathBuf::from(source));
    }
    for candidate in ENTRY_CANDIDATES {
        if project_root.join(candidate).is_file() {
            return Ok(PathBuf::from(candidate));
        }
    }
    Err(CliError::EntryNotFound(format!(
        "No entry file found; pass --entry or create one of: {}",
        ENTRY_CANDIDATES.join(", ")
    )))
}

/// Consumers load common-module builds through the manifest's `main` field;
/// it should point at the entry stub, not at one of the per-env artifacts.
fn main_field_misses_stub(main: &str, out_dir: &Path) -> bool {
    Path::new(main.trim_start_matches("./")) != out_dir.join(CJS_ENTRY_FILE)
}
