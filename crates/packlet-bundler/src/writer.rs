//! Atomic artifact writing.
//!
//! All artifact paths are validated against the output directory before
//! anything touches disk, and every write goes through a two-phase commit:
//! content lands in `.tmp` files first, then renames into place, with
//! best-effort rollback when any step fails. A unit either contributes all
//! of its files or none of them.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rolldown::BundleOutput;
use rolldown_common::Output;

use packlet_core::{
    BuildEnv, BuildPlan, CJS_ENTRY_FILE, ModuleFormat, output_file_name, rewrite_sources,
};

use crate::{Error, Result};

/// One file a unit landed in the output directory.
#[derive(Debug, Clone)]
pub struct WrittenArtifact {
    /// File name relative to the output directory.
    pub filename: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Writes a unit's bundle into the output directory.
///
/// Chunks and assets are validated, and source maps get their `sources`
/// entries rewritten to package-relative form. Returns the written files.
pub fn write_bundle(
    bundle: &BundleOutput,
    dist_dir: &Path,
    plan: &BuildPlan,
    project_root: &Path,
) -> Result<Vec<WrittenArtifact>> {
    let dist_dir = validate_and_normalize_dir(dist_dir)?;

    fs::create_dir_all(&dist_dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dist_dir.display(),
            e
        ))
    })?;

    let mut operations: Vec<(PathBuf, Vec<u8>)> = Vec::new();
    for output in &bundle.assets {
        match output {
            Output::Chunk(chunk) => {
                let filename = chunk.filename.as_str();
                let target = validate_output_path(&dist_dir, filename)?;
                operations.push((target, chunk.code.clone().into_bytes()));
            }
            Output::Asset(asset) => {
                let filename = asset.filename.as_str();
                let target = validate_output_path(&dist_dir, filename)?;

                let content = if filename.ends_with(".map") {
                    let map = String::from_utf8_lossy(asset.source.as_bytes());
                    rewrite_sources(&map, &dist_dir, project_root, &plan.package_name)?
                        .into_bytes()
                } else {
                    asset.source.as_bytes().to_vec()
                };
                operations.push((target, content));
            }
        }
    }

    write_files_atomic(&operations)?;

    Ok(operations
        .iter()
        .map(|(path, content)| WrittenArtifact {
            filename: path
                .strip_prefix(&dist_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned(),
            path: path.clone(),
            bytes: content.len() as u64,
        })
        .collect())
}

/// Writes the CommonJS entry stub.
///
/// The stub is the package's `main` file: it picks the production or
/// development CommonJS artifact at require time based on `NODE_ENV`, so
/// consumers load assertions in development and the minified build in
/// production without changing imports.
pub fn write_entry_stub(dist_dir: &Path, package_name: &str) -> Result<WrittenArtifact> {
    let dist_dir = validate_and_normalize_dir(dist_dir)?;
    let target = validate_output_path(&dist_dir, CJS_ENTRY_FILE)?;

    let stub = render_entry_stub(package_name);
    let bytes = stub.len() as u64;
    write_files_atomic(&[(target.clone(), stub.into_bytes())])?;

    Ok(WrittenArtifact {
        filename: CJS_ENTRY_FILE.to_string(),
        path: target,
        bytes,
    })
}

fn render_entry_stub(package_name: &str) -> String {
    let production = output_file_name(
        package_name,
        ModuleFormat::Cjs,
        Some(BuildEnv::Production),
        true,
    );
    let development = output_file_name(
        package_name,
        ModuleFormat::Cjs,
        Some(BuildEnv::Development),
        false,
    );

    format!(
        "'use strict'\n\n\
         if (process.env.NODE_ENV === 'production') {{\n\
         \x20 module.exports = require('./{production}')\n\
         }} else {{\n\
         \x20 module.exports = require('./{development}')\n\
         }}\n"
    )
}

/// Validates and normalizes a directory path.
fn validate_and_normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| Error::InvalidOutputPath(format!("Failed to get current directory: {e}")))?;
    Ok(cwd.join(&cleaned).clean())
}

/// Validates an artifact path against directory traversal.
///
/// Cleans the filename, joins it onto the base directory, cleans again,
/// and requires the result to still sit under the base directory.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let filename_path = Path::new(filename).clean();
    let full_path = base_dir.join(&filename_path).clean();

    if !full_path.starts_with(base_dir) {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

/// Writes multiple files with a two-phase commit.
///
/// Phase one writes `.tmp` siblings; phase two renames them into place.
/// Any failure deletes the temp files already written.
fn write_files_atomic(operations: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = target_path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    for (temp_path, target_path) in &temp_files {
        fs::rename(temp_path, target_path).map_err(|e| {
            cleanup_temp_files(&temp_files);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            ))
        })?;
    }

    Ok(())
}

/// Best-effort temp cleanup; already in an error state, so failures only log.
fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp_path, _) in temp_files {
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                tracing::warn!(
                    "failed to clean up temporary file '{}': {}",
                    temp_path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_stay_in_the_output_directory() {
        let base = Path::new("/tmp/dist");
        assert_eq!(
            validate_output_path(base, "index.js").unwrap(),
            Path::new("/tmp/dist/index.js")
        );
        assert_eq!(
            validate_output_path(base, "./pkg.esm.js").unwrap(),
            Path::new("/tmp/dist/pkg.esm.js")
        );
        assert!(validate_output_path(base, "../escape.js").is_err());
        assert!(validate_output_path(base, "safe/../../../../etc/passwd").is_err());
        assert!(validate_output_path(base, "file\0name.js").is_err());
    }

    #[test]
    fn entry_stub_switches_on_node_env() {
        let stub = render_entry_stub("@scope/widget-kit");
        assert!(stub.starts_with("'use strict'"));
        assert!(stub.contains("process.env.NODE_ENV === 'production'"));
        assert!(stub.contains("require('./widget-kit.cjs.production.min.js')"));
        assert!(stub.contains("require('./widget-kit.cjs.development.js')"));
    }

    #[test]
    fn atomic_writes_leave_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let operations = vec![
            (dir.path().join("a.js"), b"var a = 1;\n".to_vec()),
            (dir.path().join("b.js"), b"var b = 2;\n".to_vec()),
        ];
        write_files_atomic(&operations).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("a.js")).unwrap(), "var a = 1;\n");
        assert_eq!(fs::read_to_string(dir.path().join("b.js")).unwrap(), "var b = 2;\n");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn entry_stub_lands_in_the_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_entry_stub(dir.path(), "widget-kit").unwrap();
        assert_eq!(artifact.filename, "index.js");
        let written = fs::read_to_string(&artifact.path).unwrap();
        assert!(written.contains("widget-kit.cjs.development.js"));
    }
}
