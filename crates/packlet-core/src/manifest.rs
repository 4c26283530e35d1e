//! Package manifest parsing.
//!
//! Zero-config means the manifest is the configuration: the package name
//! seeds naming, and an optional `source` field overrides entry detection.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Manifest files beyond this size are rejected rather than parsed.
const MAX_MANIFEST_SIZE: u64 = 10 * 1024 * 1024;

/// Parsed `package.json`, reduced to the fields packlet reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    /// Package name as published.
    pub name: Option<String>,
    /// Author-declared entry source file.
    pub source: Option<String>,
    /// Runtime entry the consumer resolves (`main`).
    pub main: Option<String>,
    /// File path this was loaded from.
    #[serde(skip)]
    pub path: PathBuf,
}

impl PackageManifest {
    /// Loads a manifest from `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|err| {
            Error::io_context(err, format!("Cannot read manifest at {}", path.display()))
        })?;
        if metadata.len() > MAX_MANIFEST_SIZE {
            return Err(Error::InvalidConfig(format!(
                "package.json exceeds maximum size of {}MB",
                MAX_MANIFEST_SIZE / 1024 / 1024
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::io_context(err, format!("Failed to read {}", path.display()))
        })?;
        let mut manifest: PackageManifest =
            serde_json::from_str(&content).map_err(|source| Error::MalformedManifest {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.path = path.to_path_buf();
        Ok(manifest)
    }

    /// Finds and loads the nearest `package.json`, walking up from
    /// `start_dir` to the filesystem root.
    pub fn find_from_dir(start_dir: &Path) -> Result<Self> {
        let mut current = start_dir.to_path_buf();
        loop {
            let candidate = current.join("package.json");
            if candidate.is_file() {
                return Self::from_path(&candidate);
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => {
                    return Err(Error::InvalidConfig(
                        "No package.json found in directory tree".to_string(),
                    ));
                }
            }
        }
    }

    /// Directory containing the manifest.
    pub fn root(&self) -> Option<&Path> {
        self.path.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_fields_packlet_reads() {
        let json = r#"{
            "name": "build-default",
            "version": "1.0.0",
            "source": "src/main.ts",
            "main": "dist/index.js",
            "dependencies": { "react": "^18.0.0" }
        }"#;
        let manifest: PackageManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("build-default"));
        assert_eq!(manifest.source.as_deref(), Some("src/main.ts"));
        assert_eq!(manifest.main.as_deref(), Some("dist/index.js"));
    }

    #[test]
    fn walks_up_to_the_nearest_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name": "walk-up"}"#,
        )
        .unwrap();

        let manifest = PackageManifest::find_from_dir(&nested).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("walk-up"));
        assert_eq!(manifest.root(), Some(dir.path()));
    }

    #[test]
    fn malformed_manifest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = PackageManifest::from_path(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { .. }));
    }

}
