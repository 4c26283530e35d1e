//! Persisted error-code registry.
//!
//! Production artifacts carry numeric error codes instead of message
//! templates; the registry is the published table that decodes them.
//! Assigned codes are never reused, so artifacts built years apart stay
//! decodable against the same file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Registry file location relative to the package root.
pub const REGISTRY_FILE: &str = "errors/codes.json";

/// Mapping from message templates to compact numeric codes.
///
/// Loaded once per session, mutated in memory while extraction runs, and
/// committed back at most once at session end.
#[derive(Debug)]
pub struct ErrorCodeRegistry {
    path: PathBuf,
    codes: BTreeMap<String, u32>,
    dirty: bool,
}

impl ErrorCodeRegistry {
    /// Loads the registry at `path`. A missing file yields an empty registry;
    /// the file is only created on commit once a template has been recorded.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let codes = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<BTreeMap<String, u32>>(&raw).map_err(|source| {
                Error::MalformedRegistry {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(Error::io_context(
                    err,
                    format!("Failed to read error-code registry at {}", path.display()),
                ));
            }
        };
        tracing::debug!(
            path = %path.display(),
            entries = codes.len(),
            "loaded error-code registry"
        );
        Ok(Self {
            path,
            codes,
            dirty: false,
        })
    }

    /// Conventional registry path for a package root.
    pub fn default_path(project_root: &Path) -> PathBuf {
        project_root.join(REGISTRY_FILE)
    }

    pub fn code_for(&self, template: &str) -> Option<u32> {
        self.codes.get(template).copied()
    }

    /// Returns the code for `template`, assigning the next unused one when
    /// the template is new. Idempotent per template.
    pub fn record(&mut self, template: &str) -> u32 {
        if let Some(code) = self.codes.get(template) {
            return *code;
        }
        let next = self.codes.values().max().map_or(0, |max| max + 1);
        self.codes.insert(template.to_string(), next);
        self.dirty = true;
        tracing::debug!(code = next, template, "registered new error code");
        next
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Whether templates were recorded since load or the last commit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the registry back if new templates were recorded.
    ///
    /// Last full read-then-write wins between concurrent sessions sharing a
    /// registry file; callers serialize commits within one session.
    pub fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::io_context(
                    err,
                    format!("Failed to create registry directory {}", parent.display()),
                )
            })?;
        }
        let body = serde_json::to_string_pretty(&self.codes).map_err(|source| {
            Error::MalformedRegistry {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, body).map_err(|err| {
            Error::io_context(
                err,
                format!("Failed to write error-code registry at {}", self.path.display()),
            )
        })?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), entries = self.codes.len(), "committed error-code registry");
        Ok(())
    }
}

/// Shared, append-only view of a session's registry.
///
/// Units hold clones of this handle and may look templates up or record new
/// ones; committing stays with the session owner. Insertion is atomic per
/// template, so concurrent extraction across units converges on one code.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    inner: Arc<Mutex<ErrorCodeRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: ErrorCodeRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    pub fn code_for(&self, template: &str) -> Option<u32> {
        self.inner.lock().code_for(template)
    }

    pub fn record(&self, template: &str) -> u32 {
        self.inner.lock().record(template)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().is_dirty()
    }

    /// Single commit point, run by the session owner after all units finish.
    pub fn commit(&self) -> Result<()> {
        self.inner.lock().commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ErrorCodeRegistry::load(dir.path().join("codes.json")).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.is_dirty());
    }

    #[test]
    fn record_assigns_monotonic_codes() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ErrorCodeRegistry::load(dir.path().join("codes.json")).unwrap();
        assert_eq!(registry.record("first %s"), 0);
        assert_eq!(registry.record("second"), 1);
        assert_eq!(registry.record("first %s"), 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn codes_are_never_reused_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors").join("codes.json");

        let mut registry = ErrorCodeRegistry::load(&path).unwrap();
        registry.record("kept %s");
        registry.record("another");
        registry.commit().unwrap();

        let mut reloaded = ErrorCodeRegistry::load(&path).unwrap();
        assert_eq!(reloaded.code_for("kept %s"), Some(0));
        assert_eq!(reloaded.record("fresh"), 2);
    }

    #[test]
    fn commit_is_a_noop_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.json");
        let mut registry = ErrorCodeRegistry::load(&path).unwrap();
        registry.commit().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn commit_round_trips_the_flat_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.json");

        let mut registry = ErrorCodeRegistry::load(&path).unwrap();
        registry.record("boom %s happened");
        registry.commit().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: BTreeMap<String, u32> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.get("boom %s happened"), Some(&0));
    }

    #[test]
    fn malformed_registry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let err = ErrorCodeRegistry::load(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedRegistry { .. }));
    }

    #[test]
    fn handle_shares_codes_across_clones() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ErrorCodeRegistry::load(dir.path().join("codes.json")).unwrap();
        let handle = RegistryHandle::new(registry);
        let other = handle.clone();

        let code = handle.record("shared %s");
        assert_eq!(other.code_for("shared %s"), Some(code));
        assert_eq!(other.record("shared %s"), code);
    }
}
