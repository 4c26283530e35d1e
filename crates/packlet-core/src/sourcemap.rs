//! Source-map path rewriting.
//!
//! The engine emits `sources` entries relative to the output directory.
//! Published maps must not leak absolute build-machine paths, and maps from
//! different packages in one workspace must not collide when a downstream
//! consumer merges them, so every in-root source is rewritten to
//! `<package-name>/<path-from-root>`.

use std::path::Path;

use path_clean::PathClean;
use serde_json::Value;

use crate::error::{Error, Result};

/// Rewrites one `sources` entry.
///
/// `source` is resolved against `dist_dir`; when the result lies under
/// `project_root`, the root prefix is replaced with the package name. A
/// source outside the root is passed through resolved but unprefixed.
/// Both directories must be absolute and lexically clean.
pub fn rewrite_source_path(
    source: &str,
    dist_dir: &Path,
    project_root: &Path,
    package_name: &str,
) -> String {
    let resolved = dist_dir.join(source).clean();
    match resolved.strip_prefix(project_root) {
        Ok(relative) => format!("{}/{}", package_name, forward_slashes(relative)),
        Err(_) => forward_slashes(&resolved),
    }
}

/// Rewrites every `sources` entry of a serialized source map.
///
/// Maps without a `sources` array pass through unchanged; a non-string
/// entry is malformed input.
pub fn rewrite_sources(
    map_json: &str,
    dist_dir: &Path,
    project_root: &Path,
    package_name: &str,
) -> Result<String> {
    let mut map: Value = serde_json::from_str(map_json)
        .map_err(|err| Error::MalformedSourceMap(err.to_string()))?;

    let Some(sources) = map.get_mut("sources").and_then(Value::as_array_mut) else {
        return Ok(map_json.to_string());
    };

    for entry in sources.iter_mut() {
        let Some(path) = entry.as_str() else {
            return Err(Error::MalformedSourceMap(format!(
                "non-string sources entry: {entry}"
            )));
        };
        *entry = Value::String(rewrite_source_path(
            path,
            dist_dir,
            project_root,
            package_name,
        ));
    }

    serde_json::to_string(&map).map_err(|err| Error::MalformedSourceMap(err.to_string()))
}

fn forward_slashes(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn root() -> PathBuf {
        PathBuf::from("/work/build-default")
    }

    fn dist() -> PathBuf {
        root().join("dist")
    }

    #[test]
    fn in_root_sources_get_the_package_prefix() {
        let rewritten =
            rewrite_source_path("../src/index.ts", &dist(), &root(), "build-default");
        assert_eq!(rewritten, "build-default/src/index.ts");
    }

    #[test]
    fn sibling_sources_share_the_prefix() {
        let a = rewrite_source_path("../src/foo.ts", &dist(), &root(), "build-default");
        let b = rewrite_source_path("../src/index.ts", &dist(), &root(), "build-default");
        assert_eq!(a, "build-default/src/foo.ts");
        assert_eq!(b, "build-default/src/index.ts");
        assert!(a.starts_with("build-default/"));
        assert!(b.starts_with("build-default/"));
    }

    #[test]
    fn out_of_root_sources_resolve_without_prefix() {
        let rewritten =
            rewrite_source_path("../../elsewhere/dep.ts", &dist(), &root(), "build-default");
        assert_eq!(rewritten, "/work/elsewhere/dep.ts");
    }

    #[test]
    fn whole_map_rewrite_touches_every_source() {
        let map = r#"{"version":3,"sources":["../src/foo.ts","../src/index.ts"],"mappings":"AAAA"}"#;
        let rewritten = rewrite_sources(map, &dist(), &root(), "build-default").unwrap();
        let value: Value = serde_json::from_str(&rewritten).unwrap();
        let sources: Vec<&str> = value["sources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect();
        assert_eq!(
            sources,
            vec!["build-default/src/foo.ts", "build-default/src/index.ts"]
        );
        for source in sources {
            assert!(!source.starts_with('/'), "absolute path leaked: {source}");
        }
    }

    #[test]
    fn map_without_sources_passes_through() {
        let map = r#"{"version":3,"mappings":""}"#;
        let rewritten = rewrite_sources(map, &dist(), &root(), "pkg").unwrap();
        assert_eq!(rewritten, map);
    }

    #[test]
    fn non_string_source_entry_is_malformed() {
        let map = r#"{"version":3,"sources":[42]}"#;
        let err = rewrite_sources(map, &dist(), &root(), "pkg").unwrap_err();
        assert!(matches!(err, Error::MalformedSourceMap(_)));
    }

    #[test]
    fn garbage_input_is_malformed() {
        let err = rewrite_sources("not json", &dist(), &root(), "pkg").unwrap_err();
        assert!(matches!(err, Error::MalformedSourceMap(_)));
    }
}
