//! Deterministic artifact and identifier naming.
//!
//! All output file names are derived here so that every (format, env, minify)
//! combination in a session lands on its own path. Collision-freedom is what
//! lets units run concurrently without write locks.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::request::{BuildEnv, ModuleFormat};

/// File name of the common-module entry stub written alongside the artifacts.
pub const CJS_ENTRY_FILE: &str = "index.js";

static DISALLOWED_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9._-]+").expect("static pattern"));

/// JavaScript reserved words that cannot serve as a global binding name.
static RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Derives a filesystem-safe slug from a package name.
///
/// Lowercases, drops any npm scope prefix, and collapses runs of disallowed
/// characters into `-`. Distinct names a single author would publish stay
/// distinct; global uniqueness is not a goal.
pub fn safe_package_name(name: &str) -> String {
    let unscoped = strip_scope(name);
    let lowered = unscoped.to_lowercase();
    let slug = DISALLOWED_FILE_CHARS.replace_all(&lowered, "-");
    let slug = slug.trim_matches(|c| c == '-' || c == '.');
    if slug.is_empty() {
        "package".to_string()
    } else {
        slug.to_string()
    }
}

/// Derives a valid global-binding identifier from a package name.
///
/// Used as the universal-module global. Camel-cases the slug, prefixes a
/// leading digit with `_`, sidesteps reserved words, and falls back to a
/// generic name when nothing usable remains.
pub fn safe_variable_name(name: &str) -> String {
    let slug = safe_package_name(name);
    let mut ident = String::with_capacity(slug.len());
    let mut upper_next = false;
    for ch in slug.chars() {
        match ch {
            '-' | '.' | '_' => upper_next = true,
            c if c.is_ascii_alphanumeric() => {
                if ident.is_empty() && c.is_ascii_digit() {
                    ident.push('_');
                }
                if upper_next && !ident.is_empty() {
                    ident.extend(c.to_uppercase());
                } else {
                    ident.push(c);
                }
                upper_next = false;
            }
            _ => {}
        }
    }
    if ident.is_empty() {
        return "bundle".to_string();
    }
    if RESERVED_WORDS.contains(&ident.as_str()) {
        format!("_{ident}")
    } else {
        ident
    }
}

/// Builds the artifact file name for one (format, env, minify) combination.
///
/// Segments are `[slug, format, env, min, js]` with empty ones dropped and
/// the rest dot-joined. The environment segment is absent for the
/// environment-agnostic ecosystem-module unit, the `min` segment only
/// present when minification is on.
pub fn output_file_name(
    package_name: &str,
    format: ModuleFormat,
    env: Option<BuildEnv>,
    minify: bool,
) -> String {
    let slug = safe_package_name(package_name);
    let mut segments: Vec<&str> = vec![&slug, format.as_str()];
    if let Some(env) = env {
        segments.push(env.as_str());
    }
    if minify {
        segments.push("min");
    }
    segments.push("js");
    segments.join(".")
}

/// Joins [`output_file_name`] onto the output directory.
pub fn output_path(
    dist_dir: &Path,
    package_name: &str,
    format: ModuleFormat,
    env: Option<BuildEnv>,
    minify: bool,
) -> PathBuf {
    dist_dir.join(output_file_name(package_name, format, env, minify))
}

fn strip_scope(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('@') {
        if let Some((_, tail)) = rest.split_once('/') {
            return tail;
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_strips_scope_and_lowercases() {
        assert_eq!(safe_package_name("@myorg/My-Package"), "my-package");
        assert_eq!(safe_package_name("simple"), "simple");
        assert_eq!(safe_package_name("build-default"), "build-default");
    }

    #[test]
    fn slug_replaces_disallowed_characters() {
        assert_eq!(safe_package_name("my package!"), "my-package");
        assert_eq!(safe_package_name("a/b\\c"), "a-b-c");
        assert_eq!(safe_package_name("dots.are.kept"), "dots.are.kept");
    }

    #[test]
    fn slug_never_degenerates_to_empty() {
        assert_eq!(safe_package_name(""), "package");
        assert_eq!(safe_package_name("!!!"), "package");
        assert_eq!(safe_package_name("@scope/"), "package");
    }

    #[test]
    fn variable_name_camel_cases() {
        assert_eq!(safe_variable_name("my-package"), "myPackage");
        assert_eq!(safe_variable_name("@scope/cool-lib"), "coolLib");
        assert_eq!(safe_variable_name("dots.and-dashes"), "dotsAndDashes");
    }

    #[test]
    fn variable_name_avoids_reserved_words() {
        assert_eq!(safe_variable_name("new"), "_new");
        assert_eq!(safe_variable_name("package"), "_package");
        assert_eq!(safe_variable_name("class"), "_class");
    }

    #[test]
    fn variable_name_handles_leading_digits_and_empty() {
        assert_eq!(safe_variable_name("2fast"), "_2fast");
        assert_eq!(safe_variable_name("---"), "_package");
    }

    #[test]
    fn output_name_matches_artifact_scheme() {
        assert_eq!(
            output_file_name("build-default", ModuleFormat::Cjs, Some(BuildEnv::Development), false),
            "build-default.cjs.development.js"
        );
        assert_eq!(
            output_file_name("build-default", ModuleFormat::Cjs, Some(BuildEnv::Production), true),
            "build-default.cjs.production.min.js"
        );
        assert_eq!(
            output_file_name("build-default", ModuleFormat::Esm, None, false),
            "build-default.esm.js"
        );
        assert_eq!(
            output_file_name("@org/pkg", ModuleFormat::Umd, Some(BuildEnv::Production), true),
            "pkg.umd.production.min.js"
        );
    }

    #[test]
    fn output_name_is_injective_over_triples() {
        let mut seen = std::collections::BTreeSet::new();
        let envs = [None, Some(BuildEnv::Development), Some(BuildEnv::Production)];
        for format in [ModuleFormat::Cjs, ModuleFormat::Esm, ModuleFormat::Umd] {
            for env in envs {
                for minify in [false, true] {
                    let name = output_file_name("pkg", format, env, minify);
                    assert!(seen.insert(name.clone()), "collision on {name}");
                }
            }
        }
        assert_eq!(seen.len(), 18);
    }

    #[test]
    fn output_path_lands_in_dist() {
        let path = output_path(
            Path::new("dist"),
            "pkg",
            ModuleFormat::Esm,
            None,
            false,
        );
        assert_eq!(path, PathBuf::from("dist/pkg.esm.js"));
    }
}
