//! Build requests and session decomposition.
//!
//! A session-level request names formats and switches; [`decompose`] turns it
//! into one immutable [`BuildRequest`] per (format, environment) combination
//! before any planning happens.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

/// Output directory used when the caller does not override it.
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Module format of an emitted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// Common-module output (`require`-loadable).
    Cjs,
    /// Ecosystem-module output (`import`-loadable).
    Esm,
    /// Universal-module output (script tag and module loaders).
    Umd,
}

impl ModuleFormat {
    /// Parses a user-facing format name.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cjs" | "commonjs" => Ok(ModuleFormat::Cjs),
            "esm" | "es" | "module" => Ok(ModuleFormat::Esm),
            "umd" => Ok(ModuleFormat::Umd),
            other => Err(Error::InvalidConfig(format!(
                "Unknown module format '{other}' (expected cjs, esm, or umd)"
            ))),
        }
    }

    /// Segment used in output file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::Cjs => "cjs",
            ModuleFormat::Esm => "esm",
            ModuleFormat::Umd => "umd",
        }
    }

    /// Whether this format builds one unit per environment.
    ///
    /// The ecosystem-module format builds a single environment-agnostic
    /// unit; downstream bundlers substitute the environment themselves.
    pub fn per_env(&self) -> bool {
        !matches!(self, ModuleFormat::Esm)
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build environment a unit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildEnv {
    Development,
    Production,
}

impl BuildEnv {
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(BuildEnv::Development),
            "production" | "prod" => Ok(BuildEnv::Production),
            other => Err(Error::InvalidConfig(format!(
                "Unknown environment '{other}' (expected development or production)"
            ))),
        }
    }

    /// Segment used in output file names and `NODE_ENV` substitution.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildEnv::Development => "development",
            BuildEnv::Production => "production",
        }
    }
}

impl fmt::Display for BuildEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime the emitted artifact is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Node,
    Browser,
}

impl Target {
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "node" => Ok(Target::Node),
            "browser" | "web" => Ok(Target::Browser),
            other => Err(Error::InvalidConfig(format!(
                "Unknown target '{other}' (expected node or browser)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Node => "node",
            Target::Browser => "browser",
        }
    }
}

/// One unit of work: a single (format, environment) combination.
///
/// Immutable once decomposed; everything a plan needs is here, and nothing
/// session-scoped (verbosity, failure policy) leaks in, so identical units
/// always yield identical plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Entry source file, relative to the project root or absolute.
    pub input: PathBuf,
    /// Package name as published (scope included).
    pub name: String,
    pub format: ModuleFormat,
    /// `None` for the environment-agnostic ecosystem-module unit.
    pub env: Option<BuildEnv>,
    pub target: Target,
    /// Optional tsconfig override forwarded to the compile stage.
    pub tsconfig: Option<PathBuf>,
    /// Scan sources and append new message templates to the registry.
    pub extract_errors: bool,
    /// Explicit minify override; derived from `env` when absent.
    pub minify: Option<bool>,
    /// Emit declaration files from this unit. At most one per session.
    pub declarations: bool,
}

impl BuildRequest {
    /// Minification is on when overridden, else for production units.
    pub fn should_minify(&self) -> bool {
        self.minify
            .unwrap_or(self.env == Some(BuildEnv::Production))
    }

    /// Human-readable unit label for reports and logs.
    pub fn label(&self) -> String {
        match self.env {
            Some(env) => format!("{} {}", self.format, env),
            None => self.format.to_string(),
        }
    }
}

/// Session-level build request, as assembled by the CLI layer.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Project root; the output directory and registry path hang off it.
    pub project_root: PathBuf,
    /// Entry source file.
    pub entry: PathBuf,
    /// Package name as published.
    pub name: String,
    /// Requested formats, in output order. Duplicates collapse.
    pub formats: Vec<ModuleFormat>,
    pub target: Target,
    pub tsconfig: Option<PathBuf>,
    pub extract_errors: bool,
    /// Session-wide minify override applied to every unit.
    pub minify: Option<bool>,
    /// Emit declaration files (scheduled on exactly one unit).
    pub declarations: bool,
    /// Output directory, relative to the project root unless absolute.
    pub out_dir: PathBuf,
    /// Keep executing remaining units after a failure.
    pub continue_on_error: bool,
    /// Abort a unit that exceeds this budget and report it canceled.
    pub unit_timeout: Option<Duration>,
}

impl SessionOptions {
    pub fn new(
        project_root: impl Into<PathBuf>,
        entry: impl Into<PathBuf>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            entry: entry.into(),
            name: name.into(),
            formats: vec![ModuleFormat::Cjs, ModuleFormat::Esm],
            target: Target::Browser,
            tsconfig: None,
            extract_errors: false,
            minify: None,
            declarations: true,
            out_dir: PathBuf::from(DEFAULT_DIST_DIR),
            continue_on_error: false,
            unit_timeout: None,
        }
    }

    pub fn formats(mut self, formats: Vec<ModuleFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn extract_errors(mut self, on: bool) -> Self {
        self.extract_errors = on;
        self
    }

    pub fn minify(mut self, minify: Option<bool>) -> Self {
        self.minify = minify;
        self
    }

    pub fn declarations(mut self, on: bool) -> Self {
        self.declarations = on;
        self
    }

    pub fn continue_on_error(mut self, on: bool) -> Self {
        self.continue_on_error = on;
        self
    }

    /// Absolute output directory for this session.
    pub fn dist_dir(&self) -> PathBuf {
        if self.out_dir.is_absolute() {
            self.out_dir.clone()
        } else {
            self.project_root.join(&self.out_dir)
        }
    }
}

/// Expands a session into its ordered unit list.
///
/// Per-environment formats (cjs, umd) decompose into a development unit and
/// a production unit; the ecosystem-module format yields one
/// environment-agnostic unit. Declaration emission is pinned to the esm
/// unit when esm is requested, else to the first unit.
pub fn decompose(options: &SessionOptions) -> Result<Vec<BuildRequest>> {
    if options.formats.is_empty() {
        return Err(Error::InvalidConfig(
            "No module formats requested".to_string(),
        ));
    }
    if options.name.trim().is_empty() {
        return Err(Error::InvalidConfig("Package name is empty".to_string()));
    }

    let mut formats: Vec<ModuleFormat> = Vec::new();
    for format in &options.formats {
        if !formats.contains(format) {
            formats.push(*format);
        }
    }

    let mut units = Vec::new();
    for format in &formats {
        let envs: &[Option<BuildEnv>] = if format.per_env() {
            &[Some(BuildEnv::Development), Some(BuildEnv::Production)]
        } else {
            &[None]
        };
        for env in envs {
            units.push(BuildRequest {
                input: options.entry.clone(),
                name: options.name.clone(),
                format: *format,
                env: *env,
                target: options.target,
                tsconfig: options.tsconfig.clone(),
                extract_errors: options.extract_errors,
                minify: options.minify,
                declarations: false,
            });
        }
    }

    if options.declarations {
        let slot = units
            .iter()
            .position(|u| u.format == ModuleFormat::Esm)
            .unwrap_or(0);
        units[slot].declarations = true;
    }

    validate_units(&units)?;
    Ok(units)
}

/// Checks invariants on an already-decomposed unit list.
///
/// Callers constructing unit lists by hand go through the same gate the
/// decomposer does, before any engine is invoked.
pub fn validate_units(units: &[BuildRequest]) -> Result<()> {
    if units.is_empty() {
        return Err(Error::InvalidConfig("No build units".to_string()));
    }

    let declaration_formats: Vec<ModuleFormat> = units
        .iter()
        .filter(|u| u.declarations)
        .map(|u| u.format)
        .collect();
    if declaration_formats.len() > 1 {
        return Err(Error::InvalidConfig(format!(
            "Declaration emission requested for more than one format: {}",
            declaration_formats
                .iter()
                .map(ModuleFormat::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let mut seen = std::collections::BTreeSet::new();
    for unit in units {
        let key = (unit.format, unit.env, unit.should_minify());
        if !seen.insert(key) {
            return Err(Error::InvalidConfig(format!(
                "Duplicate build unit: {}",
                unit.label()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionOptions {
        SessionOptions::new("/proj", "src/index.ts", "build-default")
    }

    #[test]
    fn cjs_and_esm_decompose_into_three_units() {
        let units = decompose(&session()).unwrap();
        let labels: Vec<String> = units.iter().map(BuildRequest::label).collect();
        assert_eq!(
            labels,
            vec!["cjs development", "cjs production", "esm"]
        );
    }

    #[test]
    fn production_units_minify_by_default() {
        let units = decompose(&session()).unwrap();
        assert!(!units[0].should_minify());
        assert!(units[1].should_minify());
        assert!(!units[2].should_minify());
    }

    #[test]
    fn minify_override_applies_everywhere() {
        let units = decompose(&session().minify(Some(true))).unwrap();
        assert!(units.iter().all(BuildRequest::should_minify));
    }

    #[test]
    fn declarations_ride_the_esm_unit() {
        let units = decompose(&session()).unwrap();
        let carriers: Vec<&BuildRequest> = units.iter().filter(|u| u.declarations).collect();
        assert_eq!(carriers.len(), 1);
        assert_eq!(carriers[0].format, ModuleFormat::Esm);
    }

    #[test]
    fn declarations_fall_back_to_first_unit_without_esm() {
        let units = decompose(&session().formats(vec![ModuleFormat::Cjs])).unwrap();
        assert!(units[0].declarations);
        assert!(!units[1].declarations);
    }

    #[test]
    fn duplicate_formats_collapse() {
        let units = decompose(
            &session().formats(vec![ModuleFormat::Cjs, ModuleFormat::Cjs, ModuleFormat::Esm]),
        )
        .unwrap();
        assert_eq!(units.len(), 3);
    }

    #[test]
    fn empty_formats_are_rejected() {
        let err = decompose(&session().formats(vec![])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn umd_builds_both_environments() {
        let units = decompose(&session().formats(vec![ModuleFormat::Umd])).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].env, Some(BuildEnv::Development));
        assert_eq!(units[1].env, Some(BuildEnv::Production));
    }

    #[test]
    fn multi_format_declarations_are_rejected() {
        let mut units = decompose(&session()).unwrap();
        units[0].declarations = true;
        let err = validate_units(&units).unwrap_err();
        assert!(err.to_string().contains("more than one format"));
    }

    #[test]
    fn format_parsing_accepts_aliases() {
        assert_eq!(ModuleFormat::parse_str("CJS").unwrap(), ModuleFormat::Cjs);
        assert_eq!(ModuleFormat::parse_str("es").unwrap(), ModuleFormat::Esm);
        assert!(ModuleFormat::parse_str("amd").is_err());
    }
}
