//! Build plans.
//!
//! A [`BuildPlan`] is the complete, declarative description of one unit:
//! everything the engine adapter needs, derived up front so execution never
//! consults the request again. Derivation is pure; equal requests always
//! yield equal plans.

use std::path::PathBuf;

use crate::external::ExternalPolicy;
use crate::naming::{output_file_name, safe_variable_name};
use crate::request::{BuildEnv, BuildRequest, ModuleFormat, Target};

/// Pipeline stages in their fixed resolution order.
///
/// The engine adapter interprets these; callers never reorder them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Entry resolution and external classification.
    ClassifyExternals,
    /// Module-interop normalization, universal-module output only.
    ModuleInterop,
    /// JSON modules importable as data.
    JsonModules,
    /// Strip and record the entry shebang before parsing.
    CaptureShebang,
    /// Type-aware compilation of TypeScript sources.
    CompileTypes,
    /// Syntax lowering, including error-code handling when active.
    TransformSyntax,
    /// `process.env.NODE_ENV` literal substitution.
    SubstituteEnv,
    /// Merge intermediate source maps into the emitted map.
    MergeSourcemaps,
    /// Terminal minification pass.
    Minify,
}

/// How the unit treats invariant-style error calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCodeMode {
    /// Leave calls untouched.
    Off,
    /// Scan sources and append new templates to the session registry.
    Extract,
    /// Scan and append, then rewrite templates to codes.
    ExtractAndRewrite,
    /// Rewrite templates to codes; an unregistered template fails the unit.
    Rewrite,
}

impl ErrorCodeMode {
    pub fn extracts(&self) -> bool {
        matches!(self, ErrorCodeMode::Extract | ErrorCodeMode::ExtractAndRewrite)
    }

    pub fn rewrites(&self) -> bool {
        matches!(self, ErrorCodeMode::Rewrite | ErrorCodeMode::ExtractAndRewrite)
    }
}

/// One stage plus the predicate deciding whether a request carries it.
struct StageDescriptor {
    stage: PipelineStage,
    applies: fn(&BuildRequest) -> bool,
}

/// The full pipeline. Order here is the order everywhere.
static STAGES: &[StageDescriptor] = &[
    StageDescriptor {
        stage: PipelineStage::ClassifyExternals,
        applies: |_| true,
    },
    StageDescriptor {
        stage: PipelineStage::ModuleInterop,
        applies: |req| req.format == ModuleFormat::Umd,
    },
    StageDescriptor {
        stage: PipelineStage::JsonModules,
        applies: |_| true,
    },
    StageDescriptor {
        stage: PipelineStage::CaptureShebang,
        applies: |_| true,
    },
    StageDescriptor {
        stage: PipelineStage::CompileTypes,
        applies: |_| true,
    },
    StageDescriptor {
        stage: PipelineStage::TransformSyntax,
        applies: |_| true,
    },
    StageDescriptor {
        stage: PipelineStage::SubstituteEnv,
        applies: |req| req.env.is_some(),
    },
    StageDescriptor {
        stage: PipelineStage::MergeSourcemaps,
        applies: |_| true,
    },
    StageDescriptor {
        stage: PipelineStage::Minify,
        applies: BuildRequest::should_minify,
    },
];

/// Complete, declarative configuration for one build unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub input: PathBuf,
    pub package_name: String,
    pub format: ModuleFormat,
    pub env: Option<BuildEnv>,
    pub target: Target,
    /// Artifact file name within the output directory.
    pub output_file: String,
    pub external: ExternalPolicy,
    /// Enabled stages, in fixed pipeline order.
    pub stages: Vec<PipelineStage>,
    pub sourcemap: bool,
    pub minify: bool,
    /// Global binding name, universal-module output only.
    pub global_name: Option<String>,
    /// Replacement for `process.env.NODE_ENV`, when the unit carries an env.
    pub env_substitution: Option<String>,
    pub error_codes: ErrorCodeMode,
    pub tsconfig: Option<PathBuf>,
    pub declarations: bool,
}

impl BuildPlan {
    /// Derives the plan for one request. Pure; no filesystem access.
    pub fn from_request(request: &BuildRequest) -> Self {
        let minify = request.should_minify();
        let stages = STAGES
            .iter()
            .filter(|descriptor| (descriptor.applies)(request))
            .map(|descriptor| descriptor.stage)
            .collect();

        let production = request.env == Some(BuildEnv::Production);
        let error_codes = match (production, request.extract_errors) {
            (true, true) => ErrorCodeMode::ExtractAndRewrite,
            (true, false) => ErrorCodeMode::Rewrite,
            (false, true) => ErrorCodeMode::Extract,
            (false, false) => ErrorCodeMode::Off,
        };

        BuildPlan {
            input: request.input.clone(),
            package_name: request.name.clone(),
            format: request.format,
            env: request.env,
            target: request.target,
            output_file: output_file_name(&request.name, request.format, request.env, minify),
            external: ExternalPolicy::new(request.input.to_string_lossy()),
            stages,
            sourcemap: true,
            minify,
            global_name: (request.format == ModuleFormat::Umd)
                .then(|| safe_variable_name(&request.name)),
            env_substitution: request.env.map(|env| env.as_str().to_string()),
            error_codes,
            tsconfig: request.tsconfig.clone(),
            declarations: request.declarations,
        }
    }

    pub fn has_stage(&self, stage: PipelineStage) -> bool {
        self.stages.contains(&stage)
    }

    /// Output file name without its `.js` suffix; what the engine names the
    /// entry chunk so emitted files land on [`Self::output_file`].
    pub fn output_stem(&self) -> &str {
        self.output_file
            .strip_suffix(".js")
            .unwrap_or(&self.output_file)
    }

    /// Human-readable unit label for reports and logs.
    pub fn label(&self) -> String {
        match self.env {
            Some(env) => format!("{} {}", self.format, env),
            None => self.format.to_string(),
        }
    }
}
