#![cfg_attr(docsrs, feature(doc_cfg))]

//! # packlet-core
//!
//! Packlet core - build requests, plans, naming, and the error-code registry.
//!
//! Everything in this crate is engine-agnostic and side-effect-free apart
//! from the registry and manifest loaders: a session-level request is
//! decomposed into immutable [`BuildRequest`] units, each unit derives a
//! declarative [`BuildPlan`], and the bundling crate interprets those plans.
//! Equal requests always yield equal plans, which is what the orchestration
//! layer's determinism rests on.
//!
//! ```no_run
//! use packlet_core::{BuildPlan, SessionOptions, decompose};
//!
//! # fn main() -> packlet_core::Result<()> {
//! let options = SessionOptions::new("/work/my-lib", "src/index.ts", "@me/my-lib");
//! for unit in decompose(&options)? {
//!     let plan = BuildPlan::from_request(&unit);
//!     println!("{} -> {}", plan.label(), plan.output_file);
//! }
//! # Ok(()) }
//! ```

pub mod error;
pub mod external;
pub mod manifest;
pub mod naming;
pub mod plan;
pub mod registry;
pub mod request;
pub mod shebang;
pub mod sourcemap;

pub use error::{Error, Result};
pub use external::{ExternalPolicy, INLINED_HELPER};
pub use manifest::PackageManifest;
pub use naming::{
    CJS_ENTRY_FILE, output_file_name, output_path, safe_package_name, safe_variable_name,
};
pub use plan::{BuildPlan, ErrorCodeMode, PipelineStage};
pub use registry::{ErrorCodeRegistry, REGISTRY_FILE, RegistryHandle};
pub use request::{
    BuildEnv, BuildRequest, DEFAULT_DIST_DIR, ModuleFormat, SessionOptions, Target, decompose,
    validate_units,
};
pub use shebang::strip_shebang;
pub use sourcemap::{rewrite_source_path, rewrite_sources};
