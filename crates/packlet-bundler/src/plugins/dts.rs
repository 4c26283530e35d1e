//! TypeScript declaration emission.
//!
//! Runs after bundling: every TypeScript module that made it into a chunk
//! gets an isolated-declarations pass over its original source, and the
//! result joins the bundle as a `.d.ts` asset named after the module file.
//! Declaration failures never fail the unit; the module is skipped with a
//! warning so JavaScript artifacts still ship.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_isolated_declarations::{IsolatedDeclarations, IsolatedDeclarationsOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use rolldown_common::{Output, OutputAsset};
use rolldown_plugin::{HookGenerateBundleArgs, HookNoopReturn, Plugin, PluginContext};
use rustc_hash::FxHashSet;

/// Emits one `.d.ts` asset per TypeScript module in the bundle.
#[derive(Debug, Clone)]
pub struct DeclarationsPlugin {
    /// Drop declarations tagged `@internal`.
    strip_internal: bool,
}

impl DeclarationsPlugin {
    pub fn new(strip_internal: bool) -> Self {
        Self { strip_internal }
    }
}

impl Plugin for DeclarationsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "packlet:declarations".into()
    }

    fn register_hook_usage(&self) -> rolldown_plugin::HookUsage {
        rolldown_plugin::HookUsage::GenerateBundle
    }

    fn generate_bundle(
        &self,
        _ctx: &PluginContext,
        args: &mut HookGenerateBundleArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let strip_internal = self.strip_internal;

        async move {
            let mut emitted: FxHashSet<String> = FxHashSet::default();
            let mut declaration_assets = Vec::new();

            for output in args.bundle.iter() {
                let Output::Chunk(chunk) = output else {
                    continue;
                };

                for module_id in &chunk.modules.keys {
                    let module_id = module_id.as_ref();
                    if !is_typescript_module(module_id) {
                        continue;
                    }

                    let filename = declaration_file_name(module_id);
                    if !emitted.insert(filename.clone()) {
                        continue;
                    }

                    let source = match std::fs::read_to_string(module_id) {
                        Ok(source) => source,
                        Err(err) => {
                            tracing::warn!(
                                module = %module_id,
                                "skipping declaration output, source unreadable: {err}"
                            );
                            continue;
                        }
                    };

                    let declaration =
                        match generate_declarations(&source, module_id, strip_internal) {
                            Ok(declaration) => declaration,
                            Err(err) => {
                                tracing::warn!(
                                    module = %module_id,
                                    "skipping declaration output: {err:#}"
                                );
                                continue;
                            }
                        };

                    declaration_assets.push(Output::Asset(Arc::new(OutputAsset {
                        names: vec![],
                        original_file_names: vec![module_id.to_string()],
                        filename: filename.into(),
                        source: declaration.into(),
                    })));
                }
            }

            args.bundle.extend(declaration_assets);
            Ok(())
        }
    }
}

/// TypeScript sources, excluding declaration files themselves.
fn is_typescript_module(path: &str) -> bool {
    if path.ends_with(".d.ts") || path.ends_with(".d.mts") || path.ends_with(".d.cts") {
        return false;
    }
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext, "ts" | "tsx" | "mts" | "cts"))
        .unwrap_or(false)
}

/// Declaration asset name: the module's file stem plus `.d.ts`, so
/// `src/index.ts` lands next to the artifacts as `index.d.ts`.
fn declaration_file_name(module_id: &str) -> String {
    let stem = Path::new(module_id)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");
    format!("{stem}.d.ts")
}

/// Isolated-declarations pass over one module's source.
fn generate_declarations(source: &str, file_path: &str, strip_internal: bool) -> Result<String> {
    let allocator = Allocator::default();

    let source_type = SourceType::from_path(Path::new(file_path))
        .with_context(|| format!("not a TypeScript module: {file_path}"))?;

    let parse_result = Parser::new(&allocator, source, source_type).parse();
    if !parse_result.errors.is_empty() {
        let messages: Vec<String> = parse_result
            .errors
            .iter()
            .map(|e| format!("{e:?}"))
            .collect();
        anyhow::bail!("failed to parse {}: {}", file_path, messages.join(", "));
    }

    let transformer =
        IsolatedDeclarations::new(&allocator, IsolatedDeclarationsOptions { strip_internal });
    let declaration = transformer.build(&parse_result.program);
    if !declaration.errors.is_empty() {
        let messages: Vec<String> = declaration
            .errors
            .iter()
            .map(|e| format!("{e:?}"))
            .collect();
        anyhow::bail!(
            "declarations need explicit types in {}: {}",
            file_path,
            messages.join(", ")
        );
    }

    Ok(Codegen::new().build(&declaration.program).code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_declarations_after_the_module_file() {
        assert_eq!(declaration_file_name("/work/pkg/src/index.ts"), "index.d.ts");
        assert_eq!(declaration_file_name("src/math/vector.tsx"), "vector.d.ts");
    }

    #[test]
    fn recognizes_typescript_modules() {
        assert!(is_typescript_module("src/index.ts"));
        assert!(is_typescript_module("src/app.tsx"));
        assert!(!is_typescript_module("src/index.js"));
        assert!(!is_typescript_module("src/types.d.ts"));
    }

    #[test]
    fn generates_declarations_for_typed_exports() {
        let source = "export const answer: number = 42;\nexport function double(n: number): number { return n * 2; }\n";
        let declaration = generate_declarations(source, "src/index.ts", false).unwrap();
        assert!(declaration.contains("export declare const answer: number"));
        assert!(declaration.contains("export declare function double(n: number): number"));
        assert!(!declaration.contains("return"));
    }

    #[test]
    fn reports_unparsable_source() {
        assert!(generate_declarations("export const = ;", "src/bad.ts", false).is_err());
    }
}
