//! Invariant call scanning.
//!
//! The error-code stages operate on `invariant(condition, "template", ...)`
//! call sites: extraction collects the message templates into the registry,
//! rewrite splices the registered numeric code over the template literal so
//! production bundles ship codes instead of strings.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{Argument, CallExpression, Expression};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Callee name the error-code stages recognize.
pub const INVARIANT_CALLEE: &str = "invariant";

/// One recognized invariant call site.
///
/// `start..end` is the byte range of the message-template literal, quotes
/// included, so a rewrite replaces the whole literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantCall {
    pub template: String,
    pub start: u32,
    pub end: u32,
}

/// Scans a module for invariant calls whose message is a string literal.
///
/// Calls with a dynamic message argument are left alone. Sources that fail
/// to parse yield no calls; the compile pass is the authority on syntax and
/// reports the failure itself.
pub fn scan_invariant_calls(source: &str, path: &str) -> Vec<InvariantCall> {
    let Ok(source_type) = SourceType::from_path(Path::new(path)) else {
        return Vec::new();
    };

    let allocator = Allocator::default();
    let parse_result = Parser::new(&allocator, source, source_type).parse();
    if !parse_result.errors.is_empty() {
        tracing::debug!(path, "skipping invariant scan of unparsable module");
        return Vec::new();
    }

    let mut collector = CallCollector { calls: Vec::new() };
    walk::walk_program(&mut collector, &parse_result.program);
    collector.calls
}

struct CallCollector {
    calls: Vec<InvariantCall>,
}

impl<'ast> Visit<'ast> for CallCollector {
    fn visit_call_expression(&mut self, call: &CallExpression<'ast>) {
        if let Expression::Identifier(ident) = &call.callee {
            if ident.name.as_str() == INVARIANT_CALLEE {
                if let Some(Argument::StringLiteral(literal)) = call.arguments.get(1) {
                    self.calls.push(InvariantCall {
                        template: literal.value.to_string(),
                        start: literal.span.start,
                        end: literal.span.end,
                    });
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// True when the module is source the scanner understands.
pub fn is_scannable(id: &str) -> bool {
    let path = Path::new(id);
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs")
    )
}

/// Splices registry codes over the template literals of `calls`.
///
/// `calls` must be in source order; splicing runs back to front so earlier
/// byte ranges stay valid. Returns the offending template when a call has
/// no registered code.
pub fn rewrite_invariant_calls(
    source: &str,
    calls: &[InvariantCall],
    code_for: impl Fn(&str) -> Option<u32>,
) -> std::result::Result<String, String> {
    let mut rewritten = source.to_string();
    for call in calls.iter().rev() {
        let Some(code) = code_for(&call.template) else {
            return Err(call.template.clone());
        };
        rewritten.replace_range(call.start as usize..call.end as usize, &code.to_string());
    }
    Ok(rewritten)
}
