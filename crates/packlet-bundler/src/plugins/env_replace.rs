//! `process.env.NODE_ENV` substitution.

use std::borrow::Cow;

use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, Plugin,
    SharedTransformPluginContext,
};

const ENV_TOKEN: &str = "process.env.NODE_ENV";

/// Replaces `process.env.NODE_ENV` with the unit's environment literal.
///
/// Only built for units that carry an environment; the environment-agnostic
/// ecosystem-module unit keeps the expression so the consumer's bundler
/// substitutes it.
#[derive(Debug, Clone)]
pub struct EnvReplacePlugin {
    replacement: String,
}

impl EnvReplacePlugin {
    pub fn new(value: &str) -> Self {
        Self {
            replacement: format!("\"{value}\""),
        }
    }
}

impl Plugin for EnvReplacePlugin {
    fn name(&self) -> Cow<'static, str> {
        "packlet:env".into()
    }

    fn register_hook_usage(&self) -> rolldown_plugin::HookUsage {
        rolldown_plugin::HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let code = args.code.to_string();
        let replacement = self.replacement.clone();

        async move {
            match substitute_env(&code, &replacement) {
                Some(substituted) => Ok(Some(HookTransformOutput {
                    code: Some(substituted),
                    map: None,
                    side_effects: None,
                    module_type: None,
                })),
                None => Ok(None),
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Replaces whole-expression occurrences of the env token.
///
/// An occurrence is skipped when it is the tail of a longer member chain
/// (`app.process.env.NODE_ENV`) or a longer identifier
/// (`process.env.NODE_ENVIRONMENT`). A trailing member access like
/// `process.env.NODE_ENV.length` still substitutes; the literal supports
/// the same access. Returns `None` when nothing matched.
fn substitute_env(code: &str, replacement: &str) -> Option<String> {
    let mut out = String::with_capacity(code.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(found) = code[search..].find(ENV_TOKEN) {
        let at = search + found;
        let end = at + ENV_TOKEN.len();

        let before_ok = code[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !is_ident_char(c) && c != '.');
        let after_ok = code[end..]
            .chars()
            .next()
            .is_none_or(|c| !is_ident_char(c));

        if before_ok && after_ok {
            out.push_str(&code[copied..at]);
            out.push_str(replacement);
            copied = end;
        }
        search = end;
    }

    if copied == 0 {
        return None;
    }
    out.push_str(&code[copied..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_whole_expression() {
        let code = "if (process.env.NODE_ENV === 'production') { run(); }";
        let out = substitute_env(code, "\"production\"").unwrap();
        assert_eq!(out, "if (\"production\" === 'production') { run(); }");
    }

    #[test]
    fn replaces_every_occurrence() {
        let code = "var a = process.env.NODE_ENV;\nvar b = process.env.NODE_ENV;";
        let out = substitute_env(code, "\"development\"").unwrap();
        assert_eq!(out.matches("\"development\"").count(), 2);
        assert!(!out.contains(ENV_TOKEN));
    }

    #[test]
    fn skips_longer_identifiers() {
        let code = "check(process.env.NODE_ENVIRONMENT);";
        assert!(substitute_env(code, "\"production\"").is_none());
    }

    #[test]
    fn skips_member_chain_prefixes() {
        let code = "read(app.process.env.NODE_ENV);";
        assert!(substitute_env(code, "\"production\"").is_none());
    }

    #[test]
    fn allows_trailing_member_access() {
        let code = "var n = process.env.NODE_ENV.length;";
        let out = substitute_env(code, "\"production\"").unwrap();
        assert_eq!(out, "var n = \"production\".length;");
    }

    #[test]
    fn untouched_source_returns_none() {
        assert!(substitute_env("var x = 1;", "\"production\"").is_none());
    }
}
