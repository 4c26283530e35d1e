//! Diagnostic extraction from engine errors.
//!
//! The engine's error types are not stable across releases, so this module
//! extracts the fields the session and CLI layers need into a cloneable,
//! serializable form and insulates the rest of the crate from upstream
//! changes.

use serde::{Deserialize, Serialize};

/// Structured diagnostic extracted from an engine failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Source file the failure points at, when the text carries one.
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// Diagnostic kind, classified from the engine's error rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Parse,
    UnresolvedEntry,
    UnresolvedImport,
    Plugin,
    Transform,
    Other,
}

impl DiagnosticKind {
    /// Parse and transform failures belong to the compile pipeline; the
    /// resolution and emit kinds are bundling concerns.
    pub fn is_compilation(&self) -> bool {
        matches!(self, DiagnosticKind::Parse | DiagnosticKind::Transform)
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Parse => write!(f, "ParseError"),
            DiagnosticKind::UnresolvedEntry => write!(f, "UnresolvedEntry"),
            DiagnosticKind::UnresolvedImport => write!(f, "UnresolvedImport"),
            DiagnosticKind::Plugin => write!(f, "Plugin"),
            DiagnosticKind::Transform => write!(f, "Transform"),
            DiagnosticKind::Other => write!(f, "Error"),
        }
    }
}

/// Extract diagnostics from an engine error value.
///
/// Goes through the debug rendering rather than the engine's own types:
/// kind is classified from marker substrings, file and line recovered where
/// the text carries them. Batched errors split into one diagnostic each.
pub fn extract_from_engine_error(error: &dyn std::fmt::Debug) -> Vec<Diagnostic> {
    let error_str = format!("{error:?}");

    if error_str.contains("BatchedBuildDiagnostic") {
        let parts: Vec<&str> = error_str
            .split("BuildDiagnostic")
            .filter(|s| {
                let trimmed = s.trim();
                trimmed != "Batched" && trimmed.chars().any(|c| c.is_alphabetic())
            })
            .collect();
        if parts.len() > 1 {
            return parts.iter().map(|part| extract_single(part)).collect();
        }
    }

    vec![extract_single(&error_str)]
}

/// Extract one diagnostic from a formatted error fragment.
fn extract_single(error_str: &str) -> Diagnostic {
    let kind = if error_str.contains("ParseError")
        || error_str.contains("Parse error")
        || error_str.contains("Syntax")
        || error_str.contains("Unexpected token")
        || error_str.contains("Expected")
    {
        DiagnosticKind::Parse
    } else if error_str.contains("UnresolvedEntry") || error_str.contains("resolve entry") {
        DiagnosticKind::UnresolvedEntry
    } else if error_str.contains("UnresolvedImport")
        || error_str.contains("Could not resolve")
        || error_str.contains("Cannot resolve")
    {
        DiagnosticKind::UnresolvedImport
    } else if error_str.contains("Plugin") || error_str.contains("plugin") {
        DiagnosticKind::Plugin
    } else if error_str.contains("Transform") || error_str.contains("transform") {
        DiagnosticKind::Transform
    } else {
        DiagnosticKind::Other
    };

    Diagnostic {
        kind,
        message: error_str.trim().to_string(),
        file: extract_file_path(error_str),
        line: extract_line_number(error_str),
    }
}

/// Extract a source file path from an error fragment.
fn extract_file_path(text: &str) -> Option<String> {
    for ext in &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".json"] {
        if let Some(pos) = text.find(ext) {
            let before = &text[..pos + ext.len()];
            // Backtrack to the nearest path indicator
            let start = ["in ", "at ", "file: ", "path: ", "\"", "'"]
                .iter()
                .filter_map(|indicator| {
                    before.rfind(indicator).map(|at| at + indicator.len())
                })
                .max();
            if let Some(start) = start {
                let candidate = before[start..].trim();
                if !candidate.is_empty() {
                    return Some(candidate.to_string());
                }
            }
        }
    }
    None
}

/// Extract a line number from patterns like `line 5` or `:5:12`.
fn extract_line_number(text: &str) -> Option<u32> {
    for pattern in &["line ", ":"] {
        let mut search_from = 0;
        while let Some(pos) = text[search_from..].find(pattern) {
            let after = &text[search_from + pos + pattern.len()..];
            let num_str: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !num_str.is_empty() {
                if let Ok(num) = num_str.parse::<u32>() {
                    return Some(num);
                }
            }
            search_from += pos + pattern.len();
        }
    }
    None
}
