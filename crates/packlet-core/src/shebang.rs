//! Executable-shebang handling.

/// Splits a leading `#!` line off `source`.
///
/// Parsers used by the compile stage reject a shebang prefix, so it has to
/// come off before any of them see the text. The captured line keeps its
/// `#!` marker and carries no line terminator. Sources without a shebang
/// pass through untouched.
pub fn strip_shebang(source: &str) -> (Option<&str>, &str) {
    if !source.starts_with("#!") {
        return (None, source);
    }
    match source.find('\n') {
        Some(idx) => {
            let line = source[..idx].trim_end_matches('\r');
            (Some(line), &source[idx + 1..])
        }
        None => (Some(source), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_and_removes_leading_shebang() {
        let (shebang, body) = strip_shebang("#!/usr/bin/env node\nconst x = 1;\n");
        assert_eq!(shebang, Some("#!/usr/bin/env node"));
        assert_eq!(body, "const x = 1;\n");
    }

    #[test]
    fn handles_crlf_line_endings() {
        let (shebang, body) = strip_shebang("#!/usr/bin/env node\r\nlet y = 2;");
        assert_eq!(shebang, Some("#!/usr/bin/env node"));
        assert_eq!(body, "let y = 2;");
    }

    #[test]
    fn shebang_only_source_leaves_empty_body() {
        let (shebang, body) = strip_shebang("#!/bin/sh");
        assert_eq!(shebang, Some("#!/bin/sh"));
        assert_eq!(body, "");
    }

    #[test]
    fn plain_source_is_untouched() {
        let (shebang, body) = strip_shebang("export const a = 1;\n");
        assert_eq!(shebang, None);
        assert_eq!(body, "export const a = 1;\n");
    }

    #[test]
    fn mid_file_shebang_lookalikes_are_ignored() {
        let src = "const s = '#!notashebang';\n";
        assert_eq!(strip_shebang(src), (None, src));
    }
}
