//! Diagnostics capability
//!
//! Converts linter diagnostics to LSP diagnostics. The fix of a diagnostic
//! travels in its `data` field so code actions can pick it up later.

use super::to_lsp_position;
use crate::fragment::Source;
use crate::position::Location;
use crate::syntax::{self, Severity};
use tower_lsp_server::ls_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Range};

/// `source` of every published diagnostic
pub const DIAGNOSTIC_SOURCE: &str = "embedded-script-lint";

/// Convert one diagnostic against the document it was reported on
#[must_use]
pub fn to_lsp_diagnostic(diagnostic: &syntax::Diagnostic, source: &Source) -> Diagnostic {
    let start = to_lsp_position(source, Location::new(diagnostic.line, diagnostic.column));
    let end = match (diagnostic.end_line, diagnostic.end_column) {
        (Some(line), Some(column)) => to_lsp_position(source, Location::new(line, column)),
        _ => start,
    };

    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warn => DiagnosticSeverity::WARNING,
        Severity::Off => DiagnosticSeverity::HINT,
    };

    Diagnostic {
        range: Range { start, end },
        severity: Some(severity),
        code: diagnostic.rule_id.clone().map(NumberOrString::String),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: diagnostic.message.clone(),
        data: diagnostic
            .fix
            .as_ref()
            .and_then(|fix| serde_json::to_value(fix).ok()),
        ..Default::default()
    }
}

/// Compute LSP diagnostics for a document
#[must_use]
pub fn compute_document_diagnostics(
    text: &str,
    diagnostics: &[syntax::Diagnostic],
) -> Vec<Diagnostic> {
    let source = Source::new(text);
    diagnostics
        .iter()
        .map(|diagnostic| to_lsp_diagnostic(diagnostic, &source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp_server::ls_types::Position;

    #[test]
    fn test_conversion() {
        let text = "<script>\n  foo();\n</script>";
        let diagnostic = syntax::Diagnostic::new(
            Some("no-undef"),
            Severity::Error,
            "'foo' is not defined.",
            2,
            3,
        )
        .with_end(2, 6)
        .with_fix(11, 14, "bar");

        let converted = compute_document_diagnostics(text, &[diagnostic]);
        let lsp = &converted[0];
        assert_eq!(
            lsp.range.start,
            Position {
                line: 1,
                character: 2
            }
        );
        assert_eq!(
            lsp.range.end,
            Position {
                line: 1,
                character: 5
            }
        );
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(lsp.code, Some(NumberOrString::String("no-undef".to_string())));
        assert_eq!(lsp.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
        assert!(lsp.data.is_some());
    }

    #[test]
    fn test_missing_end_collapses_to_start() {
        let diagnostic =
            syntax::Diagnostic::new(None, Severity::Warn, "Bad line indentation.", 1, 1);
        let converted = compute_document_diagnostics("x", &[diagnostic]);
        assert_eq!(converted[0].range.start, converted[0].range.end);
        assert!(converted[0].code.is_none());
        assert!(converted[0].data.is_none());
    }
}
