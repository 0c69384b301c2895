//! Quick fixes built from the fixes attached to published diagnostics

use super::diagnostics::DIAGNOSTIC_SOURCE;
use super::to_lsp_position;
use crate::fragment::Source;
use crate::syntax::Fix;
use tower_lsp_server::ls_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams, CodeActionResponse,
    Diagnostic, DocumentChanges, NumberOrString, OneOf, OptionalVersionedTextDocumentIdentifier,
    Range, TextDocumentEdit, TextEdit, Uri, WorkspaceEdit,
};

/// Handle code action request (pure function)
///
/// `text` is the current content of the document.
#[must_use]
pub fn handle_code_action(params: &CodeActionParams, text: &str) -> Option<CodeActionResponse> {
    let source = Source::new(text);
    let uri = &params.text_document.uri;

    let actions: Vec<CodeActionOrCommand> = params
        .context
        .diagnostics
        .iter()
        .filter(|d| d.source.as_deref() == Some(DIAGNOSTIC_SOURCE))
        .filter_map(|d| create_fix_action(uri, d, &source))
        .collect();

    (!actions.is_empty()).then_some(actions)
}

fn create_fix_action(uri: &Uri, diagnostic: &Diagnostic, source: &Source) -> Option<CodeActionOrCommand> {
    let fix: Fix = serde_json::from_value(diagnostic.data.clone()?).ok()?;
    let range = fix_range(source, &fix)?;

    let title = match &diagnostic.code {
        Some(NumberOrString::String(rule)) => format!("Fix this {rule} problem"),
        _ => "Fix this problem".to_string(),
    };

    Some(CodeActionOrCommand::CodeAction(CodeAction {
        title,
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(vec![diagnostic.clone()]),
        edit: Some(create_workspace_edit(uri.clone(), range, fix.text)),
        is_preferred: Some(true),
        ..Default::default()
    }))
}

/// LSP range of a fix; fix ranges skip the byte-order mark
fn fix_range(source: &Source, fix: &Fix) -> Option<Range> {
    let bom = usize::from(source.text().starts_with('\u{feff}'));
    let (start, end) = fix.range;
    let lines = source.lines();

    let start = lines.location_of(start + bom)?;
    let end = lines.location_of(end + bom)?;
    Some(Range {
        start: to_lsp_position(source, start),
        end: to_lsp_position(source, end),
    })
}

fn create_workspace_edit(uri: Uri, range: Range, text: String) -> WorkspaceEdit {
    let text_document_edit = TextDocumentEdit {
        text_document: OptionalVersionedTextDocumentIdentifier { uri, version: None },
        edits: vec![OneOf::Left(TextEdit {
            range,
            new_text: text,
        })],
    };

    WorkspaceEdit {
        document_changes: Some(DocumentChanges::Edits(vec![text_document_edit])),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::diagnostics::compute_document_diagnostics;
    use crate::syntax::{self, Severity};
    use std::str::FromStr;
    use tower_lsp_server::ls_types::{CodeActionContext, Position, TextDocumentIdentifier};

    fn params(diagnostics: Vec<Diagnostic>) -> CodeActionParams {
        CodeActionParams {
            text_document: TextDocumentIdentifier {
                uri: Uri::from_str("file:///tmp/page.html").unwrap(),
            },
            range: Range::default(),
            context: CodeActionContext {
                diagnostics,
                ..Default::default()
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        }
    }

    fn edit_range(action: &CodeActionOrCommand) -> Range {
        let CodeActionOrCommand::CodeAction(action) = action else {
            panic!("expected a code action");
        };
        let Some(DocumentChanges::Edits(edits)) =
            action.edit.as_ref().and_then(|e| e.document_changes.as_ref())
        else {
            panic!("expected document edits");
        };
        let OneOf::Left(edit) = &edits[0].edits[0] else {
            panic!("expected a text edit");
        };
        edit.range
    }

    #[test]
    fn test_fix_becomes_quick_fix() {
        let text = "<script>\n  var a = 1;\n</script>";
        let diagnostic = syntax::Diagnostic::new(
            Some("no-var"),
            Severity::Warn,
            "Unexpected var, use let or const instead.",
            2,
            3,
        )
        .with_fix(11, 14, "let");
        let lsp = compute_document_diagnostics(text, &[diagnostic]);

        let actions = handle_code_action(&params(lsp), text).unwrap();
        assert_eq!(actions.len(), 1);
        let CodeActionOrCommand::CodeAction(action) = &actions[0] else {
            panic!("expected a code action");
        };
        assert_eq!(action.title, "Fix this no-var problem");
        assert_eq!(
            edit_range(&actions[0]),
            Range {
                start: Position {
                    line: 1,
                    character: 2
                },
                end: Position {
                    line: 1,
                    character: 5
                },
            }
        );
    }

    #[test]
    fn test_bom_document_fix_lands_on_the_same_text() {
        let text = "\u{feff}<script>var a = 1;</script>";
        // fix ranges do not count the BOM: "var" is at 8..11
        let diagnostic = syntax::Diagnostic::new(Some("no-var"), Severity::Warn, "m", 1, 10)
            .with_fix(8, 11, "let");
        let lsp = compute_document_diagnostics(text, &[diagnostic]);

        let actions = handle_code_action(&params(lsp), text).unwrap();
        let range = edit_range(&actions[0]);
        // the editor buffer has no BOM either
        assert_eq!((range.start.character, range.end.character), (8, 11));
    }

    #[test]
    fn test_foreign_and_fixless_diagnostics_are_ignored() {
        let text = "<script>x</script>";
        let mut lsp = compute_document_diagnostics(
            text,
            &[syntax::Diagnostic::new(Some("no-undef"), Severity::Error, "m", 1, 9)],
        );
        lsp.push(Diagnostic {
            source: Some("other".to_string()),
            ..Default::default()
        });
        assert!(handle_code_action(&params(lsp), text).is_none());
    }
}
