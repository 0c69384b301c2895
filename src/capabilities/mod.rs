//! LSP Server Capabilities
//!
//! Diagnostics and quick fixes. Positions are converted here from the
//! character-based coordinates of the linter to LSP's UTF-16 ones.

pub mod code_actions;
pub mod diagnostics;

use crate::fragment::Source;
use crate::position::Location;
use tower_lsp_server::ls_types::{
    CodeActionKind, CodeActionOptions, CodeActionProviderCapability, Position,
    ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextDocumentSyncSaveOptions,
};

/// Build the LSP server capabilities configuration
#[must_use]
pub fn build_server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
            code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
            ..Default::default()
        })),
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                ..Default::default()
            },
        )),
        ..Default::default()
    }
}

/// 0-based LSP position of a 1-based document location
///
/// Editors drop the byte-order mark from their buffers, so it takes no
/// room on the first line.
#[must_use]
pub fn to_lsp_position(source: &Source, location: Location) -> Position {
    let line = location.line.saturating_sub(1);
    let mut column = location.column.saturating_sub(1);

    let character = match source.line(location.line) {
        Some(text) => {
            let text = match text.strip_prefix('\u{feff}') {
                Some(rest) if location.line == 1 => {
                    column = column.saturating_sub(1);
                    rest
                }
                _ => text,
            };
            let in_line: usize = text.chars().take(column).map(char::len_utf16).sum();
            // past the end of the line every column is one unit
            in_line + column.saturating_sub(text.chars().count())
        }
        None => column,
    };

    Position {
        line: u32::try_from(line).unwrap_or(u32::MAX),
        character: u32::try_from(character).unwrap_or(u32::MAX),
    }
}
