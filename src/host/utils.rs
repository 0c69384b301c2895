//! Common utilities for tree-sitter parsing

use crate::position::{LineIndex, Location};
use tree_sitter::Node;

/// Query file embedded at compile time
const JS_QUERY: &str = include_str!("queries/javascript.scm");

/// Get the rule query; the JavaScript query also matches TypeScript trees
pub fn get_query_source() -> &'static str {
    JS_QUERY
}

/// Text access on tree-sitter nodes
pub trait NodeTextExt {
    /// Source text of the node, empty when the range is not valid UTF-8
    fn text_or_default(&self, content: &str) -> String;
    fn text_ref<'a>(&self, content: &'a str) -> &'a str;
}

impl NodeTextExt for Node<'_> {
    fn text_or_default(&self, content: &str) -> String {
        self.text_ref(content).to_string()
    }

    fn text_ref<'a>(&self, content: &'a str) -> &'a str {
        self.utf8_text(content.as_bytes()).unwrap_or_default()
    }
}

/// Byte offsets from tree-sitter translated to char positions
#[derive(Debug)]
pub struct CharOffsets {
    /// Byte offset of every char
    starts: Vec<usize>,
    lines: LineIndex,
}

impl CharOffsets {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            starts: text.char_indices().map(|(i, _)| i).collect(),
            lines: LineIndex::new(text),
        }
    }

    /// Char index of a byte offset
    #[must_use]
    pub fn char_index(&self, byte: usize) -> usize {
        self.starts.partition_point(|&start| start < byte)
    }

    /// 1-based location of a byte offset
    #[must_use]
    pub fn location(&self, byte: usize) -> Location {
        let index = self.char_index(byte);
        self.lines
            .location_of(index)
            .unwrap_or_else(|| Location::new(self.lines.line_count(), 1))
    }
}
