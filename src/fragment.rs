//! Code fragments and their mapping back to the document.
//!
//! A fragment is described as the document with a sorted list of
//! replacement blocks applied: everything outside the script is removed,
//! indentation and CDATA markers are removed, and synthetic text can be
//! inserted. The fragment text is rendered once; mapping walks the blocks.

use crate::position::{char_slice, LineIndex, Location};
use std::sync::Arc;

/// Replacement of the document range `[from, to)` by `text`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    from: usize,
    to: usize,
    text: String,
    text_len: usize,
}

/// The document a set of fragments was extracted from
#[derive(Debug)]
pub struct Source {
    text: String,
    lines: LineIndex,
}

impl Source {
    #[must_use]
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            lines: LineIndex::new(text),
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    /// Text of a 1-based document line, without its line break
    #[must_use]
    pub fn line(&self, line: usize) -> Option<&str> {
        let (start, end) = self.lines.line_range(line)?;
        Some(char_slice(&self.text, start, end))
    }
}

/// One extracted unit of program text plus its position mapper
#[derive(Debug, Clone)]
pub struct CodeFragment {
    index: usize,
    is_module: bool,
    source: Arc<Source>,
    blocks: Vec<Block>,
    text: String,
    lines: LineIndex,
}

impl CodeFragment {
    /// Ordinal position in the document's fragment sequence
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The fragment opted out of the shared top-level scope
    #[must_use]
    pub fn is_module(&self) -> bool {
        self.is_module
    }

    /// Text handed to the verifier
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Map a fragment character index to a document character index
    ///
    /// Returns `None` for indices inside inserted synthetic text.
    #[must_use]
    pub fn original_index(&self, index: usize) -> Option<usize> {
        let mut index = index;
        for block in &self.blocks {
            if index < block.from {
                break;
            }
            if index < block.from + block.text_len {
                return None;
            }
            index = index + (block.to - block.from) - block.text_len;
        }
        (index <= self.source.lines.len()).then_some(index)
    }

    /// Map a fragment location to a document location
    #[must_use]
    pub fn original_location(&self, location: Location) -> Option<Location> {
        let index = self.lines.index_of(location)?;
        let original = self.original_index(index)?;
        self.source.lines.location_of(original)
    }

    /// Map an exclusive end location to the document
    ///
    /// The end follows the last character it covers, so it never runs over
    /// markup removed after that character.
    #[must_use]
    pub fn original_end_location(&self, location: Location) -> Option<Location> {
        let index = self.lines.index_of(location)?;
        let original = match index.checked_sub(1) {
            Some(last) => self.original_index(last)? + 1,
            None => self.original_index(0)?,
        };
        self.source.lines.location_of(original)
    }

    /// Literal document line text, used as diagnostic context
    #[must_use]
    pub fn original_line(&self, line: usize) -> Option<&str> {
        self.source.line(line)
    }
}

/// Builds a [`CodeFragment`] from ascending, disjoint edits of the document
#[derive(Debug)]
pub struct FragmentBuilder {
    source: Arc<Source>,
    start: usize,
    end: usize,
    blocks: Vec<Block>,
    cursor: usize,
    is_module: bool,
}

impl FragmentBuilder {
    /// Keep the document range `[start, end)`, drop the rest
    #[must_use]
    pub fn new(source: Arc<Source>, start: usize, end: usize) -> Self {
        let len = source.lines.len();
        let end = end.min(len);
        let start = start.min(end);
        Self {
            source,
            start,
            end,
            blocks: Vec::new(),
            cursor: start,
            is_module: false,
        }
    }

    #[must_use]
    pub fn module(mut self, is_module: bool) -> Self {
        self.is_module = is_module;
        self
    }

    /// Replace `[from, to)` by `text`
    ///
    /// Edits must come in document order; an edit overlapping the previous
    /// one is clamped to start where the previous one ended.
    pub fn replace(&mut self, from: usize, to: usize, text: &str) -> &mut Self {
        let from = from.clamp(self.cursor, self.end);
        let to = to.clamp(from, self.end);
        if from == to && text.is_empty() {
            return self;
        }
        self.blocks.push(Block {
            from,
            to,
            text: text.to_string(),
            text_len: text.chars().count(),
        });
        self.cursor = to;
        self
    }

    pub fn remove(&mut self, from: usize, to: usize) -> &mut Self {
        self.replace(from, to, "")
    }

    /// Insert synthetic text that has no document counterpart
    pub fn insert(&mut self, at: usize, text: &str) -> &mut Self {
        self.replace(at, at, text)
    }

    #[must_use]
    pub fn build(self, index: usize) -> CodeFragment {
        let len = self.source.lines.len();
        let mut blocks = Vec::with_capacity(self.blocks.len() + 2);
        if self.start > 0 {
            blocks.push(Block {
                from: 0,
                to: self.start,
                text: String::new(),
                text_len: 0,
            });
        }
        blocks.extend(self.blocks);
        if self.end < len {
            blocks.push(Block {
                from: self.end,
                to: len,
                text: String::new(),
                text_len: 0,
            });
        }

        let document = self.source.text();
        let mut text = String::new();
        let mut position = 0;
        for block in &blocks {
            text.push_str(char_slice(document, position, block.from));
            text.push_str(&block.text);
            position = block.to;
        }
        text.push_str(char_slice(document, position, len));

        let lines = LineIndex::new(&text);
        CodeFragment {
            index,
            is_module: self.is_module,
            source: self.source,
            blocks,
            text,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<p>\n<script>\n  var a;\n  b();\n</script>\n";

    fn script_fragment() -> CodeFragment {
        let source = Source::new(DOC);
        // "<p>\n<script>" is 12 chars, the code runs up to "</script>" at 29
        let mut builder = FragmentBuilder::new(source, 12, 29);
        builder.remove(13, 15).remove(22, 24);
        builder.build(0)
    }

    #[test]
    fn test_rendered_text() {
        assert_eq!(script_fragment().text(), "\nvar a;\nb();\n");
    }

    #[test]
    fn test_original_index_skips_removed_text() {
        let fragment = script_fragment();
        assert_eq!(fragment.original_index(0), Some(12));
        assert_eq!(fragment.original_index(1), Some(15));
        assert_eq!(fragment.original_index(8), Some(24));
    }

    #[test]
    fn test_original_location() {
        let fragment = script_fragment();
        assert_eq!(
            fragment.original_location(Location::new(2, 5)),
            Some(Location::new(3, 7))
        );
        assert_eq!(
            fragment.original_location(Location::new(3, 1)),
            Some(Location::new(4, 3))
        );
        assert_eq!(fragment.original_line(3), Some("  var a;"));
    }

    #[test]
    fn test_inserted_text_is_unmappable() {
        let source = Source::new("x();");
        let mut builder = FragmentBuilder::new(source, 0, 4);
        builder.insert(0, "shim;\n");
        let fragment = builder.build(0);
        assert_eq!(fragment.text(), "shim;\nx();");
        assert_eq!(fragment.original_index(2), None);
        assert_eq!(fragment.original_location(Location::new(1, 1)), None);
        assert_eq!(
            fragment.original_location(Location::new(2, 2)),
            Some(Location::new(1, 2))
        );
    }

    #[test]
    fn test_mapping_is_monotonic() {
        let fragment = script_fragment();
        let mapped: Vec<usize> = (0..=fragment.text().chars().count())
            .filter_map(|i| fragment.original_index(i))
            .collect();
        assert!(mapped.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_end_location_stops_at_the_code() {
        let source = Source::new("<script>var a = 1</script>\n<p>\n</p>\n");
        let fragment = FragmentBuilder::new(source, 8, 17).build(0);
        assert_eq!(fragment.text(), "var a = 1");

        // the start mapping of the same point runs into the removed markup
        assert_eq!(
            fragment.original_location(Location::new(1, 10)),
            Some(Location::new(4, 1))
        );
        assert_eq!(
            fragment.original_end_location(Location::new(1, 10)),
            Some(Location::new(1, 18))
        );
        assert_eq!(
            fragment.original_end_location(Location::new(1, 1)),
            Some(Location::new(1, 9))
        );
    }

    #[test]
    fn test_out_of_order_edit_is_clamped() {
        let source = Source::new("abcdef");
        let mut builder = FragmentBuilder::new(source, 0, 6);
        builder.remove(2, 4).remove(1, 3);
        assert_eq!(builder.build(0).text(), "abef");
    }
}
