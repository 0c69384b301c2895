//! Line/column bookkeeping over arbitrary text.
//!
//! Every coordinate in this crate is counted in `char`s: lines and
//! columns are 1-based, character indices are 0-based. `\r\n`, `\n` and
//! `\r` all terminate a line.

/// A 1-based line/column pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Line table for a text, built once
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Character index of the first character of every line
    line_starts: Vec<usize>,
    /// Character index just past the content of every line (before its break)
    line_ends: Vec<usize>,
    len: usize,
}

impl LineIndex {
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut line_ends = Vec::new();
        let mut chars = text.chars().peekable();
        let mut index = 0;

        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    line_ends.push(index);
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                        index += 1;
                    }
                    line_starts.push(index + 1);
                }
                '\n' => {
                    line_ends.push(index);
                    line_starts.push(index + 1);
                }
                _ => {}
            }
            index += 1;
        }
        line_ends.push(index);

        Self {
            line_starts,
            line_ends,
            len: index,
        }
    }

    /// Number of lines (an empty text has one)
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Length of the text in characters
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Character index of a location; `None` when the line does not exist
    ///
    /// Columns past the end of the line are not clamped.
    #[must_use]
    pub fn index_of(&self, location: Location) -> Option<usize> {
        if location.line == 0 || location.column == 0 {
            return None;
        }
        let start = *self.line_starts.get(location.line - 1)?;
        Some(start + location.column - 1)
    }

    /// Location of a character index; `None` past the end of the text
    #[must_use]
    pub fn location_of(&self, index: usize) -> Option<Location> {
        if index > self.len {
            return None;
        }
        let line = self.line_starts.partition_point(|&start| start <= index);
        Some(Location {
            line,
            column: index - self.line_starts[line - 1] + 1,
        })
    }

    /// Character range `[start, end)` of a line's content, without its break
    #[must_use]
    pub fn line_range(&self, line: usize) -> Option<(usize, usize)> {
        if line == 0 {
            return None;
        }
        let start = *self.line_starts.get(line - 1)?;
        let end = *self.line_ends.get(line - 1)?;
        Some((start, end))
    }
}

/// Convert a char range to the matching byte range of `text`
#[must_use]
pub fn byte_range(text: &str, start: usize, end: usize) -> (usize, usize) {
    let mut offsets = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()));
    let start_byte = offsets.nth(start).unwrap_or(text.len());
    let end_byte = if end > start {
        offsets.nth(end - start - 1).unwrap_or(text.len())
    } else {
        start_byte
    };
    (start_byte, end_byte)
}

/// Slice `text` by char indices
#[must_use]
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let (start, end) = byte_range(text, start, end);
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_line_breaks() {
        let index = LineIndex::new("a\r\nbc\rd\n");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_range(1), Some((0, 1)));
        assert_eq!(index.line_range(2), Some((3, 5)));
        assert_eq!(index.line_range(3), Some((6, 7)));
        assert_eq!(index.line_range(4), Some((8, 8)));
    }

    #[test]
    fn test_location_index_inverse() {
        let text = "let a;\n  b();\r\nc";
        let index = LineIndex::new(text);
        for i in 0..=index.len() {
            let location = index.location_of(i).unwrap();
            assert_eq!(index.index_of(location), Some(i), "index {i}");
        }
        assert_eq!(index.location_of(9), Some(Location::new(2, 3)));
        assert_eq!(index.location_of(index.len() + 1), None);
    }

    #[test]
    fn test_chars_not_bytes() {
        let text = "\u{feff}é = 1;\nx";
        let index = LineIndex::new(text);
        assert_eq!(index.len(), 9);
        assert_eq!(index.location_of(8), Some(Location::new(2, 1)));
        assert_eq!(char_slice(text, 1, 2), "é");
    }
}
