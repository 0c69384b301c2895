//! Indentation policy for script content

use crate::config::IndentDescriptor;

/// One line of script code that follows a line break
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    /// Remove `[from, to)`, the expected indentation
    Dedent { from: usize, to: usize },
    /// Whitespace-only line that does not carry the indentation
    Empty,
    /// Non-empty line whose indentation does not match; `at` is its first character
    BadIndent { at: usize },
}

fn is_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Expected indentation of a script's code
///
/// `code` is the script content, `tag_line_indent` the leading whitespace
/// of the line holding the `<script` tag.
#[must_use]
pub fn expected_indent(
    descriptor: Option<&IndentDescriptor>,
    tag_line_indent: &str,
    code: &[char],
) -> String {
    match descriptor {
        Some(d) if d.relative => format!("{tag_line_indent}{}", d.spaces),
        Some(d) => d.spaces.clone(),
        None => {
            let Some(first_break) = code.iter().position(|&c| is_break(c)) else {
                return String::new();
            };
            code[first_break..]
                .iter()
                .skip_while(|&&c| is_break(c))
                .take_while(|&&c| is_blank(c))
                .collect()
        }
    }
}

/// Check every line following a line break against `indent`
///
/// `is_ignored` marks characters (CDATA markers) that do not count as
/// content when deciding whether a line is empty. Positions are relative
/// to `code`.
pub fn dedent(indent: &str, code: &[char], is_ignored: impl Fn(usize) -> bool) -> Vec<LineAction> {
    let indent: Vec<char> = indent.chars().collect();
    let mut actions = Vec::new();
    let mut had_content = false;
    let mut i = 0;

    while i < code.len() {
        if !is_break(code[i]) {
            i += 1;
            continue;
        }
        if code[i] == '\r' && code.get(i + 1) == Some(&'\n') {
            i += 1;
        }
        let line_start = i + 1;

        let mut text_start = line_start;
        while code.get(text_start).is_some_and(|&c| is_blank(c)) {
            text_start += 1;
        }
        let mut line_end = text_start;
        while code.get(line_end).is_some_and(|&c| !is_break(c)) {
            line_end += 1;
        }

        let line_indent = &code[line_start..text_start];
        let is_empty = (text_start..line_end).all(|j| is_ignored(j) || code[j].is_whitespace());

        let bad = if !is_empty && !had_content {
            line_indent != indent.as_slice()
        } else {
            !line_indent.starts_with(&indent)
        };

        if !bad {
            if !indent.is_empty() {
                actions.push(LineAction::Dedent {
                    from: line_start,
                    to: line_start + indent.len(),
                });
            }
        } else if is_empty {
            actions.push(LineAction::Empty);
        } else {
            actions.push(LineAction::BadIndent { at: line_start });
        }

        had_content |= !is_empty;
        i = line_end;
    }

    actions
}
