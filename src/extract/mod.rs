//! Extraction of script fragments from HTML and XML documents
//!
//! [`extract`] scans the document for `<script>` elements, keeps those the
//! JavaScript predicate accepts, and turns each one into a [`CodeFragment`]
//! whose text is dedented according to the indentation policy. Indentation
//! mismatches are recorded by document line, never corrected.

mod indent;
mod markup;

pub use indent::{dedent, expected_indent, LineAction};
pub use markup::{scan_scripts, ScriptElement};

use crate::config::IndentDescriptor;
use crate::fragment::{CodeFragment, FragmentBuilder, Source};

/// Options consumed by the extractor
pub struct ExtractOptions<'a> {
    pub indent: Option<&'a IndentDescriptor>,
    /// XML-flavored markup rules
    pub xml: bool,
    pub report_bad_indent: bool,
    /// Receives a script's `type` attribute; absent or empty types are always JavaScript
    pub is_javascript: &'a dyn Fn(&str) -> bool,
}

impl std::fmt::Debug for ExtractOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("indent", &self.indent)
            .field("xml", &self.xml)
            .field("report_bad_indent", &self.report_bad_indent)
            .finish_non_exhaustive()
    }
}

/// Result of extracting a document
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Fragments in document order
    pub fragments: Vec<CodeFragment>,
    /// Document lines whose indentation did not match
    pub bad_indentation_lines: Vec<usize>,
    pub has_bom: bool,
}

/// Extract every JavaScript fragment of `text`
#[must_use]
pub fn extract(text: &str, options: &ExtractOptions<'_>) -> Extraction {
    let chars: Vec<char> = text.chars().collect();
    let source = Source::new(text);
    let mut fragments = Vec::new();
    let mut bad_indentation_lines = Vec::new();

    for script in scan_scripts(&chars, options.xml) {
        let type_attr = script.type_attr.as_deref().map(str::trim).unwrap_or_default();
        if !type_attr.is_empty() && !(options.is_javascript)(type_attr) {
            tracing::trace!(type_attr, "skipping non-JavaScript script");
            continue;
        }

        let is_module = type_attr.eq_ignore_ascii_case("module");
        let code = &chars[script.content_start..script.content_end];
        let tag_line_indent = line_indent_before(&chars, script.tag_start);
        let indent = expected_indent(options.indent, &tag_line_indent, code);

        let is_marker = |j: usize| {
            let at = script.content_start + j;
            script.cdata_markers.iter().any(|&(from, to)| at >= from && at < to)
        };

        let mut removals: Vec<(usize, usize)> = script.cdata_markers.clone();
        for action in dedent(&indent, code, is_marker) {
            match action {
                LineAction::Dedent { from, to } => {
                    removals.push((script.content_start + from, script.content_start + to));
                }
                LineAction::BadIndent { at } if options.report_bad_indent => {
                    if let Some(location) = source.lines().location_of(script.content_start + at) {
                        bad_indentation_lines.push(location.line);
                    }
                }
                LineAction::BadIndent { .. } | LineAction::Empty => {}
            }
        }
        removals.sort_unstable();

        let mut builder =
            FragmentBuilder::new(source.clone(), script.content_start, script.content_end)
                .module(is_module);
        for (from, to) in removals {
            builder.remove(from, to);
        }
        fragments.push(builder.build(fragments.len()));
    }

    let has_bom = text.starts_with('\u{feff}');
    tracing::debug!(
        fragments = fragments.len(),
        bad_indentation = bad_indentation_lines.len(),
        has_bom,
        "document extracted"
    );

    Extraction {
        fragments,
        bad_indentation_lines,
        has_bom,
    }
}

/// Leading whitespace of the line containing `at`
fn line_indent_before(chars: &[char], at: usize) -> String {
    let line_start = chars[..at]
        .iter()
        .rposition(|&c| c == '\n' || c == '\r')
        .map_or(0, |p| p + 1);
    chars[line_start..at]
        .iter()
        .take_while(|&&c| c == ' ' || c == '\t')
        .collect()
}
