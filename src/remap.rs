//! Remapping of fragment-local diagnostics to document coordinates

use crate::fragment::CodeFragment;
use crate::position::Location;
use crate::syntax::{Diagnostic, Fix};

/// Translate a fragment's diagnostics into document coordinates
///
/// Diagnostics whose primary location falls inside synthetic text are
/// dropped. An unmappable end location is left as reported. Fix ranges
/// address the document without its byte-order mark.
#[must_use]
pub fn remap_diagnostics(
    diagnostics: Vec<Diagnostic>,
    fragment: &CodeFragment,
    has_bom: bool,
) -> Vec<Diagnostic> {
    let mut remapped = Vec::with_capacity(diagnostics.len());

    for mut diagnostic in diagnostics {
        // Some rules report column 0 on purpose to dodge suppression comments
        let column = diagnostic.column.max(1);

        let Some(location) = fragment.original_location(Location::new(diagnostic.line, column))
        else {
            tracing::trace!(
                fragment = fragment.index(),
                line = diagnostic.line,
                column,
                "dropping diagnostic reported in synthetic text"
            );
            continue;
        };

        diagnostic.line = location.line;
        diagnostic.column = location.column;
        diagnostic.source = fragment.original_line(location.line).map(str::to_string);

        if let Some(fix) = diagnostic.fix.take() {
            diagnostic.fix = remap_fix(fix, fragment, has_bom);
        }

        if let (Some(end_line), Some(end_column)) = (diagnostic.end_line, diagnostic.end_column) {
            if end_line > 0 && end_column > 0 {
                if let Some(end) =
                    fragment.original_end_location(Location::new(end_line, end_column))
                {
                    diagnostic.end_line = Some(end.line);
                    diagnostic.end_column = Some(end.column);
                }
            }
        }

        remapped.push(diagnostic);
    }

    remapped
}

/// Map a fix range; `None` when one of its boundaries is synthetic
fn remap_fix(fix: Fix, fragment: &CodeFragment, has_bom: bool) -> Option<Fix> {
    let (start, end) = fix.range;
    let mapped_start = fragment.original_index(start)?;
    // The end is exclusive: map the last replaced character and step past it
    let mapped_end = if end > start {
        fragment.original_index(end - 1)? + 1
    } else {
        mapped_start
    };

    let bom_offset = usize::from(has_bom);
    Some(Fix {
        range: (
            mapped_start.saturating_sub(bom_offset),
            mapped_end.saturating_sub(bom_offset),
        ),
        text: fix.text,
    })
}

/// Order diagnostics by document line, then column
///
/// The sort is stable: diagnostics on the same position keep their order.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.column.cmp(&b.column)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{FragmentBuilder, Source};
    use crate::syntax::Severity;
    use pretty_assertions::assert_eq;

    fn diagnostic(line: usize, column: usize) -> Diagnostic {
        Diagnostic::new(Some("rule"), Severity::Warn, "message", line, column)
    }

    /// "<script>\n  foo();\n</script>" with the indentation removed
    fn fragment(document: &str, offset: usize) -> CodeFragment {
        let source = Source::new(document);
        let mut builder = FragmentBuilder::new(source, offset + 8, offset + 18);
        builder.remove(offset + 9, offset + 11);
        builder.build(0)
    }

    #[test]
    fn test_primary_location_and_source() {
        let document = "<script>\n  foo();\n</script>";
        let fragment = fragment(document, 0);
        assert_eq!(fragment.text(), "\nfoo();\n");

        let remapped = remap_diagnostics(vec![diagnostic(2, 4)], &fragment, false);
        assert_eq!(remapped[0].line, 2);
        assert_eq!(remapped[0].column, 6);
        assert_eq!(remapped[0].source.as_deref(), Some("  foo();"));
    }

    #[test]
    fn test_column_zero_is_column_one() {
        let fragment = fragment("<script>\n  foo();\n</script>", 0);
        let remapped = remap_diagnostics(vec![diagnostic(2, 0)], &fragment, false);
        assert_eq!((remapped[0].line, remapped[0].column), (2, 3));
    }

    #[test]
    fn test_fix_range_end_is_exclusive() {
        let fragment = fragment("<script>\n  foo();\n</script>", 0);
        // replace "foo" (fragment indices 1..4)
        let remapped = remap_diagnostics(
            vec![diagnostic(2, 1).with_fix(1, 4, "bar")],
            &fragment,
            false,
        );
        assert_eq!(remapped[0].fix.as_ref().unwrap().range, (11, 14));
    }

    #[test]
    fn test_bom_shifts_fix_range_by_one() {
        let plain = fragment("<script>\n  foo();\n</script>", 0);
        let with_bom = fragment("\u{feff}<script>\n  foo();\n</script>", 1);
        assert_eq!(plain.text(), with_bom.text());

        let fixed = |fragment: &CodeFragment, has_bom: bool| {
            remap_diagnostics(vec![diagnostic(2, 1).with_fix(5, 8, "x")], fragment, has_bom)[0]
                .fix
                .clone()
                .unwrap()
                .range
        };
        let (start, end) = fixed(&plain, false);
        let (bom_start, bom_end) = fixed(&with_bom, true);
        // the BOM document is one character longer, the fix range is not
        assert_eq!((bom_start, bom_end), (start, end));
        assert_eq!(fixed(&with_bom, false), (bom_start + 1, bom_end + 1));
        assert_eq!(
            with_bom.original_index(5).unwrap() - 1,
            plain.original_index(5).unwrap()
        );
    }

    #[test]
    fn test_unmappable_primary_is_dropped_end_is_kept() {
        let source = Source::new("x();");
        let mut builder = FragmentBuilder::new(source, 0, 4);
        builder.insert(0, "shim();\n").insert(4, "\nshim();");
        let fragment = builder.build(0);
        assert_eq!(fragment.text(), "shim();\nx();\nshim();");

        let in_shim = diagnostic(1, 2);
        let in_code = diagnostic(2, 1).with_end(3, 3);
        let remapped = remap_diagnostics(vec![in_shim, in_code], &fragment, false);

        assert_eq!(remapped.len(), 1);
        assert_eq!((remapped[0].line, remapped[0].column), (1, 1));
        assert_eq!((remapped[0].end_line, remapped[0].end_column), (Some(3), Some(3)));
    }

    #[test]
    fn test_end_at_fragment_end_stays_on_the_script_line() {
        let source = Source::new("<script>var a = 1</script>\n<p>\n</p>\n");
        let fragment = FragmentBuilder::new(source, 8, 17).build(0);

        let remapped = remap_diagnostics(vec![diagnostic(1, 1).with_end(1, 10)], &fragment, false);
        assert_eq!((remapped[0].line, remapped[0].column), (1, 9));
        assert_eq!((remapped[0].end_line, remapped[0].end_column), (Some(1), Some(18)));
    }

    #[test]
    fn test_fix_inside_synthetic_text_is_removed() {
        let source = Source::new("x();");
        let mut builder = FragmentBuilder::new(source, 0, 4);
        builder.insert(0, "shim();\n");
        let fragment = builder.build(0);

        let remapped =
            remap_diagnostics(vec![diagnostic(2, 1).with_fix(0, 9, "")], &fragment, false);
        assert_eq!(remapped.len(), 1);
        assert!(remapped[0].fix.is_none());
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut diagnostics = vec![
            Diagnostic::new(None, Severity::Warn, "b", 3, 1),
            Diagnostic::new(None, Severity::Warn, "first", 1, 5),
            Diagnostic::new(None, Severity::Warn, "c", 3, 1),
            Diagnostic::new(None, Severity::Warn, "a", 1, 2),
        ];
        sort_diagnostics(&mut diagnostics);
        let order: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(order, vec!["a", "first", "b", "c"]);
    }
}
