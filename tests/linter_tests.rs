//! Document analysis tests with the tree-sitter host

mod common;

use common::{assert_ordered, lint, lint_fixture, load_fixture, summary};
use embedded_script_lint::config::Settings;
use embedded_script_lint::extract::{extract, ExtractOptions};
use embedded_script_lint::linter::{
    analyze_document, AnalysisConfig, DocumentConfig, Linter, LocationContext, SourceType,
    Verifier, VerifyOutcome, VerifyRequest, BAD_INDENT_RULE,
};
use embedded_script_lint::position::{LineIndex, Location};
use embedded_script_lint::syntax::{Diagnostic, Error, Mode, Severity};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_forward_use_is_not_reported() {
    let diagnostics = lint_fixture("html/shared_scope.html");
    assert!(diagnostics.is_empty(), "{:?}", summary(&diagnostics));
}

#[test]
fn test_declarations_do_not_flow_backward() {
    let diagnostics = lint_fixture("html/backward.html");
    assert_eq!(
        summary(&diagnostics),
        vec![
            "2:15 'y' is not defined. (no-undef)",
            "5:7 'y' is assigned a value but never used. (no-unused-vars)",
        ]
    );
    assert_eq!(diagnostics[0].source.as_deref(), Some("  console.log(y);"));
}

#[test]
fn test_each_fragment_alone_without_shared_scope() {
    let text = load_fixture("html/shared_scope.html");
    let analysis = AnalysisConfig {
        source_type: SourceType::Module,
        ..AnalysisConfig::default()
    };
    let diagnostics = lint("shared_scope.html", &text, &Settings::default(), &analysis);
    assert_eq!(
        summary(&diagnostics),
        vec![
            "5:11 'x' is assigned a value but never used. (no-unused-vars)",
            "10:19 'x' is not defined. (no-undef)",
        ]
    );
}

#[test]
fn test_module_scripts_neither_give_nor_receive() {
    let diagnostics = lint_fixture("html/module.html");
    assert_eq!(
        summary(&diagnostics),
        vec![
            "5:15 'shared' is not defined. (no-undef)",
            "6:9 'local' is assigned a value but never used. (no-unused-vars)",
        ]
    );
}

#[test]
fn test_one_bad_indentation_record() {
    let text = load_fixture("html/bad_indent.html");
    let settings = Settings::from_value(json!({
        "indent": "+2",
        "report-bad-indent": "error"
    }))
    .unwrap();
    let diagnostics = lint("bad_indent.html", &text, &settings, &AnalysisConfig::default());

    let bad_indent: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| d.rule_id.as_deref() == Some(BAD_INDENT_RULE))
        .collect();
    assert_eq!(bad_indent.len(), 1);
    assert_eq!((bad_indent[0].line, bad_indent[0].column), (8, 1));
    assert_eq!(bad_indent[0].message, "Bad line indentation.");
    assert_eq!(bad_indent[0].severity, Severity::Error);

    assert_eq!(
        summary(&diagnostics),
        vec![
            "4:5 Unexpected 'debugger' statement. (no-debugger)",
            "5:5 'undefinedCall' is not defined. (no-undef)",
            "8:1 Bad line indentation. ((html plugin))",
            "8:11 'b' is assigned a value but never used. (no-unused-vars)",
        ]
    );
    assert_ordered(&diagnostics);
}

#[test]
fn test_non_javascript_scripts_are_ignored() {
    let diagnostics = lint_fixture("html/templates.html");
    assert!(diagnostics.is_empty(), "{:?}", summary(&diagnostics));
}

#[test]
fn test_xml_mode_from_extension() {
    let diagnostics = lint_fixture("xml/page.xhtml");
    assert_eq!(
        summary(&diagnostics),
        vec!["5:18 Unexpected 'debugger' statement. (no-debugger)"]
    );
    assert_eq!(
        diagnostics[0].source.as_deref(),
        Some("if (count < 1) { debugger; }")
    );
}

#[test]
fn test_unknown_extension_is_verified_as_a_whole() {
    let diagnostics = lint(
        "app.js",
        "var a = 1;\n",
        &Settings::default(),
        &AnalysisConfig::default(),
    );
    assert_eq!(
        summary(&diagnostics),
        vec!["1:5 'a' is assigned a value but never used. (no-unused-vars)"]
    );
    assert!(diagnostics[0].source.is_none());
}

#[test]
fn test_explicit_mode_wins_over_file_name() {
    let settings = Settings::default();
    let analysis = AnalysisConfig::default();
    let location = LocationContext::default();
    let config = DocumentConfig::new(&settings, &analysis, &location).with_mode(Mode::Html);

    let diagnostics = analyze_document(
        "<p>hi</p>\n<script>\n  foo();\n</script>",
        &config,
        &mut embedded_script_lint::host::TreeSitterVerifier::new(),
    );
    assert_eq!(summary(&diagnostics), vec!["3:3 'foo' is not defined. (no-undef)"]);
}

#[test]
fn test_parse_error_in_one_fragment() {
    let text = "<script>\n  var ok = 1;\n</script>\n<script>\n  ok(;\n</script>";
    let diagnostics = lint("page.html", text, &Settings::default(), &AnalysisConfig::default());

    let fatal: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.fatal).collect();
    assert_eq!(fatal.len(), 1);
    assert_eq!(fatal[0].line, 5);
    assert!(fatal[0].rule_id.is_none());
    assert!(fatal[0].message.starts_with("Parsing error"));
    assert_ordered(&diagnostics);
}

#[test]
fn test_fragments_round_trip_to_document_lines() {
    let text = load_fixture("html/shared_scope.html");
    let is_javascript = |_: &str| true;
    let extraction = extract(
        &text,
        &ExtractOptions {
            indent: None,
            xml: false,
            report_bad_indent: false,
            is_javascript: &is_javascript,
        },
    );
    assert_eq!(extraction.fragments.len(), 2);

    for fragment in &extraction.fragments {
        let lines = LineIndex::new(fragment.text());
        for line in 1..=lines.line_count() {
            let Some((start, end)) = lines.line_range(line) else {
                continue;
            };
            if start == end {
                continue;
            }
            let content: String = fragment
                .text()
                .chars()
                .skip(start)
                .take(end - start)
                .collect();
            let mapped = fragment
                .original_location(Location::new(line, 1))
                .unwrap();
            let original = fragment.original_line(mapped.line).unwrap();
            assert!(original.contains(&content), "{original:?} / {content:?}");
        }
    }
}

/// Reports one diagnostic past the end of the text and one at its start
struct OutOfRange;

impl Verifier for OutOfRange {
    fn verify(&mut self, request: &VerifyRequest<'_>) -> VerifyOutcome {
        VerifyOutcome {
            diagnostics: vec![
                Diagnostic::new(Some("probe"), Severity::Warn, "nowhere", 1000, 1),
                Diagnostic::new(Some("probe"), Severity::Warn, request.text.trim(), 1, 1),
            ],
            observation: None,
        }
    }
}

#[test]
fn test_unmappable_diagnostics_are_dropped() {
    let settings = Settings::default();
    let analysis = AnalysisConfig::default();
    let location = LocationContext::file("page.html");
    let config = DocumentConfig::new(&settings, &analysis, &location);

    let diagnostics = analyze_document(
        "<script>one</script>\n<script>two</script>",
        &config,
        &mut OutOfRange,
    );
    assert_eq!(
        summary(&diagnostics),
        vec!["1:9 one (probe)", "2:9 two (probe)"]
    );
}

#[test]
fn test_linter_adapter() {
    let mut linter = Linter::from_settings(Settings::default()).unwrap();
    let analysis = AnalysisConfig::default();
    let location = LocationContext::file("index.html");

    let diagnostics = linter.verify("<script>debugger;</script>", &analysis, &location);
    assert_eq!(
        summary(&diagnostics),
        vec!["1:9 Unexpected 'debugger' statement. (no-debugger)"]
    );

    let mut settings = linter.settings().clone();
    settings.html_extensions = vec![".tpl".to_string()];
    linter.set_settings(settings);
    assert_eq!(linter.settings().html_extensions, vec![".tpl"]);

    let template = LocationContext::file("index.tpl");
    let diagnostics = linter.verify("<p></p>
<script>debugger;</script>", &analysis, &template);
    assert_eq!(
        summary(&diagnostics),
        vec!["2:9 Unexpected 'debugger' statement. (no-debugger)"]
    );
}

#[test]
fn test_unknown_host_is_reported() {
    let settings = Settings::from_value(json!({ "host": "eslint" })).unwrap();
    let Err(err) = Linter::from_settings(settings) else {
        panic!("expected an error");
    };
    match err {
        Error::HostUnavailable { requested, report } => {
            assert_eq!(requested, "eslint");
            assert!(report.contains("Available hosts: tree-sitter"));
        }
        other => panic!("expected HostUnavailable, got {other}"),
    }
}
