//! Common test utilities and helpers

use embedded_script_lint::config::Settings;
use embedded_script_lint::host::TreeSitterVerifier;
use embedded_script_lint::linter::{analyze_document, AnalysisConfig, DocumentConfig, LocationContext};
use embedded_script_lint::syntax::Diagnostic;
use std::path::{Path, PathBuf};

/// Path of a file in the fixtures directory
#[allow(dead_code)]
pub fn fixture_path(relative_path: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative_path)
}

/// Load a fixture file from the fixtures directory
#[allow(dead_code)]
pub fn load_fixture(relative_path: &str) -> String {
    let fixture_path = fixture_path(relative_path);
    std::fs::read_to_string(&fixture_path)
        .unwrap_or_else(|e| panic!("Failed to load fixture {fixture_path:?}: {e}"))
}

/// Lint `text` as if it were stored under `filename`, with the tree-sitter host
#[allow(dead_code)]
pub fn lint(
    filename: &str,
    text: &str,
    settings: &Settings,
    analysis: &AnalysisConfig,
) -> Vec<Diagnostic> {
    let location = LocationContext::file(filename);
    let config = DocumentConfig::new(settings, analysis, &location);
    analyze_document(text, &config, &mut TreeSitterVerifier::new())
}

/// Lint a fixture with default settings
#[allow(dead_code)]
pub fn lint_fixture(relative_path: &str) -> Vec<Diagnostic> {
    lint(
        relative_path,
        &load_fixture(relative_path),
        &Settings::default(),
        &AnalysisConfig::default(),
    )
}

/// `line:column message (rule)` of every diagnostic
#[allow(dead_code)]
pub fn summary(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(ToString::to_string).collect()
}

/// Diagnostics are ordered by line, then column
#[allow(dead_code)]
pub fn assert_ordered(diagnostics: &[Diagnostic]) {
    for pair in diagnostics.windows(2) {
        assert!(
            (pair[0].line, pair[0].column) <= (pair[1].line, pair[1].column),
            "{} before {}",
            pair[0],
            pair[1]
        );
    }
}
