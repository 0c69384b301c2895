//! File processing utilities

use crate::config::Settings;
use crate::linter::{analyze_document, AnalysisConfig, DocumentConfig, LocationContext, Verifier};
use crate::syntax::{Diagnostic, Error, Result};
use std::path::{Path, PathBuf};

/// A file read from disk with its diagnostics
#[derive(Debug, Clone)]
pub struct LintedFile {
    pub path: PathBuf,
    pub content: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Check if the file is an HTML or XML document under `settings`
#[must_use]
pub fn is_supported_file(path: &Path, settings: &Settings) -> bool {
    settings.mode_for_path(path).is_some()
}

/// Lint file content from editor buffer
///
/// Returns `None` for files that are not markup documents.
pub fn lint_content<V: Verifier + ?Sized>(
    path: &Path,
    content: &str,
    settings: &Settings,
    analysis: &AnalysisConfig,
    verifier: &mut V,
) -> Option<Vec<Diagnostic>> {
    if !is_supported_file(path, settings) {
        return None;
    }

    let location = LocationContext::file(path);
    let config = DocumentConfig::new(settings, analysis, &location);
    let diagnostics = analyze_document(content, &config, verifier);

    tracing::debug!(path = %path.display(), count = diagnostics.len(), "file linted");
    Some(diagnostics)
}

/// Lint file from disk
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read.
pub fn lint_file<V: Verifier + ?Sized>(
    path: &Path,
    settings: &Settings,
    analysis: &AnalysisConfig,
    verifier: &mut V,
) -> Result<Option<LintedFile>> {
    if !is_supported_file(path, settings) {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(
        lint_content(path, &content, settings, analysis, verifier).map(|diagnostics| LintedFile {
            path: path.to_path_buf(),
            content,
            diagnostics,
        }),
    )
}
