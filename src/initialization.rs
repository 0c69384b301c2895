//! Server initialization and background workspace linting

use crate::capabilities::diagnostics::compute_document_diagnostics;
use crate::config::{ServerConfig, Settings};
use crate::file_processor::{self, LintedFile};
use crate::linter::{locate_host, AnalysisConfig};
use crate::scanner::scan_workspace_files;
use crate::syntax::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_lsp_server::ls_types::{MessageType, Uri};
use tower_lsp_server::Client;

/// Lint every markup document below `root`
///
/// Unreadable files are skipped.
///
/// # Errors
///
/// Returns [`crate::syntax::Error::HostUnavailable`] when the configured
/// host cannot be attached.
pub fn lint_workspace(
    root: &Path,
    settings: &Settings,
    analysis: &AnalysisConfig,
) -> Result<Vec<LintedFile>> {
    let mut verifier = locate_host(&settings.host)?;
    let mut linted = Vec::new();

    for path in scan_workspace_files(root, settings) {
        match file_processor::lint_file(&path, settings, analysis, &mut verifier) {
            Ok(Some(file)) => linted.push(file),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "skipping file"),
        }
    }

    Ok(linted)
}

/// Spawn background linting of the whole workspace
pub fn spawn_background_scan(root: PathBuf, client: Client, config: Arc<ServerConfig>) {
    tokio::spawn(async move {
        client
            .log_message(MessageType::INFO, "🚀 Starting background lint...")
            .await;

        let (settings, analysis) = config.snapshot();
        let result =
            tokio::task::spawn_blocking(move || lint_workspace(&root, &settings, &analysis)).await;

        let linted = match result {
            Ok(Ok(linted)) => linted,
            Ok(Err(e)) => {
                client.show_message(MessageType::ERROR, e.to_string()).await;
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "background lint task failed");
                return;
            }
        };

        // Publish diagnostics for all linted files
        let mut problems = 0;
        for file in &linted {
            problems += file.diagnostics.len();
            if let Some(uri) = Uri::from_file_path(&file.path) {
                let diagnostics = compute_document_diagnostics(&file.content, &file.diagnostics);
                client.publish_diagnostics(uri, diagnostics, None).await;
            }
        }

        if config.is_developer_mode() {
            client
                .log_message(
                    MessageType::INFO,
                    format!("📊 {} files linted, {problems} problems", linted.len()),
                )
                .await;
        }

        client
            .log_message(MessageType::INFO, "🏁 Workspace lint complete".to_string())
            .await;
    });
}
