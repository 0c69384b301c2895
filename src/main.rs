#![warn(clippy::all, clippy::pedantic)]

use dashmap::DashMap;
use embedded_script_lint::capabilities::{self, code_actions, diagnostics};
use embedded_script_lint::config::{load_configuration, ServerConfig};
use embedded_script_lint::file_processor;
use embedded_script_lint::initialization::spawn_background_scan;
use embedded_script_lint::linter::locate_host;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::{
    CodeActionParams, CodeActionResponse, DidChangeConfigurationParams,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, InitializeParams, InitializeResult, InitializedParams,
    MessageType, ServerInfo, Uri,
};
use tower_lsp_server::{Client, LanguageServer, LspService, Server};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug)]
struct Backend {
    client: Client,
    /// Open documents by URI, full text
    documents: DashMap<Uri, String>,
    config: Arc<ServerConfig>,
    workspace_root: OnceCell<PathBuf>,
    /// Set once the host lookup failed and the user was told
    host_failed: AtomicBool,
}

impl Backend {
    fn new(client: Client) -> Self {
        Self {
            client,
            documents: DashMap::new(),
            config: Arc::new(ServerConfig::default()),
            workspace_root: OnceCell::new(),
            host_failed: AtomicBool::new(false),
        }
    }

    async fn lint_and_publish(&self, uri: Uri, text: &str) {
        let Some(path) = uri.to_file_path().map(std::borrow::Cow::into_owned) else {
            return;
        };

        let (settings, analysis) = self.config.snapshot();
        let mut verifier = match locate_host(&settings.host) {
            Ok(verifier) => verifier,
            Err(e) => {
                if !self.host_failed.swap(true, Ordering::Relaxed) {
                    self.client.show_message(MessageType::ERROR, e.to_string()).await;
                }
                return;
            }
        };

        let Some(found) =
            file_processor::lint_content(&path, text, &settings, &analysis, &mut verifier)
        else {
            return;
        };

        self.log_dev_info(&format!(
            "🔄 {} problems in {:?}",
            found.len(),
            path.file_name().unwrap_or_default()
        ))
        .await;

        let published = diagnostics::compute_document_diagnostics(text, &found);
        self.client.publish_diagnostics(uri, published, None).await;
    }

    async fn relint_open_documents(&self) {
        let open: Vec<(Uri, String)> = self
            .documents
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (uri, text) in open {
            self.lint_and_publish(uri, &text).await;
        }
    }

    async fn log_dev_info(&self, message: &str) {
        if self.config.is_developer_mode() {
            self.client.log_message(MessageType::INFO, message).await;
        }
    }
}

impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        #[allow(deprecated)]
        let legacy_root = params.root_uri.as_ref().and_then(|uri| uri.to_file_path());

        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|folder| folder.uri.to_file_path())
            .or(legacy_root)
            .map(std::borrow::Cow::into_owned);

        if let Some(root) = root {
            let _ = self.workspace_root.set(root);
        }

        Ok(InitializeResult {
            capabilities: capabilities::build_server_capabilities(),
            server_info: Some(ServerInfo {
                name: "embedded-script-lint".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        load_configuration(&self.client, &self.config).await;

        let (settings, _) = self.config.snapshot();
        if let Err(e) = locate_host(&settings.host) {
            self.host_failed.store(true, Ordering::Relaxed);
            self.client.show_message(MessageType::ERROR, e.to_string()).await;
            return;
        }

        if let Some(root) = self.workspace_root.get() {
            spawn_background_scan(root.clone(), self.client.clone(), self.config.clone());
        }
    }

    async fn did_change_configuration(&self, _: DidChangeConfigurationParams) {
        load_configuration(&self.client, &self.config).await;
        self.host_failed.store(false, Ordering::Relaxed);
        self.relint_open_documents().await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        self.documents.insert(uri.clone(), text.clone());
        self.lint_and_publish(uri, &text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change holds the whole document
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let uri = params.text_document.uri;
        self.documents.insert(uri.clone(), change.text.clone());
        self.lint_and_publish(uri, &change.text).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = match params.text {
            Some(text) => text,
            None => match self.documents.get(&uri) {
                Some(entry) => entry.value().clone(),
                None => return,
            },
        };
        self.lint_and_publish(uri, &text).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.remove(&params.text_document.uri);
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let Some(text) = self
            .documents
            .get(&params.text_document.uri)
            .map(|entry| entry.value().clone())
        else {
            return Ok(None);
        };

        Ok(code_actions::handle_code_action(&params, &text))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the protocol, logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .with(EnvFilter::from_default_env())
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);

    Server::new(stdin, stdout, socket).serve(service).await;
}
