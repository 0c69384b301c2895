//! Plugin settings and configuration loading for the LSP server

use crate::linter::AnalysisConfig;
use crate::syntax::{Error, Mode, Result, Severity};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tower_lsp_server::ls_types::{ConfigurationItem, MessageType};
use tower_lsp_server::Client;

const DEFAULT_HTML_EXTENSIONS: &[&str] = &[
    ".erb",
    ".handlebars",
    ".hbs",
    ".htm",
    ".html",
    ".mustache",
    ".nunjucks",
    ".php",
    ".tag",
    ".twig",
    ".we",
];

const DEFAULT_XML_EXTENSIONS: &[&str] = &[".xhtml", ".xml"];

/// Name of the analysis host used when none is configured
pub const DEFAULT_HOST: &str = "tree-sitter";

/// Expected indentation of script content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentDescriptor {
    /// Relative to the indentation of the `<script>` tag line
    pub relative: bool,
    pub spaces: String,
}

impl IndentDescriptor {
    /// Parse `"<n>"`, `"tab"`, `"+<n>"` or `"+tab"`
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (relative, rest) = match value.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, value),
        };

        let spaces = if rest == "tab" {
            "\t".to_string()
        } else if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            " ".repeat(rest.parse().ok()?)
        } else {
            return None;
        };

        Some(Self { relative, spaces })
    }
}

/// Raw settings as found in configuration files
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RawSettings {
    indent: Option<serde_json::Value>,
    report_bad_indent: Option<serde_json::Value>,
    html_extensions: Option<Vec<String>>,
    xml_extensions: Option<Vec<String>>,
    javascript_mime_types: Option<Vec<String>>,
    host: Option<String>,
}

/// Validated plugin settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `None` means "use the indentation of the first code line"
    pub indent: Option<IndentDescriptor>,
    pub report_bad_indent: Severity,
    pub html_extensions: Vec<String>,
    pub xml_extensions: Vec<String>,
    /// Accepted `type` values; `None` keeps the built-in JavaScript ones
    pub javascript_mime_types: Option<Vec<String>>,
    pub host: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indent: None,
            report_bad_indent: Severity::Off,
            html_extensions: DEFAULT_HTML_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            xml_extensions: DEFAULT_XML_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            javascript_mime_types: None,
            host: DEFAULT_HOST.to_string(),
        }
    }
}

impl Settings {
    /// Build settings from a JSON object
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] when `report-bad-indent` is not one of
    /// `0, 1, 2, "off", "warn", "error"` (booleans are accepted as off/warn),
    /// or when the object itself is malformed.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }

        let raw: RawSettings =
            serde_json::from_value(value).map_err(|e| Error::InvalidSetting {
                key: "settings",
                message: e.to_string(),
            })?;

        let defaults = Self::default();

        let report_bad_indent = match &raw.report_bad_indent {
            None => Severity::Off,
            Some(value) => Severity::from_value(value).ok_or_else(|| Error::InvalidSetting {
                key: "report-bad-indent",
                message: format!(
                    "{value}, expected one of 0, 1, 2, \"off\", \"warn\" or \"error\""
                ),
            })?,
        };

        let indent = match &raw.indent {
            Some(serde_json::Value::String(s)) => IndentDescriptor::parse(s),
            Some(serde_json::Value::Number(n)) => IndentDescriptor::parse(&n.to_string()),
            _ => None,
        };

        Ok(Self {
            indent,
            report_bad_indent,
            html_extensions: raw.html_extensions.unwrap_or(defaults.html_extensions),
            xml_extensions: raw.xml_extensions.unwrap_or(defaults.xml_extensions),
            javascript_mime_types: raw.javascript_mime_types,
            host: raw.host.unwrap_or(defaults.host),
        })
    }

    /// Markup flavor for a file, from its extension
    #[must_use]
    pub fn mode_for_path(&self, path: &Path) -> Option<Mode> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        let dotted = format!(".{ext}");

        if self.html_extensions.iter().any(|e| *e == dotted) {
            Some(Mode::Html)
        } else if self.xml_extensions.iter().any(|e| *e == dotted) {
            Some(Mode::Xml)
        } else {
            None
        }
    }

    /// Whether a `<script type="…">` value denotes JavaScript
    #[must_use]
    pub fn is_javascript_mime_type(&self, mime: &str) -> bool {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match &self.javascript_mime_types {
            Some(types) => types.iter().any(|t| t.trim().eq_ignore_ascii_case(&essence)),
            None => is_builtin_javascript_type(&essence),
        }
    }
}

/// `(text|application)/(x-)?(javascript|babel|ecmascript-6)` or `module`
fn is_builtin_javascript_type(essence: &str) -> bool {
    if essence == "module" {
        return true;
    }

    let Some(subtype) = essence
        .strip_prefix("text/")
        .or_else(|| essence.strip_prefix("application/"))
    else {
        return false;
    };

    let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
    matches!(subtype, "javascript" | "babel" | "ecmascript-6")
}

/// Configuration shared between LSP handlers
#[derive(Debug, Default)]
pub struct ServerConfig {
    pub settings: RwLock<Settings>,
    pub analysis: RwLock<AnalysisConfig>,
    pub developer_mode: AtomicBool,
}

impl ServerConfig {
    /// Copy of the current settings and analysis configuration
    #[must_use]
    pub fn snapshot(&self) -> (Settings, AnalysisConfig) {
        let settings = self.settings.read().map(|s| s.clone()).unwrap_or_default();
        let analysis = self.analysis.read().map(|a| a.clone()).unwrap_or_default();
        (settings, analysis)
    }

    #[must_use]
    pub fn is_developer_mode(&self) -> bool {
        self.developer_mode.load(Ordering::Relaxed)
    }
}

/// Load and apply configuration settings from the client
pub async fn load_configuration(client: &Client, config: &Arc<ServerConfig>) {
    let items = vec![
        ConfigurationItem {
            scope_uri: None,
            section: Some("embeddedScriptLint.developerMode".to_string()),
        },
        ConfigurationItem {
            scope_uri: None,
            section: Some("embeddedScriptLint.settings".to_string()),
        },
        ConfigurationItem {
            scope_uri: None,
            section: Some("embeddedScriptLint.analysis".to_string()),
        },
    ];

    let Ok(response) = client.configuration(items).await else {
        return;
    };

    let mut iter = response.into_iter();

    // Handle developerMode
    if let Some(value) = iter.next() {
        if let Some(is_enabled) = value.as_bool() {
            config.developer_mode.store(is_enabled, Ordering::Relaxed);

            client
                .log_message(
                    MessageType::INFO,
                    format!("Developer Mode initialized to: {is_enabled}"),
                )
                .await;
        }
    }

    // Handle plugin settings
    if let Some(value) = iter.next() {
        match Settings::from_value(value) {
            Ok(settings) => {
                tracing::debug!(?settings, "settings loaded");
                if let Ok(mut current) = config.settings.write() {
                    *current = settings;
                }
            }
            Err(e) => {
                client
                    .log_message(MessageType::ERROR, format!("❌ {e}"))
                    .await;
            }
        }
    }

    // Handle analysis configuration
    if let Some(value) = iter.next() {
        if value.is_null() {
            return;
        }
        match serde_json::from_value::<AnalysisConfig>(value) {
            Ok(analysis) => {
                if let Ok(mut current) = config.analysis.write() {
                    *current = analysis;
                }
            }
            Err(e) => {
                client
                    .log_message(
                        MessageType::ERROR,
                        format!("❌ Invalid analysis configuration: {e}"),
                    )
                    .await;
            }
        }
    }
}
