//! Document analysis entry points and the verify contract.
//!
//! The analysis engine is reached only through [`Verifier`]. A verifier
//! receives plain text and returns diagnostics in that text's coordinates;
//! everything about markup, fragments and positions stays on this side.

use crate::config::Settings;
use crate::extract::{extract, ExtractOptions};
use crate::host::TreeSitterVerifier;
use crate::remap::{remap_diagnostics, sort_diagnostics};
use crate::scope::{verify_fragments, ScopeObservation, ScopePass};
use crate::syntax::{Diagnostic, Error, Mode, Result, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Rule id of bad-indentation diagnostics
pub const BAD_INDENT_RULE: &str = "(html plugin)";

/// Hosts that [`locate_host`] knows how to attach
pub const KNOWN_HOSTS: &[&str] = &["tree-sitter"];

/// How top-level declarations are scoped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Fragments share one global scope
    #[default]
    Script,
    /// Every fragment is its own module
    Module,
}

/// Grammar used to parse fragment text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    #[default]
    JavaScript,
    TypeScript,
}

/// Configuration handed to the verifier with every call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Enabled rules by id
    pub rules: BTreeMap<String, Severity>,
    /// Extra names that are always defined
    pub globals: BTreeSet<String>,
    /// Predefine browser globals (`window`, `document`, …)
    pub browser: bool,
    pub source_type: SourceType,
    pub parser: ParserKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let rules = [
            ("no-undef", Severity::Error),
            ("no-unused-vars", Severity::Warn),
            ("no-debugger", Severity::Error),
        ]
        .into_iter()
        .map(|(id, severity)| (id.to_string(), severity))
        .collect();

        Self {
            rules,
            globals: BTreeSet::new(),
            browser: true,
            source_type: SourceType::Script,
            parser: ParserKind::JavaScript,
        }
    }
}

impl AnalysisConfig {
    /// Same configuration with every rule disabled
    #[must_use]
    pub fn muted(&self) -> Self {
        Self {
            rules: BTreeMap::new(),
            ..self.clone()
        }
    }

    /// Configured severity of a rule, `Off` when absent
    #[must_use]
    pub fn severity(&self, rule: &str) -> Severity {
        self.rules.get(rule).copied().unwrap_or_default()
    }
}

/// Where the analysed text comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationContext {
    pub filename: Option<PathBuf>,
}

impl LocationContext {
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            filename: Some(path.into()),
        }
    }
}

/// One call into the analysis host
#[derive(Debug)]
pub struct VerifyRequest<'a> {
    pub text: &'a str,
    pub config: &'a AnalysisConfig,
    pub location: &'a LocationContext,
    /// Keep host-side state between calls
    pub preserve_state: bool,
    pub scope: &'a ScopePass,
}

/// Answer of the analysis host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// Diagnostics in the coordinates of the verified text
    pub diagnostics: Vec<Diagnostic>,
    /// Present when the request asked for [`ScopePass::Observe`]
    pub observation: Option<ScopeObservation>,
}

/// The external analysis capability
///
/// Calls are blocking and never overlap.
pub trait Verifier {
    fn verify(&mut self, request: &VerifyRequest<'_>) -> VerifyOutcome;
}

impl<V: Verifier + ?Sized> Verifier for Box<V> {
    fn verify(&mut self, request: &VerifyRequest<'_>) -> VerifyOutcome {
        (**self).verify(request)
    }
}

/// Everything [`analyze_document`] needs besides the text
#[derive(Debug, Clone, Copy)]
pub struct DocumentConfig<'a> {
    pub settings: &'a Settings,
    pub analysis: &'a AnalysisConfig,
    pub location: &'a LocationContext,
    /// Markup flavor; derived from the file name when `None`
    pub mode: Option<Mode>,
    pub preserve_state: bool,
}

impl<'a> DocumentConfig<'a> {
    #[must_use]
    pub fn new(
        settings: &'a Settings,
        analysis: &'a AnalysisConfig,
        location: &'a LocationContext,
    ) -> Self {
        Self {
            settings,
            analysis,
            location,
            mode: None,
            preserve_state: false,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    fn resolved_mode(&self) -> Option<Mode> {
        self.mode.or_else(|| {
            self.location
                .filename
                .as_deref()
                .and_then(|path| self.settings.mode_for_path(path))
        })
    }
}

/// Analyse a markup document and report diagnostics in document coordinates
///
/// Documents whose mode cannot be determined are verified as a whole and
/// their diagnostics returned untouched.
pub fn analyze_document<V: Verifier + ?Sized>(
    text: &str,
    config: &DocumentConfig<'_>,
    verifier: &mut V,
) -> Vec<Diagnostic> {
    let settings = config.settings;

    let Some(mode) = config.resolved_mode() else {
        let request = VerifyRequest {
            text,
            config: config.analysis,
            location: config.location,
            preserve_state: config.preserve_state,
            scope: &ScopePass::Standalone,
        };
        return verifier.verify(&request).diagnostics;
    };

    let is_javascript = |mime: &str| settings.is_javascript_mime_type(mime);
    let extraction = extract(
        text,
        &ExtractOptions {
            indent: settings.indent.as_ref(),
            xml: mode == Mode::Xml,
            report_bad_indent: settings.report_bad_indent.is_enabled(),
            is_javascript: &is_javascript,
        },
    );

    let mut diagnostics: Vec<Diagnostic> = extraction
        .bad_indentation_lines
        .iter()
        .map(|&line| {
            Diagnostic::new(
                Some(BAD_INDENT_RULE),
                settings.report_bad_indent,
                "Bad line indentation.",
                line,
                1,
            )
        })
        .collect();

    let raw = verify_fragments(
        &extraction.fragments,
        config.analysis,
        config.location,
        config.preserve_state,
        verifier,
    );

    for (fragment, fragment_diagnostics) in extraction.fragments.iter().zip(raw) {
        diagnostics.extend(remap_diagnostics(
            fragment_diagnostics,
            fragment,
            extraction.has_bom,
        ));
    }

    sort_diagnostics(&mut diagnostics);
    diagnostics
}

/// Explicit adapter between a verifier and the document pipeline
///
/// Owns its verifier; create as many as needed, nothing is shared.
#[derive(Debug)]
pub struct Linter<V> {
    verifier: V,
    settings: Settings,
}

impl<V: Verifier> Linter<V> {
    #[must_use]
    pub fn new(verifier: V, settings: Settings) -> Self {
        Self { verifier, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Verify a document, extracting scripts when its file name is a markup file
    pub fn verify(
        &mut self,
        text: &str,
        analysis: &AnalysisConfig,
        location: &LocationContext,
    ) -> Vec<Diagnostic> {
        let config = DocumentConfig::new(&self.settings, analysis, location);
        analyze_document(text, &config, &mut self.verifier)
    }
}

impl Linter<Box<dyn Verifier + Send + Sync>> {
    /// Attach the host named in the settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostUnavailable`] when the host is unknown.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let verifier = locate_host(&settings.host)?;
        Ok(Self::new(verifier, settings))
    }
}

/// Find the analysis host registered under `name`
///
/// # Errors
///
/// Returns [`Error::HostUnavailable`] with an environment report when no
/// such host exists.
pub fn locate_host(name: &str) -> Result<Box<dyn Verifier + Send + Sync>> {
    match name {
        "tree-sitter" => Ok(Box::new(TreeSitterVerifier::new())),
        _ => {
            tracing::error!(host = name, "analysis host unavailable");
            Err(Error::HostUnavailable {
                requested: name.to_string(),
                report: environment_report(name),
            })
        }
    }
}

fn environment_report(name: &str) -> String {
    let executable = std::env::current_exe()
        .map_or_else(|_| "(unknown)".to_string(), |p| p.display().to_string());
    let args: Vec<String> = std::env::args().collect();

    format!(
        "If you think this is a bug, please file a report and include *all* of this information:

* Requested host: {name}
* Available hosts: {hosts}
* embedded-script-lint version: {version}
* Executable: {executable}
* Arguments: {args:?}
* How did you run the linter (from the command line? from an editor?)
",
        hosts = KNOWN_HOSTS.join(", "),
        version = env!("CARGO_PKG_VERSION"),
    )
}
