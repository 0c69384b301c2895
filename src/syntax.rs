//! Core types shared by the extractor, the scope resolver and the remapper.
//!
//! A [`Diagnostic`] is produced by a verifier against fragment-local
//! coordinates and rewritten in place into document coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Markup flavor of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// HTML-like markup (case-insensitive tags, raw-text `<script>`)
    Html,
    /// XML-like markup (case-sensitive tags, CDATA sections)
    Xml,
}

/// Severity of a diagnostic or a configured rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Off,
    Warn,
    Error,
}

impl Severity {
    /// Parse the `0 | 1 | 2 | "off" | "warn" | "error" | bool` forms
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(false) => Some(Self::Off),
            serde_json::Value::Bool(true) => Some(Self::Warn),
            serde_json::Value::Number(n) => match n.as_u64()? {
                0 => Some(Self::Off),
                1 => Some(Self::Warn),
                2 => Some(Self::Error),
                _ => None,
            },
            serde_json::Value::String(s) => match s.as_str() {
                "off" => Some(Self::Off),
                "warn" => Some(Self::Warn),
                "error" => Some(Self::Error),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != Self::Off
    }

    /// Numeric level as reported to callers (0, 1 or 2)
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Warn => 1,
            Self::Error => 2,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid severity {value}, expected one of 0, 1, 2, \"off\", \"warn\" or \"error\""
            ))
        })
    }
}

/// Replacement of the `[start, end)` character range by `text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub range: (usize, usize),
    pub text: String,
}

/// A single reported issue
///
/// Lines and columns are 1-based and counted in characters. Before
/// remapping they are relative to a fragment, afterwards to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
    pub message: String,
    pub rule_id: Option<String>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
    /// Text of the reported document line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        rule_id: Option<&str>,
        severity: Severity,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            line,
            column,
            end_line: None,
            end_column: None,
            message: message.into(),
            rule_id: rule_id.map(str::to_string),
            severity,
            fatal: false,
            source: None,
            fix: None,
        }
    }

    #[must_use]
    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    #[must_use]
    pub fn with_fix(mut self, start: usize, end: usize, text: impl Into<String>) -> Self {
        self.fix = Some(Fix {
            range: (start, end),
            text: text.into(),
        });
        self
    }

    #[must_use]
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.line, self.column, self.message)?;
        if let Some(rule) = &self.rule_id {
            write!(f, " ({rule})")?;
        }
        Ok(())
    }
}

/// Crate-level errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A plugin setting has a value outside its accepted set
    #[error("invalid value for {key}: {message}")]
    InvalidSetting { key: &'static str, message: String },

    /// The analysis host cannot be located or attached
    #[error("embedded-script-lint error: the analysis host '{requested}' is not available.\n{report}")]
    HostUnavailable { requested: String, report: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for configuration and host lookup
pub type Result<T> = std::result::Result<T, Error>;
