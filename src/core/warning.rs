//! Translation warnings.
//!
//! Importers never abort on something they only partly understand; they
//! record a warning and carry on. Warnings keep arrival order and are never
//! deduplicated.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity level for translation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Where in a source file a warning originates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: Option<usize>,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: Option<usize>) -> Self {
        SourceLocation {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path.display(), line),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// A non-fatal problem found while translating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationWarning {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl TranslationWarning {
    /// Create a warning with an explicit severity.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        TranslationWarning {
            severity,
            message: message.into(),
            location: None,
            suggestion: None,
        }
    }

    /// Create an informational note.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Create a warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Create an error-severity warning (fatal only in strict mode).
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Attach a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>, line: Option<usize>) -> Self {
        self.location = Some(SourceLocation::new(path, line));
        self
    }

    /// Attach a suggested fix.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Check if this warning escalates in strict mode.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for TranslationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(ref loc) = self.location {
            write!(f, " ({})", loc)?;
        }
        Ok(())
    }
}
