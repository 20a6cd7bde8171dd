//! Translation error types.
//!
//! Only failures that stop a translation live here. Everything recoverable is
//! a [`TranslationWarning`] on the project instead.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::format::BuildFormat;
use crate::core::warning::TranslationWarning;

/// Which way a format was being used when it turned out to be unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Import,
    Export,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Import => f.write_str("import"),
            Direction::Export => f.write_str("export"),
        }
    }
}

/// Error during import, export or format detection.
#[derive(Debug, Error, Diagnostic)]
pub enum TranslateError {
    #[error("could not detect the build format of `{}`", path.display())]
    #[diagnostic(
        code(harbour::translate::detect),
        help("Pass the format explicitly with `--from`/`--to`")
    )]
    FormatDetection { path: PathBuf },

    #[error("build file not found: `{}`", path.display())]
    #[diagnostic(code(harbour::translate::not_found))]
    SourceNotFound { path: PathBuf },

    #[error("{}{}: {message}", path.display(), line.map(|l| format!(":{}", l)).unwrap_or_default())]
    #[diagnostic(code(harbour::translate::parse))]
    Parse {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    #[error("{format} does not support {direction}")]
    #[diagnostic(code(harbour::translate::unsupported))]
    UnsupportedDirection {
        format: BuildFormat,
        direction: Direction,
    },

    #[error("strict mode: {} error(s) reported during translation", warnings.iter().filter(|w| w.is_error()).count())]
    #[diagnostic(
        code(harbour::translate::strict),
        help("Fix the reported errors or run without `--strict`")
    )]
    StrictModeViolation { warnings: Vec<TranslationWarning> },

    #[error("failed to access `{}`", path.display())]
    #[diagnostic(code(harbour::translate::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest `{}`: {message}", path.display())]
    #[diagnostic(code(harbour::translate::manifest))]
    Manifest { path: PathBuf, message: String },

    #[error("failed to render {format}: {message}")]
    #[diagnostic(code(harbour::translate::render))]
    Render { format: BuildFormat, message: String },
}

impl TranslateError {
    /// Shorthand for a parse error.
    pub fn parse(path: impl Into<PathBuf>, line: Option<usize>, message: impl Into<String>) -> Self {
        TranslateError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Whether a recursive import may downgrade this error to a warning.
    ///
    /// Missing or malformed included files abort only their own subtree.
    pub fn is_recoverable_in_subtree(&self) -> bool {
        matches!(
            self,
            TranslateError::SourceNotFound { .. }
                | TranslateError::Parse { .. }
                | TranslateError::Manifest { .. }
        )
    }

    /// Turn this error into a warning recorded on a parent file.
    ///
    /// A file that failed to parse loses its whole subtree, so it is
    /// reported with error severity; a missing file only warns.
    pub fn to_warning(&self) -> TranslationWarning {
        match self {
            TranslateError::SourceNotFound { path } => TranslationWarning::warning(self.to_string())
                .with_location(path.clone(), None)
                .with_suggestion("Check that the included path exists relative to its parent"),
            TranslateError::Parse { path, line, .. } => {
                TranslationWarning::error(self.to_string()).with_location(path.clone(), *line)
            }
            _ => TranslationWarning::error(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = TranslateError::parse("CMakeLists.txt", Some(3), "unbalanced parentheses");
        assert_eq!(err.to_string(), "CMakeLists.txt:3: unbalanced parentheses");
        assert!(err.is_recoverable_in_subtree());
    }

    #[test]
    fn test_strict_mode_message_counts_errors() {
        let err = TranslateError::StrictModeViolation {
            warnings: vec![
                TranslationWarning::error("a"),
                TranslationWarning::warning("b"),
                TranslationWarning::error("c"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "strict mode: 2 error(s) reported during translation"
        );
        assert!(!err.is_recoverable_in_subtree());
    }

    #[test]
    fn test_to_warning_keeps_location() {
        let err = TranslateError::SourceNotFound {
            path: PathBuf::from("sub/CMakeLists.txt"),
        };
        let warning = err.to_warning();
        assert!(!warning.is_error());
        assert_eq!(
            warning.location.map(|l| l.path),
            Some(PathBuf::from("sub/CMakeLists.txt"))
        );

        let err = TranslateError::parse("sub/meson.build", Some(4), "unclosed `(`");
        assert!(err.to_warning().is_error());
    }
}
