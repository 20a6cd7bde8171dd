//! Terminal rendering of translation warnings.
//!
//! Every warning is rendered with its severity, location and suggested fix,
//! so a user can act on it without reading the translator's source.

use std::fmt;

use crate::core::warning::{Severity, TranslationWarning};

/// Common suggestion messages attached by importers.
pub mod suggestions {
    /// Generator expression that could not be evaluated.
    pub const GENERATOR_EXPRESSION: &str =
        "Move the configuration-dependent part into a separate target or set it after export";

    /// Missing included file.
    pub const MISSING_INCLUDE: &str = "Check that the included path exists relative to its parent";

    /// Include chain too deep.
    pub const INCLUDE_DEPTH: &str =
        "Raise `max_include_depth` under `[translate]` in .harbour/config.toml";

    /// Target kind a format cannot express.
    pub const UNSUPPORTED_KIND: &str =
        "Review the exported target and adjust it by hand if needed";
}

/// A warning prepared for terminal output.
#[derive(Debug, Clone)]
pub struct Diagnostic<'a> {
    warning: &'a TranslationWarning,
}

impl<'a> Diagnostic<'a> {
    pub fn new(warning: &'a TranslationWarning) -> Self {
        Diagnostic { warning }
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.warning.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Info => "\x1b[1;36mnote\x1b[0m",
            }
        } else {
            match self.warning.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "note",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.warning.message));

        if let Some(ref location) = self.warning.location {
            output.push_str(&format!("  --> {}\n", location));
        }

        if let Some(ref suggestion) = self.warning.suggestion {
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: {}\n", help_prefix, suggestion));
        }

        output
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print warnings to stderr.
///
/// Info-level notes are only shown when `verbose` is set.
pub fn emit_warnings(warnings: &[TranslationWarning], verbose: bool, color: bool) {
    for warning in warnings {
        if warning.severity == Severity::Info && !verbose {
            continue;
        }
        eprint!("{}", Diagnostic::new(warning).format(color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let warning = TranslationWarning::warning("generator expression dropped")
            .with_location("CMakeLists.txt", Some(7))
            .with_suggestion(suggestions::GENERATOR_EXPRESSION);

        let output = Diagnostic::new(&warning).format(false);
        assert!(output.starts_with("warning: generator expression dropped\n"));
        assert!(output.contains("  --> CMakeLists.txt:7\n"));
        assert!(output.contains("help: Move the configuration-dependent part"));
    }

    #[test]
    fn test_diagnostic_colored() {
        let warning = TranslationWarning::error("broken");
        let output = Diagnostic::new(&warning).format(true);
        assert!(output.contains("\x1b[1;31merror\x1b[0m"));
    }

    #[test]
    fn test_info_renders_as_note() {
        let warning = TranslationWarning::info("unsupported command `add_custom_command`");
        assert!(Diagnostic::new(&warning).to_string().starts_with("note: "));
    }
}
