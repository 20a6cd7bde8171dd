//! Command implementations

pub mod convert;
pub mod detect;
pub mod export;
pub mod import;

use std::io::IsTerminal;
use std::path::Path;

use anyhow::Result;

use crate::cli::GlobalArgs;
use harbour_translate::core::TranslationWarning;
use harbour_translate::ops::{ExportReport, TranslateOptions, TranslationEngine};
use harbour_translate::util::config::{global_config_path, load_config, project_config_path};
use harbour_translate::util::Diagnostic;
use harbour_translate::TranslateError;

/// Build an engine from layered config with command-line flags on top.
///
/// `source` locates the project config: `.harbour/config.toml` next to it.
pub fn engine(global: &GlobalArgs, source: &Path, compile_commands: bool) -> TranslationEngine<'static> {
    let root = if source.is_dir() {
        source
    } else {
        source.parent().unwrap_or_else(|| Path::new("."))
    };
    let config = load_config(global_config_path().as_deref(), &project_config_path(root));

    let mut options = TranslateOptions::from(&config.translate);
    options.strict |= global.strict;
    options.verbose |= global.verbose;
    options.emit_compile_commands |= compile_commands;
    TranslationEngine::new(options)
}

/// Print translation warnings to stderr.
pub fn emit_warnings(warnings: &[TranslationWarning], global: &GlobalArgs) {
    let color = !global.no_color && std::io::stderr().is_terminal();
    for warning in warnings {
        eprint!("{}", Diagnostic::new(warning).format(color));
    }
}

/// Print the warnings of an export, including the ones that stopped it in
/// strict mode.
pub fn finish_export(
    result: Result<ExportReport, TranslateError>,
    global: &GlobalArgs,
) -> Result<ExportReport> {
    match result {
        Ok(report) => {
            emit_warnings(&report.warnings, global);
            Ok(report)
        }
        Err(TranslateError::StrictModeViolation { warnings }) => {
            emit_warnings(&warnings, global);
            Err(TranslateError::StrictModeViolation { warnings }.into())
        }
        Err(e) => Err(e.into()),
    }
}
