//! Implementation of the translation engine.
//!
//! The engine ties importers and exporters together: it resolves formats,
//! gates exports in strict mode and writes rendered files atomically.

use std::path::{Path, PathBuf};

use crate::core::error::TranslateError;
use crate::core::format::BuildFormat;
use crate::core::project::Project;
use crate::core::warning::TranslationWarning;
use crate::export::{self, compile_commands, ExportContext, GlobResolver, SourcePatternResolver};
use crate::import::{import_project, ImportOptions};
use crate::util::config::{TranslateConfig, DEFAULT_MAX_INCLUDE_DEPTH};
use crate::util::fs::{absolutize, relative_path, to_slash, write_atomic};

/// Options controlling a translation.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Refuse to export when an error-severity warning was recorded
    pub strict: bool,

    /// Report unrecognized constructs as info warnings
    pub verbose: bool,

    /// Write a compile_commands.json next to every export
    pub emit_compile_commands: bool,

    /// Maximum include/subdirectory nesting during import
    pub max_depth: usize,

    /// Compiler named in compile commands and Makefiles
    pub compiler: String,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            strict: false,
            verbose: false,
            emit_compile_commands: false,
            max_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            compiler: "c++".to_string(),
        }
    }
}

impl From<&TranslateConfig> for TranslateOptions {
    fn from(config: &TranslateConfig) -> Self {
        TranslateOptions {
            strict: config.strict(),
            verbose: config.verbose(),
            emit_compile_commands: config.emit_compile_commands(),
            max_depth: config.max_include_depth(),
            compiler: config.compiler().to_string(),
        }
    }
}

/// Result of a successful export.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Every file written, destination first
    pub written: Vec<PathBuf>,

    /// Import warnings followed by export warnings, in arrival order
    pub warnings: Vec<TranslationWarning>,
}

/// Imports and exports projects under one set of options.
pub struct TranslationEngine<'a> {
    options: TranslateOptions,
    resolver: &'a dyn SourcePatternResolver,
}

impl TranslationEngine<'static> {
    pub fn new(options: TranslateOptions) -> Self {
        TranslationEngine {
            options,
            resolver: &GlobResolver,
        }
    }
}

impl<'a> TranslationEngine<'a> {
    /// Use `resolver` to expand source patterns during export.
    pub fn with_resolver(self, resolver: &'a dyn SourcePatternResolver) -> TranslationEngine<'a> {
        TranslationEngine {
            options: self.options,
            resolver,
        }
    }

    pub fn options(&self) -> &TranslateOptions {
        &self.options
    }

    fn import_options(&self) -> ImportOptions {
        ImportOptions {
            verbose: self.options.verbose,
            max_depth: self.options.max_depth,
        }
    }

    /// Import the build file at `path` as `format`.
    ///
    /// A directory is searched for the conventional file of `format`.
    pub fn import(&self, format: BuildFormat, path: &Path) -> Result<Project, TranslateError> {
        let file = if path.is_dir() && path.extension().map_or(true, |e| e != "xcodeproj") {
            match BuildFormat::locate(path) {
                Ok((found, file)) if found == format => file,
                _ => path.join(format.default_file_name()),
            }
        } else {
            path.to_path_buf()
        };
        if !file.exists() {
            return Err(TranslateError::SourceNotFound { path: file });
        }
        import_project(format, &file, &self.import_options())
    }

    /// Detect the format of `path`, then import it.
    pub fn import_auto(&self, path: &Path) -> Result<Project, TranslateError> {
        if !path.exists() {
            return Err(TranslateError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let (format, file) = BuildFormat::locate(path)?;
        import_project(format, &file, &self.import_options())
    }

    /// Render `project` as `format` and write it to `dest`.
    ///
    /// In strict mode nothing is written when the project or the render
    /// carries an error-severity warning.
    pub fn export(
        &self,
        project: &Project,
        format: BuildFormat,
        dest: &Path,
    ) -> Result<ExportReport, TranslateError> {
        let mut warnings = project.warnings().to_vec();
        self.check_strict(&warnings)?;

        let dest = output_file(format, dest);
        let out_dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let base_dir = if format == BuildFormat::Xcode {
            out_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| out_dir.clone())
        } else {
            out_dir.clone()
        };

        let ctx = ExportContext {
            compiler: self.options.compiler.clone(),
            source_prefix: source_prefix(&base_dir, &project.source_root),
            solution: format == BuildFormat::MsBuild
                && dest.extension().is_some_and(|e| e == "sln"),
            resolver: self.resolver,
        };

        if format == BuildFormat::Native && !ctx.source_prefix.is_empty() {
            warnings.push(TranslationWarning::warning(format!(
                "manifest paths stay relative to {}",
                project.source_root.display()
            )));
        }

        let rendered = export::render(format, project, &ctx)?;
        warnings.extend(rendered.warnings);

        let mut sidecar = None;
        if self.options.emit_compile_commands && format != BuildFormat::CompileCommands {
            let commands = compile_commands::render(project, &ctx)?;
            warnings.extend(commands.warnings);
            sidecar = Some((base_dir.join("compile_commands.json"), commands.contents));
        }

        self.check_strict(&warnings)?;

        let mut written = Vec::new();
        write_atomic(&dest, &rendered.contents)?;
        written.push(dest.clone());
        for (name, contents) in &rendered.siblings {
            let path = out_dir.join(name);
            write_atomic(&path, contents)?;
            written.push(path);
        }
        if let Some((path, contents)) = sidecar {
            write_atomic(&path, &contents)?;
            written.push(path);
        }

        tracing::info!("Wrote {}", dest.display());
        Ok(ExportReport { written, warnings })
    }

    /// Import `src` and export it to `dst`.
    ///
    /// Formats left as `None` are detected from the paths.
    pub fn translate(
        &self,
        src_format: Option<BuildFormat>,
        src: &Path,
        dst_format: Option<BuildFormat>,
        dst: &Path,
    ) -> Result<ExportReport, TranslateError> {
        let project = match src_format {
            Some(format) => self.import(format, src)?,
            None => self.import_auto(src)?,
        };
        let format = match dst_format {
            Some(format) => format,
            None => BuildFormat::from_file_name(dst).ok_or_else(|| {
                TranslateError::FormatDetection {
                    path: dst.to_path_buf(),
                }
            })?,
        };
        self.export(&project, format, dst)
    }

    fn check_strict(&self, warnings: &[TranslationWarning]) -> Result<(), TranslateError> {
        if self.options.strict && warnings.iter().any(TranslationWarning::is_error) {
            return Err(TranslateError::StrictModeViolation {
                warnings: warnings.to_vec(),
            });
        }
        Ok(())
    }
}

/// The concrete file to write for `format` at `dest`.
fn output_file(format: BuildFormat, dest: &Path) -> PathBuf {
    if format == BuildFormat::Xcode {
        if dest.extension().is_some_and(|e| e == "xcodeproj") {
            return dest.join("project.pbxproj");
        }
        if dest.is_dir() {
            let name = dest
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("project");
            return dest.join(format!("{}.xcodeproj", name)).join("project.pbxproj");
        }
        return dest.to_path_buf();
    }
    if dest.is_dir() {
        dest.join(format.default_file_name())
    } else {
        dest.to_path_buf()
    }
}

/// Path from `out_dir` back to the project root, empty when they coincide.
fn source_prefix(out_dir: &Path, source_root: &Path) -> String {
    let rel = relative_path(&absolutize(out_dir), &absolutize(source_root));
    let prefix = to_slash(&rel);
    if prefix == "." {
        String::new()
    } else {
        prefix
    }
}
