//! CMake importer.
//!
//! Commands are extracted and tokenized by [`lexer`], expanded against a
//! [`vars::Scope`], then dispatched through [`CommandKind`]. Control flow is
//! not evaluated: every branch of an `if` is read, `function`/`macro`
//! bodies are skipped.

pub mod lexer;
pub mod vars;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use url::Url;

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::error::TranslateError;
use crate::core::language::CppStandard;
use crate::core::project::Project;
use crate::core::target::{FlagBundle, Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::import::{fallback_name, Entry, ImportOptions, IncludeGuard};
use crate::util::diagnostic::suggestions;
use crate::util::fs::{absolutize, project_relative, read_source, relative_path, to_slash};

use lexer::{extract_commands, tokenize_arguments, Command};
use vars::{evaluate_genex, is_single_reference, split_list, Genex, Scope};

/// Every command the importer acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Project,
    Set,
    Unset,
    Option,
    List,
    File,
    AddExecutable,
    AddLibrary,
    AddSubdirectory,
    Include,
    TargetSources,
    TargetIncludeDirectories,
    TargetLinkLibraries,
    TargetCompileDefinitions,
    TargetCompileOptions,
    TargetLinkOptions,
    TargetCompileFeatures,
    SetProperty,
    SetTargetProperties,
    AddDependencies,
    FindPackage,
    IncludeDirectories,
    AddDefinitions,
    AddCompileDefinitions,
    AddCompileOptions,
    LinkLibraries,
    FetchContentDeclare,
    CpmAddPackage,
    /// Recognized but without effect on the model
    Ignored,
}

impl CommandKind {
    fn from_name(name: &str) -> Option<CommandKind> {
        let kind = match name {
            "project" => CommandKind::Project,
            "set" => CommandKind::Set,
            "unset" => CommandKind::Unset,
            "option" => CommandKind::Option,
            "list" => CommandKind::List,
            "file" => CommandKind::File,
            "add_executable" => CommandKind::AddExecutable,
            "add_library" => CommandKind::AddLibrary,
            "add_subdirectory" => CommandKind::AddSubdirectory,
            "include" => CommandKind::Include,
            "target_sources" => CommandKind::TargetSources,
            "target_include_directories" => CommandKind::TargetIncludeDirectories,
            "target_link_libraries" => CommandKind::TargetLinkLibraries,
            "target_compile_definitions" => CommandKind::TargetCompileDefinitions,
            "target_compile_options" => CommandKind::TargetCompileOptions,
            "target_link_options" => CommandKind::TargetLinkOptions,
            "target_compile_features" => CommandKind::TargetCompileFeatures,
            "set_property" => CommandKind::SetProperty,
            "set_target_properties" => CommandKind::SetTargetProperties,
            "add_dependencies" => CommandKind::AddDependencies,
            "find_package" => CommandKind::FindPackage,
            "include_directories" => CommandKind::IncludeDirectories,
            "add_definitions" => CommandKind::AddDefinitions,
            "add_compile_definitions" => CommandKind::AddCompileDefinitions,
            "add_compile_options" => CommandKind::AddCompileOptions,
            "link_libraries" => CommandKind::LinkLibraries,
            "fetchcontent_declare" => CommandKind::FetchContentDeclare,
            "cpmaddpackage" => CommandKind::CpmAddPackage,
            "cmake_minimum_required" | "cmake_policy" | "if" | "elseif" | "else" | "endif"
            | "foreach" | "endforeach" | "while" | "endwhile" | "break" | "continue"
            | "return" | "message" | "include_guard" | "enable_testing"
            | "fetchcontent_makeavailable" | "enable_language" => CommandKind::Ignored,
            _ => return None,
        };
        Some(kind)
    }

    /// Commands whose arguments are stored rather than used right away.
    fn keeps_generator_expressions(&self) -> bool {
        matches!(
            self,
            CommandKind::Set | CommandKind::List | CommandKind::Option | CommandKind::Ignored
        )
    }
}

/// Keywords that separate visibility groups in `target_*` commands.
const VISIBILITY: &[&str] = &["PUBLIC", "PRIVATE", "INTERFACE"];

/// Per-directory parsing state.
///
/// Each `add_subdirectory` gets its own copy; `include` shares its caller's.
#[derive(Debug, Clone)]
struct DirContext {
    /// Directory relative to the source root
    dir: PathBuf,
    /// Nesting depth of the current file
    depth: usize,
    /// File being read, relative to the root
    file: PathBuf,
    /// Directory-level requirements applied to targets created afterwards
    flags: FlagBundle,
}

struct CMakeImporter<'a> {
    root: PathBuf,
    options: &'a ImportOptions,
    project: Project,
    scope: Scope,
    named: bool,
    aliases: HashMap<String, String>,
}

/// Import a `CMakeLists.txt` and everything it pulls in.
pub fn import(path: &Path, options: &ImportOptions) -> Result<Project, TranslateError> {
    let path = absolutize(path);
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut importer = CMakeImporter::new(root, options);
    let mut guard = IncludeGuard::new(options.max_depth);
    guard.enter(&path, 0);

    let mut ctx = DirContext {
        dir: PathBuf::new(),
        depth: 0,
        file: importer.rel(&path),
        flags: FlagBundle::default(),
    };
    importer.set_directory_vars(&ctx);
    importer.process_file(&path, &mut guard, &mut ctx)?;
    Ok(importer.finish())
}

/// Import CMake text directly, as if read from `root/CMakeLists.txt`.
pub fn import_str(
    text: &str,
    root: &Path,
    options: &ImportOptions,
) -> Result<Project, TranslateError> {
    let root = absolutize(root);
    let file = root.join("CMakeLists.txt");
    let mut importer = CMakeImporter::new(root, options);
    let mut guard = IncludeGuard::new(options.max_depth);
    guard.enter(&file, 0);

    let mut ctx = DirContext {
        dir: PathBuf::new(),
        depth: 0,
        file: PathBuf::from("CMakeLists.txt"),
        flags: FlagBundle::default(),
    };
    importer.set_directory_vars(&ctx);
    importer.process_text(text, &file, &mut guard, &mut ctx)?;
    Ok(importer.finish())
}

impl<'a> CMakeImporter<'a> {
    fn new(root: PathBuf, options: &'a ImportOptions) -> Self {
        let mut scope = Scope::new();
        let root_str = to_slash(&root);
        scope.set("CMAKE_SOURCE_DIR", vec![root_str.clone()]);
        scope.set("CMAKE_BINARY_DIR", vec![format!("{}/build", root_str)]);
        scope.set("PROJECT_SOURCE_DIR", vec![root_str]);

        CMakeImporter {
            project: Project::new(fallback_name(&root), root.clone()),
            root,
            options,
            scope,
            named: false,
            aliases: HashMap::new(),
        }
    }

    fn rel(&self, path: &Path) -> PathBuf {
        relative_path(&self.root, path)
    }

    fn set_directory_vars(&mut self, ctx: &DirContext) {
        let abs = to_slash(&self.root.join(&ctx.dir));
        let bin = to_slash(&self.root.join("build").join(&ctx.dir));
        self.scope.set("CMAKE_CURRENT_SOURCE_DIR", vec![abs.clone()]);
        self.scope.set("CMAKE_CURRENT_LIST_DIR", vec![abs]);
        self.scope.set("CMAKE_CURRENT_BINARY_DIR", vec![bin]);
    }

    fn process_file(
        &mut self,
        path: &Path,
        guard: &mut IncludeGuard,
        ctx: &mut DirContext,
    ) -> Result<(), TranslateError> {
        tracing::debug!("Parsing CMake file {}", path.display());
        let text = read_source(path)?;
        self.process_text(&text, path, guard, ctx)
    }

    fn process_text(
        &mut self,
        text: &str,
        path: &Path,
        guard: &mut IncludeGuard,
        ctx: &mut DirContext,
    ) -> Result<(), TranslateError> {
        let commands = extract_commands(text)
            .map_err(|e| TranslateError::parse(self.rel(path), Some(e.line), e.message))?;

        if let Some(dir) = path.parent() {
            self.scope
                .set("CMAKE_CURRENT_LIST_DIR", vec![to_slash(dir)]);
        }
        self.scope
            .set("CMAKE_CURRENT_LIST_FILE", vec![to_slash(path)]);

        let mut skip_until: Option<(&'static str, &'static str, usize)> = None;
        for cmd in &commands {
            if let Some((open, close, depth)) = skip_until.as_mut() {
                if cmd.name == *open {
                    *depth += 1;
                } else if cmd.name == *close {
                    *depth -= 1;
                    if *depth == 0 {
                        skip_until = None;
                    }
                }
                continue;
            }
            match cmd.name.as_str() {
                "function" => {
                    skip_until = Some(("function", "endfunction", 1));
                    continue;
                }
                "macro" => {
                    skip_until = Some(("macro", "endmacro", 1));
                    continue;
                }
                _ => {}
            }
            self.dispatch(cmd, guard, ctx)?;
        }

        Ok(())
    }

    fn warn_at(&mut self, ctx: &DirContext, line: usize, warning: TranslationWarning) {
        self.project
            .warn(warning.with_location(ctx.file.clone(), Some(line)));
    }

    /// Tokenize and expand a command's arguments.
    fn expand_args(&mut self, cmd: &Command, kind: CommandKind, ctx: &DirContext) -> Vec<String> {
        let mut out = Vec::new();
        for arg in tokenize_arguments(&cmd.args) {
            if arg.bracket {
                out.push(arg.value);
                continue;
            }
            let values = if arg.quoted {
                vec![self.scope.expand(&arg.value).replace("\\;", ";")]
            } else if is_single_reference(&arg.value) {
                split_list(&self.scope.expand(&arg.value))
            } else {
                // An embedded list stays one argument
                split_list(&self.scope.expand_embedded(&arg.value))
            };

            if kind.keeps_generator_expressions() {
                out.extend(values);
                continue;
            }
            for value in values {
                match evaluate_genex(&value) {
                    Genex::Plain(v) => out.push(v),
                    Genex::Resolved(vs) => out.extend(vs),
                    Genex::Unsupported(expr) => self.warn_at(
                        ctx,
                        cmd.line,
                        TranslationWarning::warning(format!(
                            "generator expression `{}` in `{}` cannot be evaluated and was dropped",
                            expr, cmd.name
                        ))
                        .with_suggestion(suggestions::GENERATOR_EXPRESSION),
                    ),
                }
            }
        }
        out
    }

    fn dispatch(
        &mut self,
        cmd: &Command,
        guard: &mut IncludeGuard,
        ctx: &mut DirContext,
    ) -> Result<(), TranslateError> {
        let Some(kind) = CommandKind::from_name(&cmd.name) else {
            if self.options.verbose {
                self.warn_at(
                    ctx,
                    cmd.line,
                    TranslationWarning::info(format!("unsupported command `{}` ignored", cmd.name)),
                );
            }
            return Ok(());
        };

        let args = self.expand_args(cmd, kind, ctx);
        tracing::trace!("{}({})", cmd.name, args.join(" "));

        match kind {
            CommandKind::Project => self.cmd_project(&args),
            CommandKind::Set => self.cmd_set(&args, ctx, cmd.line),
            CommandKind::Unset => self.cmd_unset(&args),
            CommandKind::Option => self.cmd_option(&args),
            CommandKind::List => self.cmd_list(&args),
            CommandKind::File => self.cmd_file(&args, ctx),
            CommandKind::AddExecutable => self.cmd_add_executable(&args, ctx),
            CommandKind::AddLibrary => self.cmd_add_library(&args, ctx),
            CommandKind::AddSubdirectory => self.cmd_add_subdirectory(&args, cmd.line, guard, ctx)?,
            CommandKind::Include => self.cmd_include(&args, cmd.line, guard, ctx)?,
            CommandKind::TargetSources => self.cmd_target_sources(&args, ctx, cmd.line),
            CommandKind::TargetIncludeDirectories => {
                self.cmd_target_include_directories(&args, ctx, cmd.line)
            }
            CommandKind::TargetLinkLibraries => self.cmd_target_link_libraries(&args, ctx, cmd.line),
            CommandKind::TargetCompileDefinitions => {
                self.with_target_items(&args, ctx, cmd.line, |t, item| {
                    let define = item.strip_prefix("-D").unwrap_or(item);
                    t.flags.add_define(define);
                })
            }
            CommandKind::TargetCompileOptions => self.cmd_target_compile_options(&args, ctx, cmd.line),
            CommandKind::TargetLinkOptions => {
                self.with_target_items(&args, ctx, cmd.line, |t, item| {
                    t.flags.add_link_flag(item);
                })
            }
            CommandKind::TargetCompileFeatures => {
                self.cmd_target_compile_features(&args, ctx, cmd.line)
            }
            CommandKind::SetProperty => self.cmd_set_property(&args, ctx, cmd.line),
            CommandKind::SetTargetProperties => {
                self.cmd_set_target_properties(&args, ctx, cmd.line)
            }
            CommandKind::AddDependencies => self.cmd_add_dependencies(&args, ctx, cmd.line),
            CommandKind::FindPackage => self.cmd_find_package(&args),
            CommandKind::IncludeDirectories => self.cmd_include_directories(&args, ctx),
            CommandKind::AddDefinitions => {
                for arg in &args {
                    ctx.flags.add_compiler_arg(arg);
                }
            }
            CommandKind::AddCompileDefinitions => {
                for arg in &args {
                    ctx.flags.add_define(arg.strip_prefix("-D").unwrap_or(arg));
                }
            }
            CommandKind::AddCompileOptions => {
                for arg in &args {
                    if !self.standard_from_flag(arg, ctx, cmd.line) {
                        ctx.flags.add_compile_flag(arg.as_str());
                    }
                }
            }
            CommandKind::LinkLibraries => {
                for arg in &args {
                    add_link_item(&mut ctx.flags, arg);
                }
            }
            CommandKind::FetchContentDeclare => self.cmd_fetchcontent_declare(&args),
            CommandKind::CpmAddPackage => self.cmd_cpm_add_package(&args),
            CommandKind::Ignored => {}
        }

        Ok(())
    }

    fn cmd_project(&mut self, args: &[String]) {
        let Some(name) = args.first() else { return };
        let version = keyword_value(args, "VERSION");
        let description = keyword_value(args, "DESCRIPTION");
        let homepage = keyword_value(args, "HOMEPAGE_URL");

        self.scope.set("PROJECT_NAME", vec![name.clone()]);
        if let Some(v) = self.scope.get("CMAKE_CURRENT_SOURCE_DIR").map(<[String]>::to_vec) {
            self.scope.set("PROJECT_SOURCE_DIR", v.clone());
            self.scope.set(format!("{}_SOURCE_DIR", name), v);
        }
        if let Some(ref version) = version {
            self.scope.set("PROJECT_VERSION", vec![version.clone()]);
            self.scope.set(format!("{}_VERSION", name), vec![version.clone()]);
        }

        if self.named {
            return;
        }
        self.named = true;
        self.scope.set("CMAKE_PROJECT_NAME", vec![name.clone()]);
        self.project.name = name.clone();
        self.project.version = version;
        self.project.description = description;
        self.project.homepage = homepage;
    }

    fn cmd_set(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        let Some((name, rest)) = args.split_first() else { return };

        if let Some(pos) = rest.iter().position(|a| a == "CACHE") {
            let values = rest[..pos].to_vec();
            let force = rest[pos..].iter().any(|a| a == "FORCE");
            if force || !self.scope.is_defined(name) {
                self.set_variable(name, values, ctx, line);
            }
            return;
        }

        if rest.last().is_some_and(|a| a == "PARENT_SCOPE") {
            let values = rest[..rest.len() - 1].to_vec();
            let values = (!values.is_empty()).then_some(values);
            self.scope.set_parent(name.clone(), values);
            return;
        }

        if rest.is_empty() {
            self.scope.unset(name.clone());
        } else {
            self.set_variable(name, rest.to_vec(), ctx, line);
        }
    }

    fn set_variable(&mut self, name: &str, values: Vec<String>, ctx: &DirContext, line: usize) {
        if name == "CMAKE_CXX_STANDARD" {
            if let Some(std) = values.first().and_then(|v| CppStandard::parse_loose(v)) {
                self.declare_standard(std, ctx, line);
            }
        }
        self.scope.set(name, values);
    }

    fn cmd_unset(&mut self, args: &[String]) {
        let Some(name) = args.first() else { return };
        if args.get(1).is_some_and(|a| a == "PARENT_SCOPE") {
            self.scope.set_parent(name.clone(), None);
        } else {
            self.scope.unset(name.clone());
        }
    }

    fn cmd_option(&mut self, args: &[String]) {
        let Some(name) = args.first() else { return };
        if self.scope.is_defined(name) {
            return;
        }
        let value = args.get(2).cloned().unwrap_or_else(|| "OFF".to_string());
        self.scope.set(name.clone(), vec![value]);
    }

    fn cmd_list(&mut self, args: &[String]) {
        let [op, name, rest @ ..] = args else { return };
        match op.as_str() {
            "APPEND" => self.scope.append(name, rest.iter().cloned()),
            "PREPEND" => self.scope.prepend(name, rest.to_vec()),
            "REMOVE_ITEM" => {
                if let Some(current) = self.scope.get(name) {
                    let kept: Vec<String> = current
                        .iter()
                        .filter(|v| !rest.contains(v))
                        .cloned()
                        .collect();
                    self.scope.set(name.clone(), kept);
                }
            }
            "REMOVE_DUPLICATES" => {
                if let Some(current) = self.scope.get(name) {
                    let mut kept: Vec<String> = Vec::new();
                    for v in current {
                        if !kept.contains(v) {
                            kept.push(v.clone());
                        }
                    }
                    self.scope.set(name.clone(), kept);
                }
            }
            _ => {}
        }
    }

    /// `file(GLOB ...)` stores the patterns themselves; globs are resolved
    /// by whoever consumes the exported sources.
    fn cmd_file(&mut self, args: &[String], ctx: &DirContext) {
        let [mode, var, rest @ ..] = args else { return };
        let recurse = match mode.as_str() {
            "GLOB" => false,
            "GLOB_RECURSE" => true,
            _ => return,
        };

        let mut patterns = Vec::new();
        let mut iter = rest.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "CONFIGURE_DEPENDS" | "FOLLOW_SYMLINKS" => {}
                "RELATIVE" | "LIST_DIRECTORIES" => {
                    iter.next();
                }
                pattern => {
                    let pattern = if recurse {
                        recursive_pattern(pattern)
                    } else {
                        pattern.to_string()
                    };
                    let abs = if Path::new(&pattern).is_absolute() {
                        pattern
                    } else {
                        to_slash(&self.root.join(&ctx.dir).join(pattern))
                    };
                    patterns.push(abs);
                }
            }
        }
        self.scope.set(var.clone(), patterns);
    }

    fn path_in(&self, ctx: &DirContext, raw: &str) -> String {
        project_relative(&self.root, &ctx.dir, raw)
    }

    fn new_target(&mut self, name: &str, kind: TargetKind, files: &[String], ctx: &DirContext) {
        let mut target = Target::new(name, kind);
        for file in files {
            target.add_file(self.path_in(ctx, file));
        }
        target.flags.merge(ctx.flags.clone());
        tracing::debug!("Found {} target `{}`", kind, name);
        self.project.add_target(target);
    }

    fn cmd_add_executable(&mut self, args: &[String], ctx: &DirContext) {
        let Some((name, rest)) = args.split_first() else { return };
        if rest.first().is_some_and(|a| a == "IMPORTED") {
            return;
        }
        if rest.first().is_some_and(|a| a == "ALIAS") {
            if let Some(real) = rest.get(1) {
                self.aliases.insert(name.clone(), real.clone());
            }
            return;
        }
        let files: Vec<String> = rest
            .iter()
            .filter(|a| !matches!(a.as_str(), "WIN32" | "MACOSX_BUNDLE" | "EXCLUDE_FROM_ALL"))
            .cloned()
            .collect();
        self.new_target(name, TargetKind::Executable, &files, ctx);
    }

    fn cmd_add_library(&mut self, args: &[String], ctx: &DirContext) {
        let Some((name, rest)) = args.split_first() else { return };

        let mut kind = None;
        let mut files = Vec::new();
        let mut iter = rest.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "STATIC" => kind = Some(TargetKind::StaticLibrary),
                "SHARED" | "MODULE" => kind = Some(TargetKind::SharedLibrary),
                "OBJECT" => kind = Some(TargetKind::ObjectLibrary),
                "INTERFACE" => kind = Some(TargetKind::Interface),
                "IMPORTED" | "UNKNOWN" => return,
                "ALIAS" => {
                    if let Some(real) = iter.next() {
                        self.aliases.insert(name.clone(), real.clone());
                    }
                    return;
                }
                "EXCLUDE_FROM_ALL" | "GLOBAL" => {}
                _ => files.push(arg.clone()),
            }
        }

        let kind = kind.unwrap_or_else(|| {
            if self.scope.is_truthy("BUILD_SHARED_LIBS") {
                TargetKind::SharedLibrary
            } else {
                TargetKind::StaticLibrary
            }
        });
        self.new_target(name, kind, &files, ctx);
    }

    fn cmd_add_subdirectory(
        &mut self,
        args: &[String],
        line: usize,
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<(), TranslateError> {
        let Some(dir) = args.first() else { return Ok(()) };
        let child_rel = PathBuf::from(self.path_in(ctx, dir));
        let file = self.root.join(&child_rel).join("CMakeLists.txt");
        let depth = ctx.depth + 1;

        match guard.enter(&file, depth) {
            Entry::Visited => return Ok(()),
            Entry::TooDeep => {
                self.warn_at(
                    ctx,
                    line,
                    TranslationWarning::warning(format!(
                        "`add_subdirectory({})` exceeds the maximum nesting depth of {}",
                        dir,
                        guard.max_depth()
                    ))
                    .with_suggestion(suggestions::INCLUDE_DEPTH),
                );
                return Ok(());
            }
            Entry::Enter => {}
        }

        let mut child = DirContext {
            dir: child_rel,
            depth,
            file: self.rel(&file),
            flags: ctx.flags.clone(),
        };
        self.scope.push();
        self.set_directory_vars(&child);
        let result = self.process_file(&file, guard, &mut child);
        self.scope.pop();

        self.recover(result, ctx, line)
    }

    fn cmd_include(
        &mut self,
        args: &[String],
        line: usize,
        guard: &mut IncludeGuard,
        ctx: &mut DirContext,
    ) -> Result<(), TranslateError> {
        let Some(target) = args.first() else { return Ok(()) };
        let optional = args.iter().any(|a| a == "OPTIONAL");

        let file = match self.resolve_include(target, ctx) {
            Some(file) => file,
            // a module from CMake's own module path (GNUInstallDirs, ...)
            None => return Ok(()),
        };
        if optional && !file.is_file() {
            return Ok(());
        }

        let depth = ctx.depth + 1;
        match guard.enter(&file, depth) {
            Entry::Visited => return Ok(()),
            Entry::TooDeep => {
                self.warn_at(
                    ctx,
                    line,
                    TranslationWarning::warning(format!(
                        "`include({})` exceeds the maximum nesting depth of {}",
                        target,
                        guard.max_depth()
                    ))
                    .with_suggestion(suggestions::INCLUDE_DEPTH),
                );
                return Ok(());
            }
            Entry::Enter => {}
        }

        let saved_file = std::mem::replace(&mut ctx.file, self.rel(&file));
        let saved_list_dir = self.scope.get("CMAKE_CURRENT_LIST_DIR").map(<[String]>::to_vec);
        ctx.depth = depth;
        let result = self.process_file(&file, guard, ctx);
        ctx.depth = depth - 1;
        ctx.file = saved_file;
        if let Some(dir) = saved_list_dir {
            self.scope.set("CMAKE_CURRENT_LIST_DIR", dir);
        }

        self.recover(result, ctx, line)
    }

    fn resolve_include(&self, target: &str, ctx: &DirContext) -> Option<PathBuf> {
        let looks_like_path = target.contains('/') || target.ends_with(".cmake");
        if looks_like_path {
            let p = Path::new(target);
            return Some(if p.is_absolute() {
                p.to_path_buf()
            } else {
                self.root.join(&ctx.dir).join(p)
            });
        }

        let module_dirs = self
            .scope
            .get("CMAKE_MODULE_PATH")
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        module_dirs
            .iter()
            .map(|dir| {
                let d = Path::new(dir);
                let d = if d.is_absolute() {
                    d.to_path_buf()
                } else {
                    self.root.join(&ctx.dir).join(d)
                };
                d.join(format!("{}.cmake", target))
            })
            .find(|candidate| candidate.is_file())
    }

    /// Downgrade a nested file's failure to a warning on the including file.
    fn recover(
        &mut self,
        result: Result<(), TranslateError>,
        ctx: &DirContext,
        line: usize,
    ) -> Result<(), TranslateError> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable_in_subtree() => {
                tracing::debug!("Nested file failed: {}", e);
                let mut warning = e.to_warning();
                if let TranslateError::SourceNotFound { .. } = e {
                    warning.location = None;
                }
                self.warn_at(ctx, line, warning);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn unknown_target(&mut self, name: &str, command: &str, ctx: &DirContext, line: usize) {
        self.warn_at(
            ctx,
            line,
            TranslationWarning::warning(format!(
                "`{}` refers to unknown target `{}`",
                command, name
            )),
        );
    }

    fn resolve_alias<'n>(&'n self, name: &'n str) -> &'n str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Apply `f` to every non-keyword item of a `target_*(tgt [scope] items)` command.
    fn with_target_items(
        &mut self,
        args: &[String],
        ctx: &DirContext,
        line: usize,
        mut f: impl FnMut(&mut Target, &str),
    ) {
        let Some((name, rest)) = args.split_first() else { return };
        let name = self.resolve_alias(name).to_string();
        let Some(target) = self.project.target_mut(&name) else {
            self.unknown_target(&name, "target command", ctx, line);
            return;
        };
        for item in rest {
            if VISIBILITY.contains(&item.as_str()) || item == "BEFORE" || item == "AFTER" {
                continue;
            }
            f(target, item);
        }
    }

    fn cmd_target_sources(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        let Some((name, rest)) = args.split_first() else { return };
        let mut files = Vec::new();
        let mut skip_next = false;
        let mut in_base_dirs = false;
        for item in rest {
            if skip_next {
                skip_next = false;
                continue;
            }
            match item.as_str() {
                "PUBLIC" | "PRIVATE" | "INTERFACE" | "FILES" => in_base_dirs = false,
                "FILE_SET" | "TYPE" => {
                    in_base_dirs = false;
                    skip_next = true;
                }
                "BASE_DIRS" => in_base_dirs = true,
                _ if in_base_dirs => {}
                _ => files.push(self.path_in(ctx, item)),
            }
        }

        let name = self.resolve_alias(name).to_string();
        match self.project.target_mut(&name) {
            Some(target) => {
                for file in files {
                    target.add_file(file);
                }
            }
            None => self.unknown_target(&name, "target_sources", ctx, line),
        }
    }

    fn cmd_target_include_directories(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        let system = args.iter().any(|a| a == "SYSTEM");
        let dirs: Vec<String> = args
            .iter()
            .skip(1)
            .filter(|a| a.as_str() != "SYSTEM")
            .map(|a| {
                if VISIBILITY.contains(&a.as_str()) || a == "BEFORE" || a == "AFTER" {
                    a.clone()
                } else {
                    self.path_in(ctx, a)
                }
            })
            .collect();
        let mut with_name = Vec::with_capacity(dirs.len() + 1);
        if let Some(name) = args.first() {
            with_name.push(name.clone());
        }
        with_name.extend(dirs);

        self.with_target_items(&with_name, ctx, line, |t, dir| {
            if system {
                t.flags.add_system_include_dir(dir);
            } else {
                t.flags.add_include_dir(dir);
            }
        });
    }

    fn cmd_target_link_libraries(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        let filtered: Vec<String> = args
            .iter()
            .enumerate()
            .filter(|(i, a)| {
                *i == 0
                    || !matches!(
                        a.as_str(),
                        "LINK_PUBLIC" | "LINK_PRIVATE" | "LINK_INTERFACE_LIBRARIES" | "general"
                            | "optimized" | "debug"
                    )
            })
            .map(|(_, a)| a.clone())
            .collect();

        let mut framework_next = false;
        self.with_target_items(&filtered, ctx, line, |t, item| {
            if framework_next {
                t.flags.add_framework(item);
                framework_next = false;
            } else if item == "-framework" {
                framework_next = true;
            } else {
                add_link_item(&mut t.flags, item);
            }
        });
    }

    fn cmd_target_compile_options(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        let Some(name) = args.first() else { return };
        let mut flags = Vec::new();
        for item in &args[1..] {
            if VISIBILITY.contains(&item.as_str()) || item == "BEFORE" {
                continue;
            }
            if !self.standard_from_flag(item, ctx, line) {
                flags.push(item.clone());
            }
        }
        let mut with_name = vec![name.clone()];
        with_name.extend(flags);
        self.with_target_items(&with_name, ctx, line, |t, flag| t.flags.add_compile_flag(flag));
    }

    fn cmd_target_compile_features(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        let Some(name) = args.first() else { return };
        if !self.project.has_target(self.resolve_alias(name)) {
            let name = name.clone();
            self.unknown_target(&name, "target_compile_features", ctx, line);
            return;
        }
        for feature in &args[1..] {
            if let Some(std) = feature
                .strip_prefix("cxx_std_")
                .and_then(CppStandard::parse_loose)
            {
                self.declare_standard(std, ctx, line);
            }
        }
    }

    fn cmd_set_property(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        if args.first().map(String::as_str) != Some("TARGET") {
            return;
        }
        let Some(prop_pos) = args.iter().position(|a| a == "PROPERTY") else { return };
        let targets: Vec<String> = args[1..prop_pos]
            .iter()
            .filter(|a| !matches!(a.as_str(), "APPEND" | "APPEND_STRING"))
            .cloned()
            .collect();
        let Some((prop, values)) = args[prop_pos + 1..].split_first() else { return };
        for target in targets {
            self.apply_target_property(&target, prop, values, ctx, line);
        }
    }

    fn cmd_set_target_properties(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        let Some(prop_pos) = args.iter().position(|a| a == "PROPERTIES") else { return };
        let targets = args[..prop_pos].to_vec();
        let pairs: Vec<(String, String)> = args[prop_pos + 1..]
            .chunks(2)
            .filter(|c| c.len() == 2)
            .map(|c| (c[0].clone(), c[1].clone()))
            .collect();
        for target in &targets {
            for (prop, value) in &pairs {
                let values = split_list(value);
                self.apply_target_property(target, prop, &values, ctx, line);
            }
        }
    }

    fn apply_target_property(
        &mut self,
        target: &str,
        prop: &str,
        values: &[String],
        ctx: &DirContext,
        line: usize,
    ) {
        let name = self.resolve_alias(target).to_string();
        if !self.project.has_target(&name) {
            self.unknown_target(&name, "set_target_properties", ctx, line);
            return;
        }

        match prop {
            "CXX_STANDARD" => {
                if let Some(std) = values.first().and_then(|v| CppStandard::parse_loose(v)) {
                    self.declare_standard(std, ctx, line);
                }
            }
            "INCLUDE_DIRECTORIES" | "INTERFACE_INCLUDE_DIRECTORIES" => {
                let dirs: Vec<String> = values.iter().map(|v| self.path_in(ctx, v)).collect();
                if let Some(t) = self.project.target_mut(&name) {
                    for dir in dirs {
                        t.flags.add_include_dir(dir);
                    }
                }
            }
            "COMPILE_DEFINITIONS" | "INTERFACE_COMPILE_DEFINITIONS" => {
                if let Some(t) = self.project.target_mut(&name) {
                    for v in values {
                        t.flags.add_define(v.as_str());
                    }
                }
            }
            "COMPILE_OPTIONS" | "COMPILE_FLAGS" => {
                if let Some(t) = self.project.target_mut(&name) {
                    for v in values.iter().flat_map(|v| v.split_whitespace()) {
                        t.flags.add_compiler_arg(v);
                    }
                }
            }
            "LINK_LIBRARIES" | "INTERFACE_LINK_LIBRARIES" => {
                if let Some(t) = self.project.target_mut(&name) {
                    for v in values {
                        add_link_item(&mut t.flags, v);
                    }
                }
            }
            "LINK_FLAGS" | "LINK_OPTIONS" => {
                if let Some(t) = self.project.target_mut(&name) {
                    for v in values.iter().flat_map(|v| v.split_whitespace()) {
                        t.flags.add_link_flag(v);
                    }
                }
            }
            _ => {
                if self.options.verbose {
                    self.warn_at(
                        ctx,
                        line,
                        TranslationWarning::info(format!(
                            "target property `{}` on `{}` ignored",
                            prop, name
                        )),
                    );
                }
            }
        }
    }

    fn cmd_add_dependencies(&mut self, args: &[String], ctx: &DirContext, line: usize) {
        let Some((name, deps)) = args.split_first() else { return };
        let deps: Vec<String> = deps.iter().map(|d| self.resolve_alias(d).to_string()).collect();
        let name = self.resolve_alias(name).to_string();
        match self.project.target_mut(&name) {
            Some(target) => {
                for dep in deps {
                    target.add_dependency(dep);
                }
            }
            None => self.unknown_target(&name, "add_dependencies", ctx, line),
        }
    }

    fn cmd_find_package(&mut self, args: &[String]) {
        let Some(name) = args.first() else { return };
        let version = args
            .get(1)
            .filter(|v| v.starts_with(|c: char| c.is_ascii_digit()));
        let kind = if args.iter().any(|a| a == "REQUIRED") {
            DependencyKind::System
        } else {
            DependencyKind::Optional
        };

        let mut dep = Dependency::new(name.as_str()).with_kind(kind);
        if let Some(v) = version {
            dep = dep.with_version(v.as_str());
        }
        self.project.add_dependency(dep);
    }

    fn cmd_include_directories(&mut self, args: &[String], ctx: &mut DirContext) {
        let system = args.iter().any(|a| a == "SYSTEM");
        for arg in args {
            if matches!(arg.as_str(), "SYSTEM" | "BEFORE" | "AFTER") {
                continue;
            }
            let dir = self.path_in(ctx, arg);
            if system {
                ctx.flags.add_system_include_dir(dir);
            } else {
                ctx.flags.add_include_dir(dir);
            }
        }
    }

    fn cmd_fetchcontent_declare(&mut self, args: &[String]) {
        let Some(name) = args.first() else { return };
        let mut dep = Dependency::new(name.as_str());
        if let Some(repo) = keyword_value(args, "GIT_REPOSITORY") {
            dep = dep.with_source(repo);
            if let Some(tag) = keyword_value(args, "GIT_TAG") {
                dep = dep.with_version(tag);
            }
        } else if let Some(url) = keyword_value(args, "URL") {
            dep = dep.with_source(url);
        }
        self.project.add_dependency(dep);
    }

    fn cmd_cpm_add_package(&mut self, args: &[String]) {
        let dep = match args {
            [single] => cpm_shorthand(single),
            _ => {
                let Some(name) = keyword_value(args, "NAME") else { return };
                let mut dep = Dependency::new(name);
                if let Some(version) =
                    keyword_value(args, "VERSION").or_else(|| keyword_value(args, "GIT_TAG"))
                {
                    dep = dep.with_version(version);
                }
                if let Some(repo) = keyword_value(args, "GITHUB_REPOSITORY") {
                    dep = dep.with_source(format!("https://github.com/{}.git", repo));
                } else if let Some(repo) = keyword_value(args, "GITLAB_REPOSITORY") {
                    dep = dep.with_source(format!("https://gitlab.com/{}.git", repo));
                } else if let Some(url) = keyword_value(args, "GIT_REPOSITORY")
                    .or_else(|| keyword_value(args, "URL"))
                {
                    dep = dep.with_source(url);
                }
                Some(dep)
            }
        };
        if let Some(dep) = dep {
            self.project.add_dependency(dep);
        }
    }

    /// Treat a `-std=` style flag as a standard declaration.
    fn standard_from_flag(&mut self, flag: &str, ctx: &DirContext, line: usize) -> bool {
        if !(flag.starts_with("-std=") || flag.starts_with("/std:")) {
            return false;
        }
        match CppStandard::parse_loose(flag) {
            Some(std) => {
                self.declare_standard(std, ctx, line);
                true
            }
            None => false,
        }
    }

    fn declare_standard(&mut self, std: CppStandard, ctx: &DirContext, line: usize) {
        if let Some(warning) = self.project.declare_cxx_standard(std) {
            self.warn_at(ctx, line, warning);
        }
    }

    /// Link items that name targets of the project become dependencies.
    fn finish(mut self) -> Project {
        let names: Vec<String> = self.project.targets().iter().map(|t| t.name.clone()).collect();
        for name in &names {
            let Some(libs) = self.project.target(name).map(|t| t.flags.link_libraries.clone())
            else {
                continue;
            };
            let mut external = Vec::new();
            let mut internal = Vec::new();
            for lib in libs {
                let resolved = self.resolve_alias(&lib).to_string();
                if self.project.has_target(&resolved) {
                    internal.push(resolved);
                } else {
                    external.push(lib);
                }
            }
            if let Some(target) = self.project.target_mut(name) {
                target.flags.link_libraries = external;
                for dep in internal {
                    target.add_dependency(dep);
                }
            }
        }

        tracing::debug!(
            "Imported CMake project `{}` with {} target(s)",
            self.project.name,
            self.project.targets().len()
        );
        self.project
    }
}

/// Value following `keyword` in an argument list.
fn keyword_value(args: &[String], keyword: &str) -> Option<String> {
    args.iter()
        .position(|a| a == keyword)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Sort one `target_link_libraries` item into the flag bundle.
fn add_link_item(flags: &mut FlagBundle, item: &str) {
    if let Some(framework) = item
        .strip_suffix(".framework")
        .map(|p| p.rsplit('/').next().unwrap_or(p))
    {
        flags.add_framework(framework);
    } else if item.starts_with('-') {
        flags.add_linker_arg(item);
    } else {
        flags.add_link_library(item);
    }
}

/// Turn `src/*.cpp` into `src/**/*.cpp`.
fn recursive_pattern(pattern: &str) -> String {
    if pattern.contains("**") {
        return pattern.to_string();
    }
    match pattern.rfind('/') {
        Some(idx) => format!("{}/**/{}", &pattern[..idx], &pattern[idx + 1..]),
        None => format!("**/{}", pattern),
    }
}

/// Parse a CPM shorthand such as `gh:fmtlib/fmt@10.1.0` or a plain URL.
fn cpm_shorthand(spec: &str) -> Option<Dependency> {
    let (host, rest) = match spec.split_once(':') {
        Some(("gh", rest)) => ("https://github.com", rest),
        Some(("gl", rest)) => ("https://gitlab.com", rest),
        Some(("bb", rest)) => ("https://bitbucket.org", rest),
        _ => {
            let (url, version) = match spec.rsplit_once('@') {
                Some((u, v)) if !v.contains('/') => (u, Some(v)),
                _ => (spec, None),
            };
            let parsed = Url::parse(url).ok()?;
            let name = parsed
                .path_segments()
                .and_then(|mut s| s.next_back())
                .map(|s| s.trim_end_matches(".git").to_string())
                .filter(|s| !s.is_empty())?;
            let mut dep = Dependency::new(name).with_source(url);
            if let Some(v) = version {
                dep = dep.with_version(v);
            }
            return Some(dep);
        }
    };

    let (repo, version) = match rest.split_once('@') {
        Some((repo, version)) => (repo, Some(version)),
        None => (rest, None),
    };
    let (repo, _tag) = repo.split_once('#').unwrap_or((repo, ""));
    let name = repo.rsplit('/').next().filter(|n| !n.is_empty())?;
    let mut dep = Dependency::new(name).with_source(format!("{}/{}.git", host, repo));
    if let Some(v) = version {
        dep = dep.with_version(v);
    }
    Some(dep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::warning::Severity;
    use crate::test_support::write_tree;
    use tempfile::TempDir;

    fn import_text(text: &str) -> Project {
        let tmp = TempDir::new().unwrap();
        import_str(text, tmp.path(), &ImportOptions::default()).unwrap()
    }

    #[test]
    fn test_round_trip_scenario_import() {
        let project = import_text("project(Demo)\nadd_executable(app src/main.cpp)");
        assert_eq!(project.name, "Demo");
        assert_eq!(project.targets().len(), 1);
        let app = &project.targets()[0];
        assert_eq!(app.name, "app");
        assert_eq!(app.kind, TargetKind::Executable);
        assert_eq!(app.sources, vec!["src/main.cpp"]);
    }

    #[test]
    fn test_list_variable_expansion() {
        let project = import_text("set(X a.c b.c)\nadd_library(lib ${X})");
        assert_eq!(project.targets()[0].sources, vec!["a.c", "b.c"]);
    }

    #[test]
    fn test_duplicate_target_merges() {
        let project = import_text("add_library(x a.c)\nadd_library(x b.c)");
        assert_eq!(project.targets().len(), 1);
        assert_eq!(project.targets()[0].name, "x");
        assert_eq!(project.targets()[0].sources, vec!["a.c", "b.c"]);
    }

    #[test]
    fn test_embedded_list_reference_stays_one_argument() {
        let project = import_text(
            "set(X a b)\nadd_library(lib src/${X}.c)\ntarget_compile_definitions(lib PRIVATE NAMES=${X})\nadd_executable(app ${X})",
        );
        let lib = project.target("lib").unwrap();
        assert_eq!(lib.sources, vec!["src/a;b.c"]);
        assert_eq!(lib.flags.defines, vec!["NAMES=a;b"]);
        // A whole-argument reference still splits
        assert_eq!(project.target("app").unwrap().sources, vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_command_silent_unless_verbose() {
        let text = "add_custom_command(OUTPUT x COMMAND y)\nadd_executable(app main.c)";
        let quiet = import_text(text);
        assert!(quiet.warnings().is_empty());
        assert_eq!(quiet.targets().len(), 1);

        let tmp = TempDir::new().unwrap();
        let options = ImportOptions {
            verbose: true,
            ..ImportOptions::default()
        };
        let loud = import_str(text, tmp.path(), &options).unwrap();
        assert_eq!(loud.warnings().len(), 1);
        assert_eq!(loud.warnings()[0].severity, Severity::Info);
        assert!(loud.warnings()[0].message.contains("add_custom_command"));
    }

    #[test]
    fn test_library_kinds() {
        let project = import_text(
            "add_library(a STATIC a.c)\nadd_library(b SHARED b.c)\nadd_library(c INTERFACE)\n\
             add_library(d OBJECT d.c)\nset(BUILD_SHARED_LIBS ON)\nadd_library(e e.c)\n\
             add_library(f IMPORTED)\nadd_library(demo::a ALIAS a)",
        );
        let kinds: Vec<(&str, TargetKind)> = project
            .targets()
            .iter()
            .map(|t| (t.name.as_str(), t.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("a", TargetKind::StaticLibrary),
                ("b", TargetKind::SharedLibrary),
                ("c", TargetKind::Interface),
                ("d", TargetKind::ObjectLibrary),
                ("e", TargetKind::SharedLibrary),
            ]
        );
    }

    #[test]
    fn test_target_commands_fill_flags() {
        let project = import_text(
            r#"
add_library(core src/core.cpp include/core.h)
target_include_directories(core PUBLIC include PRIVATE src)
target_include_directories(core SYSTEM PUBLIC third_party)
target_compile_definitions(core PUBLIC CORE_API=1 -DEXTRA)
target_compile_options(core PRIVATE -Wall -Wextra)
target_link_libraries(core PUBLIC pthread -lm "-framework" Cocoa)
add_executable(app main.cpp)
target_link_libraries(app PRIVATE demo::core)
add_library(demo::core ALIAS core)
"#,
        );
        let core = project.target("core").unwrap();
        assert_eq!(core.sources, vec!["src/core.cpp"]);
        assert_eq!(core.headers, vec!["include/core.h"]);
        assert_eq!(core.flags.include_dirs, vec!["include", "src"]);
        assert_eq!(core.flags.system_include_dirs, vec!["third_party"]);
        assert_eq!(core.flags.defines, vec!["CORE_API=1", "EXTRA"]);
        assert_eq!(core.flags.compile_flags, vec!["-Wall", "-Wextra"]);
        assert_eq!(core.flags.link_libraries, vec!["pthread", "m"]);
        assert_eq!(core.flags.frameworks, vec!["Cocoa"]);

        let app = project.target("app").unwrap();
        assert_eq!(app.dependencies, vec!["core"]);
        assert!(app.flags.link_libraries.is_empty());
    }

    #[test]
    fn test_standard_declarations_converge() {
        let project = import_text(
            "set(CMAKE_CXX_STANDARD 17)\nadd_library(x x.cpp)\n\
             set_target_properties(x PROPERTIES CXX_STANDARD 17)\n\
             set_property(TARGET x PROPERTY CXX_STANDARD 17)\n\
             target_compile_features(x PUBLIC cxx_std_17)",
        );
        assert_eq!(project.cxx_standard, Some(CppStandard::Cpp17));
        assert!(project.warnings().is_empty());

        let conflict = import_text(
            "set(CMAKE_CXX_STANDARD 14)\nadd_library(x x.cpp)\ntarget_compile_features(x PUBLIC cxx_std_20)",
        );
        assert_eq!(conflict.cxx_standard, Some(CppStandard::Cpp20));
        assert_eq!(conflict.warnings().len(), 1);
        assert_eq!(conflict.warnings()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_generator_expressions() {
        let project = import_text(
            "add_library(x x.c)\n\
             target_include_directories(x PUBLIC $<BUILD_INTERFACE:inc> $<INSTALL_INTERFACE:include>)\n\
             target_compile_definitions(x PRIVATE $<$<CONFIG:Debug>:DEBUG_BUILD>)",
        );
        let x = project.target("x").unwrap();
        assert_eq!(x.flags.include_dirs, vec!["inc"]);
        assert!(x.flags.defines.is_empty());
        assert_eq!(project.warnings().len(), 1);
        assert!(project.warnings()[0].message.contains("CONFIG:Debug"));
        assert_eq!(project.warnings()[0].location.as_ref().unwrap().line, Some(3));
    }

    #[test]
    fn test_find_package_kinds() {
        let project = import_text(
            "find_package(ZLIB 1.2 REQUIRED)\nfind_package(OpenMP)\nfind_package(ZLIB REQUIRED)",
        );
        let deps = project.dependencies();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "ZLIB");
        assert_eq!(deps[0].version.as_deref(), Some("1.2"));
        assert_eq!(deps[0].kind, DependencyKind::System);
        assert_eq!(deps[1].kind, DependencyKind::Optional);
    }

    #[test]
    fn test_fetchcontent_and_cpm() {
        let project = import_text(
            r#"
include(FetchContent)
FetchContent_Declare(json GIT_REPOSITORY https://github.com/nlohmann/json.git GIT_TAG v3.11.2)
FetchContent_Declare(zlib URL https://zlib.net/zlib-1.3.tar.gz URL_HASH SHA256=abc)
CPMAddPackage("gh:fmtlib/fmt@10.1.0")
CPMAddPackage(NAME spdlog VERSION 1.12.0 GITHUB_REPOSITORY gabime/spdlog)
"#,
        );
        let deps = project.dependencies();
        assert_eq!(deps.len(), 4);
        assert_eq!(deps[0].name, "json");
        assert_eq!(deps[0].version.as_deref(), Some("v3.11.2"));
        assert_eq!(
            deps[0].source.as_deref(),
            Some("https://github.com/nlohmann/json.git")
        );
        assert_eq!(deps[1].source.as_deref(), Some("https://zlib.net/zlib-1.3.tar.gz"));
        assert_eq!(deps[2].name, "fmt");
        assert_eq!(deps[2].version.as_deref(), Some("10.1.0"));
        assert_eq!(
            deps[2].source.as_deref(),
            Some("https://github.com/fmtlib/fmt.git")
        );
        assert_eq!(deps[3].name, "spdlog");
        assert!(project.warnings().is_empty());
    }

    #[test]
    fn test_functions_are_skipped() {
        let project = import_text(
            "function(helper)\n  add_executable(ghost g.c)\nendfunction()\nadd_executable(real r.c)",
        );
        assert!(project.target("ghost").is_none());
        assert!(project.has_target("real"));
    }

    #[test]
    fn test_subdirectories_and_scopes() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                (
                    "CMakeLists.txt",
                    "project(Tree VERSION 1.2.0)\nset(COMMON_DEF TREE=1)\n\
                     include_directories(include)\nadd_subdirectory(lib)\n\
                     add_executable(app main.cpp)\ntarget_link_libraries(app PRIVATE util)\n\
                     message(STATUS ${FROM_CHILD})",
                ),
                (
                    "lib/CMakeLists.txt",
                    "add_library(util util.cpp ${CMAKE_CURRENT_SOURCE_DIR}/extra.cpp)\n\
                     target_compile_definitions(util PUBLIC ${COMMON_DEF})\n\
                     set(FROM_CHILD yes PARENT_SCOPE)\nset(CHILD_ONLY 1)",
                ),
            ],
        );

        let project = import(&tmp.path().join("CMakeLists.txt"), &ImportOptions::default()).unwrap();
        assert_eq!(project.name, "Tree");
        assert_eq!(project.version.as_deref(), Some("1.2.0"));

        let util = project.target("util").unwrap();
        assert_eq!(util.sources, vec!["lib/util.cpp", "lib/extra.cpp"]);
        assert_eq!(util.flags.defines, vec!["TREE=1"]);
        // directory includes are inherited by subdirectories
        assert_eq!(util.flags.include_dirs, vec!["include"]);

        let app = project.target("app").unwrap();
        assert_eq!(app.dependencies, vec!["util"]);
    }

    #[test]
    fn test_self_referential_subdirectory_terminates() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                (
                    "CMakeLists.txt",
                    "project(Loop)\nadd_library(top top.c)\nadd_subdirectory(sub)",
                ),
                (
                    "sub/CMakeLists.txt",
                    "add_library(inner inner.c)\nadd_subdirectory(..)\ninclude(../CMakeLists.txt)",
                ),
            ],
        );

        let project = import(&tmp.path().join("CMakeLists.txt"), &ImportOptions::default()).unwrap();
        let names: Vec<&str> = project.targets().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["top", "inner"]);
    }

    #[test]
    fn test_deep_chain_hits_depth_bound() {
        let tmp = TempDir::new().unwrap();
        let mut files = vec![("CMakeLists.txt".to_string(), "add_subdirectory(d)".to_string())];
        let mut dir = String::new();
        for _ in 0..6 {
            dir.push_str("d/");
            files.push((format!("{}CMakeLists.txt", dir), "add_subdirectory(d)".to_string()));
        }
        let refs: Vec<(&str, &str)> = files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        write_tree(tmp.path(), &refs);

        let options = ImportOptions {
            verbose: false,
            max_depth: 3,
        };
        let project = import(&tmp.path().join("CMakeLists.txt"), &options).unwrap();
        assert_eq!(project.warnings().len(), 1);
        assert!(project.warnings()[0].message.contains("maximum nesting depth"));
    }

    #[test]
    fn test_missing_or_broken_subdirectory_is_a_warning() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                (
                    "CMakeLists.txt",
                    "add_subdirectory(missing)\nadd_subdirectory(broken)\nadd_executable(app main.c)",
                ),
                ("broken/CMakeLists.txt", "add_library(b b.c"),
            ],
        );

        let project = import(&tmp.path().join("CMakeLists.txt"), &ImportOptions::default()).unwrap();
        assert!(project.has_target("app"));
        assert_eq!(project.warnings().len(), 2);
        assert!(project.warnings()[0].message.contains("not found"));
        assert!(project.warnings()[1].message.contains("never closed"));
    }

    #[test]
    fn test_top_level_parse_error_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = import_str("project(Demo", tmp.path(), &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, TranslateError::Parse { line: Some(1), .. }));
    }

    #[test]
    fn test_include_shares_scope_and_module_path() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                (
                    "CMakeLists.txt",
                    "list(APPEND CMAKE_MODULE_PATH ${CMAKE_CURRENT_SOURCE_DIR}/cmake)\n\
                     include(GNUInstallDirs)\ninclude(Sources)\nadd_library(lib ${LIB_SOURCES})",
                ),
                ("cmake/Sources.cmake", "set(LIB_SOURCES a.c b.c)"),
            ],
        );

        let project = import(&tmp.path().join("CMakeLists.txt"), &ImportOptions::default()).unwrap();
        assert_eq!(project.target("lib").unwrap().sources, vec!["a.c", "b.c"]);
        assert!(project.warnings().is_empty());
    }

    #[test]
    fn test_file_glob_keeps_patterns() {
        let project = import_text(
            "file(GLOB_RECURSE SRCS CONFIGURE_DEPENDS src/*.cpp)\nadd_executable(app ${SRCS})",
        );
        assert_eq!(project.target("app").unwrap().sources, vec!["src/**/*.cpp"]);
    }

    #[test]
    fn test_cpm_shorthand() {
        let dep = cpm_shorthand("gh:catchorg/Catch2@3.4.0").unwrap();
        assert_eq!(dep.name, "Catch2");
        assert_eq!(dep.version.as_deref(), Some("3.4.0"));

        let dep = cpm_shorthand("https://example.com/libs/foo.git@1.0").unwrap();
        assert_eq!(dep.name, "foo");
        assert_eq!(dep.version.as_deref(), Some("1.0"));
    }
}
