//! Meson importer.
//!
//! `meson.build` files are tokenized by [`lexer`], parsed by [`parser`] and
//! then interpreted here against a single variable table shared by every
//! `subdir`. Only the builder functions listed in [`Builtin`] touch the
//! project; every other call evaluates to an unknown value.

pub mod lexer;
pub mod parser;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::error::TranslateError;
use crate::core::language::CppStandard;
use crate::core::project::Project;
use crate::core::target::{FlagBundle, Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::import::{fallback_name, Entry, ImportOptions, IncludeGuard};
use crate::util::diagnostic::suggestions;
use crate::util::fs::{absolutize, project_relative, read_source, relative_path, to_slash};

use parser::{parse, Args, BinOp, Expr, Stmt, UnaryOp};

/// Runtime value of a Meson expression.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Array(Vec<Value>),
    Dict(Vec<(String, Value)>),
    /// Result of `files()`, paths relative to the project root
    Files(Vec<String>),
    /// Result of `include_directories()`
    IncludeDirs { dirs: Vec<String>, system: bool },
    /// Result of `dependency()`
    External(String),
    /// Result of `declare_dependency()`
    Declared(Box<Declared>),
    /// A build target, by name
    Target(String),
    /// Anything the importer does not model
    Unknown,
}

impl Value {
    /// Flatten nested arrays the way Meson does for most arguments.
    fn flatten(self) -> Vec<Value> {
        match self {
            Value::Array(items) => items.into_iter().flat_map(Value::flatten).collect(),
            other => vec![other],
        }
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Every string in a value that may be a string or an array of strings.
    fn strings(&self) -> Vec<String> {
        self.clone()
            .flatten()
            .into_iter()
            .filter_map(|v| match v {
                Value::Str(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

/// What `declare_dependency()` carries to the targets that use it.
#[derive(Debug, Clone, Default, PartialEq)]
struct Declared {
    /// Header-only target created for it, if any
    target: Option<String>,
    sources: Vec<String>,
    link_with: Vec<String>,
    flags: FlagBundle,
}

impl Declared {
    fn is_header_only(&self) -> bool {
        self.sources.is_empty()
            && self.link_with.is_empty()
            && !(self.flags.include_dirs.is_empty() && self.flags.system_include_dirs.is_empty())
    }
}

/// Functions with an effect on the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Project,
    Executable,
    Library,
    StaticLibrary,
    SharedLibrary,
    BothLibraries,
    DeclareDependency,
    Dependency,
    Subdir,
    IncludeDirectories,
    Files,
    AddArguments,
    AddLinkArguments,
    /// Recognized but without effect on the model
    Ignored,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "project" => Builtin::Project,
            "executable" => Builtin::Executable,
            "library" => Builtin::Library,
            "static_library" => Builtin::StaticLibrary,
            "shared_library" | "shared_module" => Builtin::SharedLibrary,
            "both_libraries" => Builtin::BothLibraries,
            "declare_dependency" => Builtin::DeclareDependency,
            "dependency" => Builtin::Dependency,
            "subdir" => Builtin::Subdir,
            "include_directories" => Builtin::IncludeDirectories,
            "files" => Builtin::Files,
            "add_project_arguments" | "add_global_arguments" => Builtin::AddArguments,
            "add_project_link_arguments" | "add_global_link_arguments" => {
                Builtin::AddLinkArguments
            }
            "message" | "warning" | "error" | "summary" | "assert" | "get_option"
            | "install_headers" | "install_data" | "install_subdir" | "install_man"
            | "configure_file" | "import" | "find_program" | "run_command" | "custom_target"
            | "test" | "benchmark" | "set_variable" | "get_variable" | "is_variable"
            | "environment" | "configuration_data" | "subproject" | "alias_target"
            | "run_target" | "generator" => Builtin::Ignored,
            _ => return None,
        };
        Some(builtin)
    }
}

/// Loop control produced by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

/// Per-file interpreter state.
#[derive(Debug, Clone)]
struct DirContext {
    /// Directory relative to the source root
    dir: PathBuf,
    depth: usize,
    /// File being read, relative to the root
    file: PathBuf,
}

struct MesonImporter<'a> {
    root: PathBuf,
    options: &'a ImportOptions,
    project: Project,
    vars: HashMap<String, Value>,
    /// `add_project_arguments` and friends, applied to targets declared later
    project_flags: FlagBundle,
    default_library: TargetKind,
    named: bool,
}

/// Import a `meson.build` and every `subdir` it reaches.
pub fn import(path: &Path, options: &ImportOptions) -> Result<Project, TranslateError> {
    let path = absolutize(path);
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut importer = MesonImporter::new(root, options);
    let mut guard = IncludeGuard::new(options.max_depth);
    guard.enter(&path, 0);

    let ctx = DirContext {
        dir: PathBuf::new(),
        depth: 0,
        file: importer.rel(&path),
    };
    importer.process_file(&path, &mut guard, &ctx)?;
    Ok(importer.finish())
}

/// Import Meson text directly, as if read from `root/meson.build`.
pub fn import_str(
    text: &str,
    root: &Path,
    options: &ImportOptions,
) -> Result<Project, TranslateError> {
    let root = absolutize(root);
    let file = root.join("meson.build");
    let mut importer = MesonImporter::new(root, options);
    let mut guard = IncludeGuard::new(options.max_depth);
    guard.enter(&file, 0);

    let ctx = DirContext {
        dir: PathBuf::new(),
        depth: 0,
        file: PathBuf::from("meson.build"),
    };
    importer.process_text(text, &file, &mut guard, &ctx)?;
    Ok(importer.finish())
}

impl<'a> MesonImporter<'a> {
    fn new(root: PathBuf, options: &'a ImportOptions) -> Self {
        MesonImporter {
            project: Project::new(fallback_name(&root), root.clone()),
            root,
            options,
            vars: HashMap::new(),
            project_flags: FlagBundle::default(),
            default_library: TargetKind::SharedLibrary,
            named: false,
        }
    }

    fn rel(&self, path: &Path) -> PathBuf {
        relative_path(&self.root, path)
    }

    fn path_in(&self, ctx: &DirContext, raw: &str) -> String {
        project_relative(&self.root, &ctx.dir, raw)
    }

    fn warn_at(&mut self, ctx: &DirContext, line: usize, warning: TranslationWarning) {
        self.project
            .warn(warning.with_location(ctx.file.clone(), Some(line)));
    }

    fn process_file(
        &mut self,
        path: &Path,
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<(), TranslateError> {
        tracing::debug!("Parsing Meson file {}", path.display());
        let text = read_source(path)?;
        self.process_text(&text, path, guard, ctx)
    }

    fn process_text(
        &mut self,
        text: &str,
        path: &Path,
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<(), TranslateError> {
        let stmts = parse(text)
            .map_err(|e| TranslateError::parse(self.rel(path), Some(e.line), e.message))?;
        self.exec_block(&stmts, guard, ctx)?;
        Ok(())
    }

    fn exec_block(
        &mut self,
        stmts: &[Stmt],
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<Flow, TranslateError> {
        for stmt in stmts {
            let flow = self.exec(stmt, guard, ctx)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(
        &mut self,
        stmt: &Stmt,
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<Flow, TranslateError> {
        match stmt {
            Stmt::Assign {
                name,
                append,
                value,
                line,
            } => {
                let mut value = self.eval(value, *line, guard, ctx)?;
                if *append {
                    let current = self.vars.get(name).cloned().unwrap_or(Value::Unknown);
                    value = add(current, value);
                }
                if let Value::Declared(declared) = &mut value {
                    self.header_only_target(name, declared);
                }
                self.vars.insert(name.clone(), value);
            }
            Stmt::Expr { expr, line } => {
                self.eval(expr, *line, guard, ctx)?;
            }
            Stmt::If {
                branches,
                otherwise,
                line,
            } => {
                // every branch is visited; loop control inside a branch is
                // not taken because the condition is not known
                for (cond, body) in branches {
                    self.eval(cond, *line, guard, ctx)?;
                    self.exec_block(body, guard, ctx)?;
                }
                self.exec_block(otherwise, guard, ctx)?;
            }
            Stmt::Foreach {
                vars,
                iterable,
                body,
                line,
            } => {
                let iterable = self.eval(iterable, *line, guard, ctx)?;
                let rounds: Vec<Vec<Value>> = match iterable {
                    Value::Array(items) => items.into_iter().map(|v| vec![v]).collect(),
                    Value::Files(paths) => paths.into_iter().map(|p| vec![Value::Str(p)]).collect(),
                    Value::Dict(entries) => entries
                        .into_iter()
                        .map(|(k, v)| vec![Value::Str(k), v])
                        .collect(),
                    _ => vec![Vec::new()],
                };
                for round in rounds {
                    for (i, var) in vars.iter().enumerate() {
                        let value = round.get(i).cloned().unwrap_or(Value::Unknown);
                        self.vars.insert(var.clone(), value);
                    }
                    if self.exec_block(body, guard, ctx)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    /// A `x_dep = declare_dependency(include_directories: ...)` with nothing
    /// to compile or link becomes a header-only target named `x`.
    fn header_only_target(&mut self, var: &str, declared: &mut Declared) {
        if declared.target.is_some() || !declared.is_header_only() {
            return;
        }
        let name = var.strip_suffix("_dep").unwrap_or(var);
        let mut target = Target::new(name, TargetKind::HeaderOnly);
        target.flags.merge(declared.flags.clone());
        tracing::debug!("Found header_only target `{}`", name);
        self.project.add_target(target);
        declared.target = Some(name.to_string());
    }

    fn eval(
        &mut self,
        expr: &Expr,
        line: usize,
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<Value, TranslateError> {
        let value = match expr {
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Number(n) => Value::Int(*n),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item, line, guard, ctx)?);
                }
                Value::Array(out)
            }
            Expr::Dict(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(key, line, guard, ctx)?;
                    let value = self.eval(value, line, guard, ctx)?;
                    if let Value::Str(key) = key {
                        out.push((key, value));
                    }
                }
                Value::Dict(out)
            }
            Expr::Ident(name) => self.vars.get(name).cloned().unwrap_or(Value::Unknown),
            Expr::Call { name, args } => self.call(name, args, line, guard, ctx)?,
            Expr::Method { object, name, args } => {
                if matches!(object.as_ref(), Expr::Ident(o) if o == "meson")
                    && !self.vars.contains_key("meson")
                {
                    self.meson_method(name, ctx)
                } else {
                    let object = self.eval(object, line, guard, ctx)?;
                    let (positional, _) = self.eval_args(args, line, guard, ctx)?;
                    method(object, name, positional)
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, line, guard, ctx)?;
                let rhs = self.eval(rhs, line, guard, ctx)?;
                binary(*op, lhs, rhs)
            }
            Expr::Unary { op, expr } => match (op, self.eval(expr, line, guard, ctx)?) {
                (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
                (UnaryOp::Neg, Value::Int(n)) => Value::Int(n.wrapping_neg()),
                _ => Value::Unknown,
            },
            Expr::Index { object, index } => {
                let object = self.eval(object, line, guard, ctx)?;
                let index = self.eval(index, line, guard, ctx)?;
                match (object, index) {
                    (Value::Array(items), Value::Int(i)) => {
                        let idx = if i < 0 { items.len() as i64 + i } else { i };
                        usize::try_from(idx)
                            .ok()
                            .and_then(|i| items.get(i).cloned())
                            .unwrap_or(Value::Unknown)
                    }
                    (Value::Dict(entries), Value::Str(key)) => entries
                        .into_iter()
                        .find(|(k, _)| *k == key)
                        .map(|(_, v)| v)
                        .unwrap_or(Value::Unknown),
                    _ => Value::Unknown,
                }
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval(cond, line, guard, ctx)?;
                let then = self.eval(then, line, guard, ctx)?;
                let otherwise = self.eval(otherwise, line, guard, ctx)?;
                match cond {
                    Value::Bool(false) => otherwise,
                    _ => then,
                }
            }
        };
        Ok(value)
    }

    fn eval_args(
        &mut self,
        args: &Args,
        line: usize,
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<(Vec<Value>, HashMap<String, Value>), TranslateError> {
        let mut positional = Vec::new();
        for arg in &args.positional {
            positional.extend(self.eval(arg, line, guard, ctx)?.flatten());
        }
        let mut keyword = HashMap::new();
        for (key, arg) in &args.keyword {
            let value = self.eval(arg, line, guard, ctx)?;
            keyword.insert(key.clone(), value);
        }
        Ok((positional, keyword))
    }

    fn meson_method(&self, name: &str, ctx: &DirContext) -> Value {
        match name {
            "current_source_dir" => Value::Str(to_slash(&self.root.join(&ctx.dir))),
            "source_root" | "project_source_root" | "global_source_root" => {
                Value::Str(to_slash(&self.root))
            }
            "current_build_dir" => Value::Str(to_slash(&self.root.join("build").join(&ctx.dir))),
            "project_name" => Value::Str(self.project.name.clone()),
            "project_version" => self
                .project
                .version
                .clone()
                .map(Value::Str)
                .unwrap_or(Value::Unknown),
            _ => Value::Unknown,
        }
    }

    fn call(
        &mut self,
        name: &str,
        args: &Args,
        line: usize,
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<Value, TranslateError> {
        let Some(builtin) = Builtin::from_name(name) else {
            if self.options.verbose {
                self.warn_at(
                    ctx,
                    line,
                    TranslationWarning::info(format!("unsupported function `{}` ignored", name)),
                );
            }
            // arguments may still hold calls with effects
            self.eval_args(args, line, guard, ctx)?;
            return Ok(Value::Unknown);
        };

        let (positional, keyword) = self.eval_args(args, line, guard, ctx)?;
        tracing::trace!("{}() with {} argument(s)", name, positional.len());

        let value = match builtin {
            Builtin::Project => {
                self.fn_project(&positional, &keyword, ctx, line);
                Value::Unknown
            }
            Builtin::Executable => {
                self.build_target(TargetKind::Executable, positional, keyword, ctx, line)
            }
            Builtin::Library => {
                let kind = self.default_library;
                self.build_target(kind, positional, keyword, ctx, line)
            }
            Builtin::StaticLibrary => {
                self.build_target(TargetKind::StaticLibrary, positional, keyword, ctx, line)
            }
            Builtin::SharedLibrary | Builtin::BothLibraries => {
                self.build_target(TargetKind::SharedLibrary, positional, keyword, ctx, line)
            }
            Builtin::DeclareDependency => self.fn_declare_dependency(keyword, ctx, line),
            Builtin::Dependency => self.fn_dependency(&positional, &keyword),
            Builtin::Subdir => {
                if let Some(dir) = positional.first().and_then(Value::as_str) {
                    let dir = dir.to_string();
                    self.fn_subdir(&dir, line, guard, ctx)?;
                }
                Value::Unknown
            }
            Builtin::IncludeDirectories => {
                let system = keyword
                    .get("is_system")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let dirs = positional
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|d| self.path_in(ctx, d))
                    .collect();
                Value::IncludeDirs { dirs, system }
            }
            Builtin::Files => Value::Files(self.source_paths(positional, ctx)),
            Builtin::AddArguments => {
                for arg in positional.iter().filter_map(Value::as_str) {
                    if !self.standard_from_flag(arg, ctx, line) {
                        self.project_flags.add_compiler_arg(arg);
                    }
                }
                Value::Unknown
            }
            Builtin::AddLinkArguments => {
                for arg in positional.iter().filter_map(Value::as_str) {
                    self.project_flags.add_linker_arg(arg);
                }
                Value::Unknown
            }
            Builtin::Ignored => Value::Unknown,
        };
        Ok(value)
    }

    fn fn_project(
        &mut self,
        positional: &[Value],
        keyword: &HashMap<String, Value>,
        ctx: &DirContext,
        line: usize,
    ) {
        if self.named {
            return;
        }
        let Some(name) = positional.first().and_then(Value::as_str) else { return };
        self.named = true;
        self.project.name = name.to_string();
        self.project.version = keyword
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string);
        let licenses = keyword.get("license").map(Value::strings).unwrap_or_default();
        if !licenses.is_empty() {
            self.project.license = Some(licenses.join(" OR "));
        }
        if let Some(options) = keyword.get("default_options") {
            self.apply_options(options, ctx, line);
        }
    }

    /// Apply `key=value` option strings (`default_options`, `override_options`).
    fn apply_options(&mut self, options: &Value, ctx: &DirContext, line: usize) {
        let entries: Vec<(String, String)> = match options {
            Value::Dict(entries) => entries
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect(),
            other => other
                .strings()
                .iter()
                .filter_map(|s| s.split_once('='))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect(),
        };
        for (key, value) in entries {
            match key.as_str() {
                "cpp_std" => {
                    // `c++17,c++14` lists fallbacks; the first is preferred
                    let first = value.split(',').next().unwrap_or_default();
                    if let Some(std) = CppStandard::parse_loose(first) {
                        self.declare_standard(std, ctx, line);
                    }
                }
                "default_library" => {
                    self.default_library = match value.as_str() {
                        "static" => TargetKind::StaticLibrary,
                        _ => TargetKind::SharedLibrary,
                    };
                }
                _ => {}
            }
        }
    }

    /// Collect source paths from positional values or a `sources:` value.
    fn source_paths(&self, values: Vec<Value>, ctx: &DirContext) -> Vec<String> {
        let mut out = Vec::new();
        for value in values {
            match value {
                Value::Str(s) => out.push(self.path_in(ctx, &s)),
                Value::Files(paths) => out.extend(paths),
                Value::Array(items) => out.extend(self.source_paths(items, ctx)),
                _ => {}
            }
        }
        out
    }

    fn build_target(
        &mut self,
        kind: TargetKind,
        positional: Vec<Value>,
        mut keyword: HashMap<String, Value>,
        ctx: &DirContext,
        line: usize,
    ) -> Value {
        let mut positional = positional.into_iter();
        let Some(Value::Str(name)) = positional.next() else {
            self.warn_at(
                ctx,
                line,
                TranslationWarning::warning("build target without a literal name ignored"),
            );
            return Value::Unknown;
        };

        let mut target = Target::new(name.as_str(), kind);
        target.flags.merge(self.project_flags.clone());

        let mut sources = self.source_paths(positional.collect(), ctx);
        if let Some(extra) = keyword.remove("sources") {
            sources.extend(self.source_paths(extra.flatten(), ctx));
        }
        for source in sources {
            target.add_file(source);
        }

        if let Some(includes) = keyword.remove("include_directories") {
            self.apply_includes(&mut target.flags, includes, ctx);
        }

        for key in ["link_with", "link_whole"] {
            for item in keyword.remove(key).map(Value::flatten).unwrap_or_default() {
                if let Value::Target(dep) = item {
                    target.add_dependency(dep);
                }
            }
        }

        for item in keyword
            .remove("dependencies")
            .map(Value::flatten)
            .unwrap_or_default()
        {
            match item {
                Value::Declared(declared) => {
                    let declared = *declared;
                    for source in declared.sources {
                        target.add_file(source);
                    }
                    for dep in declared.link_with.into_iter().chain(declared.target) {
                        target.add_dependency(dep);
                    }
                    target.flags.merge(declared.flags);
                }
                Value::External(name) => target.flags.add_link_library(name),
                _ => {}
            }
        }

        for key in ["c_args", "cpp_args"] {
            for arg in keyword.get(key).map(Value::strings).unwrap_or_default() {
                if !self.standard_from_flag(&arg, ctx, line) {
                    target.flags.add_compiler_arg(&arg);
                }
            }
        }
        for arg in keyword.get("link_args").map(Value::strings).unwrap_or_default() {
            target.flags.add_linker_arg(&arg);
        }
        if let Some(options) = keyword.get("override_options") {
            self.apply_options(options, ctx, line);
        }

        tracing::debug!("Found {} target `{}`", kind, name);
        self.project.add_target(target);
        Value::Target(name)
    }

    fn apply_includes(&self, flags: &mut FlagBundle, includes: Value, ctx: &DirContext) {
        for item in includes.flatten() {
            match item {
                Value::IncludeDirs { dirs, system } => {
                    for dir in dirs {
                        if system {
                            flags.add_system_include_dir(dir);
                        } else {
                            flags.add_include_dir(dir);
                        }
                    }
                }
                Value::Str(dir) => flags.add_include_dir(self.path_in(ctx, &dir)),
                _ => {}
            }
        }
    }

    fn fn_declare_dependency(
        &mut self,
        mut keyword: HashMap<String, Value>,
        ctx: &DirContext,
        line: usize,
    ) -> Value {
        let mut declared = Declared::default();
        if let Some(includes) = keyword.remove("include_directories") {
            self.apply_includes(&mut declared.flags, includes, ctx);
        }
        if let Some(sources) = keyword.remove("sources") {
            declared.sources = self.source_paths(sources.flatten(), ctx);
        }
        for item in keyword.remove("link_with").map(Value::flatten).unwrap_or_default() {
            if let Value::Target(name) = item {
                declared.link_with.push(name);
            }
        }
        for item in keyword
            .remove("dependencies")
            .map(Value::flatten)
            .unwrap_or_default()
        {
            match item {
                Value::Declared(inner) => {
                    let inner = *inner;
                    declared.sources.extend(inner.sources);
                    declared.link_with.extend(inner.link_with.into_iter().chain(inner.target));
                    declared.flags.merge(inner.flags);
                }
                Value::External(name) => declared.flags.add_link_library(name),
                _ => {}
            }
        }
        for arg in keyword.get("compile_args").map(Value::strings).unwrap_or_default() {
            if !self.standard_from_flag(&arg, ctx, line) {
                declared.flags.add_compiler_arg(&arg);
            }
        }
        for arg in keyword.get("link_args").map(Value::strings).unwrap_or_default() {
            declared.flags.add_linker_arg(&arg);
        }
        Value::Declared(Box::new(declared))
    }

    fn fn_dependency(&mut self, positional: &[Value], keyword: &HashMap<String, Value>) -> Value {
        let Some(name) = positional.first().and_then(Value::as_str) else {
            return Value::Unknown;
        };
        let required = keyword
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let kind = if required {
            DependencyKind::System
        } else {
            DependencyKind::Optional
        };

        let mut dep = Dependency::new(name).with_kind(kind);
        let version = keyword.get("version").map(Value::strings).unwrap_or_default();
        if !version.is_empty() {
            dep = dep.with_version(version.join(" "));
        }
        self.project.add_dependency(dep);
        Value::External(name.to_string())
    }

    fn fn_subdir(
        &mut self,
        dir: &str,
        line: usize,
        guard: &mut IncludeGuard,
        ctx: &DirContext,
    ) -> Result<(), TranslateError> {
        let child_rel = PathBuf::from(self.path_in(ctx, dir));
        let file = self.root.join(&child_rel).join("meson.build");
        let depth = ctx.depth + 1;

        match guard.enter(&file, depth) {
            Entry::Visited => return Ok(()),
            Entry::TooDeep => {
                self.warn_at(
                    ctx,
                    line,
                    TranslationWarning::warning(format!(
                        "`subdir('{}')` exceeds the maximum nesting depth of {}",
                        dir,
                        guard.max_depth()
                    ))
                    .with_suggestion(suggestions::INCLUDE_DEPTH),
                );
                return Ok(());
            }
            Entry::Enter => {}
        }

        let child = DirContext {
            dir: child_rel,
            depth,
            file: self.rel(&file),
        };
        match self.process_file(&file, guard, &child) {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable_in_subtree() => {
                tracing::debug!("Nested file failed: {}", e);
                let mut warning = e.to_warning();
                if let TranslateError::SourceNotFound { .. } = e {
                    warning.location = None;
                    warning.suggestion = Some(suggestions::MISSING_INCLUDE.to_string());
                }
                self.warn_at(ctx, line, warning);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

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

    fn finish(self) -> Project {
        tracing::debug!(
            "Imported Meson project `{}` with {} target(s)",
            self.project.name,
            self.project.targets().len()
        );
        self.project
    }
}

/// `+` and `+=`.
fn add(lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Value::Str(a + &b),
        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Value::Array(a)
        }
        (Value::Array(mut a), other) => {
            a.push(other);
            Value::Array(a)
        }
        (Value::Dict(mut a), Value::Dict(b)) => {
            for (k, v) in b {
                match a.iter_mut().find(|(existing, _)| *existing == k) {
                    Some(entry) => entry.1 = v,
                    None => a.push((k, v)),
                }
            }
            Value::Dict(a)
        }
        (Value::Files(mut a), Value::Files(b)) => {
            a.extend(b);
            Value::Files(a)
        }
        (files @ Value::Files(_), other) => add(Value::Array(vec![files]), other),
        // `+=` on a variable that was never bound
        (Value::Unknown, other @ Value::Array(_)) => other,
        _ => Value::Unknown,
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Value {
    use std::cmp::Ordering;

    let unknown = matches!(lhs, Value::Unknown) || matches!(rhs, Value::Unknown);
    match op {
        BinOp::Add => add(lhs, rhs),
        BinOp::Div => match (lhs, rhs) {
            (Value::Str(a), Value::Str(b)) => {
                if b.starts_with('/') {
                    Value::Str(b)
                } else {
                    Value::Str(format!("{}/{}", a.trim_end_matches('/'), b))
                }
            }
            (Value::Int(a), Value::Int(b)) => a.checked_div(b).map(Value::Int).unwrap_or(Value::Unknown),
            _ => Value::Unknown,
        },
        BinOp::Sub | BinOp::Mul | BinOp::Mod => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => match op {
                BinOp::Sub => Value::Int(a.wrapping_sub(b)),
                BinOp::Mul => Value::Int(a.wrapping_mul(b)),
                _ => a.checked_rem(b).map(Value::Int).unwrap_or(Value::Unknown),
            },
            _ => Value::Unknown,
        },
        BinOp::And | BinOp::Or => match (lhs.as_bool(), rhs.as_bool(), op) {
            (Some(false), _, BinOp::And) | (_, Some(false), BinOp::And) => Value::Bool(false),
            (Some(true), _, BinOp::Or) | (_, Some(true), BinOp::Or) => Value::Bool(true),
            (Some(a), Some(b), _) => Value::Bool(if op == BinOp::And { a && b } else { a || b }),
            _ => Value::Unknown,
        },
        _ if unknown => Value::Unknown,
        BinOp::Eq => Value::Bool(lhs == rhs),
        BinOp::Ne => Value::Bool(lhs != rhs),
        BinOp::In | BinOp::NotIn => {
            let found = match (&lhs, &rhs) {
                (item, Value::Array(items)) => Some(items.contains(item)),
                (Value::Str(key), Value::Dict(entries)) => {
                    Some(entries.iter().any(|(k, _)| k == key))
                }
                (Value::Str(needle), Value::Str(hay)) => Some(hay.contains(needle.as_str())),
                _ => None,
            };
            match found {
                Some(found) => Value::Bool(found == (op == BinOp::In)),
                None => Value::Unknown,
            }
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => None,
            };
            match ordering {
                Some(o) => Value::Bool(match op {
                    BinOp::Lt => o == Ordering::Less,
                    BinOp::Le => o != Ordering::Greater,
                    BinOp::Gt => o == Ordering::Greater,
                    _ => o != Ordering::Less,
                }),
                None => Value::Unknown,
            }
        }
    }
}

/// The small set of string, array and dictionary methods worth modelling.
fn method(object: Value, name: &str, args: Vec<Value>) -> Value {
    let arg_str = |i: usize| args.get(i).and_then(Value::as_str).map(str::to_string);
    match (object, name) {
        (Value::Str(s), "strip") => Value::Str(s.trim().to_string()),
        (Value::Str(s), "to_lower") => Value::Str(s.to_lowercase()),
        (Value::Str(s), "to_upper") => Value::Str(s.to_uppercase()),
        (Value::Str(s), "underscorify") => Value::Str(
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect(),
        ),
        (Value::Str(s), "split") => {
            let parts: Vec<Value> = match arg_str(0) {
                Some(sep) => s.split(sep.as_str()).map(|p| Value::Str(p.to_string())).collect(),
                None => s.split_whitespace().map(|p| Value::Str(p.to_string())).collect(),
            };
            Value::Array(parts)
        }
        (Value::Str(sep), "join") => Value::Str(
            args.iter()
                .flat_map(Value::strings)
                .collect::<Vec<_>>()
                .join(&sep),
        ),
        (Value::Str(s), "replace") => match (arg_str(0), arg_str(1)) {
            (Some(from), Some(to)) => Value::Str(s.replace(&from, &to)),
            _ => Value::Unknown,
        },
        (Value::Str(s), "startswith") => arg_str(0)
            .map(|p| Value::Bool(s.starts_with(&p)))
            .unwrap_or(Value::Unknown),
        (Value::Str(s), "endswith") => arg_str(0)
            .map(|p| Value::Bool(s.ends_with(&p)))
            .unwrap_or(Value::Unknown),
        (Value::Str(s), "contains") => arg_str(0)
            .map(|p| Value::Bool(s.contains(&p)))
            .unwrap_or(Value::Unknown),
        (Value::Str(s), "format") => {
            let mut out = s;
            for (i, arg) in args.iter().enumerate() {
                let text = match arg {
                    Value::Str(v) => v.clone(),
                    Value::Int(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                out = out.replace(&format!("@{}@", i), &text);
            }
            Value::Str(out)
        }
        (Value::Str(s), "to_int") => s.trim().parse().map(Value::Int).unwrap_or(Value::Unknown),
        (Value::Array(items), "length") | (Value::Array(items), "size") => {
            Value::Int(items.len() as i64)
        }
        (Value::Array(items), "contains") => args
            .first()
            .map(|v| Value::Bool(items.contains(v)))
            .unwrap_or(Value::Unknown),
        (Value::Array(items), "get") => match args.first() {
            Some(Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .or_else(|| args.get(1).cloned())
                .unwrap_or(Value::Unknown),
            _ => Value::Unknown,
        },
        (Value::Dict(entries), "get") => match arg_str(0) {
            Some(key) => entries
                .into_iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v)
                .or_else(|| args.get(1).cloned())
                .unwrap_or(Value::Unknown),
            None => Value::Unknown,
        },
        (Value::Dict(entries), "has_key") => arg_str(0)
            .map(|key| Value::Bool(entries.iter().any(|(k, _)| *k == key)))
            .unwrap_or(Value::Unknown),
        (Value::Dict(entries), "keys") => {
            Value::Array(entries.into_iter().map(|(k, _)| Value::Str(k)).collect())
        }
        (Value::External(_), "found") | (Value::Declared(_), "found") => Value::Bool(true),
        (dep @ Value::External(_), "partial_dependency")
        | (dep @ Value::Declared(_), "partial_dependency") => dep,
        _ => Value::Unknown,
    }
}
