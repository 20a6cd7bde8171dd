//! Makefile importer.
//!
//! A best-effort reading: variables are recorded and expanded, rules are
//! classified by what their recipe does (`ar` archives, `-shared` links,
//! `-o $@` links an executable). Conditionals are not evaluated; every
//! branch is read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::error::TranslateError;
use crate::core::language::{is_header, CppStandard, Language};
use crate::core::project::Project;
use crate::core::target::{FlagBundle, Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::import::{fallback_name, Entry, ImportOptions, IncludeGuard};
use crate::util::diagnostic::suggestions;
use crate::util::fs::{absolutize, is_glob_pattern, read_source, relative_path};

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:override\s+|export\s+)?([A-Za-z0-9_.\-]+)\s*(\+=|\?=|::=|:=|!=|=)\s*(.*)$")
        .expect("assignment pattern")
});

/// Nesting limit for variable references that refer to themselves.
const MAX_EXPANSION_DEPTH: usize = 32;

const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "cc", "cxx", "m", "mm"];

#[derive(Debug, Clone)]
struct Variable {
    value: String,
    /// `:=` variables are expanded once, when assigned
    simple: bool,
}

#[derive(Debug, Clone)]
struct Rule {
    targets: Vec<String>,
    prerequisites: Vec<String>,
    recipe: Vec<String>,
    file: PathBuf,
    line: usize,
}

impl Rule {
    fn is_pattern(&self) -> bool {
        self.targets.iter().any(|t| t.contains('%'))
    }
}

/// Values of `$@`, `$<` and `$^` while expanding a recipe.
struct Automatic<'r> {
    target: &'r str,
    prerequisites: &'r [String],
}

/// What a rule's recipe builds.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Classified {
    name: String,
    kind: TargetKind,
    output: String,
    uses_cxx: bool,
}

struct MakeImporter<'a> {
    root: PathBuf,
    options: &'a ImportOptions,
    project: Project,
    vars: HashMap<String, Variable>,
    rules: Vec<Rule>,
}

/// Import a Makefile and the files it includes.
pub fn import(path: &Path, options: &ImportOptions) -> Result<Project, TranslateError> {
    let path = absolutize(path);
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut importer = MakeImporter::new(root, options);
    let mut guard = IncludeGuard::new(options.max_depth);
    guard.enter(&path, 0);
    importer.process_file(&path, &mut guard, 0)?;
    Ok(importer.finish())
}

/// Import Makefile text as if read from `root/Makefile`.
pub fn import_str(
    text: &str,
    root: &Path,
    options: &ImportOptions,
) -> Result<Project, TranslateError> {
    let root = absolutize(root);
    let file = root.join("Makefile");
    let mut importer = MakeImporter::new(root, options);
    let mut guard = IncludeGuard::new(options.max_depth);
    guard.enter(&file, 0);
    importer.process_text(text, &file, &mut guard, 0)?;
    Ok(importer.finish())
}

/// Join continued lines, returning each logical line with its first line number.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (idx, raw) in text.lines().enumerate() {
        let (continued, body) = match raw.strip_suffix('\\') {
            Some(body) if !body.ends_with('\\') => (true, body),
            _ => (false, raw),
        };
        let entry = pending.get_or_insert_with(|| (idx + 1, String::new()));
        if !entry.1.is_empty() {
            entry.1.push(' ');
            entry.1.push_str(body.trim_start());
        } else {
            entry.1.push_str(body);
        }
        if !continued {
            out.extend(pending.take());
        }
    }
    out.extend(pending);
    out
}

/// Drop a `#` comment that is not escaped.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && (i == 0 || bytes[i - 1] != b'\\') {
            return &line[..i];
        }
    }
    line
}

/// Split function arguments on commas outside nested references.
fn split_arguments(text: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => args.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    args.push(current);
    args
}

/// Apply a `%` pattern substitution to one word.
fn patsubst_word(pattern: &str, replacement: &str, word: &str) -> String {
    match pattern.split_once('%') {
        Some((prefix, suffix)) => {
            if word.len() >= prefix.len() + suffix.len()
                && word.starts_with(prefix)
                && word.ends_with(suffix)
            {
                let stem = &word[prefix.len()..word.len() - suffix.len()];
                replacement.replacen('%', stem, 1)
            } else {
                word.to_string()
            }
        }
        None if word == pattern => replacement.to_string(),
        None => word.to_string(),
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

impl<'a> MakeImporter<'a> {
    fn new(root: PathBuf, options: &'a ImportOptions) -> Self {
        let mut vars = HashMap::new();
        for (name, value) in [("CC", "cc"), ("CXX", "c++"), ("AR", "ar"), ("RM", "rm -f")] {
            vars.insert(
                name.to_string(),
                Variable {
                    value: value.to_string(),
                    simple: true,
                },
            );
        }
        MakeImporter {
            project: Project::new(fallback_name(&root), root.clone()),
            root,
            options,
            vars,
            rules: Vec::new(),
        }
    }

    fn rel(&self, path: &Path) -> PathBuf {
        relative_path(&self.root, path)
    }

    fn warn_at(&mut self, file: &Path, line: usize, warning: TranslationWarning) {
        self.project
            .warn(warning.with_location(file.to_path_buf(), Some(line)));
    }

    fn process_file(
        &mut self,
        path: &Path,
        guard: &mut IncludeGuard,
        depth: usize,
    ) -> Result<(), TranslateError> {
        tracing::debug!("Parsing Makefile {}", path.display());
        let text = read_source(path)?;
        self.process_text(&text, path, guard, depth)
    }

    fn process_text(
        &mut self,
        text: &str,
        path: &Path,
        guard: &mut IncludeGuard,
        depth: usize,
    ) -> Result<(), TranslateError> {
        let file = self.rel(path);
        let mut current_rule: Option<usize> = None;
        let mut define: Option<(String, Vec<String>)> = None;

        for (line_no, line) in logical_lines(text) {
            if let Some((name, body)) = define.as_mut() {
                if line.trim() == "endef" {
                    let value = body.join("\n");
                    let name = std::mem::take(name);
                    self.vars.insert(name, Variable { value, simple: false });
                    define = None;
                } else {
                    body.push(line);
                }
                continue;
            }

            if let Some(recipe) = line.strip_prefix('\t') {
                match current_rule {
                    Some(idx) => self.rules[idx].recipe.push(recipe.trim().to_string()),
                    None => {
                        return Err(TranslateError::parse(
                            &file,
                            Some(line_no),
                            "recipe commences before first target",
                        ))
                    }
                }
                continue;
            }

            let stripped = strip_comment(&line).trim();
            if stripped.is_empty() {
                continue;
            }

            let keyword = stripped.split_whitespace().next().unwrap_or_default();
            match keyword {
                "ifeq" | "ifneq" | "ifdef" | "ifndef" | "else" | "endif" => continue,
                "define" => {
                    let name = stripped["define".len()..]
                        .trim()
                        .trim_end_matches(['=', ':', ' '])
                        .to_string();
                    define = Some((name, Vec::new()));
                    continue;
                }
                "include" | "-include" | "sinclude" => {
                    current_rule = None;
                    let rest = stripped[keyword.len()..].trim().to_string();
                    self.include(&rest, keyword != "include", &file, line_no, guard, depth)?;
                    continue;
                }
                "vpath" | "unexport" => continue,
                _ => {}
            }

            if let Some(caps) = ASSIGNMENT.captures(stripped) {
                current_rule = None;
                let name = caps[1].to_string();
                let op = caps[2].to_string();
                let value = caps[3].trim().to_string();
                self.assign(name, &op, value, &file, line_no);
                continue;
            }

            match self.parse_rule(stripped, &file, line_no) {
                Some(rule) => {
                    self.rules.push(rule);
                    current_rule = Some(self.rules.len() - 1);
                }
                None => {
                    current_rule = None;
                    if self.options.verbose {
                        self.warn_at(
                            &file,
                            line_no,
                            TranslationWarning::info(format!(
                                "unrecognized line `{}` ignored",
                                stripped
                            )),
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn assign(&mut self, name: String, op: &str, value: String, file: &Path, line: usize) {
        match op {
            "=" => {
                self.vars.insert(name, Variable { value, simple: false });
            }
            ":=" | "::=" => {
                let value = self.expand(&value, None, 0);
                self.vars.insert(name, Variable { value, simple: true });
            }
            "?=" => {
                self.vars
                    .entry(name)
                    .or_insert(Variable { value, simple: false });
            }
            "+=" => match self.vars.get(&name).cloned() {
                Some(existing) => {
                    let added = if existing.simple {
                        self.expand(&value, None, 0)
                    } else {
                        value
                    };
                    let joined = if existing.value.is_empty() {
                        added
                    } else {
                        format!("{} {}", existing.value, added)
                    };
                    self.vars.insert(
                        name,
                        Variable {
                            value: joined,
                            simple: existing.simple,
                        },
                    );
                }
                None => {
                    self.vars.insert(name, Variable { value, simple: false });
                }
            },
            "!=" => {
                self.warn_at(
                    file,
                    line,
                    TranslationWarning::info(format!(
                        "shell assignment to `{}` is not run; the variable is empty",
                        name
                    )),
                );
                self.vars.insert(
                    name,
                    Variable {
                        value: String::new(),
                        simple: true,
                    },
                );
            }
            _ => {}
        }
    }

    fn parse_rule(&mut self, line: &str, file: &Path, line_no: usize) -> Option<Rule> {
        let colon = line.find(':')?;
        let (targets, rest) = line.split_at(colon);
        let rest = rest.trim_start_matches(':');
        // target-specific variable values are not modelled
        if ASSIGNMENT.is_match(rest.trim()) {
            return None;
        }
        let (prereqs, inline) = match rest.split_once(';') {
            Some((p, r)) => (p, Some(r.trim().to_string())),
            None => (rest, None),
        };
        // order-only prerequisites come after `|`
        let prereqs = prereqs.split('|').next().unwrap_or_default();

        let targets: Vec<String> = words(&self.expand(targets, None, 0))
            .map(str::to_string)
            .collect();
        if targets.is_empty() {
            return None;
        }
        let prerequisites = words(&self.expand(prereqs, None, 0))
            .map(str::to_string)
            .collect();
        Some(Rule {
            targets,
            prerequisites,
            recipe: inline.into_iter().filter(|r| !r.is_empty()).collect(),
            file: file.to_path_buf(),
            line: line_no,
        })
    }

    fn include(
        &mut self,
        raw: &str,
        optional: bool,
        file: &Path,
        line: usize,
        guard: &mut IncludeGuard,
        depth: usize,
    ) -> Result<(), TranslateError> {
        let expanded = self.expand(raw, None, 0);
        for name in words(&expanded).map(str::to_string).collect::<Vec<_>>() {
            if is_glob_pattern(&name) {
                continue;
            }
            let path = self.root.join(&name);
            if optional && !path.is_file() {
                continue;
            }
            match guard.enter(&path, depth + 1) {
                Entry::Visited => continue,
                Entry::TooDeep => {
                    self.warn_at(
                        file,
                        line,
                        TranslationWarning::warning(format!(
                            "`include {}` exceeds the maximum nesting depth of {}",
                            name,
                            guard.max_depth()
                        ))
                        .with_suggestion(suggestions::INCLUDE_DEPTH),
                    );
                    continue;
                }
                Entry::Enter => {}
            }
            match self.process_file(&path, guard, depth + 1) {
                Ok(()) => {}
                Err(e) if e.is_recoverable_in_subtree() => {
                    tracing::debug!("Included makefile failed: {}", e);
                    let mut warning = e.to_warning();
                    if let TranslateError::SourceNotFound { .. } = e {
                        warning.location = None;
                    }
                    self.warn_at(file, line, warning);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Expand every variable and function reference in `text`.
    fn expand(&mut self, text: &str, auto: Option<&Automatic<'_>>, depth: usize) -> String {
        if depth > MAX_EXPANSION_DEPTH || !text.contains('$') {
            return text.to_string();
        }
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '$' || i + 1 >= chars.len() {
                out.push(chars[i]);
                i += 1;
                continue;
            }
            let next = chars[i + 1];
            match next {
                '$' => {
                    out.push('$');
                    i += 2;
                }
                '(' | '{' => {
                    let close = if next == '(' { ')' } else { '}' };
                    let mut level = 1;
                    let mut j = i + 2;
                    while j < chars.len() {
                        if chars[j] == next {
                            level += 1;
                        } else if chars[j] == close {
                            level -= 1;
                            if level == 0 {
                                break;
                            }
                        }
                        j += 1;
                    }
                    let inner: String = chars[(i + 2).min(chars.len())..j.min(chars.len())]
                        .iter()
                        .collect();
                    out.push_str(&self.reference(&inner, auto, depth));
                    i = j + 1;
                }
                c => {
                    out.push_str(&self.automatic(c, auto));
                    i += 2;
                }
            }
        }
        out
    }

    fn automatic(&mut self, c: char, auto: Option<&Automatic<'_>>) -> String {
        match (c, auto) {
            ('@', Some(a)) => a.target.to_string(),
            ('<', Some(a)) => a.prerequisites.first().cloned().unwrap_or_default(),
            ('^', Some(a)) | ('+', Some(a)) => a.prerequisites.join(" "),
            ('@' | '<' | '^' | '+' | '?' | '*', None) => format!("${}", c),
            (c, _) => self.variable(&c.to_string(), auto, 0),
        }
    }

    fn variable(&mut self, name: &str, auto: Option<&Automatic<'_>>, depth: usize) -> String {
        match self.vars.get(name).cloned() {
            Some(var) if var.simple => var.value,
            Some(var) => self.expand(&var.value, auto, depth + 1),
            None => String::new(),
        }
    }

    fn reference(&mut self, inner: &str, auto: Option<&Automatic<'_>>, depth: usize) -> String {
        if let Some((name, rest)) = inner.split_once(char::is_whitespace) {
            if let Some(result) = self.function(name, rest, auto, depth) {
                return result;
            }
        }

        let inner = self.expand(inner, auto, depth + 1);
        if let Some((name, subst)) = inner.split_once(':') {
            if let Some((from, to)) = subst.split_once('=') {
                let value = self.variable(name.trim(), auto, depth);
                let (pattern, replacement) = if from.contains('%') {
                    (from.to_string(), to.to_string())
                } else {
                    (format!("%{}", from), format!("%{}", to))
                };
                return words(&value)
                    .map(|w| patsubst_word(&pattern, &replacement, w))
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
        match inner.as_str() {
            "@" | "<" | "^" | "+" => {
                self.automatic(inner.chars().next().unwrap_or('@'), auto)
            }
            name => self.variable(name, auto, depth),
        }
    }

    /// Evaluate a make function call; `None` when `name` is not a function.
    fn function(
        &mut self,
        name: &str,
        rest: &str,
        auto: Option<&Automatic<'_>>,
        depth: usize,
    ) -> Option<String> {
        const FUNCTIONS: &[&str] = &[
            "patsubst", "subst", "wildcard", "addprefix", "addsuffix", "notdir", "basename",
            "dir", "filter", "filter-out", "sort", "strip", "firstword", "shell", "realpath",
            "abspath", "if", "or", "and", "foreach", "call", "origin", "info", "warning",
            "error",
        ];
        if !FUNCTIONS.contains(&name) {
            return None;
        }
        let args: Vec<String> = split_arguments(rest)
            .iter()
            .map(|a| self.expand(a, auto, depth + 1))
            .collect();
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();
        let each = |list: &str, f: &dyn Fn(&str) -> String| {
            words(list).map(f).collect::<Vec<_>>().join(" ")
        };

        let result = match name {
            "patsubst" => {
                let (pattern, replacement) = (arg(0).trim(), arg(1).trim());
                each(arg(2), &|w| patsubst_word(pattern, replacement, w))
            }
            "subst" => arg(2).replace(arg(0), arg(1)),
            // globs stay patterns; the exporters resolve them
            "wildcard" | "realpath" | "abspath" => words(arg(0)).collect::<Vec<_>>().join(" "),
            "addprefix" => each(arg(1), &|w| format!("{}{}", arg(0).trim(), w)),
            "addsuffix" => each(arg(1), &|w| format!("{}{}", w, arg(0).trim())),
            "notdir" => each(arg(0), &|w| w.rsplit('/').next().unwrap_or(w).to_string()),
            "dir" => each(arg(0), &|w| match w.rfind('/') {
                Some(idx) => w[..=idx].to_string(),
                None => "./".to_string(),
            }),
            "basename" => each(arg(0), &|w| match w.rfind('.') {
                Some(idx) if !w[idx..].contains('/') => w[..idx].to_string(),
                _ => w.to_string(),
            }),
            "filter" | "filter-out" => {
                let patterns: Vec<&str> = words(arg(0)).collect();
                let keep = name == "filter";
                words(arg(1))
                    .filter(|w| {
                        patterns
                            .iter()
                            .any(|p| patsubst_word(p, "\u{0}", w) == "\u{0}" || p == w)
                            == keep
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            "sort" => {
                let mut items: Vec<&str> = words(arg(0)).collect();
                items.sort_unstable();
                items.dedup();
                items.join(" ")
            }
            "strip" => words(arg(0)).collect::<Vec<_>>().join(" "),
            "firstword" => words(arg(0)).next().unwrap_or_default().to_string(),
            "if" => {
                if arg(0).trim().is_empty() {
                    arg(2).to_string()
                } else {
                    arg(1).to_string()
                }
            }
            "or" => args
                .iter()
                .find(|a| !a.trim().is_empty())
                .cloned()
                .unwrap_or_default(),
            "and" => {
                if args.iter().all(|a| !a.trim().is_empty()) {
                    args.last().cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            }
            "shell" => {
                self.shell_dependencies(arg(0));
                String::new()
            }
            _ => String::new(),
        };
        Some(result)
    }

    /// `$(shell pkg-config ... pkg)` names system packages.
    fn shell_dependencies(&mut self, command: &str) {
        let mut tokens = words(command);
        if tokens.next() != Some("pkg-config") {
            return;
        }
        for package in tokens.filter(|t| !t.starts_with('-')) {
            self.project
                .add_dependency(Dependency::new(package).with_kind(DependencyKind::System));
        }
    }

    /// Decide what a rule builds from its expanded recipe.
    fn classify(&self, rule: &Rule, recipe: &[String]) -> Option<Classified> {
        let output = rule.targets.first()?.clone();
        let tokens: Vec<&str> = recipe.iter().flat_map(|l| words(l)).collect();
        let program = |line: &String| {
            words(line.trim_start_matches(['@', '-', '+']))
                .next()
                .map(|p| p.rsplit('/').next().unwrap_or(p).to_string())
        };
        let uses_cxx = tokens.iter().any(|t| t.ends_with("++"));

        let base = output.rsplit('/').next().unwrap_or(&output).to_string();
        let archives = recipe
            .iter()
            .filter_map(program)
            .any(|p| p == "ar" || p.ends_with("-ar"));
        if archives {
            let name = library_name(&base, &[".a", ".lib"]);
            return Some(Classified {
                name,
                kind: TargetKind::StaticLibrary,
                output,
                uses_cxx,
            });
        }

        let writes_output = tokens.windows(2).any(|w| w[0] == "-o" && w[1] == output)
            || tokens.iter().any(|t| t.strip_prefix("-o") == Some(output.as_str()));
        if !writes_output || tokens.contains(&"-c") {
            return None;
        }
        if tokens.iter().any(|t| *t == "-shared" || *t == "-dynamiclib") {
            let name = library_name(&base, &[".so", ".dylib", ".dll"]);
            return Some(Classified {
                name,
                kind: TargetKind::SharedLibrary,
                output,
                uses_cxx,
            });
        }
        Some(Classified {
            name: base.strip_suffix(".exe").unwrap_or(&base).to_string(),
            kind: TargetKind::Executable,
            output,
            uses_cxx,
        })
    }

    /// Map an object file back to the source it is compiled from.
    fn source_for_object(&self, object: &str, uses_cxx: bool) -> String {
        let explicit = self
            .rules
            .iter()
            .filter(|r| !r.is_pattern() && r.targets.iter().any(|t| t == object))
            .flat_map(|r| r.prerequisites.iter())
            .find(|p| Language::from_path(p).is_some());
        if let Some(source) = explicit {
            return source.clone();
        }

        for rule in self.rules.iter().filter(|r| r.is_pattern()) {
            let Some(first) = rule.prerequisites.first() else { continue };
            if Language::from_path(first).is_none() {
                continue;
            }
            for pattern in &rule.targets {
                let mapped = patsubst_word(pattern, first, object);
                if mapped != object {
                    return mapped;
                }
            }
        }

        let stem = object
            .strip_suffix(".o")
            .or_else(|| object.strip_suffix(".obj"))
            .unwrap_or(object);
        if !is_glob_pattern(stem) {
            for ext in SOURCE_EXTENSIONS {
                let candidate = format!("{}.{}", stem, ext);
                if self.root.join(&candidate).is_file() {
                    return candidate;
                }
            }
        }
        format!("{}.{}", stem, if uses_cxx { "cpp" } else { "c" })
    }

    fn global_flags(&mut self) -> (FlagBundle, FlagBundle) {
        let mut compile = FlagBundle::default();
        for var in ["CPPFLAGS", "CFLAGS", "CXXFLAGS"] {
            let value = self.variable(var, None, 0);
            for flag in words(&value) {
                match CppStandard::parse_loose(flag).filter(|_| flag.starts_with("-std=")) {
                    Some(std) => {
                        if let Some(warning) = self.project.declare_cxx_standard(std) {
                            self.project.warn(warning);
                        }
                    }
                    None => compile.add_compiler_arg(flag),
                }
            }
        }
        let mut link = FlagBundle::default();
        for var in ["LDFLAGS", "LDLIBS", "LIBS"] {
            let value = self.variable(var, None, 0);
            for flag in words(&value) {
                link.add_linker_arg(flag);
            }
        }
        (compile, link)
    }

    fn finish(mut self) -> Project {
        let (compile, link) = self.global_flags();
        let rules = self.rules.clone();

        let mut built: Vec<(Classified, &Rule, Vec<String>)> = Vec::new();
        for rule in rules.iter().filter(|r| !r.is_pattern() && !r.recipe.is_empty()) {
            let Some(first) = rule.targets.first() else { continue };
            if first.starts_with('.') {
                continue;
            }
            let auto = Automatic {
                target: first,
                prerequisites: &rule.prerequisites,
            };
            let recipe: Vec<String> = rule
                .recipe
                .iter()
                .map(|l| self.expand(l, Some(&auto), 0))
                .collect();
            match self.classify(rule, &recipe) {
                Some(classified) => built.push((classified, rule, recipe)),
                None => {
                    if self.options.verbose {
                        let file = rule.file.clone();
                        self.warn_at(
                            &file,
                            rule.line,
                            TranslationWarning::info(format!(
                                "rule `{}` does not build a target and was ignored",
                                first
                            )),
                        );
                    }
                }
            }
        }

        let outputs: HashMap<String, String> = built
            .iter()
            .map(|(c, _, _)| (c.output.clone(), c.name.clone()))
            .collect();

        for (classified, rule, recipe) in &built {
            let mut target = Target::new(classified.name.as_str(), classified.kind);
            for prereq in &rule.prerequisites {
                if let Some(dep) = outputs.get(prereq) {
                    target.add_dependency(dep.as_str());
                } else if prereq.ends_with(".o") || prereq.ends_with(".obj") {
                    target.add_source(self.source_for_object(prereq, classified.uses_cxx));
                } else if Language::from_path(prereq).is_some() || is_glob_pattern(prereq) {
                    target.add_source(prereq.as_str());
                } else if is_header(prereq) {
                    target.add_header(prereq.as_str());
                }
            }

            target.flags.merge(compile.clone());
            if classified.kind != TargetKind::StaticLibrary {
                target.flags.merge(link.clone());
                let tokens: Vec<&str> = recipe.iter().flat_map(|l| words(l)).collect();
                for (i, token) in tokens.iter().enumerate() {
                    if let Some(lib) = token.strip_prefix("-l").filter(|l| !l.is_empty()) {
                        target.flags.add_link_library(lib);
                    } else if *token == "-framework" {
                        if let Some(fw) = tokens.get(i + 1) {
                            target.flags.add_framework(*fw);
                        }
                    }
                }
            }

            tracing::debug!("Found {} target `{}`", classified.kind, classified.name);
            self.project.add_target(target);
        }

        // `-lcore` against a library built here is a target dependency
        let names: Vec<String> = self.project.targets().iter().map(|t| t.name.clone()).collect();
        for name in &names {
            let Some(libs) = self.project.target(name).map(|t| t.flags.link_libraries.clone())
            else {
                continue;
            };
            let (internal, external): (Vec<String>, Vec<String>) = libs
                .into_iter()
                .partition(|l| l != name && names.contains(l));
            if let Some(target) = self.project.target_mut(name) {
                target.flags.link_libraries = external;
                for dep in internal {
                    target.add_dependency(dep);
                }
            }
        }

        tracing::debug!(
            "Imported Makefile project `{}` with {} target(s)",
            self.project.name,
            self.project.targets().len()
        );
        self.project
    }
}

/// `libfoo.a` → `foo`.
fn library_name(base: &str, extensions: &[&str]) -> String {
    let mut name = base;
    if let Some(idx) = name.find(".so.") {
        name = &name[..idx];
    }
    for ext in extensions {
        if let Some(stripped) = name.strip_suffix(ext) {
            name = stripped;
            break;
        }
    }
    name.strip_prefix("lib")
        .filter(|n| !n.is_empty())
        .unwrap_or(name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_tree;
    use tempfile::TempDir;

    const SAMPLE: &str = "# demo
CC = gcc
CXX := g++
CXXFLAGS = -std=c++17 -Wall -Iinclude \\
           -DAPP_VERSION=2
LDLIBS = -lpthread -lm
SRCS := $(wildcard src/*.cpp)
OBJS = $(SRCS:.cpp=.o)
LIB_OBJS = $(patsubst %.cpp,%.o,lib/a.cpp lib/b.cpp)

all: app

app: $(OBJS) libcore.a
\t$(CXX) $(LDFLAGS) -o $@ $^ $(LDLIBS)

libcore.a: $(LIB_OBJS)
\t$(AR) rcs $@ $^

libplug.so: plug/plug.o
\t$(CXX) -shared -o $@ $^

%.o: %.cpp
\t$(CXX) $(CXXFLAGS) -c -o $@ $<

clean:
\trm -f app libcore.a
";

    fn import_text(text: &str) -> Project {
        let tmp = TempDir::new().unwrap();
        import_str(text, tmp.path(), &ImportOptions::default()).unwrap()
    }

    #[test]
    fn test_rules_become_targets() {
        let project = import_text(SAMPLE);
        let names: Vec<&str> = project.targets().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["app", "core", "plug"]);

        let app = project.target("app").unwrap();
        assert_eq!(app.kind, TargetKind::Executable);
        assert_eq!(app.sources, vec!["src/*.cpp"]);
        assert_eq!(app.dependencies, vec!["core"]);
        assert_eq!(app.flags.link_libraries, vec!["pthread", "m"]);
        assert_eq!(app.flags.include_dirs, vec!["include"]);
        assert_eq!(app.flags.defines, vec!["APP_VERSION=2"]);
        assert_eq!(app.flags.compile_flags, vec!["-Wall"]);

        let core = project.target("core").unwrap();
        assert_eq!(core.kind, TargetKind::StaticLibrary);
        assert_eq!(core.sources, vec!["lib/a.cpp", "lib/b.cpp"]);
        assert!(core.flags.link_libraries.is_empty());

        let plug = project.target("plug").unwrap();
        assert_eq!(plug.kind, TargetKind::SharedLibrary);
        assert_eq!(plug.sources, vec!["plug/plug.cpp"]);

        assert_eq!(project.cxx_standard, Some(CppStandard::Cpp17));
    }

    #[test]
    fn test_expand_functions() {
        let tmp = TempDir::new().unwrap();
        let options = ImportOptions::default();
        let mut importer = MakeImporter::new(tmp.path().to_path_buf(), &options);
        importer.assign("A".into(), "=", "one".into(), Path::new("Makefile"), 1);
        importer.assign("B".into(), ":=", "$(A)".into(), Path::new("Makefile"), 2);
        importer.assign("A".into(), "=", "two".into(), Path::new("Makefile"), 3);
        importer.assign("C".into(), "=", "$(A)".into(), Path::new("Makefile"), 4);
        importer.assign("C".into(), "+=", "three".into(), Path::new("Makefile"), 5);
        importer.assign("D".into(), "?=", "four".into(), Path::new("Makefile"), 6);
        importer.assign("D".into(), "?=", "five".into(), Path::new("Makefile"), 7);
        importer.assign("SRC".into(), "=", "a.c b.c".into(), Path::new("Makefile"), 8);

        assert_eq!(importer.expand("$(B) ${C} $(D)", None, 0), "one two three four");
        assert_eq!(importer.expand("$(SRC:.c=.o)", None, 0), "a.o b.o");
        assert_eq!(importer.expand("$(SRC:%.c=obj/%.o)", None, 0), "obj/a.o obj/b.o");
        assert_eq!(importer.expand("$(addprefix -I,inc src)", None, 0), "-Iinc -Isrc");
        assert_eq!(importer.expand("$(notdir src/a.c)", None, 0), "a.c");
        assert_eq!(importer.expand("$(filter %.c,a.c b.h)", None, 0), "a.c");
        assert_eq!(importer.expand("$(filter-out %.c,a.c b.h)", None, 0), "b.h");
        assert_eq!(importer.expand("$(subst .c,.o,x.c)", None, 0), "x.o");
        assert_eq!(importer.expand("cost $$5", None, 0), "cost $5");
        assert_eq!(importer.expand("$(UNDEFINED)", None, 0), "");
    }

    #[test]
    fn test_self_reference_terminates() {
        let tmp = TempDir::new().unwrap();
        let options = ImportOptions::default();
        let mut importer = MakeImporter::new(tmp.path().to_path_buf(), &options);
        importer.assign("A".into(), "=", "x $(A)".into(), Path::new("Makefile"), 1);
        let expanded = importer.expand("$(A)", None, 0);
        assert!(expanded.starts_with("x x"));
    }

    #[test]
    fn test_pkg_config_shell_is_system_dependency() {
        let project = import_text(
            "LIBS = $(shell pkg-config --libs gtk+-3.0 zlib)\nui: main.o\n\tcc -o ui main.o $(LIBS)\n",
        );
        let names: Vec<&str> = project.dependencies().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["gtk+-3.0", "zlib"]);
        assert_eq!(project.dependencies()[0].kind, DependencyKind::System);
        assert_eq!(project.target("ui").unwrap().sources, vec!["main.c"]);
    }

    #[test]
    fn test_object_maps_to_existing_source() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                ("Makefile", "tool: main.o util.o\n\t$(CC) -o tool main.o util.o\nutil.o: util.cc util.h\n"),
                ("main.cpp", ""),
            ],
        );
        let project = import(&tmp.path().join("Makefile"), &ImportOptions::default()).unwrap();
        let tool = project.target("tool").unwrap();
        assert_eq!(tool.sources, vec!["main.cpp", "util.cc"]);
    }

    #[test]
    fn test_include_and_optional_include() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[
                (
                    "Makefile",
                    "include config.mk\n-include missing.d\ninclude absent.mk\napp: main.o\n\t$(CC) $(CFLAGS) -o $@ $^\n",
                ),
                ("config.mk", "CFLAGS = -O2 -DFROM_CONFIG\ninclude Makefile\n"),
            ],
        );
        let project = import(&tmp.path().join("Makefile"), &ImportOptions::default()).unwrap();
        let app = project.target("app").unwrap();
        assert_eq!(app.flags.defines, vec!["FROM_CONFIG"]);

        // only the mandatory missing include is reported, at its line
        assert_eq!(project.warnings().len(), 1);
        let location = project.warnings()[0].location.as_ref().unwrap();
        assert_eq!(location.path, PathBuf::from("Makefile"));
        assert_eq!(location.line, Some(3));
    }

    #[test]
    fn test_recipe_before_target_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let err = import_str("\techo hi\n", tmp.path(), &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, TranslateError::Parse { line: Some(1), .. }));
    }

    #[test]
    fn test_unclassified_rules_noted_in_verbose_mode() {
        let tmp = TempDir::new().unwrap();
        let options = ImportOptions {
            verbose: true,
            ..ImportOptions::default()
        };
        let project = import_str("clean:\n\trm -f *.o\n", tmp.path(), &options).unwrap();
        assert!(project.targets().is_empty());
        assert_eq!(project.warnings().len(), 1);
    }

    #[test]
    fn test_logical_lines() {
        let lines = logical_lines("A = a \\\n    b\nB = c\n");
        assert_eq!(lines, vec![(1, "A = a  b".to_string()), (3, "B = c".to_string())]);
    }

    #[test]
    fn test_library_name() {
        assert_eq!(library_name("libcore.a", &[".a"]), "core");
        assert_eq!(library_name("libplug.so.1.2", &[".so"]), "plug");
        assert_eq!(library_name("engine.lib", &[".lib"]), "engine");
    }
}
