//! Exporters: a [`Project`] rendered into foreign build descriptions.
//!
//! Every exporter is a pure render of the project into text held in memory.
//! Writing the result is the engine's job.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::TranslateError;
use crate::core::format::BuildFormat;
use crate::core::language::is_header;
use crate::core::manifest;
use crate::core::project::Project;
use crate::core::target::{FlagBundle, Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::util::fs::{glob_files, is_glob_pattern, to_slash};

pub mod cmake;
pub mod compile_commands;
pub mod conan;
pub mod makefile;
pub mod meson;
pub mod msbuild;
pub mod ninja;
pub mod pkgconfig;
pub mod vcpkg;
pub mod xcode;

/// The output of one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Text for the destination file
    pub contents: String,

    /// Extra files written next to the destination (relative paths)
    pub siblings: Vec<(PathBuf, String)>,

    /// Problems found while rendering
    pub warnings: Vec<TranslationWarning>,
}

impl Rendered {
    pub fn new(contents: String) -> Self {
        Rendered {
            contents,
            ..Rendered::default()
        }
    }
}

/// Expands glob-style source patterns into concrete files.
pub trait SourcePatternResolver {
    /// Files matching `pattern` below `root`, relative to `root`.
    fn resolve(&self, root: &Path, pattern: &str) -> Vec<String>;
}

/// Resolves patterns against the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobResolver;

impl SourcePatternResolver for GlobResolver {
    fn resolve(&self, root: &Path, pattern: &str) -> Vec<String> {
        if !is_glob_pattern(pattern) {
            return vec![pattern.to_string()];
        }
        glob_files(root, &[pattern.to_string()])
            .iter()
            .map(|p| to_slash(p))
            .collect()
    }
}

/// Settings shared by all exporters.
pub struct ExportContext<'a> {
    /// Compiler named in compile commands and Makefiles
    pub compiler: String,

    /// Prefix leading from the output directory back to the source root
    pub source_prefix: String,

    /// Write an MSBuild solution instead of a single project
    pub solution: bool,

    pub resolver: &'a dyn SourcePatternResolver,
}

impl Default for ExportContext<'_> {
    fn default() -> Self {
        ExportContext {
            compiler: "c++".to_string(),
            source_prefix: String::new(),
            solution: false,
            resolver: &GlobResolver,
        }
    }
}

impl fmt::Debug for ExportContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportContext")
            .field("compiler", &self.compiler)
            .field("source_prefix", &self.source_prefix)
            .field("solution", &self.solution)
            .finish_non_exhaustive()
    }
}

impl ExportContext<'_> {
    /// A project path as seen from the output directory.
    pub fn path(&self, path: &str) -> String {
        if self.source_prefix.is_empty()
            || path.starts_with('/')
            || path.starts_with('$')
            || Path::new(path).is_absolute()
        {
            return path.to_string();
        }
        if path == "." {
            return self.source_prefix.clone();
        }
        format!("{}/{}", self.source_prefix.trim_end_matches('/'), path)
    }

    /// Every path of a list, as seen from the output directory.
    pub fn paths<'p>(&self, paths: impl IntoIterator<Item = &'p String>) -> Vec<String> {
        paths.into_iter().map(|p| self.path(p)).collect()
    }
}

/// Render `project` as `format`.
pub fn render(
    format: BuildFormat,
    project: &Project,
    ctx: &ExportContext<'_>,
) -> Result<Rendered, TranslateError> {
    tracing::info!("Exporting `{}` as {}", project.name, format);
    let map_err = |e: fmt::Error| TranslateError::Render {
        format,
        message: e.to_string(),
    };
    match format {
        BuildFormat::Native => manifest::render(project).map(Rendered::new),
        BuildFormat::CMake => cmake::render(project, ctx).map_err(map_err),
        BuildFormat::Meson => meson::render(project, ctx).map_err(map_err),
        BuildFormat::Makefile => makefile::render(project, ctx).map_err(map_err),
        BuildFormat::Ninja => ninja::render(project, ctx).map_err(map_err),
        BuildFormat::Xcode => xcode::render(project, ctx).map_err(map_err),
        BuildFormat::MsBuild => msbuild::render(project, ctx).map_err(map_err),
        BuildFormat::Vcpkg => vcpkg::render(project),
        BuildFormat::Conan => conan::render(project).map_err(map_err),
        BuildFormat::PkgConfig => pkgconfig::render(project, ctx).map_err(map_err),
        BuildFormat::CompileCommands => compile_commands::render(project, ctx),
    }
}

/// Compile requirements of `target` plus those of every target it depends on.
pub(crate) fn usage_flags(project: &Project, target: &Target) -> FlagBundle {
    let mut flags = FlagBundle::default();
    let mut seen = HashSet::new();
    let mut stack = vec![target];
    while let Some(current) = stack.pop() {
        if !seen.insert(current.name.as_str()) {
            continue;
        }
        let own = &current.flags;
        for d in &own.include_dirs {
            flags.add_include_dir(d.as_str());
        }
        for d in &own.system_include_dirs {
            flags.add_system_include_dir(d.as_str());
        }
        for d in &own.defines {
            flags.add_define(d.as_str());
        }
        if current.name == target.name {
            flags.compile_flags.extend(own.compile_flags.iter().cloned());
        }
        for dep in current.dependencies.iter().rev() {
            if let Some(t) = project.target(dep) {
                stack.push(t);
            }
        }
    }
    flags
}

/// What linking a target pulls in beyond its own objects.
pub(crate) struct LinkClosure<'p> {
    /// Dependency targets, every dependent before its dependencies
    pub targets: Vec<&'p Target>,

    /// Link flags, libraries and frameworks of the target and of every
    /// dependency that does not link on its own
    pub flags: FlagBundle,
}

/// Everything `target` links, following static dependencies transitively.
///
/// Shared libraries are linked but not descended into; they carry their
/// own dependencies.
pub(crate) fn link_closure<'p>(project: &'p Project, target: &'p Target) -> LinkClosure<'p> {
    fn visit<'p>(
        project: &'p Project,
        target: &'p Target,
        seen: &mut HashSet<&'p str>,
        order: &mut Vec<&'p Target>,
    ) {
        for dep in &target.dependencies {
            let Some(t) = project.target(dep) else { continue };
            if !seen.insert(t.name.as_str()) {
                continue;
            }
            if t.kind != TargetKind::SharedLibrary {
                visit(project, t, seen, order);
            }
            order.push(t);
        }
    }

    let mut seen = HashSet::new();
    seen.insert(target.name.as_str());
    let mut targets = Vec::new();
    visit(project, target, &mut seen, &mut targets);
    targets.reverse();

    let mut flags = FlagBundle::default();
    let own = std::iter::once(target);
    let inherited = targets.iter().copied().filter(|t| t.kind != TargetKind::SharedLibrary);
    for current in own.chain(inherited) {
        for f in &current.flags.link_flags {
            flags.add_link_flag(f.as_str());
        }
        for l in &current.flags.link_libraries {
            flags.add_link_library(l.as_str());
        }
        for f in &current.flags.frameworks {
            flags.add_framework(f.as_str());
        }
    }
    LinkClosure { targets, flags }
}

/// Sources of a target with patterns expanded.
pub(crate) fn resolved_sources(
    project: &Project,
    target: &Target,
    ctx: &ExportContext<'_>,
    warnings: &mut Vec<TranslationWarning>,
) -> Vec<String> {
    let mut out = Vec::new();
    for source in &target.sources {
        if !is_glob_pattern(source) {
            out.push(source.clone());
            continue;
        }
        let found = ctx.resolver.resolve(&project.source_root, source);
        if found.is_empty() {
            warnings.push(TranslationWarning::warning(format!(
                "pattern `{}` of target `{}` matches no files",
                source, target.name
            )));
        }
        out.extend(found.into_iter().filter(|f| !is_header(f)));
    }
    out
}

/// Object file for `source` inside a per-target directory: `src/core.cpp`
/// becomes `core/src_core.o`.
pub(crate) fn object_file(target: &str, source: &str) -> String {
    let stem = source.rsplit_once('.').map(|(s, _)| s).unwrap_or(source);
    let flat: String = stem
        .trim_start_matches("./")
        .replace("../", "up_")
        .chars()
        .map(|c| if c == '/' { '_' } else { c })
        .collect();
    format!("{}/{}.o", target, flat)
}

/// Identifier-safe form of a target or project name.
pub(crate) fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) || out.is_empty() {
        out.insert(0, '_');
    }
    out
}

/// Quote a word for a POSIX shell when it needs it.
pub(crate) fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=+:,@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_resolver() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src/sub")).unwrap();
        std::fs::write(tmp.path().join("src/a.cpp"), "").unwrap();
        std::fs::write(tmp.path().join("src/sub/b.cpp"), "").unwrap();

        let resolver = GlobResolver;
        assert_eq!(
            resolver.resolve(tmp.path(), "src/**/*.cpp"),
            vec!["src/a.cpp", "src/sub/b.cpp"]
        );
        assert_eq!(resolver.resolve(tmp.path(), "src/missing.cpp"), vec!["src/missing.cpp"]);
    }

    #[test]
    fn test_context_paths() {
        let ctx = ExportContext {
            source_prefix: "../src-tree".to_string(),
            ..ExportContext::default()
        };
        assert_eq!(ctx.path("src/main.cpp"), "../src-tree/src/main.cpp");
        assert_eq!(ctx.path("."), "../src-tree");
        assert_eq!(ctx.path("/usr/include"), "/usr/include");
        assert_eq!(ExportContext::default().path("src/main.cpp"), "src/main.cpp");
    }

    #[test]
    fn test_every_format_renders_sample() {
        let project = crate::test_support::sample_project();
        let ctx = ExportContext::default();
        for format in BuildFormat::ALL {
            let rendered = render(format, &project, &ctx).unwrap();
            assert!(!rendered.contents.is_empty(), "{} rendered nothing", format);
        }
    }

    #[test]
    fn test_usage_flags_are_transitive() {
        let project = crate::test_support::sample_project();
        let app = project.target("app").unwrap();
        let usage = usage_flags(&project, app);
        assert_eq!(usage.include_dirs, vec!["include"]);
        assert_eq!(usage.defines, vec!["CORE_STATIC"]);
        // Raw compile flags stay with their own target
        assert!(usage.compile_flags.is_empty());
        assert_eq!(object_file("core", "../src/core.cpp"), "core/up_src_core.o");
    }

    #[test]
    fn test_link_closure_is_transitive() {
        let mut project = Project::new("chain", "/tmp/chain");
        let mut util = Target::static_library("util").with_sources(["util.c"]);
        util.flags.add_link_library("pthread");
        project.add_target(util);
        let mut plugin = Target::shared_library("plugin")
            .with_sources(["plugin.c"])
            .with_dependency("util");
        plugin.flags.add_link_library("dl");
        project.add_target(plugin);
        project.add_target(
            Target::static_library("core")
                .with_sources(["core.c"])
                .with_dependency("util")
                .with_dependency("plugin"),
        );
        project.add_target(
            Target::executable("app")
                .with_sources(["main.c"])
                .with_dependency("util")
                .with_dependency("core"),
        );

        let app = project.target("app").unwrap();
        let closure = link_closure(&project, app);
        let names: Vec<&str> = closure.targets.iter().map(|t| t.name.as_str()).collect();
        // core needs util, so util comes after it
        assert_eq!(names, vec!["core", "plugin", "util"]);
        // the shared library keeps its own `-ldl`
        assert_eq!(closure.flags.link_libraries, vec!["pthread"]);
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("my-lib"), "my_lib");
        assert_eq!(sanitize_identifier("3d"), "_3d");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("-DNAME=1"), "-DNAME=1");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }
}
