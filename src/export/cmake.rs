//! CMake exporter.

use std::fmt::{self, Write};

use url::Url;

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::language::Language;
use crate::core::project::Project;
use crate::core::target::{Target, TargetKind};
use crate::export::{sanitize_identifier, ExportContext, Rendered};
use crate::util::fs::is_glob_pattern;

const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".tar.xz", ".tar.bz2", ".zip", ".7z"];

/// How a dependency with a URL locator is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSource {
    Git(String),
    Archive(String),
}

/// Decide between a git repository and a downloadable archive.
pub fn fetch_source(locator: &str) -> Option<FetchSource> {
    let url = Url::parse(locator).ok()?;
    let path = url.path().to_ascii_lowercase();
    if ARCHIVE_SUFFIXES.iter().any(|s| path.ends_with(s)) {
        return Some(FetchSource::Archive(locator.to_string()));
    }
    let is_git = matches!(url.scheme(), "git" | "ssh" | "git+ssh")
        || path.ends_with(".git")
        || matches!(
            url.host_str(),
            Some("github.com" | "gitlab.com" | "bitbucket.org")
        );
    match (is_git, url.scheme()) {
        (true, _) => Some(FetchSource::Git(locator.to_string())),
        (false, "http" | "https" | "file") => Some(FetchSource::Archive(locator.to_string())),
        _ => None,
    }
}

fn languages(project: &Project) -> &'static str {
    let mut c = false;
    let mut cxx = project.cxx_standard.is_some();
    for target in project.targets() {
        for source in &target.sources {
            match Language::from_path(source) {
                Some(Language::C) => c = true,
                Some(_) => cxx = true,
                None => cxx |= target.is_cxx(),
            }
        }
    }
    match (c, cxx) {
        (true, false) => "C",
        (false, true) => "CXX",
        _ => "C CXX",
    }
}

fn quote(value: &str) -> String {
    if !value.is_empty()
        && !value.contains(|c: char| c.is_whitespace() || matches!(c, '"' | ';' | '(' | ')' | '#'))
    {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Render a `CMakeLists.txt`.
pub fn render(project: &Project, ctx: &ExportContext<'_>) -> Result<Rendered, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "cmake_minimum_required(VERSION 3.16)")?;
    write!(out, "project({}", quote(&project.name))?;
    if let Some(ref version) = project.version {
        if version.chars().all(|c| c.is_ascii_digit() || c == '.') {
            write!(out, " VERSION {}", version)?;
        }
    }
    if let Some(ref description) = project.description {
        write!(out, " DESCRIPTION {}", quote(description))?;
    }
    if let Some(ref homepage) = project.homepage {
        write!(out, " HOMEPAGE_URL {}", quote(homepage))?;
    }
    writeln!(out, " LANGUAGES {})", languages(project))?;

    if let Some(std) = project.cxx_standard {
        writeln!(out)?;
        writeln!(out, "set(CMAKE_CXX_STANDARD {})", std.as_number())?;
        writeln!(out, "set(CMAKE_CXX_STANDARD_REQUIRED ON)")?;
    }

    write_dependencies(&mut out, project.dependencies())?;

    for target in project.targets_in_dependency_order() {
        writeln!(out)?;
        write_target(&mut out, target, ctx)?;
    }

    Ok(Rendered::new(out))
}

fn write_dependencies(out: &mut String, deps: &[Dependency]) -> fmt::Result {
    let mut fetched = Vec::new();
    let mut found = Vec::new();
    for dep in deps {
        match dep.source.as_deref().and_then(fetch_source) {
            Some(source) => fetched.push((dep, source)),
            None => found.push(dep),
        }
    }

    if !found.is_empty() {
        writeln!(out)?;
    }
    for dep in found {
        write!(out, "find_package({}", dep.name)?;
        if let Some((_, version)) = dep.version_parts() {
            if version.starts_with(|c: char| c.is_ascii_digit()) {
                write!(out, " {}", version.split_whitespace().next().unwrap_or(version))?;
            }
        }
        match dep.kind {
            DependencyKind::Optional | DependencyKind::Dev => writeln!(out, " QUIET)")?,
            DependencyKind::Build | DependencyKind::System => writeln!(out, " REQUIRED)")?,
        }
    }

    if fetched.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "include(FetchContent)")?;
    for (dep, source) in &fetched {
        writeln!(out, "FetchContent_Declare({}", dep.name)?;
        match source {
            FetchSource::Git(url) => {
                writeln!(out, "    GIT_REPOSITORY {}", url)?;
                if let Some((_, tag)) = dep.version_parts() {
                    writeln!(out, "    GIT_TAG {}", quote(tag))?;
                }
            }
            FetchSource::Archive(url) => writeln!(out, "    URL {}", url)?,
        }
        writeln!(out, ")")?;
    }
    let names: Vec<&str> = fetched.iter().map(|(d, _)| d.name.as_str()).collect();
    writeln!(out, "FetchContent_MakeAvailable({})", names.join(" "))?;
    Ok(())
}

fn write_target(out: &mut String, target: &Target, ctx: &ExportContext<'_>) -> fmt::Result {
    let name = &target.name;
    let mut files: Vec<String> = Vec::new();
    let mut patterns: Vec<String> = Vec::new();
    for file in target.sources.iter().chain(&target.headers) {
        if is_glob_pattern(file) {
            patterns.push(ctx.path(file));
        } else {
            files.push(ctx.path(file));
        }
    }
    if !patterns.is_empty() && target.kind.has_artifact() {
        let var = format!("{}_SOURCES", sanitize_identifier(name));
        writeln!(
            out,
            "file(GLOB_RECURSE {} CONFIGURE_DEPENDS {})",
            var,
            patterns.join(" ")
        )?;
        files.insert(0, format!("${{{}}}", var));
    }

    let (command, kind_word, scope) = match target.kind {
        TargetKind::Executable => ("add_executable", "", "PRIVATE"),
        TargetKind::StaticLibrary => ("add_library", " STATIC", "PUBLIC"),
        TargetKind::SharedLibrary => ("add_library", " SHARED", "PUBLIC"),
        TargetKind::ObjectLibrary => ("add_library", " OBJECT", "PUBLIC"),
        TargetKind::HeaderOnly | TargetKind::Interface => ("add_library", " INTERFACE", "INTERFACE"),
    };
    if !target.kind.has_artifact() {
        files.clear();
    }
    match files.as_slice() {
        [] => writeln!(out, "{}({}{})", command, name, kind_word)?,
        [single] => writeln!(out, "{}({}{} {})", command, name, kind_word, single)?,
        many => {
            writeln!(out, "{}({}{}", command, name, kind_word)?;
            for file in many {
                writeln!(out, "    {}", file)?;
            }
            writeln!(out, ")")?;
        }
    }

    let flags = &target.flags;
    let private = if target.kind.has_artifact() { "PRIVATE" } else { "INTERFACE" };
    write_list(out, "target_include_directories", name, scope, &ctx.paths(&flags.include_dirs))?;
    if !flags.system_include_dirs.is_empty() {
        let dirs = ctx.paths(&flags.system_include_dirs);
        writeln!(
            out,
            "target_include_directories({} SYSTEM {} {})",
            name,
            scope,
            dirs.join(" ")
        )?;
    }
    let defines: Vec<String> = flags.defines.iter().map(|d| quote(d)).collect();
    write_list(out, "target_compile_definitions", name, scope, &defines)?;
    let options: Vec<String> = flags.compile_flags.iter().map(|f| quote(f)).collect();
    write_list(out, "target_compile_options", name, private, &options)?;

    let mut links: Vec<String> = target.dependencies.clone();
    links.extend(flags.link_libraries.iter().map(|l| quote(l)));
    links.extend(flags.frameworks.iter().map(|f| format!("\"-framework {}\"", f)));
    write_list(out, "target_link_libraries", name, scope, &links)?;
    let link_options: Vec<String> = flags.link_flags.iter().map(|f| quote(f)).collect();
    write_list(out, "target_link_options", name, private, &link_options)?;
    Ok(())
}

fn write_list(
    out: &mut String,
    command: &str,
    target: &str,
    scope: &str,
    items: &[String],
) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}({} {} {})", command, target, scope, items.join(" "))
}
