//! `meson.build` exporter.

use std::fmt::{self, Write};

use crate::core::dependency::DependencyKind;
use crate::core::language::Language;
use crate::core::project::Project;
use crate::core::target::{link_library_flag, Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::export::{resolved_sources, sanitize_identifier, usage_flags, ExportContext, Rendered};
use crate::util::diagnostic::suggestions;

/// Quote a Meson string literal.
fn string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn array<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let items: Vec<String> = values.into_iter().map(string).collect();
    format!("[{}]", items.join(", "))
}

fn function(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Executable => "executable",
        TargetKind::StaticLibrary | TargetKind::ObjectLibrary => "static_library",
        TargetKind::SharedLibrary => "shared_library",
        TargetKind::HeaderOnly | TargetKind::Interface => "declare_dependency",
    }
}

fn languages(project: &Project) -> Vec<&'static str> {
    let mut c = false;
    let mut cpp = project.cxx_standard.is_some();
    for source in project.targets().iter().flat_map(|t| &t.sources) {
        match Language::from_path(source) {
            Some(Language::C) | Some(Language::ObjC) => c = true,
            Some(Language::Cxx) | Some(Language::ObjCxx) => cpp = true,
            None => {}
        }
    }
    let mut out = Vec::new();
    if c {
        out.push("c");
    }
    if cpp || !c {
        out.push("cpp");
    }
    out
}

/// Render `meson.build`.
pub fn render(project: &Project, ctx: &ExportContext<'_>) -> Result<Rendered, fmt::Error> {
    let mut out = String::new();
    let mut warnings = Vec::new();

    writeln!(out, "project({}, {},", string(&project.name), array(languages(project)))?;
    if let Some(ref version) = project.version {
        writeln!(out, "  version : {},", string(version))?;
    }
    if let Some(ref license) = project.license {
        writeln!(out, "  license : {},", string(license))?;
    }
    if let Some(std) = project.cxx_standard {
        writeln!(
            out,
            "  default_options : [{}],",
            string(&format!("cpp_std={}", std.as_flag_value()))
        )?;
    }
    writeln!(out, ")")?;

    if !project.dependencies().is_empty() {
        writeln!(out)?;
    }
    for dep in project.dependencies() {
        if let Some(ref source) = dep.source {
            writeln!(out, "# {} is fetched from {}", dep.name, source)?;
        }
        let mut args = vec![string(&dep.name)];
        if let Some(ref version) = dep.version {
            args.push(format!("version : {}", string(version)));
        }
        match dep.kind {
            DependencyKind::Optional => args.push("required : false".to_string()),
            DependencyKind::Dev => args.push("native : true".to_string()),
            DependencyKind::Build | DependencyKind::System => {}
        }
        writeln!(
            out,
            "{}_dep = dependency({})",
            sanitize_identifier(&dep.name),
            args.join(", ")
        )?;
    }

    for target in project.targets_in_dependency_order() {
        if target.kind == TargetKind::ObjectLibrary {
            warnings.push(
                TranslationWarning::warning(format!(
                    "object library `{}` is exported as a static library",
                    target.name
                ))
                .with_suggestion(suggestions::UNSUPPORTED_KIND),
            );
        }
        writeln!(out)?;
        write_target(&mut out, project, target, ctx, &mut warnings)?;
    }

    Ok(Rendered {
        contents: out,
        siblings: Vec::new(),
        warnings,
    })
}

fn write_target(
    out: &mut String,
    project: &Project,
    target: &Target,
    ctx: &ExportContext<'_>,
    warnings: &mut Vec<TranslationWarning>,
) -> fmt::Result {
    let id = sanitize_identifier(&target.name);
    let header_only = !target.kind.has_artifact();
    let usage = if header_only {
        target.flags.clone()
    } else {
        usage_flags(project, target)
    };

    let mut files: Vec<String> = resolved_sources(project, target, ctx, warnings)
        .iter()
        .map(|s| ctx.path(s))
        .collect();
    files.extend(target.headers.iter().map(|h| ctx.path(h)));

    let mut args: Vec<String> = Vec::new();
    if !usage.include_dirs.is_empty() {
        let dirs = ctx.paths(&usage.include_dirs);
        args.push(format!(
            "include_directories : include_directories({})",
            dirs.iter().map(|d| string(d)).collect::<Vec<_>>().join(", ")
        ));
    }
    if !usage.system_include_dirs.is_empty() {
        let dirs = ctx.paths(&usage.system_include_dirs);
        args.push(format!(
            "include_directories : include_directories({}, is_system : true)",
            dirs.iter().map(|d| string(d)).collect::<Vec<_>>().join(", ")
        ));
    }
    let compile: Vec<String> = usage
        .defines
        .iter()
        .map(|d| format!("-D{}", d))
        .chain(usage.compile_flags.iter().cloned())
        .collect();
    if !compile.is_empty() {
        let key = if header_only {
            "compile_args"
        } else if target.is_cxx() || project.cxx_standard.is_some() {
            "cpp_args"
        } else {
            "c_args"
        };
        args.push(format!("{} : {}", key, array(compile.iter().map(String::as_str))));
    }

    let mut link_with = Vec::new();
    let mut dependencies = Vec::new();
    for dep in &target.dependencies {
        match project.target(dep) {
            Some(t) if t.kind.has_artifact() => link_with.push(sanitize_identifier(dep)),
            Some(_) => dependencies.push(format!("{}_dep", sanitize_identifier(dep))),
            None => {}
        }
    }
    if !link_with.is_empty() {
        args.push(format!("link_with : [{}]", link_with.join(", ")));
    }
    if !dependencies.is_empty() {
        args.push(format!("dependencies : [{}]", dependencies.join(", ")));
    }

    let mut link: Vec<String> = target.flags.link_flags.clone();
    link.extend(target.flags.link_libraries.iter().map(|l| link_library_flag(l)));
    for framework in &target.flags.frameworks {
        link.push("-framework".to_string());
        link.push(framework.clone());
    }
    if !link.is_empty() {
        args.push(format!("link_args : {}", array(link.iter().map(String::as_str))));
    }

    if header_only {
        if !files.is_empty() {
            args.insert(0, format!("sources : {}", array(files.iter().map(String::as_str))));
        }
        writeln!(out, "{}_dep = declare_dependency(", id)?;
    } else {
        writeln!(out, "{} = {}({},", id, function(target.kind), string(&target.name))?;
        for file in &files {
            writeln!(out, "  {},", string(file))?;
        }
    }
    for arg in &args {
        writeln!(out, "  {},", arg)?;
    }
    writeln!(out, ")")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{meson, ImportOptions};
    use crate::test_support::{sample_project, write_tree};
    use tempfile::TempDir;

    #[test]
    fn test_render_sample() {
        let text = render(&sample_project(), &ExportContext::default())
            .unwrap()
            .contents;
        assert!(text.starts_with(
            "project('demo', ['cpp'],\n  version : '1.2.0',\n  default_options : ['cpp_std=c++17'],\n)\n"
        ));
        assert!(text.contains("zlib_dep = dependency('zlib', version : '>=1.2.11')\n"));
        assert!(text.contains("# fmt is fetched from https://github.com/fmtlib/fmt.git\n"));
        assert!(text.contains(
            "core = static_library('core',\n  'src/core.cpp',\n  'include/core.h',\n  include_directories : include_directories('include'),\n  cpp_args : ['-DCORE_STATIC', '-Wall'],\n)\n"
        ));
        assert!(text.contains("  link_with : [core],\n  link_args : ['-lpthread'],\n"));
        // dependencies come first
        assert!(text.find("core = static_library").unwrap() < text.find("app = executable").unwrap());
    }

    #[test]
    fn test_export_reimports() {
        let text = render(&sample_project(), &ExportContext::default())
            .unwrap()
            .contents;
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("meson.build", &text)]);
        let project = meson::import(&tmp.path().join("meson.build"), &ImportOptions::default()).unwrap();

        assert_eq!(project.name, "demo");
        assert_eq!(project.version.as_deref(), Some("1.2.0"));
        let core = project.target("core").unwrap();
        assert_eq!(core.kind, TargetKind::StaticLibrary);
        assert_eq!(core.sources, vec!["src/core.cpp"]);
        assert_eq!(core.headers, vec!["include/core.h"]);
        assert_eq!(core.flags.defines, vec!["CORE_STATIC"]);
        let app = project.target("app").unwrap();
        assert_eq!(app.dependencies, vec!["core"]);
        assert_eq!(app.flags.link_libraries, vec!["pthread"]);
        assert_eq!(project.dependency("zlib").unwrap().version.as_deref(), Some(">=1.2.11"));
    }

    #[test]
    fn test_header_only_becomes_declared_dependency() {
        let mut project = Project::new("h", "/tmp/h");
        let mut headers = Target::new("util", TargetKind::HeaderOnly);
        headers.flags.add_include_dir("util/include");
        project.add_target(headers);
        project.add_target(Target::executable("tool").with_sources(["main.c"]).with_dependency("util"));

        let text = render(&project, &ExportContext::default()).unwrap().contents;
        assert!(text.contains(
            "util_dep = declare_dependency(\n  include_directories : include_directories('util/include'),\n)\n"
        ));
        assert!(text.contains("  dependencies : [util_dep],\n"));
        assert!(text.starts_with("project('h', ['c'],\n"));
    }

    #[test]
    fn test_string_quoting() {
        assert_eq!(string("it's"), "'it\\'s'");
    }
}
