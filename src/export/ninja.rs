//! Ninja exporter.
//!
//! Ninja has no globbing, so source patterns are resolved against the source
//! tree at export time.

use std::fmt::{self, Write};

use crate::core::language::Language;
use crate::core::project::Project;
use crate::core::target::{Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::export::{
    link_closure, object_file, resolved_sources, shell_quote, usage_flags, ExportContext,
    Rendered,
};

/// Escape a path for a `build` line.
fn escape_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '$' => out.push_str("$$"),
            ' ' => out.push_str("$ "),
            ':' => out.push_str("$:"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    value.replace('$', "$$")
}

/// What a target leaves behind for its dependents to link.
fn link_inputs(target: &Target, objects: &[String]) -> Vec<String> {
    match target.kind {
        TargetKind::Executable | TargetKind::HeaderOnly | TargetKind::Interface => Vec::new(),
        TargetKind::StaticLibrary | TargetKind::SharedLibrary => {
            vec![target.output_filename("linux")]
        }
        TargetKind::ObjectLibrary => objects.to_vec(),
    }
}

/// Render a `build.ninja`.
pub fn render(project: &Project, ctx: &ExportContext<'_>) -> Result<Rendered, fmt::Error> {
    let mut out = String::new();
    let mut warnings = Vec::new();

    writeln!(out, "# Ninja build for {}", project.name)?;
    writeln!(out, "ninja_required_version = 1.5")?;
    writeln!(out)?;
    writeln!(out, "builddir = build")?;
    writeln!(out, "cc = cc")?;
    writeln!(out, "cxx = {}", ctx.compiler)?;
    writeln!(out, "ar = ar")?;
    match project.cxx_standard {
        Some(std) => writeln!(out, "cxxflags = -std={}", std.as_flag_value())?,
        None => writeln!(out, "cxxflags =")?,
    }
    writeln!(out, "cflags =")?;
    writeln!(out, "ldflags =")?;
    writeln!(out)?;
    write_rules(&mut out)?;

    let mut produced: Vec<(String, Vec<String>)> = Vec::new();
    let mut defaults = Vec::new();
    for target in project.targets_in_dependency_order() {
        let sources = resolved_sources(project, target, ctx, &mut warnings);
        let objects = write_target(&mut out, project, target, &sources, &produced, ctx)?;
        let inputs = link_inputs(target, &objects);
        match target.kind {
            TargetKind::Executable => defaults.push(escape_path(&target.name)),
            TargetKind::ObjectLibrary => {
                writeln!(out, "build {}: phony {}", escape_path(&target.name), objects.join(" "))?;
            }
            _ => defaults.extend(inputs.iter().cloned()),
        }
        produced.push((target.name.clone(), inputs));
    }

    if !defaults.is_empty() {
        writeln!(out)?;
        writeln!(out, "default {}", defaults.join(" "))?;
    }

    Ok(Rendered {
        contents: out,
        siblings: Vec::new(),
        warnings,
    })
}

fn write_rules(out: &mut String) -> fmt::Result {
    for (rule, compiler, flags, label) in [
        ("cc", "$cc", "$cflags", "CC"),
        ("cxx", "$cxx", "$cxxflags", "CXX"),
    ] {
        writeln!(out, "rule {}", rule)?;
        writeln!(
            out,
            "  command = {} {} $flags -MMD -MF $out.d -c $in -o $out",
            compiler, flags
        )?;
        writeln!(out, "  depfile = $out.d")?;
        writeln!(out, "  deps = gcc")?;
        writeln!(out, "  description = {} $out", label)?;
        writeln!(out)?;
    }
    writeln!(out, "rule ar")?;
    writeln!(out, "  command = rm -f $out && $ar rcs $out $in")?;
    writeln!(out, "  description = AR $out")?;
    writeln!(out)?;
    for (rule, compiler, shared) in [
        ("link_cc", "$cc", ""),
        ("link_cxx", "$cxx", ""),
        ("shared_cc", "$cc", " -shared"),
        ("shared_cxx", "$cxx", " -shared"),
    ] {
        writeln!(out, "rule {}", rule)?;
        writeln!(out, "  command = {}{} $ldflags -o $out $in $libs", compiler, shared)?;
        writeln!(out, "  description = LINK $out")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Write the build statements of one target, returning its object files.
fn write_target(
    out: &mut String,
    project: &Project,
    target: &Target,
    sources: &[String],
    produced: &[(String, Vec<String>)],
    ctx: &ExportContext<'_>,
) -> Result<Vec<String>, fmt::Error> {
    if !target.kind.has_artifact() {
        return Ok(Vec::new());
    }
    writeln!(out, "# {} ({})", target.name, target.kind)?;

    let mut usage = usage_flags(project, target);
    usage.include_dirs = ctx.paths(&usage.include_dirs);
    usage.system_include_dirs = ctx.paths(&usage.system_include_dirs);
    let mut flags: Vec<String> = usage.compile_args().iter().map(|a| shell_quote(a)).collect();
    if matches!(target.kind, TargetKind::SharedLibrary | TargetKind::ObjectLibrary) {
        flags.push("-fPIC".to_string());
    }
    let flags = escape_value(&flags.join(" "));

    let mut objects = Vec::new();
    let mut cxx = false;
    for source in sources {
        let rule = if Language::from_path(source).is_some_and(|l| l.needs_cxx_driver()) {
            "cxx"
        } else {
            "cc"
        };
        cxx |= rule == "cxx";
        let object = format!("$builddir/{}", object_file(&target.name, source));
        writeln!(out, "build {}: {} {}", object, rule, escape_path(&ctx.path(source)))?;
        if !flags.is_empty() {
            writeln!(out, "  flags = {}", flags)?;
        }
        objects.push(object);
    }

    let closure = link_closure(project, target);
    let mut inputs = objects.clone();
    for dep in &closure.targets {
        if let Some((_, files)) = produced.iter().find(|(name, _)| name == &dep.name) {
            inputs.extend(files.iter().cloned());
        }
    }
    let driver = if cxx { "cxx" } else { "cc" };
    let libs: Vec<String> = closure
        .flags
        .link_args()
        .iter()
        .map(|a| shell_quote(a))
        .collect();

    let statement = match target.kind {
        TargetKind::StaticLibrary => Some((target.output_filename("linux"), "ar".to_string())),
        TargetKind::SharedLibrary => {
            Some((target.output_filename("linux"), format!("shared_{}", driver)))
        }
        TargetKind::Executable => Some((target.output_filename("linux"), format!("link_{}", driver))),
        _ => None,
    };
    if let Some((output, rule)) = statement {
        let inputs = if rule == "ar" { &objects } else { &inputs };
        writeln!(out, "build {}: {} {}", escape_path(&output), rule, inputs.join(" "))?;
        if rule != "ar" && !libs.is_empty() {
            writeln!(out, "  libs = {}", escape_value(&libs.join(" ")))?;
        }
    }
    writeln!(out)?;
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::SourcePatternResolver;
    use crate::test_support::sample_project;
    use std::path::Path;

    struct FixedResolver;

    impl SourcePatternResolver for FixedResolver {
        fn resolve(&self, _root: &Path, pattern: &str) -> Vec<String> {
            match pattern {
                "src/*.cpp" => vec!["src/a.cpp".to_string(), "src/b.cpp".to_string()],
                _ => Vec::new(),
            }
        }
    }

    #[test]
    fn test_render_sample() {
        let text = render(&sample_project(), &ExportContext::default())
            .unwrap()
            .contents;
        assert!(text.contains("cxxflags = -std=c++17\n"));
        assert!(text.contains("rule cxx\n  command = $cxx $cxxflags $flags -MMD -MF $out.d -c $in -o $out\n"));
        assert!(text.contains(
            "build $builddir/core/src_core.o: cxx src/core.cpp\n  flags = -Iinclude -DCORE_STATIC -Wall\n"
        ));
        assert!(text.contains("build libcore.a: ar $builddir/core/src_core.o\n"));
        assert!(text.contains(
            "build app: link_cxx $builddir/app/src_main.o libcore.a\n  libs = -lpthread\n"
        ));
        assert!(text.contains("default libcore.a app\n"));
    }

    #[test]
    fn test_glob_sources_are_resolved() {
        let mut project = Project::new("g", "/tmp/g");
        project.add_target(Target::executable("tool").with_sources(["src/*.cpp", "src/*.c"]));
        let ctx = ExportContext {
            resolver: &FixedResolver,
            ..ExportContext::default()
        };
        let rendered = render(&project, &ctx).unwrap();
        assert!(rendered.contents.contains("build $builddir/tool/src_a.o: cxx src/a.cpp\n"));
        assert!(rendered.contents.contains("build $builddir/tool/src_b.o: cxx src/b.cpp\n"));
        assert!(rendered
            .contents
            .contains("build tool: link_cxx $builddir/tool/src_a.o $builddir/tool/src_b.o\n"));
        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.warnings[0].message.contains("src/*.c"));
    }

    #[test]
    fn test_object_library_links_objects() {
        let mut project = Project::new("o", "/tmp/o");
        project.add_target(Target::new("objs", TargetKind::ObjectLibrary).with_sources(["x.c"]));
        project.add_target(Target::executable("app").with_sources(["main.c"]).with_dependency("objs"));
        let text = render(&project, &ExportContext::default()).unwrap().contents;
        assert!(text.contains("build $builddir/objs/x.o: cc x.c\n  flags = -fPIC\n"));
        assert!(text.contains("build objs: phony $builddir/objs/x.o\n"));
        assert!(text.contains("build app: link_cc $builddir/app/main.o $builddir/objs/x.o\n"));
    }

    #[test]
    fn test_links_static_chain_transitively() {
        let mut project = Project::new("chain", "/tmp/chain");
        let mut util = Target::static_library("util").with_sources(["util.c"]);
        util.flags.add_link_library("pthread");
        project.add_target(util);
        project.add_target(Target::static_library("core").with_sources(["core.c"]).with_dependency("util"));
        project.add_target(Target::executable("app").with_sources(["main.c"]).with_dependency("core"));

        let text = render(&project, &ExportContext::default()).unwrap().contents;
        assert!(text.contains(
            "build app: link_cc $builddir/app/main.o libcore.a libutil.a\n  libs = -lpthread\n"
        ));
    }

    #[test]
    fn test_escape_path() {
        assert_eq!(escape_path("my dir/a:b.c"), "my$ dir/a$:b.c");
    }
}
