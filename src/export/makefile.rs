//! Makefile exporter.
//!
//! Recipes name every source literally so the output reads without the
//! generator at hand. Executables and shared libraries compile and link in
//! one command; static libraries build objects under `$(BUILD_DIR)` and
//! archive them.

use std::fmt::{self, Write};

use crate::core::language::Language;
use crate::core::project::Project;
use crate::core::target::{link_library_flag, Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::export::{
    link_closure, object_file, shell_quote, usage_flags, ExportContext, Rendered,
};
use crate::util::diagnostic::suggestions;
use crate::util::fs::is_glob_pattern;

/// File produced by a target, if it produces one.
pub fn output_name(target: &Target) -> Option<String> {
    target
        .kind
        .has_artifact()
        .then(|| target.output_filename("linux"))
}

fn make_escape(word: &str) -> String {
    shell_quote(word).replace('$', "$$")
}

fn uses_cxx(project: &Project, target: &Target) -> bool {
    target.is_cxx()
        || (project.cxx_standard.is_some()
            && !target
                .sources
                .iter()
                .all(|s| Language::from_path(s) == Some(Language::C)))
}

fn object_path(target: &str, source: &str) -> String {
    format!("$(BUILD_DIR)/{}", object_file(target, source))
}

/// Render a Makefile.
pub fn render(project: &Project, ctx: &ExportContext<'_>) -> Result<Rendered, fmt::Error> {
    let mut out = String::new();
    let mut warnings = Vec::new();
    let targets = project.targets_in_dependency_order();

    writeln!(out, "# Makefile for {}", project.name)?;
    writeln!(out)?;
    writeln!(out, "CC ?= cc")?;
    writeln!(out, "CXX = {}", ctx.compiler)?;
    writeln!(out, "AR ?= ar")?;
    writeln!(out, "BUILD_DIR ?= build")?;
    writeln!(out, "CFLAGS ?=")?;
    writeln!(out, "CXXFLAGS ?=")?;
    writeln!(out, "LDFLAGS ?=")?;
    if let Some(std) = project.cxx_standard {
        writeln!(out, "CXXFLAGS += -std={}", std.as_flag_value())?;
    }
    writeln!(out)?;

    let outputs: Vec<String> = targets.iter().filter_map(|t| output_name(t)).collect();
    writeln!(out, ".PHONY: all clean")?;
    writeln!(out, "all: {}", outputs.join(" "))?;

    for target in &targets {
        let Some(output) = output_name(target) else { continue };
        if target.kind == TargetKind::ObjectLibrary {
            warnings.push(
                TranslationWarning::warning(format!(
                    "object library `{}` is exported as a static archive",
                    target.name
                ))
                .with_suggestion(suggestions::UNSUPPORTED_KIND),
            );
        }
        writeln!(out)?;
        write_target(&mut out, project, target, &output, ctx)?;
    }

    writeln!(out)?;
    writeln!(out, "clean:")?;
    if !outputs.is_empty() {
        writeln!(out, "\trm -f {}", outputs.join(" "))?;
    }
    writeln!(out, "\trm -rf $(BUILD_DIR)")?;

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
    output: &str,
    ctx: &ExportContext<'_>,
) -> fmt::Result {
    let cxx = uses_cxx(project, target);
    let (compiler, flags_var) = if cxx {
        ("$(CXX)", "$(CXXFLAGS)")
    } else {
        ("$(CC)", "$(CFLAGS)")
    };

    let usage = usage_flags(project, target);
    let mut compile = usage.clone();
    compile.include_dirs = ctx.paths(&usage.include_dirs);
    compile.system_include_dirs = ctx.paths(&usage.system_include_dirs);
    let compile_args: Vec<String> = compile.compile_args().iter().map(|a| make_escape(a)).collect();

    let sources: Vec<String> = target
        .sources
        .iter()
        .map(|s| {
            let path = ctx.path(s);
            if is_glob_pattern(&path) {
                format!("$(wildcard {})", path.replace("**/", ""))
            } else {
                path
            }
        })
        .collect();
    let headers: Vec<String> = target
        .headers
        .iter()
        .filter(|h| !is_glob_pattern(h))
        .map(|h| ctx.path(h))
        .collect();

    let closure = link_closure(project, target);
    let archives: Vec<String> = closure
        .targets
        .iter()
        .filter_map(|t| output_name(t))
        .collect();

    let mut prerequisites = sources.clone();
    prerequisites.extend(headers);
    prerequisites.extend(archives.iter().cloned());
    writeln!(out, "{}: {}", output, prerequisites.join(" "))?;

    let compile_line = |extra: &str| {
        let mut parts = vec![compiler.to_string(), flags_var.to_string()];
        parts.extend(compile_args.iter().cloned());
        if !extra.is_empty() {
            parts.push(extra.to_string());
        }
        parts.join(" ")
    };

    match target.kind {
        TargetKind::StaticLibrary | TargetKind::ObjectLibrary => {
            writeln!(out, "\t@mkdir -p $(BUILD_DIR)/{}", target.name)?;
            let mut objects = Vec::new();
            for source in &sources {
                if source.starts_with("$(wildcard") {
                    writeln!(
                        out,
                        "\tfor f in {}; do {} -c $$f -o $(BUILD_DIR)/{}/$$(basename $$f).o || exit 1; done",
                        source,
                        compile_line(""),
                        target.name
                    )?;
                    objects.push(format!("$(BUILD_DIR)/{}/*.o", target.name));
                } else {
                    let object = object_path(&target.name, source);
                    writeln!(out, "\t{} -c {} -o {}", compile_line(""), source, object)?;
                    objects.push(object);
                }
            }
            objects.dedup();
            writeln!(out, "\t$(AR) rcs $@ {}", objects.join(" "))?;
        }
        TargetKind::Executable | TargetKind::SharedLibrary => {
            let shared = if target.kind == TargetKind::SharedLibrary {
                "-shared -fPIC"
            } else {
                ""
            };
            let mut link: Vec<String> = vec!["$(LDFLAGS)".to_string()];
            link.extend(closure.flags.link_flags.iter().map(|f| make_escape(f)));
            link.extend(
                closure
                    .flags
                    .link_libraries
                    .iter()
                    .map(|l| make_escape(&link_library_flag(l))),
            );
            for fw in &closure.flags.frameworks {
                link.push(format!("-framework {}", make_escape(fw)));
            }
            let mut inputs = sources.clone();
            inputs.extend(archives);
            writeln!(
                out,
                "\t{} -o $@ {} {}",
                compile_line(shared),
                inputs.join(" "),
                link.join(" ")
            )?;
        }
        TargetKind::HeaderOnly | TargetKind::Interface => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{cmake, makefile, ImportOptions};
    use crate::test_support::sample_project;
    use tempfile::TempDir;

    #[test]
    fn test_cmake_project_exports_app_rule() {
        let tmp = TempDir::new().unwrap();
        let project = cmake::import_str(
            "project(Demo)\nadd_executable(app src/main.cpp)\n",
            tmp.path(),
            &ImportOptions::default(),
        )
        .unwrap();
        assert_eq!(project.name, "Demo");

        let text = render(&project, &ExportContext::default()).unwrap().contents;
        let rule = text.find("\napp: src/main.cpp\n").expect("rule producing app");
        let recipe = text[rule + 1..].lines().nth(1).unwrap();
        assert!(recipe.starts_with('\t'));
        assert!(recipe.contains("src/main.cpp"));
        assert!(recipe.contains("-o $@"));
    }

    #[test]
    fn test_render_sample() {
        let text = render(&sample_project(), &ExportContext::default())
            .unwrap()
            .contents;
        assert!(text.contains("CXXFLAGS += -std=c++17"));
        assert!(text.contains("all: libcore.a app\n"));
        assert!(text.contains("libcore.a: src/core.cpp include/core.h\n"));
        assert!(text.contains(
            "\t$(CXX) $(CXXFLAGS) -Iinclude -DCORE_STATIC -Wall -c src/core.cpp -o $(BUILD_DIR)/core/src_core.o\n"
        ));
        assert!(text.contains("\t$(AR) rcs $@ $(BUILD_DIR)/core/src_core.o\n"));
        assert!(text.contains("app: src/main.cpp libcore.a\n"));
        // the app picks up the include dirs and defines of the library it uses
        assert!(text.contains(
            "\t$(CXX) $(CXXFLAGS) -Iinclude -DCORE_STATIC -o $@ src/main.cpp libcore.a $(LDFLAGS) -lpthread\n"
        ));
        assert!(text.contains("clean:\n\trm -f libcore.a app\n\trm -rf $(BUILD_DIR)\n"));
    }

    #[test]
    fn test_export_reimports_as_makefile() {
        let text = render(&sample_project(), &ExportContext::default())
            .unwrap()
            .contents;
        let tmp = TempDir::new().unwrap();
        let project = makefile::import_str(&text, tmp.path(), &ImportOptions::default()).unwrap();

        let app = project.target("app").unwrap();
        assert_eq!(app.kind, TargetKind::Executable);
        assert_eq!(app.sources, vec!["src/main.cpp"]);
        assert_eq!(app.dependencies, vec!["core"]);
        let core = project.target("core").unwrap();
        assert_eq!(core.kind, TargetKind::StaticLibrary);
        assert_eq!(core.sources, vec!["src/core.cpp"]);
    }

    #[test]
    fn test_object_library_warns() {
        let mut project = Project::new("o", "/tmp/o");
        project.add_target(Target::new("objs", TargetKind::ObjectLibrary).with_sources(["a.c"]));
        let rendered = render(&project, &ExportContext::default()).unwrap();
        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.contents.contains("\t$(CC) $(CFLAGS) -c a.c -o $(BUILD_DIR)/objs/a.o\n"));
    }

    #[test]
    fn test_flag_variables_always_declared() {
        let mut project = Project::new("c", "/tmp/c");
        project.add_target(Target::executable("tool").with_sources(["main.c"]));
        let text = render(&project, &ExportContext::default()).unwrap().contents;
        assert!(text.contains("CFLAGS ?=\nCXXFLAGS ?=\nLDFLAGS ?=\n"));
        assert!(!text.contains("-std="));
    }

    #[test]
    fn test_links_static_chain_transitively() {
        let mut project = Project::new("chain", "/tmp/chain");
        let mut util = Target::static_library("util").with_sources(["util.c"]);
        util.flags.add_link_library("pthread");
        project.add_target(util);
        project.add_target(
            Target::static_library("core")
                .with_sources(["core.c"])
                .with_dependency("util"),
        );
        project.add_target(
            Target::executable("app")
                .with_sources(["main.c"])
                .with_dependency("core"),
        );

        let text = render(&project, &ExportContext::default()).unwrap().contents;
        assert!(text.contains("app: main.c libcore.a libutil.a\n"));
        assert!(text.contains("\t$(CC) $(CFLAGS) -o $@ main.c libcore.a libutil.a $(LDFLAGS) -lpthread\n"));
    }

    #[test]
    fn test_object_path() {
        assert_eq!(object_path("core", "src/x.cpp"), "$(BUILD_DIR)/core/src_x.o");
        assert_eq!(object_path("core", "../y.c"), "$(BUILD_DIR)/core/up_y.o");
    }
}
