//! pkg-config (`.pc`) exporter.

use std::fmt::{self, Write};

use crate::core::dependency::DependencyKind;
use crate::core::project::Project;
use crate::core::target::{link_library_flag, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::export::{ExportContext, Rendered};

/// Render a `.pc` file describing the installed libraries of `project`.
pub fn render(project: &Project, _ctx: &ExportContext<'_>) -> Result<Rendered, fmt::Error> {
    let mut out = String::new();
    let mut rendered = Rendered::default();

    writeln!(out, "prefix=/usr/local")?;
    writeln!(out, "exec_prefix=${{prefix}}")?;
    writeln!(out, "libdir=${{exec_prefix}}/lib")?;
    writeln!(out, "includedir=${{prefix}}/include")?;
    writeln!(out)?;
    writeln!(out, "Name: {}", project.name)?;
    writeln!(
        out,
        "Description: {}",
        project
            .description
            .as_deref()
            .map(|d| d.replace('\n', " "))
            .unwrap_or_else(|| project.name.clone())
    )?;
    writeln!(out, "Version: {}", project.version.as_deref().unwrap_or("0.0.0"))?;
    if let Some(ref url) = project.homepage {
        writeln!(out, "URL: {}", url)?;
    }

    let mut requires = Vec::new();
    let mut requires_private = Vec::new();
    for dep in project.dependencies() {
        let entry = match dep.version_parts() {
            Some((op, version)) => {
                let op = match op {
                    "" | "==" => "=",
                    "^" | "~" | "~=" => ">=",
                    other => other,
                };
                format!("{} {} {}", dep.name, op, version)
            }
            None => dep.name.clone(),
        };
        match dep.kind {
            DependencyKind::Build | DependencyKind::System => requires.push(entry),
            DependencyKind::Optional => requires_private.push(entry),
            DependencyKind::Dev => {}
        }
    }
    if !requires.is_empty() {
        writeln!(out, "Requires: {}", requires.join(", "))?;
    }
    if !requires_private.is_empty() {
        writeln!(out, "Requires.private: {}", requires_private.join(", "))?;
    }

    let mut libs = Vec::new();
    let mut libs_private: Vec<String> = Vec::new();
    let mut cflags = vec!["-I${includedir}".to_string()];
    let mut public = 0;
    for target in project.targets_in_dependency_order() {
        if !target.kind.is_library() {
            continue;
        }
        public += 1;
        if matches!(target.kind, TargetKind::StaticLibrary | TargetKind::SharedLibrary) {
            libs.push(format!("-l{}", target.name));
        }
        for define in &target.flags.defines {
            let flag = format!("-D{}", define);
            if !cflags.contains(&flag) {
                cflags.push(flag);
            }
        }
        for lib in &target.flags.link_libraries {
            let flag = link_library_flag(lib);
            if !libs_private.contains(&flag) {
                libs_private.push(flag);
            }
        }
    }

    if public == 0 {
        rendered.warnings.push(TranslationWarning::warning(format!(
            "project `{}` has no library targets to describe",
            project.name
        )));
    }
    if libs.is_empty() {
        writeln!(out, "Libs:")?;
    } else {
        writeln!(out, "Libs: -L${{libdir}} {}", libs.join(" "))?;
    }
    if !libs_private.is_empty() {
        writeln!(out, "Libs.private: {}", libs_private.join(" "))?;
    }
    writeln!(out, "Cflags: {}", cflags.join(" "))?;

    rendered.contents = out;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::Target;
    use crate::test_support::sample_project;

    #[test]
    fn test_render_sample() {
        let rendered = render(&sample_project(), &ExportContext::default()).unwrap();
        assert!(rendered.warnings.is_empty());
        assert_eq!(
            rendered.contents,
            "prefix=/usr/local
exec_prefix=${prefix}
libdir=${exec_prefix}/lib
includedir=${prefix}/include

Name: demo
Description: Demo project
Version: 1.2.0
Requires: zlib >= 1.2.11, fmt = 10.1.0
Libs: -L${libdir} -lcore
Cflags: -I${includedir} -DCORE_STATIC
"
        );
    }

    #[test]
    fn test_no_libraries_warns() {
        let mut project = Project::new("tool", "/tmp/tool");
        project.add_target(Target::executable("tool").with_sources(["main.c"]));
        let rendered = render(&project, &ExportContext::default()).unwrap();
        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.contents.contains("Libs:\n"));
        assert!(rendered.contents.contains("Description: tool\n"));
        assert!(rendered.contents.contains("Version: 0.0.0\n"));
    }
}
