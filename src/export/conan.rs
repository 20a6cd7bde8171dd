//! `conanfile.txt` exporter.

use std::fmt::{self, Write};

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::project::Project;
use crate::core::warning::TranslationWarning;
use crate::export::Rendered;

/// `name/version`, with constraints written as a version range.
fn reference(dep: &Dependency) -> String {
    match dep.version_parts() {
        Some(("" | "=" | "==", version)) => format!("{}/{}", dep.name, version),
        Some(_) => format!(
            "{}/[{}]",
            dep.name,
            dep.version.as_deref().unwrap_or_default().trim()
        ),
        None => format!("{}/[*]", dep.name),
    }
}

/// Render `conanfile.txt`.
pub fn render(project: &Project) -> Result<Rendered, fmt::Error> {
    let mut out = String::new();
    let mut warnings = Vec::new();

    let mut requires = Vec::new();
    let mut tool_requires = Vec::new();
    for dep in project.dependencies() {
        match dep.kind {
            DependencyKind::Build | DependencyKind::System => requires.push(reference(dep)),
            DependencyKind::Optional => {
                warnings.push(TranslationWarning::info(format!(
                    "optional dependency `{}` is required in conanfile.txt",
                    dep.name
                )));
                requires.push(reference(dep));
            }
            DependencyKind::Dev => tool_requires.push(reference(dep)),
        }
    }

    writeln!(out, "[requires]")?;
    for entry in &requires {
        writeln!(out, "{}", entry)?;
    }
    if !tool_requires.is_empty() {
        writeln!(out)?;
        writeln!(out, "[tool_requires]")?;
        for entry in &tool_requires {
            writeln!(out, "{}", entry)?;
        }
    }
    writeln!(out)?;
    writeln!(out, "[generators]")?;
    writeln!(out, "CMakeDeps")?;
    writeln!(out, "CMakeToolchain")?;

    Ok(Rendered {
        contents: out,
        siblings: Vec::new(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{conan, ImportOptions};
    use crate::test_support::{sample_project, write_tree};
    use tempfile::TempDir;

    #[test]
    fn test_render_sample() {
        let rendered = render(&sample_project()).unwrap();
        assert_eq!(
            rendered.contents,
            "[requires]\nzlib/[>=1.2.11]\nfmt/10.1.0\n\n[generators]\nCMakeDeps\nCMakeToolchain\n"
        );
        assert!(rendered.warnings.is_empty());
    }

    #[test]
    fn test_tool_requires_round_trip() {
        let mut project = Project::new("p", "/tmp/p");
        project.add_dependency(Dependency::new("openssl").with_version("3.2.0"));
        project.add_dependency(
            Dependency::new("cmake")
                .with_version("3.28.1")
                .with_kind(DependencyKind::Dev),
        );
        project.add_dependency(Dependency::new("gtest").with_kind(DependencyKind::Optional));
        let rendered = render(&project).unwrap();
        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.contents.contains("[tool_requires]\ncmake/3.28.1\n"));

        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("conanfile.txt", &rendered.contents)]);
        let back = conan::import(&tmp.path().join("conanfile.txt"), &ImportOptions::default()).unwrap();
        let deps: Vec<(&str, Option<&str>, DependencyKind)> = back
            .dependencies()
            .iter()
            .map(|d| (d.name.as_str(), d.version.as_deref(), d.kind))
            .collect();
        assert_eq!(
            deps,
            vec![
                ("openssl", Some("3.2.0"), DependencyKind::Build),
                ("gtest", Some("*"), DependencyKind::Build),
                ("cmake", Some("3.28.1"), DependencyKind::Dev),
            ]
        );
    }
}
