//! The native manifest (`Harbor.toml`).
//!
//! The manifest is a direct TOML rendering of the project model:
//!
//! ```toml
//! [package]
//! name = "demo"
//! version = "1.0.0"
//! cxx_standard = "17"
//!
//! [[target]]
//! name = "app"
//! kind = "executable"
//! sources = ["src/main.cpp"]
//!
//! [[dependency]]
//! name = "zlib"
//! kind = "system"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::dependency::Dependency;
use crate::core::error::TranslateError;
use crate::core::format::BuildFormat;
use crate::core::language::CppStandard;
use crate::core::project::Project;
use crate::core::target::Target;
use crate::util::fs::read_source;

/// Default manifest filename.
pub const MANIFEST_NAME: &str = "Harbor.toml";

/// Alternative manifest filename.
pub const MANIFEST_ALIAS: &str = "Harbour.toml";

#[derive(Debug, Serialize, Deserialize)]
struct ManifestDocument {
    package: PackageSection,

    #[serde(default, rename = "target", skip_serializing_if = "Vec::is_empty")]
    targets: Vec<Target>,

    #[serde(default, rename = "dependency", skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PackageSection {
    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    homepage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    cxx_standard: Option<CppStandard>,
}

/// Load a native manifest into a project rooted at the manifest's directory.
pub fn load(path: &Path) -> Result<Project, TranslateError> {
    let content = read_source(path)?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    parse(&content, path, root)
}

/// Parse manifest text.
pub fn parse(content: &str, path: &Path, root: &Path) -> Result<Project, TranslateError> {
    let doc: ManifestDocument = toml::from_str(content).map_err(|e| TranslateError::Manifest {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let mut project = Project::new(doc.package.name, root);
    project.version = doc.package.version;
    project.description = doc.package.description;
    project.homepage = doc.package.homepage;
    project.license = doc.package.license;
    project.cxx_standard = doc.package.cxx_standard;

    for target in doc.targets {
        project.add_target(target);
    }
    for dep in doc.dependencies {
        project.add_dependency(dep);
    }

    Ok(project)
}

/// Render a project as manifest text.
pub fn render(project: &Project) -> Result<String, TranslateError> {
    let doc = ManifestDocument {
        package: PackageSection {
            name: project.name.clone(),
            version: project.version.clone(),
            description: project.description.clone(),
            homepage: project.homepage.clone(),
            license: project.license.clone(),
            cxx_standard: project.cxx_standard,
        },
        targets: project.targets().to_vec(),
        dependencies: project.dependencies().to_vec(),
    };

    toml::to_string_pretty(&doc).map_err(|e| TranslateError::Render {
        format: BuildFormat::Native,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::DependencyKind;
    use crate::core::target::TargetKind;

    #[test]
    fn test_parse_manifest() {
        let toml = r#"
[package]
name = "demo"
version = "0.3.0"
cxx_standard = "20"

[[target]]
name = "core"
kind = "static_library"
sources = ["src/core.cpp"]

[target.flags]
include_dirs = ["include"]

[[target]]
name = "app"
kind = "exe"
sources = ["src/main.cpp"]
dependencies = ["core"]

[[dependency]]
name = "zlib"
version = ">=1.2"
kind = "system"
"#;
        let project = parse(toml, Path::new("Harbor.toml"), Path::new(".")).unwrap();
        assert_eq!(project.name, "demo");
        assert_eq!(project.version.as_deref(), Some("0.3.0"));
        assert_eq!(project.cxx_standard, Some(CppStandard::Cpp20));
        assert_eq!(project.targets().len(), 2);
        assert_eq!(project.targets()[0].flags.include_dirs, vec!["include"]);
        assert_eq!(project.targets()[1].kind, TargetKind::Executable);
        assert_eq!(project.targets()[1].dependencies, vec!["core"]);
        assert_eq!(project.dependencies()[0].kind, DependencyKind::System);
    }

    #[test]
    fn test_render_then_parse_keeps_model() {
        let mut project = Project::new("demo", ".");
        project.version = Some("1.0.0".to_string());
        project.cxx_standard = Some(CppStandard::Cpp17);
        let mut lib = Target::static_library("util").with_sources(["util.c", "util.h"]);
        lib.flags.add_define("UTIL=1");
        project.add_target(lib);
        project.add_target(Target::executable("app").with_dependency("util"));
        project.add_dependency(Dependency::new("fmt").with_version("10.1.0"));

        let text = render(&project).unwrap();
        assert!(text.contains("[[target]]"));
        assert!(text.contains("cxx_standard = \"17\""));

        let reparsed = parse(&text, Path::new("Harbor.toml"), Path::new(".")).unwrap();
        assert_eq!(reparsed.targets(), project.targets());
        assert_eq!(reparsed.dependencies(), project.dependencies());
    }

    #[test]
    fn test_missing_package_is_manifest_error() {
        let err = parse("[[target]]\nname = \"x\"\n", Path::new("Harbor.toml"), Path::new("."))
            .unwrap_err();
        assert!(matches!(err, TranslateError::Manifest { .. }));
    }
}
