//! vcpkg manifest (`vcpkg.json`) importer.
//!
//! A manifest carries package metadata and dependencies only; the imported
//! project has no targets.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::error::TranslateError;
use crate::core::project::Project;
use crate::import::{fallback_name, ImportOptions};
use crate::util::fs::{absolutize, read_source};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Manifest {
    name: Option<String>,
    version: Option<String>,
    version_string: Option<String>,
    version_semver: Option<String>,
    version_date: Option<String>,
    description: Option<Description>,
    homepage: Option<String>,
    license: Option<String>,
    #[serde(default)]
    dependencies: Vec<DependencySpec>,
    #[serde(default)]
    features: BTreeMap<String, Feature>,
}

/// A description is one string or a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Description {
    One(String),
    Lines(Vec<String>),
}

impl Description {
    fn into_text(self) -> String {
        match self {
            Description::One(text) => text,
            Description::Lines(lines) => lines.join("\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependencySpec {
    Name(String),
    Detailed(DetailedDependency),
}

#[derive(Debug, Deserialize)]
struct DetailedDependency {
    name: String,
    #[serde(rename = "version>=")]
    minimum_version: Option<String>,
    #[serde(default)]
    host: bool,
}

impl DependencySpec {
    fn to_dependency(&self, kind: DependencyKind) -> Dependency {
        match self {
            DependencySpec::Name(name) => Dependency::new(name.as_str()).with_kind(kind),
            DependencySpec::Detailed(detail) => {
                let kind = if detail.host { DependencyKind::Dev } else { kind };
                let mut dep = Dependency::new(detail.name.as_str()).with_kind(kind);
                if let Some(ref min) = detail.minimum_version {
                    dep = dep.with_version(format!(">={}", min));
                }
                dep
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    dependencies: Vec<DependencySpec>,
}

/// Import a `vcpkg.json`.
pub fn import(path: &Path, options: &ImportOptions) -> Result<Project, TranslateError> {
    let path = absolutize(path);
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!("Parsing vcpkg manifest {}", path.display());
    let text = read_source(&path)?;
    import_str(&text, &root, options)
}

/// Import manifest text for a project rooted at `root`.
pub fn import_str(
    text: &str,
    root: &Path,
    _options: &ImportOptions,
) -> Result<Project, TranslateError> {
    let manifest: Manifest = serde_json::from_str(text)
        .map_err(|e| TranslateError::parse("vcpkg.json", Some(e.line()), e.to_string()))?;

    let name = manifest.name.unwrap_or_else(|| fallback_name(root));
    let mut project = Project::new(name, root);
    project.version = manifest
        .version
        .or(manifest.version_semver)
        .or(manifest.version_string)
        .or(manifest.version_date);
    project.description = manifest.description.map(Description::into_text);
    project.homepage = manifest.homepage;
    project.license = manifest.license;

    for spec in &manifest.dependencies {
        project.add_dependency(spec.to_dependency(DependencyKind::Build));
    }
    for (feature, body) in &manifest.features {
        for spec in &body.dependencies {
            let dep = spec.to_dependency(DependencyKind::Optional);
            if project.dependency(&dep.name).is_some() {
                continue;
            }
            tracing::trace!("Feature `{}` pulls in `{}`", feature, dep.name);
            project.add_dependency(dep);
        }
    }

    tracing::debug!(
        "Imported vcpkg manifest `{}` with {} dependencies",
        project.name,
        project.dependencies().len()
    );
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn import_text(text: &str) -> Project {
        import_str(text, Path::new("/work/demo"), &ImportOptions::default()).unwrap()
    }

    #[test]
    fn test_string_and_object_dependencies() {
        let project = import_text(
            r#"{"name":"foo","dependencies":["bar",{"name":"baz","version>=":"1.2"}]}"#,
        );
        assert_eq!(project.name, "foo");
        let deps = project.dependencies();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "bar");
        assert_eq!(deps[0].version, None);
        assert_eq!(deps[1].name, "baz");
        assert_eq!(deps[1].version.as_deref(), Some(">=1.2"));
        assert!(project.targets().is_empty());
    }

    #[test]
    fn test_metadata() {
        let project = import_text(
            r#"{
  "name": "demo",
  "version-semver": "2.0.0-rc1",
  "description": ["A demo", "with two lines"],
  "homepage": "https://example.org",
  "license": "MIT"
}"#,
        );
        assert_eq!(project.version.as_deref(), Some("2.0.0-rc1"));
        assert_eq!(project.description.as_deref(), Some("A demo\nwith two lines"));
        assert_eq!(project.homepage.as_deref(), Some("https://example.org"));
        assert_eq!(project.license.as_deref(), Some("MIT"));
    }

    #[test]
    fn test_host_and_feature_dependencies() {
        let project = import_text(
            r#"{
  "name": "demo",
  "version": "1.0",
  "dependencies": [
    { "name": "vcpkg-cmake", "host": true },
    { "name": "fmt", "default-features": false, "platform": "!uwp" }
  ],
  "features": {
    "tests": { "description": "Build tests", "dependencies": ["gtest", "fmt"] }
  }
}"#,
        );
        let kinds: Vec<(&str, DependencyKind)> = project
            .dependencies()
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("vcpkg-cmake", DependencyKind::Dev),
                ("fmt", DependencyKind::Build),
                ("gtest", DependencyKind::Optional),
            ]
        );
    }

    #[test]
    fn test_missing_name_uses_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("widget");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("vcpkg.json"), r#"{"dependencies":[]}"#).unwrap();
        let project = import(&dir.join("vcpkg.json"), &ImportOptions::default()).unwrap();
        assert_eq!(project.name, "widget");
    }

    #[test]
    fn test_invalid_json_reports_line() {
        let err = import_str("{\n  \"name\": ,\n}", Path::new("."), &ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, TranslateError::Parse { line: Some(2), .. }));
    }
}
