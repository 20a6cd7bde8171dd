//! vcpkg manifest (`vcpkg.json`) exporter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::error::TranslateError;
use crate::core::format::BuildFormat;
use crate::core::project::Project;
use crate::core::warning::TranslationWarning;
use crate::export::Rendered;

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct Manifest {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<DependencySpec>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    features: BTreeMap<String, Feature>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    overrides: Vec<Override>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum DependencySpec {
    Name(String),
    Detailed {
        name: String,
        #[serde(rename = "version>=", skip_serializing_if = "Option::is_none")]
        minimum_version: Option<String>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        host: bool,
    },
}

#[derive(Debug, Serialize)]
struct Feature {
    description: String,
    dependencies: Vec<DependencySpec>,
}

#[derive(Debug, Serialize)]
struct Override {
    name: String,
    version: String,
}

/// vcpkg port names are lower-case alphanumerics separated by dashes.
fn port_name(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "project".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Dotted numeric versions go in `version`; anything else in `version-string`.
fn is_relaxed_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

struct Converted {
    spec: DependencySpec,
    exact: Option<String>,
}

fn convert(dep: &Dependency, warnings: &mut Vec<TranslationWarning>) -> Converted {
    let name = port_name(&dep.name);
    let host = dep.kind == DependencyKind::Dev;
    let mut minimum_version = None;
    let mut exact = None;
    match dep.version_parts() {
        Some((">=", version)) => minimum_version = Some(version.to_string()),
        Some(("" | "=" | "==", version)) => exact = Some(version.to_string()),
        Some((_, _)) => warnings.push(TranslationWarning::warning(format!(
            "version constraint `{}` of `{}` cannot be expressed in vcpkg.json and was dropped",
            dep.version.as_deref().unwrap_or_default(),
            dep.name
        ))),
        None => {}
    }
    let spec = if minimum_version.is_none() && !host {
        DependencySpec::Name(name)
    } else {
        DependencySpec::Detailed {
            name,
            minimum_version,
            host,
        }
    };
    Converted { spec, exact }
}

/// Render `vcpkg.json`.
pub fn render(project: &Project) -> Result<Rendered, TranslateError> {
    let mut warnings = Vec::new();
    let (version, version_string) = match project.version.as_deref() {
        Some(v) if is_relaxed_version(v) => (Some(v.to_string()), None),
        Some(v) => (None, Some(v.to_string())),
        None => (None, None),
    };
    let mut manifest = Manifest {
        name: port_name(&project.name),
        version,
        version_string,
        description: project.description.clone(),
        homepage: project.homepage.clone(),
        license: project.license.clone(),
        dependencies: Vec::new(),
        features: BTreeMap::new(),
        overrides: Vec::new(),
    };

    for dep in project.dependencies() {
        let converted = convert(dep, &mut warnings);
        if let Some(version) = converted.exact {
            manifest.overrides.push(Override {
                name: port_name(&dep.name),
                version,
            });
        }
        if dep.kind == DependencyKind::Optional {
            manifest.features.insert(
                port_name(&dep.name),
                Feature {
                    description: format!("Build with {}", dep.name),
                    dependencies: vec![converted.spec],
                },
            );
        } else {
            manifest.dependencies.push(converted.spec);
        }
    }

    let mut contents =
        serde_json::to_string_pretty(&manifest).map_err(|e| TranslateError::Render {
            format: BuildFormat::Vcpkg,
            message: e.to_string(),
        })?;
    contents.push('\n');
    Ok(Rendered {
        contents,
        siblings: Vec::new(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{vcpkg, ImportOptions};
    use crate::test_support::sample_project;
    use serde_json::{json, Value};
    use std::path::Path;

    #[test]
    fn test_render_sample() {
        let rendered = render(&sample_project()).unwrap();
        let value: Value = serde_json::from_str(&rendered.contents).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "demo",
                "version": "1.2.0",
                "description": "Demo project",
                "dependencies": [
                    {"name": "zlib", "version>=": "1.2.11"},
                    "fmt"
                ],
                "overrides": [{"name": "fmt", "version": "10.1.0"}]
            })
        );
    }

    #[test]
    fn test_optional_and_dev_dependencies() {
        let mut project = Project::new("My_Lib", "/tmp/x");
        project.version = Some("2024-01-05".to_string());
        project.add_dependency(Dependency::new("gtest").with_kind(DependencyKind::Optional));
        project.add_dependency(Dependency::new("vcpkg-cmake").with_kind(DependencyKind::Dev));
        project.add_dependency(Dependency::new("boost").with_version("<2"));

        let rendered = render(&project).unwrap();
        assert_eq!(rendered.warnings.len(), 1);
        let value: Value = serde_json::from_str(&rendered.contents).unwrap();
        assert_eq!(value["name"], "my-lib");
        assert_eq!(value["version-string"], "2024-01-05");
        assert_eq!(
            value["dependencies"],
            json!([{"name": "vcpkg-cmake", "host": true}, "boost"])
        );
        assert_eq!(value["features"]["gtest"]["dependencies"], json!(["gtest"]));

        let back = vcpkg::import_str(&rendered.contents, Path::new("/tmp/x"), &ImportOptions::default())
            .unwrap();
        let kinds: Vec<(&str, DependencyKind)> = back
            .dependencies()
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("vcpkg-cmake", DependencyKind::Dev),
                ("boost", DependencyKind::Build),
                ("gtest", DependencyKind::Optional),
            ]
        );
    }

    #[test]
    fn test_port_name() {
        assert_eq!(port_name("Foo Bar++"), "foo-bar");
        assert_eq!(port_name("__"), "project");
    }
}
