//! Conan importer: `conanfile.txt` sections and the declarative parts of
//! `conanfile.py`.
//!
//! Recipes are Python; only class attributes and literal
//! `self.requires(..)`-style calls are read.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::error::TranslateError;
use crate::core::project::Project;
use crate::core::warning::TranslationWarning;
use crate::import::{fallback_name, ImportOptions};
use crate::util::fs::{absolutize, read_source, relative_path};

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(name|version|license|description|url|homepage|requires|tool_requires|build_requires|test_requires)\s*=\s*(.*)$")
        .expect("attribute pattern")
});

static STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("string pattern"));

static REQUIRE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"self\.(requires|tool_requires|build_requires|test_requires)\(\s*(?:"([^"]+)"|'([^']+)')"#)
        .expect("call pattern")
});

/// Import a `conanfile.txt` or `conanfile.py`.
pub fn import(path: &Path, options: &ImportOptions) -> Result<Project, TranslateError> {
    let path = absolutize(path);
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!("Parsing Conan file {}", path.display());
    let text = read_source(&path)?;
    let file = relative_path(&root, &path);

    if path.extension().is_some_and(|e| e == "py") {
        Ok(import_recipe(&text, &file, &root, options))
    } else {
        import_txt(&text, &file, &root, options)
    }
}

/// A parsed `name/version@user/channel#revision` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub version: Option<String>,
    pub user_channel: Option<String>,
}

/// Parse a Conan reference. Version ranges lose their brackets.
pub fn parse_reference(text: &str) -> Option<Reference> {
    let text = text.trim();
    let text = text.split('#').next().unwrap_or(text);
    let (head, user_channel) = match text.split_once('@') {
        Some((head, uc)) if !uc.is_empty() => (head, Some(uc.to_string())),
        Some((head, _)) => (head, None),
        None => (text, None),
    };
    let (name, version) = match head.split_once('/') {
        Some((name, version)) => (name, Some(version)),
        None => (head, None),
    };
    if name.is_empty() {
        return None;
    }
    let version = version
        .map(|v| {
            v.strip_prefix('[')
                .and_then(|v| v.strip_suffix(']'))
                .unwrap_or(v)
                .trim()
                .to_string()
        })
        .filter(|v| !v.is_empty());
    Some(Reference {
        name: name.to_string(),
        version,
        user_channel,
    })
}

fn dependency_from(text: &str, kind: DependencyKind) -> Option<Dependency> {
    let reference = parse_reference(text)?;
    let mut dep = Dependency::new(reference.name).with_kind(kind);
    if let Some(version) = reference.version {
        dep = dep.with_version(version);
    }
    Some(dep)
}

fn kind_for(requirement: &str) -> DependencyKind {
    match requirement {
        "requires" => DependencyKind::Build,
        _ => DependencyKind::Dev,
    }
}

fn import_txt(
    text: &str,
    file: &Path,
    root: &Path,
    options: &ImportOptions,
) -> Result<Project, TranslateError> {
    let mut project = Project::new(fallback_name(root), root);
    let mut section: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix('[') {
            let Some(name) = name.strip_suffix(']') else {
                return Err(TranslateError::parse(
                    file,
                    Some(idx + 1),
                    format!("unterminated section header `{}`", line),
                ));
            };
            section = Some(name.trim().to_string());
            continue;
        }

        let kind = match section.as_deref() {
            Some("requires") => DependencyKind::Build,
            Some("tool_requires" | "build_requires" | "test_requires") => DependencyKind::Dev,
            Some(_) => continue,
            None => {
                return Err(TranslateError::parse(
                    file,
                    Some(idx + 1),
                    "entry outside of any section",
                ))
            }
        };
        match dependency_from(line, kind) {
            Some(dep) => project.add_dependency(dep),
            None => project.warn(
                TranslationWarning::warning(format!("invalid reference `{}` ignored", line))
                    .with_location(file.to_path_buf(), Some(idx + 1)),
            ),
        }
    }

    if options.verbose && project.dependencies().is_empty() {
        project.warn(
            TranslationWarning::info("conanfile declares no requirements")
                .with_location(file.to_path_buf(), None),
        );
    }
    Ok(project)
}

fn strings_in(text: &str) -> Vec<String> {
    STRING
        .captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn bracket_balance(text: &str) -> i32 {
    text.chars().fold(0, |acc, c| match c {
        '(' | '[' => acc + 1,
        ')' | ']' => acc - 1,
        _ => acc,
    })
}

fn import_recipe(text: &str, file: &Path, root: &Path, options: &ImportOptions) -> Project {
    let mut project = Project::new(fallback_name(root), root);
    let lines: Vec<&str> = text.lines().collect();

    let mut i = 0;
    while i < lines.len() {
        let Some(caps) = ATTRIBUTE.captures(lines[i]) else {
            i += 1;
            continue;
        };
        let attribute = caps[1].to_string();
        let mut value = caps[2].to_string();
        // `requires = (` ... `)` spans lines
        let mut balance = bracket_balance(&value);
        while balance > 0 && i + 1 < lines.len() {
            i += 1;
            value.push(' ');
            value.push_str(lines[i]);
            balance += bracket_balance(lines[i]);
        }
        i += 1;

        let values = strings_in(&value);
        match attribute.as_str() {
            "name" => {
                if let Some(name) = values.into_iter().next() {
                    project.name = name;
                }
            }
            "version" => project.version = values.into_iter().next(),
            "license" => project.license = values.into_iter().next(),
            "description" => project.description = values.into_iter().next(),
            "url" | "homepage" => {
                if project.homepage.is_none() || attribute == "homepage" {
                    project.homepage = values.into_iter().next();
                }
            }
            requirement => {
                for reference in values {
                    if let Some(dep) = dependency_from(&reference, kind_for(requirement)) {
                        project.add_dependency(dep);
                    }
                }
            }
        }
    }

    for caps in REQUIRE_CALL.captures_iter(text) {
        let reference = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
        if let Some(dep) = reference.and_then(|r| dependency_from(r, kind_for(&caps[1]))) {
            project.add_dependency(dep);
        }
    }

    if options.verbose && text.contains("def generate(") {
        project.warn(
            TranslationWarning::info("generate() is Python and was not evaluated")
                .with_location(file.to_path_buf(), None),
        );
    }
    project
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_tree;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_reference("zlib/1.3@myuser/stable#abc"),
            Some(Reference {
                name: "zlib".into(),
                version: Some("1.3".into()),
                user_channel: Some("myuser/stable".into()),
            })
        );
        let range = parse_reference("boost/[>=1.80 <2]").unwrap();
        assert_eq!(range.version.as_deref(), Some(">=1.80 <2"));
        assert_eq!(parse_reference("fmt").unwrap().version, None);
        assert!(parse_reference("/1.0").is_none());
    }

    #[test]
    fn test_conanfile_txt() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[(
                "conanfile.txt",
                "[requires]\nzlib/1.3.1\nfmt/10.2.1 # formatting\n\n[tool_requires]\ncmake/3.28.1\n\n[test_requires]\ngtest/1.14.0\n\n[generators]\nCMakeDeps\n",
            )],
        );
        let project = import(&tmp.path().join("conanfile.txt"), &ImportOptions::default()).unwrap();
        let deps: Vec<(&str, Option<&str>, DependencyKind)> = project
            .dependencies()
            .iter()
            .map(|d| (d.name.as_str(), d.version.as_deref(), d.kind))
            .collect();
        assert_eq!(
            deps,
            vec![
                ("zlib", Some("1.3.1"), DependencyKind::Build),
                ("fmt", Some("10.2.1"), DependencyKind::Build),
                ("cmake", Some("3.28.1"), DependencyKind::Dev),
                ("gtest", Some("1.14.0"), DependencyKind::Dev),
            ]
        );
    }

    #[test]
    fn test_conanfile_txt_entry_outside_section() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("conanfile.txt", "zlib/1.3\n")]);
        let err = import(&tmp.path().join("conanfile.txt"), &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, TranslateError::Parse { line: Some(1), .. }));
    }

    #[test]
    fn test_conanfile_py() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[(
                "conanfile.py",
                r#"from conan import ConanFile

class DemoConan(ConanFile):
    name = "demo"
    version = "0.4.0"
    license = "Apache-2.0"
    url = "https://example.org/demo"
    description = 'A demo recipe'
    requires = (
        "openssl/3.2.0",
        "boost/[>=1.80 <2]",
    )
    tool_requires = "ninja/1.11.1"

    def requirements(self):
        self.requires("spdlog/1.13.0")
        self.test_requires('catch2/3.5.2')
"#,
            )],
        );
        let project = import(&tmp.path().join("conanfile.py"), &ImportOptions::default()).unwrap();
        assert_eq!(project.name, "demo");
        assert_eq!(project.version.as_deref(), Some("0.4.0"));
        assert_eq!(project.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(project.homepage.as_deref(), Some("https://example.org/demo"));
        assert_eq!(project.description.as_deref(), Some("A demo recipe"));

        let deps: Vec<(&str, DependencyKind)> = project
            .dependencies()
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();
        assert_eq!(
            deps,
            vec![
                ("openssl", DependencyKind::Build),
                ("boost", DependencyKind::Build),
                ("ninja", DependencyKind::Dev),
                ("spdlog", DependencyKind::Build),
                ("catch2", DependencyKind::Dev),
            ]
        );
        assert_eq!(
            project.dependency("boost").unwrap().version.as_deref(),
            Some(">=1.80 <2")
        );
    }
}
