//! Dependency specification.
//!
//! A Dependency names an external package an imported project requires.
//! Versions stay raw strings: every format encodes constraints differently
//! and resolving them belongs to the resolver, not the translator.

use serde::{Deserialize, Serialize};

/// How a dependency is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Needed to build and run
    #[default]
    Build,
    /// Tooling or test-only dependency
    Dev,
    /// Only used when a feature/option is enabled
    Optional,
    /// Provided by the system (find_package, pkg-config, frameworks)
    System,
}

impl DependencyKind {
    /// The lowercase name used in manifests and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Build => "build",
            DependencyKind::Dev => "dev",
            DependencyKind::Optional => "optional",
            DependencyKind::System => "system",
        }
    }
}

impl std::str::FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(DependencyKind::Build),
            "dev" => Ok(DependencyKind::Dev),
            "optional" => Ok(DependencyKind::Optional),
            "system" => Ok(DependencyKind::System),
            other => Err(format!(
                "invalid dependency kind '{}', valid values: build, dev, optional, system",
                other
            )),
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name
    pub name: String,

    /// Version constraint as written by the source format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Where to get it: URL, path or hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// How it is used
    #[serde(default)]
    pub kind: DependencyKind,
}

impl Dependency {
    /// Create a new build dependency.
    pub fn new(name: impl Into<String>) -> Self {
        Dependency {
            name: name.into(),
            version: None,
            source: None,
            kind: DependencyKind::Build,
        }
    }

    /// Set the version constraint. Empty strings are treated as absent.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = if version.trim().is_empty() {
            None
        } else {
            Some(version)
        };
        self
    }

    /// Set the source locator.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the dependency kind.
    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Check if this is an optional dependency.
    pub fn is_optional(&self) -> bool {
        self.kind == DependencyKind::Optional
    }

    /// Split a leading comparison operator off the version (`>=1.2` → `(">=", "1.2")`).
    pub fn version_parts(&self) -> Option<(&str, &str)> {
        let version = self.version.as_deref()?.trim();
        for op in [">=", "<=", "==", "~=", "^", "~", ">", "<", "="] {
            if let Some(rest) = version.strip_prefix(op) {
                return Some((op, rest.trim()));
            }
        }
        Some(("", version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let dep = Dependency::new("zlib")
            .with_version(">=1.2")
            .with_source("https://github.com/madler/zlib")
            .with_kind(DependencyKind::System);

        assert_eq!(dep.name, "zlib");
        assert_eq!(dep.version.as_deref(), Some(">=1.2"));
        assert_eq!(dep.kind, DependencyKind::System);
        assert_eq!(dep.version_parts(), Some((">=", "1.2")));
    }

    #[test]
    fn test_empty_version_is_none() {
        let dep = Dependency::new("fmt").with_version("  ");
        assert!(dep.version.is_none());
        assert!(dep.version_parts().is_none());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("dev".parse::<DependencyKind>().unwrap(), DependencyKind::Dev);
        assert!("runtime".parse::<DependencyKind>().is_err());
    }
}
