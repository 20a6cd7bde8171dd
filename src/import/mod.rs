//! Importers: foreign build descriptions into a [`Project`].
//!
//! Every importer appends to a fresh project and records anything it only
//! partly understands as a warning. Recursive formats share one
//! [`IncludeGuard`] per import call.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::error::{Direction, TranslateError};
use crate::core::format::BuildFormat;
use crate::core::manifest;
use crate::core::project::Project;
use crate::util::config::DEFAULT_MAX_INCLUDE_DEPTH;
use crate::util::fs::absolutize;

pub mod cmake;
pub mod conan;
pub mod makefile;
pub mod meson;
pub mod msbuild;
pub mod vcpkg;
pub mod xcode;

/// Options shared by all importers.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Record unrecognized constructs as info warnings
    pub verbose: bool,

    /// Maximum nesting of included files
    pub max_depth: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            verbose: false,
            max_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

/// What the guard decided about entering a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// Not seen before and within the depth bound
    Enter,
    /// Already parsed during this import
    Visited,
    /// Nested deeper than allowed
    TooDeep,
}

/// Termination guard for recursive imports.
///
/// Holds the set of already-parsed files; the caller passes the current
/// depth. The set stops cycles, the depth bound stops acyclic chains that
/// never end.
#[derive(Debug)]
pub struct IncludeGuard {
    visited: HashSet<PathBuf>,
    max_depth: usize,
}

impl IncludeGuard {
    pub fn new(max_depth: usize) -> Self {
        IncludeGuard {
            visited: HashSet::new(),
            max_depth,
        }
    }

    /// Decide whether `path` may be parsed at nesting `depth`.
    ///
    /// Entering marks the path as visited.
    pub fn enter(&mut self, path: &Path, depth: usize) -> Entry {
        let key = Self::key(path);
        if self.visited.contains(&key) {
            tracing::debug!("Skipping already visited {}", path.display());
            return Entry::Visited;
        }
        if depth > self.max_depth {
            return Entry::TooDeep;
        }
        self.visited.insert(key);
        Entry::Enter
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn key(path: &Path) -> PathBuf {
        absolutize(path)
    }
}

/// Import `path` (a build file, not a directory) as `format`.
pub fn import_project(
    format: BuildFormat,
    path: &Path,
    options: &ImportOptions,
) -> Result<Project, TranslateError> {
    tracing::info!("Importing {} project from {}", format, path.display());
    match format {
        BuildFormat::Native => manifest::load(path),
        BuildFormat::CMake => cmake::import(path, options),
        BuildFormat::Meson => meson::import(path, options),
        BuildFormat::Makefile => makefile::import(path, options),
        BuildFormat::Xcode => xcode::import(path, options),
        BuildFormat::MsBuild => msbuild::import(path, options),
        BuildFormat::Vcpkg => vcpkg::import(path, options),
        BuildFormat::Conan => conan::import(path, options),
        BuildFormat::Ninja | BuildFormat::PkgConfig | BuildFormat::CompileCommands => {
            Err(TranslateError::UnsupportedDirection {
                format,
                direction: Direction::Import,
            })
        }
    }
}

/// Directory of a build file relative to the project root.
pub(crate) fn relative_dir(root: &Path, file: &Path) -> PathBuf {
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    crate::util::fs::relative_path(root, dir)
}

/// Name to use for a project that never declares one.
pub(crate) fn fallback_name(root: &Path) -> String {
    absolutize(root)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("project")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_guard_rejects_revisit() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("CMakeLists.txt");
        std::fs::write(&file, "").unwrap();

        let mut guard = IncludeGuard::new(4);
        assert_eq!(guard.enter(&file, 0), Entry::Enter);
        assert_eq!(guard.enter(&file, 1), Entry::Visited);
        // Same file through a different spelling
        let spelled = tmp.path().join("sub/../CMakeLists.txt");
        assert_eq!(guard.enter(&spelled, 1), Entry::Visited);
    }

    #[test]
    fn test_guard_depth_bound() {
        let mut guard = IncludeGuard::new(2);
        assert_eq!(guard.enter(Path::new("/a/one"), 2), Entry::Enter);
        assert_eq!(guard.enter(Path::new("/a/two"), 3), Entry::TooDeep);
        // A rejected path is not marked visited
        assert_eq!(guard.enter(Path::new("/a/two"), 1), Entry::Enter);
    }

    #[test]
    fn test_import_only_formats_rejected() {
        let err = import_project(
            BuildFormat::Ninja,
            Path::new("build.ninja"),
            &ImportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TranslateError::UnsupportedDirection {
                direction: Direction::Import,
                ..
            }
        ));
    }
}
