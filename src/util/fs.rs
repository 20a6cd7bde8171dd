//! Filesystem utilities.

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use glob::glob;
use tempfile::NamedTempFile;

use crate::core::error::TranslateError;

/// Read a build file to string.
///
/// A missing file maps to [`TranslateError::SourceNotFound`], anything else
/// to [`TranslateError::Io`].
pub fn read_source(path: &Path) -> Result<String, TranslateError> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            TranslateError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            TranslateError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Write a string to a file, creating parent directories if needed.
///
/// The contents go to a temporary file in the destination directory which is
/// then renamed over the destination, so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), TranslateError> {
    let io_err = |source: io::Error| TranslateError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(io_err)?;
    tmp.write_all(contents.as_bytes()).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Find files matching glob patterns relative to a base directory.
///
/// Results are relative to `base`, sorted and deduplicated.
pub fn glob_files(base: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let entries = match glob(&pattern_str) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("invalid glob pattern {}: {}", pattern, e);
                continue;
            }
        };
        for entry in entries {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(relative_path(base, &path));
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    results
}

/// Check if a path string contains glob metacharacters.
pub fn is_glob_pattern(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// Leading `..` components of a relative path are kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make a path absolute and lexically clean, resolving symlinks when the
/// path exists.
pub fn absolutize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let normalized = normalize_lexically(&absolute);
    normalized.canonicalize().unwrap_or(normalized)
}

/// Render a path with forward slashes, as every build format expects.
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    if s.is_empty() {
        ".".to_string()
    } else {
        s
    }
}

/// Express `path` relative to the project root.
///
/// Relative paths are taken relative to `dir` (itself relative to the root).
/// Absolute paths under `root` are made relative; absolute paths elsewhere
/// are kept as they are.
pub fn project_relative(root: &Path, dir: &Path, path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        if p.starts_with(root) {
            to_slash(&normalize_lexically(&relative_path(root, p)))
        } else {
            to_slash(&normalize_lexically(p))
        }
    } else {
        to_slash(&normalize_lexically(&dir.join(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.c"), "int main() {}").unwrap();
        fs::write(src.join("util.c"), "void util() {}").unwrap();
        fs::write(src.join("readme.txt"), "readme").unwrap();

        let files = glob_files(tmp.path(), &["src/**/*.c".to_string()]);
        assert_eq!(
            files,
            vec![PathBuf::from("src/main.c"), PathBuf::from("src/util.c")]
        );
    }

    #[test]
    fn test_read_source_missing() {
        let tmp = TempDir::new().unwrap();
        let err = read_source(&tmp.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, TranslateError::SourceNotFound { .. }));
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/nested/file.txt");
        write_atomic(&path, "hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        write_atomic(&path, "again").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "again");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("a/./b/../c")),
            PathBuf::from("a/c")
        );
        assert_eq!(
            normalize_lexically(Path::new("../x/../y")),
            PathBuf::from("../y")
        );
        assert_eq!(normalize_lexically(Path::new("a/..")), PathBuf::new());
    }

    #[test]
    fn test_project_relative() {
        let root = Path::new("/work/proj");
        assert_eq!(
            project_relative(root, Path::new("lib"), "src/a.c"),
            "lib/src/a.c"
        );
        assert_eq!(
            project_relative(root, Path::new("lib"), "/work/proj/include"),
            "include"
        );
        assert_eq!(
            project_relative(root, Path::new(""), "/usr/include"),
            "/usr/include"
        );
        assert_eq!(project_relative(root, Path::new("lib"), ".."), ".");
    }

    #[test]
    fn test_is_glob_pattern() {
        assert!(is_glob_pattern("src/*.cpp"));
        assert!(is_glob_pattern("src/**/x?.c"));
        assert!(!is_glob_pattern("src/main.cpp"));
    }
}
