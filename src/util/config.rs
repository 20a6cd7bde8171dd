//! Configuration file support.
//!
//! Two configuration file locations are read:
//! - Global: `~/.harbour/config.toml` - User-wide defaults
//! - Project: `.harbour/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Only the
//! `[translate]` table is used here; other tables are ignored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default bound on nested `include`/`add_subdirectory`/`subdir` chains.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Translator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Translation settings
    pub translate: TranslateConfig,
}

/// The `[translate]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Abort exports when an error-severity warning was recorded
    pub strict: Option<bool>,

    /// Report unrecognized constructs as info warnings
    pub verbose: Option<bool>,

    /// Always write a compile_commands.json next to exports
    pub emit_compile_commands: Option<bool>,

    /// Maximum include/subdirectory nesting
    pub max_include_depth: Option<usize>,

    /// Compiler named in generated compile commands
    pub compiler: Option<String>,
}

impl TranslateConfig {
    pub fn strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    pub fn verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }

    pub fn emit_compile_commands(&self) -> bool {
        self.emit_compile_commands.unwrap_or(false)
    }

    pub fn max_include_depth(&self) -> usize {
        self.max_include_depth.unwrap_or(DEFAULT_MAX_INCLUDE_DEPTH)
    }

    pub fn compiler(&self) -> &str {
        self.compiler.as_deref().unwrap_or("c++")
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let ours = &mut self.translate;
        let theirs = other.translate;
        if theirs.strict.is_some() {
            ours.strict = theirs.strict;
        }
        if theirs.verbose.is_some() {
            ours.verbose = theirs.verbose;
        }
        if theirs.emit_compile_commands.is_some() {
            ours.emit_compile_commands = theirs.emit_compile_commands;
        }
        if theirs.max_include_depth.is_some() {
            ours.max_include_depth = theirs.max_include_depth;
        }
        if theirs.compiler.is_some() {
            ours.compiler = theirs.compiler;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.harbour/config.toml)
/// 2. Global config (~/.harbour/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global harbour config directory (~/.harbour).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".harbour"))
}

/// Get the global config path (~/.harbour/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.harbour/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".harbour").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.translate.strict());
        assert_eq!(config.translate.max_include_depth(), 32);
        assert_eq!(config.translate.compiler(), "c++");
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[translate]
strict = true
max_include_depth = 8
compiler = "clang++"

[build]
jobs = 4
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert!(config.translate.strict());
        assert_eq!(config.translate.max_include_depth(), 8);
        assert_eq!(config.translate.compiler(), "clang++");
    }

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[translate]\nstrict = true\ncompiler = \"g++\"\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[translate]\nstrict = false\n").unwrap();

        let config = load_config(Some(&global_path), &project_path);
        assert!(!config.translate.strict());
        // Global compiler survives
        assert_eq!(config.translate.compiler(), "g++");
    }

    #[test]
    fn test_broken_config_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[translate\nstrict = ").unwrap();

        let config = load_config(None, &path);
        assert!(!config.translate.strict());
    }
}
