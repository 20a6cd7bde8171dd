//! Test utilities for unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::test_support::write_tree;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! write_tree(tmp.path(), &[("CMakeLists.txt", "project(Demo)")]);
//! ```

pub mod fixtures;

use std::path::Path;

pub use fixtures::*;

/// Write `(relative path, contents)` pairs below `base`, creating directories.
pub fn write_tree(base: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = base.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
    }
}

/// Read a file below `base` into a string.
pub fn read(base: &Path, rel: &str) -> String {
    std::fs::read_to_string(base.join(rel)).unwrap()
}
