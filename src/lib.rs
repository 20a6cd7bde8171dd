//! Harbour Translate - build description translation for C and C++
//!
//! This crate reads foreign build descriptions (CMake, Meson, Makefiles,
//! Xcode and Visual Studio projects, vcpkg and Conan manifests) into one
//! project model and writes that model back out in another format.

pub mod core;
pub mod export;
pub mod import;
pub mod ops;
pub mod util;

/// Test utilities for unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// writes fixture trees and builds sample projects in memory.
#[cfg(test)]
pub mod test_support;

pub use core::{
    dependency::Dependency, error::TranslateError, format::BuildFormat, project::Project,
    target::Target, warning::TranslationWarning,
};

pub use ops::{TranslateOptions, TranslationEngine};
