//! Core data structures for the translator.
//!
//! This module contains the format-independent project model:
//! - Project, Target, Dependency and the flag bundle
//! - Translation warnings and errors
//! - Build format identification
//! - The native manifest reader/writer

pub mod dependency;
pub mod error;
pub mod format;
pub mod language;
pub mod manifest;
pub mod project;
pub mod target;
pub mod warning;

pub use dependency::{Dependency, DependencyKind};
pub use error::{Direction, TranslateError};
pub use format::BuildFormat;
pub use language::{CppStandard, Language};
pub use project::Project;
pub use target::{FlagBundle, Target, TargetKind};
pub use warning::{Severity, SourceLocation, TranslationWarning};
