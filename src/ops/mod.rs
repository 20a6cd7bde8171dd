//! High-level operations.
//!
//! This module contains the translation engine driven by the CLI.

pub mod translate;

pub use translate::{ExportReport, TranslateOptions, TranslationEngine};
