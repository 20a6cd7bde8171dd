//! Target definitions - what gets built.
//!
//! A Target is one buildable artifact of an imported project together with
//! the flags needed to compile and link it.

use serde::{Deserialize, Serialize};

use crate::core::language::{is_header, Language};

/// The kind of target being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Executable binary
    #[default]
    #[serde(alias = "exe", alias = "bin")]
    Executable,

    /// Static library (.a / .lib)
    #[serde(alias = "staticlib", alias = "static")]
    StaticLibrary,

    /// Shared/dynamic library (.so / .dylib / .dll)
    #[serde(alias = "sharedlib", alias = "dylib", alias = "shared")]
    SharedLibrary,

    /// Headers only, nothing to compile
    HeaderOnly,

    /// Usage requirements only (CMake INTERFACE library)
    Interface,

    /// Object files without an archive step
    ObjectLibrary,
}

impl TargetKind {
    /// The snake_case name used in manifests and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Executable => "executable",
            TargetKind::StaticLibrary => "static_library",
            TargetKind::SharedLibrary => "shared_library",
            TargetKind::HeaderOnly => "header_only",
            TargetKind::Interface => "interface",
            TargetKind::ObjectLibrary => "object_library",
        }
    }

    /// Get the typical file extension for this target kind.
    pub fn extension(&self, os: &str) -> &'static str {
        match self {
            TargetKind::Executable => {
                if os == "windows" {
                    "exe"
                } else {
                    ""
                }
            }
            TargetKind::StaticLibrary | TargetKind::ObjectLibrary => {
                if os == "windows" {
                    "lib"
                } else {
                    "a"
                }
            }
            TargetKind::SharedLibrary => match os {
                "windows" => "dll",
                "macos" => "dylib",
                _ => "so",
            },
            TargetKind::HeaderOnly | TargetKind::Interface => "",
        }
    }

    /// Get the typical file prefix for this target kind.
    pub fn prefix(&self, os: &str) -> &'static str {
        match self {
            TargetKind::Executable | TargetKind::HeaderOnly | TargetKind::Interface => "",
            TargetKind::StaticLibrary | TargetKind::SharedLibrary | TargetKind::ObjectLibrary => {
                if os == "windows" {
                    ""
                } else {
                    "lib"
                }
            }
        }
    }

    /// Get the output filename for a target.
    pub fn output_filename(&self, name: &str, os: &str) -> String {
        let prefix = self.prefix(os);
        let ext = self.extension(os);
        if ext.is_empty() {
            format!("{}{}", prefix, name)
        } else {
            format!("{}{}.{}", prefix, name, ext)
        }
    }

    /// Check if this is a library of any flavour.
    pub fn is_library(&self) -> bool {
        !matches!(self, TargetKind::Executable)
    }

    /// Check if this produces a linkable artifact.
    pub fn is_linkable(&self) -> bool {
        matches!(self, TargetKind::StaticLibrary | TargetKind::SharedLibrary)
    }

    /// Check if anything gets compiled for this target.
    pub fn has_artifact(&self) -> bool {
        !matches!(self, TargetKind::HeaderOnly | TargetKind::Interface)
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile and link requirements of a target.
///
/// Defines are stored without the `-D` prefix (`NAME` or `NAME=VALUE`),
/// link libraries without `-l`, frameworks by bare name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagBundle {
    /// Preprocessor defines
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,

    /// Include directories (-I)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_dirs: Vec<String>,

    /// System include directories (-isystem)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system_include_dirs: Vec<String>,

    /// Additional compiler flags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compile_flags: Vec<String>,

    /// Additional linker flags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_flags: Vec<String>,

    /// External libraries to link against
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_libraries: Vec<String>,

    /// macOS frameworks
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frameworks: Vec<String>,
}

impl FlagBundle {
    /// Check if the bundle carries nothing.
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
            && self.include_dirs.is_empty()
            && self.system_include_dirs.is_empty()
            && self.compile_flags.is_empty()
            && self.link_flags.is_empty()
            && self.link_libraries.is_empty()
            && self.frameworks.is_empty()
    }

    /// Add a define, skipping exact duplicates.
    pub fn add_define(&mut self, define: impl Into<String>) {
        push_unique(&mut self.defines, define.into());
    }

    /// Add an include directory, skipping exact duplicates.
    pub fn add_include_dir(&mut self, dir: impl Into<String>) {
        push_unique(&mut self.include_dirs, dir.into());
    }

    /// Add a system include directory, skipping exact duplicates.
    pub fn add_system_include_dir(&mut self, dir: impl Into<String>) {
        push_unique(&mut self.system_include_dirs, dir.into());
    }

    /// Add a compile flag. Flags may legitimately repeat, so no dedup.
    pub fn add_compile_flag(&mut self, flag: impl Into<String>) {
        self.compile_flags.push(flag.into());
    }

    /// Add a link flag.
    pub fn add_link_flag(&mut self, flag: impl Into<String>) {
        self.link_flags.push(flag.into());
    }

    /// Add a link library, skipping exact duplicates.
    pub fn add_link_library(&mut self, lib: impl Into<String>) {
        push_unique(&mut self.link_libraries, lib.into());
    }

    /// Add a framework, skipping exact duplicates.
    pub fn add_framework(&mut self, framework: impl Into<String>) {
        push_unique(&mut self.frameworks, framework.into());
    }

    /// Sort a raw compiler flag into the right bucket.
    ///
    /// `-DX`, `-IX`, `-isystem X` (pre-joined), `-std=` are recognized;
    /// everything else becomes a compile flag.
    pub fn add_compiler_arg(&mut self, arg: &str) {
        if let Some(define) = arg.strip_prefix("-D").or_else(|| arg.strip_prefix("/D")) {
            if !define.is_empty() {
                self.add_define(define);
            }
        } else if let Some(dir) = arg.strip_prefix("-I").or_else(|| arg.strip_prefix("/I")) {
            if !dir.is_empty() {
                self.add_include_dir(dir);
            }
        } else if let Some(dir) = arg.strip_prefix("-isystem") {
            let dir = dir.trim();
            if !dir.is_empty() {
                self.add_system_include_dir(dir);
            }
        } else if !arg.is_empty() {
            self.add_compile_flag(arg);
        }
    }

    /// Sort a raw linker argument into the right bucket.
    pub fn add_linker_arg(&mut self, arg: &str) {
        if let Some(lib) = arg.strip_prefix("-l") {
            if !lib.is_empty() {
                self.add_link_library(lib);
            }
        } else if !arg.is_empty() {
            self.add_link_flag(arg);
        }
    }

    /// Merge another bundle into this one, preserving order.
    pub fn merge(&mut self, other: FlagBundle) {
        for d in other.defines {
            self.add_define(d);
        }
        for d in other.include_dirs {
            self.add_include_dir(d);
        }
        for d in other.system_include_dirs {
            self.add_system_include_dir(d);
        }
        self.compile_flags.extend(other.compile_flags);
        self.link_flags.extend(other.link_flags);
        for l in other.link_libraries {
            self.add_link_library(l);
        }
        for f in other.frameworks {
            self.add_framework(f);
        }
    }

    /// Compiler arguments (`-I`, `-isystem`, `-D`, raw flags) in a stable order.
    pub fn compile_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        args.extend(self.include_dirs.iter().map(|d| format!("-I{}", d)));
        for dir in &self.system_include_dirs {
            args.push("-isystem".to_string());
            args.push(dir.clone());
        }
        args.extend(self.defines.iter().map(|d| format!("-D{}", d)));
        args.extend(self.compile_flags.iter().cloned());
        args
    }

    /// Linker arguments (`-l`, `-framework`, raw flags) in a stable order.
    pub fn link_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.link_flags.clone();
        args.extend(self.link_libraries.iter().map(|l| link_library_flag(l)));
        for fw in &self.frameworks {
            args.push("-framework".to_string());
            args.push(fw.clone());
        }
        args
    }
}

/// Render a link library as a linker argument.
///
/// Bare names become `-lname`; paths and `.a`/`.so`/`.lib` files and anything
/// already starting with `-` are passed through.
pub fn link_library_flag(lib: &str) -> String {
    let looks_like_file = lib.contains('/')
        || lib.contains('\\')
        || [".a", ".so", ".lib", ".dylib", ".tbd"]
            .iter()
            .any(|ext| lib.ends_with(ext));
    if lib.starts_with('-') || looks_like_file {
        lib.to_string()
    } else {
        format!("-l{}", lib)
    }
}

pub(crate) fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// A build target with its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name, unique within a project
    pub name: String,

    /// What kind of artifact to produce
    #[serde(default)]
    pub kind: TargetKind,

    /// Source files (paths or glob patterns, relative to the project root)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    /// Header files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,

    /// Names of other targets in the project this one depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Compile/link requirements
    #[serde(default, skip_serializing_if = "FlagBundle::is_empty")]
    pub flags: FlagBundle,
}

impl Target {
    /// Create a new target with the given name and kind.
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Target {
            name: name.into(),
            kind,
            sources: Vec::new(),
            headers: Vec::new(),
            dependencies: Vec::new(),
            flags: FlagBundle::default(),
        }
    }

    /// Create a new executable target.
    pub fn executable(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::Executable)
    }

    /// Create a new static library target.
    pub fn static_library(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::StaticLibrary)
    }

    /// Create a new shared library target.
    pub fn shared_library(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::SharedLibrary)
    }

    /// Add source files.
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for s in sources {
            self.add_file(s.into());
        }
        self
    }

    /// Add a dependency on another target.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.add_dependency(name);
        self
    }

    /// Add a source file, skipping duplicates.
    pub fn add_source(&mut self, path: impl Into<String>) {
        push_unique(&mut self.sources, path.into());
    }

    /// Add a header file, skipping duplicates.
    pub fn add_header(&mut self, path: impl Into<String>) {
        push_unique(&mut self.headers, path.into());
    }

    /// Add a file, routed to headers or sources by extension.
    pub fn add_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        if is_header(&path) {
            self.add_header(path);
        } else {
            self.add_source(path);
        }
    }

    /// Add a dependency on another target, skipping duplicates and self.
    pub fn add_dependency(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.name {
            push_unique(&mut self.dependencies, name);
        }
    }

    /// Merge a second declaration of the same target into this one.
    ///
    /// The first declaration's kind wins unless it was a placeholder
    /// (interface) and the later one carries real sources.
    pub fn merge(&mut self, other: Target) {
        if self.kind == TargetKind::Interface
            && other.kind != TargetKind::Interface
            && self.sources.is_empty()
        {
            self.kind = other.kind;
        }
        for s in other.sources {
            self.add_source(s);
        }
        for h in other.headers {
            self.add_header(h);
        }
        self.flags.merge(other.flags);
        for d in other.dependencies {
            self.add_dependency(d);
        }
    }

    /// Whether any source needs a C++ driver.
    pub fn is_cxx(&self) -> bool {
        self.sources.iter().any(|s| {
            Language::from_path(s).is_some_and(|l| l.needs_cxx_driver())
                || (s.contains('*') && (s.ends_with("pp") || s.ends_with("cc")))
        })
    }

    /// Get the output filename for this target.
    pub fn output_filename(&self, os: &str) -> String {
        self.kind.output_filename(&self.name, os)
    }
}
