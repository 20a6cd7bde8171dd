//! The intermediate project model.
//!
//! Every importer fills a [`Project`]; every exporter reads one. Nothing in
//! here knows about any particular build system.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use crate::core::dependency::Dependency;
use crate::core::language::CppStandard;
use crate::core::target::Target;
use crate::core::warning::{Severity, TranslationWarning};

/// A translated project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project name
    pub name: String,

    pub version: Option<String>,

    pub description: Option<String>,

    pub homepage: Option<String>,

    pub license: Option<String>,

    /// Project-wide C++ standard
    pub cxx_standard: Option<CppStandard>,

    /// Directory all relative paths are relative to
    pub source_root: PathBuf,

    targets: Vec<Target>,

    dependencies: Vec<Dependency>,

    warnings: Vec<TranslationWarning>,
}

impl Project {
    /// Create an empty project.
    pub fn new(name: impl Into<String>, source_root: impl Into<PathBuf>) -> Self {
        Project {
            name: name.into(),
            version: None,
            description: None,
            homepage: None,
            license: None,
            cxx_standard: None,
            source_root: source_root.into(),
            targets: Vec::new(),
            dependencies: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Create an empty project named after the last component of `root`.
    pub fn named_after(root: &Path) -> Self {
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("project")
            .to_string();
        Self::new(name, root)
    }

    /// All targets in declaration order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// All dependencies in declaration order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// All warnings in arrival order.
    pub fn warnings(&self) -> &[TranslationWarning] {
        &self.warnings
    }

    /// Add a target, merging into an existing target with the same name.
    ///
    /// Returns the stored target.
    pub fn add_target(&mut self, target: Target) -> &mut Target {
        match self.targets.iter().position(|t| t.name == target.name) {
            Some(idx) => {
                tracing::debug!("Merging repeated declaration of target `{}`", target.name);
                let existing = &mut self.targets[idx];
                existing.merge(target);
                existing
            }
            None => {
                self.targets.push(target);
                let last = self.targets.len() - 1;
                &mut self.targets[last]
            }
        }
    }

    /// Look up a target by name.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Look up a target by name for merging more data into it.
    pub fn target_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.name == name)
    }

    /// Check if a target with the given name exists.
    pub fn has_target(&self, name: &str) -> bool {
        self.target(name).is_some()
    }

    /// Append a dependency.
    ///
    /// A dependency with the same name and kind that is already present is
    /// left as it is and the new one is dropped.
    pub fn add_dependency(&mut self, dep: Dependency) {
        if self
            .dependencies
            .iter()
            .any(|d| d.name == dep.name && d.kind == dep.kind)
        {
            return;
        }
        self.dependencies.push(dep);
    }

    /// Look up a dependency by name.
    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    /// Append a warning.
    pub fn warn(&mut self, warning: TranslationWarning) {
        tracing::debug!("{}", warning);
        self.warnings.push(warning);
    }

    /// Append many warnings, keeping their order.
    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = TranslationWarning>) {
        for w in warnings {
            self.warn(w);
        }
    }

    /// Take ownership of the warning list, leaving it empty.
    pub fn take_warnings(&mut self) -> Vec<TranslationWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Check if any warning has error severity.
    pub fn has_errors(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Error)
    }

    /// Record a C++ standard declaration.
    ///
    /// All ways of declaring a standard converge here. The newest standard
    /// wins; a disagreeing declaration is reported.
    pub fn declare_cxx_standard(&mut self, std: CppStandard) -> Option<TranslationWarning> {
        match self.cxx_standard {
            Some(current) if current == std => None,
            Some(current) => {
                let chosen = current.max(std);
                self.cxx_standard = Some(chosen);
                Some(
                    TranslationWarning::warning(format!(
                        "conflicting C++ standards declared ({} and {}); using {}",
                        current, std, chosen
                    ))
                    .with_suggestion("Declare the C++ standard once for the whole project"),
                )
            }
            None => {
                self.cxx_standard = Some(std);
                None
            }
        }
    }

    /// Targets ordered so every target comes after the targets it depends on.
    ///
    /// Dependencies on names that are not targets of this project are ignored.
    /// Falls back to declaration order if the target graph has a cycle.
    pub fn targets_in_dependency_order(&self) -> Vec<&Target> {
        let mut graph = DiGraph::<usize, ()>::new();
        let nodes: Vec<_> = (0..self.targets.len()).map(|i| graph.add_node(i)).collect();
        let index: HashMap<&str, usize> = self
            .targets
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        for (i, target) in self.targets.iter().enumerate() {
            for dep in &target.dependencies {
                if let Some(&j) = index.get(dep.as_str()) {
                    graph.add_edge(nodes[j], nodes[i], ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => {
                // toposort is not stable; re-sort by (depth, declaration order)
                let mut depth = vec![0usize; self.targets.len()];
                for node in &order {
                    let i = graph[*node];
                    for dep in &self.targets[i].dependencies {
                        if let Some(&j) = index.get(dep.as_str()) {
                            depth[i] = depth[i].max(depth[j] + 1);
                        }
                    }
                }
                let mut indices: Vec<usize> = (0..self.targets.len()).collect();
                indices.sort_by_key(|&i| (depth[i], i));
                indices.into_iter().map(|i| &self.targets[i]).collect()
            }
            Err(cycle) => {
                tracing::debug!(
                    "Target graph has a cycle through `{}`; keeping declaration order",
                    self.targets[graph[cycle.node_id()]].name
                );
                self.targets.iter().collect()
            }
        }
    }
}
