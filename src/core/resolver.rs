//! Dependency resolution
//!
//! Builds the internal dependency graph of a package set and computes the
//! build order as a sequence of batches. Packages inside a batch do not
//! depend on each other and can be built concurrently.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::core::descriptor::PackageDescriptor;
use crate::error::ResolverError;

/// Dependency kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKind {
    /// Needed when the package is installed
    Runtime,
    /// Needed only while building
    Build,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Runtime => write!(f, "runtime"),
            Self::Build => write!(f, "build"),
        }
    }
}

/// An edge between two packages of the same run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Package that needs `dependency`
    pub dependent: String,
    /// Package that must be built first
    pub dependency: String,
    /// Why the edge exists
    pub kind: DependencyKind,
}

/// Dependency graph for packages
///
/// Only dependencies naming a package of the current set become edges;
/// everything else is an external (host) dependency.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Package names in declared order
    nodes: Vec<String>,
    /// package -> packages it depends on
    depends_on: BTreeMap<String, BTreeSet<String>>,
    /// package -> packages depending on it
    depended_by: BTreeMap<String, BTreeSet<String>>,
    /// Every recorded edge with its kind
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a package set
    pub fn from_descriptors<D: AsRef<PackageDescriptor>>(packages: &[D]) -> Self {
        let mut graph = Self::new();
        for pkg in packages {
            graph.add_node(&pkg.as_ref().name);
        }

        for pkg in packages {
            let pkg = pkg.as_ref();
            for dep in pkg.runtime_dependency_names() {
                graph.add_edge(&pkg.name, dep, DependencyKind::Runtime);
            }
            for dep in pkg.build_dependency_names() {
                graph.add_edge(&pkg.name, dep, DependencyKind::Build);
            }
        }

        tracing::debug!(
            packages = graph.nodes.len(),
            internal_dependencies = graph.edges.len(),
            "dependency graph built"
        );

        graph
    }

    /// Add a package to the graph
    pub fn add_node(&mut self, name: &str) {
        if self.depends_on.contains_key(name) {
            return;
        }
        self.nodes.push(name.to_string());
        self.depends_on.insert(name.to_string(), BTreeSet::new());
        self.depended_by.insert(name.to_string(), BTreeSet::new());
    }

    /// Record `dependent -> dependency` when both are in the graph
    ///
    /// Returns whether the edge was kept.
    pub fn add_edge(&mut self, dependent: &str, dependency: &str, kind: DependencyKind) -> bool {
        if !self.depends_on.contains_key(dependency) {
            return false;
        }
        let Some(deps) = self.depends_on.get_mut(dependent) else {
            return false;
        };
        deps.insert(dependency.to_string());
        if let Some(users) = self.depended_by.get_mut(dependency) {
            users.insert(dependent.to_string());
        }
        self.edges.push(DependencyEdge {
            dependent: dependent.to_string(),
            dependency: dependency.to_string(),
            kind,
        });
        true
    }

    /// Whether `name` is a package of this graph
    pub fn contains(&self, name: &str) -> bool {
        self.depends_on.contains_key(name)
    }

    /// Package names in declared order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// All recorded edges
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Internal dependencies of `name`
    pub fn dependencies(&self, name: &str) -> impl Iterator<Item = &str> {
        self.depends_on
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Packages depending on `name`
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &str> {
        self.depended_by
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Number of distinct internal dependencies of `name`
    pub fn in_degree(&self, name: &str) -> usize {
        self.depends_on.get(name).map_or(0, BTreeSet::len)
    }

    /// Count, per package, how many distinct packages depend on it
    pub fn popularity(&self) -> Popularity {
        Popularity {
            counts: self
                .depended_by
                .iter()
                .map(|(name, users)| (name.clone(), users.len()))
                .collect(),
        }
    }

    /// Compute the build batches
    pub fn batches(&self) -> Result<Vec<Batch>, ResolverError> {
        TopologicalBatcher::new(self, &self.popularity()).run()
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        self.batches().is_err()
    }
}

/// How many in-set packages depend on each package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Popularity {
    counts: HashMap<String, usize>,
}

impl Popularity {
    /// Popularity of `name` (zero for unknown names)
    pub fn get(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Packages with a non-zero count, most popular first
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// A set of packages with no unresolved in-set dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// 1-based position in the build order
    pub number: usize,
    /// Package names, most popular first
    pub packages: Vec<String>,
}

impl Batch {
    /// Whether the batch holds `name`
    pub fn contains(&self, name: &str) -> bool {
        self.packages.iter().any(|pkg| pkg == name)
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Kahn's algorithm with a popularity tie-break
pub struct TopologicalBatcher<'a> {
    graph: &'a DependencyGraph,
    popularity: &'a Popularity,
}

impl<'a> TopologicalBatcher<'a> {
    /// Prepare a batcher over `graph`
    pub fn new(graph: &'a DependencyGraph, popularity: &'a Popularity) -> Self {
        Self { graph, popularity }
    }

    /// Produce the ordered batches
    ///
    /// Fails with [`ResolverError::CircularDependency`] as soon as no
    /// package is left with in-degree zero.
    pub fn run(&self) -> Result<Vec<Batch>, ResolverError> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .graph
            .nodes()
            .iter()
            .map(|name| (name.as_str(), self.graph.in_degree(name)))
            .collect();

        let mut batches = Vec::new();

        while !in_degree.is_empty() {
            let mut candidates: Vec<&str> = in_degree
                .iter()
                .filter(|(_, degree)| **degree == 0)
                .map(|(name, _)| *name)
                .collect();

            if candidates.is_empty() {
                let remaining: Vec<String> = in_degree
                    .iter()
                    .map(|(name, degree)| format!("{name}({degree})"))
                    .collect();
                tracing::error!(remaining_packages = ?remaining, "circular dependency detected");
                return Err(ResolverError::CircularDependency { remaining });
            }

            // in_degree iterates by name, so the sort below is stable on name
            candidates.sort_by(|a, b| self.popularity.get(b).cmp(&self.popularity.get(a)));

            for name in &candidates {
                in_degree.remove(name);
                for dependent in self.graph.dependents(name) {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }

            let batch = Batch {
                number: batches.len() + 1,
                packages: candidates.into_iter().map(str::to_string).collect(),
            };
            tracing::debug!(
                batch = batch.number,
                size = batch.len(),
                packages = ?batch.packages,
                "build batch determined"
            );
            batches.push(batch);
        }

        tracing::info!(
            total_batches = batches.len(),
            total_packages = self.graph.nodes().len(),
            "build order determined"
        );

        Ok(batches)
    }
}
