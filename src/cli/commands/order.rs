//! Order command implementation
//!
//! Implements `multipack order` to display the build batches of a project
//! without touching the host.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::OutputConfig;
use crate::core::classifier::{analyze, InstallReason, InternalDependencies, PackageAnalysis};
use crate::core::config::BuildConfig;
use crate::core::project::Project;
use crate::core::resolver::{Batch, DependencyGraph, TopologicalBatcher};
use crate::error::MultipackError;

/// Build plan of a project
#[derive(Debug, Serialize)]
pub struct BuildPlan {
    /// Project name
    pub project: String,
    /// Batches in build order
    pub batches: Vec<Batch>,
    /// In-set dependents per package, most popular first
    pub popularity: Vec<(String, usize)>,
    /// Per-package dependency analysis
    pub packages: Vec<PackageAnalysis>,
}

/// Compute the plan for the project at `project_dir`
pub fn plan(project_dir: &Path) -> Result<BuildPlan, MultipackError> {
    let project = Project::load(project_dir)?;
    // ordering does not depend on the target distribution
    let packages = project.populate(&BuildConfig::new(""))?;

    let graph = DependencyGraph::from_descriptors(&packages);
    let popularity = graph.popularity();
    let batches = TopologicalBatcher::new(&graph, &popularity).run()?;
    let internal = InternalDependencies::from_descriptors(&packages);

    Ok(BuildPlan {
        project: project.name,
        batches,
        popularity: popularity
            .ranked()
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect(),
        packages: analyze(&packages, &internal),
    })
}

/// Execute the order command
pub fn execute(project_dir: &Path) -> Result<()> {
    let plan = plan(project_dir)?;

    if OutputConfig::current().json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let installs: Vec<&str> = plan
        .packages
        .iter()
        .filter(|p| p.install != InstallReason::BuildOnly)
        .map(|p| p.name.as_str())
        .collect();

    println!("Build order for {}:", plan.project);
    for batch in &plan.batches {
        let names: Vec<String> = batch
            .packages
            .iter()
            .map(|name| {
                if installs.contains(&name.as_str()) {
                    format!("{name}*")
                } else {
                    name.clone()
                }
            })
            .collect();
        println!("  batch {}: {}", batch.number, names.join(", "));
    }
    if !plan.popularity.is_empty() {
        println!("Popularity:");
        for (name, count) in &plan.popularity {
            println!("  {name}: {count}");
        }
    }
    println!("(* installed right after build)");
    Ok(())
}
