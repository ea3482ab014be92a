//! Build orchestration logic
//!
//! Coordinates the build of a package set, either one package at a time
//! in declared order or batch by batch on a worker pool.
//!
//! # Install rule
//!
//! A package is installed right after it is packaged when it is flagged
//! with `install = true` or when another package of the project needs it
//! at runtime or to build. In parallel mode those internal dependencies
//! are built and installed before the rest of their batch starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::core::classifier::{analyze, log_analysis, InternalDependencies};
use crate::core::config::BuildConfig;
use crate::core::descriptor::PackageDescriptor;
use crate::core::packer::Packer;
use crate::core::pool::WorkerPool;
use crate::core::resolver::{Batch, DependencyGraph, TopologicalBatcher};
use crate::core::stage::StageRunner;
use crate::error::{BuildError, MultipackError};

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Packages whose stages ran, in completion order
    pub processed: Vec<String>,
    /// Packages turned into artifacts
    pub packaged: Vec<String>,
    /// Packages installed (or extracted) after packaging
    pub installed: Vec<String>,
    /// Batches scheduled in parallel mode
    pub batches: Vec<Batch>,
}

/// State shared by every build job
struct JobContext<R, P> {
    runner: Arc<R>,
    packer: Arc<P>,
    config: Arc<BuildConfig>,
    output: PathBuf,
    build_dir: PathBuf,
    report: Mutex<BuildReport>,
}

impl<R: StageRunner, P: Packer> JobContext<R, P> {
    /// Stages, packaging and optional install of one package
    async fn build_one(&self, package: &PackageDescriptor, install: bool) -> Result<(), BuildError> {
        tracing::info!(package = %package.full_version(), "building package");

        self.runner.compile(package, self.config.no_build).await?;
        self.record(|report| report.processed.push(package.name.clone()));

        if self.config.no_build {
            return Ok(());
        }

        let artifact = self
            .packer
            .build_package(package, &self.output)
            .await
            .map_err(|e| BuildError::PackagingFailed {
                package: package.name.clone(),
                error: e.to_string(),
            })?;
        tracing::debug!(package = %package.name, artifact = %artifact.display(), "package created");
        self.record(|report| report.packaged.push(package.name.clone()));

        if install {
            self.install(package).await?;
        }
        Ok(())
    }

    async fn install(&self, package: &PackageDescriptor) -> Result<(), BuildError> {
        let result = match self.config.target_arch.as_deref() {
            Some(target) => {
                self.packer
                    .install_or_extract(package, &self.output, &self.build_dir, target)
                    .await
            }
            None => self.packer.install(package, &self.output).await,
        };
        result.map_err(|e| BuildError::InstallFailed {
            package: package.name.clone(),
            error: e.to_string(),
        })?;

        tracing::info!(package = %package.name, "package installed");
        self.record(|report| report.installed.push(package.name.clone()));
        Ok(())
    }

    fn record(&self, update: impl FnOnce(&mut BuildReport)) {
        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut report);
    }
}

/// Runs a package set through the stage runner and the packer
pub struct BuildOrchestrator<R, P> {
    context: Arc<JobContext<R, P>>,
}

impl<R: StageRunner, P: Packer> BuildOrchestrator<R, P> {
    /// Create an orchestrator writing artifacts to `output`
    pub fn new(
        runner: R,
        packer: P,
        config: BuildConfig,
        output: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            context: Arc::new(JobContext {
                runner: Arc::new(runner),
                packer: Arc::new(packer),
                config: Arc::new(config),
                output: output.into(),
                build_dir: build_dir.into(),
                report: Mutex::new(BuildReport::default()),
            }),
        }
    }

    /// Configuration of this run
    pub fn config(&self) -> &BuildConfig {
        &self.context.config
    }

    /// Artifact output directory
    pub fn output(&self) -> &Path {
        &self.context.output
    }

    /// Build `packages` (the full project, in declared order)
    ///
    /// The range filter is validated against the full set before any
    /// package is touched.
    pub async fn run(&self, packages: &[Arc<PackageDescriptor>]) -> Result<BuildReport, MultipackError> {
        let range = self.context.config.range();
        let selected = range.apply(packages)?;
        let internal = InternalDependencies::from_descriptors(packages);
        log_analysis(&analyze(packages, &internal));

        if self.context.config.parallel {
            self.run_parallel(&selected, &internal).await?;
        } else {
            self.run_sequential(&selected, &internal).await?;
        }

        let report = self
            .context
            .report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(report)
    }

    /// Declared order, one package at a time
    async fn run_sequential(
        &self,
        selected: &[Arc<PackageDescriptor>],
        internal: &InternalDependencies,
    ) -> Result<(), MultipackError> {
        tracing::info!(packages = selected.len(), "sequential build starting");

        for package in selected {
            self.context
                .build_one(package, internal.needs_install(package))
                .await?;
        }
        Ok(())
    }

    /// Dependency batches on a worker pool
    async fn run_parallel(
        &self,
        selected: &[Arc<PackageDescriptor>],
        internal: &InternalDependencies,
    ) -> Result<(), MultipackError> {
        let graph = DependencyGraph::from_descriptors(selected);
        let popularity = graph.popularity();
        let batches = TopologicalBatcher::new(&graph, &popularity).run()?;

        let by_name: HashMap<&str, &Arc<PackageDescriptor>> =
            selected.iter().map(|p| (p.name.as_str(), p)).collect();
        let range = self.context.config.range();

        tracing::info!(
            batches = batches.len(),
            packages = selected.len(),
            max_workers = self.context.config.jobs,
            internal_dependencies = ?internal.names(),
            "dependency-aware build starting"
        );

        for (index, batch) in batches.iter().enumerate() {
            let (dependencies, regular): (Vec<_>, Vec<_>) = batch
                .packages
                .iter()
                .filter_map(|name| by_name.get(name.as_str()).map(|p| Arc::clone(p)))
                .partition(|p| internal.is_internal_dependency(&p.name));

            tracing::debug!(
                batch = batch.number,
                dependencies = dependencies.len(),
                regular = regular.len(),
                "processing build batch"
            );
            self.context.record(|report| report.batches.push(batch.clone()));

            // Each internal dependency is installed by the job that built it
            self.run_pool(dependencies, |_| true).await?;
            self.run_pool(regular, |p| p.must_install_after_build).await?;

            if batch.packages.iter().any(|name| range.is_end(name)) {
                let skipped: Vec<&str> = batches[index + 1..]
                    .iter()
                    .flat_map(|later| later.packages.iter().map(String::as_str))
                    .collect();
                if skipped.is_empty() {
                    tracing::info!(batch = batch.number, "range end reached");
                } else {
                    tracing::warn!(
                        batch = batch.number,
                        skipped = ?skipped,
                        "range end reached; later batches are not built"
                    );
                }
                break;
            }
        }
        Ok(())
    }

    async fn run_pool(
        &self,
        packages: Vec<Arc<PackageDescriptor>>,
        install: fn(&PackageDescriptor) -> bool,
    ) -> Result<(), BuildError> {
        let pool = WorkerPool::new(self.context.config.workers_for(packages.len()));
        let context = Arc::clone(&self.context);

        pool.run(packages, move |package| {
            let context = Arc::clone(&context);
            async move { context.build_one(&package, install(&package)).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackerError;
    use std::future::Future;

    #[derive(Default)]
    struct NoopRunner;

    impl StageRunner for NoopRunner {
        fn compile(
            &self,
            _package: &PackageDescriptor,
            _dry_run: bool,
        ) -> impl Future<Output = Result<(), BuildError>> + Send {
            async { Ok(()) }
        }
    }

    #[derive(Default)]
    struct NoopPacker;

    impl Packer for NoopPacker {
        fn build_package(
            &self,
            package: &PackageDescriptor,
            output: &Path,
        ) -> impl Future<Output = Result<PathBuf, PackerError>> + Send {
            let path = output.join(&package.name);
            async move { Ok(path) }
        }

        fn install(
            &self,
            _package: &PackageDescriptor,
            _output: &Path,
        ) -> impl Future<Output = Result<(), PackerError>> + Send {
            async { Ok(()) }
        }

        fn install_or_extract(
            &self,
            _package: &PackageDescriptor,
            _output: &Path,
            _build_dir: &Path,
            _target_arch: &str,
        ) -> impl Future<Output = Result<(), PackerError>> + Send {
            async { Ok(()) }
        }

        fn update(&self) -> impl Future<Output = Result<(), PackerError>> + Send {
            async { Ok(()) }
        }

        fn prepare(&self, _depends: &[String]) -> impl Future<Output = Result<(), PackerError>> + Send {
            async { Ok(()) }
        }
    }

    fn set() -> Vec<Arc<PackageDescriptor>> {
        vec![
            Arc::new(PackageDescriptor::new("lib")),
            Arc::new(PackageDescriptor::new("app").with_depends(["lib"])),
            Arc::new(PackageDescriptor::new("tool").install_after_build(true)),
        ]
    }

    fn orchestrator(config: BuildConfig) -> BuildOrchestrator<NoopRunner, NoopPacker> {
        BuildOrchestrator::new(NoopRunner, NoopPacker, config, "/tmp/out", "/tmp/build")
    }

    #[tokio::test]
    async fn test_sequential_installs_internal_deps_and_flagged() {
        let report = orchestrator(BuildConfig::new("arch"))
            .run(&set())
            .await
            .unwrap();

        assert_eq!(report.processed, vec!["lib", "app", "tool"]);
        assert_eq!(report.installed, vec!["lib", "tool"]);
        assert!(report.batches.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_records_batches() {
        let config = BuildConfig::new("arch").with_parallel(true).with_jobs(2);
        let report = orchestrator(config).run(&set()).await.unwrap();

        assert_eq!(report.batches.len(), 2);
        assert_eq!(report.batches[1].packages, vec!["app"]);
        assert_eq!(report.processed.len(), 3);
        assert!(report.installed.contains(&"lib".to_string()));
        assert!(report.installed.contains(&"tool".to_string()));
        assert!(!report.installed.contains(&"app".to_string()));
    }

    #[tokio::test]
    async fn test_build_dependencies_are_installed_in_both_modes() {
        let packages = vec![
            Arc::new(PackageDescriptor::new("codegen")),
            Arc::new(PackageDescriptor::new("app").with_makedepends(["codegen"])),
        ];
        for parallel in [false, true] {
            let config = BuildConfig::new("arch").with_parallel(parallel);
            let report = orchestrator(config).run(&packages).await.unwrap();
            assert_eq!(report.installed, vec!["codegen"], "parallel={parallel}");
        }
    }

    #[tokio::test]
    async fn test_parallel_report_keeps_only_batches_run() {
        let packages = vec![
            Arc::new(PackageDescriptor::new("app").with_depends(["lib"])),
            Arc::new(PackageDescriptor::new("lib")),
        ];
        let config = BuildConfig::new("arch")
            .with_parallel(true)
            .with_range(None, Some("lib".into()));
        let report = orchestrator(config).run(&packages).await.unwrap();

        assert_eq!(report.batches.len(), 1);
        assert_eq!(report.batches[0].packages, vec!["lib"]);
        assert_eq!(report.processed, vec!["lib"]);
    }

    #[tokio::test]
    async fn test_report_survives_poisoned_lock() {
        let orchestrator = orchestrator(BuildConfig::new("arch"));
        let context = Arc::clone(&orchestrator.context);
        let _ = std::thread::spawn(move || {
            let _guard = context.report.lock().unwrap();
            panic!("worker panicked while holding the report");
        })
        .join();
        assert!(orchestrator.context.report.is_poisoned());

        let report = orchestrator.run(&set()).await.unwrap();
        assert_eq!(report.processed, vec!["lib", "app", "tool"]);
        assert_eq!(report.installed, vec!["lib", "tool"]);
    }

    #[tokio::test]
    async fn test_no_build_skips_packaging() {
        let config = BuildConfig::new("arch").with_no_build(true);
        let report = orchestrator(config).run(&set()).await.unwrap();

        assert_eq!(report.processed.len(), 3);
        assert!(report.packaged.is_empty());
        assert!(report.installed.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_range_fails() {
        let config = BuildConfig::new("arch").with_range(Some("ghost".into()), None);
        let result = orchestrator(config).run(&set()).await;
        assert!(matches!(result, Err(MultipackError::Range(_))));
    }

    #[tokio::test]
    async fn test_cycle_fails_in_parallel_mode() {
        let packages = vec![
            Arc::new(PackageDescriptor::new("a").with_depends(["b"])),
            Arc::new(PackageDescriptor::new("b").with_depends(["a"])),
        ];
        let config = BuildConfig::new("arch").with_parallel(true);
        let result = orchestrator(config).run(&packages).await;
        assert!(matches!(result, Err(MultipackError::Resolver(_))));
    }
}
