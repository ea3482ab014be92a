//! Build configuration
//!
//! An immutable [`BuildConfig`] value carries every switch of a run. It is
//! assembled once (CLI flags over global defaults) and handed to the
//! project loader and the orchestrator.

use crate::core::global_config::GlobalConfig;
use crate::core::range::RangeFilter;

/// Options controlling one build run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Target distribution (e.g. `debian`, `arch`)
    pub distro: String,
    /// Distribution release / codename
    pub release: Option<String>,
    /// Build with the dependency-aware worker pool
    pub parallel: bool,
    /// Upper bound on concurrent workers
    pub jobs: usize,
    /// Remove source directories before building
    pub clean_build: bool,
    /// Skip the build stages, packaging and installs
    pub no_build: bool,
    /// Do not install make dependencies from the host repositories
    pub skip_make_deps: bool,
    /// Do not refresh the host package index or install external runtime deps
    pub skip_sync_deps: bool,
    /// Remove the whole build copy of every package before building
    pub zap: bool,
    /// First package of the range
    pub from_pkg: Option<String>,
    /// Last package of the range
    pub to_pkg: Option<String>,
    /// Cross-compilation target architecture
    pub target_arch: Option<String>,
}

impl BuildConfig {
    /// Create a configuration with defaults for `distro`
    pub fn new(distro: impl Into<String>) -> Self {
        Self {
            distro: distro.into(),
            release: None,
            parallel: false,
            jobs: num_cpus::get(),
            clean_build: false,
            no_build: false,
            skip_make_deps: false,
            skip_sync_deps: false,
            zap: false,
            from_pkg: None,
            to_pkg: None,
            target_arch: None,
        }
    }

    /// Seed a configuration from global defaults
    pub fn from_global(distro: impl Into<String>, global: &GlobalConfig) -> Self {
        let mut config = Self::new(distro);
        config.parallel = global.build.parallel.unwrap_or(false);
        if let Some(jobs) = global.build.jobs {
            config.jobs = jobs;
        }
        config.skip_make_deps = global.build.skip_make_deps.unwrap_or(false);
        config.skip_sync_deps = global.build.skip_sync_deps.unwrap_or(false);
        config
    }

    /// Set the release
    #[must_use]
    pub fn with_release(mut self, release: Option<String>) -> Self {
        self.release = release;
        self
    }

    /// Enable or disable parallel mode
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Cap concurrent workers (at least one)
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Enable dry-run mode
    #[must_use]
    pub fn with_no_build(mut self, no_build: bool) -> Self {
        self.no_build = no_build;
        self
    }

    /// Remove source directories first
    #[must_use]
    pub fn with_clean_build(mut self, clean_build: bool) -> Self {
        self.clean_build = clean_build;
        self
    }

    /// Remove build copies first
    #[must_use]
    pub fn with_zap(mut self, zap: bool) -> Self {
        self.zap = zap;
        self
    }

    /// Skip make dependency installation
    #[must_use]
    pub fn with_skip_make_deps(mut self, skip: bool) -> Self {
        self.skip_make_deps = skip;
        self
    }

    /// Skip host index refresh and external runtime dependencies
    #[must_use]
    pub fn with_skip_sync_deps(mut self, skip: bool) -> Self {
        self.skip_sync_deps = skip;
        self
    }

    /// Restrict the run to `from..=to`
    #[must_use]
    pub fn with_range(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from_pkg = from;
        self.to_pkg = to;
        self
    }

    /// Set the cross-compilation target
    #[must_use]
    pub fn with_target_arch(mut self, target_arch: Option<String>) -> Self {
        self.target_arch = target_arch.filter(|arch| !arch.is_empty());
        self
    }

    /// Range filter derived from `from_pkg`/`to_pkg`
    pub fn range(&self) -> RangeFilter {
        RangeFilter::new(self.from_pkg.clone(), self.to_pkg.clone())
    }

    /// Worker count for a group of `len` jobs
    pub fn workers_for(&self, len: usize) -> usize {
        self.jobs.min(len).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::global_config::BuildDefaults;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::new("debian");
        assert_eq!(config.distro, "debian");
        assert!(!config.parallel);
        assert!(config.jobs >= 1);
        assert!(config.range().is_unbounded());
    }

    #[test]
    fn test_global_defaults_are_applied() {
        let global = GlobalConfig {
            build: BuildDefaults {
                parallel: Some(true),
                jobs: Some(3),
                skip_sync_deps: Some(true),
                skip_make_deps: None,
            },
        };
        let config = BuildConfig::from_global("arch", &global);
        assert!(config.parallel);
        assert_eq!(config.jobs, 3);
        assert!(config.skip_sync_deps);
        assert!(!config.skip_make_deps);
    }

    #[test]
    fn test_workers_for_is_bounded() {
        let config = BuildConfig::new("alpine").with_jobs(4);
        assert_eq!(config.workers_for(10), 4);
        assert_eq!(config.workers_for(2), 2);
        assert_eq!(config.workers_for(0), 1);
    }

    #[test]
    fn test_empty_target_arch_is_unset() {
        let config = BuildConfig::new("alpine").with_target_arch(Some(String::new()));
        assert_eq!(config.target_arch, None);
    }
}
