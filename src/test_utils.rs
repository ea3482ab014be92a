//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    use crate::core::descriptor::PackageDescriptor;

    /// Generate a valid package name
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9._+-]{0,30}"
    }

    /// Generate a version string
    pub fn version() -> impl Strategy<Value = String> {
        (0u32..50, 0u32..50, 0u32..50)
            .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
    }

    /// Generate a dependency entry with an optional version constraint
    pub fn dependency_entry() -> impl Strategy<Value = String> {
        (
            package_name(),
            proptest::option::of((prop_oneof![">=", "<=", "=", "<", ">"], version())),
        )
            .prop_map(|(name, constraint)| match constraint {
                Some((op, ver)) => format!("{name} {op} {ver}"),
                None => name,
            })
    }

    /// Generate a random acyclic package set named `p0..pN`
    ///
    /// Package `i` only depends on packages `< i`, through runtime or build
    /// dependencies, so declared order is always a valid build order.
    pub fn acyclic_packages(max: usize) -> impl Strategy<Value = Vec<PackageDescriptor>> {
        (1usize..=max.max(1)).prop_flat_map(|n| {
            proptest::collection::vec(
                proptest::collection::vec((any::<prop::sample::Index>(), any::<bool>()), 0..4),
                n,
            )
            .prop_map(|picks| {
                picks
                    .into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        let (mut runtime, mut build) = (Vec::new(), Vec::new());
                        if i > 0 {
                            for (dep, is_runtime) in deps {
                                let name = format!("p{}", dep.index(i));
                                if is_runtime {
                                    runtime.push(name);
                                } else {
                                    build.push(name);
                                }
                            }
                        }
                        PackageDescriptor::new(format!("p{i}"))
                            .with_depends(runtime)
                            .with_makedepends(build)
                    })
                    .collect()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::core::descriptor::{is_valid_package_name, DependencyRef};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator_produces_valid_names(name in package_name()) {
            prop_assert!(is_valid_package_name(&name));
        }

        #[test]
        fn test_dependency_entry_keeps_name_first(entry in dependency_entry()) {
            let dep = DependencyRef::parse(&entry);
            prop_assert!(is_valid_package_name(dep.name));
        }

        #[test]
        fn test_acyclic_packages_only_point_backwards(set in acyclic_packages(16)) {
            for (i, pkg) in set.iter().enumerate() {
                for dep in pkg.runtime_dependency_names().chain(pkg.build_dependency_names()) {
                    let index: usize = dep.trim_start_matches('p').parse().unwrap();
                    prop_assert!(index < i);
                }
            }
        }
    }
}
