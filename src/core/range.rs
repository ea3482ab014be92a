//! Package range selection
//!
//! Restricts a run to the inclusive window between a `from` and a `to`
//! package, in declared order.

use crate::core::descriptor::PackageDescriptor;
use crate::error::RangeError;

/// Inclusive `from..=to` window over declared package order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeFilter {
    /// First package to process
    pub from: Option<String>,
    /// Last package to process
    pub to: Option<String>,
}

impl RangeFilter {
    /// Create a filter; empty names count as unset
    pub fn new(from: Option<String>, to: Option<String>) -> Self {
        Self {
            from: from.filter(|name| !name.is_empty()),
            to: to.filter(|name| !name.is_empty()),
        }
    }

    /// Whether neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Check both bounds against the full package list
    pub fn validate<D: AsRef<PackageDescriptor>>(&self, packages: &[D]) -> Result<(), RangeError> {
        let position = |name: &str| {
            packages
                .iter()
                .position(|p| p.as_ref().name == name)
                .ok_or_else(|| RangeError::PackageNotFound {
                    name: name.to_string(),
                })
        };

        let first = self.from.as_deref().map(position).transpose()?;
        let last = self.to.as_deref().map(position).transpose()?;

        if let (Some(first), Some(last)) = (first, last) {
            if first > last {
                return Err(RangeError::InvalidOrder {
                    from: self.from.clone().unwrap_or_default(),
                    to: self.to.clone().unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    /// Truncate `packages` to the window, preserving order
    pub fn apply<D>(&self, packages: &[D]) -> Result<Vec<D>, RangeError>
    where
        D: AsRef<PackageDescriptor> + Clone,
    {
        self.validate(packages)?;

        let mut selected = Vec::with_capacity(packages.len());
        let mut started = self.from.is_none();

        for pkg in packages {
            let name = pkg.as_ref().name.as_str();
            if !started && self.from.as_deref() == Some(name) {
                started = true;
            }
            if !started {
                continue;
            }
            selected.push(pkg.clone());
            if self.is_end(name) {
                break;
            }
        }

        Ok(selected)
    }

    /// Whether `name` is the `to` boundary
    pub fn is_end(&self, name: &str) -> bool {
        self.to.as_deref() == Some(name)
    }
}
