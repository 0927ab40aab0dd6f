//! Constraint registry
//!
//! Provides [`ConstraintRegistry`], a caller-owned map from name to
//! [`ConfigConstraint`].

use std::collections::HashMap;
use std::sync::Arc;

use reconfig_core::{CanonicalKey, HashError};

use crate::constraint::ConfigConstraint;

/// Named constraints, structurally identical ones sharing storage
///
/// Two constraints are identical when their canonical keys match, so
/// differing set order or map key order does not matter.
#[derive(Debug, Default, Clone)]
pub struct ConstraintRegistry {
    by_name: HashMap<String, Arc<ConfigConstraint>>,
    by_key: HashMap<CanonicalKey, Arc<ConfigConstraint>>,
}

impl ConstraintRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constraint under `name`
    ///
    /// Returns the shared instance, which is an earlier registration when
    /// one is structurally identical.
    ///
    /// # Errors
    /// Returns error if the constraint cannot be canonically encoded
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constraint: ConfigConstraint,
    ) -> Result<Arc<ConfigConstraint>, HashError> {
        let name = name.into();
        let key = constraint.canonical_key()?;
        let shared = match self.by_key.get(&key) {
            Some(existing) => {
                tracing::debug!(name = %name, key = %key.short(), "constraint deduplicated");
                Arc::clone(existing)
            }
            None => {
                let shared = Arc::new(constraint);
                self.by_key.insert(key, Arc::clone(&shared));
                shared
            }
        };
        if let Some(previous) = self.by_name.insert(name, Arc::clone(&shared)) {
            self.release(&previous);
        }
        Ok(shared)
    }

    /// Look up a constraint by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ConfigConstraint>> {
        self.by_name.get(name).cloned()
    }

    /// Check if a name is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Remove a name
    ///
    /// Shared storage is released once no name refers to it.
    pub fn remove(&mut self, name: &str) -> Option<Arc<ConfigConstraint>> {
        let removed = self.by_name.remove(name)?;
        self.release(&removed);
        Some(removed)
    }

    fn release(&mut self, constraint: &Arc<ConfigConstraint>) {
        let still_used = self.by_name.values().any(|c| Arc::ptr_eq(c, constraint));
        if !still_used {
            self.by_key.retain(|_, c| !Arc::ptr_eq(c, constraint));
        }
    }

    /// List all registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get number of registered names
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Number of distinct constraints stored
    #[inline]
    #[must_use]
    pub fn unique_count(&self) -> usize {
        self.by_key.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconfig_core::FormatterConfig;

    fn constraint(statics: &[&str]) -> ConfigConstraint {
        let mut cc = ConfigConstraint::new(FormatterConfig::new("ini").with_ini_section("mysqld"));
        cc.static_parameters = statics.iter().map(|s| (*s).to_string()).collect();
        cc
    }

    #[test]
    fn identical_constraints_share_one_arc() {
        let mut registry = ConstraintRegistry::new();
        let a = registry.register("mysql-8.0", constraint(&["port", "datadir"])).unwrap();
        let b = registry.register("mysql-8.4", constraint(&["datadir", "port"])).unwrap();
        let c = registry.register("mariadb", constraint(&["port"])).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.unique_count(), 2);
        assert_eq!(registry.names(), vec!["mariadb", "mysql-8.0", "mysql-8.4"]);
    }

    #[test]
    fn remove_releases_unshared_storage() {
        let mut registry = ConstraintRegistry::new();
        registry.register("a", constraint(&["x"])).unwrap();
        registry.register("b", constraint(&["x"])).unwrap();

        registry.remove("a").unwrap();
        assert_eq!(registry.unique_count(), 1);
        assert!(registry.get("b").is_some());

        registry.remove("b").unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.unique_count(), 0);
        assert!(registry.remove("b").is_none());
    }

    #[test]
    fn reregistering_a_name_replaces_it() {
        let mut registry = ConstraintRegistry::new();
        registry.register("a", constraint(&["x"])).unwrap();
        registry.register("a", constraint(&["y"])).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unique_count(), 1);
        assert!(registry.get("a").unwrap().static_parameters.contains("y"));
        assert!(registry.contains("a"));
    }
}
