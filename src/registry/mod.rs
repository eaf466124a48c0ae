//! Database registry
//!
//! Built once at startup and shared read-only behind `Arc`.

pub mod descriptor;

pub use descriptor::{builtin_descriptors, DatabaseDescriptor};

use crate::errors::{ResolveError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered set of registered databases
#[derive(Debug, Clone)]
pub struct DatabaseRegistry {
    descriptors: Vec<Arc<DatabaseDescriptor>>,
}

impl DatabaseRegistry {
    /// Create registry; registration order is preserved
    pub fn new(descriptors: Vec<DatabaseDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if descriptor.id.trim().is_empty() {
                return Err(ResolveError::ConfigError(
                    "database id must not be empty".to_string(),
                ));
            }
            if !seen.insert(descriptor.id.as_str()) {
                return Err(ResolveError::ConfigError(format!(
                    "duplicate database id: {}",
                    descriptor.id
                )));
            }
            if descriptor.priority == 0 {
                return Err(ResolveError::ConfigError(format!(
                    "database {} priority must be at least 1",
                    descriptor.id
                )));
            }
        }

        Ok(Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
        })
    }

    /// Registry of the built-in databases
    pub fn builtin() -> Self {
        Self {
            descriptors: builtin_descriptors().into_iter().map(Arc::new).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<DatabaseDescriptor>> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<DatabaseDescriptor>> {
        self.descriptors.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for DatabaseRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
