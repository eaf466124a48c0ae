//! Retriever adapter interface
//!
//! Concrete wire adapters (REST, SQL, OPTIMADE) live outside this crate and
//! plug in through the `Retriever` trait. `CatalogRetriever` serves a local
//! JSON catalog and is what the CLI uses offline.

pub mod catalog;
pub mod types;

pub use catalog::{load_catalog, CatalogRetriever};
pub use types::{OutputFormat, SearchResult};

use crate::errors::BackendError;
use crate::filters::FilterModel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// One backend's native search, normalized
///
/// Implementations must be safe to call concurrently with other backends.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn fetch(
        &self,
        filters: &FilterModel,
        n_results: usize,
        output_format: OutputFormat,
    ) -> Result<Vec<SearchResult>, BackendError>;
}

/// Retrievers keyed by backend id
#[derive(Clone, Default)]
pub struct RetrieverSet {
    retrievers: HashMap<String, Arc<dyn Retriever>>,
}

impl RetrieverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the retriever for `backend_id`
    pub fn register(&mut self, backend_id: impl Into<String>, retriever: Arc<dyn Retriever>) {
        self.retrievers.insert(backend_id.into(), retriever);
    }

    /// Builder-style registration
    pub fn with(mut self, backend_id: impl Into<String>, retriever: Arc<dyn Retriever>) -> Self {
        self.register(backend_id, retriever);
        self
    }

    pub fn get(&self, backend_id: &str) -> Option<Arc<dyn Retriever>> {
        self.retrievers.get(backend_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.retrievers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retrievers.is_empty()
    }
}

impl std::fmt::Debug for RetrieverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.retrievers.keys().collect();
        ids.sort();
        f.debug_struct("RetrieverSet").field("backends", &ids).finish()
    }
}
