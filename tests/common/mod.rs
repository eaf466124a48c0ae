//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use matquery::errors::{BackendError, LlmError};
use matquery::filters::FilterModel;
use matquery::llm::{LlmClient, Prompt};
use matquery::retriever::{CatalogRetriever, OutputFormat, Retriever, RetrieverSet, SearchResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// LLM fake replaying canned replies in order
pub struct ScriptedLlm {
    replies: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _prompt: &Prompt) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LlmError::Api("no scripted reply left".to_string()))
    }
}

/// Retriever that always fails
pub struct FailingRetriever {
    pub backend: String,
}

#[async_trait]
impl Retriever for FailingRetriever {
    async fn fetch(
        &self,
        _filters: &FilterModel,
        _n_results: usize,
        _output_format: OutputFormat,
    ) -> Result<Vec<SearchResult>, BackendError> {
        Err(BackendError::Request {
            backend: self.backend.clone(),
            message: "connection refused".to_string(),
        })
    }
}

/// Wraps another retriever and answers only after `delay`
pub struct DelayedRetriever {
    pub inner: Arc<dyn Retriever>,
    pub delay: Duration,
}

#[async_trait]
impl Retriever for DelayedRetriever {
    async fn fetch(
        &self,
        filters: &FilterModel,
        n_results: usize,
        output_format: OutputFormat,
    ) -> Result<Vec<SearchResult>, BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch(filters, n_results, output_format).await
    }
}

pub fn delayed(inner: Arc<dyn Retriever>, delay: Duration) -> Arc<DelayedRetriever> {
    Arc::new(DelayedRetriever { inner, delay })
}

fn record(id: &str, formula: &str, space_group: u16) -> SearchResult {
    SearchResult::new("", id)
        .with_formula(formula)
        .with_space_group(space_group)
}

pub fn bohrium_catalog() -> CatalogRetriever {
    CatalogRetriever::new(
        "bohriumpublic",
        vec![
            record("bp-1", "Fe2O3", 167).with_band_gap(2.1),
            record("bp-2", "Fe2O3", 227).with_band_gap(1.9),
            record("bp-3", "Fe2O3", 33),
            record("bp-4", "Fe2O3", 206),
            record("bp-5", "Fe2O3", 62),
            record("bp-6", "NaCl", 225).with_band_gap(5.0),
        ],
    )
}

pub fn openlam_catalog() -> CatalogRetriever {
    CatalogRetriever::new(
        "openlam",
        vec![
            record("ol-1", "Fe2O3", 12).with_formation_energy(-1.7),
            record("ol-2", "LiFePO4", 62).with_formation_energy(-2.5),
            record("ol-3", "LiFePO4", 33).with_formation_energy(-2.4),
            record("ol-4", "LiFePO4", 14).with_formation_energy(-2.3),
        ],
    )
}

pub fn optimade_catalog() -> CatalogRetriever {
    CatalogRetriever::new(
        "optimade",
        vec![
            // same structure as bp-1
            record("mp-19770", "Fe4O6", 167),
            record("mp-24972", "Fe2O3", 148),
        ],
    )
}

pub fn mofdb_catalog() -> CatalogRetriever {
    CatalogRetriever::new(
        "mofdbsql",
        vec![SearchResult::new("", "ZIF-8").with_formula("ZnC8H10N4")],
    )
}

/// All four built-in backends served from memory
pub fn catalog_retrievers() -> RetrieverSet {
    RetrieverSet::new()
        .with("bohriumpublic", Arc::new(bohrium_catalog()))
        .with("openlam", Arc::new(openlam_catalog()))
        .with("optimade", Arc::new(optimade_catalog()))
        .with("mofdbsql", Arc::new(mofdb_catalog()))
}
