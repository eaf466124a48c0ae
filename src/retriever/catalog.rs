//! In-memory catalog retriever
//!
//! Catalog file layout: a JSON object mapping backend id to an array of
//! `SearchResult` records.
//!
//! ```json
//! { "bohriumpublic": [ { "id": "bp-1", "formula": "Fe2O3", "band_gap": 2.1 } ] }
//! ```

use crate::errors::{BackendError, ResolveError, Result};
use crate::filters::{formula, FilterModel};
use crate::retriever::{OutputFormat, Retriever, SearchResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Serves records from memory, evaluating filters locally
#[derive(Debug, Clone)]
pub struct CatalogRetriever {
    backend_id: String,
    records: Vec<SearchResult>,
}

impl CatalogRetriever {
    pub fn new(backend_id: impl Into<String>, records: Vec<SearchResult>) -> Self {
        let backend_id = backend_id.into();
        let records = records
            .into_iter()
            .map(|mut record| {
                record.source = backend_id.clone();
                if record.elements.is_empty() {
                    if let Some(f) = &record.formula {
                        record.elements = formula::elements_of(f);
                    }
                }
                record
            })
            .collect();

        Self {
            backend_id,
            records,
        }
    }

    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `record` satisfies every active filter
    pub fn matches(record: &SearchResult, filters: &FilterModel) -> bool {
        if let Some(wanted) = filters.formula() {
            let Some(have) = record.formula.as_deref() else {
                return false;
            };
            if formula::canonical_formula(wanted) != formula::canonical_formula(have) {
                return false;
            }
        }

        if !filters
            .elements()
            .iter()
            .all(|e| record.elements.iter().any(|have| have == e))
        {
            return false;
        }

        if let Some(sg) = filters.space_group() {
            if record.space_group != Some(sg) {
                return false;
            }
        }

        if let Some(range) = filters.band_gap() {
            if !record.band_gap.map_or(false, |v| range.contains(v)) {
                return false;
            }
        }

        if let Some(range) = filters.energy() {
            if !record.formation_energy.map_or(false, |v| range.contains(v)) {
                return false;
            }
        }

        true
    }
}

#[async_trait]
impl Retriever for CatalogRetriever {
    async fn fetch(
        &self,
        filters: &FilterModel,
        n_results: usize,
        output_format: OutputFormat,
    ) -> std::result::Result<Vec<SearchResult>, BackendError> {
        Ok(self
            .records
            .iter()
            .filter(|record| Self::matches(record, filters))
            .take(n_results)
            .cloned()
            .map(|mut record| {
                if record.structure_file.is_none() {
                    if let Some(id) = &record.id {
                        record.structure_file = Some(format!(
                            "{}/{}.{}",
                            self.backend_id,
                            id,
                            output_format.extension()
                        ));
                    }
                }
                record
            })
            .collect())
    }
}

/// Load a catalog file into one retriever per backend id
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRetriever>> {
    let contents = std::fs::read_to_string(path)?;
    let parsed: BTreeMap<String, Vec<SearchResult>> = serde_json::from_str(&contents)
        .map_err(|e| ResolveError::ConfigError(format!("Failed to parse catalog: {}", e)))?;

    Ok(parsed
        .into_iter()
        .map(|(backend_id, records)| CatalogRetriever::new(backend_id, records))
        .collect())
}
