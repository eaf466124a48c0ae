//! Ranked response shape

use crate::retriever::SearchResult;
use crate::search::{BackendOutcome, OutcomeStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// One deduplicated, scored result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    #[serde(flatten)]
    pub result: SearchResult,
    pub score: f64,
    /// Other backends that returned the same structure
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub also_found_in: Vec<String>,
}

/// Per-backend line of the outcome summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSummary {
    pub backend_id: String,
    pub status: OutcomeStatus,
    pub relaxation_steps: u32,
    pub result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&BackendOutcome> for OutcomeSummary {
    fn from(outcome: &BackendOutcome) -> Self {
        Self {
            backend_id: outcome.backend_id.clone(),
            status: outcome.status,
            relaxation_steps: outcome.relaxation_steps,
            result_count: outcome.result_count(),
            message: outcome.message.clone(),
        }
    }
}

/// Final ordered, bounded result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResponse {
    /// Unique results before truncation
    pub n_found: usize,
    /// Results after truncation
    pub returned: usize,
    pub results: Vec<RankedEntry>,
    pub backends: Vec<OutcomeSummary>,
    /// Returned entries per primary source
    pub by_source: BTreeMap<String, usize>,
}

impl RankedResponse {
    /// Summary line for `backend_id`
    pub fn backend(&self, backend_id: &str) -> Option<&OutcomeSummary> {
        self.backends.iter().find(|b| b.backend_id == backend_id)
    }
}
