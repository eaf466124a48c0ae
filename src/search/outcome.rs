//! Per-backend search outcomes

use crate::filters::FilterKey;
use crate::retriever::SearchResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal state of one backend's search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Results with the filters as routed
    Ok,
    /// Results only after dropping one or more filters
    Relaxed,
    /// Relaxation budget exhausted with zero results
    Empty,
    /// The adapter failed
    Error,
    /// The fan-out deadline elapsed first
    Timeout,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "ok",
            OutcomeStatus::Relaxed => "relaxed",
            OutcomeStatus::Empty => "empty",
            OutcomeStatus::Error => "error",
            OutcomeStatus::Timeout => "timeout",
        }
    }

    /// Ok or relaxed: the results are usable
    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Ok | OutcomeStatus::Relaxed)
    }

    /// Error or timeout
    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeStatus::Error | OutcomeStatus::Timeout)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one backend's degradation loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendOutcome {
    pub backend_id: String,
    /// Descriptor priority, carried for ranking (1 = highest)
    pub priority: u32,
    pub status: OutcomeStatus,
    pub results: Vec<SearchResult>,
    /// Diagnostic for error, timeout, empty and relaxed outcomes
    pub message: Option<String>,
    pub relaxation_steps: u32,
    /// Filter keys dropped, in the order they were dropped
    pub relaxed_filters: Vec<FilterKey>,
    /// Budget left when the loop stopped for lack of a filter to drop
    #[serde(skip)]
    pub relaxation_unspent: u32,
    #[serde(skip)]
    pub elapsed_ms: u64,
}

impl BackendOutcome {
    pub fn new(backend_id: impl Into<String>, priority: u32, status: OutcomeStatus) -> Self {
        Self {
            backend_id: backend_id.into(),
            priority,
            status,
            results: Vec::new(),
            message: None,
            relaxation_steps: 0,
            relaxed_filters: Vec::new(),
            relaxation_unspent: 0,
            elapsed_ms: 0,
        }
    }

    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_relaxation(mut self, relaxed_filters: Vec<FilterKey>) -> Self {
        self.relaxation_steps = relaxed_filters.len() as u32;
        self.relaxed_filters = relaxed_filters;
        self
    }

    pub fn with_unspent_relaxation(mut self, steps: u32) -> Self {
        self.relaxation_unspent = steps;
        self
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }
}
