//! End-to-end query resolution
//!
//! extract → route → search → rank → classify

use crate::config::{normalize_n_results, Config};
use crate::errors::Result;
use crate::filters::FilterModel;
use crate::intent::{Intent, IntentExtractor};
use crate::llm::LlmClient;
use crate::postprocess::{classify, Decision};
use crate::ranking::{RankedResponse, Ranker};
use crate::retriever::{OutputFormat, RetrieverSet};
use crate::router::Router;
use crate::search::ParallelSearcher;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Result of one `resolve()` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// Query as the model restated it, or the original text
    pub query_used: String,
    pub filters: FilterModel,
    #[serde(flatten)]
    pub decision: Decision,
    #[serde(flatten)]
    pub response: RankedResponse,
}

/// Query resolution pipeline
pub struct Resolver {
    extractor: IntentExtractor,
    router: Router,
    searcher: ParallelSearcher,
    ranker: Ranker,
    deadline: Duration,
    default_n_results: usize,
}

impl Resolver {
    /// Wire the pipeline from a validated configuration
    pub fn new(config: &Config, llm: Arc<dyn LlmClient>, retrievers: RetrieverSet) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);

        Ok(Self {
            extractor: IntentExtractor::new(llm),
            router: Router::new(registry).with_max_backends(config.search.max_backends),
            searcher: ParallelSearcher::new(retrievers, config.search.max_relaxation_steps),
            ranker: Ranker::new(config.ranking.clone()),
            deadline: Duration::from_millis(config.search.deadline_ms),
            default_n_results: config.search.default_n_results,
        })
    }

    /// Resolve free text into a ranked response
    ///
    /// `n_results` of 0 means the configured default; larger values are
    /// clamped to 20. Extraction and routing failures abort the call;
    /// backend failures only show up in the outcome summary.
    pub async fn resolve(
        &self,
        query: &str,
        n_results: usize,
        output_format: OutputFormat,
    ) -> Result<Resolution> {
        let request_id = Uuid::new_v4();
        let span = info_span!("resolve", %request_id);

        async move {
            info!(query, "resolving query");
            let intent = self.extractor.extract(query).await?;
            self.resolve_intent(query, intent, n_results, output_format)
                .await
        }
        .instrument(span)
        .await
    }

    /// Run routing onward for an already extracted intent
    pub async fn resolve_intent(
        &self,
        query: &str,
        intent: Intent,
        n_results: usize,
        output_format: OutputFormat,
    ) -> Result<Resolution> {
        let n_results = normalize_n_results(n_results, self.default_n_results);

        let queries = self
            .router
            .route_with_preference(
                &intent.filters,
                intent.domain.as_deref(),
                intent.preferred_backend.as_deref(),
                n_results,
                output_format,
            )
            .map_err(|e| {
                warn!(error = %e, "routing failed");
                e
            })?;

        let deadline = Instant::now() + self.deadline;
        let outcomes = self.searcher.search(&queries, deadline).await;

        let response = self.ranker.rank(&outcomes, n_results, &intent.filters);
        let decision = classify(&outcomes);

        info!(
            decision = decision.as_str(),
            n_found = response.n_found,
            returned = response.returned,
            "query resolved"
        );

        Ok(Resolution {
            query_used: intent
                .expanded_query
                .clone()
                .unwrap_or_else(|| query.trim().to_string()),
            filters: intent.filters,
            decision,
            response,
        })
    }
}
