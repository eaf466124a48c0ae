//! Concurrent multi-backend search with per-backend degradation
//!
//! Every backend query runs as its own future. All futures are joined
//! positionally, so outcome order always mirrors query order. One deadline
//! bounds the whole fan-out; a backend still running at the deadline is
//! reported as `timeout` and its future is dropped.

use crate::errors::BackendError;
use crate::filters::FilterKey;
use crate::retriever::{Retriever, RetrieverSet};
use crate::router::BackendQuery;
use crate::search::outcome::{BackendOutcome, OutcomeStatus};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// Default relaxation budget per backend
pub const DEFAULT_MAX_RELAXATION_STEPS: u32 = 3;

/// Fans backend queries out to their retrievers
#[derive(Debug, Clone)]
pub struct ParallelSearcher {
    retrievers: RetrieverSet,
    max_relaxation_steps: u32,
}

impl ParallelSearcher {
    pub fn new(retrievers: RetrieverSet, max_relaxation_steps: u32) -> Self {
        Self {
            retrievers,
            max_relaxation_steps,
        }
    }

    /// Run all queries concurrently until `deadline`
    ///
    /// Always returns one outcome per query, in query order. Failures and
    /// timeouts are isolated to their own backend.
    pub async fn search(&self, queries: &[BackendQuery], deadline: Instant) -> Vec<BackendOutcome> {
        let started = Instant::now();

        let tasks = queries.iter().map(|query| async move {
            let backend_id = query.backend_id().to_string();

            let Some(retriever) = self.retrievers.get(&backend_id) else {
                let err = BackendError::Unregistered(backend_id.clone());
                warn!(backend = %backend_id, error = %err, "skipping backend");
                return BackendOutcome::new(backend_id, query.priority(), OutcomeStatus::Error)
                    .with_message(err.to_string());
            };

            let mut outcome = match timeout_at(deadline, self.degrade(retriever, query)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let waited = deadline.saturating_duration_since(started).as_millis() as u64;
                    error!(backend = %backend_id, waited_ms = waited, "backend timed out");
                    BackendOutcome::new(backend_id, query.priority(), OutcomeStatus::Timeout)
                        .with_message(format!("deadline elapsed after {}ms", waited))
                }
            };
            outcome.elapsed_ms = started.elapsed().as_millis() as u64;
            outcome
        });

        let outcomes = join_all(tasks).await;

        info!(
            backends = outcomes.len(),
            ok = outcomes.iter().filter(|o| o.status.is_success()).count(),
            failed = outcomes.iter().filter(|o| o.status.is_failure()).count(),
            "search fan-out complete"
        );

        outcomes
    }

    /// Fetch, relaxing one filter per empty answer until the budget runs out
    ///
    /// Fetch errors end the loop immediately and are never retried. The loop
    /// also stops before it would send a query with no filters left.
    async fn degrade(&self, retriever: Arc<dyn Retriever>, query: &BackendQuery) -> BackendOutcome {
        let backend_id = query.backend_id();
        let mut filters = query.filters.clone();
        let mut relaxed = Vec::new();

        loop {
            debug!(
                backend = backend_id,
                step = relaxed.len(),
                filters = ?filters.active_keys(),
                "fetching"
            );

            let results = match retriever
                .fetch(&filters, query.n_results, query.output_format)
                .await
            {
                Ok(results) => results,
                Err(e) => {
                    warn!(backend = backend_id, error = %e, "backend fetch failed");
                    return BackendOutcome::new(backend_id, query.priority(), OutcomeStatus::Error)
                        .with_message(e.to_string())
                        .with_relaxation(relaxed);
                }
            };

            if !results.is_empty() {
                let status = if relaxed.is_empty() {
                    OutcomeStatus::Ok
                } else {
                    OutcomeStatus::Relaxed
                };
                debug!(backend = backend_id, count = results.len(), %status, "backend answered");

                let mut outcome = BackendOutcome::new(backend_id, query.priority(), status)
                    .with_results(results);
                if !relaxed.is_empty() {
                    outcome = outcome.with_message(format!("relaxed {}", join_keys(&relaxed)));
                }
                return outcome.with_relaxation(relaxed);
            }

            let spent = relaxed.len() as u32;
            if spent >= self.max_relaxation_steps {
                return BackendOutcome::new(backend_id, query.priority(), OutcomeStatus::Empty)
                    .with_message(empty_message(&relaxed, 0))
                    .with_relaxation(relaxed);
            }

            let next = filters
                .next_relaxation()
                .map(|key| (key, filters.without(key)))
                .filter(|(_, next)| !next.active_keys().is_empty());

            match next {
                Some((key, next)) => {
                    debug!(backend = backend_id, dropped = %key, "relaxing filter");
                    relaxed.push(key);
                    filters = next;
                }
                None => {
                    let unspent = self.max_relaxation_steps - spent;
                    debug!(backend = backend_id, unspent, "no filter left to drop");
                    return BackendOutcome::new(backend_id, query.priority(), OutcomeStatus::Empty)
                        .with_message(empty_message(&relaxed, unspent))
                        .with_relaxation(relaxed)
                        .with_unspent_relaxation(unspent);
                }
            }
        }
    }
}

fn join_keys(keys: &[FilterKey]) -> String {
    keys.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
}

fn empty_message(relaxed: &[FilterKey], unspent: u32) -> String {
    let mut message = if relaxed.is_empty() {
        "no results".to_string()
    } else {
        format!(
            "no results after {} relaxation step(s) ({})",
            relaxed.len(),
            join_keys(relaxed)
        )
    };
    if unspent > 0 {
        message.push_str(&format!(
            "; {} relaxation step(s) unspent, no filter left to drop",
            unspent
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{FilterModel, MaterialType};
    use crate::registry::DatabaseRegistry;
    use crate::retriever::{OutputFormat, SearchResult};
    use crate::router::Router;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns results only when band_gap is absent
    struct NeedsRelaxation {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Retriever for NeedsRelaxation {
        async fn fetch(
            &self,
            filters: &FilterModel,
            _n_results: usize,
            _output_format: OutputFormat,
        ) -> Result<Vec<SearchResult>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if filters.band_gap().is_some() {
                Ok(vec![])
            } else {
                Ok(vec![SearchResult::new("bohriumpublic", "bp-1").with_formula("Fe2O3")])
            }
        }
    }

    struct AlwaysEmpty;

    #[async_trait]
    impl Retriever for AlwaysEmpty {
        async fn fetch(
            &self,
            _filters: &FilterModel,
            _n_results: usize,
            _output_format: OutputFormat,
        ) -> Result<Vec<SearchResult>, BackendError> {
            Ok(vec![])
        }
    }

    struct Failing(AtomicUsize);

    #[async_trait]
    impl Retriever for Failing {
        async fn fetch(
            &self,
            _filters: &FilterModel,
            _n_results: usize,
            _output_format: OutputFormat,
        ) -> Result<Vec<SearchResult>, BackendError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(BackendError::Request {
                backend: "openlam".to_string(),
                message: "503 Service Unavailable".to_string(),
            })
        }
    }

    struct Slow(Duration);

    #[async_trait]
    impl Retriever for Slow {
        async fn fetch(
            &self,
            _filters: &FilterModel,
            _n_results: usize,
            _output_format: OutputFormat,
        ) -> Result<Vec<SearchResult>, BackendError> {
            tokio::time::sleep(self.0).await;
            Ok(vec![SearchResult::new("optimade", "slow-1")])
        }
    }

    fn crystal_queries() -> Vec<BackendQuery> {
        let filters = FilterModel::builder()
            .elements(["Fe", "O"])
            .band_gap(Some(2.0), Some(3.0))
            .space_group(167)
            .energy(None, Some(0.0))
            .material_type(MaterialType::Crystal)
            .build()
            .unwrap();
        // bohriumpublic, optimade, openlam
        Router::new(Arc::new(DatabaseRegistry::builtin()))
            .route(&filters, None, 5, OutputFormat::Cif)
            .unwrap()
    }

    #[tokio::test]
    async fn test_relaxation_records_one_step() {
        let queries = crystal_queries();
        let relaxing = Arc::new(NeedsRelaxation {
            calls: AtomicUsize::new(0),
        });
        let retrievers = RetrieverSet::new().with("bohriumpublic", relaxing.clone());
        let searcher = ParallelSearcher::new(retrievers, 3);

        let outcomes = searcher
            .search(&queries[..1], Instant::now() + Duration::from_secs(5))
            .await;

        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];
        assert_eq!(outcome.status, OutcomeStatus::Relaxed);
        assert_eq!(outcome.relaxation_steps, 1);
        assert_eq!(outcome.relaxed_filters, vec![FilterKey::BandGap]);
        assert_eq!(outcome.result_count(), 1);
        assert_eq!(relaxing.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_empty() {
        let queries = crystal_queries();
        let retrievers = RetrieverSet::new().with("bohriumpublic", Arc::new(AlwaysEmpty));
        let searcher = ParallelSearcher::new(retrievers, 3);

        let outcomes = searcher
            .search(&queries[..1], Instant::now() + Duration::from_secs(5))
            .await;

        let outcome = &outcomes[0];
        assert_eq!(outcome.status, OutcomeStatus::Empty);
        assert_eq!(outcome.relaxation_steps, 3);
        assert_eq!(
            outcome.relaxed_filters,
            vec![FilterKey::BandGap, FilterKey::Energy, FilterKey::SpaceGroup]
        );
    }

    #[tokio::test]
    async fn test_error_isolated_and_not_retried() {
        let queries = crystal_queries();
        let failing = Arc::new(Failing(AtomicUsize::new(0)));
        let retrievers = RetrieverSet::new()
            .with("bohriumpublic", Arc::new(NeedsRelaxation { calls: AtomicUsize::new(0) }))
            .with("openlam", failing.clone());
        let searcher = ParallelSearcher::new(retrievers, 3);

        let outcomes = searcher
            .search(&queries, Instant::now() + Duration::from_secs(5))
            .await;

        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![OutcomeStatus::Relaxed, OutcomeStatus::Error, OutcomeStatus::Error]
        );
        // optimade has no retriever
        assert_eq!(
            outcomes[1].message.as_deref(),
            Some("no retriever registered for backend optimade")
        );
        assert!(outcomes[2].message.as_deref().unwrap().contains("503"));
        assert_eq!(failing.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_marks_slow_backend_timeout() {
        let queries = crystal_queries();
        let retrievers = RetrieverSet::new()
            .with("bohriumpublic", Arc::new(Slow(Duration::from_millis(10))))
            .with("optimade", Arc::new(Slow(Duration::from_secs(60))))
            .with("openlam", Arc::new(Slow(Duration::from_millis(20))));
        let searcher = ParallelSearcher::new(retrievers, 3);

        let outcomes = searcher
            .search(&queries, Instant::now() + Duration::from_millis(500))
            .await;

        assert_eq!(outcomes[0].status, OutcomeStatus::Ok);
        assert_eq!(outcomes[1].status, OutcomeStatus::Timeout);
        assert_eq!(outcomes[1].backend_id, "optimade");
        assert_eq!(outcomes[2].status, OutcomeStatus::Ok);
    }

    #[tokio::test]
    async fn test_stops_before_unfiltered_query() {
        let filters = FilterModel::builder()
            .band_gap(Some(50.0), Some(60.0))
            .build()
            .unwrap();
        let queries = Router::new(Arc::new(DatabaseRegistry::builtin()))
            .route(&filters, None, 5, OutputFormat::Cif)
            .unwrap();
        let retrievers = RetrieverSet::new().with("bohriumpublic", Arc::new(AlwaysEmpty));
        let searcher = ParallelSearcher::new(retrievers, 3);

        let outcomes = searcher
            .search(&queries[..1], Instant::now() + Duration::from_secs(5))
            .await;
        assert_eq!(outcomes[0].status, OutcomeStatus::Empty);
        assert_eq!(outcomes[0].relaxation_steps, 0);
        assert_eq!(outcomes[0].relaxation_unspent, 3);
        assert_eq!(
            outcomes[0].message.as_deref(),
            Some("no results; 3 relaxation step(s) unspent, no filter left to drop")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_order_ignores_completion_order() {
        let queries = crystal_queries();
        // first query finishes last, still inside the deadline
        let retrievers = RetrieverSet::new()
            .with("bohriumpublic", Arc::new(Slow(Duration::from_millis(300))))
            .with("optimade", Arc::new(Slow(Duration::from_millis(10))))
            .with("openlam", Arc::new(Slow(Duration::from_millis(1))));
        let searcher = ParallelSearcher::new(retrievers, 3);

        let outcomes = searcher
            .search(&queries, Instant::now() + Duration::from_millis(500))
            .await;

        let order: Vec<_> = outcomes.iter().map(|o| o.backend_id.as_str()).collect();
        let expected: Vec<_> = queries.iter().map(|q| q.backend_id()).collect();
        assert_eq!(order, expected);
        assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Ok));
        assert!(outcomes[0].elapsed_ms >= outcomes[2].elapsed_ms);
    }
}
