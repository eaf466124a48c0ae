//! Cross-backend merge, dedup, score and truncate

use crate::filters::FilterModel;
use crate::ranking::response::{OutcomeSummary, RankedEntry, RankedResponse};
use crate::ranking::scorer::{identity_key, RankConfig, Scorer};
use crate::search::BackendOutcome;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

struct Candidate {
    entry: RankedEntry,
    priority: u32,
    position: usize,
}

/// Merges backend outcomes into one ranked response
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    scorer: Scorer,
}

impl Ranker {
    pub fn new(config: RankConfig) -> Self {
        Self {
            scorer: Scorer::new(config),
        }
    }

    /// Flatten usable outcomes, dedup, score, sort and truncate
    ///
    /// Outcomes are read in input order, so the first backend to return a
    /// structure owns its entry. Ties in score fall back to backend
    /// priority, then to that input order. `filters` is the extracted query
    /// that each record is scored against.
    pub fn rank(
        &self,
        outcomes: &[BackendOutcome],
        n_results: usize,
        filters: &FilterModel,
    ) -> RankedResponse {
        let strategy = self.scorer.config().identity_key;
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut index_by_key: HashMap<String, usize> = HashMap::new();

        for outcome in outcomes.iter().filter(|o| o.status.is_success()) {
            for result in &outcome.results {
                let key = identity_key(result, strategy);

                if let Some(&existing) = index_by_key.get(&key) {
                    let entry = &mut candidates[existing].entry;
                    if entry.result.source != outcome.backend_id
                        && !entry.also_found_in.contains(&outcome.backend_id)
                    {
                        entry.also_found_in.push(outcome.backend_id.clone());
                    }
                    continue;
                }

                let score = self.scorer.score(
                    result,
                    outcome.status,
                    outcome.relaxation_steps,
                    outcome.priority,
                    filters,
                );

                index_by_key.insert(key, candidates.len());
                candidates.push(Candidate {
                    entry: RankedEntry {
                        result: result.clone(),
                        score,
                        also_found_in: Vec::new(),
                    },
                    priority: outcome.priority,
                    position: candidates.len(),
                });
            }
        }

        let n_found = candidates.len();

        candidates.sort_by(|a, b| {
            b.entry
                .score
                .total_cmp(&a.entry.score)
                .then(a.priority.cmp(&b.priority))
                .then(a.position.cmp(&b.position))
        });
        candidates.truncate(n_results);

        let results: Vec<RankedEntry> = candidates.into_iter().map(|c| c.entry).collect();

        let mut by_source = BTreeMap::new();
        for entry in &results {
            *by_source.entry(entry.result.source.clone()).or_insert(0) += 1;
        }

        debug!(n_found, returned = results.len(), "ranked results");

        RankedResponse {
            n_found,
            returned: results.len(),
            results,
            backends: outcomes.iter().map(OutcomeSummary::from).collect(),
            by_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::IdentityKey;
    use crate::retriever::SearchResult;
    use crate::search::OutcomeStatus;

    fn outcome(id: &str, priority: u32, results: Vec<SearchResult>) -> BackendOutcome {
        BackendOutcome::new(id, priority, OutcomeStatus::Ok).with_results(results)
    }

    #[test]
    fn test_dedup_records_secondary_backend() {
        let ranker = Ranker::default();
        let outcomes = vec![
            outcome(
                "bohriumpublic",
                1,
                vec![SearchResult::new("bohriumpublic", "bp-1")
                    .with_formula("Fe2O3")
                    .with_space_group(167)],
            ),
            outcome(
                "optimade",
                3,
                vec![SearchResult::new("optimade", "mp-19770")
                    .with_formula("Fe4O6")
                    .with_space_group(167)],
            ),
        ];

        let response = ranker.rank(&outcomes, 5, &FilterModel::default());
        assert_eq!(response.n_found, 1);
        assert_eq!(response.returned, 1);
        assert_eq!(response.results[0].result.source, "bohriumpublic");
        assert_eq!(response.results[0].also_found_in, vec!["optimade"]);
    }

    #[test]
    fn test_skips_failed_and_empty_outcomes() {
        let ranker = Ranker::default();
        let outcomes = vec![
            BackendOutcome::new("a", 1, OutcomeStatus::Error)
                .with_results(vec![SearchResult::new("a", "x").with_formula("NaCl")])
                .with_message("boom"),
            BackendOutcome::new("b", 2, OutcomeStatus::Empty),
            outcome("c", 3, vec![SearchResult::new("c", "y").with_formula("KCl")]),
        ];

        let response = ranker.rank(&outcomes, 5, &FilterModel::default());
        assert_eq!(response.n_found, 1);
        assert_eq!(response.results[0].result.source, "c");
        assert_eq!(response.backends.len(), 3);
        assert_eq!(response.backends[0].status, OutcomeStatus::Error);
    }

    #[test]
    fn test_truncation_keeps_counts_distinct() {
        let ranker = Ranker::default();
        let results = (0..8)
            .map(|i| SearchResult::new("a", format!("id-{}", i)))
            .collect();
        let response = ranker.rank(&[outcome("a", 1, results)], 3, &FilterModel::default());

        assert_eq!(response.n_found, 8);
        assert_eq!(response.returned, 3);
        // equal scores keep original order
        let ids: Vec<_> = response
            .results
            .iter()
            .map(|e| e.result.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["id-0", "id-1", "id-2"]);
    }

    #[test]
    fn test_relaxed_ranks_below_exact() {
        let ranker = Ranker::default();
        let outcomes = vec![
            BackendOutcome::new("a", 1, OutcomeStatus::Relaxed)
                .with_relaxation(vec![crate::filters::FilterKey::BandGap])
                .with_results(vec![SearchResult::new("a", "r1")]),
            outcome("b", 1, vec![SearchResult::new("b", "e1")]),
        ];

        let response = ranker.rank(&outcomes, 5, &FilterModel::default());
        assert_eq!(response.results[0].result.source, "b");
        assert_eq!(response.results[1].result.source, "a");
    }

    #[test]
    fn test_tie_broken_by_priority() {
        let ranker = Ranker::new(RankConfig {
            priority_weight: 0.0,
            ..RankConfig::default()
        });
        let outcomes = vec![
            outcome("low", 3, vec![SearchResult::new("low", "1")]),
            outcome("high", 1, vec![SearchResult::new("high", "2")]),
        ];

        let response = ranker.rank(&outcomes, 5, &FilterModel::default());
        assert_eq!(response.results[0].result.source, "high");
        assert_eq!(response.by_source.get("low"), Some(&1));
    }

    #[test]
    fn test_source_id_strategy_keeps_same_formula() {
        let ranker = Ranker::new(RankConfig {
            identity_key: IdentityKey::SourceId,
            ..RankConfig::default()
        });
        let outcomes = vec![
            outcome("a", 1, vec![SearchResult::new("a", "1").with_formula("NaCl")]),
            outcome("b", 2, vec![SearchResult::new("b", "1").with_formula("NaCl")]),
        ];

        assert_eq!(ranker.rank(&outcomes, 5, &FilterModel::default()).n_found, 2);
    }

    #[test]
    fn test_relaxed_record_matching_query_ranks_first() {
        let ranker = Ranker::default();
        let filters = FilterModel::builder()
            .formula("Fe2O3")
            .space_group(167)
            .build()
            .unwrap();
        let outcomes = vec![BackendOutcome::new("a", 1, OutcomeStatus::Relaxed)
            .with_relaxation(vec![crate::filters::FilterKey::SpaceGroup])
            .with_results(vec![
                SearchResult::new("a", "loose")
                    .with_formula("Fe3O4")
                    .with_space_group(227),
                SearchResult::new("a", "tight")
                    .with_formula("Fe2O3")
                    .with_space_group(167),
            ])];

        let response = ranker.rank(&outcomes, 5, &filters);
        assert_eq!(response.results[0].result.id.as_deref(), Some("tight"));
        assert!(response.results[0].score > response.results[1].score);
    }
}
