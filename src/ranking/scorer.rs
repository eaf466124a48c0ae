//! Scoring and identity keys for cross-backend results

use crate::errors::{ResolveError, Result};
use crate::filters::{formula, FilterModel};
use crate::retriever::SearchResult;
use crate::search::OutcomeStatus;
use serde::{Deserialize, Serialize};

/// How two results are judged to be the same structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    /// Reduced formula + space group + atom count
    #[default]
    FormulaStructure,
    /// Reduced formula only
    Formula,
    /// Backend id + canonical record id
    SourceId,
}

/// Ranking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Weight for filter-match tightness (exact beats relaxed)
    pub tightness_weight: f64,
    /// Weight for backend priority
    pub priority_weight: f64,
    /// Weight for backend-provided relevance
    pub relevance_weight: f64,
    /// Weight for keyword overlap with name/formula
    pub keyword_weight: f64,
    /// Weight for the result's own match to the requested formula,
    /// space group and elements
    pub match_weight: f64,
    pub identity_key: IdentityKey,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            tightness_weight: 0.5,
            priority_weight: 0.3,
            relevance_weight: 0.2,
            keyword_weight: 0.1,
            match_weight: 0.4,
            identity_key: IdentityKey::FormulaStructure,
        }
    }
}

impl RankConfig {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("tightness_weight", self.tightness_weight),
            ("priority_weight", self.priority_weight),
            ("relevance_weight", self.relevance_weight),
            ("keyword_weight", self.keyword_weight),
            ("match_weight", self.match_weight),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ResolveError::ConfigError(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// Identity key for deduplication
///
/// Results without a formula always fall back to the source/id key.
pub fn identity_key(result: &SearchResult, strategy: IdentityKey) -> String {
    let reduced = result.formula.as_deref().map(formula::canonical_formula);

    match (strategy, reduced) {
        (IdentityKey::FormulaStructure, Some(f)) => format!(
            "{}|sg={}|n={}",
            f,
            result
                .space_group
                .map_or_else(|| "-".to_string(), |sg| sg.to_string()),
            result
                .n_atoms
                .map_or_else(|| "-".to_string(), |n| n.to_string())
        ),
        (IdentityKey::Formula, Some(f)) => f,
        _ => format!(
            "{}:{}",
            result.source,
            result
                .id
                .as_deref()
                .or(result.name.as_deref())
                .unwrap_or_default()
        ),
    }
}

/// Weighted scorer
#[derive(Debug, Clone)]
pub struct Scorer {
    config: RankConfig,
}

impl Scorer {
    pub fn new(config: RankConfig) -> Self {
        Self { config }
    }

    /// Score one result given how its backend produced it
    ///
    /// `filters` is the query as extracted, before routing or relaxation.
    pub fn score(
        &self,
        result: &SearchResult,
        status: OutcomeStatus,
        relaxation_steps: u32,
        priority: u32,
        filters: &FilterModel,
    ) -> f64 {
        let tightness = Self::tightness(status, relaxation_steps);
        let priority_score = 1.0 / priority.max(1) as f64;
        let relevance = result
            .relevance
            .filter(|r| r.is_finite())
            .map_or(0.0, |r| r.clamp(0.0, 1.0));
        let keyword_score = Self::keyword_overlap(result, filters.keywords());
        let match_score = Self::query_match(result, filters);

        self.config.tightness_weight * tightness
            + self.config.priority_weight * priority_score
            + self.config.relevance_weight * relevance
            + self.config.keyword_weight * keyword_score
            + self.config.match_weight * match_score
    }

    /// How closely the record itself fits the requested filters, in [0, 1]
    ///
    /// Formula and space group hits count twice as much as element overlap.
    /// Keys the query did not set are left out of the denominator.
    pub fn query_match(result: &SearchResult, filters: &FilterModel) -> f64 {
        let mut earned = 0.0;
        let mut possible = 0.0;

        if let Some(wanted) = filters.formula() {
            possible += 2.0;
            let canonical = formula::canonical_formula(wanted);
            if result
                .formula
                .as_deref()
                .map_or(false, |f| formula::canonical_formula(f) == canonical)
            {
                earned += 2.0;
            }
        }

        if let Some(wanted) = filters.space_group() {
            possible += 2.0;
            if result.space_group == Some(wanted) {
                earned += 2.0;
            }
        }

        let elements = filters.elements();
        if !elements.is_empty() {
            possible += 1.0;
            let hits = elements
                .iter()
                .filter(|e| result.elements.contains(*e))
                .count();
            earned += hits as f64 / elements.len() as f64;
        }

        if possible == 0.0 {
            0.0
        } else {
            earned / possible
        }
    }

    /// 1.0 for exact matches, decaying with each relaxation step
    pub fn tightness(status: OutcomeStatus, relaxation_steps: u32) -> f64 {
        match status {
            OutcomeStatus::Ok => 1.0,
            OutcomeStatus::Relaxed => 1.0 / (1.0 + relaxation_steps as f64),
            _ => 0.0,
        }
    }

    /// Fraction of keywords found in the result's name or formula
    fn keyword_overlap(result: &SearchResult, keywords: &[String]) -> f64 {
        if keywords.is_empty() {
            return 0.0;
        }

        let haystack = format!(
            "{} {}",
            result.name.as_deref().unwrap_or_default(),
            result.formula.as_deref().unwrap_or_default()
        )
        .to_lowercase();

        let matches = keywords
            .iter()
            .filter(|k| haystack.contains(&k.to_lowercase()))
            .count();

        matches as f64 / keywords.len() as f64
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(RankConfig::default())
    }
}
