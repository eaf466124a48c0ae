//! Cross-backend ranking
//!
//! - Scorer: weighted tightness / priority / relevance / keyword / query-match score
//! - Ranker: flatten, dedup by identity key, sort, truncate
//! - Response: the ranked response handed back to callers

pub mod ranker;
pub mod response;
pub mod scorer;

pub use ranker::Ranker;
pub use response::{OutcomeSummary, RankedEntry, RankedResponse};
pub use scorer::{identity_key, IdentityKey, RankConfig, Scorer};
