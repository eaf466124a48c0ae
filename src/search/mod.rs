//! Parallel backend search
//!
//! - Outcome: per-backend terminal status and results
//! - Parallel: concurrent fan-out with relaxation and one shared deadline

pub mod outcome;
pub mod parallel;

pub use outcome::{BackendOutcome, OutcomeStatus};
pub use parallel::{ParallelSearcher, DEFAULT_MAX_RELAXATION_STEPS};
