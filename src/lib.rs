//! matquery - natural-language search across materials structure databases
//!
//! Resolves a free-text query into a ranked, deduplicated set of crystal and
//! MOF structures drawn from several independent backends.
//!
//! # Architecture
//!
//! - **Intent**: one model call (plus one correction) turns text into filters
//! - **Router**: picks and orders backends by filter support and affinity
//! - **Search**: concurrent fan-out with per-backend filter relaxation
//! - **Ranking**: cross-backend dedup, scoring and truncation
//! - **Postprocess**: serve, serve empty with a reason, or escalate

pub mod errors;
pub mod filters;
pub mod llm;

pub use errors::{BackendError, LlmError, ResolveError, Result};

pub mod config;
pub mod intent;
pub mod registry;
pub mod retriever;
pub mod router;

pub mod postprocess;
pub mod ranking;
pub mod search;

pub mod resolver;
pub use resolver::{Resolution, Resolver};

pub mod cli;
