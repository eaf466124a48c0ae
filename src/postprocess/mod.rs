//! Aggregate outcome classification
//!
//! Decides whether a request is served (with whatever partial results
//! exist), served empty with an explanation, or escalated as a failure.

use crate::search::{BackendOutcome, OutcomeStatus};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Stage a terminal failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultDomain {
    /// No backend qualified for the filters
    Routing,
    /// Every routed backend failed or timed out
    Execution,
}

impl fmt::Display for FaultDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultDomain::Routing => f.write_str("routing"),
            FaultDomain::Execution => f.write_str("execution"),
        }
    }
}

/// What to do with the aggregate outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// At least one backend produced results
    ServePartial,
    /// Nothing found, but not because everything broke
    ServeEmptyWithReason { reason: String },
    /// Nothing usable; surface as a failure
    Escalate { fault: FaultDomain, reason: String },
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::ServePartial => "serve_partial",
            Decision::ServeEmptyWithReason { .. } => "serve_empty_with_reason",
            Decision::Escalate { .. } => "escalate",
        }
    }

    pub fn is_served(&self) -> bool {
        !matches!(self, Decision::Escalate { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::ServePartial => None,
            Decision::ServeEmptyWithReason { reason } | Decision::Escalate { reason, .. } => {
                Some(reason)
            }
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify per-backend outcomes
pub fn classify(outcomes: &[BackendOutcome]) -> Decision {
    let decision = if outcomes
        .iter()
        .any(|o| o.status.is_success() && o.result_count() > 0)
    {
        Decision::ServePartial
    } else if !outcomes.is_empty() && outcomes.iter().all(|o| o.status.is_failure()) {
        Decision::Escalate {
            fault: FaultDomain::Execution,
            reason: format!("all backends failed: {}", describe(outcomes)),
        }
    } else if outcomes.is_empty() {
        Decision::Escalate {
            fault: FaultDomain::Routing,
            reason: "no backend was queried".to_string(),
        }
    } else {
        Decision::ServeEmptyWithReason {
            reason: format!("no matching structures: {}", describe(outcomes)),
        }
    };

    info!(decision = decision.as_str(), "classified outcomes");
    decision
}

/// Routing-stage escalation for a router failure
pub fn routing_failure(reason: impl Into<String>) -> Decision {
    Decision::Escalate {
        fault: FaultDomain::Routing,
        reason: reason.into(),
    }
}

/// One clause per backend, e.g. `openlam empty after 3 relaxation step(s)`
fn describe(outcomes: &[BackendOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| match o.status {
            OutcomeStatus::Empty => {
                let mut clause = if o.relaxation_steps > 0 {
                    format!(
                        "{} empty after {} relaxation step(s) ({})",
                        o.backend_id,
                        o.relaxation_steps,
                        o.relaxed_filters
                            .iter()
                            .map(|k| k.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                } else {
                    format!("{} empty", o.backend_id)
                };
                if o.relaxation_unspent > 0 {
                    clause.push_str(&format!(
                        ", {} relaxation step(s) unspent with no filter left to drop",
                        o.relaxation_unspent
                    ));
                }
                clause
            }
            status => match &o.message {
                Some(message) => format!("{} {} ({})", o.backend_id, status, message),
                None => format!("{} {}", o.backend_id, status),
            },
        })
        .collect::<Vec<_>>()
        .join("; ")
}
