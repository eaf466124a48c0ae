//! Extraction attempt state machine
//!
//! Two live states and two terminal ones:
//! - FirstAttempt      → Accepted          (on: Valid)
//! - FirstAttempt      → CorrectiveAttempt (on: Invalid)
//! - CorrectiveAttempt → Accepted          (on: Valid)
//! - CorrectiveAttempt → Failed            (on: Invalid)
//! - Accepted / Failed are absorbing
//!
//! So the model is consulted at most twice per extraction.

use serde::Serialize;

/// Extraction progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionState {
    /// Plain extraction prompt
    FirstAttempt,
    /// Re-prompt naming the previous violation
    CorrectiveAttempt,
    /// Reply parsed and validated (terminal)
    Accepted,
    /// Second reply also rejected (terminal)
    Failed,
}

/// Verdict on one model reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionEvent {
    Valid,
    Invalid,
}

impl ExtractionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExtractionState::Accepted | ExtractionState::Failed)
    }

    pub fn transition(&self, event: ExtractionEvent) -> ExtractionState {
        use ExtractionEvent::*;
        use ExtractionState::*;

        match (self, event) {
            (FirstAttempt, Valid) | (CorrectiveAttempt, Valid) => Accepted,
            (FirstAttempt, Invalid) => CorrectiveAttempt,
            (CorrectiveAttempt, Invalid) => Failed,
            (terminal, _) => *terminal,
        }
    }

    /// 1-based model call number for live states
    pub fn attempt(&self) -> u8 {
        match self {
            ExtractionState::FirstAttempt => 1,
            _ => 2,
        }
    }
}
