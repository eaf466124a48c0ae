//! Free text to filter model through one model call and one correction

use crate::errors::{ResolveError, Result};
use crate::filters::{FilterModel, FilterSpec};
use crate::intent::state::{ExtractionEvent, ExtractionState};
use crate::llm::prompt::{correction_prompt, extraction_prompt};
use crate::llm::LlmClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parsed query intent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    pub filters: FilterModel,
    /// Application domain hint used for routing fallback
    pub domain: Option<String>,
    /// Model's restatement of the query
    pub expanded_query: Option<String>,
    /// Database the user asked for by name
    pub preferred_backend: Option<String>,
}

/// Raw reply shape; unknown top-level keys are ignored
#[derive(Debug, Deserialize)]
struct ExtractionReply {
    #[serde(default)]
    material_type: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    expanded_query: Option<String>,
    #[serde(default)]
    filters: Option<FilterSpec>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    prefer_db: Option<String>,
}

/// Turns a query into an `Intent`
pub struct IntentExtractor {
    llm: Arc<dyn LlmClient>,
}

impl IntentExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Extract an intent from free text
    ///
    /// The model is called at most twice. A failed model call aborts
    /// immediately; an unparsable or invalid reply earns one corrective
    /// re-prompt naming the violation.
    pub async fn extract(&self, query: &str) -> Result<Intent> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::extraction("query is empty"));
        }

        let mut state = ExtractionState::FirstAttempt;
        let mut prompt = extraction_prompt(query);

        loop {
            let raw = self.llm.complete(&prompt).await.map_err(|e| {
                ResolveError::extraction(format!("model call failed: {}", e))
            })?;
            debug!(attempt = state.attempt(), reply = %raw, "model reply");

            match parse_intent(&raw) {
                Ok(intent) => {
                    state = state.transition(ExtractionEvent::Valid);
                    info!(
                        attempt_state = ?state,
                        filters = ?intent.filters.active_keys(),
                        domain = ?intent.domain,
                        "intent extracted"
                    );
                    return Ok(intent);
                }
                Err(violation) => {
                    state = state.transition(ExtractionEvent::Invalid);
                    if state == ExtractionState::CorrectiveAttempt {
                        warn!(%violation, "model reply rejected, re-prompting");
                        prompt = correction_prompt(query, &raw, &violation);
                    } else {
                        warn!(%violation, "model reply rejected twice");
                        return Err(ResolveError::Extraction {
                            reason: violation,
                            raw_output: Some(raw),
                        });
                    }
                }
            }
        }
    }
}

/// Parse and validate one reply; `Err` carries the violation text
pub fn parse_intent(raw: &str) -> std::result::Result<Intent, String> {
    let json = first_json_object(raw).ok_or_else(|| "reply contains no JSON object".to_string())?;
    let reply: ExtractionReply =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {}", e))?;

    let mut spec = reply.filters.unwrap_or_default();
    if spec.material_type.is_none() {
        spec.material_type = reply.material_type;
    }

    let filters = spec
        .into_model(reply.keywords.unwrap_or_default())
        .map_err(|e| match e {
            ResolveError::Extraction { reason, .. } => reason,
            other => other.to_string(),
        })?;

    if !filters.is_routable() {
        return Err("no usable filter or keyword was extracted".to_string());
    }

    Ok(Intent {
        filters,
        domain: non_empty_lower(reply.domain),
        expanded_query: reply
            .expanded_query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        preferred_backend: non_empty_lower(reply.prefer_db),
    })
}

fn non_empty_lower(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// First balanced `{...}` in `text`, skipping braces inside strings
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
