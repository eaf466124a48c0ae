//! Prompt templates for intent extraction

use serde::Serialize;

/// A single completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub const SYSTEM_PROMPT_EXTRACT: &str = "You are a materials database search assistant. \
Identify the material type and application domain of the query and extract structured \
search filters. Only use the filter keys shown in the schema. If the user clearly asks \
for one specific database (bohriumpublic, mofdbsql, openlam, optimade) put its id in \
prefer_db, otherwise leave it empty. Return strict JSON only.";

const REPLY_SCHEMA: &str = r#"{
  "material_type": "crystal|mof|unknown",
  "domain": "semiconductor|catalyst|battery|perovskite|zeolite|gas_storage|separation|other",
  "expanded_query": "...",
  "filters": {
    "formula": "...",
    "elements": ["..."],
    "space_group": null,
    "band_gap": {"min": null, "max": null},
    "energy": {"min": null, "max": null}
  },
  "keywords": ["..."],
  "prefer_db": ""
}"#;

/// First-attempt extraction prompt
pub fn extraction_prompt(query: &str) -> Prompt {
    Prompt {
        system: SYSTEM_PROMPT_EXTRACT.to_string(),
        user: format!(
            "Input Query: {}\n\nReturn JSON:\n{}\n\nUse null for anything the query does not state.",
            query, REPLY_SCHEMA
        ),
    }
}

/// Corrective prompt naming the specific violation of the previous reply
pub fn correction_prompt(query: &str, previous_output: &str, violation: &str) -> Prompt {
    Prompt {
        system: SYSTEM_PROMPT_EXTRACT.to_string(),
        user: format!(
            "Input Query: {}\n\nYour previous answer was:\n{}\n\nIt was rejected: {}\n\n\
             Return corrected JSON matching exactly:\n{}",
            query, previous_output, violation, REPLY_SCHEMA
        ),
    }
}
