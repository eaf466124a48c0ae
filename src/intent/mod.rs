//! Intent extraction
//!
//! One model call, at most one corrective re-prompt, then a hard failure.

pub mod extractor;
pub mod state;

pub use extractor::{first_json_object, parse_intent, Intent, IntentExtractor};
pub use state::{ExtractionEvent, ExtractionState};
