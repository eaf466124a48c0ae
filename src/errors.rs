//! Error types for matquery
//!
//! Two failures abort a `resolve()` call outright (extraction and routing).
//! Backend and timeout failures are absorbed per backend and only ever show
//! up inside an outcome summary.

use serde::Serialize;
use thiserror::Error;

/// Main error type for the resolution pipeline
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The query could not be turned into a valid filter model
    #[error("Extraction failed: {reason}")]
    Extraction {
        reason: String,
        /// Last raw model output, if the model answered at all
        raw_output: Option<String>,
    },

    /// No registered backend can serve the filters
    #[error("No route: {0}")]
    NoRoute(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure raised by a retriever adapter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("backend {backend} request failed: {message}")]
    Request { backend: String, message: String },

    #[error("no retriever registered for backend {0}")]
    Unregistered(String),
}

/// Failure raised by the LLM completion client
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API key is not set")]
    MissingApiKey,

    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    Api(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Wire shape of a terminal failure
#[derive(Debug, Clone, Serialize)]
pub struct StructuredFailure {
    pub error_type: &'static str,
    pub message: String,
    pub details: serde_json::Value,
}

impl ResolveError {
    /// Build an extraction error without model output
    pub fn extraction(reason: impl Into<String>) -> Self {
        ResolveError::Extraction {
            reason: reason.into(),
            raw_output: None,
        }
    }

    /// Stable machine-readable classification
    pub fn error_type(&self) -> &'static str {
        match self {
            ResolveError::Extraction { .. } => "extraction_error",
            ResolveError::NoRoute(_) => "no_route",
            ResolveError::ConfigError(_) => "config_error",
            ResolveError::SerializationError(_) | ResolveError::IoError(_) => "internal",
        }
    }

    /// Convert into the structured failure returned to callers
    pub fn to_failure(&self) -> StructuredFailure {
        let details = match self {
            ResolveError::Extraction {
                raw_output: Some(raw),
                ..
            } => serde_json::json!({ "raw_output": raw }),
            _ => serde_json::Value::Null,
        };

        StructuredFailure {
            error_type: self.error_type(),
            message: self.to_string(),
            details,
        }
    }
}
