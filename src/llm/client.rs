//! OpenAI-compatible chat completion client
//!
//! Endpoint: POST {api_base}/chat/completions, bearer authentication,
//! non-streaming. The first choice's message content is returned verbatim.

use crate::config::LlmConfig;
use crate::errors::LlmError;
use crate::llm::prompt::Prompt;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default DeepSeek API base
pub const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1";

/// Default OpenAI API base
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Text completion capability
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError>;
}

/// Chat completion client
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_base: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl ChatClient {
    /// Create client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let api_base = resolve_api_base(&config.provider, config.api_base.as_deref())?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base,
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmClient for ChatClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_base);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
        };

        debug!(model = %self.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Api("response contained no choices".to_string()))
    }
}

/// Resolve the API base URL for a provider, honoring an explicit override
pub fn resolve_api_base(provider: &str, api_base: Option<&str>) -> Result<String, LlmError> {
    if let Some(base) = api_base.map(str::trim).filter(|b| !b.is_empty()) {
        return Ok(base.trim_end_matches('/').to_string());
    }
    match provider {
        "deepseek" => Ok(DEEPSEEK_API_BASE.to_string()),
        "openai" => Ok(OPENAI_API_BASE.to_string()),
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_api_base() {
        assert_eq!(resolve_api_base("deepseek", None).unwrap(), DEEPSEEK_API_BASE);
        assert_eq!(resolve_api_base("openai", Some("  ")).unwrap(), OPENAI_API_BASE);
        assert_eq!(
            resolve_api_base("custom", Some("http://localhost:8000/v1/")).unwrap(),
            "http://localhost:8000/v1"
        );
        assert!(resolve_api_base("custom", None).is_err());
    }

    #[test]
    fn test_client_requires_api_key() {
        let config = LlmConfig::default();
        assert!(matches!(
            ChatClient::from_config(&config),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[test]
    fn test_client_with_config() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        };
        let client = ChatClient::from_config(&config).unwrap();
        assert_eq!(client.model(), config.model);
        assert_eq!(client.api_base(), DEEPSEEK_API_BASE);
    }

    #[test]
    fn test_chat_response_parsing() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "{}"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content, "{}");
    }
}
