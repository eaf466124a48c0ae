//! Language model access for intent extraction

pub mod client;
pub mod prompt;

pub use client::{ChatClient, LlmClient};
pub use prompt::Prompt;
