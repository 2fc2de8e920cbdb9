//! Structured LLM provider trait and common types.
//!
//! Every provider call in this engine returns a validated
//! [`Decision`](crate::decision::Decision) - never raw text. Adapters are
//! responsible for coercing whatever their upstream API returns (tool-use
//! blocks, JSON-mode completions) into that schema.

use crate::decision::Decision;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Anthropic,
    OpenAI,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Anthropic => write!(f, "anthropic"),
            ProviderType::OpenAI => write!(f, "openai"),
        }
    }
}

/// Role of a single message sent to the provider. A superset of
/// [`crate::session::Role`]: providers need a `System` role to carry the
/// assembled prompt, which session history never persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in the list handed to a provider for a single turn.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Configuration for a specific LLM provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderType,
    pub name: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout() -> u64 {
    60
}

/// The contract every LLM adapter implements. Consumed by
/// [`crate::executor::StepExecutor`] and [`crate::narrator::TransitionNarrator`],
/// never called directly by [`crate::engine::WorkflowEngine`].
#[async_trait]
pub trait StructuredLlmProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    fn name(&self) -> &str;

    /// Generates a [`Decision`] strictly matching the schema in
    /// [`crate::decision::decision_json_schema`].
    async fn generate_decision(&self, messages: &[ChatMessage], temperature: f32) -> Result<Decision>;

    /// Health check; default implementation attempts a minimal decision call.
    async fn health_check(&self) -> Result<bool> {
        let probe = [ChatMessage::system(
            "Respond with status IN_PROGRESS and reply_to_user 'ok'.",
        )];
        match self.generate_decision(&probe, 0.0).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}
