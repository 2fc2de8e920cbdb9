//! OpenAI (and OpenAI-compatible) adapter.
//!
//! Uses `response_format: { type: "json_schema", ... }` to constrain output
//! directly to the [`Decision`] schema - no tool-use indirection needed.

use crate::decision::{decision_json_schema, Decision};
use crate::error::{LlmError, Result};
use crate::llm::provider::{ChatMessage, ChatRole, ProviderConfig, ProviderType, StructuredLlmProvider};
use crate::llm::providers::base::{HttpProviderClient, OpenAICompatible};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Adapter holding just the endpoint and key; shared by OpenAI itself and
/// any OpenAI-compatible gateway (e.g. a local vLLM proxy).
pub struct OpenAiAdapter {
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        Self { base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()), api_key }
    }
}

impl OpenAICompatible for OpenAiAdapter {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

/// OpenAI-compatible provider, constrained to emit [`Decision`] via
/// `response_format: json_schema`.
pub struct OpenAiProvider {
    adapter: OpenAiAdapter,
    client: HttpProviderClient,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let adapter = OpenAiAdapter::new(config.api_key.clone(), config.base_url.clone());
        let client = HttpProviderClient::new(config.timeout);
        Self { adapter, client, config }
    }

    pub fn from_env(model: String) -> std::result::Result<Self, String> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| "OPENAI_API_KEY environment variable not set".to_string())?;

        Ok(Self::new(ProviderConfig {
            provider: ProviderType::OpenAI,
            name: "openai".to_string(),
            api_key: Some(api_key),
            base_url: None,
            model,
            max_tokens: 1024,
            temperature: 0.2,
            timeout: 120,
        }))
    }
}

#[async_trait]
impl StructuredLlmProvider for OpenAiProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn generate_decision(&self, messages: &[ChatMessage], temperature: f32) -> Result<Decision> {
        let openai_messages: Vec<OpenAiMessage> = messages
            .iter()
            .map(|m| OpenAiMessage {
                role: match m.role {
                    ChatRole::System => "system".to_string(),
                    ChatRole::User => "user".to_string(),
                    ChatRole::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect();

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: openai_messages,
            max_tokens: self.config.max_tokens,
            temperature,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "decision".to_string(),
                    strict: true,
                    schema: decision_json_schema(),
                },
            },
        };

        let url = self.adapter.build_url("chat/completions");
        let headers: Vec<(&str, String)> = self.adapter.auth_headers();
        let borrowed_headers: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response: ChatCompletionResponse = self.client.post_json(&url, &request, borrowed_headers).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

        serde_json::from_str(&content).map_err(|e| LlmError::InvalidResponse(e.to_string()).into())
    }
}
