//! Anthropic Claude adapter.
//!
//! Anthropic has no native JSON-schema response mode, so the [`Decision`]
//! contract is enforced via a single forced tool call: the schema is
//! declared as a tool and `tool_choice` pins the model to it. This avoids
//! relying on the model to emit bare JSON inside a text block.

use crate::decision::{decision_json_schema, Decision};
use crate::error::{LlmError, Result};
use crate::llm::provider::{ChatMessage, ChatRole, ProviderConfig, ProviderType, StructuredLlmProvider};
use crate::llm::providers::base::HttpProviderClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const TOOL_NAME: &str = "emit_decision";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
    tools: Vec<AnthropicTool>,
    tool_choice: ToolChoice,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { name: String, input: serde_json::Value },
}

/// Anthropic Claude provider, constrained to emit [`Decision`] via a single
/// forced tool call.
pub struct AnthropicProvider {
    client: HttpProviderClient,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = HttpProviderClient::new(config.timeout);
        Self { client, config }
    }

    pub fn from_env(model: String) -> std::result::Result<Self, String> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| "ANTHROPIC_API_KEY environment variable not set".to_string())?;

        Ok(Self::new(ProviderConfig {
            provider: ProviderType::Anthropic,
            name: "anthropic".to_string(),
            api_key: Some(api_key),
            base_url: Some("https://api.anthropic.com".to_string()),
            model,
            max_tokens: 1024,
            temperature: 0.2,
            timeout: 120,
        }))
    }

    fn base_url(&self) -> String {
        self.config.base_url.clone().unwrap_or_else(|| "https://api.anthropic.com".to_string())
    }

    fn build_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("anthropic-version".to_string(), "2023-06-01".to_string()),
        ];
        if let Some(api_key) = &self.config.api_key {
            headers.push(("x-api-key".to_string(), api_key.clone()));
        }
        headers
    }
}

#[async_trait]
impl StructuredLlmProvider for AnthropicProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    async fn generate_decision(&self, messages: &[ChatMessage], temperature: f32) -> Result<Decision> {
        let system = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n\n");
        let system = if system.is_empty() { None } else { Some(system) };

        let anthropic_messages: Vec<AnthropicMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| AnthropicMessage {
                role: match m.role {
                    ChatRole::User => "user".to_string(),
                    ChatRole::Assistant => "assistant".to_string(),
                    ChatRole::System => unreachable!("filtered above"),
                },
                content: m.content.clone(),
            })
            .collect();

        if anthropic_messages.is_empty() {
            return Err(LlmError::InvalidResponse("no user/assistant messages to send".to_string()).into());
        }

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            messages: anthropic_messages,
            max_tokens: self.config.max_tokens,
            system,
            temperature,
            tools: vec![AnthropicTool {
                name: TOOL_NAME.to_string(),
                description: "Record the decision for this troubleshooting turn.".to_string(),
                input_schema: decision_json_schema(),
            }],
            tool_choice: ToolChoice { choice_type: "tool".to_string(), name: TOOL_NAME.to_string() },
        };

        let url = format!("{}/v1/messages", self.base_url().trim_end_matches('/'));
        let headers = self.build_headers();
        let borrowed_headers: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

        let response: AnthropicResponse = self.client.post_json(&url, &request, borrowed_headers).await?;

        for block in response.content {
            if let ContentBlock::ToolUse { name, input } = block {
                if name == TOOL_NAME {
                    return serde_json::from_value(input)
                        .map_err(|e| LlmError::InvalidResponse(e.to_string()).into());
                }
            }
        }

        Err(LlmError::InvalidResponse("no tool_use block in response".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionStatus;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn builds_request_with_forced_tool_choice() {
        let config = ProviderConfig {
            provider: ProviderType::Anthropic,
            name: "test".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: Some("https://api.anthropic.com".to_string()),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 512,
            temperature: 0.2,
            timeout: 30,
        };
        let provider = AnthropicProvider::new(config);
        assert_eq!(provider.name(), "test");
        assert_eq!(provider.provider_type(), ProviderType::Anthropic);
    }

    #[tokio::test]
    async fn generate_decision_parses_forced_tool_use_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    { "type": "text", "text": "thinking..." },
                    {
                        "type": "tool_use",
                        "name": TOOL_NAME,
                        "input": {
                            "reply_to_user": "Is the thermostat set too low?",
                            "status": "IN_PROGRESS",
                            "result_value": null,
                            "reasoning": "need more information"
                        }
                    }
                ]
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(ProviderConfig {
            provider: ProviderType::Anthropic,
            name: "test".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: Some(server.uri()),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 512,
            temperature: 0.2,
            timeout: 30,
        });

        let decision = provider
            .generate_decision(&[ChatMessage::system("you are a troubleshooter"), ChatMessage::user("hi")], 0.2)
            .await
            .unwrap();

        assert_eq!(decision.status, DecisionStatus::InProgress);
        assert_eq!(decision.reply_to_user, "Is the thermostat set too low?");
    }

    #[tokio::test]
    async fn generate_decision_errors_when_no_tool_use_block_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "type": "text", "text": "I won't call the tool." }]
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(ProviderConfig {
            provider: ProviderType::Anthropic,
            name: "test".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: Some(server.uri()),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 512,
            temperature: 0.2,
            timeout: 30,
        });

        let err = provider.generate_decision(&[ChatMessage::user("hi")], 0.2).await.unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Llm(LlmError::InvalidResponse(_))));
    }
}
