//! A scripted provider for tests and local development without API keys.

use crate::decision::Decision;
use crate::error::Result;
use crate::llm::provider::{ChatMessage, ProviderType, StructuredLlmProvider};
use async_trait::async_trait;
use std::sync::Mutex;

/// Returns a fixed sequence of decisions, one per call, then repeats the
/// last one. Grounded on the original source's `MockWorkflowRouter` pattern
/// of a hardcoded stand-in used in tests and demos.
pub struct FixedDecisionProvider {
    name: String,
    script: Mutex<Vec<Decision>>,
}

impl FixedDecisionProvider {
    pub fn new(name: impl Into<String>, script: Vec<Decision>) -> Self {
        Self { name: name.into(), script: Mutex::new(script) }
    }
}

#[async_trait]
impl StructuredLlmProvider for FixedDecisionProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_decision(&self, _messages: &[ChatMessage], _temperature: f32) -> Result<Decision> {
        let mut script = self.script.lock().expect("fixed provider script mutex poisoned");
        if script.len() > 1 {
            Ok(script.remove(0))
        } else {
            Ok(script.first().cloned().unwrap_or_else(|| Decision::system_error_fallback("empty script")))
        }
    }
}
