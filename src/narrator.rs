//! Transition narrator.
//!
//! After an ADVANCE, PUSH, or POP, one dedicated LLM call produces a single
//! coherent message that bridges the completed step and the new one. This
//! replaces concatenating the raw replies of multiple internal turns - which
//! read as disjointed back-to-back messages rather than one natural
//! response.

use std::sync::Arc;

use tracing::error;

use crate::decision::{Decision, DecisionStatus};
use crate::domain::Step;
use crate::llm::provider::{ChatMessage, StructuredLlmProvider};
use crate::prompt::build_step_introduction_prompt;
use crate::session::{Message, Role};
use crate::transition::TransitionMeta;

/// Narrates the transition from `from` to `to`, given `meta` and the
/// conversation so far.
pub struct TransitionNarrator {
    llm: Arc<dyn StructuredLlmProvider>,
    temperature: f32,
}

impl TransitionNarrator {
    pub fn new(llm: Arc<dyn StructuredLlmProvider>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Produces an introduction [`Decision`] for `to`, always with
    /// `status = IN_PROGRESS` - the new step has not yet begun, regardless
    /// of what the provider returns. On provider failure, falls back to a
    /// deterministic "Let's proceed. {goal}" message.
    pub async fn introduce(
        &self,
        from: &Step,
        to: &Step,
        meta: &TransitionMeta,
        history: &[Message],
    ) -> Decision {
        let system_prompt = build_step_introduction_prompt(from, to, meta);

        let mut messages = vec![ChatMessage::system(system_prompt)];
        for msg in history {
            messages.push(match msg.role {
                Role::User => ChatMessage::user(msg.content.clone()),
                Role::Assistant => ChatMessage::assistant(msg.content.clone()),
            });
        }

        let mut decision = match self.llm.generate_decision(&messages, self.temperature).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(from = %from.id, to = %to.id, error = %e, "step introduction failed");
                Decision {
                    reply_to_user: format!("Let's proceed. {}", to.goal),
                    status: DecisionStatus::InProgress,
                    result_value: None,
                    reasoning: format!("error during introduction: {e}"),
                }
            }
        };
        decision.status = DecisionStatus::InProgress;
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StepType;
    use crate::llm::providers::FixedDecisionProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn always_returns_in_progress_even_if_provider_says_otherwise() {
        let provider: Arc<dyn StructuredLlmProvider> = Arc::new(FixedDecisionProvider::new(
            "fixed",
            vec![Decision {
                reply_to_user: "Great, moving on. Let's check the breaker.".into(),
                status: DecisionStatus::Complete,
                result_value: None,
                reasoning: "misbehaving provider".into(),
            }],
        ));
        let narrator = TransitionNarrator::new(provider, 0.0);

        let from = Step::new("step_01_thermostat", StepType::AskChoice, "Determine thermostat setting");
        let to = Step::new("step_02_breaker", StepType::Instruction, "Check the breaker");
        let meta = TransitionMeta::advance("thermostat was confirmed fine");

        let decision = narrator.introduce(&from, &to, &meta, &[]).await;
        assert_eq!(decision.status, DecisionStatus::InProgress);
        assert_eq!(decision.reply_to_user, "Great, moving on. Let's check the breaker.");
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl StructuredLlmProvider for FailingProvider {
        fn provider_type(&self) -> crate::llm::provider::ProviderType {
            crate::llm::provider::ProviderType::OpenAI
        }
        fn name(&self) -> &str {
            "failing"
        }
        async fn generate_decision(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
        ) -> crate::error::Result<Decision> {
            Err(crate::error::LlmError::Timeout.into())
        }
    }

    #[tokio::test]
    async fn falls_back_to_deterministic_message_on_provider_error() {
        let provider: Arc<dyn StructuredLlmProvider> = Arc::new(FailingProvider);
        let narrator = TransitionNarrator::new(provider, 0.0);

        let from = Step::new("drain_end_success", StepType::End, "Tank drained");
        let to = Step::new("step_04_sediment", StepType::Instruction, "Check for sediment again");
        let meta = TransitionMeta::advance("child workflow completed");

        let decision = narrator.introduce(&from, &to, &meta, &[]).await;
        assert_eq!(decision.status, DecisionStatus::InProgress);
        assert_eq!(decision.reply_to_user, "Let's proceed. Check for sediment again");
    }
}
