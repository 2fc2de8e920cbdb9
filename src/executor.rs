//! Agentic step execution layer.
//!
//! [`StepExecutor`] is a stateless wrapper around a
//! [`StructuredLlmProvider`](crate::llm::StructuredLlmProvider): it builds the
//! per-turn prompt, sends it alongside conversation history, and returns the
//! resulting [`Decision`]. It never touches [`crate::session::SessionState`]
//! directly - that mutation belongs entirely to [`crate::engine::WorkflowEngine`].

use std::sync::Arc;

use tracing::error;

use crate::decision::Decision;
use crate::domain::Step;
use crate::llm::provider::{ChatMessage, StructuredLlmProvider};
use crate::prompt::build_step_execution_prompt;
use crate::session::{Frame, Message, Role};

/// Executes a single step turn against an LLM provider.
pub struct StepExecutor {
    llm: Arc<dyn StructuredLlmProvider>,
    temperature: f32,
}

impl StepExecutor {
    pub fn new(llm: Arc<dyn StructuredLlmProvider>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Runs one turn: assembles the system prompt for `step`/`frame`, appends
    /// `history` and the optional `user_input`, and asks the provider for a
    /// [`Decision`]. On provider failure, falls back to
    /// [`Decision::system_error_fallback`] rather than propagating - a failed
    /// LLM call must never crash the session, only hold it in place.
    pub async fn run_turn(
        &self,
        step: &Step,
        frame: &Frame,
        user_input: Option<&str>,
        history: &[Message],
    ) -> Decision {
        let system_prompt = build_step_execution_prompt(step, frame);

        let mut messages = vec![ChatMessage::system(system_prompt)];
        for msg in history {
            messages.push(match msg.role {
                Role::User => ChatMessage::user(msg.content.clone()),
                Role::Assistant => ChatMessage::assistant(msg.content.clone()),
            });
        }
        if let Some(text) = user_input {
            if !text.is_empty() {
                messages.push(ChatMessage::user(text));
            }
        }

        match self.llm.generate_decision(&messages, self.temperature).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(step = %step.id, error = %e, "step execution failed");
                Decision::system_error_fallback(e)
            }
        }
    }
}
