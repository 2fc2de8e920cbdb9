//! The structured-output contract the LLM must fill in on every turn.
//!
//! [`Decision`] is deliberately the only shape an LLM call in this engine is
//! allowed to return. Providers are responsible for coercing raw model
//! output into this schema (see [`crate::llm`]); nothing downstream ever
//! inspects free-form text.

use serde::{Deserialize, Serialize};

/// The distinct states a step can resolve to after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    /// Goal not yet met; keep chatting.
    InProgress,
    /// Goal met; move to the next step.
    Complete,
    /// The user needs a sub-task; branch to a child workflow.
    CallWorkflow,
    /// Unresolvable blocker or safety concern; escalate.
    GiveUp,
}

/// The strict JSON structure the LLM must generate for every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// The natural-language response to show the user.
    pub reply_to_user: String,
    /// The status of the current step after this turn.
    pub status: DecisionStatus,
    /// The option id (for choices), workflow id (for branching), or slot
    /// value extracted this turn, if any.
    #[serde(default)]
    pub result_value: Option<String>,
    /// Brief internal chain-of-thought justifying the chosen status. Used
    /// for logging and to parameterize transition narration, never shown
    /// verbatim to the user.
    pub reasoning: String,
}

impl Decision {
    /// The deterministic fallback used when a provider call fails outright.
    /// Surfaces as HOLD: the session remains on the current step.
    pub fn system_error_fallback(error: impl std::fmt::Display) -> Self {
        Self {
            reply_to_user: "System error, please try again.".to_string(),
            status: DecisionStatus::InProgress,
            result_value: None,
            reasoning: format!("error: {error}"),
        }
    }
}

/// The JSON schema handed to the LLM provider so it can constrain its
/// output (e.g. OpenAI `response_format: json_schema`, or embedded in an
/// Anthropic system prompt). Centralized here so every adapter advertises
/// the identical contract.
pub fn decision_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "reply_to_user": { "type": "string" },
            "status": {
                "type": "string",
                "enum": ["IN_PROGRESS", "COMPLETE", "CALL_WORKFLOW", "GIVE_UP"]
            },
            "result_value": { "type": ["string", "null"] },
            "reasoning": { "type": "string" }
        },
        "required": ["reply_to_user", "status", "reasoning"],
        "additionalProperties": false
    })
}
