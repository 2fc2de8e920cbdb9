//! Engine-internal state-machine transitions.
//!
//! Deliberately a different set from [`crate::decision::DecisionStatus`].
//! The LLM only ever sees `DecisionStatus`; only [`crate::engine`] ever sees
//! `StateMachineTransition`. Keeping the two disjoint is the anti-corruption
//! boundary between "what the model thinks happened" and "what actually
//! happened to the call stack".

use crate::domain::WorkflowLink;
use crate::session::WorkflowResult;

/// What happened to the call-stack pointer this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMachineTransition {
    /// The pointer remains on the current node.
    Hold,
    /// The pointer moved to the next linear or branched node.
    Advance,
    /// A child workflow frame was pushed onto the stack.
    Push,
    /// The frame was popped because the workflow completed.
    Pop,
}

/// Metadata about a transition, passed to the transition narrator alongside
/// the `from`/`to` steps themselves.
#[derive(Debug, Clone)]
pub struct TransitionMeta {
    pub transition_type: StateMachineTransition,
    pub reasoning: String,
    pub workflow_link: Option<WorkflowLink>,
    pub child_result: Option<WorkflowResult>,
}

impl TransitionMeta {
    pub fn advance(reasoning: impl Into<String>) -> Self {
        Self {
            transition_type: StateMachineTransition::Advance,
            reasoning: reasoning.into(),
            workflow_link: None,
            child_result: None,
        }
    }

    pub fn push(reasoning: impl Into<String>, link: WorkflowLink) -> Self {
        Self {
            transition_type: StateMachineTransition::Push,
            reasoning: reasoning.into(),
            workflow_link: Some(link),
            child_result: None,
        }
    }

    pub fn pop(reasoning: impl Into<String>, child_result: WorkflowResult) -> Self {
        Self {
            transition_type: StateMachineTransition::Pop,
            reasoning: reasoning.into(),
            workflow_link: None,
            child_result: Some(child_result),
        }
    }
}
