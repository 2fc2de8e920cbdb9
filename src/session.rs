//! State layer: the runtime call stack and conversation history for a single
//! user session. Implements the "call stack with a mailbox" pattern that
//! lets workflows invoke sub-workflows recursively without host-language
//! recursion (see [`crate::engine`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Final status of a completed child workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowResultStatus {
    Success,
    Aborted,
}

/// The output of a completed sub-workflow, deposited into the parent frame's
/// mailbox on POP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub source_workflow_id: String,
    pub status: WorkflowResultStatus,
    pub summary: String,
    #[serde(default)]
    pub slots_collected: HashMap<String, serde_json::Value>,
}

/// One entry on a session's call stack: a workflow paired with a pointer to
/// its current step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub workflow_name: String,
    pub current_step_id: String,
    /// The single-slot mailbox holding a just-completed child's result until
    /// the parent consumes it on its next turn.
    #[serde(default)]
    pub pending_child_result: Option<WorkflowResult>,
}

impl Frame {
    pub fn new(workflow_name: impl Into<String>, start_step: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            current_step_id: start_step.into(),
            pending_child_result: None,
        }
    }
}

/// The global runtime state for a single user session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    #[serde(default)]
    pub stack: Vec<Frame>,
    #[serde(default)]
    pub slots: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub history: Vec<Message>,
    pub updated_at: DateTime<Utc>,
    /// Set when a turn resolves to `GIVE_UP`; reserved for a future human
    /// hand-off surface. Does not change engine semantics.
    #[serde(default)]
    pub escalated: bool,
}

impl SessionState {
    /// Creates a fresh, empty session with a newly generated id.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            stack: Vec::new(),
            slots: HashMap::new(),
            history: Vec::new(),
            updated_at: Utc::now(),
            escalated: false,
        }
    }

    /// The frame on top of the stack, if any.
    pub fn active_frame(&self) -> Option<&Frame> {
        self.stack.last()
    }

    /// Mutable access to the frame on top of the stack, if any.
    pub fn active_frame_mut(&mut self) -> Option<&mut Frame> {
        self.stack.last_mut()
    }

    /// A session with an empty stack is terminal: no workflow is active and
    /// a fresh cold-start selection is required before further progress.
    pub fn is_terminal(&self) -> bool {
        self.stack.is_empty()
    }

    /// Appends a user message (if present) and an assistant reply to
    /// history, preserving strict user/assistant alternation per turn.
    pub fn append_turn(&mut self, user_input: Option<&str>, assistant_reply: &str) {
        if let Some(text) = user_input {
            if !text.is_empty() {
                self.history.push(Message::user(text));
            }
        }
        self.history.push(Message::assistant(assistant_reply));
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_empty_terminal_stack() {
        let session = SessionState::new();
        assert!(session.is_terminal());
        assert!(session.active_frame().is_none());
    }

    #[test]
    fn append_turn_preserves_alternation() {
        let mut session = SessionState::new();
        session.append_turn(Some("hello"), "hi there");
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, Role::User);
        assert_eq!(session.history[1].role, Role::Assistant);
    }

    #[test]
    fn append_turn_without_user_input_adds_only_assistant_message() {
        let mut session = SessionState::new();
        session.append_turn(None, "system-driven reply");
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].role, Role::Assistant);
    }

    #[test]
    fn serde_round_trip_preserves_stack_history_and_mailbox() {
        let mut session = SessionState::new();
        session.stack.push(Frame::new("troubleshoot_lukewarm_water", "step_01_thermostat"));
        session.stack.push(Frame {
            workflow_name: "drain_water_heater".into(),
            current_step_id: "drain_end_success".into(),
            pending_child_result: None,
        });
        session.append_turn(Some("hi"), "hello");
        session.slots.insert("owner_name".into(), serde_json::json!("Alex"));

        let json = serde_json::to_string(&session).unwrap();
        let restored: SessionState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.stack.len(), session.stack.len());
        assert_eq!(restored.stack[0].workflow_name, session.stack[0].workflow_name);
        assert_eq!(restored.stack[1].current_step_id, session.stack[1].current_step_id);
        assert_eq!(restored.history.len(), session.history.len());
        assert_eq!(restored.slots.get("owner_name"), session.slots.get("owner_name"));
    }

    #[test]
    fn mailbox_round_trips_either_result_status() {
        let mut frame = Frame::new("drain_water_heater", "drain_end_success");
        frame.pending_child_result = Some(WorkflowResult {
            source_workflow_id: "drain_water_heater".into(),
            status: WorkflowResultStatus::Aborted,
            summary: "user stopped midway".into(),
            slots_collected: HashMap::new(),
        });
        let json = serde_json::to_string(&frame).unwrap();
        let restored: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.pending_child_result.unwrap().status,
            WorkflowResultStatus::Aborted
        );
    }
}
