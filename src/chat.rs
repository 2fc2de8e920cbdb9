//! Chat service: the per-turn facade tying together session lifecycle,
//! cold-start routing, and engine orchestration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::decision::Decision;
use crate::engine::WorkflowEngine;
use crate::error::{EngineError, Result};
use crate::router::WorkflowRouter;
use crate::session::{Frame, SessionState};
use crate::store::{SessionStore, WorkflowStore};

const FALLBACK_REPLY: &str =
    "I'm sorry, I couldn't find a specific troubleshooting guide for that issue. Could you try describing it differently?";

/// Coarse status surfaced to HTTP callers, derived from the engine's
/// per-turn [`Decision`] plus the cold-start-miss case the engine never sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnStatus {
    InProgress,
    Completed,
    Failed,
}

/// The outcome of a single conversation turn.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatTurnResult {
    pub reply: String,
    pub status: TurnStatus,
    pub session_id: String,
}

/// Per-turn facade: load session, cold-start via the router if needed,
/// invoke the engine, persist, and shape the result.
///
/// Turns against the same session are serialized via a per-session-id
/// mutex, since a single session's state must never be mutated by two
/// concurrent turns (see the concurrency model's single-writer-per-session
/// requirement). A second call arriving for a session already mid-turn
/// fails fast with [`EngineError::Conflict`] rather than queuing, since
/// queuing would silently reorder which user message lands on which step.
pub struct ChatService {
    sessions: Arc<dyn SessionStore>,
    workflows: Arc<dyn WorkflowStore>,
    engine: WorkflowEngine,
    router: Arc<dyn WorkflowRouter>,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        workflows: Arc<dyn WorkflowStore>,
        engine: WorkflowEngine,
        router: Arc<dyn WorkflowRouter>,
    ) -> Self {
        Self { sessions, workflows, engine, router, locks: StdMutex::new(HashMap::new()) }
    }

    pub async fn create_session(&self) -> Result<SessionState> {
        let session = SessionState::new();
        self.sessions.put(&session).await?;
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionState> {
        self.sessions.get(session_id).await?.ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        self.sessions.delete(session_id).await
    }

    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("chat service lock map poisoned");
        locks.entry(session_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Runs one turn for `session_id`.
    pub async fn process_message(&self, session_id: &str, user_text: &str) -> Result<ChatTurnResult> {
        let lock = self.lock_for(session_id);
        let _guard = lock.try_lock().map_err(|_| {
            EngineError::Conflict(format!("session {session_id} is already processing a message"))
        })?;

        let mut session =
            self.sessions.get(session_id).await?.ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        if session.is_terminal() {
            self.handle_cold_start(&mut session, user_text).await?;
        }

        if session.is_terminal() {
            return Ok(ChatTurnResult {
                reply: FALLBACK_REPLY.to_string(),
                status: TurnStatus::Failed,
                session_id: session.session_id.clone(),
            });
        }

        let decision = self.engine.handle_message(&mut session, Some(user_text)).await?;
        session.updated_at = chrono::Utc::now();
        self.sessions.put(&session).await?;

        Ok(ChatTurnResult {
            reply: decision.reply_to_user.clone(),
            status: status_for(&session, &decision),
            session_id: session.session_id.clone(),
        })
    }

    async fn handle_cold_start(&self, session: &mut SessionState, user_text: &str) -> Result<()> {
        info!(session_id = %session.session_id, "cold start detected");

        match self.router.find_best_workflow(user_text).await? {
            Some((workflow_id, score)) => {
                info!(session_id = %session.session_id, workflow_id = %workflow_id, score, "router selected workflow");
                let workflow = self
                    .workflows
                    .get(&workflow_id)
                    .await?
                    .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.clone()))?;
                session.stack.push(Frame::new(workflow.name, workflow.start_step));
            }
            None => {
                warn!(session_id = %session.session_id, "router found no matching workflow");
            }
        }
        Ok(())
    }
}

fn status_for(session: &SessionState, _decision: &Decision) -> TurnStatus {
    if session.is_terminal() {
        TurnStatus::Completed
    } else {
        TurnStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use crate::domain::{Step, StepOption, StepType, Workflow};
    use crate::executor::StepExecutor;
    use crate::llm::providers::FixedDecisionProvider;
    use crate::narrator::TransitionNarrator;
    use crate::router::{FixedWorkflowRouter, KeywordOverlapRouter};
    use crate::store::{InMemorySessionStore, StaticWorkflowStore};
    use std::sync::Arc;

    fn lukewarm_workflow() -> Workflow {
        Workflow::new("troubleshoot_lukewarm_water", "Fix Lukewarm Water", "step_01_thermostat")
            .with_step(
                Step::new("step_01_thermostat", StepType::AskChoice, "Determine thermostat setting")
                    .with_option(StepOption {
                        id: "was_low".into(),
                        label: "Thermostat was too low".into(),
                        next_step_id: "end_success".into(),
                    }),
            )
            .with_step(Step::new("end_success", StepType::End, "Issue resolved"))
    }

    fn build_service(decisions: Vec<Decision>) -> ChatService {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let workflows: Arc<dyn WorkflowStore> = Arc::new(StaticWorkflowStore::new(vec![lukewarm_workflow()]));
        let provider = Arc::new(FixedDecisionProvider::new("fixed", decisions));
        let executor = StepExecutor::new(provider.clone(), 0.0);
        let narrator = TransitionNarrator::new(provider, 0.0);
        let engine = WorkflowEngine::new(workflows.clone(), executor, narrator);
        let router: Arc<dyn WorkflowRouter> = Arc::new(KeywordOverlapRouter::new(&[lukewarm_workflow()], 0.1));
        ChatService::new(sessions, workflows, engine, router)
    }

    #[tokio::test]
    async fn cold_start_pushes_initial_frame_and_processes_turn() {
        use crate::decision::DecisionStatus;

        let service = build_service(vec![Decision {
            reply_to_user: "Is your thermostat set low?".into(),
            status: DecisionStatus::InProgress,
            result_value: None,
            reasoning: "awaiting user input".into(),
        }]);

        let session = service.create_session().await.unwrap();
        let result = service.process_message(&session.session_id, "my water is lukewarm").await.unwrap();

        assert_eq!(result.status, TurnStatus::InProgress);
        assert_eq!(result.reply, "Is your thermostat set low?");

        let persisted = service.get_session(&session.session_id).await.unwrap();
        assert!(!persisted.is_terminal());
    }

    #[tokio::test]
    async fn cold_start_with_no_router_match_returns_fallback_without_mutating_session() {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let workflows: Arc<dyn WorkflowStore> = Arc::new(StaticWorkflowStore::new(vec![lukewarm_workflow()]));
        let provider = Arc::new(FixedDecisionProvider::new("fixed", vec![]));
        let executor = StepExecutor::new(provider.clone(), 0.0);
        let narrator = TransitionNarrator::new(provider, 0.0);
        let engine = WorkflowEngine::new(workflows.clone(), executor, narrator);
        let router: Arc<dyn WorkflowRouter> = Arc::new(FixedWorkflowRouter::never());
        let service = ChatService::new(sessions, workflows, engine, router);

        let session = service.create_session().await.unwrap();
        let result = service.process_message(&session.session_id, "something unrelated").await.unwrap();

        assert_eq!(result.status, TurnStatus::Failed);
        assert_eq!(result.reply, FALLBACK_REPLY);

        let persisted = service.get_session(&session.session_id).await.unwrap();
        assert!(persisted.is_terminal());
    }

    #[tokio::test]
    async fn unknown_session_id_surfaces_session_not_found() {
        let service = build_service(vec![]);
        let err = service.process_message("does-not-exist", "hi").await.unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound(_)));
    }
}
