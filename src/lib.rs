//! Conversational troubleshooting engine.
//!
//! A hierarchical state machine with a call stack that guides users through
//! structured diagnostic workflows, delegating per-turn natural-language
//! reasoning to an LLM constrained by structured JSON output.
//!
//! Start with [`chat::ChatService`], the per-turn facade, or
//! [`engine::WorkflowEngine`] for the orchestrator it wraps.
//!
//! # Example
//!
//! ```rust,no_run
//! use diy_troubleshooting_engine::chat::ChatService;
//! use diy_troubleshooting_engine::engine::WorkflowEngine;
//! use diy_troubleshooting_engine::executor::StepExecutor;
//! use diy_troubleshooting_engine::narrator::TransitionNarrator;
//! use diy_troubleshooting_engine::router::KeywordOverlapRouter;
//! use diy_troubleshooting_engine::store::{InMemorySessionStore, StaticWorkflowStore};
//! use diy_troubleshooting_engine::seed;
//! use std::sync::Arc;
//!
//! # async fn run(llm: Arc<dyn diy_troubleshooting_engine::llm::provider::StructuredLlmProvider>) -> anyhow::Result<()> {
//! let workflows = seed::all();
//! let router = Arc::new(KeywordOverlapRouter::new(&workflows, 0.2));
//! let workflow_store = Arc::new(StaticWorkflowStore::new(workflows));
//! let executor = StepExecutor::new(llm.clone(), 0.2);
//! let narrator = TransitionNarrator::new(llm, 0.2);
//! let engine = WorkflowEngine::new(workflow_store.clone(), executor, narrator);
//! let chat = ChatService::new(Arc::new(InMemorySessionStore::new()), workflow_store, engine, router);
//!
//! let session = chat.create_session().await?;
//! let result = chat.process_message(&session.session_id, "my water is lukewarm").await?;
//! println!("{}", result.reply);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod decision;
pub mod domain;
pub mod engine;
pub mod error;
pub mod executor;
pub mod llm;
pub mod narrator;
pub mod prompt;
pub mod router;
pub mod seed;
pub mod session;
pub mod store;
pub mod transition;

pub use chat::{ChatService, ChatTurnResult, TurnStatus};
pub use decision::{Decision, DecisionStatus};
pub use domain::{Step, StepOption, StepType, Workflow, WorkflowLink};
pub use engine::WorkflowEngine;
pub use error::{EngineError, Result};
pub use router::WorkflowRouter;
pub use session::{Frame, Message, Role, SessionState, WorkflowResult, WorkflowResultStatus};
pub use transition::StateMachineTransition;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
