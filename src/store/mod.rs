//! Collaborator storage interfaces and their implementations.
//!
//! Each store ships an in-memory implementation (tests, zero-dependency dev
//! path) and a SQLite-backed one (`sqlx`), split between ephemeral and
//! persisted state.

mod session_store;
mod workflow_store;

pub use session_store::{InMemorySessionStore, SessionStore, SqliteSessionStore};
pub use workflow_store::{SqliteWorkflowStore, StaticWorkflowStore, WorkflowStore};
