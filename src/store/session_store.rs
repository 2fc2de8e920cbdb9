//! Session state storage.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::{EngineError, Result};
use crate::session::SessionState;

/// Persists and retrieves [`SessionState`] by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<SessionState>>;
    async fn put(&self, session: &SessionState) -> Result<()>;
    async fn delete(&self, session_id: &str) -> Result<bool>;
}

/// In-memory session store for tests and the zero-dependency dev path.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionState>> {
        let sessions = self.sessions.lock().expect("session store lock poisoned");
        Ok(sessions.get(session_id).cloned())
    }

    async fn put(&self, session: &SessionState) -> Result<()> {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        Ok(sessions.remove(session_id).is_some())
    }
}

/// SQLite-backed session store. Sessions are persisted as a single JSON
/// blob per row (stack, slots, history, mailbox all travel together)
/// rather than normalizing the call stack into its own table.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                state_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    state_json: String,
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<SessionState>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT state_json FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| serde_json::from_str(&r.state_json).map_err(EngineError::from)).transpose()
    }

    async fn put(&self, session: &SessionState) -> Result<()> {
        let state_json = serde_json::to_string(session)?;
        let updated_at = session.updated_at.to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, state_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET state_json = excluded.state_json, updated_at = excluded.updated_at
            "#,
        )
        .bind(&session.session_id)
        .bind(&state_json)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips_session() {
        let store = InMemorySessionStore::new();
        let session = SessionState::new();
        let id = session.session_id.clone();

        store.put(&session).await.unwrap();
        let found = store.get(&id).await.unwrap().unwrap();
        assert_eq!(found.session_id, id);

        assert!(store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sqlite_store_round_trips_session() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sessions.sqlite");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let store = SqliteSessionStore::new(&url).await.unwrap();

        let mut session = SessionState::new();
        session.append_turn(Some("hi"), "hello");
        let id = session.session_id.clone();

        store.put(&session).await.unwrap();
        let found = store.get(&id).await.unwrap().unwrap();
        assert_eq!(found.history.len(), 2);

        assert!(store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());
    }
}
