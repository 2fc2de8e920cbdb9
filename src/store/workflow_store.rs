//! Workflow definition storage.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::Workflow;
use crate::error::{EngineError, Result};

/// Read-only access to workflow definitions by name. Workflows never
/// mutate at runtime (see [`crate::domain::Workflow`]), so this trait has no
/// write path beyond seeding.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Workflow>>;
    async fn list(&self) -> Result<Vec<Workflow>>;

    /// Whether a workflow by this name is known, without fetching its body.
    /// Used by the engine's `CALL_WORKFLOW` path to validate a branch target.
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get(name).await?.is_some())
    }
}

/// A fixed set of workflows known at construction time. Used in tests and
/// as the default dev-path store, standing in for the seed pipeline that
/// would otherwise populate a persisted store.
pub struct StaticWorkflowStore {
    workflows: RwLock<HashMap<String, Workflow>>,
}

impl StaticWorkflowStore {
    pub fn new(workflows: Vec<Workflow>) -> Self {
        let map = workflows.into_iter().map(|w| (w.name.clone(), w)).collect();
        Self { workflows: RwLock::new(map) }
    }
}

#[async_trait]
impl WorkflowStore for StaticWorkflowStore {
    async fn get(&self, name: &str) -> Result<Option<Workflow>> {
        let workflows = self.workflows.read().expect("workflow store lock poisoned");
        Ok(workflows.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Workflow>> {
        let workflows = self.workflows.read().expect("workflow store lock poisoned");
        Ok(workflows.values().cloned().collect())
    }
}

/// SQLite-backed workflow store. Workflows are persisted as a single JSON
/// blob per row (a `steps_json` column) rather than normalizing steps into
/// their own tables.
pub struct SqliteWorkflowStore {
    pool: SqlitePool,
}

impl SqliteWorkflowStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                name TEXT PRIMARY KEY,
                definition_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Inserts or overwrites a workflow definition. Used by the seeding
    /// binary, not by the engine at runtime.
    pub async fn put(&self, workflow: &Workflow) -> Result<()> {
        let definition_json = serde_json::to_string(workflow)?;
        let updated_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO workflows (name, definition_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET definition_json = excluded.definition_json, updated_at = excluded.updated_at
            "#,
        )
        .bind(&workflow.name)
        .bind(&definition_json)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct WorkflowRow {
    definition_json: String,
}

#[async_trait]
impl WorkflowStore for SqliteWorkflowStore {
    async fn get(&self, name: &str) -> Result<Option<Workflow>> {
        let row = sqlx::query_as::<_, WorkflowRow>("SELECT definition_json FROM workflows WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| serde_json::from_str(&r.definition_json).map_err(EngineError::from))
            .transpose()
    }

    async fn list(&self) -> Result<Vec<Workflow>> {
        let rows = sqlx::query_as::<_, WorkflowRow>("SELECT definition_json FROM workflows")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| serde_json::from_str(&r.definition_json).map_err(EngineError::from))
            .collect()
    }
}
