//! REST API surface for the troubleshooting engine.
//!
//! The engine itself treats HTTP as a collaborator, not a core concern; this
//! module is the thin `axum` shell around [`crate::chat::ChatService`] that
//! makes the repository a runnable service, using the same
//! `AppState` / handler / `utoipa` conventions as the rest of this crate's
//! binaries.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::{OpenApi, ToSchema};

use crate::chat::{ChatService, TurnStatus};
use crate::config::AppConfig;
use crate::engine::WorkflowEngine;
use crate::error::{EngineError, Result};
use crate::executor::StepExecutor;
use crate::llm::provider::{ProviderConfig, ProviderType, StructuredLlmProvider};
use crate::llm::providers::{AnthropicProvider, OpenAiProvider};
use crate::narrator::TransitionNarrator;
use crate::router::{KeywordOverlapRouter, WorkflowRouter};
use crate::seed;
use crate::session::Role;
use crate::store::{SessionStore, SqliteSessionStore, SqliteWorkflowStore, WorkflowStore};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

impl AppState {
    /// Builds the full collaborator graph from [`AppConfig`]: LLM provider,
    /// SQLite-backed session/workflow stores (seeding workflows on first
    /// run), the keyword-overlap cold-start router, and the engine/chat
    /// service wiring.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let llm: Arc<dyn StructuredLlmProvider> = build_llm_provider(&config)?;

        let workflow_store = Arc::new(SqliteWorkflowStore::new(&config.database.url).await?);
        if workflow_store.list().await?.is_empty() {
            info!("no workflows in store, loading seed workflows");
            for workflow in seed::all() {
                workflow_store.put(&workflow).await?;
            }
        }
        let workflows = workflow_store.list().await?;

        let session_store = Arc::new(SqliteSessionStore::new(&config.database.url).await?);

        let executor = StepExecutor::new(llm.clone(), config.llm.temperature);
        let narrator = TransitionNarrator::new(llm, config.llm.temperature);
        let engine = WorkflowEngine::new(workflow_store.clone(), executor, narrator);

        let router: Arc<dyn WorkflowRouter> =
            Arc::new(KeywordOverlapRouter::new(&workflows, config.router.min_confidence));

        let chat = Arc::new(ChatService::new(session_store, workflow_store, engine, router));

        Ok(Self { chat })
    }
}

fn build_llm_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn StructuredLlmProvider>> {
    let provider_config = ProviderConfig {
        provider: if config.llm.provider == "anthropic" { ProviderType::Anthropic } else { ProviderType::OpenAI },
        name: config.llm.provider.clone(),
        api_key: config.llm.api_key.clone(),
        base_url: None,
        model: config.llm.model.clone(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        timeout: config.llm.timeout_secs,
    };

    match config.llm.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicProvider::new(provider_config))),
        "openai" => Ok(Arc::new(OpenAiProvider::new(provider_config))),
        other => Err(anyhow::anyhow!("unsupported llm provider: {other}")),
    }
}

// ============= Request / response shapes =============

/// `POST /sessions/{id}/messages` request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SendMessageRequest {
    #[schema(example = "my water heater is lukewarm")]
    pub text: String,
}

/// `POST /sessions/{id}/messages` response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct SendMessageResponse {
    pub reply: String,
    #[schema(value_type = String)]
    pub status: TurnStatus,
}

/// `POST /sessions` response body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

/// One entry of conversation history, as returned by `GET /sessions/{id}`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct MessageView {
    #[schema(value_type = String)]
    pub role: Role,
    pub content: String,
}

/// Coarse session status surfaced over HTTP: `IN_PROGRESS` while the call
/// stack is non-empty, `COMPLETED` once it has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// `GET /sessions/{id}` response body: the full session view.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SessionView {
    pub session_id: String,
    pub status: SessionStatus,
    pub active_workflow: Option<String>,
    pub history: Vec<MessageView>,
}

/// Error body shape for every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Wraps [`EngineError`] so it can implement `axum`'s `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::NoMatchingWorkflow => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::MalformedWorkflow { .. } | EngineError::WorkflowNotFound(_) | EngineError::InvalidState(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            EngineError::InvalidDecision(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Llm(_) => StatusCode::BAD_GATEWAY,
            EngineError::Storage(_) | EngineError::Serialization(_) | EngineError::Io(_) | EngineError::Generic(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            EngineError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        create_session_handler,
        get_session_handler,
        delete_session_handler,
        send_message_handler,
    ),
    components(schemas(
        CreateSessionResponse,
        SendMessageRequest,
        SendMessageResponse,
        SessionView,
        MessageView,
        SessionStatus,
        ErrorResponse,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Troubleshooting session lifecycle and turns"),
    ),
    info(
        title = "DIY Troubleshooting Engine API",
        version = "0.1.0",
        description = "HTTP surface over the hierarchical troubleshooting-workflow engine.",
    )
)]
struct ApiDoc;

/// Builds the `axum` router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/sessions/{id}/messages", post(send_message_handler))
        .route("/api-docs/openapi.json", get(openapi_spec_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn openapi_spec_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Health check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is healthy"))
)]
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "version": crate::VERSION }))
}

/// Creates a new session.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    responses((status = 200, description = "Session created", body = CreateSessionResponse))
)]
async fn create_session_handler(State(state): State<AppState>) -> ApiResult<Json<CreateSessionResponse>> {
    let session = state.chat.create_session().await?;
    Ok(Json(CreateSessionResponse { session_id: session.session_id }))
}

/// Fetches a session's full view: history, active workflow, and status.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session view", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
async fn get_session_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<SessionView>> {
    let session = state.chat.get_session(&id).await?;

    let status = if session.is_terminal() { SessionStatus::Completed } else { SessionStatus::InProgress };
    let active_workflow = session.active_frame().map(|frame| frame.workflow_name.clone());
    let history = session
        .history
        .iter()
        .map(|message| MessageView { role: message.role, content: message.content.clone() })
        .collect();

    Ok(Json(SessionView { session_id: session.session_id, status, active_workflow, history }))
}

/// Deletes a session.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
async fn delete_session_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if state.chat.delete_session(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(EngineError::SessionNotFound(id).into())
    }
}

/// Sends a user message, advancing the session by exactly one turn.
///
/// Returns 422 when the session is a cold start and the router finds no
/// matching workflow (`EngineError::NoMatchingWorkflow`).
#[utoipa::path(
    post,
    path = "/sessions/{id}/messages",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Turn processed", body = SendMessageResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session already processing a message", body = ErrorResponse),
        (status = 422, description = "No matching workflow for a cold-start query", body = ErrorResponse),
    )
)]
async fn send_message_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    let result = state.chat.process_message(&id, &request.text).await?;

    if result.status == TurnStatus::Failed {
        return Err(EngineError::NoMatchingWorkflow.into());
    }

    Ok(Json(SendMessageResponse { reply: result.reply, status: result.status }))
}

/// Starts the HTTP server on `host:port`.
pub async fn start_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    info!(%addr, "starting troubleshooting engine API server");

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(EngineError::Io)?;

    info!(%addr, "API server listening");
    axum::serve(listener, app).await.map_err(EngineError::Io)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Decision, DecisionStatus};
    use crate::domain::{Step, StepOption, StepType, Workflow};
    use crate::llm::providers::FixedDecisionProvider;
    use crate::router::KeywordOverlapRouter;
    use crate::store::{InMemorySessionStore, StaticWorkflowStore};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn lukewarm_workflow() -> Workflow {
        Workflow::new("troubleshoot_lukewarm_water", "Fix Lukewarm Water", "step_01_thermostat")
            .with_step(
                Step::new("step_01_thermostat", StepType::AskChoice, "Determine thermostat setting").with_option(
                    StepOption { id: "was_low".into(), label: "Thermostat too low".into(), next_step_id: "end".into() },
                ),
            )
            .with_step(Step::new("end", StepType::End, "Issue resolved"))
    }

    fn test_state(decisions: Vec<Decision>) -> AppState {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let workflows: Arc<dyn WorkflowStore> = Arc::new(StaticWorkflowStore::new(vec![lukewarm_workflow()]));
        let provider = Arc::new(FixedDecisionProvider::new("fixed", decisions));
        let executor = StepExecutor::new(provider.clone(), 0.0);
        let narrator = TransitionNarrator::new(provider, 0.0);
        let engine = WorkflowEngine::new(workflows.clone(), executor, narrator);
        let router: Arc<dyn WorkflowRouter> = Arc::new(KeywordOverlapRouter::new(&[lukewarm_workflow()], 0.1));
        AppState { chat: Arc::new(ChatService::new(sessions, workflows, engine, router)) }
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let app = create_router(test_state(vec![]));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn session_lifecycle_create_message_get_delete() {
        let app = create_router(test_state(vec![Decision {
            reply_to_user: "Is the thermostat set too low?".into(),
            status: DecisionStatus::InProgress,
            result_value: None,
            reasoning: "awaiting user".into(),
        }]));

        let create_response = app
            .clone()
            .oneshot(Request::builder().method("POST").uri("/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(create_response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(create_response.into_body(), usize::MAX).await.unwrap();
        let created: CreateSessionResponse = serde_json::from_slice(&body).unwrap();

        let message_response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/sessions/{}/messages", created.session_id))
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&SendMessageRequest { text: "water is lukewarm".into() }).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(message_response.status(), StatusCode::OK);

        let get_response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/sessions/{}", created.session_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(get_response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(get_response.into_body(), usize::MAX).await.unwrap();
        let view: SessionView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.status, SessionStatus::InProgress);
        assert_eq!(view.active_workflow.as_deref(), Some("troubleshoot_lukewarm_water"));

        let delete_response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/sessions/{}", created.session_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(delete_response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn unknown_session_returns_404() {
        let app = create_router(test_state(vec![]));
        let response = app
            .oneshot(Request::builder().uri("/sessions/does-not-exist").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cold_start_miss_returns_422() {
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let workflows: Arc<dyn WorkflowStore> = Arc::new(StaticWorkflowStore::new(vec![lukewarm_workflow()]));
        let provider = Arc::new(FixedDecisionProvider::new("fixed", vec![]));
        let executor = StepExecutor::new(provider.clone(), 0.0);
        let narrator = TransitionNarrator::new(provider, 0.0);
        let engine = WorkflowEngine::new(workflows.clone(), executor, narrator);
        let router: Arc<dyn WorkflowRouter> = Arc::new(crate::router::FixedWorkflowRouter::never());
        let state = AppState { chat: Arc::new(ChatService::new(sessions, workflows, engine, router)) };
        let app = create_router(state);

        let create_response = app
            .clone()
            .oneshot(Request::builder().method("POST").uri("/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(create_response.into_body(), usize::MAX).await.unwrap();
        let created: CreateSessionResponse = serde_json::from_slice(&body).unwrap();

        let message_response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/sessions/{}/messages", created.session_id))
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&SendMessageRequest { text: "completely unrelated".into() }).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(message_response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
