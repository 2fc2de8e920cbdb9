//! Error handling for the troubleshooting engine

use thiserror::Error;

/// Result type alias used throughout the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for the workflow engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("No matching workflow found for query")]
    NoMatchingWorkflow,

    #[error("Malformed workflow '{workflow}': {reason}")]
    MalformedWorkflow { workflow: String, reason: String },

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Invalid decision from LLM: {0}")]
    InvalidDecision(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Concurrent turn rejected: session {0} is already processing a message")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

/// Errors related to language model transport and parsing
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unauthorized: check the configured API key")]
    Unauthorized,

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Provider server error: {0}")]
    ServerError(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Response did not match the expected Decision schema: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EngineError::Llm(LlmError::Timeout)
        } else {
            EngineError::Llm(LlmError::ConnectionFailed(err.to_string()))
        }
    }
}

impl EngineError {
    /// Whether retrying the same operation might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Llm(LlmError::Timeout)
                | EngineError::Llm(LlmError::ConnectionFailed(_))
                | EngineError::Llm(LlmError::RateLimited)
                | EngineError::Llm(LlmError::ServerError(_))
        )
    }

    /// Coarse category, useful for logging/metrics grouping.
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::SessionNotFound(_) => "session_not_found",
            EngineError::NoMatchingWorkflow => "no_matching_workflow",
            EngineError::MalformedWorkflow { .. } => "malformed_workflow",
            EngineError::WorkflowNotFound(_) => "workflow_not_found",
            EngineError::InvalidState(_) => "invalid_state",
            EngineError::InvalidDecision(_) => "invalid_decision",
            EngineError::Llm(_) => "llm",
            EngineError::Conflict(_) => "conflict",
            EngineError::Storage(_) => "storage",
            EngineError::Serialization(_) => "serialization",
            EngineError::Config(_) => "config",
            EngineError::Io(_) => "io",
            EngineError::Generic(_) => "generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let timeout_error = EngineError::Llm(LlmError::Timeout);
        assert!(timeout_error.is_retryable());

        let config_error = EngineError::Config("invalid config".to_string());
        assert!(!config_error.is_retryable());
    }

    #[test]
    fn test_error_category() {
        let llm_error = EngineError::Llm(LlmError::Timeout);
        assert_eq!(llm_error.category(), "llm");

        let not_found = EngineError::SessionNotFound("abc".to_string());
        assert_eq!(not_found.category(), "session_not_found");
    }
}
