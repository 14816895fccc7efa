// SPDX-License-Identifier: MIT

//! Typed error handling for refinery-rs
//!
//! Every fallible operation in the library returns [`RefineryError`].
//! Provider and workflow failures get their own enums so callers can
//! match on the failure class without string inspection.

use thiserror::Error;

/// Top-level error type for refinery-rs
#[derive(Debug, Error)]
pub enum RefineryError {
    /// API errors from model providers (Gemini, Groq, OpenAI, Anthropic)
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Configuration errors (missing env vars, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model/LLM-specific errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Workflow-specific errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Workflow-specific errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Run configuration rejected at construction time
    #[error("Invalid workflow configuration: {0}")]
    InvalidConfig(String),

    /// A node's agent call failed; the run is over
    #[error("Node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: Box<RefineryError>,
    },

    /// `step` was called on an execution that already finalized or failed
    #[error("Workflow execution has already finished")]
    AlreadyFinished,
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Model identifier not recognised
    #[error("Unknown model identifier: {0}")]
    UnknownModel(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Model replied with no text at all
    #[error("Empty response from agent '{0}'")]
    EmptyResponse(String),

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl RefineryError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid-response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Model(ModelError::InvalidResponse(message.into()))
    }

    /// Whether this error was raised before any node ran
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Yaml(_)
                | Self::Model(ModelError::ApiKeyMissing(_))
                | Self::Model(ModelError::UnknownModel(_))
                | Self::Workflow(WorkflowError::InvalidConfig(_))
        )
    }
}

impl WorkflowError {
    /// Wrap a node's failure
    pub fn node_failed(node: impl Into<String>, source: RefineryError) -> Self {
        Self::NodeFailed {
            node: node.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = RefineryError::api("Gemini", "quota exceeded");
        assert_eq!(err.to_string(), "API error from Gemini: quota exceeded");
    }

    #[test]
    fn test_node_failed_display_includes_source() {
        let err = WorkflowError::node_failed(
            "review",
            RefineryError::Model(ModelError::EmptyResponse("Reviewer".to_string())),
        );
        assert_eq!(
            err.to_string(),
            "Node 'review' failed: Model error: Empty response from agent 'Reviewer'"
        );
    }

    #[test]
    fn test_config_error_classification() {
        assert!(RefineryError::config("bad").is_config_error());
        assert!(
            RefineryError::Model(ModelError::UnknownModel("llama".to_string())).is_config_error()
        );
        assert!(
            RefineryError::Workflow(WorkflowError::InvalidConfig("x".to_string()))
                .is_config_error()
        );
        assert!(!RefineryError::api("Groq", "500").is_config_error());
        assert!(!RefineryError::Workflow(WorkflowError::AlreadyFinished).is_config_error());
    }
}
