//! Error types for medisurge-runtime.
//!
//! Nothing here is process-fatal: provider and agent errors are recovered
//! inside the loop, and log-write errors degrade to the fallback buffer.

use medisurge_types::{AgentName, FailureKind};
use thiserror::Error;

/// Errors returned by external collaborators (surveillance, prediction,
/// response agents).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Upstream data source or service is unreachable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The collaborator rejected its input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Result could not be serialized into a payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for collaborator calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by the orchestration core.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Surveillance or prediction call failed.
    #[error("{provider} unavailable: {source}")]
    ProviderUnavailable {
        provider: &'static str,
        #[source]
        source: ProviderError,
    },

    /// A single response agent failed or timed out.
    #[error("agent {agent} failed ({kind}): {reason}")]
    AgentFailure {
        agent: AgentName,
        kind: FailureKind,
        reason: String,
    },

    /// Activity log store could not be written.
    #[error("activity log degraded: {0}")]
    LogWriteDegraded(#[from] ActivityError),

    /// The monitoring loop is already running.
    #[error("monitoring loop already running")]
    AlreadyRunning,

    /// The response roster is not exactly one agent per name.
    #[error("invalid response roster: {0}")]
    InvalidRoster(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for orchestration operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Errors raised by activity log stores.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store is temporarily unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for activity store operations.
pub type ActivityResult<T> = Result<T, ActivityError>;
