//! Error types for the deployment crate.
//!
//! [`StoreError`], [`ModelError`], and [`SandboxError`] come from the three
//! collaborators the orchestrator drives. [`DeployError`] is what a session
//! ends with when something fatal happens; the orchestrator turns each
//! variant into a final `error` event.

use arena_actions::ActionError;
use arena_tools::ToolError;
use arena_types::{ErrorType, WorldId};

/// Errors raised by a world store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No world with this ID exists.
    #[error("world not found: {0}")]
    WorldNotFound(WorldId),

    /// A delta could not be merged into the world.
    #[error("cannot merge delta key {key}: {reason}")]
    InvalidDelta {
        /// The offending delta key.
        key: &'static str,
        /// What was wrong with its value.
        reason: String,
    },
}

/// Errors raised by a model stream for one turn. Retried by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The request never produced a usable HTTP response.
    #[error("model transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("model backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The response could not be decoded into a turn.
    #[error("model response decode error: {0}")]
    Decode(String),
}

/// Errors raised while running a sandboxed tool.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// No sandbox is configured to run tool code.
    #[error("no sandbox is configured to run tool {0}")]
    Unavailable(String),

    /// The tool ran and failed.
    #[error("tool {tool_name} failed: {message}")]
    Failed {
        /// The tool that failed.
        tool_name: String,
        /// Failure description.
        message: String,
    },
}

/// Fatal session errors.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The requested world does not exist.
    #[error("world not found: {0}")]
    WorldNotFound(WorldId),

    /// The agent is not enrolled, or its tools could not be loaded.
    #[error(transparent)]
    Tools(#[from] ToolError),

    /// No engine could be built for the world's game type.
    #[error(transparent)]
    GameType(#[from] ActionError),

    /// The world store failed.
    #[error(transparent)]
    Store(StoreError),

    /// The model failed on every attempt of a turn.
    #[error("model failed after {attempts} attempts: {source}")]
    ModelFailure {
        /// Attempts made for the turn.
        attempts: u32,
        /// The last failure.
        source: ModelError,
    },
}

impl From<StoreError> for DeployError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WorldNotFound(id) => Self::WorldNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl DeployError {
    /// The `error_type` reported on the wire.
    pub const fn error_type(&self) -> ErrorType {
        match self {
            Self::WorldNotFound(_) => ErrorType::WorldNotFound,
            Self::Tools(_) => ErrorType::AgentNotFound,
            Self::GameType(_) => ErrorType::UnknownGameType,
            Self::Store(_) => ErrorType::StoreError,
            Self::ModelFailure { .. } => ErrorType::ModelFailure,
        }
    }
}
