//! The deployment event protocol.
//!
//! One session produces a strictly ordered sequence of [`DeploymentEvent`]s.
//! On the wire each event becomes one SSE frame whose `event:` line is
//! [`EventPayload::kind`] and whose `data:` line is [`EventPayload::data`].
//! A `complete` event or a non-recoverable `error` is always the last one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::delta::StateDelta;

/// Machine-readable error classification carried by `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ErrorType {
    /// The requested world does not exist.
    WorldNotFound,
    /// The requested agent is not enrolled.
    AgentNotFound,
    /// No action set or executor exists for the world's game type.
    UnknownGameType,
    /// The model kept failing after every retry.
    ModelFailure,
    /// The world store failed while merging a delta.
    StoreError,
    /// The model called a tool nobody registered.
    UnknownTool,
    /// Action parameters failed validation.
    InvalidParameters,
    /// The action is not part of the bound action set.
    UnknownAction,
    /// The action is declared but the executor has no implementation.
    NotImplemented,
    /// A sandboxed tool failed or timed out.
    ToolExecutionFailed,
    /// The model reported an error of its own.
    ModelReported,
    /// One model call failed; it will be retried.
    ModelError,
}

impl ErrorType {
    /// Whether this error ends the session.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::WorldNotFound
                | Self::AgentNotFound
                | Self::UnknownGameType
                | Self::ModelFailure
                | Self::StoreError
        )
    }

    /// Wire name of the error type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorldNotFound => "world_not_found",
            Self::AgentNotFound => "agent_not_found",
            Self::UnknownGameType => "unknown_game_type",
            Self::ModelFailure => "model_failure",
            Self::StoreError => "store_error",
            Self::UnknownTool => "unknown_tool",
            Self::InvalidParameters => "invalid_parameters",
            Self::UnknownAction => "unknown_action",
            Self::NotImplemented => "not_implemented",
            Self::ToolExecutionFailed => "tool_execution_failed",
            Self::ModelReported => "model_reported",
            Self::ModelError => "model_error",
        }
    }
}

impl core::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CompletionStatus {
    /// The model stopped and reported the goal reached.
    Success,
    /// The loop ended otherwise after at least one successful tool use.
    Partial,
    /// Nothing useful happened.
    Failed,
}

/// Payload of a `progress` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProgressData {
    /// Human-readable status line.
    pub message: String,
    /// Current turn number (0 while loading).
    pub turn: u32,
}

/// Payload of a `reasoning` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReasoningData {
    /// The model's free-text reasoning.
    pub text: String,
    /// When the reasoning was received.
    pub timestamp: DateTime<Utc>,
}

/// Payload of a `tool_call` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ToolCallData {
    /// Tool the model invoked.
    pub tool_name: String,
    /// Arguments as the model sent them.
    pub parameters: serde_json::Value,
}

/// Payload of a `tool_result` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ToolResultData {
    /// Tool that produced the result.
    pub tool_name: String,
    /// Raw output: an action result or the sandbox's return value.
    pub result: serde_json::Value,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ErrorData {
    /// Classification.
    pub error_type: ErrorType,
    /// Human-readable description.
    pub message: String,
    /// `false` means this is the last event of the session.
    pub recoverable: bool,
}

impl ErrorData {
    /// Build an error payload; recoverability follows the error type.
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            recoverable: !error_type.is_fatal(),
        }
    }
}

/// Payload of a `complete` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CompleteData {
    /// Final status.
    pub status: CompletionStatus,
    /// Model turns completed.
    pub total_steps: u32,
    /// Tool invocations made.
    pub total_tools_used: u32,
}

/// The tagged union of event bodies.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventPayload {
    /// Phase or turn progress.
    Progress(ProgressData),
    /// Model reasoning text.
    Reasoning(ReasoningData),
    /// A tool invocation, before resolution.
    ToolCall(ToolCallData),
    /// Raw output of a resolved tool call.
    ToolResult(ToolResultData),
    /// Exactly the delta merged into the world.
    WorldUpdate(StateDelta),
    /// A recoverable or fatal error.
    Error(ErrorData),
    /// Session summary; always last.
    Complete(CompleteData),
}

impl EventPayload {
    /// The SSE event name.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Reasoning(_) => "reasoning",
            Self::ToolCall(_) => "tool_call",
            Self::ToolResult(_) => "tool_result",
            Self::WorldUpdate(_) => "world_update",
            Self::Error(_) => "error",
            Self::Complete(_) => "complete",
        }
    }

    /// Whether no event may follow this one.
    pub const fn is_terminal(&self) -> bool {
        match self {
            Self::Complete(_) => true,
            Self::Error(e) => !e.recoverable,
            _ => false,
        }
    }

    /// The SSE `data:` body.
    pub fn data(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Progress(d) => serde_json::to_value(d),
            Self::Reasoning(d) => serde_json::to_value(d),
            Self::ToolCall(d) => serde_json::to_value(d),
            Self::ToolResult(d) => serde_json::to_value(d),
            Self::WorldUpdate(d) => serde_json::to_value(d),
            Self::Error(d) => serde_json::to_value(d),
            Self::Complete(d) => serde_json::to_value(d),
        }
    }
}

/// One event in a session's stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentEvent {
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// Event type and body.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl DeploymentEvent {
    /// Stamp `payload` with the current time.
    pub fn now(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }

    /// A `progress` event.
    pub fn progress(message: impl Into<String>, turn: u32) -> Self {
        Self::now(EventPayload::Progress(ProgressData {
            message: message.into(),
            turn,
        }))
    }

    /// A `reasoning` event.
    pub fn reasoning(text: impl Into<String>) -> Self {
        let timestamp = Utc::now();
        Self {
            timestamp,
            payload: EventPayload::Reasoning(ReasoningData {
                text: text.into(),
                timestamp,
            }),
        }
    }

    /// A `tool_call` event.
    pub fn tool_call(tool_name: &str, parameters: serde_json::Value) -> Self {
        Self::now(EventPayload::ToolCall(ToolCallData {
            tool_name: tool_name.to_owned(),
            parameters,
        }))
    }

    /// A `tool_result` event.
    pub fn tool_result(tool_name: &str, result: serde_json::Value) -> Self {
        Self::now(EventPayload::ToolResult(ToolResultData {
            tool_name: tool_name.to_owned(),
            result,
        }))
    }

    /// A `world_update` event carrying exactly `delta`.
    pub fn world_update(delta: StateDelta) -> Self {
        Self::now(EventPayload::WorldUpdate(delta))
    }

    /// An `error` event.
    pub fn error(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self::now(EventPayload::Error(ErrorData::new(error_type, message)))
    }

    /// A `complete` event.
    pub fn complete(status: CompletionStatus, total_steps: u32, total_tools_used: u32) -> Self {
        Self::now(EventPayload::Complete(CompleteData {
            status,
            total_steps,
            total_tools_used,
        }))
    }

    /// Shorthand for [`EventPayload::kind`].
    pub const fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Shorthand for [`EventPayload::is_terminal`].
    pub const fn is_terminal(&self) -> bool {
        self.payload.is_terminal()
    }
}
