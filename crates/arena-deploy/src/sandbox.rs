//! Execution seam for custom tools that are not bound to a game action.
//!
//! Passing static validation does not make tool code safe to run in this
//! process. Unbound tools only ever run through a [`ToolSandbox`], and the
//! orchestrator wraps every call in a wall-clock timeout.

use std::future::Future;

use arena_tools::RegisteredTool;

use crate::error::SandboxError;

/// Runs validated tool code somewhere isolated.
pub trait ToolSandbox: Send + Sync {
    /// Run `tool` with `parameters` and return its output payload.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError`] when the tool cannot be run or fails.
    fn run(
        &self,
        tool: &RegisteredTool,
        parameters: &serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, SandboxError>> + Send;
}

/// The default sandbox: nothing is configured, so every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSandbox;

impl ToolSandbox for NoSandbox {
    async fn run(
        &self,
        tool: &RegisteredTool,
        _parameters: &serde_json::Value,
    ) -> Result<serde_json::Value, SandboxError> {
        Err(SandboxError::Unavailable(tool.name().to_owned()))
    }
}

/// A game action requested by a tool's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedAction {
    /// Action to execute.
    pub action_id: String,
    /// Its parameters (an empty object when omitted).
    pub parameters: serde_json::Value,
}

/// The `action` object of a tool output, if it has a usable one.
pub fn requested_action(output: &serde_json::Value) -> Option<RequestedAction> {
    let action = output.get("action")?;
    let action_id = action.get("action_id")?.as_str()?;
    Some(RequestedAction {
        action_id: action_id.to_owned(),
        parameters: action
            .get("parameters")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({})),
    })
}
