//! Error types for the arena-tools crate.

use arena_types::AgentId;

use crate::safety::Violation;

/// Errors from tool registration and lookup.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool source failed static validation. Nothing was registered.
    #[error("tool {tool_name} rejected: {violation}")]
    Rejected {
        /// The tool that was submitted.
        tool_name: String,
        /// Why it was rejected.
        #[source]
        violation: Violation,
    },

    /// The agent is not enrolled in the tool catalog.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),
}
