//! Custom tool source submitted for registration.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A generated tool: Python source plus metadata.
///
/// Only instances that pass static validation enter a tool registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ToolCode {
    /// Name the model calls the tool by. Must match the function name.
    pub tool_name: String,
    /// Python source text.
    pub code: String,
    /// Why the tool exists (shown to the model as its description).
    #[serde(default)]
    pub explanation: String,
    /// Game action this tool drives, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub action_id: Option<String>,
}
