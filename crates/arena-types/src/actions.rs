//! The result of executing (or refusing) an action.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::delta::StateDelta;

/// Why an action was not executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionErrorKind {
    /// The action ID is not in the bound action set.
    UnknownAction,
    /// A parameter was missing, mistyped, or out of range.
    InvalidParameters,
    /// The action is declared but the game executor has no implementation.
    NotImplemented,
}

impl ActionErrorKind {
    /// Wire name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownAction => "unknown_action",
            Self::InvalidParameters => "invalid_parameters",
            Self::NotImplemented => "not_implemented",
        }
    }
}

/// Outcome of one action.
///
/// Fields are private so the invariant holds by construction: a failed
/// result always carries an empty delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionResult {
    success: bool,
    state_delta: StateDelta,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    error_kind: Option<ActionErrorKind>,
}

impl ActionResult {
    /// A successful action. `delta` may be empty (e.g. a move into a wall).
    pub fn succeeded(message: impl Into<String>, delta: StateDelta) -> Self {
        Self {
            success: true,
            state_delta: delta,
            message: message.into(),
            error: None,
            error_kind: None,
        }
    }

    /// A refused action. The delta is always empty.
    pub fn failed(kind: ActionErrorKind, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            state_delta: StateDelta::new(),
            message: error.clone(),
            error: Some(error),
            error_kind: Some(kind),
        }
    }

    /// Whether the action executed.
    pub const fn success(&self) -> bool {
        self.success
    }

    /// The changed fields (empty on failure).
    pub const fn state_delta(&self) -> &StateDelta {
        &self.state_delta
    }

    /// Consume the result, returning its delta.
    pub fn into_delta(self) -> StateDelta {
        self.state_delta
    }

    /// Human-readable summary.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Error description on failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Failure classification.
    pub const fn error_kind(&self) -> Option<ActionErrorKind> {
        self.error_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::DeltaKey;

    #[test]
    fn failed_result_has_empty_delta() {
        let result = ActionResult::failed(ActionErrorKind::UnknownAction, "unknown action: fly");
        assert!(!result.success());
        assert!(result.state_delta().is_empty());
        assert_eq!(result.error(), Some("unknown action: fly"));
        assert_eq!(result.error_kind(), Some(ActionErrorKind::UnknownAction));
    }

    #[test]
    fn success_serializes_without_error_fields() {
        let delta = StateDelta::new().with(DeltaKey::TurnsWaited, 1);
        let result = ActionResult::succeeded("waited 1 turn", delta);
        let json = serde_json::to_value(&result).unwrap_or_default();
        assert_eq!(json["success"], true);
        assert_eq!(json["state_delta"]["turns_waited"], 1);
        assert!(json.get("error").is_none());
    }
}
