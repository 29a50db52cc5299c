//! Error types for the Arena API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use arena_actions::ActionError;
use arena_deploy::StoreError;
use arena_tools::{ToolError, Violation};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body or path was well-formed but not acceptable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// Submitted tool source failed static validation.
    #[error("tool {tool_name} rejected: {violation}")]
    ToolRejected {
        /// The submitted tool.
        tool_name: String,
        /// The first violation found.
        violation: Violation,
    },

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ActionError> for ObserverError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::UnknownGameType(_) | ActionError::ExecutorMissing(_) => {
                Self::NotFound(err.to_string())
            }
            ActionError::DuplicateActionId { .. } | ActionError::GameTypeMismatch { .. } => {
                Self::InvalidRequest(err.to_string())
            }
        }
    }
}

impl From<ToolError> for ObserverError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Rejected {
                tool_name,
                violation,
            } => Self::ToolRejected {
                tool_name,
                violation,
            },
            ToolError::AgentNotFound(_) => Self::NotFound(err.to_string()),
        }
    }
}

impl From<StoreError> for ObserverError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WorldNotFound(_) => Self::NotFound(err.to_string()),
            StoreError::InvalidDelta { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidRequest(msg) | Self::InvalidUuid(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::ToolRejected { .. } => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let mut body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });
        if let Self::ToolRejected { violation, .. } = &self
            && let Some(fields) = body.as_object_mut()
        {
            fields.insert(
                "violation".to_owned(),
                serde_json::to_value(violation).unwrap_or_default(),
            );
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use arena_types::WorldId;

    use super::*;

    #[test]
    fn configuration_lookups_map_to_not_found() {
        let err = ObserverError::from(ActionError::UnknownGameType("chess".to_owned()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = ObserverError::from(StoreError::WorldNotFound(WorldId::new()));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn bad_action_sets_are_client_errors() {
        let err = ObserverError::from(ActionError::GameTypeMismatch {
            expected: "a".to_owned(),
            found: "b".to_owned(),
        });
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn every_variant_renders_a_json_body() {
        let violation = arena_tools::ToolSafetyValidator::new()
            .validate("import os\n", "t")
            .unwrap_err();
        let cases = [
            (ObserverError::NotFound("x".to_owned()), 404),
            (ObserverError::InvalidRequest("x".to_owned()), 400),
            (ObserverError::InvalidUuid("x".to_owned()), 400),
            (
                ObserverError::ToolRejected {
                    tool_name: "t".to_owned(),
                    violation,
                },
                422,
            ),
            (ObserverError::Internal("x".to_owned()), 500),
        ];
        for (err, status) in cases {
            let resp = err.into_response();
            assert_eq!(resp.status().as_u16(), status);
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["status"], status);
            assert_eq!(body.get("violation").is_some(), status == 422);
        }
    }
}
