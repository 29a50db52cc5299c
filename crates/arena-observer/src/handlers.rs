//! REST and SSE endpoint handlers for the Arena API.
//!
//! Handlers reach the registries and world store through the orchestrator
//! held in [`AppState`], so a registration made here is visible to the next
//! deployment session.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness |
//! | `POST` | `/api/deployments` | Start a session, stream its events (SSE) |
//! | `GET` | `/api/action-sets` | List game types |
//! | `GET` | `/api/action-sets/{game_type}` | One action set |
//! | `PUT` | `/api/action-sets/{game_type}` | Replace an action set |
//! | `GET` | `/api/worlds/{world_id}` | World snapshot |
//! | `GET` | `/api/agents/{agent_id}/tools` | An agent's tools |
//! | `POST` | `/api/agents/{agent_id}/tools` | Validate and register a tool |
//! | `POST` | `/api/tools/validate` | Dry-run validation |

use std::sync::Arc;

use arena_deploy::{DeploymentRequest, WorldStore};
use arena_tools::RegisteredTool;
use arena_types::{ActionSet, AgentId, ToolCode, WorldId};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{KeepAlive, Sse};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::ObserverError;
use crate::sse::event_stream;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness check.
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ---------------------------------------------------------------------------
// POST /api/deployments
// ---------------------------------------------------------------------------

/// Start a deployment session and stream its events.
///
/// The response is always an event stream: configuration problems such as
/// an unknown world arrive as a single fatal `error` event. Closing the
/// connection cancels the session.
pub async fn create_deployment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeploymentRequest>,
) -> impl IntoResponse {
    let model = state.models.create();
    let model_name = model.name();
    let handle = state.orchestrator.spawn(request, model);
    info!(
        session_id = %handle.session_id,
        model = model_name,
        "Deployment stream opened"
    );
    let guard = handle.cancel.drop_guard();
    Sse::new(event_stream(handle.events, guard)).keep_alive(KeepAlive::default())
}

// ---------------------------------------------------------------------------
// Action sets
// ---------------------------------------------------------------------------

/// List registered game types.
pub async fn list_action_sets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let game_types = state.orchestrator.action_sets().list_game_types();
    Json(json!({
        "count": game_types.len(),
        "game_types": game_types,
    }))
}

/// Get one action set.
pub async fn get_action_set(
    State(state): State<Arc<AppState>>,
    Path(game_type): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let set = state.orchestrator.action_sets().get_action_set(&game_type)?;
    Ok(Json(ActionSet::clone(&set)))
}

/// Replace the action set for a game type.
///
/// The whole set is swapped; there is no partial merge.
pub async fn put_action_set(
    State(state): State<Arc<AppState>>,
    Path(game_type): Path<String>,
    Json(set): Json<ActionSet>,
) -> Result<impl IntoResponse, ObserverError> {
    let actions = set.actions.len();
    state
        .orchestrator
        .action_sets()
        .register_action_set(&game_type, set)?;
    Ok(Json(json!({
        "game_type": game_type,
        "actions": actions,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/worlds/{world_id}
// ---------------------------------------------------------------------------

/// Current snapshot of a world.
pub async fn get_world(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let world_id = WorldId::from(parse_uuid(&id_str)?);
    let world = state.orchestrator.store().snapshot(world_id).await?;
    Ok(Json(world))
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// List an agent's registered tools.
pub async fn list_tools(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let agent_id = AgentId::from(parse_uuid(&id_str)?);
    let registry = state.orchestrator.catalog().registry(agent_id)?;
    let tools: Vec<serde_json::Value> = registry.tools().iter().map(tool_json).collect();
    Ok(Json(json!({
        "agent_id": agent_id,
        "count": tools.len(),
        "tools": tools,
    })))
}

/// Validate and register a tool for an agent.
///
/// Returns 201 with the registered tool, or 422 with the violation. A
/// rejected tool leaves the registry unchanged.
pub async fn register_tool(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(code): Json<ToolCode>,
) -> Result<impl IntoResponse, ObserverError> {
    let agent_id = AgentId::from(parse_uuid(&id_str)?);
    let registry = state.orchestrator.catalog().registry(agent_id)?;
    let tool = registry.register(code)?;
    Ok((StatusCode::CREATED, Json(tool_json(&tool))))
}

/// Validate tool source without registering it.
///
/// Always 200; `valid` says whether the tool would be accepted.
pub async fn validate_tool(
    State(state): State<Arc<AppState>>,
    Json(code): Json<ToolCode>,
) -> impl IntoResponse {
    match state
        .orchestrator
        .catalog()
        .validator()
        .validate(&code.code, &code.tool_name)
    {
        Ok(report) => Json(json!({
            "tool_name": code.tool_name,
            "valid": true,
            "report": report,
        })),
        Err(violation) => Json(json!({
            "tool_name": code.tool_name,
            "valid": false,
            "violation": violation,
        })),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn tool_json(tool: &Arc<RegisteredTool>) -> serde_json::Value {
    json!({
        "tool_name": tool.name(),
        "description": tool.description(),
        "binding": tool.binding(),
        "advisories": tool.report.advisories,
    })
}

/// Parse a UUID string, returning an [`ObserverError::InvalidUuid`] on failure.
fn parse_uuid(s: &str) -> Result<Uuid, ObserverError> {
    s.parse::<Uuid>()
        .map_err(|e| ObserverError::InvalidUuid(format!("{s}: {e}")))
}
