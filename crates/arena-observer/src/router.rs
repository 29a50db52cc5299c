//! Axum router construction for the Arena API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for cross-origin dashboard access and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the Arena server.
///
/// See [`handlers`] for the endpoint table. CORS allows any origin for
/// development.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Deployments (SSE)
        .route("/api/deployments", post(handlers::create_deployment))
        // Action sets
        .route("/api/action-sets", get(handlers::list_action_sets))
        .route(
            "/api/action-sets/{game_type}",
            get(handlers::get_action_set).put(handlers::put_action_set),
        )
        // Worlds
        .route("/api/worlds/{world_id}", get(handlers::get_world))
        // Tools
        .route(
            "/api/agents/{agent_id}/tools",
            get(handlers::list_tools).post(handlers::register_tool),
        )
        .route("/api/tools/validate", post(handlers::validate_tool))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
