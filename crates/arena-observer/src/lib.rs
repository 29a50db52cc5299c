//! HTTP API server for Arena.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Deployment streams** (`POST /api/deployments`): one agent session per
//!   request, its events streamed back as server-sent events
//! - **Action set endpoints** for listing, reading, and replacing the
//!   action set of a game type
//! - **Tool endpoints** for registering an agent's custom tools and
//!   dry-running the static validator
//! - **World snapshots** read from the world store
//!
//! # Architecture
//!
//! Every handler shares one [`AppState`] holding the
//! [`DeploymentOrchestrator`](arena_deploy::DeploymentOrchestrator). Each
//! deployment runs on its own task; the HTTP layer only drains the
//! session's bounded event channel. Closing the stream cancels the session.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod sse;
pub mod state;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use sse::{encode_frame, event_stream, to_sse_event};
pub use state::AppState;
