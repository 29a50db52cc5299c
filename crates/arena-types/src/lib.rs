//! Shared type definitions for the Arena agent deployment system.
//!
//! Every crate in the workspace builds on these types. Wire-facing types
//! derive `ts-rs` so the dashboard client gets matching `TypeScript`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents, worlds, and sessions
//! - [`schema`] -- Declarative action schemas and action sets
//! - [`world`] -- Grid world state
//! - [`delta`] -- State deltas and the closed set of delta keys
//! - [`actions`] -- The outcome of one action
//! - [`tools`] -- Custom tool source
//! - [`events`] -- The deployment event protocol

pub mod actions;
pub mod delta;
pub mod events;
pub mod ids;
pub mod schema;
pub mod tools;
pub mod world;

// Re-export all public types at crate root for convenience.
pub use actions::{ActionErrorKind, ActionResult};
pub use delta::{DeltaKey, StateDelta};
pub use events::{
    CompleteData, CompletionStatus, DeploymentEvent, ErrorData, ErrorType, EventPayload,
    ProgressData, ReasoningData, ToolCallData, ToolResultData,
};
pub use ids::{AgentId, SessionId, WorldId};
pub use schema::{ActionParameter, ActionSchema, ActionSet, ParamType, json_type_name};
pub use tools::ToolCode;
pub use world::{Position, Tile, WorldState};
