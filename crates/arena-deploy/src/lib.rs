//! The agent deployment loop for Arena.
//!
//! A [`DeploymentOrchestrator`] drives a tool-calling model turn by turn
//! through a grid world. Proposed actions are validated and executed by an
//! [`ActionEngine`](arena_actions::ActionEngine) inside the world store's
//! critical section, and every step is reported as a
//! [`DeploymentEvent`](arena_types::DeploymentEvent) through an
//! [`EventSink`].
//!
//! # Modules
//!
//! - [`config`] -- `arena-config.yaml` and LLM backend settings
//! - [`error`] -- Store, model, sandbox, and session errors
//! - [`world`] -- The world store trait and in-memory store
//! - [`model`] -- The model seam, scripted model, and runtime selection
//! - [`llm`] -- OpenAI-compatible tool-calling backend
//! - [`sandbox`] -- Execution seam for unbound custom tools
//! - [`sink`] -- Per-session bounded event channel
//! - [`orchestrator`] -- The session state machine and turn loop

pub mod config;
pub mod error;
pub mod llm;
pub mod model;
pub mod orchestrator;
pub mod sandbox;
pub mod sink;
pub mod world;

pub use config::{
    ArenaConfig, ConfigError, DeploymentConfig, ItemSeed, LlmBackendConfig, ServerConfig,
    WorldSeed,
};
pub use error::{DeployError, ModelError, SandboxError, StoreError};
pub use llm::OpenAiToolModel;
pub use model::{
    AgentModel, ContextLog, ModelSource, ModelStream, ModelTurn, Observation, ScriptedModel,
    StopSignal, ToolInvocation, ToolSpec, TurnContext, TurnItem,
};
pub use orchestrator::{
    DeploymentHandle, DeploymentOrchestrator, DeploymentRequest, SessionOutcome, SessionPhase,
    SessionStats,
};
pub use sandbox::{NoSandbox, RequestedAction, ToolSandbox};
pub use sink::{EventSink, SinkError};
pub use world::{InMemoryWorldStore, WorldStore};
