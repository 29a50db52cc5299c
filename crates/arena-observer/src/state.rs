//! Shared application state for the Arena API server.
//!
//! [`AppState`] is wrapped in `Arc` and handed to every handler. The
//! registries and the world store live inside the orchestrator and are
//! reached through its accessors, so the HTTP layer and running sessions
//! always see the same instances.

use std::sync::Arc;

use arena_actions::{ActionSetRegistry, ExecutorRegistry};
use arena_deploy::{ArenaConfig, DeploymentOrchestrator, InMemoryWorldStore, ModelSource};
use arena_tools::ToolCatalog;
use tracing::info;

/// Shared state for all handlers.
#[derive(Debug)]
pub struct AppState {
    /// Runs deployment sessions and owns the registries and world store.
    pub orchestrator: Arc<DeploymentOrchestrator>,
    /// Builds the model each new session talks to.
    pub models: ModelSource,
}

impl AppState {
    /// State around an existing orchestrator.
    pub const fn new(orchestrator: Arc<DeploymentOrchestrator>, models: ModelSource) -> Self {
        Self {
            orchestrator,
            models,
        }
    }

    /// Build registries and the world store from `config`: built-in action
    /// sets and executors, every seed world, and every enrolled agent.
    pub fn from_config(config: &ArenaConfig, models: ModelSource) -> Self {
        let store = InMemoryWorldStore::new();
        for seed in &config.worlds {
            let world = seed.build();
            info!(
                world_id = %world.world_id,
                game_type = %world.game_type,
                width = world.width,
                height = world.height,
                "Seeded world"
            );
            store.insert(world);
        }

        let catalog = ToolCatalog::default();
        for agent_id in &config.agents {
            catalog.enroll(*agent_id);
        }
        info!(agents = config.agents.len(), "Enrolled agents");

        let orchestrator = DeploymentOrchestrator::new(
            Arc::new(ActionSetRegistry::with_builtins()),
            Arc::new(ExecutorRegistry::with_builtins()),
            Arc::new(catalog),
            Arc::new(store),
            config.deployment,
        );
        Self::new(Arc::new(orchestrator), models)
    }
}
