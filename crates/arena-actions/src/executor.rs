//! Game executors and the registry that builds them.
//!
//! Executors form a closed set of kinds ([`GameExecutor`]), selected by game
//! type through an [`ExecutorRegistry`] of constructors.

use std::collections::BTreeMap;

use arena_types::{ActionResult, WorldState};
use serde_json::{Map, Value};

use crate::builtin::GRID_NAVIGATION;
use crate::grid::GridNavigation;

/// Computes the effect of an action on a world snapshot.
///
/// Implementations are stateless and must not mutate `world`.
pub trait ActionExecutor {
    /// Whether `action_id` has an implementation.
    fn supports(&self, action_id: &str) -> bool;

    /// Execute an action whose parameters already passed validation.
    fn execute(
        &self,
        action_id: &str,
        params: &Map<String, Value>,
        world: &WorldState,
    ) -> ActionResult;
}

/// Every executor kind the engine can run.
#[derive(Debug, Clone, Copy)]
pub enum GameExecutor {
    /// The `grid_navigation` game.
    GridNavigation(GridNavigation),
}

impl ActionExecutor for GameExecutor {
    fn supports(&self, action_id: &str) -> bool {
        match self {
            Self::GridNavigation(e) => e.supports(action_id),
        }
    }

    fn execute(
        &self,
        action_id: &str,
        params: &Map<String, Value>,
        world: &WorldState,
    ) -> ActionResult {
        match self {
            Self::GridNavigation(e) => e.execute(action_id, params, world),
        }
    }
}

/// Builds a fresh executor.
pub type ExecutorConstructor = fn() -> GameExecutor;

/// Maps game types to executor constructors.
#[derive(Debug, Clone, Default)]
pub struct ExecutorRegistry {
    constructors: BTreeMap<String, ExecutorConstructor>,
}

impl ExecutorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in executor.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(GRID_NAVIGATION, || {
            GameExecutor::GridNavigation(GridNavigation)
        });
        registry
    }

    /// Register (or replace) the constructor for `game_type`.
    pub fn register(&mut self, game_type: &str, constructor: ExecutorConstructor) {
        self.constructors.insert(game_type.to_owned(), constructor);
    }

    /// Build the executor for `game_type`, if one is registered.
    pub fn create(&self, game_type: &str) -> Option<GameExecutor> {
        self.constructors.get(game_type).map(|build| build())
    }

    /// Game types with an executor, sorted.
    pub fn game_types(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}
