//! The action engine: validate, then execute against a snapshot.

use std::sync::Arc;

use arena_types::{ActionErrorKind, ActionResult, ActionSet, WorldState};
use tracing::debug;

use crate::error::ActionError;
use crate::executor::{ActionExecutor, ExecutorRegistry, GameExecutor};
use crate::registry::ActionSetRegistry;
use crate::validation::resolve_parameters;

/// Validates and executes actions for one game type.
///
/// The engine holds an immutable action set and a stateless executor, so it
/// can be shared and called concurrently. It never mutates world state;
/// callers merge the returned delta.
#[derive(Debug, Clone)]
pub struct ActionEngine {
    action_set: Arc<ActionSet>,
    executor: GameExecutor,
}

impl ActionEngine {
    /// Bind an engine to an action set and executor.
    pub const fn new(action_set: Arc<ActionSet>, executor: GameExecutor) -> Self {
        Self { action_set, executor }
    }

    /// Build the engine for `game_type` from the registries.
    ///
    /// # Errors
    ///
    /// [`ActionError::UnknownGameType`] when no action set is registered,
    /// [`ActionError::ExecutorMissing`] when no executor implements it.
    pub fn for_game_type(
        sets: &ActionSetRegistry,
        executors: &ExecutorRegistry,
        game_type: &str,
    ) -> Result<Self, ActionError> {
        let action_set = sets.get_action_set(game_type)?;
        let executor = executors
            .create(game_type)
            .ok_or_else(|| ActionError::ExecutorMissing(game_type.to_owned()))?;
        Ok(Self::new(action_set, executor))
    }

    /// The action set this engine validates against.
    pub fn action_set(&self) -> &ActionSet {
        &self.action_set
    }

    /// Validate `parameters` for `action_id` and execute it on `world`.
    ///
    /// Never panics and never mutates `world`. Failures come back as a
    /// failed [`ActionResult`] with an empty delta.
    pub fn execute_action(
        &self,
        action_id: &str,
        parameters: &serde_json::Value,
        world: &WorldState,
    ) -> ActionResult {
        let Some(schema) = self.action_set.action(action_id) else {
            return ActionResult::failed(
                ActionErrorKind::UnknownAction,
                format!(
                    "unknown action: {action_id} (available: {})",
                    self.action_set.action_ids().join(", ")
                ),
            );
        };

        let resolved = match resolve_parameters(schema, parameters) {
            Ok(resolved) => resolved,
            Err(violation) => {
                debug!(action_id, %violation, "action parameters rejected");
                return ActionResult::failed(
                    ActionErrorKind::InvalidParameters,
                    format!("invalid parameters for {action_id}: {violation}"),
                );
            }
        };

        if !self.executor.supports(action_id) {
            return ActionResult::failed(
                ActionErrorKind::NotImplemented,
                format!(
                    "action {action_id} is not implemented for {}",
                    self.action_set.game_type
                ),
            );
        }

        self.executor.execute(action_id, &resolved, world)
    }
}
