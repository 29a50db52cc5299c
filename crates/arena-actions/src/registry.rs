//! Game type to action set mapping.
//!
//! Sets are stored behind [`Arc`] so a registration swaps one pointer.
//! Readers holding the previous set keep a consistent view of it; a set is
//! never merged or edited in place.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use arena_types::ActionSet;
use tracing::info;

use crate::builtin;
use crate::error::ActionError;

/// Registry of action sets keyed by game type.
#[derive(Debug, Default)]
pub struct ActionSetRegistry {
    sets: RwLock<BTreeMap<String, Arc<ActionSet>>>,
}

impl ActionSetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with every built-in action set.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        {
            let mut sets = registry.sets.write().unwrap_or_else(PoisonError::into_inner);
            for set in builtin::all() {
                sets.insert(set.game_type.clone(), Arc::new(set));
            }
        }
        registry
    }

    /// The action set for `game_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownGameType`] if nothing is registered.
    pub fn get_action_set(&self, game_type: &str) -> Result<Arc<ActionSet>, ActionError> {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(game_type)
            .cloned()
            .ok_or_else(|| ActionError::UnknownGameType(game_type.to_owned()))
    }

    /// Register `set` under `game_type`, replacing any existing set.
    ///
    /// # Errors
    ///
    /// Rejects a set whose own `game_type` differs from the key, or one that
    /// declares an `action_id` twice. Nothing changes on error.
    pub fn register_action_set(&self, game_type: &str, set: ActionSet) -> Result<(), ActionError> {
        if set.game_type != game_type {
            return Err(ActionError::GameTypeMismatch {
                expected: game_type.to_owned(),
                found: set.game_type,
            });
        }
        if let Some(dup) = set.duplicate_action_id() {
            return Err(ActionError::DuplicateActionId {
                game_type: game_type.to_owned(),
                action_id: dup.to_owned(),
            });
        }

        let actions = set.actions.len();
        let replaced = self
            .sets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(game_type.to_owned(), Arc::new(set))
            .is_some();
        info!(game_type, actions, replaced, "action set registered");
        Ok(())
    }

    /// All registered game types, sorted.
    pub fn list_game_types(&self) -> Vec<String> {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use arena_types::{ActionParameter, ActionSchema, ParamType};

    use super::*;
    use crate::builtin::GRID_NAVIGATION;

    fn single_action_set(game_type: &str, action_id: &str) -> ActionSet {
        ActionSet {
            game_type: game_type.to_owned(),
            actions: vec![ActionSchema {
                action_id: action_id.to_owned(),
                name: action_id.to_owned(),
                description: String::new(),
                category: "test".to_owned(),
                parameters: vec![ActionParameter::required("x", ParamType::Integer, "")],
            }],
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = ActionSetRegistry::with_builtins();
        assert_eq!(registry.list_game_types(), vec![GRID_NAVIGATION.to_owned()]);
        let set = registry.get_action_set(GRID_NAVIGATION).unwrap();
        assert!(set.action("move").is_some());
    }

    #[test]
    fn unknown_game_type_is_an_error() {
        let registry = ActionSetRegistry::new();
        assert!(matches!(
            registry.get_action_set("chess"),
            Err(ActionError::UnknownGameType(g)) if g == "chess"
        ));
    }

    #[test]
    fn registration_replaces_wholesale() {
        let registry = ActionSetRegistry::with_builtins();
        let before = registry.get_action_set(GRID_NAVIGATION).unwrap();

        registry
            .register_action_set(GRID_NAVIGATION, single_action_set(GRID_NAVIGATION, "jump"))
            .unwrap();

        let after = registry.get_action_set(GRID_NAVIGATION).unwrap();
        assert_eq!(after.action_ids(), vec!["jump"]);
        // The old handle still sees the old set.
        assert!(before.action("move").is_some());
    }

    #[test]
    fn invalid_sets_change_nothing() {
        let registry = ActionSetRegistry::with_builtins();

        let mut dup = single_action_set(GRID_NAVIGATION, "jump");
        dup.actions.push(dup.actions.first().cloned().unwrap());
        assert!(matches!(
            registry.register_action_set(GRID_NAVIGATION, dup),
            Err(ActionError::DuplicateActionId { .. })
        ));

        assert!(matches!(
            registry.register_action_set(GRID_NAVIGATION, single_action_set("maze", "jump")),
            Err(ActionError::GameTypeMismatch { .. })
        ));

        let set = registry.get_action_set(GRID_NAVIGATION).unwrap();
        assert!(set.action("move").is_some());
    }

    #[test]
    fn game_types_are_sorted() {
        let registry = ActionSetRegistry::with_builtins();
        registry.register_action_set("alpha", single_action_set("alpha", "a")).unwrap();
        registry.register_action_set("zeta", single_action_set("zeta", "z")).unwrap();
        assert_eq!(
            registry.list_game_types(),
            vec!["alpha".to_owned(), GRID_NAVIGATION.to_owned(), "zeta".to_owned()]
        );
    }
}
