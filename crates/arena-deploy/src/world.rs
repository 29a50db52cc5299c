//! The world store: sole owner and writer of [`WorldState`].
//!
//! Readers get cloned snapshots. Writers go through
//! [`WorldStore::transact`], which runs an action against the current state
//! and merges the resulting delta while holding the world's lock, so
//! concurrent sessions on one world never interleave a read-execute-merge.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use arena_types::{ActionResult, DeltaKey, Position, StateDelta, Tile, WorldId, WorldState};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;

/// Storage for world state.
pub trait WorldStore: Send + Sync {
    /// A copy of the current state of `world_id`.
    fn snapshot(
        &self,
        world_id: WorldId,
    ) -> impl Future<Output = Result<WorldState, StoreError>> + Send;

    /// Run `execute` on the current state of `world_id` and merge the delta
    /// of a successful result before releasing the world.
    ///
    /// A failed result is returned unchanged and nothing is merged.
    fn transact<F>(
        &self,
        world_id: WorldId,
        execute: F,
    ) -> impl Future<Output = Result<ActionResult, StoreError>> + Send
    where
        F: FnOnce(&WorldState) -> ActionResult + Send;
}

/// A [`WorldStore`] held in process memory, one async mutex per world.
#[derive(Debug, Default)]
pub struct InMemoryWorldStore {
    worlds: RwLock<BTreeMap<WorldId, Arc<Mutex<WorldState>>>>,
}

impl InMemoryWorldStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a world.
    pub fn insert(&self, world: WorldState) {
        let world_id = world.world_id;
        self.worlds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(world_id, Arc::new(Mutex::new(world)));
        debug!(%world_id, "world stored");
    }

    fn handle(&self, world_id: WorldId) -> Result<Arc<Mutex<WorldState>>, StoreError> {
        self.worlds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&world_id)
            .cloned()
            .ok_or(StoreError::WorldNotFound(world_id))
    }
}

impl WorldStore for InMemoryWorldStore {
    async fn snapshot(&self, world_id: WorldId) -> Result<WorldState, StoreError> {
        let handle = self.handle(world_id)?;
        let world = handle.lock().await;
        Ok(world.clone())
    }

    async fn transact<F>(&self, world_id: WorldId, execute: F) -> Result<ActionResult, StoreError>
    where
        F: FnOnce(&WorldState) -> ActionResult + Send,
    {
        let handle = self.handle(world_id)?;
        let mut world = handle.lock().await;
        let result = execute(&world);
        if result.success() && !result.state_delta().is_empty() {
            let merged = merge_delta(&world, result.state_delta())?;
            *world = merged;
        }
        Ok(result)
    }
}

/// Apply `delta` to a copy of `world`.
///
/// Either every key merges or the world is left as it was.
///
/// # Errors
///
/// Returns [`StoreError::InvalidDelta`] when a value has the wrong shape or
/// points outside the grid.
pub fn merge_delta(world: &WorldState, delta: &StateDelta) -> Result<WorldState, StoreError> {
    let mut next = world.clone();
    for (key, value) in delta.iter() {
        match key {
            DeltaKey::AgentPosition => {
                let pos = position_value(&next, key, value)?;
                next.agent_position = pos;
            }
            // Informational; agent_position carries the move.
            DeltaKey::AgentMovedFrom | DeltaKey::AgentMovedTo => {}
            DeltaKey::InventoryAdded => {
                let item = value.as_str().ok_or_else(|| StoreError::InvalidDelta {
                    key: key.as_str(),
                    reason: format!("expected a string, got {value}"),
                })?;
                next.inventory.push(item.to_owned());
            }
            DeltaKey::CellCleared => {
                let pos = position_value(&next, key, value)?;
                if let Some(tile) = next.tile_mut(pos) {
                    *tile = Tile::Empty;
                }
            }
            DeltaKey::TurnsWaited => {
                let turns = value.as_u64().ok_or_else(|| StoreError::InvalidDelta {
                    key: key.as_str(),
                    reason: format!("expected a non-negative integer, got {value}"),
                })?;
                next.turns_elapsed = next.turns_elapsed.saturating_add(turns);
            }
        }
    }
    Ok(next)
}

fn position_value(
    world: &WorldState,
    key: DeltaKey,
    value: &serde_json::Value,
) -> Result<Position, StoreError> {
    let pos: Position =
        serde_json::from_value(value.clone()).map_err(|e| StoreError::InvalidDelta {
            key: key.as_str(),
            reason: e.to_string(),
        })?;
    if world.in_bounds(pos) {
        Ok(pos)
    } else {
        Err(StoreError::InvalidDelta {
            key: key.as_str(),
            reason: format!("{pos} is outside the {}x{} grid", world.width, world.height),
        })
    }
}
