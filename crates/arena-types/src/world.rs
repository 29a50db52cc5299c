//! Grid world state.
//!
//! The world store is the only writer of [`WorldState`]. Everything else
//! (the action engine, the deployment loop, the HTTP layer) works on cloned
//! snapshots and proposes [`StateDelta`](crate::delta::StateDelta)s.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::WorldId;

/// A cell coordinate. Serialized as a two-element array `[x, y]`.
///
/// `x` grows eastward and `y` grows southward, so `(0, 0)` is the
/// north-west corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Position {
    /// Column, `0..width`.
    pub x: u32,
    /// Row, `0..height`.
    pub y: u32,
}

impl Position {
    /// Create a position.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// JSON form used inside deltas.
    pub fn to_json(self) -> serde_json::Value {
        serde_json::json!([self.x, self.y])
    }
}

impl From<[u32; 2]> for Position {
    fn from([x, y]: [u32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Position> for [u32; 2] {
    fn from(p: Position) -> Self {
        [p.x, p.y]
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Contents of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Tile {
    /// Nothing here.
    #[default]
    Empty,
    /// Impassable scenery (informational; movement only clamps to bounds).
    Wall,
    /// A collectable item of the named type.
    Item(String),
    /// The goal marker.
    Goal,
}

/// Full state of one grid world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldState {
    /// The world's identifier.
    pub world_id: WorldId,
    /// Game type key selecting the action set and executor.
    pub game_type: String,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Row-major tile matrix: `grid[y][x]`.
    pub grid: Vec<Vec<Tile>>,
    /// Where the agent currently stands.
    #[ts(type = "[number, number]")]
    pub agent_position: Position,
    /// Items the agent has collected, in pickup order.
    #[serde(default)]
    pub inventory: Vec<String>,
    /// Turns spent waiting or acting since the world was created.
    #[serde(default)]
    pub turns_elapsed: u64,
}

impl WorldState {
    /// Create an empty `width` x `height` world with the agent at `start`.
    ///
    /// `start` is clamped into the grid.
    pub fn new(
        world_id: WorldId,
        game_type: &str,
        width: u32,
        height: u32,
        start: Position,
    ) -> Self {
        let row = vec![Tile::Empty; usize::try_from(width).unwrap_or(0)];
        let grid = vec![row; usize::try_from(height).unwrap_or(0)];
        let agent_position = Position::new(
            start.x.min(width.saturating_sub(1)),
            start.y.min(height.saturating_sub(1)),
        );
        Self {
            world_id,
            game_type: game_type.to_owned(),
            width,
            height,
            grid,
            agent_position,
            inventory: Vec::new(),
            turns_elapsed: 0,
        }
    }

    /// Whether `pos` lies inside the grid.
    pub const fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// The tile at `pos`, or `None` when out of bounds.
    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        self.grid.get(y).and_then(|row| row.get(x))
    }

    /// Mutable access to the tile at `pos`.
    pub fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        self.grid.get_mut(y).and_then(|row| row.get_mut(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_serializes_as_pair() {
        let json = serde_json::to_value(Position::new(2, 0)).unwrap_or_default();
        assert_eq!(json, serde_json::json!([2, 0]));
        let back: Position = serde_json::from_value(serde_json::json!([4, 1]))
            .unwrap_or(Position::new(0, 0));
        assert_eq!(back, Position::new(4, 1));
    }

    #[test]
    fn new_world_clamps_start_and_sizes_grid() {
        let world = WorldState::new(WorldId::new(), "grid_navigation", 5, 3, Position::new(9, 9));
        assert_eq!(world.agent_position, Position::new(4, 2));
        assert_eq!(world.grid.len(), 3);
        assert!(world.grid.iter().all(|row| row.len() == 5));
    }

    #[test]
    fn tile_lookup_respects_bounds() {
        let mut world = WorldState::new(WorldId::new(), "grid_navigation", 2, 2, Position::new(0, 0));
        if let Some(tile) = world.tile_mut(Position::new(1, 1)) {
            *tile = Tile::Item("key".to_owned());
        }
        assert_eq!(world.tile(Position::new(1, 1)), Some(&Tile::Item("key".to_owned())));
        assert_eq!(world.tile(Position::new(2, 0)), None);
        assert!(!world.in_bounds(Position::new(0, 2)));
    }
}
