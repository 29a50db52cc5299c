//! Executor for the `grid_navigation` game.
//!
//! Handlers read a world snapshot and return a delta; they never mutate
//! the snapshot. Coordinates grow east (`x`) and south (`y`).

use arena_types::{ActionErrorKind, ActionResult, DeltaKey, Position, StateDelta, WorldState};
use serde_json::{Map, Value};

use crate::executor::ActionExecutor;

/// Compass direction for `move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `y - 1`.
    North,
    /// `y + 1`.
    South,
    /// `x + 1`.
    East,
    /// `x - 1`.
    West,
}

impl Direction {
    /// Parse a direction name, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" => Some(Self::North),
            "south" => Some(Self::South),
            "east" => Some(Self::East),
            "west" => Some(Self::West),
            _ => None,
        }
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        }
    }

    /// Unit offset `(dx, dy)`.
    const fn offset(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
        }
    }
}

/// Clamp `origin + unit * steps` into `0..limit`.
fn clamped_step(origin: u32, unit: i64, steps: i64, limit: u32) -> u32 {
    let target = i64::from(origin).saturating_add(unit.saturating_mul(steps));
    let max = i64::from(limit.saturating_sub(1));
    u32::try_from(target.clamp(0, max)).unwrap_or(0)
}

/// Read a positive integer parameter, falling back to `1` when absent.
fn positive_count(params: &Map<String, Value>, name: &str) -> Result<u64, ActionResult> {
    match params.get(name) {
        None => Ok(1),
        Some(value) => value.as_u64().filter(|n| *n >= 1).ok_or_else(|| {
            ActionResult::failed(
                ActionErrorKind::InvalidParameters,
                format!("parameter {name} must be at least 1, got {value}"),
            )
        }),
    }
}

/// The `grid_navigation` executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridNavigation;

impl GridNavigation {
    /// Actions this executor implements.
    pub const ACTIONS: [&'static str; 3] = ["move", "pickup", "wait"];

    fn execute_move(params: &Map<String, Value>, world: &WorldState) -> ActionResult {
        let raw = params.get("direction").and_then(Value::as_str).unwrap_or_default();
        let Some(direction) = Direction::parse(raw) else {
            return ActionResult::failed(
                ActionErrorKind::InvalidParameters,
                format!("invalid direction {raw:?}: expected north, south, east, or west"),
            );
        };
        let steps = match positive_count(params, "steps") {
            Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Err(result) => return result,
        };

        let from = world.agent_position;
        let (dx, dy) = direction.offset();
        let to = Position::new(
            clamped_step(from.x, dx, steps, world.width),
            clamped_step(from.y, dy, steps, world.height),
        );

        if to == from {
            return ActionResult::succeeded(
                format!(
                    "Cannot move {}: already at the {} boundary at {from}",
                    direction.as_str(),
                    direction.as_str()
                ),
                StateDelta::new(),
            );
        }

        let delta = StateDelta::new()
            .with(DeltaKey::AgentPosition, to.to_json())
            .with(DeltaKey::AgentMovedFrom, from.to_json())
            .with(DeltaKey::AgentMovedTo, to.to_json());
        ActionResult::succeeded(format!("Moved {} from {from} to {to}", direction.as_str()), delta)
    }

    fn execute_pickup(params: &Map<String, Value>, world: &WorldState) -> ActionResult {
        let item = params
            .get("item_type")
            .and_then(Value::as_str)
            .unwrap_or("item")
            .to_owned();
        let at = world.agent_position;
        let delta = StateDelta::new()
            .with(DeltaKey::InventoryAdded, item.clone())
            .with(DeltaKey::CellCleared, at.to_json());
        ActionResult::succeeded(format!("Picked up {item} at {at}"), delta)
    }

    fn execute_wait(params: &Map<String, Value>) -> ActionResult {
        match positive_count(params, "turns") {
            Ok(turns) => ActionResult::succeeded(
                format!("Waited {turns} turn(s)"),
                StateDelta::new().with(DeltaKey::TurnsWaited, turns),
            ),
            Err(result) => result,
        }
    }
}

impl ActionExecutor for GridNavigation {
    fn supports(&self, action_id: &str) -> bool {
        Self::ACTIONS.contains(&action_id)
    }

    fn execute(
        &self,
        action_id: &str,
        params: &Map<String, Value>,
        world: &WorldState,
    ) -> ActionResult {
        match action_id {
            "move" => Self::execute_move(params, world),
            "pickup" => Self::execute_pickup(params, world),
            "wait" => Self::execute_wait(params),
            other => ActionResult::failed(
                ActionErrorKind::NotImplemented,
                format!("action {other} is not implemented for grid_navigation"),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use arena_types::WorldId;
    use serde_json::json;

    use super::*;

    fn world_at(x: u32, y: u32) -> WorldState {
        WorldState::new(WorldId::new(), "grid_navigation", 5, 5, Position::new(x, y))
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn move_east_two_steps() {
        let world = world_at(0, 0);
        let result = GridNavigation.execute(
            "move",
            &params(json!({"direction": "east", "steps": 2})),
            &world,
        );
        assert!(result.success());
        assert_eq!(
            serde_json::to_value(result.state_delta()).unwrap(),
            json!({
                "agent_position": [2, 0],
                "agent_moved_from": [0, 0],
                "agent_moved_to": [2, 0],
            })
        );
        // The snapshot is untouched.
        assert_eq!(world.agent_position, Position::new(0, 0));
    }

    #[test]
    fn north_decreases_y() {
        let result = GridNavigation.execute(
            "move",
            &params(json!({"direction": "north", "steps": 1})),
            &world_at(2, 2),
        );
        assert_eq!(result.state_delta().get(DeltaKey::AgentPosition), Some(&json!([2, 1])));
    }

    #[test]
    fn move_into_boundary_is_a_successful_noop() {
        let result = GridNavigation.execute(
            "move",
            &params(json!({"direction": "west", "steps": 1})),
            &world_at(0, 0),
        );
        assert!(result.success());
        assert!(result.state_delta().is_empty());
        assert!(result.message().contains("boundary"));
    }

    #[test]
    fn long_moves_clamp_to_the_edge() {
        let result = GridNavigation.execute(
            "move",
            &params(json!({"direction": "south", "steps": 99})),
            &world_at(1, 1),
        );
        assert_eq!(result.state_delta().get(DeltaKey::AgentPosition), Some(&json!([1, 4])));
    }

    #[test]
    fn bad_direction_and_steps_are_parameter_failures() {
        let world = world_at(0, 0);
        for p in [
            json!({"direction": "up", "steps": 1}),
            json!({"direction": "east", "steps": 0}),
            json!({"direction": "east", "steps": -2}),
        ] {
            let result = GridNavigation.execute("move", &params(p), &world);
            assert!(!result.success());
            assert_eq!(result.error_kind(), Some(ActionErrorKind::InvalidParameters));
            assert!(result.state_delta().is_empty());
        }
    }

    #[test]
    fn pickup_reports_item_and_cell() {
        let result =
            GridNavigation.execute("pickup", &params(json!({"item_type": "key"})), &world_at(3, 1));
        assert!(result.success());
        assert_eq!(result.state_delta().get(DeltaKey::InventoryAdded), Some(&json!("key")));
        assert_eq!(result.state_delta().get(DeltaKey::CellCleared), Some(&json!([3, 1])));
    }

    #[test]
    fn wait_reports_turns() {
        let result = GridNavigation.execute("wait", &params(json!({"turns": 3})), &world_at(0, 0));
        assert_eq!(result.state_delta().get(DeltaKey::TurnsWaited), Some(&json!(3)));
        let bad = GridNavigation.execute("wait", &params(json!({"turns": 0})), &world_at(0, 0));
        assert!(!bad.success());
    }

    #[test]
    fn unsupported_action_is_not_implemented() {
        assert!(!GridNavigation.supports("teleport"));
        let result = GridNavigation.execute("teleport", &Map::new(), &world_at(0, 0));
        assert_eq!(result.error_kind(), Some(ActionErrorKind::NotImplemented));
    }
}
