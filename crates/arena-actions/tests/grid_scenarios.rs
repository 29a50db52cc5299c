//! End-to-end action scenarios on a 5x5 grid.

#![allow(clippy::unwrap_used)]

use arena_actions::builtin::GRID_NAVIGATION;
use arena_actions::{ActionEngine, ActionSetRegistry, ExecutorRegistry};
use arena_types::{ActionErrorKind, DeltaKey, Position, WorldId, WorldState};
use serde_json::{Value, json};

fn engine() -> ActionEngine {
    ActionEngine::for_game_type(
        &ActionSetRegistry::with_builtins(),
        &ExecutorRegistry::with_builtins(),
        GRID_NAVIGATION,
    )
    .unwrap()
}

fn world_at(x: u32, y: u32) -> WorldState {
    WorldState::new(WorldId::new(), GRID_NAVIGATION, 5, 5, Position::new(x, y))
}

#[test]
fn west_from_origin_hits_the_boundary() {
    let result = engine().execute_action("move", &json!({"direction": "west"}), &world_at(0, 0));
    assert!(result.success());
    assert!(result.state_delta().is_empty());
    assert!(result.message().contains("boundary"));
}

#[test]
fn east_two_steps_from_origin() {
    let result = engine().execute_action(
        "move",
        &json!({"direction": "east", "steps": 2}),
        &world_at(0, 0),
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
}

#[test]
fn every_delta_key_is_documented_and_grid_never_appears() {
    let engine = engine();
    let world = world_at(2, 2);
    let calls = [
        ("move", json!({"direction": "north"})),
        ("move", json!({"direction": "east", "steps": 10})),
        ("pickup", json!({})),
        ("wait", json!({"turns": 2})),
    ];
    for (action, params) in calls {
        let result = engine.execute_action(action, &params, &world);
        assert!(result.success(), "{action} failed: {:?}", result.error());
        let json = serde_json::to_value(result.state_delta()).unwrap();
        for key in json.as_object().unwrap().keys() {
            assert!(DeltaKey::parse(key).is_some(), "undocumented delta key {key}");
        }
        assert!(!result.state_delta().contains_key("grid"));
    }
}

#[test]
fn failures_never_carry_a_delta() {
    let engine = engine();
    let world = world_at(1, 1);
    let calls: [(&str, Value); 4] = [
        ("teleport", json!({})),
        ("move", json!({})),
        ("move", json!({"direction": "east", "steps": "2"})),
        ("wait", json!({"turns": 0})),
    ];
    for (action, params) in calls {
        let result = engine.execute_action(action, &params, &world);
        assert!(!result.success());
        assert!(result.state_delta().is_empty());
        assert!(result.error().is_some());
    }
}

#[test]
fn boundary_moves_are_idempotent() {
    let engine = engine();
    for (x, y, direction) in [(0, 2, "west"), (4, 2, "east"), (2, 0, "north"), (2, 4, "south")] {
        let world = world_at(x, y);
        for _ in 0..3 {
            let result = engine.execute_action("move", &json!({"direction": direction}), &world);
            assert!(result.success());
            assert!(result.state_delta().is_empty());
        }
    }
}

#[test]
fn validation_outcome_is_independent_of_key_order() {
    let engine = engine();
    let world = world_at(0, 0);
    let a: Value = serde_json::from_str(r#"{"steps": 1.5, "direction": 7}"#).unwrap();
    let b: Value = serde_json::from_str(r#"{"direction": 7, "steps": 1.5}"#).unwrap();
    let ra = engine.execute_action("move", &a, &world);
    let rb = engine.execute_action("move", &b, &world);
    assert_eq!(ra, rb);
    assert_eq!(ra.error_kind(), Some(ActionErrorKind::InvalidParameters));
}
