//! Built-in action sets loaded at process start.

use arena_types::{ActionParameter, ActionSchema, ActionSet, ParamType};

/// Game type key of the grid navigation game.
pub const GRID_NAVIGATION: &str = "grid_navigation";

/// The `grid_navigation` action set: `move`, `pickup`, `wait`.
pub fn grid_navigation() -> ActionSet {
    ActionSet {
        game_type: GRID_NAVIGATION.to_owned(),
        actions: vec![
            ActionSchema {
                action_id: "move".to_owned(),
                name: "Move".to_owned(),
                description: "Move the agent across the grid. Movement stops at the edge."
                    .to_owned(),
                category: "movement".to_owned(),
                parameters: vec![
                    ActionParameter::required(
                        "direction",
                        ParamType::String,
                        "One of north, south, east, west",
                    ),
                    ActionParameter::optional(
                        "steps",
                        ParamType::Integer,
                        serde_json::json!(1),
                        "Number of cells to move (at least 1)",
                    ),
                ],
            },
            ActionSchema {
                action_id: "pickup".to_owned(),
                name: "Pick up".to_owned(),
                description: "Pick up an item from the agent's cell.".to_owned(),
                category: "interaction".to_owned(),
                parameters: vec![ActionParameter::optional(
                    "item_type",
                    ParamType::String,
                    serde_json::json!("item"),
                    "Kind of item to pick up",
                )],
            },
            ActionSchema {
                action_id: "wait".to_owned(),
                name: "Wait".to_owned(),
                description: "Do nothing for a number of turns.".to_owned(),
                category: "utility".to_owned(),
                parameters: vec![ActionParameter::optional(
                    "turns",
                    ParamType::Integer,
                    serde_json::json!(1),
                    "Turns to wait (at least 1)",
                )],
            },
        ],
    }
}

/// All built-in action sets.
pub fn all() -> Vec<ActionSet> {
    vec![grid_navigation()]
}
