//! OpenAI-compatible tool-calling backend.
//!
//! Sends `{api_url}/chat/completions` requests with the turn's tool specs
//! advertised as `tools`, and keeps the session's message history so every
//! tool result is answered against the call that produced it.

use arena_types::{Tile, WorldState};

use crate::config::LlmBackendConfig;
use crate::error::ModelError;
use crate::model::{ModelTurn, StopSignal, ToolInvocation, ToolSpec, TurnContext, TurnItem};

/// Marker the model includes in its final message when the goal is met.
pub const GOAL_MARKER: &str = "GOAL_COMPLETE";

const SYSTEM_PROMPT: &str = "You control an agent in a 2D grid world. \
Use the provided tools to act. Coordinates are [x, y]; north decreases y. \
When the goal is achieved, reply without tool calls and include GOAL_COMPLETE.";

/// A chat-completions conversation for one deployment session.
#[derive(Debug)]
pub struct OpenAiToolModel {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    history: Vec<serde_json::Value>,
}

impl OpenAiToolModel {
    /// Start an empty conversation against `config`.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            history: Vec::new(),
        }
    }

    /// Request the next turn.
    ///
    /// History only grows when a turn succeeds, so a retried turn sends the
    /// same messages again.
    pub async fn next_turn(&mut self, context: &TurnContext) -> Result<ModelTurn, ModelError> {
        let mut messages = self.history.clone();
        if messages.is_empty() {
            messages.push(serde_json::json!({"role": "system", "content": SYSTEM_PROMPT}));
            messages.push(serde_json::json!({
                "role": "user",
                "content": format!("Goal: {}", context.goal),
            }));
        }
        messages.extend(observation_messages(context));
        messages.push(serde_json::json!({
            "role": "user",
            "content": format!("Turn {}. {}", context.turn, describe_world(&context.world)),
        }));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "tools": tool_definitions(&context.tools),
            "tool_choice": "auto",
        });

        let url = format!("{}/chat/completions", self.api_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(format!("response is not JSON: {e}")))?;

        let (assistant, turn) = parse_completion(&json)?;
        messages.push(assistant);
        self.history = messages;
        Ok(turn)
    }
}

/// Split a chat-completions response into the assistant message to keep in
/// history and the turn it describes.
///
/// Content becomes reasoning. Each `tool_calls` entry becomes an invocation;
/// arguments that are not valid JSON are passed on as the raw string so the
/// failure surfaces as a parameter error for that call. A refusal is a
/// model-reported error. `finish_reason: "stop"` with no tool calls ends the
/// session, with the goal reached when the content carries [`GOAL_MARKER`].
pub fn parse_completion(
    json: &serde_json::Value,
) -> Result<(serde_json::Value, ModelTurn), ModelError> {
    let choice = json
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| ModelError::Decode("response missing choices[0]".to_owned()))?;
    let message = choice
        .get("message")
        .ok_or_else(|| ModelError::Decode("response missing choices[0].message".to_owned()))?;

    let mut items = Vec::new();
    let content = message
        .get("content")
        .and_then(serde_json::Value::as_str)
        .filter(|text| !text.trim().is_empty());
    if let Some(text) = content {
        items.push(TurnItem::Reasoning(text.to_owned()));
    }
    if let Some(refusal) = message.get("refusal").and_then(serde_json::Value::as_str) {
        items.push(TurnItem::Error(refusal.to_owned()));
    }

    let calls = message
        .get("tool_calls")
        .and_then(serde_json::Value::as_array)
        .map_or(&[][..], Vec::as_slice);
    for call in calls {
        items.push(TurnItem::ToolCall(parse_tool_call(call)?));
    }

    let finished = choice.get("finish_reason").and_then(serde_json::Value::as_str) == Some("stop");
    let stop = (finished && calls.is_empty()).then(|| StopSignal {
        goal_reached: content.is_some_and(|text| text.contains(GOAL_MARKER)),
    });

    Ok((message.clone(), ModelTurn { items, stop }))
}

fn parse_tool_call(call: &serde_json::Value) -> Result<ToolInvocation, ModelError> {
    let function = call
        .get("function")
        .ok_or_else(|| ModelError::Decode("tool call missing function".to_owned()))?;
    let tool_name = function
        .get("name")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ModelError::Decode("tool call missing function.name".to_owned()))?;
    let raw = function
        .get("arguments")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("{}");
    let parameters = serde_json::from_str(raw)
        .unwrap_or_else(|_malformed| serde_json::Value::String(raw.to_owned()));

    Ok(ToolInvocation {
        call_id: call.get("id").and_then(serde_json::Value::as_str).map(ToOwned::to_owned),
        tool_name: tool_name.to_owned(),
        parameters,
    })
}

/// Tool results from the previous turn as chat messages.
///
/// Results with a call ID answer that call; the rest are summarized as a
/// user message.
fn observation_messages(context: &TurnContext) -> Vec<serde_json::Value> {
    let mut messages = Vec::new();
    let mut loose = Vec::new();
    for obs in &context.observations {
        match &obs.call_id {
            Some(call_id) => messages.push(serde_json::json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": obs.output.to_string(),
            })),
            None => loose.push(format!("{}: {}", obs.tool_name, obs.output)),
        }
    }
    if !loose.is_empty() {
        messages.push(serde_json::json!({
            "role": "user",
            "content": format!("Tool results:\n{}", loose.join("\n")),
        }));
    }
    messages
}

/// Tool specs in the chat-completions `tools` shape.
fn tool_definitions(tools: &[ToolSpec]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|tool| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                },
            })
        })
        .collect()
}

/// One-paragraph description of the world for the model.
pub fn describe_world(world: &WorldState) -> String {
    let mut features = Vec::new();
    for (y, row) in (0_u32..).zip(&world.grid) {
        for (x, tile) in (0_u32..).zip(row) {
            match tile {
                Tile::Item(kind) => features.push(format!("{kind} at [{x}, {y}]")),
                Tile::Goal => features.push(format!("goal at [{x}, {y}]")),
                Tile::Wall => features.push(format!("wall at [{x}, {y}]")),
                Tile::Empty => {}
            }
        }
    }
    let inventory = if world.inventory.is_empty() {
        "empty".to_owned()
    } else {
        world.inventory.join(", ")
    };
    let features = if features.is_empty() {
        "none".to_owned()
    } else {
        features.join("; ")
    };
    format!(
        "Grid {}x{}. Agent at [{}, {}]. Inventory: {inventory}. Features: {features}.",
        world.width, world.height, world.agent_position.x, world.agent_position.y
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use arena_types::{Position, WorldId};
    use serde_json::json;

    use super::*;

    #[test]
    fn content_and_tool_calls() {
        let response = json!({
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": "Heading east.",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "move", "arguments": "{\"direction\":\"east\"}"}
                    }]
                }
            }]
        });
        let (assistant, turn) = parse_completion(&response).unwrap();
        assert_eq!(assistant.get("role"), Some(&json!("assistant")));
        assert_eq!(
            turn.items,
            vec![
                TurnItem::Reasoning("Heading east.".to_owned()),
                TurnItem::ToolCall(ToolInvocation {
                    call_id: Some("call_1".to_owned()),
                    tool_name: "move".to_owned(),
                    parameters: json!({"direction": "east"}),
                }),
            ]
        );
        assert_eq!(turn.stop, None);
    }

    #[test]
    fn stop_with_marker_reaches_goal() {
        let response = json!({
            "choices": [{
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": "Done. GOAL_COMPLETE"}
            }]
        });
        let (_, turn) = parse_completion(&response).unwrap();
        assert_eq!(turn.stop, Some(StopSignal { goal_reached: true }));

        let response = json!({
            "choices": [{
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": "I give up."}
            }]
        });
        let (_, turn) = parse_completion(&response).unwrap();
        assert_eq!(turn.stop, Some(StopSignal { goal_reached: false }));
    }

    #[test]
    fn malformed_arguments_pass_through_raw() {
        let response = json!({
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "function": {"name": "wait", "arguments": "{turns: 2"}
                    }]
                }
            }]
        });
        let (_, turn) = parse_completion(&response).unwrap();
        assert_eq!(
            turn.items,
            vec![TurnItem::ToolCall(ToolInvocation {
                call_id: Some("call_9".to_owned()),
                tool_name: "wait".to_owned(),
                parameters: json!("{turns: 2"),
            })]
        );
    }

    #[test]
    fn missing_choices_is_a_decode_error() {
        let err = parse_completion(&json!({"error": "overloaded"})).unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
    }

    #[test]
    fn world_description_lists_features() {
        let mut world = WorldState::new(WorldId::new(), "grid_navigation", 3, 2, Position::new(1, 0));
        *world.tile_mut(Position::new(2, 1)).unwrap() = Tile::Item("key".to_owned());
        *world.tile_mut(Position::new(0, 1)).unwrap() = Tile::Goal;
        let text = describe_world(&world);
        assert!(text.contains("Grid 3x2"));
        assert!(text.contains("Agent at [1, 0]"));
        assert!(text.contains("key at [2, 1]"));
        assert!(text.contains("goal at [0, 1]"));
        assert!(text.contains("Inventory: empty"));
    }
}
