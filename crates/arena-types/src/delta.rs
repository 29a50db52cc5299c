//! State deltas: the only way actions describe change.
//!
//! Every legal delta key is listed in [`DeltaKey`]. A [`StateDelta`] can only
//! be built through these keys, so a `grid` entry (or any full-snapshot
//! field) cannot appear in a delta or in a `world_update` event.
//!
//! | Key | Value | Produced by |
//! |-----|-------|-------------|
//! | `agent_position` | `[x, y]` new position | `move` |
//! | `agent_moved_from` | `[x, y]` old position | `move` |
//! | `agent_moved_to` | `[x, y]` new position | `move` |
//! | `inventory_added` | item type string | `pickup` |
//! | `cell_cleared` | `[x, y]` emptied cell | `pickup` |
//! | `turns_waited` | positive integer | `wait` |

use std::collections::BTreeMap;

use serde::Serialize;
use ts_rs::TS;

/// The closed set of keys a delta may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeltaKey {
    /// The agent's new position.
    AgentPosition,
    /// Where a move started.
    AgentMovedFrom,
    /// Where a move ended.
    AgentMovedTo,
    /// An item added to the inventory.
    InventoryAdded,
    /// A cell whose contents were removed.
    CellCleared,
    /// Number of turns spent waiting.
    TurnsWaited,
}

impl DeltaKey {
    /// Every key, in documentation order.
    pub const ALL: [Self; 6] = [
        Self::AgentPosition,
        Self::AgentMovedFrom,
        Self::AgentMovedTo,
        Self::InventoryAdded,
        Self::CellCleared,
        Self::TurnsWaited,
    ];

    /// The key as it appears on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgentPosition => "agent_position",
            Self::AgentMovedFrom => "agent_moved_from",
            Self::AgentMovedTo => "agent_moved_to",
            Self::InventoryAdded => "inventory_added",
            Self::CellCleared => "cell_cleared",
            Self::TurnsWaited => "turns_waited",
        }
    }

    /// Parse a wire key.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// A flat map of changed fields. Serializes as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct StateDelta(BTreeMap<String, serde_json::Value>);

impl StateDelta {
    /// An empty delta (nothing changed).
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Set `key` to `value`, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, key: DeltaKey, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key` to `value`.
    pub fn insert(&mut self, key: DeltaKey, value: impl Into<serde_json::Value>) {
        self.0.insert(key.as_str().to_owned(), value.into());
    }

    /// The value recorded for `key`.
    pub fn get(&self, key: DeltaKey) -> Option<&serde_json::Value> {
        self.0.get(key.as_str())
    }

    /// Whether a raw wire key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of changed fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (DeltaKey, &serde_json::Value)> {
        self.0
            .iter()
            .filter_map(|(k, v)| DeltaKey::parse(k).map(|key| (key, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_wire_names() {
        for key in DeltaKey::ALL {
            assert_eq!(DeltaKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(DeltaKey::parse("grid"), None);
    }

    #[test]
    fn delta_serializes_flat() {
        let delta = StateDelta::new()
            .with(DeltaKey::AgentPosition, serde_json::json!([2, 0]))
            .with(DeltaKey::TurnsWaited, 3);
        let json = serde_json::to_value(&delta).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"agent_position": [2, 0], "turns_waited": 3}));
        assert!(!delta.contains_key("grid"));
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn empty_delta_serializes_as_empty_object() {
        let json = serde_json::to_string(&StateDelta::new()).unwrap_or_default();
        assert_eq!(json, "{}");
    }
}
