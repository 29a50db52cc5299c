//! Declarative action schemas.
//!
//! An [`ActionSet`] describes every action an agent may request in one game
//! type: the action's identifier, a category for client-side grouping, and
//! an ordered list of typed [`ActionParameter`]s. Schemas are data only;
//! validation and execution live in `arena-actions`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The runtime type a parameter value must have.
///
/// Type checks are exact: an `integer` parameter given `1.5` or `"1"` is a
/// mismatch, never a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ParamType {
    /// A JSON string.
    String,
    /// A JSON number without a fractional part.
    Integer,
    /// A JSON boolean.
    Boolean,
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
}

impl ParamType {
    /// The wire name of this type (also its JSON-Schema type name).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether `value` has exactly this type.
    pub fn matches(self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl core::fmt::Display for ParamType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the JSON type actually carried by `value`, for error messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "float",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// One declared parameter of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionParameter {
    /// Parameter name as it appears in the parameters map.
    pub name: String,
    /// Declared runtime type.
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Whether the parameter must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Value used when an optional parameter is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub default: Option<serde_json::Value>,
    /// Human-readable description (shown to the model).
    #[serde(default)]
    pub description: String,
}

impl ActionParameter {
    /// Declare a required parameter.
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            param_type,
            required: true,
            default: None,
            description: description.to_owned(),
        }
    }

    /// Declare an optional parameter with a default value.
    pub fn optional(
        name: &str,
        param_type: ParamType,
        default: serde_json::Value,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_owned(),
            param_type,
            required: false,
            default: Some(default),
            description: description.to_owned(),
        }
    }
}

/// Declaration of one executable action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionSchema {
    /// Identifier, unique within the owning [`ActionSet`].
    pub action_id: String,
    /// Display name.
    pub name: String,
    /// What the action does (shown to the model).
    #[serde(default)]
    pub description: String,
    /// Grouping key for clients (e.g. `movement`, `interaction`).
    #[serde(default)]
    pub category: String,
    /// Parameters in declaration order. Validation walks this order.
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
}

impl ActionSchema {
    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ActionParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Render the parameter list as a JSON-Schema `object`.
    ///
    /// This is the shape tool-calling model APIs accept as a function's
    /// `parameters` definition.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".to_owned(), param.param_type.as_str().into());
            prop.insert("description".to_owned(), param.description.clone().into());
            if let Some(default) = &param.default {
                prop.insert("default".to_owned(), default.clone());
            }
            properties.insert(param.name.clone(), serde_json::Value::Object(prop));
            if param.required {
                required.push(serde_json::Value::String(param.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// All actions available in one game type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionSet {
    /// The game type this set belongs to (e.g. `grid_navigation`).
    pub game_type: String,
    /// Actions in declaration order.
    pub actions: Vec<ActionSchema>,
}

impl ActionSet {
    /// Look up an action by its identifier.
    pub fn action(&self, action_id: &str) -> Option<&ActionSchema> {
        self.actions.iter().find(|a| a.action_id == action_id)
    }

    /// Return the first `action_id` declared more than once, if any.
    pub fn duplicate_action_id(&self) -> Option<&str> {
        let mut seen = BTreeSet::new();
        self.actions
            .iter()
            .map(|a| a.action_id.as_str())
            .find(|id| !seen.insert(*id))
    }

    /// Identifiers of all actions in declaration order.
    pub fn action_ids(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.action_id.as_str()).collect()
    }
}
