//! Parameter validation against an [`ActionSchema`].
//!
//! Parameters are checked in the schema's declared order, never in the
//! order of the incoming map, so the first reported violation is the same
//! for every key ordering. Validation has no side effects; executors only
//! ever see a resolved parameter map.

use arena_types::{ActionSchema, ParamType, json_type_name};
use serde_json::{Map, Value};

/// The first problem found in a parameter map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterViolation {
    /// Parameters were sent as something other than a JSON object.
    #[error("parameters must be an object, got {found}")]
    NotAnObject {
        /// JSON type actually received.
        found: &'static str,
    },

    /// A required parameter was not supplied.
    #[error("missing required parameter: {name}")]
    Missing {
        /// Parameter name.
        name: String,
    },

    /// A parameter had the wrong JSON type.
    #[error("parameter {name} must be {expected}, got {found}")]
    WrongType {
        /// Parameter name.
        name: String,
        /// Declared type.
        expected: ParamType,
        /// JSON type actually received.
        found: &'static str,
    },
}

/// Validate `params` against `schema` and fill in defaults.
///
/// `null` is treated as an empty map. Parameters the schema does not
/// declare are dropped from the result.
///
/// # Errors
///
/// Returns the first [`ParameterViolation`] in declaration order.
pub fn resolve_parameters(
    schema: &ActionSchema,
    params: &Value,
) -> Result<Map<String, Value>, ParameterViolation> {
    let empty = Map::new();
    let given = match params {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ParameterViolation::NotAnObject {
                found: json_type_name(other),
            });
        }
    };

    let mut resolved = Map::new();
    for param in &schema.parameters {
        match given.get(&param.name) {
            Some(value) => {
                if !param.param_type.matches(value) {
                    return Err(ParameterViolation::WrongType {
                        name: param.name.clone(),
                        expected: param.param_type,
                        found: json_type_name(value),
                    });
                }
                resolved.insert(param.name.clone(), value.clone());
            }
            None if param.required => {
                return Err(ParameterViolation::Missing {
                    name: param.name.clone(),
                });
            }
            None => {
                if let Some(default) = &param.default {
                    resolved.insert(param.name.clone(), default.clone());
                }
            }
        }
    }
    Ok(resolved)
}
