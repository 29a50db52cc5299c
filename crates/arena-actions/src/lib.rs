//! Action sets, parameter validation, and game executors for Arena.
//!
//! An [`ActionEngine`] is bound to one game type. It validates a proposed
//! action against the game's [`ActionSet`](arena_types::ActionSet), runs the
//! matching executor on a world snapshot, and returns a delta-only
//! [`ActionResult`](arena_types::ActionResult). It never writes world state.
//!
//! # Modules
//!
//! - [`builtin`] -- Built-in action sets (`grid_navigation`)
//! - [`registry`] -- Game type to action set registry
//! - [`validation`] -- Ordered parameter validation and defaults
//! - [`executor`] -- The executor trait, executor kinds, and their registry
//! - [`grid`] -- The grid navigation executor
//! - [`engine`] -- The action engine
//! - [`error`] -- Configuration errors

pub mod builtin;
pub mod engine;
pub mod error;
pub mod executor;
pub mod grid;
pub mod registry;
pub mod validation;

pub use engine::ActionEngine;
pub use error::ActionError;
pub use executor::{ActionExecutor, ExecutorRegistry, GameExecutor};
pub use grid::{Direction, GridNavigation};
pub use registry::ActionSetRegistry;
pub use validation::{ParameterViolation, resolve_parameters};
