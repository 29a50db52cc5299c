//! Error types for the arena-actions crate.
//!
//! These are configuration errors: a missing action set or executor, or an
//! action set that cannot be registered. Per-call action failures are not
//! errors; they come back as a failed [`ActionResult`](arena_types::ActionResult).

/// Errors raised while looking up or registering game definitions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// No action set is registered for the game type.
    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    /// An action set exists but no executor implements the game type.
    #[error("no executor for game type: {0}")]
    ExecutorMissing(String),

    /// An action set declares the same `action_id` twice.
    #[error("duplicate action id {action_id} in action set {game_type}")]
    DuplicateActionId {
        /// The game type being registered.
        game_type: String,
        /// The repeated identifier.
        action_id: String,
    },

    /// The registration key disagrees with the set's own `game_type`.
    #[error("action set for {found} cannot be registered under {expected}")]
    GameTypeMismatch {
        /// The key it was registered under.
        expected: String,
        /// The `game_type` inside the set.
        found: String,
    },
}
