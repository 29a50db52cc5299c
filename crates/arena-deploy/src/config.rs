//! Configuration loading and typed config structures.
//!
//! The server reads `arena-config.yaml`. Every section and field has a
//! default, so an empty (or missing) file yields a working configuration.
//! LLM credentials never live in the file; they come from the environment.

use std::path::Path;
use std::time::Duration;

use arena_actions::builtin::GRID_NAVIGATION;
use arena_types::{AgentId, Position, Tile, WorldId, WorldState};
use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A required environment variable is not set.
    #[error("missing required env var {0}")]
    MissingEnv(&'static str),

    /// A seed world cannot be built.
    #[error("invalid world {world_id}: {reason}")]
    InvalidWorld {
        /// The offending seed.
        world_id: WorldId,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration, mirroring `arena-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArenaConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Deployment loop limits.
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Worlds loaded into the store at start-up.
    #[serde(default)]
    pub worlds: Vec<WorldSeed>,

    /// Agents enrolled in the tool catalog at start-up.
    #[serde(default)]
    pub agents: Vec<AgentId>,
}

impl ArenaConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `ARENA_HOST` and `ARENA_PORT` override the `server` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any failure other than the file not
    /// existing.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::from_file(path) {
            Err(ConfigError::Io { source }) if source.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                let mut config = Self::default();
                config.server.apply_env_overrides();
                Ok(config)
            }
            other => other,
        }
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::InvalidWorld`] if a seed world has no cells.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty mapping.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        for seed in &config.worlds {
            seed.validate()?;
        }
        config.server.apply_env_overrides();
        Ok(config)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Override host and port with `ARENA_HOST` / `ARENA_PORT` when set.
    ///
    /// An unparsable `ARENA_PORT` is ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ARENA_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("ARENA_PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!(value = %val, error = %e, "ignoring invalid ARENA_PORT"),
            }
        }
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Deployment loop limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeploymentConfig {
    /// Model turns per session before the loop stops.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Retries of one turn after a model failure.
    #[serde(default = "default_max_model_retries")]
    pub max_model_retries: u32,

    /// Capacity of each session's event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Wall-clock limit for one sandboxed tool call, in milliseconds.
    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,
}

impl DeploymentConfig {
    /// [`tool_timeout_ms`](Self::tool_timeout_ms) as a [`Duration`].
    pub const fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_model_retries: default_max_model_retries(),
            event_buffer: default_event_buffer(),
            tool_timeout_ms: default_tool_timeout_ms(),
        }
    }
}

/// An item placed on a seeded world.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemSeed {
    /// Cell holding the item.
    pub position: Position,
    /// Kind of item.
    #[serde(default = "default_item_type")]
    pub item_type: String,
}

/// A world created at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldSeed {
    /// Identifier clients deploy against.
    pub world_id: WorldId,

    /// Game type (selects action set and executor).
    #[serde(default = "default_game_type")]
    pub game_type: String,

    /// Columns.
    #[serde(default = "default_grid_size")]
    pub width: u32,

    /// Rows.
    #[serde(default = "default_grid_size")]
    pub height: u32,

    /// Agent start cell, `[x, y]`.
    #[serde(default = "default_start")]
    pub start: Position,

    /// Items to place.
    #[serde(default)]
    pub items: Vec<ItemSeed>,

    /// Goal cell, if any.
    #[serde(default)]
    pub goal: Option<Position>,
}

impl WorldSeed {
    /// Reject seeds that cannot hold the agent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWorld`] when `width` or `height` is 0.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidWorld {
                world_id: self.world_id,
                reason: "width and height must be at least 1",
            });
        }
        Ok(())
    }

    /// Build the initial world state. Out-of-bounds items are skipped.
    pub fn build(&self) -> WorldState {
        let mut world = WorldState::new(
            self.world_id,
            &self.game_type,
            self.width,
            self.height,
            self.start,
        );
        for item in &self.items {
            match world.tile_mut(item.position) {
                Some(tile) => *tile = Tile::Item(item.item_type.clone()),
                None => warn!(
                    world_id = %self.world_id,
                    position = %item.position,
                    "seed item outside the grid, skipped"
                ),
            }
        }
        if let Some(tile) = self.goal.and_then(|g| world.tile_mut(g)) {
            *tile = Tile::Goal;
        }
        world
    }
}

/// Connection settings for an OpenAI-compatible model backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl LlmBackendConfig {
    /// Load from `LLM_API_URL`, `LLM_API_KEY`, and `LLM_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] naming the first unset variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: env_var("LLM_API_URL")?,
            api_key: env_var("LLM_API_KEY")?,
            model: env_var("LLM_MODEL")?,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_unset| ConfigError::MissingEnv(name))
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_max_turns() -> u32 {
    30
}

const fn default_max_model_retries() -> u32 {
    3
}

const fn default_event_buffer() -> usize {
    64
}

const fn default_tool_timeout_ms() -> u64 {
    5000
}

fn default_game_type() -> String {
    GRID_NAVIGATION.to_owned()
}

const fn default_grid_size() -> u32 {
    5
}

const fn default_start() -> Position {
    Position::new(0, 0)
}

fn default_item_type() -> String {
    "item".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = ArenaConfig::parse("").unwrap();
        assert_eq!(config.deployment, DeploymentConfig::default());
        assert_eq!(config.deployment.max_turns, 30);
        assert_eq!(config.deployment.max_model_retries, 3);
        assert_eq!(config.deployment.event_buffer, 64);
        assert_eq!(config.deployment.tool_timeout(), Duration::from_millis(5000));
        assert!(config.worlds.is_empty());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let yaml = r"
deployment:
  max_turns: 5
worlds:
  - world_id: 0192f0c1-0000-7000-8000-000000000001
    width: 8
    start: [2, 3]
    items:
      - position: [4, 4]
        item_type: key
    goal: [7, 4]
agents:
  - 0192f0c1-0000-7000-8000-0000000000aa
";
        let config = ArenaConfig::parse(yaml).unwrap();
        assert_eq!(config.deployment.max_turns, 5);
        assert_eq!(config.deployment.max_model_retries, 3);
        assert_eq!(config.agents.len(), 1);

        let seed = config.worlds.first().unwrap();
        assert_eq!(seed.game_type, GRID_NAVIGATION);
        assert_eq!(seed.height, 5);

        let world = seed.build();
        assert_eq!(world.width, 8);
        assert_eq!(world.agent_position, Position::new(2, 3));
        assert_eq!(world.tile(Position::new(4, 4)), Some(&Tile::Item("key".to_owned())));
        assert_eq!(world.tile(Position::new(7, 4)), Some(&Tile::Goal));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = ArenaConfig::parse("deployment: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            ArenaConfig::load_or_default(Path::new("/nonexistent/arena-config.yaml")).unwrap();
        assert_eq!(config.deployment, DeploymentConfig::default());
    }

    #[test]
    fn zero_sized_world_is_rejected_at_load() {
        let yaml = r"
worlds:
  - world_id: 0192f0c1-0000-7000-8000-000000000002
    width: 0
";
        let result = ArenaConfig::parse(yaml);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidWorld { reason, .. }) if reason.contains("at least 1")
        ));

        let yaml = r"
worlds:
  - world_id: 0192f0c1-0000-7000-8000-000000000003
    height: 0
";
        assert!(matches!(
            ArenaConfig::parse(yaml),
            Err(ConfigError::InvalidWorld { .. })
        ));
    }
}
