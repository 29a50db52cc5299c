//! Arena server entry point.
//!
//! Loads `arena-config.yaml`, seeds the world store and tool catalog,
//! selects the model backend, and serves the HTTP API.
//!
//! # Environment
//!
//! - `ARENA_CONFIG` -- config file path (default `arena-config.yaml`)
//! - `ARENA_HOST`, `ARENA_PORT` -- override the `server` section
//! - `LLM_API_URL`, `LLM_API_KEY`, `LLM_MODEL` -- model backend; without
//!   them every session replays an empty script and stops immediately
//! - `RUST_LOG` -- log filter (default `info`)

use std::path::PathBuf;
use std::sync::Arc;

use arena_deploy::{ArenaConfig, LlmBackendConfig, ModelSource};
use arena_observer::{AppState, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or the server
/// fails to bind or serve.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("arena-server starting");

    let config_path = std::env::var("ARENA_CONFIG")
        .map_or_else(|_unset| PathBuf::from("arena-config.yaml"), PathBuf::from);
    let config = ArenaConfig::load_or_default(&config_path)?;
    info!(
        path = %config_path.display(),
        bind = %config.server.bind_addr(),
        worlds = config.worlds.len(),
        agents = config.agents.len(),
        max_turns = config.deployment.max_turns,
        max_model_retries = config.deployment.max_model_retries,
        "configuration loaded"
    );

    let models = match LlmBackendConfig::from_env() {
        Ok(backend) => {
            info!(api_url = %backend.api_url, model = %backend.model, "LLM backend configured");
            ModelSource::OpenAi(backend)
        }
        Err(e) => {
            warn!(error = %e, "no LLM backend configured, sessions will use an empty script");
            ModelSource::Scripted(Vec::new())
        }
    };

    let state = Arc::new(AppState::from_config(&config, models));
    start_server(&config.server, state).await?;

    Ok(())
}
