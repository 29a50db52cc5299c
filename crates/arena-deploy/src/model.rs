//! The model seam: what the deployment loop asks of a tool-calling model.
//!
//! Each turn the orchestrator hands the model a [`TurnContext`] and gets back
//! a [`ModelTurn`]: reasoning text, tool invocations, model-reported errors,
//! and possibly a stop signal. [`ModelStream`] is implemented by the
//! OpenAI-compatible backend and by [`ScriptedModel`]; [`AgentModel`] picks
//! between them at runtime.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use arena_types::{ActionSchema, SessionId, WorldState};
use serde::Serialize;

use crate::config::LlmBackendConfig;
use crate::error::ModelError;
use crate::llm::OpenAiToolModel;

/// A callable tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    /// Name the model calls it by.
    pub name: String,
    /// What it does.
    pub description: String,
    /// JSON-Schema `object` describing its arguments.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// The spec for a game action.
    pub fn from_action(schema: &ActionSchema) -> Self {
        Self {
            name: schema.action_id.clone(),
            description: schema.description.clone(),
            parameters: schema.to_json_schema(),
        }
    }
}

/// The outcome of one tool invocation, fed back on the next turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// The model's identifier for the call it answers, if it gave one.
    pub call_id: Option<String>,
    /// Tool that was invoked.
    pub tool_name: String,
    /// Raw tool output, or the error payload.
    pub output: serde_json::Value,
    /// Whether the invocation failed.
    pub is_error: bool,
}

/// Everything the model sees for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnContext {
    /// The session being run.
    pub session_id: SessionId,
    /// The goal the agent was deployed with.
    pub goal: String,
    /// 1-based turn number.
    pub turn: u32,
    /// Fresh snapshot of the world.
    pub world: WorldState,
    /// Tools the model may call.
    pub tools: Vec<ToolSpec>,
    /// Results of the previous turn's invocations.
    pub observations: Vec<Observation>,
}

/// A tool call proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    /// The model's identifier for this call.
    pub call_id: Option<String>,
    /// Name of the tool or action.
    pub tool_name: String,
    /// Arguments as given.
    pub parameters: serde_json::Value,
}

/// One element of a model turn, in the order the model produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnItem {
    /// Free-text reasoning.
    Reasoning(String),
    /// A tool invocation.
    ToolCall(ToolInvocation),
    /// An error the model reported about itself.
    Error(String),
}

impl TurnItem {
    /// A tool call without a call ID.
    pub fn tool_call(tool_name: &str, parameters: serde_json::Value) -> Self {
        Self::ToolCall(ToolInvocation {
            call_id: None,
            tool_name: tool_name.to_owned(),
            parameters,
        })
    }

    /// Reasoning text.
    pub fn reasoning(text: &str) -> Self {
        Self::Reasoning(text.to_owned())
    }
}

/// The model asked to end the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopSignal {
    /// Whether it believes the goal was reached.
    pub goal_reached: bool,
}

/// Everything the model produced in one turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelTurn {
    /// Items in production order.
    pub items: Vec<TurnItem>,
    /// Present when the model wants to stop after this turn.
    pub stop: Option<StopSignal>,
}

impl ModelTurn {
    /// A turn that continues the session.
    pub const fn new(items: Vec<TurnItem>) -> Self {
        Self { items, stop: None }
    }

    /// A turn with no items that ends the session.
    pub const fn stop(goal_reached: bool) -> Self {
        Self {
            items: Vec::new(),
            stop: Some(StopSignal { goal_reached }),
        }
    }

    /// Attach a stop signal.
    #[must_use]
    pub const fn with_stop(mut self, goal_reached: bool) -> Self {
        self.stop = Some(StopSignal { goal_reached });
        self
    }
}

/// A tool-calling model, driven one turn at a time.
pub trait ModelStream: Send {
    /// Produce the next turn for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when no turn could be produced. The caller may
    /// retry with the same context.
    fn next_turn(
        &mut self,
        context: &TurnContext,
    ) -> impl Future<Output = Result<ModelTurn, ModelError>> + Send;
}

/// Contexts a [`ScriptedModel`] was called with, shared with the caller.
pub type ContextLog = Arc<Mutex<Vec<TurnContext>>>;

/// A model that replays a fixed script. Used for tests and for running the
/// server without an LLM backend.
///
/// Once the script is exhausted every turn is a stop without the goal.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    script: VecDeque<Result<ModelTurn, ModelError>>,
    contexts: ContextLog,
}

impl ScriptedModel {
    /// A model that plays `script` in order.
    pub fn new(script: impl IntoIterator<Item = Result<ModelTurn, ModelError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            contexts: ContextLog::default(),
        }
    }

    /// Handle to every context the model has been called with.
    pub fn context_log(&self) -> ContextLog {
        Arc::clone(&self.contexts)
    }
}

impl ModelStream for ScriptedModel {
    async fn next_turn(&mut self, context: &TurnContext) -> Result<ModelTurn, ModelError> {
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(context.clone());
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(ModelTurn::stop(false)))
    }
}

/// A model selected at runtime.
///
/// Uses enum dispatch because [`ModelStream`] is not dyn-compatible.
#[derive(Debug)]
pub enum AgentModel {
    /// OpenAI-compatible chat completions.
    OpenAi(OpenAiToolModel),
    /// Replays a script.
    Scripted(ScriptedModel),
}

impl AgentModel {
    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Scripted(_) => "scripted",
        }
    }
}

impl ModelStream for AgentModel {
    async fn next_turn(&mut self, context: &TurnContext) -> Result<ModelTurn, ModelError> {
        match self {
            Self::OpenAi(model) => model.next_turn(context).await,
            Self::Scripted(model) => model.next_turn(context).await,
        }
    }
}

/// Creates a fresh model for each deployment.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// A new OpenAI-compatible conversation per session.
    OpenAi(LlmBackendConfig),
    /// Every session replays the same script.
    Scripted(Vec<Result<ModelTurn, ModelError>>),
}

impl ModelSource {
    /// Build the model for one session.
    pub fn create(&self) -> AgentModel {
        match self {
            Self::OpenAi(config) => AgentModel::OpenAi(OpenAiToolModel::new(config)),
            Self::Scripted(script) => AgentModel::Scripted(ScriptedModel::new(script.clone())),
        }
    }
}
