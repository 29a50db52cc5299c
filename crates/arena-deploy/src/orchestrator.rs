//! The deployment loop.
//!
//! A session runs one agent against one world until the model stops, the
//! turn limit is reached, a fatal error occurs, or the client goes away:
//!
//! ```text
//! INIT -> LOADING -> RUNNING -> COMPLETED | FAILED
//!                       \-----> CANCELLED
//! ```
//!
//! The orchestrator is the only layer that turns errors into `error`
//! events. Everything it emits goes through an [`EventSink`], which
//! guarantees a single terminal event.

use std::sync::Arc;

use arena_actions::{ActionEngine, ActionSetRegistry, ExecutorRegistry};
use arena_tools::{RegisteredTool, ToolBinding, ToolCatalog, ToolRegistry};
use arena_types::{
    ActionErrorKind, ActionSchema, ActionSet, AgentId, CompletionStatus, DeploymentEvent,
    ErrorType, SessionId, WorldId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::DeploymentConfig;
use crate::error::{DeployError, StoreError};
use crate::model::{
    ModelStream, ModelTurn, Observation, ToolInvocation, ToolSpec, TurnContext, TurnItem,
};
use crate::sandbox::{NoSandbox, ToolSandbox, requested_action};
use crate::sink::{EventSink, SinkError};
use crate::world::{InMemoryWorldStore, WorldStore};

/// Tool name on observations that carry the model's own reported errors.
const MODEL_REPORT_SOURCE: &str = "model";

/// What a client asks to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Agent whose tools are loaded.
    pub agent_id: AgentId,
    /// World to act in.
    pub world_id: WorldId,
    /// Natural-language goal passed to the model.
    pub goal: String,
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created, nothing loaded.
    Init,
    /// Loading world, tools, and engine.
    Loading,
    /// Running model turns.
    Running,
    /// Ended with a `complete` event.
    Completed,
    /// Ended with a fatal `error` event.
    Failed,
    /// The client went away; no terminal event was sent.
    Cancelled,
}

impl SessionPhase {
    /// Lowercase name for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Loading => "loading",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Model turns completed.
    pub total_steps: u32,
    /// Tool invocations attempted.
    pub total_tools_used: u32,
    /// Tool invocations that succeeded.
    pub successful_tools: u32,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutcome {
    /// The session.
    pub session_id: SessionId,
    /// Final phase: completed, failed, or cancelled.
    pub phase: SessionPhase,
    /// Completion status when the session completed.
    pub status: Option<CompletionStatus>,
    /// The fatal error type when the session failed.
    pub error_type: Option<ErrorType>,
    /// Final totals.
    pub stats: SessionStats,
}

/// A session running on its own task.
#[derive(Debug)]
pub struct DeploymentHandle {
    /// The session's ID.
    pub session_id: SessionId,
    /// The session's events, in order.
    pub events: mpsc::Receiver<DeploymentEvent>,
    /// Cancels the session.
    pub cancel: CancellationToken,
    /// Resolves to the outcome when the session ends.
    pub task: JoinHandle<SessionOutcome>,
}

/// Why the loop stopped early.
#[derive(Debug)]
enum Halt {
    /// Nobody is listening any more.
    Cancelled,
    /// A fatal error.
    Fatal(DeployError),
}

impl From<SinkError> for Halt {
    fn from(_: SinkError) -> Self {
        Self::Cancelled
    }
}

impl From<DeployError> for Halt {
    fn from(err: DeployError) -> Self {
        Self::Fatal(err)
    }
}

impl From<StoreError> for Halt {
    fn from(err: StoreError) -> Self {
        Self::Fatal(err.into())
    }
}

/// Result of one tool invocation before it is reported.
enum ToolOutcome {
    Succeeded(serde_json::Value),
    Failed {
        error_type: ErrorType,
        message: String,
    },
}

/// What the loop works with once loading succeeded.
struct Loaded {
    engine: ActionEngine,
    tools: Arc<ToolRegistry>,
}

/// Runs deployment sessions.
///
/// Registries and the store are shared with the rest of the process; the
/// orchestrator holds no per-session state, so one instance serves every
/// session.
#[derive(Debug)]
pub struct DeploymentOrchestrator<S = InMemoryWorldStore, X = NoSandbox> {
    action_sets: Arc<ActionSetRegistry>,
    executors: Arc<ExecutorRegistry>,
    catalog: Arc<ToolCatalog>,
    store: Arc<S>,
    sandbox: X,
    config: DeploymentConfig,
}

impl<S> DeploymentOrchestrator<S, NoSandbox> {
    /// An orchestrator without a tool sandbox.
    pub const fn new(
        action_sets: Arc<ActionSetRegistry>,
        executors: Arc<ExecutorRegistry>,
        catalog: Arc<ToolCatalog>,
        store: Arc<S>,
        config: DeploymentConfig,
    ) -> Self {
        Self {
            action_sets,
            executors,
            catalog,
            store,
            sandbox: NoSandbox,
            config,
        }
    }
}

impl<S, X> DeploymentOrchestrator<S, X> {
    /// Replace the tool sandbox.
    pub fn with_sandbox<Y>(self, sandbox: Y) -> DeploymentOrchestrator<S, Y> {
        DeploymentOrchestrator {
            action_sets: self.action_sets,
            executors: self.executors,
            catalog: self.catalog,
            store: self.store,
            sandbox,
            config: self.config,
        }
    }

    /// The action set registry.
    pub const fn action_sets(&self) -> &Arc<ActionSetRegistry> {
        &self.action_sets
    }

    /// The tool catalog.
    pub const fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// The world store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Loop limits.
    pub const fn config(&self) -> &DeploymentConfig {
        &self.config
    }
}

impl<S, X> DeploymentOrchestrator<S, X>
where
    S: WorldStore + 'static,
    X: ToolSandbox + 'static,
{
    /// Start a session on its own task.
    ///
    /// Dropping [`DeploymentHandle::events`] or firing
    /// [`DeploymentHandle::cancel`] cancels the session.
    pub fn spawn<M>(self: &Arc<Self>, request: DeploymentRequest, model: M) -> DeploymentHandle
    where
        M: ModelStream + 'static,
    {
        let session_id = SessionId::new();
        let cancel = CancellationToken::new();
        let (sink, events) = EventSink::channel(self.config.event_buffer, cancel.clone());
        let span = info_span!(
            "deployment",
            %session_id,
            agent_id = %request.agent_id,
            world_id = %request.world_id,
        );
        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(
            async move { orchestrator.run(session_id, request, model, sink).await }.instrument(span),
        );
        DeploymentHandle {
            session_id,
            events,
            cancel,
            task,
        }
    }

    /// Run one session to its end on the current task.
    pub async fn run<M>(
        &self,
        session_id: SessionId,
        request: DeploymentRequest,
        mut model: M,
        mut sink: EventSink,
    ) -> SessionOutcome
    where
        M: ModelStream,
    {
        info!(phase = %SessionPhase::Init, goal = %request.goal, "Session created");
        let mut stats = SessionStats::default();
        let result = self
            .drive(session_id, &request, &mut model, &mut sink, &mut stats)
            .await;

        let (phase, status, error_type) = match result {
            Ok(status) => {
                let event = DeploymentEvent::complete(
                    status,
                    stats.total_steps,
                    stats.total_tools_used,
                );
                if sink.emit(event).await.is_ok() {
                    (SessionPhase::Completed, Some(status), None)
                } else {
                    (SessionPhase::Cancelled, None, None)
                }
            }
            Err(Halt::Fatal(err)) => {
                let error_type = err.error_type();
                error!(phase = %SessionPhase::Failed, %error_type, %err, "Session failed");
                let event = DeploymentEvent::error(error_type, err.to_string());
                if let Err(sink_err) = sink.emit(event).await {
                    warn!(%sink_err, "Fatal error could not be delivered");
                }
                (SessionPhase::Failed, None, Some(error_type))
            }
            Err(Halt::Cancelled) => (SessionPhase::Cancelled, None, None),
        };

        info!(
            %phase,
            status = ?status,
            total_steps = stats.total_steps,
            total_tools_used = stats.total_tools_used,
            "Session ended"
        );
        SessionOutcome {
            session_id,
            phase,
            status,
            error_type,
            stats,
        }
    }

    async fn drive<M: ModelStream>(
        &self,
        session_id: SessionId,
        request: &DeploymentRequest,
        model: &mut M,
        sink: &mut EventSink,
        stats: &mut SessionStats,
    ) -> Result<CompletionStatus, Halt> {
        // --- Loading ---
        info!(phase = %SessionPhase::Loading, "Loading session");
        let world = self.store.snapshot(request.world_id).await?;
        let tools = self
            .catalog
            .registry(request.agent_id)
            .map_err(DeployError::from)?;
        let engine =
            ActionEngine::for_game_type(&self.action_sets, &self.executors, &world.game_type)
                .map_err(DeployError::from)?;
        let loaded = Loaded { engine, tools };

        sink.emit(DeploymentEvent::progress(
            format!(
                "loaded {} world {}x{} with {} actions and {} custom tools",
                world.game_type,
                world.width,
                world.height,
                loaded.engine.action_set().actions.len(),
                loaded.tools.list().len(),
            ),
            0,
        ))
        .await?;

        // --- Running ---
        info!(phase = %SessionPhase::Running, max_turns = self.config.max_turns, "Session running");
        let mut observations = Vec::new();
        let mut goal_reached = false;

        for turn in 1..=self.config.max_turns {
            if sink.is_interrupted() {
                return Err(Halt::Cancelled);
            }
            sink.emit(DeploymentEvent::progress(format!("turn {turn}"), turn))
                .await?;

            let context = TurnContext {
                session_id,
                goal: request.goal.clone(),
                turn,
                world: self.store.snapshot(request.world_id).await?,
                tools: tool_specs(loaded.engine.action_set(), &loaded.tools),
                observations: std::mem::take(&mut observations),
            };
            let model_turn = self.next_turn(model, &context, sink).await?;
            stats.total_steps = stats.total_steps.saturating_add(1);

            for item in model_turn.items {
                if sink.is_interrupted() {
                    return Err(Halt::Cancelled);
                }
                match item {
                    TurnItem::Reasoning(text) => {
                        sink.emit(DeploymentEvent::reasoning(text)).await?;
                    }
                    TurnItem::ToolCall(invocation) => {
                        let observation = self
                            .invoke(&loaded, request.world_id, invocation, sink, stats)
                            .await?;
                        observations.push(observation);
                    }
                    TurnItem::Error(message) => {
                        warn!(turn, %message, "Model reported an error");
                        sink.emit(DeploymentEvent::error(
                            ErrorType::ModelReported,
                            message.clone(),
                        ))
                        .await?;
                        observations.push(Observation {
                            call_id: None,
                            tool_name: MODEL_REPORT_SOURCE.to_owned(),
                            output: serde_json::json!({
                                "error_type": ErrorType::ModelReported,
                                "message": message,
                            }),
                            is_error: true,
                        });
                    }
                }
            }

            if let Some(stop) = model_turn.stop {
                info!(turn, goal_reached = stop.goal_reached, "Model stopped");
                goal_reached = stop.goal_reached;
                break;
            }
            if turn == self.config.max_turns {
                info!(turn, "Turn limit reached");
            }
        }

        Ok(completion_status(goal_reached, stats))
    }

    /// Ask the model for a turn, retrying failures up to the configured
    /// bound. The request is abandoned as soon as the client goes away.
    async fn next_turn<M: ModelStream>(
        &self,
        model: &mut M,
        context: &TurnContext,
        sink: &mut EventSink,
    ) -> Result<ModelTurn, Halt> {
        let mut failures: u32 = 0;
        loop {
            let attempt = tokio::select! {
                biased;
                () = sink.interrupted() => return Err(Halt::Cancelled),
                result = model.next_turn(context) => result,
            };
            match attempt {
                Ok(turn) => return Ok(turn),
                Err(err) if failures < self.config.max_model_retries => {
                    failures = failures.saturating_add(1);
                    warn!(
                        turn = context.turn,
                        attempt = failures,
                        max_retries = self.config.max_model_retries,
                        %err,
                        "Model turn failed, retrying"
                    );
                    sink.emit(DeploymentEvent::error(
                        ErrorType::ModelError,
                        format!("model call failed (retry {failures}): {err}"),
                    ))
                    .await?;
                }
                Err(err) => {
                    return Err(Halt::Fatal(DeployError::ModelFailure {
                        attempts: failures.saturating_add(1),
                        source: err,
                    }));
                }
            }
        }
    }

    /// Resolve and run one tool invocation, reporting the outcome.
    async fn invoke(
        &self,
        loaded: &Loaded,
        world_id: WorldId,
        invocation: ToolInvocation,
        sink: &mut EventSink,
        stats: &mut SessionStats,
    ) -> Result<Observation, Halt> {
        let ToolInvocation {
            call_id,
            tool_name,
            parameters,
        } = invocation;
        stats.total_tools_used = stats.total_tools_used.saturating_add(1);
        info!(%tool_name, "Tool call");
        sink.emit(DeploymentEvent::tool_call(&tool_name, parameters.clone()))
            .await?;

        let outcome = if loaded.engine.action_set().action(&tool_name).is_some() {
            self.execute_action(&loaded.engine, world_id, &tool_name, &parameters, sink)
                .await?
        } else if let Some(tool) = loaded.tools.get(&tool_name) {
            match tool.binding() {
                ToolBinding::Action { action_id } => {
                    self.execute_action(&loaded.engine, world_id, &action_id, &parameters, sink)
                        .await?
                }
                ToolBinding::Sandbox => {
                    self.run_sandboxed(&loaded.engine, world_id, &tool, &parameters, sink)
                        .await?
                }
            }
        } else {
            ToolOutcome::Failed {
                error_type: ErrorType::UnknownTool,
                message: format!("unknown tool: {tool_name}"),
            }
        };

        match outcome {
            ToolOutcome::Succeeded(output) => {
                stats.successful_tools = stats.successful_tools.saturating_add(1);
                sink.emit(DeploymentEvent::tool_result(&tool_name, output.clone()))
                    .await?;
                Ok(Observation {
                    call_id,
                    tool_name,
                    output,
                    is_error: false,
                })
            }
            ToolOutcome::Failed {
                error_type,
                message,
            } => {
                warn!(%tool_name, %error_type, %message, "Tool call failed");
                sink.emit(DeploymentEvent::error(error_type, message.clone()))
                    .await?;
                Ok(Observation {
                    call_id,
                    tool_name,
                    output: serde_json::json!({"error_type": error_type, "message": message}),
                    is_error: true,
                })
            }
        }
    }

    /// Run an action inside the store's critical section. A success emits
    /// its `world_update` here, before the caller's `tool_result`.
    async fn execute_action(
        &self,
        engine: &ActionEngine,
        world_id: WorldId,
        action_id: &str,
        parameters: &serde_json::Value,
        sink: &mut EventSink,
    ) -> Result<ToolOutcome, Halt> {
        let result = self
            .store
            .transact(world_id, |world| engine.execute_action(action_id, parameters, world))
            .await?;

        if !result.success() {
            let error_type = result
                .error_kind()
                .map_or(ErrorType::InvalidParameters, action_error_type);
            let message = result.error().unwrap_or_else(|| result.message()).to_owned();
            return Ok(ToolOutcome::Failed {
                error_type,
                message,
            });
        }

        let output = serde_json::json!({
            "action_id": action_id,
            "message": result.message(),
            "state_delta": result.state_delta(),
        });
        sink.emit(DeploymentEvent::world_update(result.into_delta()))
            .await?;
        Ok(ToolOutcome::Succeeded(output))
    }

    /// Run an unbound tool in the sandbox under the configured timeout. An
    /// `action` object in its output is executed as a game action.
    async fn run_sandboxed(
        &self,
        engine: &ActionEngine,
        world_id: WorldId,
        tool: &RegisteredTool,
        parameters: &serde_json::Value,
        sink: &mut EventSink,
    ) -> Result<ToolOutcome, Halt> {
        let timeout = self.config.tool_timeout();
        let output = match tokio::time::timeout(timeout, self.sandbox.run(tool, parameters)).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Ok(ToolOutcome::Failed {
                    error_type: ErrorType::ToolExecutionFailed,
                    message: err.to_string(),
                });
            }
            Err(_elapsed) => {
                return Ok(ToolOutcome::Failed {
                    error_type: ErrorType::ToolExecutionFailed,
                    message: format!(
                        "tool {} timed out after {} ms",
                        tool.name(),
                        self.config.tool_timeout_ms
                    ),
                });
            }
        };

        let Some(action) = requested_action(&output) else {
            return Ok(ToolOutcome::Succeeded(output));
        };
        match self
            .execute_action(engine, world_id, &action.action_id, &action.parameters, sink)
            .await?
        {
            ToolOutcome::Succeeded(_) => Ok(ToolOutcome::Succeeded(output)),
            failed @ ToolOutcome::Failed { .. } => Ok(failed),
        }
    }
}

/// Tool specs for a turn: every action, then every custom tool whose name
/// an action does not already take.
///
/// Action-bound tools advertise the bound action's parameters.
pub fn tool_specs(action_set: &ActionSet, tools: &ToolRegistry) -> Vec<ToolSpec> {
    let mut specs: Vec<ToolSpec> = action_set.actions.iter().map(ToolSpec::from_action).collect();
    for tool in tools.tools() {
        if action_set.action(tool.name()).is_some() {
            continue;
        }
        let parameters = match tool.binding() {
            ToolBinding::Action { action_id } => action_set
                .action(&action_id)
                .map_or_else(open_parameters, ActionSchema::to_json_schema),
            ToolBinding::Sandbox => open_parameters(),
        };
        specs.push(ToolSpec {
            name: tool.name().to_owned(),
            description: tool.description().to_owned(),
            parameters,
        });
    }
    specs
}

fn open_parameters() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

const fn action_error_type(kind: ActionErrorKind) -> ErrorType {
    match kind {
        ActionErrorKind::UnknownAction => ErrorType::UnknownAction,
        ActionErrorKind::InvalidParameters => ErrorType::InvalidParameters,
        ActionErrorKind::NotImplemented => ErrorType::NotImplemented,
    }
}

/// `success` when the model reported the goal reached, `partial` after at
/// least one successful tool use, `failed` otherwise.
pub const fn completion_status(goal_reached: bool, stats: &SessionStats) -> CompletionStatus {
    if goal_reached {
        CompletionStatus::Success
    } else if stats.successful_tools > 0 {
        CompletionStatus::Partial
    } else {
        CompletionStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_rules() {
        let idle = SessionStats::default();
        let busy = SessionStats {
            total_steps: 3,
            total_tools_used: 2,
            successful_tools: 1,
        };
        assert_eq!(completion_status(true, &idle), CompletionStatus::Success);
        assert_eq!(completion_status(false, &busy), CompletionStatus::Partial);
        assert_eq!(completion_status(false, &idle), CompletionStatus::Failed);
    }

    #[test]
    fn action_error_kinds_map_to_error_types() {
        assert_eq!(
            action_error_type(ActionErrorKind::UnknownAction),
            ErrorType::UnknownAction
        );
        assert!(!action_error_type(ActionErrorKind::InvalidParameters).is_fatal());
        assert!(!action_error_type(ActionErrorKind::NotImplemented).is_fatal());
    }
}
