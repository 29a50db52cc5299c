//! Registries of validated tools.
//!
//! A [`ToolRegistry`] holds one agent's tools keyed by name. The
//! [`ToolCatalog`] maps enrolled agents to their registries. Tools only
//! enter a registry after [`ToolSafetyValidator`] accepts their source, and
//! a rejected registration leaves the registry untouched.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use arena_types::{AgentId, ToolCode};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ToolError;
use crate::safety::{ToolSafetyValidator, ValidationReport};

/// How a registered tool is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolBinding {
    /// Its arguments drive the named game action.
    Action {
        /// The bound action.
        action_id: String,
    },
    /// Its source runs in the tool sandbox.
    Sandbox,
}

/// A tool that passed validation.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredTool {
    /// The submitted tool.
    pub code: ToolCode,
    /// What the validator reported.
    pub report: ValidationReport,
}

impl RegisteredTool {
    /// The tool's name.
    pub fn name(&self) -> &str {
        &self.code.tool_name
    }

    /// Description shown to the model.
    pub fn description(&self) -> &str {
        &self.code.explanation
    }

    /// How calls to this tool are executed.
    pub fn binding(&self) -> ToolBinding {
        match &self.code.action_id {
            Some(action_id) => ToolBinding::Action {
                action_id: action_id.clone(),
            },
            None => ToolBinding::Sandbox,
        }
    }
}

/// One agent's validated tools.
#[derive(Debug)]
pub struct ToolRegistry {
    validator: Arc<ToolSafetyValidator>,
    tools: RwLock<BTreeMap<String, Arc<RegisteredTool>>>,
}

impl ToolRegistry {
    /// An empty registry using `validator`.
    pub fn new(validator: Arc<ToolSafetyValidator>) -> Self {
        Self {
            validator,
            tools: RwLock::new(BTreeMap::new()),
        }
    }

    /// Validate and register `code`. A tool with the same name is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Rejected`] with the violation when validation
    /// fails; the registry is unchanged.
    pub fn register(&self, code: ToolCode) -> Result<Arc<RegisteredTool>, ToolError> {
        let report = match self.validator.validate(&code.code, &code.tool_name) {
            Ok(report) => report,
            Err(violation) => {
                warn!(
                    tool_name = %code.tool_name,
                    kind = %violation.kind,
                    %violation,
                    "tool rejected"
                );
                return Err(ToolError::Rejected {
                    tool_name: code.tool_name,
                    violation,
                });
            }
        };

        let tool = Arc::new(RegisteredTool { code, report });
        let replaced = self
            .tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tool.name().to_owned(), Arc::clone(&tool))
            .is_some();
        info!(
            tool_name = tool.name(),
            replaced,
            advisories = tool.report.advisories.len(),
            "tool registered"
        );
        Ok(tool)
    }

    /// Look up a tool by name.
    pub fn get(&self, tool_name: &str) -> Option<Arc<RegisteredTool>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tool_name)
            .cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Every registered tool, sorted by name.
    pub fn tools(&self) -> Vec<Arc<RegisteredTool>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

/// Per-agent tool registries.
#[derive(Debug)]
pub struct ToolCatalog {
    validator: Arc<ToolSafetyValidator>,
    agents: RwLock<BTreeMap<AgentId, Arc<ToolRegistry>>>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new(Arc::new(ToolSafetyValidator::new()))
    }
}

impl ToolCatalog {
    /// An empty catalog whose registries share `validator`.
    pub fn new(validator: Arc<ToolSafetyValidator>) -> Self {
        Self {
            validator,
            agents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Enrol `agent_id`, returning its registry. Enrolling twice is a no-op.
    pub fn enroll(&self, agent_id: AgentId) -> Arc<ToolRegistry> {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(agents.entry(agent_id).or_insert_with(|| {
            info!(%agent_id, "agent enrolled");
            Arc::new(ToolRegistry::new(Arc::clone(&self.validator)))
        }))
    }

    /// The registry for an enrolled agent.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::AgentNotFound`] if the agent was never enrolled.
    pub fn registry(&self, agent_id: AgentId) -> Result<Arc<ToolRegistry>, ToolError> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&agent_id)
            .cloned()
            .ok_or(ToolError::AgentNotFound(agent_id))
    }

    /// The validator shared by every registry.
    pub fn validator(&self) -> &ToolSafetyValidator {
        &self.validator
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::safety::ViolationKind;

    fn tool(name: &str, body: &str, action_id: Option<&str>) -> ToolCode {
        ToolCode {
            tool_name: name.to_owned(),
            code: format!("@tool\nasync def {name}(params):\n    {body}\n"),
            explanation: format!("{name} tool"),
            action_id: action_id.map(str::to_owned),
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(ToolSafetyValidator::new()))
    }

    #[test]
    fn register_then_get() {
        let registry = registry();
        let registered = registry.register(tool("scan", "return 1", None)).unwrap();
        assert_eq!(registered.name(), "scan");
        assert_eq!(registered.binding(), ToolBinding::Sandbox);
        assert!(registry.get("scan").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn rejection_changes_nothing() {
        let registry = registry();
        registry.register(tool("scan", "return 1", None)).unwrap();

        let err = registry.register(tool("scan", "return eval('1')", None)).unwrap_err();
        assert!(matches!(
            err,
            ToolError::Rejected { ref violation, .. } if violation.kind == ViolationKind::ForbiddenPrimitive
        ));
        // The earlier, valid definition is still in place.
        let kept = registry.get("scan").unwrap();
        assert!(kept.code.code.contains("return 1"));
    }

    #[test]
    fn last_write_wins() {
        let registry = registry();
        registry.register(tool("step", "return 1", None)).unwrap();
        registry.register(tool("step", "return 2", Some("move"))).unwrap();
        let tool = registry.get("step").unwrap();
        assert_eq!(
            tool.binding(),
            ToolBinding::Action {
                action_id: "move".to_owned()
            }
        );
        assert_eq!(registry.list(), vec!["step".to_owned()]);
    }

    #[test]
    fn list_is_sorted() {
        let registry = registry();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(tool(name, "return 1", None)).unwrap();
        }
        assert_eq!(registry.list(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn catalog_requires_enrollment() {
        let catalog = ToolCatalog::default();
        let agent = AgentId::new();
        assert!(matches!(catalog.registry(agent), Err(ToolError::AgentNotFound(a)) if a == agent));

        let registry = catalog.enroll(agent);
        registry.register(tool("scan", "return 1", None)).unwrap();

        // Enrolling again keeps the existing registry.
        let again = catalog.enroll(agent);
        assert_eq!(again.list(), vec!["scan".to_owned()]);
        assert!(Arc::ptr_eq(&registry, &again));
    }
}
