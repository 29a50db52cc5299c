//! Static safety validation and registries for agent-generated tools.
//!
//! Agents can author their own tools as small async Python functions. This
//! crate decides which of them may be registered ([`ToolSafetyValidator`])
//! and keeps the accepted ones per agent ([`ToolRegistry`], [`ToolCatalog`]).
//! Nothing here executes tool code.

pub mod error;
pub mod registry;
pub mod safety;

pub use error::ToolError;
pub use registry::{RegisteredTool, ToolBinding, ToolCatalog, ToolRegistry};
pub use safety::{
    Advisory, AdvisoryKind, FORBIDDEN_MODULES, FORBIDDEN_PRIMITIVES, ToolSafetyValidator,
    ValidationReport, Violation, ViolationKind,
};
