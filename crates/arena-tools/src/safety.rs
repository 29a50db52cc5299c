//! Static safety validation for generated tool source.
//!
//! Tool code is Python. The validator parses it with the tree-sitter Python
//! grammar and walks the syntax tree; it never executes or rewrites the
//! source. Checks run in a fixed order and stop at the first violation:
//!
//! 1. Syntax -- any error or missing node in the parse tree, plus what the
//!    grammar tolerates but Python 3 rejects (Python 2 `print` and `<>`,
//!    `return` outside a function, a repeated parameter name).
//! 2. References -- imports of forbidden modules (or any dotted prefix of
//!    one, aliased or not) and any reference to a dynamic-evaluation or
//!    interpreter-escape primitive such as `eval` or `__builtins__`.
//! 3. Declaration -- some top-level function carries a `@tool` decorator.
//! 4. Names -- exactly one top-level `async def`, decorated, named exactly
//!    like the tool; a string name given to the decorator must agree.
//! 5. Return -- advisory only; a body without `return` is flagged in the
//!    report but accepted.
//!
//! Static analysis is not a sandbox. Accepted code is still untrusted.

use std::collections::BTreeSet;

use serde::Serialize;
use tree_sitter::{Node, Parser};

/// Modules a tool may not import, including any submodule.
pub const FORBIDDEN_MODULES: &[&str] = &[
    "os",
    "subprocess",
    "sys",
    "shutil",
    "importlib",
    "builtins",
    "ctypes",
    "socket",
    "pickle",
    "marshal",
    "multiprocessing",
    "pty",
    "signal",
    "code",
    "runpy",
];

/// Names a tool may not reference at all.
pub const FORBIDDEN_PRIMITIVES: &[&str] = &[
    "eval",
    "exec",
    "compile",
    "__import__",
    "__builtins__",
    "globals",
    "vars",
    "breakpoint",
];

/// Decorator that declares a function as a tool.
pub const TOOL_MARKER: &str = "tool";

/// Category of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The source does not parse.
    SyntaxError,
    /// A forbidden module is imported.
    ForbiddenImport,
    /// A dynamic-evaluation primitive is referenced.
    ForbiddenPrimitive,
    /// No function carries the tool decorator.
    MissingDeclaration,
    /// Wrong number of async functions, or the async one is undecorated.
    InvalidStructure,
    /// The function or decorator name differs from the tool name.
    NameMismatch,
    /// The Python grammar could not be loaded.
    ParserUnavailable,
}

impl ViolationKind {
    /// Wire name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SyntaxError => "syntax_error",
            Self::ForbiddenImport => "forbidden_import",
            Self::ForbiddenPrimitive => "forbidden_primitive",
            Self::MissingDeclaration => "missing_declaration",
            Self::InvalidStructure => "invalid_structure",
            Self::NameMismatch => "name_mismatch",
            Self::ParserUnavailable => "parser_unavailable",
        }
    }
}

impl core::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a tool source was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Violation {
    /// Rejection category.
    pub kind: ViolationKind,
    /// Human-readable explanation.
    pub message: String,
    /// 1-based line of the offending node, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based column of the offending node, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    fn at(kind: ViolationKind, message: impl Into<String>, node: Node<'_>) -> Self {
        let pos = node.start_position();
        Self {
            kind,
            message: message.into(),
            line: Some(pos.row.saturating_add(1)),
            column: Some(pos.column.saturating_add(1)),
        }
    }
}

/// Category of a non-blocking finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    /// The tool function has no `return` statement.
    MissingReturn,
}

/// A finding that does not block registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    /// Finding category.
    pub kind: AdvisoryKind,
    /// Human-readable explanation.
    pub message: String,
}

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Name of the accepted tool function.
    pub function_name: String,
    /// Non-blocking findings.
    pub advisories: Vec<Advisory>,
}

/// A top-level function definition and what its decorators say.
struct FunctionDef<'tree> {
    node: Node<'tree>,
    name: String,
    is_async: bool,
    marker: Option<Marker>,
}

/// A `@tool` decorator. `declared_name` is its string argument, if any.
struct Marker {
    declared_name: Option<String>,
}

/// Validates tool source against a forbidden-module and primitive list.
#[derive(Debug, Clone)]
pub struct ToolSafetyValidator {
    forbidden_modules: BTreeSet<String>,
    forbidden_primitives: BTreeSet<String>,
}

impl Default for ToolSafetyValidator {
    fn default() -> Self {
        Self {
            forbidden_modules: FORBIDDEN_MODULES.iter().map(|m| (*m).to_owned()).collect(),
            forbidden_primitives: FORBIDDEN_PRIMITIVES.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

impl ToolSafetyValidator {
    /// A validator with the standard forbidden lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `source` as the implementation of `expected_tool_name`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] found, in check order.
    pub fn validate(
        &self,
        source: &str,
        expected_tool_name: &str,
    ) -> Result<ValidationReport, Violation> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| Violation::new(ViolationKind::ParserUnavailable, e.to_string()))?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            Violation::new(ViolationKind::ParserUnavailable, "parser produced no tree")
        })?;
        let root = tree.root_node();
        let src = source.as_bytes();

        check_syntax(root, src)?;
        check_python3(root, src)?;
        self.check_references(root, src)?;
        let function = find_tool_function(root, src, expected_tool_name)?;

        let mut advisories = Vec::new();
        if !has_return(function.node) {
            advisories.push(Advisory {
                kind: AdvisoryKind::MissingReturn,
                message: format!("function {} never returns a value", function.name),
            });
        }

        Ok(ValidationReport {
            function_name: function.name,
            advisories,
        })
    }

    /// First forbidden module among `module` and its dotted prefixes.
    fn forbidden_prefix(&self, module: &str) -> Option<String> {
        let mut prefix = String::new();
        for segment in module.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            if self.forbidden_modules.contains(&prefix) {
                return Some(prefix);
            }
        }
        None
    }

    fn check_module(&self, name_node: Node<'_>, src: &[u8]) -> Result<(), Violation> {
        let module = module_name(name_node, src);
        match self.forbidden_prefix(&module) {
            Some(hit) => Err(Violation::at(
                ViolationKind::ForbiddenImport,
                format!("import of forbidden module {hit} ({module})"),
                name_node,
            )),
            None => Ok(()),
        }
    }

    fn check_references(&self, root: Node<'_>, src: &[u8]) -> Result<(), Violation> {
        for node in preorder(root) {
            match node.kind() {
                "import_statement" => {
                    let mut cursor = node.walk();
                    for name in node.children_by_field_name("name", &mut cursor) {
                        self.check_module(name, src)?;
                    }
                }
                "import_from_statement" => {
                    if let Some(module) = node.child_by_field_name("module_name") {
                        self.check_module(module, src)?;
                    }
                }
                "exec_statement" => {
                    return Err(Violation::at(
                        ViolationKind::ForbiddenPrimitive,
                        "use of exec",
                        node,
                    ));
                }
                "identifier" => {
                    let text = text_of(node, src);
                    if self.forbidden_primitives.contains(text) && is_reference(node) {
                        return Err(Violation::at(
                            ViolationKind::ForbiddenPrimitive,
                            format!("reference to forbidden primitive {text}"),
                            node,
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Nodes of the tree in document order.
fn preorder(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let count = node.child_count();
        stack.extend((0..count).rev().filter_map(|i| node.child(i)));
    }
    out
}

fn text_of<'s>(node: Node<'_>, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or_default()
}

/// Dotted module path with any interior whitespace removed.
fn module_name(node: Node<'_>, src: &[u8]) -> String {
    let target = match node.kind() {
        "aliased_import" => node.child_by_field_name("name").unwrap_or(node),
        "relative_import" => {
            let mut cursor = node.walk();
            let dotted = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "dotted_name");
            match dotted {
                Some(d) => d,
                None => return String::new(),
            }
        }
        _ => node,
    };
    text_of(target, src).split_whitespace().collect()
}

/// Whether an identifier is a name reference rather than an attribute
/// name (`re.compile`) or a keyword argument name (`f(compile=1)`).
fn is_reference(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return true;
    };
    let field = match parent.kind() {
        "attribute" => "attribute",
        "keyword_argument" => "name",
        _ => return true,
    };
    parent.child_by_field_name(field) != Some(node)
}

fn check_syntax(root: Node<'_>, src: &[u8]) -> Result<(), Violation> {
    if !root.has_error() {
        return Ok(());
    }
    let bad = preorder(root)
        .into_iter()
        .find(|n| n.is_error() || n.is_missing())
        .unwrap_or(root);
    let message = if bad.is_missing() {
        format!("missing {}", bad.kind())
    } else {
        let line = text_of(bad, src).lines().next().unwrap_or_default();
        let snippet: String = line.chars().take(40).collect();
        format!("invalid syntax near {snippet:?}")
    };
    Err(Violation::at(ViolationKind::SyntaxError, message, bad))
}

/// Constructs the grammar parses without error but Python 3 rejects:
/// Python 2 `print` statements and `<>`, `return` outside a function, and
/// a parameter name used twice.
fn check_python3(root: Node<'_>, src: &[u8]) -> Result<(), Violation> {
    for node in preorder(root) {
        match node.kind() {
            "print_statement" => {
                return Err(Violation::at(
                    ViolationKind::SyntaxError,
                    "print statement (Python 2 syntax)",
                    node,
                ));
            }
            "<>" => {
                return Err(Violation::at(
                    ViolationKind::SyntaxError,
                    "operator <> (Python 2 syntax)",
                    node,
                ));
            }
            "return_statement" if !inside_function(node) => {
                return Err(Violation::at(
                    ViolationKind::SyntaxError,
                    "return outside function",
                    node,
                ));
            }
            "parameters" | "lambda_parameters" => check_parameter_names(node, src)?,
            _ => {}
        }
    }
    Ok(())
}

fn inside_function(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if ancestor.kind() == "function_definition" {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

fn check_parameter_names(params: Node<'_>, src: &[u8]) -> Result<(), Violation> {
    let mut seen = BTreeSet::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        if let Some(name) = parameter_name(param, src)
            && !seen.insert(name)
        {
            return Err(Violation::at(
                ViolationKind::SyntaxError,
                format!("duplicate argument {name} in function definition"),
                param,
            ));
        }
    }
    Ok(())
}

/// The name bound by one entry of a parameter list.
fn parameter_name<'s>(param: Node<'_>, src: &'s [u8]) -> Option<&'s str> {
    match param.kind() {
        "identifier" => Some(text_of(param, src)),
        "default_parameter" | "typed_default_parameter" => {
            param.child_by_field_name("name").map(|n| text_of(n, src))
        }
        "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
            let mut cursor = param.walk();
            let inner = param.named_children(&mut cursor).next()?;
            parameter_name(inner, src)
        }
        _ => None,
    }
}

/// Literal text of a plain string node (no interpolation).
fn string_literal(node: Node<'_>, src: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let mut cursor = node.walk();
    let mut out = String::new();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_content" => out.push_str(text_of(child, src)),
            "interpolation" => return None,
            _ => {}
        }
    }
    Some(out)
}

/// Whether `expr` names the marker: `tool` or `<anything>.tool`.
fn names_marker(expr: Node<'_>, src: &[u8]) -> bool {
    match expr.kind() {
        "identifier" => text_of(expr, src) == TOOL_MARKER,
        "attribute" => expr
            .child_by_field_name("attribute")
            .is_some_and(|a| text_of(a, src) == TOOL_MARKER),
        _ => false,
    }
}

/// Interpret one decorator as a tool marker.
fn marker_of(decorator: Node<'_>, src: &[u8]) -> Option<Marker> {
    let mut cursor = decorator.walk();
    let expr = decorator
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if names_marker(expr, src) {
        return Some(Marker { declared_name: None });
    }
    if expr.kind() != "call" {
        return None;
    }
    let function = expr.child_by_field_name("function")?;
    if !names_marker(function, src) {
        return None;
    }

    let mut declared_name = None;
    if let Some(args) = expr.child_by_field_name("arguments") {
        let mut cursor = args.walk();
        let mut positional_seen = false;
        for arg in args.named_children(&mut cursor) {
            match arg.kind() {
                "comment" => {}
                "keyword_argument" => {
                    let is_name = arg
                        .child_by_field_name("name")
                        .is_some_and(|n| text_of(n, src) == "name");
                    if is_name && declared_name.is_none() {
                        declared_name = arg
                            .child_by_field_name("value")
                            .and_then(|v| string_literal(v, src));
                    }
                }
                _ if !positional_seen => {
                    positional_seen = true;
                    if let Some(s) = string_literal(arg, src) {
                        declared_name = Some(s);
                    }
                }
                _ => {}
            }
        }
    }
    Some(Marker { declared_name })
}

/// Top-level function definitions with their decorators interpreted.
fn top_level_functions<'tree>(root: Node<'tree>, src: &[u8]) -> Vec<FunctionDef<'tree>> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        let (node, marker) = match stmt.kind() {
            "function_definition" => (stmt, None),
            "decorated_definition" => {
                let Some(def) = stmt.child_by_field_name("definition") else {
                    continue;
                };
                if def.kind() != "function_definition" {
                    continue;
                }
                let mut dc = stmt.walk();
                let marker = stmt
                    .named_children(&mut dc)
                    .filter(|c| c.kind() == "decorator")
                    .find_map(|d| marker_of(d, src));
                (def, marker)
            }
            _ => continue,
        };
        let name = node
            .child_by_field_name("name")
            .map(|n| text_of(n, src).to_owned())
            .unwrap_or_default();
        let is_async = node.child(0).is_some_and(|c| c.kind() == "async");
        out.push(FunctionDef {
            node,
            name,
            is_async,
            marker,
        });
    }
    out
}

fn find_tool_function<'tree>(
    root: Node<'tree>,
    src: &[u8],
    expected: &str,
) -> Result<FunctionDef<'tree>, Violation> {
    let functions = top_level_functions(root, src);
    if !functions.iter().any(|f| f.marker.is_some()) {
        return Err(Violation::new(
            ViolationKind::MissingDeclaration,
            format!("no top-level function is decorated with @{TOOL_MARKER}"),
        ));
    }

    let mut async_defs: Vec<FunctionDef<'tree>> =
        functions.into_iter().filter(|f| f.is_async).collect();
    if async_defs.len() != 1 {
        return Err(Violation::new(
            ViolationKind::InvalidStructure,
            format!(
                "expected exactly one top-level async function, found {}",
                async_defs.len()
            ),
        ));
    }
    let Some(function) = async_defs.pop() else {
        return Err(Violation::new(ViolationKind::InvalidStructure, "no async function"));
    };

    let Some(marker) = &function.marker else {
        return Err(Violation::at(
            ViolationKind::InvalidStructure,
            format!("async function {} is not decorated with @{TOOL_MARKER}", function.name),
            function.node,
        ));
    };
    if function.name != expected {
        return Err(Violation::at(
            ViolationKind::NameMismatch,
            format!("function is named {} but the tool is {expected}", function.name),
            function.node,
        ));
    }
    if let Some(declared) = marker.declared_name.as_deref().filter(|d| *d != expected) {
        return Err(Violation::at(
            ViolationKind::NameMismatch,
            format!("decorator declares {declared} but the tool is {expected}"),
            function.node,
        ));
    }
    Ok(function)
}

/// Whether a function body returns, ignoring nested scopes.
fn has_return(function: Node<'_>) -> bool {
    let Some(body) = function.child_by_field_name("body") else {
        return false;
    };
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "return_statement" => return true,
            "function_definition" | "class_definition" | "lambda" => continue,
            _ => {}
        }
        let count = node.child_count();
        stack.extend((0..count).filter_map(|i| node.child(i)));
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VALID: &str = r#"
import math

@tool("distance")
async def distance(params):
    """Manhattan distance to a target."""
    dx = abs(params["x"])
    dy = abs(params["y"])
    return {"content": str(math.floor(dx + dy))}
"#;

    fn check(source: &str, name: &str) -> Result<ValidationReport, Violation> {
        ToolSafetyValidator::new().validate(source, name)
    }

    fn kind_of(source: &str, name: &str) -> ViolationKind {
        check(source, name).unwrap_err().kind
    }

    #[test]
    fn accepts_valid_tool() {
        let report = check(VALID, "distance").unwrap();
        assert_eq!(report.function_name, "distance");
        assert!(report.advisories.is_empty());
    }

    #[test]
    fn syntax_error_has_position() {
        let err = check("@tool\nasync def broken(:\n    return 1\n", "broken").unwrap_err();
        assert_eq!(err.kind, ViolationKind::SyntaxError);
        assert!(err.line.is_some());
    }

    #[test]
    fn rejects_forbidden_imports_even_aliased() {
        for src in [
            "import os\n@tool\nasync def t(p):\n    return 1\n",
            "import subprocess as sp\n@tool\nasync def t(p):\n    return 1\n",
            "from os import system\n@tool\nasync def t(p):\n    return 1\n",
            "import os.path\n@tool\nasync def t(p):\n    return 1\n",
            "@tool\nasync def t(p):\n    import pickle\n    return 1\n",
            "import json, socket\n@tool\nasync def t(p):\n    return 1\n",
        ] {
            assert_eq!(kind_of(src, "t"), ViolationKind::ForbiddenImport, "{src}");
        }
    }

    #[test]
    fn module_prefix_match_is_by_segment() {
        // `osmosis` is not `os`.
        let src = "import osmosis\n@tool\nasync def t(p):\n    return 1\n";
        assert!(check(src, "t").is_ok());
    }

    #[test]
    fn rejects_primitives_called_or_aliased() {
        for src in [
            "@tool\nasync def t(p):\n    return eval(p)\n",
            "@tool\nasync def t(p):\n    e = eval\n    return e(p)\n",
            "@tool\nasync def t(p):\n    return __import__('os')\n",
            "@tool\nasync def t(p):\n    exec(p)\n    return 1\n",
            "@tool\nasync def t(p):\n    return getattr(__builtins__, 'ev' + 'al')(p)\n",
            "@tool\nasync def t(p):\n    return globals()['x']\n",
            "@tool\nasync def t(p):\n    return vars(p)\n",
            "@tool\nasync def t(p):\n    breakpoint()\n    return 1\n",
        ] {
            assert_eq!(kind_of(src, "t"), ViolationKind::ForbiddenPrimitive, "{src}");
        }
    }

    #[test]
    fn attribute_named_compile_is_not_a_primitive() {
        let src = "import re\n@tool\nasync def t(p):\n    return re.compile(p)\n";
        assert!(check(src, "t").is_ok());
    }

    #[test]
    fn missing_marker_is_missing_declaration() {
        let src = "async def t(p):\n    return 1\n";
        assert_eq!(kind_of(src, "t"), ViolationKind::MissingDeclaration);
    }

    #[test]
    fn marker_forms() {
        for src in [
            "@tool\nasync def t(p):\n    return 1\n",
            "@tool()\nasync def t(p):\n    return 1\n",
            "@sdk.tool('t', 'desc')\nasync def t(p):\n    return 1\n",
            "@tool(name='t')\nasync def t(p):\n    return 1\n",
        ] {
            assert!(check(src, "t").is_ok(), "{src}");
        }
    }

    #[test]
    fn name_mismatches_are_rejected() {
        // Decorator says foo, function is bar.
        let src = "@tool('foo')\nasync def bar(p):\n    return 1\n";
        assert_eq!(kind_of(src, "foo"), ViolationKind::NameMismatch);
        assert_eq!(kind_of(src, "bar"), ViolationKind::NameMismatch);
        let plain = "@tool\nasync def bar(p):\n    return 1\n";
        assert_eq!(kind_of(plain, "foo"), ViolationKind::NameMismatch);
    }

    #[test]
    fn exactly_one_async_function() {
        let two = "@tool\nasync def t(p):\n    return 1\n\nasync def helper():\n    return 2\n";
        assert_eq!(kind_of(two, "t"), ViolationKind::InvalidStructure);
        let sync = "@tool\ndef t(p):\n    return 1\n";
        assert_eq!(kind_of(sync, "t"), ViolationKind::InvalidStructure);
        let helper = "def helper():\n    return 2\n\n@tool\nasync def t(p):\n    return helper()\n";
        assert!(check(helper, "t").is_ok());
    }

    #[test]
    fn missing_return_is_advisory() {
        let src = "@tool\nasync def t(p):\n    def inner():\n        return 1\n    inner()\n";
        let report = check(src, "t").unwrap();
        assert_eq!(report.advisories.len(), 1);
        assert_eq!(report.advisories.first().unwrap().kind, AdvisoryKind::MissingReturn);
    }

    #[test]
    fn violation_serializes_with_kind() {
        let err = check("async def t(p):\n    return 1\n", "t").unwrap_err();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "missing_declaration");
        assert!(json.get("line").is_none());
    }
}
