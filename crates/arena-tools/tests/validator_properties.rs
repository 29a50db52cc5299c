//! Acceptance and rejection properties of the tool safety validator.

#![allow(clippy::unwrap_used)]

use arena_tools::{FORBIDDEN_MODULES, ToolSafetyValidator, ViolationKind};

fn wrap(prelude: &str, body: &str) -> String {
    format!("{prelude}\n@tool(\"nearby\")\nasync def nearby(params):\n    {body}\n")
}

#[test]
fn every_forbidden_module_is_rejected_in_every_import_form() {
    let validator = ToolSafetyValidator::new();
    for module in FORBIDDEN_MODULES {
        for prelude in [
            format!("import {module}"),
            format!("import {module} as alias"),
            format!("from {module} import something"),
            format!("from {module}.sub import something"),
        ] {
            let src = wrap(&prelude, "return {'content': 'ok'}");
            let err = validator.validate(&src, "nearby").unwrap_err();
            assert_eq!(err.kind, ViolationKind::ForbiddenImport, "{prelude}");
            assert_eq!(err.line, Some(1));
        }
    }
}

#[test]
fn the_four_canonical_attacks_are_rejected() {
    let validator = ToolSafetyValidator::new();
    let cases = [
        wrap("import os", "return os.getcwd()"),
        wrap("import subprocess", "return subprocess.run(['ls'])"),
        wrap("from os import system", "return system('ls')"),
        wrap("", "return eval('1 + 1')"),
    ];
    for src in cases {
        assert!(validator.validate(&src, "nearby").is_err(), "{src}");
    }
}

#[test]
fn a_well_formed_tool_is_accepted() {
    let src = r#"
from __future__ import annotations
import json

@tool("look_around", "Describe nearby cells")
async def look_around(params: dict) -> dict:
    radius = params.get("radius", 1)
    cells = [{"dx": dx, "dy": dy} for dx in range(-radius, radius + 1) for dy in range(-radius, radius + 1)]
    return {"content": json.dumps(cells)}
"#;
    let report = ToolSafetyValidator::new().validate(src, "look_around").unwrap();
    assert_eq!(report.function_name, "look_around");
    assert!(report.advisories.is_empty());
}

#[test]
fn tool_bound_to_an_action_returns_the_action_object() {
    let src = r#"
@tool
async def go_east(params):
    return {"content": "heading east", "action": {"action_id": "move", "parameters": {"direction": "east"}}}
"#;
    assert!(ToolSafetyValidator::new().validate(src, "go_east").is_ok());
}

#[test]
fn the_validator_never_fixes_code() {
    // A missing colon is reported, not patched.
    let src = "@tool\nasync def nearby(params)\n    return 1\n";
    let err = ToolSafetyValidator::new().validate(src, "nearby").unwrap_err();
    assert_eq!(err.kind, ViolationKind::SyntaxError);
}

#[test]
fn python2_and_misplaced_syntax_is_rejected() {
    let validator = ToolSafetyValidator::new();
    let cases = [
        ("print statement", wrap("", "print 'hello'\n    return 1")),
        ("<> operator", wrap("", "return 1 <> 2")),
        ("module-level return", wrap("return 1", "return 1")),
        (
            "duplicate parameter",
            "@tool\nasync def nearby(a, a):\n    return 1\n".to_owned(),
        ),
    ];
    for (label, src) in cases {
        let err = validator.validate(&src, "nearby").unwrap_err();
        assert_eq!(err.kind, ViolationKind::SyntaxError, "{label}: {err}");
    }
}

#[test]
fn python3_print_call_is_accepted() {
    let src = wrap("", "print('hello')\n    return 1");
    assert!(ToolSafetyValidator::new().validate(&src, "nearby").is_ok());
}
