//! Switch-expression evaluation
//!
//! A switch resolves its cases in order against either a frontmatter field
//! or a synthetic context value; the first matching case wins. `None` from
//! evaluation means "no case and no default": the caller leaves whatever it
//! was switching over unchanged.

use openpackage_project::flows::{SwitchExpr, SwitchInput, SwitchPattern};
use openpackage_project::Frontmatter;
use serde_json::Value;

use super::target::FlowContext;

/// Evaluate a switch for one file
pub fn eval_switch(
    expr: &SwitchExpr,
    frontmatter: Option<&Frontmatter>,
    ctx: &FlowContext,
) -> Option<String> {
    let scrutinee: Option<Value> = match &expr.on {
        SwitchInput::Field(field) => frontmatter.and_then(|fm| fm.get(field)).cloned(),
        SwitchInput::Context(key) => ctx.vars.get(key).cloned().map(Value::String),
    };
    eval_switch_on(expr, scrutinee.as_ref())
}

/// Evaluate a switch against an explicit scrutinee (used by the `$switch`
/// map op, where the scrutinee is the field's current value)
pub fn eval_switch_on(expr: &SwitchExpr, scrutinee: Option<&Value>) -> Option<String> {
    if let Some(value) = scrutinee {
        for case in &expr.cases {
            if case_matches(&case.pattern, value) {
                return Some(case.value.clone());
            }
        }
    }
    expr.default.clone()
}

fn case_matches(pattern: &SwitchPattern, value: &Value) -> bool {
    match pattern {
        SwitchPattern::Glob(glob_pattern) => {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            glob::Pattern::new(glob_pattern)
                .map(|p| p.matches(&text))
                .unwrap_or(false)
        }
        SwitchPattern::Shape(shape) => {
            let Value::Object(object) = value else {
                return false;
            };
            shape.iter().all(|(key, expected)| {
                if key == "*" {
                    // every key of the scrutinee must carry this value
                    object.values().all(|v| v == expected)
                } else {
                    object.get(key) == Some(expected)
                }
            })
        }
    }
}
