//! The frontmatter map pipeline
//!
//! Field-level rewrites applied to a file as it moves through a flow:
//! `$set`, `$rename`, `$unset`, `$switch`, `$transform`, `$copy`. Ops run
//! in order; an op whose field is absent is a no-op (flows are written
//! against the union of what files might carry).

use openpackage_project::flows::{FieldTransform, MapOp};
use openpackage_project::Frontmatter;
use serde_json::Value;

use super::switch::eval_switch_on;

/// Apply a map pipeline to a file's frontmatter
pub fn apply_map(ops: &[MapOp], frontmatter: &mut Option<Frontmatter>) {
    for op in ops {
        match op {
            MapOp::Set { field, value } => {
                frontmatter
                    .get_or_insert_with(Frontmatter::new)
                    .insert(field.clone(), value.clone());
            }
            MapOp::Rename { from, to } => {
                if let Some(fm) = frontmatter {
                    if let Some(value) = fm.shift_remove(from) {
                        fm.insert(to.clone(), value);
                    }
                }
            }
            MapOp::Unset { field } => {
                if let Some(fm) = frontmatter {
                    fm.shift_remove(field);
                }
            }
            MapOp::Switch { field, expr } => {
                if let Some(fm) = frontmatter {
                    let current = fm.get(field).cloned();
                    if let Some(next) = eval_switch_on(expr, current.as_ref()) {
                        fm.insert(field.clone(), Value::String(next));
                    }
                }
            }
            MapOp::Transform { field, transform } => {
                if let Some(fm) = frontmatter {
                    if let Some(value) = fm.get(field).cloned() {
                        fm.insert(field.clone(), transform_value(*transform, value));
                    }
                }
            }
            MapOp::Copy { from, to } => {
                if let Some(fm) = frontmatter {
                    if let Some(value) = fm.get(from).cloned() {
                        fm.insert(to.clone(), value);
                    }
                }
            }
        }
    }
}

/// Run one built-in transform over a value
fn transform_value(transform: FieldTransform, value: Value) -> Value {
    match transform {
        FieldTransform::ToolList => tool_list(value),
        FieldTransform::CommaJoin => comma_join(value),
        FieldTransform::Lowercase => match value {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        },
    }
}

/// Lift a vendor tool list into the neutral array form
///
/// `"Read, Write"` → `["read", "write"]`; an array lowercases its string
/// entries; an object (opencode style `{read: true}`) keeps the enabled
/// keys. Anything else passes through.
fn tool_list(value: Value) -> Value {
    match value {
        Value::String(s) => Value::Array(
            s.split(',')
                .map(|tool| tool.trim().to_lowercase())
                .filter(|tool| !tool.is_empty())
                .map(Value::String)
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                })
                .collect(),
        ),
        Value::Object(map) => Value::Array(
            map.into_iter()
                .filter(|(_, enabled)| enabled == &Value::Bool(true))
                .map(|(tool, _)| Value::String(tool.to_lowercase()))
                .collect(),
        ),
        other => other,
    }
}

/// Join the neutral array form back into a comma-separated string
fn comma_join(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|item| item.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Value::String(joined)
        }
        other => other,
    }
}
