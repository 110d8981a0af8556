//! Total evaluator for compiled path expressions.
//!
//! Evaluation follows FHIRPath collection semantics: every intermediate
//! result is a flat collection of nodes. Member access on a missing key,
//! on a scalar or on null yields the empty collection rather than an
//! error, so evaluating a well-formed [`PathExpr`] can never fail.

use serde_json::Value;

use crate::ast::{CompareOp, Comparison, Function, PathExpr, Step};

/// Evaluate `expr` against `node`, returning the result collection.
/// An empty vector means "no match"; this function never errors.
pub fn evaluate(node: &Value, expr: &PathExpr) -> Vec<Value> {
    let mut current = vec![node.clone()];

    // Navigation over an empty collection stays empty, but functions such
    // as exists() and empty() still reduce over it, so every step runs.
    for step in &expr.steps {
        current = apply_step(current, step);
    }

    if let Some(cmp) = &expr.comparison {
        current = apply_comparison(&current, cmp);
    }

    current
}

fn apply_step(current: Vec<Value>, step: &Step) -> Vec<Value> {
    match step {
        Step::Member(name) => {
            let mut out = Vec::new();
            for node in &current {
                member_access(node, name, &mut out);
            }
            out
        }
        Step::Index(i) => current.get(*i).cloned().into_iter().collect(),
        Step::Function(function) => apply_function(current, *function),
    }
}

/// Member access with array mapping: accessing `name` on an array visits
/// each element, and an array-valued child contributes its elements
/// individually to the result collection.
fn member_access(node: &Value, name: &str, out: &mut Vec<Value>) {
    match node {
        Value::Object(map) => {
            if let Some(child) = map.get(name) {
                push_flattened(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                member_access(item, name, out);
            }
        }
        _ => {}
    }
}

fn push_flattened(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => out.extend(items.iter().cloned()),
        Value::Null => {}
        other => out.push(other.clone()),
    }
}

fn apply_function(current: Vec<Value>, function: Function) -> Vec<Value> {
    match function {
        Function::First => current.into_iter().take(1).collect(),
        Function::Last => current.into_iter().last().into_iter().collect(),
        Function::Exists => vec![Value::Bool(!current.is_empty())],
        Function::Empty => vec![Value::Bool(current.is_empty())],
        Function::Count => vec![Value::from(current.len() as i64)],
    }
}

/// FHIRPath equality over a singleton: empty input propagates to empty,
/// a multi-item collection compared to a single value is empty as well.
fn apply_comparison(current: &[Value], cmp: &Comparison) -> Vec<Value> {
    let Some(rhs) = cmp.rhs.value() else {
        // Unresolved constant; resolution happens at compile time, so an
        // unresolved operand only appears if the caller skipped it.
        return Vec::new();
    };

    match current {
        [single] => {
            let equal = values_equal(single, &rhs);
            let result = match cmp.op {
                CompareOp::Equal => equal,
                CompareOp::NotEqual => !equal,
            };
            vec![Value::Bool(result)]
        }
        _ => Vec::new(),
    }
}

/// Loose equality: numbers compare by numeric value so that `1 = 1.0`
/// holds; everything else compares structurally.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}
