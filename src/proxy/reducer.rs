// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Field-wise reduction of per-replica JSON responses.
//!
//! A [`ReducerSpec`] maps each output field to a source field on the replica
//! responses and an [`Operator`] that folds the collected values. Replicas
//! missing the source field are skipped for that output field; if no replica
//! carries it the field is omitted from the result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fold operator over the values collected for one output field.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Numeric sum
    Sum,
    /// Numeric mean over the replicas that carried the field
    Avg,
    /// Smallest value; ties keep the first replica's value
    Min,
    /// Largest value; ties keep the first replica's value
    Max,
    /// Boolean conjunction
    And,
    /// Boolean disjunction
    Or,
    /// Per-replica values in replica order
    Array,
    /// Concatenation of sequence-valued entries, replica order preserved
    Merge,
}

/// Output field -> (source field -> operator).
///
/// Each output field names exactly one source field in practice; the nested
/// map mirrors the wire shape the management tooling already speaks.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReducerSpec(pub BTreeMap<String, BTreeMap<String, Operator>>);

impl ReducerSpec {
    /// Convenience constructor: one (output, source, operator) rule per entry.
    #[must_use]
    pub fn from_rules(rules: &[(&str, &str, Operator)]) -> Self {
        let mut spec = BTreeMap::new();
        for (output, source, op) in rules {
            let mut rule = BTreeMap::new();
            rule.insert((*source).to_string(), *op);
            spec.insert((*output).to_string(), rule);
        }
        Self(spec)
    }
}

/// Reduce per-replica responses into one object per the spec.
///
/// Non-object replica responses contribute no fields (their keys cannot be
/// looked up) but still count as replicas for nothing: every operator works
/// only on the values actually collected.
#[must_use]
pub fn reduce(spec: &ReducerSpec, replicas: &[Value]) -> Value {
    let mut out = serde_json::Map::new();

    for (output_key, rule) in &spec.0 {
        let Some((source_key, op)) = rule.iter().next() else {
            continue;
        };

        let collected: Vec<&Value> = replicas
            .iter()
            .filter_map(|r| r.get(source_key))
            .collect();

        if let Some(value) = apply(*op, &collected) {
            out.insert(output_key.clone(), value);
        }
    }

    Value::Object(out)
}

/// Fold collected values with one operator. `None` when nothing was collected
/// (or, for `merge`, nothing sequence-valued was).
#[must_use]
pub fn apply(op: Operator, values: &[&Value]) -> Option<Value> {
    if values.is_empty() {
        return None;
    }

    match op {
        Operator::Sum => Some(number(sum(values))),
        Operator::Avg => Some(number(sum(values) / values.len() as f64)),
        Operator::Min => extreme(values, |candidate, best| candidate < best),
        Operator::Max => extreme(values, |candidate, best| candidate > best),
        Operator::And => Some(Value::Bool(values.iter().all(|v| truthy(v)))),
        Operator::Or => Some(Value::Bool(values.iter().any(|v| truthy(v)))),
        Operator::Array => Some(Value::Array(values.iter().map(|v| (*v).clone()).collect())),
        Operator::Merge => {
            let merged: Vec<Value> = values
                .iter()
                .filter_map(|v| v.as_array())
                .flatten()
                .cloned()
                .collect();
            if merged.is_empty() && !values.iter().any(|v| v.is_array()) {
                None
            } else {
                Some(Value::Array(merged))
            }
        }
    }
}

fn sum(values: &[&Value]) -> f64 {
    values.iter().filter_map(|v| v.as_f64()).sum()
}

/// Integer-valued floats come back out as JSON integers.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// First value winning a strict comparison; the first replica wins ties.
fn extreme(values: &[&Value], better: impl Fn(f64, f64) -> bool) -> Option<Value> {
    let mut best: Option<(&Value, f64)> = None;
    for v in values {
        let Some(n) = v.as_f64() else { continue };
        best = match best {
            None => Some((v, n)),
            Some((_, b)) if better(n, b) => Some((v, n)),
            other => other,
        };
    }
    best.map(|(v, _)| v.clone())
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
