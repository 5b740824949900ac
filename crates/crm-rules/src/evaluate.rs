//! Boolean rule evaluation against a node and a resource.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use crm_core::Node;
use tracing::{trace, warn};

use crate::date::{NextChange, evaluate_date};
use crate::error::{RuleError, RuleResult};
use crate::matches::RegexMatch;
use crate::model::{AttributeExpression, Expression, RuleSpec};

/// Everything an expression may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub node: Option<&'a Node>,
    pub params: Option<&'a BTreeMap<String, String>>,
    pub meta: Option<&'a BTreeMap<String, String>>,
    pub now: DateTime<Utc>,
    pub re_match: Option<&'a RegexMatch>,
}

impl<'a> RuleContext<'a> {
    /// A context with only the evaluation time, as used for lifetimes.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            node: None,
            params: None,
            meta: None,
            now,
            re_match: None,
        }
    }

    pub fn with_node(mut self, node: &'a Node) -> Self {
        self.node = Some(node);
        self
    }
}

/// Evaluate a rule. A rule with no expressions passes.
pub fn evaluate_rule(rule: &RuleSpec, ctx: &RuleContext<'_>, next: &mut NextChange) -> bool {
    let any = rule.is_or();
    let mut passed = true;
    for expr in &rule.expressions {
        let result = evaluate_expression(expr, ctx, next);
        if result && any {
            passed = true;
            break;
        }
        if !result && !any {
            passed = false;
            break;
        }
        passed = result;
    }
    trace!(rule = rule.id.as_deref().unwrap_or(""), passed, "evaluated rule");
    passed
}

/// Whether any rule passes. An empty list passes.
pub fn evaluate_rules(rules: &[RuleSpec], ctx: &RuleContext<'_>, next: &mut NextChange) -> bool {
    rules.is_empty() || rules.iter().any(|r| evaluate_rule(r, ctx, next))
}

pub fn evaluate_expression(expr: &Expression, ctx: &RuleContext<'_>, next: &mut NextChange) -> bool {
    let result = match expr {
        Expression::Attribute(attr) => evaluate_attribute(attr, ctx),
        Expression::Date(date) => evaluate_date(date, ctx.now, next),
        Expression::Rule(rule) => Ok(evaluate_rule(rule, ctx, next)),
    };
    result.unwrap_or_else(|e| {
        warn!(error = %e, "expression failed to evaluate, treating as false");
        false
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    String,
    Integer,
    Number,
    Version,
}

impl ValueType {
    fn parse(text: &str) -> RuleResult<ValueType> {
        match text.to_ascii_lowercase().as_str() {
            "string" => Ok(ValueType::String),
            "integer" => Ok(ValueType::Integer),
            "number" => Ok(ValueType::Number),
            "version" => Ok(ValueType::Version),
            other => Err(RuleError::UnknownValueType(other.to_string())),
        }
    }
}

pub fn evaluate_attribute(expr: &AttributeExpression, ctx: &RuleContext<'_>) -> RuleResult<bool> {
    let left = ctx.node.and_then(|n| n.attribute(&expr.attribute));

    let right: Option<String> = match expr.value_source.as_deref() {
        None | Some("literal") => expr
            .value
            .as_deref()
            .map(|v| ctx.re_match.map_or_else(|| v.to_string(), |m| m.expand(v))),
        Some("param") => expr
            .value
            .as_deref()
            .and_then(|v| ctx.params.and_then(|p| p.get(v)).cloned()),
        Some("meta") => expr
            .value
            .as_deref()
            .and_then(|v| ctx.meta.and_then(|m| m.get(v)).cloned()),
        Some(other) => {
            warn!(source = other, "unknown value-source, using literal value");
            expr.value.clone()
        }
    };

    let op = expr.operation.to_ascii_lowercase();
    match op.as_str() {
        "defined" => return Ok(left.is_some()),
        "not_defined" => return Ok(left.is_none()),
        "eq" | "ne" | "lt" | "lte" | "gt" | "gte" => {}
        other => return Err(RuleError::UnknownOperation(other.to_string())),
    }

    let (Some(left), Some(right)) = (left, right.as_deref()) else {
        return Ok(op == "ne" && !(left.is_none() && right.is_none()));
    };

    let value_type = match expr.value_type.as_deref() {
        Some(t) => ValueType::parse(t)?,
        None if matches!(op.as_str(), "lt" | "lte" | "gt" | "gte") => {
            if left.contains('.') || right.contains('.') {
                ValueType::Number
            } else {
                ValueType::Integer
            }
        }
        None => ValueType::String,
    };

    let ordering = compare(left, right, value_type);
    Ok(match op.as_str() {
        "eq" => ordering == Ordering::Equal,
        "ne" => ordering != Ordering::Equal,
        "lt" => ordering == Ordering::Less,
        "lte" => ordering != Ordering::Greater,
        "gt" => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn compare(left: &str, right: &str, value_type: ValueType) -> Ordering {
    let as_strings = || left.to_ascii_lowercase().cmp(&right.to_ascii_lowercase());
    match value_type {
        ValueType::String => as_strings(),
        ValueType::Integer => match (left.trim().parse::<i64>(), right.trim().parse::<i64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            _ => as_strings(),
        },
        ValueType::Number => match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
            (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
            _ => as_strings(),
        },
        ValueType::Version => compare_version(left, right),
    }
}

/// Compare dotted version strings numerically, component by component.
pub fn compare_version(left: &str, right: &str) -> Ordering {
    let parts = |s: &str| -> Vec<u64> {
        s.split('.')
            .map(|p| p.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (l, r) = (parts(left), parts(right));
    for i in 0..l.len().max(r.len()) {
        let ord = l.get(i).unwrap_or(&0).cmp(r.get(i).unwrap_or(&0));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
