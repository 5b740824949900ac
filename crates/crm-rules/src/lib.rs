//! crm-rules — evaluates the boolean rules found in constraints.
//!
//! Rules combine node-attribute comparisons, date expressions and nested
//! rules with `and`/`or`. Evaluation also reports the earliest future
//! instant at which a time-based outcome would change, so the caller can
//! schedule a recheck.
//!
//! # Components
//!
//! - **`model`** — Serde model of rules and expressions
//! - **`evaluate`** — Rule and attribute-expression evaluation
//! - **`date`** — Date expressions, date specs and [`NextChange`]
//! - **`matches`** — Regex back-reference expansion (`%1`)

pub mod date;
pub mod error;
pub mod evaluate;
pub mod matches;
pub mod model;

pub use date::{NextChange, parse_date};
pub use error::{RuleError, RuleResult};
pub use evaluate::{RuleContext, evaluate_expression, evaluate_rule, evaluate_rules};
pub use matches::RegexMatch;
pub use model::{AttributeExpression, DateExpression, DateSpec, DurationSpec, Expression, RuleSpec};
