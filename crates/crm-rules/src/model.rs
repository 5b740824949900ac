//! Rule documents.

use serde::{Deserialize, Serialize};

/// A rule: a boolean combination of expressions, optionally carrying a score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleSpec {
    pub id: Option<String>,
    /// `and` (default) or `or`.
    pub boolean_op: Option<String>,
    pub score: Option<String>,
    /// Node attribute whose value is the score.
    pub score_attribute: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub expressions: Vec<Expression>,
}

impl RuleSpec {
    pub fn is_or(&self) -> bool {
        self.boolean_op
            .as_deref()
            .is_some_and(|op| op.eq_ignore_ascii_case("or"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "expression", rename_all = "snake_case")]
pub enum Expression {
    Attribute(AttributeExpression),
    Date(DateExpression),
    /// A nested rule, evaluated as a plain boolean.
    Rule(RuleSpec),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttributeExpression {
    pub id: Option<String>,
    pub attribute: String,
    /// lt, gt, lte, gte, eq, ne, defined, not_defined
    pub operation: String,
    pub value: Option<String>,
    /// string, integer, number or version
    #[serde(rename = "type")]
    pub value_type: Option<String>,
    /// literal (default), param or meta
    pub value_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DateExpression {
    pub id: Option<String>,
    /// gt, lt, in_range or date_spec
    pub operation: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration: Option<DurationSpec>,
    pub date_spec: Option<DateSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationSpec {
    pub years: Option<i64>,
    pub months: Option<i64>,
    pub weeks: Option<i64>,
    pub days: Option<i64>,
    pub hours: Option<i64>,
    pub minutes: Option<i64>,
    pub seconds: Option<i64>,
}

/// Calendar fields that must all match. Each is a number or `low-high`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpec {
    pub years: Option<String>,
    pub months: Option<String>,
    pub monthdays: Option<String>,
    /// 1 = Monday.
    pub weekdays: Option<String>,
    pub yeardays: Option<String>,
    pub weeks: Option<String>,
    pub hours: Option<String>,
    pub minutes: Option<String>,
    pub seconds: Option<String>,
}
