//! The constraint document, as handed over by the configuration loader.
//!
//! Attribute names follow the configuration schema (`with-rsc`,
//! `first-action`, `require-all`, ...). Scores, kinds and roles stay raw
//! strings here so that invalid values can be diagnosed by the builders.

use crm_rules::RuleSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintSpec {
    Location(LocationSpec),
    Order(OrderSpec),
    Colocation(ColocationSpec),
    Ticket(TicketSpec),
}

impl ConstraintSpec {
    pub fn id(&self) -> Option<&str> {
        match self {
            ConstraintSpec::Location(c) => c.id.as_deref(),
            ConstraintSpec::Order(c) => c.id.as_deref(),
            ConstraintSpec::Colocation(c) => c.id.as_deref(),
            ConstraintSpec::Ticket(c) => c.id.as_deref(),
        }
    }

    /// Deprecated lifetime rules; the constraint is active if any passes.
    pub fn lifetime(&self) -> &[RuleSpec] {
        match self {
            ConstraintSpec::Location(c) => &c.lifetime,
            ConstraintSpec::Order(c) => &c.lifetime,
            ConstraintSpec::Colocation(c) => &c.lifetime,
            ConstraintSpec::Ticket(c) => &c.lifetime,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstraintSpec::Location(_) => "rsc_location",
            ConstraintSpec::Order(_) => "rsc_order",
            ConstraintSpec::Colocation(_) => "rsc_colocation",
            ConstraintSpec::Ticket(_) => "rsc_ticket",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResourceSetSpec {
    pub id: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    pub sequential: Option<bool>,
    pub require_all: Option<bool>,
    pub role: Option<String>,
    pub action: Option<String>,
    pub kind: Option<String>,
    pub score: Option<String>,
    /// Colocation only: `group` (default) or `listed`.
    pub ordering: Option<String>,
    pub symmetrical: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LocationSpec {
    pub id: Option<String>,
    pub rsc: Option<String>,
    pub rsc_pattern: Option<String>,
    pub role: Option<String>,
    pub node: Option<String>,
    pub score: Option<String>,
    pub resource_discovery: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub sets: Vec<ResourceSetSpec>,
    #[serde(default)]
    pub lifetime: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrderSpec {
    pub id: Option<String>,
    pub first: Option<String>,
    pub then: Option<String>,
    pub first_action: Option<String>,
    pub then_action: Option<String>,
    pub first_instance: Option<String>,
    pub then_instance: Option<String>,
    /// Optional, Mandatory or Serialize.
    pub kind: Option<String>,
    /// Deprecated: a zero score means Optional.
    pub score: Option<String>,
    pub symmetrical: Option<bool>,
    /// Deprecated: `false` behaves like `clone-min=1` on the first clone.
    pub require_all: Option<bool>,
    #[serde(default)]
    pub sets: Vec<ResourceSetSpec>,
    #[serde(default)]
    pub lifetime: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ColocationSpec {
    pub id: Option<String>,
    pub rsc: Option<String>,
    pub with_rsc: Option<String>,
    pub rsc_role: Option<String>,
    pub with_rsc_role: Option<String>,
    pub rsc_instance: Option<String>,
    pub with_rsc_instance: Option<String>,
    pub node_attribute: Option<String>,
    pub score: Option<String>,
    pub influence: Option<String>,
    /// No longer supported; only diagnosed.
    pub symmetrical: Option<bool>,
    #[serde(default)]
    pub sets: Vec<ResourceSetSpec>,
    #[serde(default)]
    pub lifetime: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TicketSpec {
    pub id: Option<String>,
    pub ticket: Option<String>,
    pub rsc: Option<String>,
    pub rsc_role: Option<String>,
    pub rsc_instance: Option<String>,
    pub loss_policy: Option<String>,
    #[serde(default)]
    pub sets: Vec<ResourceSetSpec>,
    #[serde(default)]
    pub lifetime: Vec<RuleSpec>,
}
