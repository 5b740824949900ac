//! Unpacked constraint records held by the working set.
//!
//! - **`LocationConstraint`** — node preferences for one resource
//! - **`Colocation`** — a placement relationship between two resources
//! - **`TicketConstraint`** — a resource's dependency on a cluster ticket

use std::fmt;
use std::str::FromStr;

use crate::node::NodeId;
use crate::resource::ResourceId;
use crate::role::Role;
use crate::score::Score;

// ── Locations ──────────────────────────────────────────────────

/// How resource discovery (probing) is performed on the constraint's nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Discovery {
    #[default]
    Always,
    Never,
    Exclusive,
}

impl FromStr for Discovery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Discovery::Always),
            "never" => Ok(Discovery::Never),
            "exclusive" => Ok(Discovery::Exclusive),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeWeight {
    pub node: NodeId,
    pub weight: Score,
}

#[derive(Debug, Clone)]
pub struct LocationConstraint {
    pub id: String,
    pub rsc: ResourceId,
    /// `Role::Unknown` applies in every role.
    pub role_filter: Role,
    pub discovery: Discovery,
    pub nodes: Vec<NodeWeight>,
}

// ── Colocations ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Colocation {
    pub id: String,
    pub dependent: ResourceId,
    pub primary: ResourceId,
    pub score: Score,
    pub dependent_role: Role,
    pub primary_role: Role,
    /// Node attribute whose values must match (`#uname` by default).
    pub node_attribute: String,
    pub influence: bool,
}

// ── Tickets ────────────────────────────────────────────────────

/// A cluster-wide ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Ticket {
    pub id: String,
    #[serde(default)]
    pub granted: bool,
    #[serde(default)]
    pub standby: bool,
}

impl Ticket {
    /// A ticket first seen in a constraint: known but not granted.
    pub fn revoked(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            granted: false,
            standby: false,
        }
    }
}

/// What happens to a dependent resource when its ticket is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossPolicy {
    Stop,
    Demote,
    Fence,
    Freeze,
}

impl fmt::Display for LossPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LossPolicy::Stop => "stop",
            LossPolicy::Demote => "demote",
            LossPolicy::Fence => "fence",
            LossPolicy::Freeze => "freeze",
        })
    }
}

#[derive(Debug, Clone)]
pub struct TicketConstraint {
    pub id: String,
    pub rsc: ResourceId,
    pub ticket: String,
    pub role: Role,
    pub loss_policy: LossPolicy,
}
