//! Resources as seen by the constraint engine.

use std::collections::BTreeMap;

use slotmap::new_key_type;

use crate::action::ActionId;
use crate::node::NodeId;
use crate::role::Role;
use crate::score::Score;

new_key_type! {
    /// Arena key for a [`Resource`] in the working set.
    pub struct ResourceId;
}

/// Resource shape. Declared in ascending sort rank.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Primitive,
    Group,
    Clone,
    /// A clone whose instances can be promoted.
    Promotable,
}

impl Variant {
    pub fn is_clone(self) -> bool {
        matches!(self, Variant::Clone | Variant::Promotable)
    }
}

/// What happens to a dependent when an optional ordering's first action runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartType {
    #[default]
    Ignore,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceFlags {
    pub managed: bool,
    pub blocked: bool,
    /// Colocations where this resource is dependent influence placement.
    pub critical: bool,
    pub allow_migrate: bool,
    pub notify: bool,
    /// Only nodes with an exclusive-discovery location may run it.
    pub exclusive_discover: bool,
}

impl Default for ResourceFlags {
    fn default() -> Self {
        Self {
            managed: true,
            blocked: false,
            critical: true,
            allow_migrate: false,
            notify: false,
            exclusive_discover: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resource {
    pub id: String,
    /// For clone instances, the id without the `:<n>` suffix.
    pub clone_name: Option<String>,
    pub variant: Variant,
    pub parent: Option<ResourceId>,
    pub children: Vec<ResourceId>,
    pub role: Role,
    pub next_role: Role,
    pub priority: i32,
    pub restart_type: RestartType,
    pub flags: ResourceFlags,
    pub meta: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,

    pub allowed_nodes: BTreeMap<NodeId, Score>,
    pub running_on: Vec<NodeId>,
    pub allocated_to: Option<NodeId>,
    pub partial_migration_target: Option<NodeId>,
    pub actions: Vec<ActionId>,

    /// Indices into the working set's location list.
    pub locations: Vec<usize>,
    /// Colocations where this resource is the dependent, in precedence order.
    pub colocations_as_dependent: Vec<usize>,
    /// Colocations where this resource is the primary, in precedence order.
    pub colocations_as_primary: Vec<usize>,
    pub ticket_constraints: Vec<usize>,
}

impl Resource {
    pub fn new(id: impl Into<String>, variant: Variant) -> Self {
        Self {
            id: id.into(),
            variant,
            role: Role::Stopped,
            next_role: Role::Stopped,
            ..Default::default()
        }
    }

    pub fn is_clone(&self) -> bool {
        self.variant.is_clone()
    }

    pub fn is_promotable(&self) -> bool {
        self.variant == Variant::Promotable
    }

    pub fn meta_attr(&self, name: &str) -> Option<&str> {
        self.meta.get(name).map(String::as_str)
    }

    pub fn is_migratable(&self) -> bool {
        self.flags.allow_migrate
    }
}

/// Boolean parsing used for meta attributes and constraint options.
pub fn is_true(text: &str) -> bool {
    parse_bool(text) == Some(true)
}

/// Strict boolean parsing; `None` for anything that is not a known spelling.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "y" | "1" => Some(true),
        "false" | "off" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_rank_puts_clones_above_primitives() {
        assert!(Variant::Promotable > Variant::Clone);
        assert!(Variant::Clone > Variant::Group);
        assert!(Variant::Group > Variant::Primitive);
    }

    #[test]
    fn truthy_values() {
        for yes in ["true", "On", "YES", "y", "1"] {
            assert!(is_true(yes), "{yes}");
        }
        for no in ["false", "0", "nope", ""] {
            assert!(!is_true(no), "{no}");
        }
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
