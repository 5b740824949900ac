//! Ordering edges between actions.
//!
//! An edge says "`first` happens before `then`" and carries [`OrderFlags`]
//! describing how the two actions' runnability and necessity interact.
//! Endpoints name either a resource task that may not exist yet or an
//! already-created action.

use std::fmt;
use std::ops::BitOr;

use tracing::trace;

use crate::action::{op_key, ActionId, ActionKind};
use crate::resource::ResourceId;
use crate::working_set::WorkingSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFlags {
    pub optional: bool,
    pub asymmetrical: bool,
    /// `then` being required forces `first`.
    pub implies_first: bool,
    /// `first` being required forces `then`.
    pub implies_then: bool,
    /// `then` is runnable only if `first` is.
    pub runnable_left: bool,
    /// Counted toward the target's `required_runnable_before`.
    pub one_or_more: bool,
    /// Only forbids concurrent execution.
    pub serialize_only: bool,
    pub anti_colocation: bool,
    pub apply_first_non_migratable: bool,
    pub implies_then_printed: bool,
}

impl OrderFlags {
    pub const NONE: OrderFlags = OrderFlags {
        optional: false,
        asymmetrical: false,
        implies_first: false,
        implies_then: false,
        runnable_left: false,
        one_or_more: false,
        serialize_only: false,
        anti_colocation: false,
        apply_first_non_migratable: false,
        implies_then_printed: false,
    };

    pub const OPTIONAL: OrderFlags = OrderFlags {
        optional: true,
        ..OrderFlags::NONE
    };

    pub const ASYMMETRICAL: OrderFlags = OrderFlags {
        asymmetrical: true,
        ..OrderFlags::NONE
    };

    pub const IMPLIES_FIRST: OrderFlags = OrderFlags {
        implies_first: true,
        ..OrderFlags::NONE
    };

    pub const IMPLIES_THEN: OrderFlags = OrderFlags {
        implies_then: true,
        ..OrderFlags::NONE
    };

    pub const RUNNABLE_LEFT: OrderFlags = OrderFlags {
        runnable_left: true,
        ..OrderFlags::NONE
    };

    pub const SERIALIZE_ONLY: OrderFlags = OrderFlags {
        serialize_only: true,
        ..OrderFlags::NONE
    };

    pub const ANTI_COLOCATION: OrderFlags = OrderFlags {
        anti_colocation: true,
        ..OrderFlags::NONE
    };

    pub const ONE_OR_MORE: OrderFlags = OrderFlags {
        one_or_more: true,
        implies_then_printed: true,
        ..OrderFlags::NONE
    };

    pub const APPLY_FIRST_NON_MIGRATABLE: OrderFlags = OrderFlags {
        apply_first_non_migratable: true,
        ..OrderFlags::NONE
    };

    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let table = [
            (self.optional, "optional"),
            (self.asymmetrical, "asymmetrical"),
            (self.implies_first, "implies_first"),
            (self.implies_then, "implies_then"),
            (self.runnable_left, "runnable_left"),
            (self.one_or_more, "one_or_more"),
            (self.serialize_only, "serialize_only"),
            (self.anti_colocation, "anti_colocation"),
            (self.apply_first_non_migratable, "apply_first_non_migratable"),
            (self.implies_then_printed, "implies_then_printed"),
        ];
        for (set, name) in table {
            if set {
                names.push(name);
            }
        }
        names
    }
}

impl BitOr for OrderFlags {
    type Output = OrderFlags;

    fn bitor(self, rhs: OrderFlags) -> OrderFlags {
        OrderFlags {
            optional: self.optional || rhs.optional,
            asymmetrical: self.asymmetrical || rhs.asymmetrical,
            implies_first: self.implies_first || rhs.implies_first,
            implies_then: self.implies_then || rhs.implies_then,
            runnable_left: self.runnable_left || rhs.runnable_left,
            one_or_more: self.one_or_more || rhs.one_or_more,
            serialize_only: self.serialize_only || rhs.serialize_only,
            anti_colocation: self.anti_colocation || rhs.anti_colocation,
            apply_first_non_migratable: self.apply_first_non_migratable
                || rhs.apply_first_non_migratable,
            implies_then_printed: self.implies_then_printed || rhs.implies_then_printed,
        }
    }
}

impl fmt::Display for OrderFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// One side of an ordering edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A task of a resource, resolved when actions are created.
    Resource {
        rsc: ResourceId,
        task: ActionKind,
        key: String,
    },
    Action(ActionId),
}

impl Endpoint {
    pub fn task(rsc: ResourceId, rsc_id: &str, task: &ActionKind) -> Endpoint {
        Endpoint::Resource {
            rsc,
            task: task.clone(),
            key: op_key(rsc_id, task.as_str(), 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingEdge {
    pub id: u32,
    pub first: Endpoint,
    pub then: Endpoint,
    pub flags: OrderFlags,
}

impl WorkingSet {
    /// Order `first_task` of one resource before `then_task` of another.
    pub fn order_resources(
        &mut self,
        first: ResourceId,
        first_task: &ActionKind,
        then: ResourceId,
        then_task: &ActionKind,
        flags: OrderFlags,
    ) -> u32 {
        let first_ep = Endpoint::task(first, &self.resources[first].id, first_task);
        let then_ep = Endpoint::task(then, &self.resources[then].id, then_task);
        self.custom_order(first_ep, then_ep, flags)
    }

    /// Append an ordering edge, mirroring it onto migration actions where the
    /// resources involved can live-migrate.
    pub fn custom_order(&mut self, first: Endpoint, then: Endpoint, flags: OrderFlags) -> u32 {
        let id = self.push_edge(first.clone(), then.clone(), flags);
        if let (
            Endpoint::Resource {
                rsc: first_rsc,
                task: first_task,
                ..
            },
            Endpoint::Resource {
                rsc: then_rsc,
                task: then_task,
                ..
            },
        ) = (&first, &then)
        {
            self.mirror_migration(*first_rsc, first_task, *then_rsc, then_task);
        }
        id
    }

    /// Directly order two existing actions.
    pub fn order_actions(&mut self, first: ActionId, then: ActionId, flags: OrderFlags) -> u32 {
        self.push_edge(Endpoint::Action(first), Endpoint::Action(then), flags)
    }

    /// Human-readable key of an endpoint, e.g. `db_start_0`.
    pub fn endpoint_key<'a>(&'a self, endpoint: &'a Endpoint) -> &'a str {
        match endpoint {
            Endpoint::Resource { key, .. } => key,
            Endpoint::Action(id) => &self.actions[*id].uuid,
        }
    }

    /// Edges as `(first, then, flags)` key triples, in creation order.
    pub fn ordering_keys(&self) -> Vec<(String, String, OrderFlags)> {
        self.orderings
            .iter()
            .map(|e| {
                (
                    self.endpoint_key(&e.first).to_string(),
                    self.endpoint_key(&e.then).to_string(),
                    e.flags,
                )
            })
            .collect()
    }

    fn push_edge(&mut self, first: Endpoint, then: Endpoint, flags: OrderFlags) -> u32 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        trace!(
            id,
            first = self.endpoint_key(&first),
            then = self.endpoint_key(&then),
            %flags,
            "created ordering"
        );
        self.orderings.push(OrderingEdge {
            id,
            first,
            then,
            flags,
        });
        id
    }

    fn mirror_migration(
        &mut self,
        first: ResourceId,
        first_task: &ActionKind,
        then: ResourceId,
        then_task: &ActionKind,
    ) {
        if first == then || self.is_ancestor(first, then) || self.is_ancestor(then, first) {
            return;
        }
        let first_migrates = self.resources[first].is_migratable();
        let then_migrates = self.resources[then].is_migratable();
        if !first_migrates && !then_migrates {
            return;
        }
        let then_partial = self.resources[then].partial_migration_target.is_some();
        let mirrored = if first_migrates {
            OrderFlags::OPTIONAL | OrderFlags::APPLY_FIRST_NON_MIGRATABLE
        } else {
            OrderFlags::OPTIONAL
        };

        use ActionKind::*;
        match (first_task, then_task) {
            (Start, Start) => {
                if first_migrates && then_migrates {
                    self.mirror(first, &MigrateFrom, then, &MigrateTo, OrderFlags::OPTIONAL);
                }
                if then_migrates {
                    self.mirror(first, &Start, then, &MigrateTo, mirrored);
                }
            }
            (Stop, Stop) if then_migrates => {
                self.mirror(first, &Stop, then, &MigrateTo, mirrored);
                if then_partial {
                    self.mirror(first, &Stop, then, &MigrateFrom, mirrored);
                }
            }
            (Promote, Start) if then_migrates => {
                self.mirror(first, &Promote, then, &MigrateTo, OrderFlags::OPTIONAL);
            }
            (Demote, Stop) if then_migrates => {
                self.mirror(first, &Demote, then, &MigrateTo, OrderFlags::OPTIONAL);
                if then_partial {
                    self.mirror(first, &Demote, then, &MigrateFrom, OrderFlags::OPTIONAL);
                }
            }
            _ => {}
        }
    }

    fn mirror(
        &mut self,
        first: ResourceId,
        first_task: &ActionKind,
        then: ResourceId,
        then_task: &ActionKind,
        flags: OrderFlags,
    ) {
        let first_ep = Endpoint::task(first, &self.resources[first].id, first_task);
        let then_ep = Endpoint::task(then, &self.resources[then].id, then_task);
        self.push_edge(first_ep, then_ep, flags);
    }
}
