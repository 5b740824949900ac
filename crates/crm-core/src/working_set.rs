//! The working set: every node, resource, action and constraint record that
//! a scheduling pass operates on.
//!
//! Entities live in slotmap arenas and refer to each other by key, so the
//! many-to-many links between resources and constraints are plain indices.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use slotmap::SlotMap;
use tracing::{debug, error, warn};

use crate::action::{Action, ActionId, ActionKind};
use crate::config::SchedulerConfig;
use crate::constraint::{Colocation, LocationConstraint, Ticket, TicketConstraint};
use crate::diagnostic::{Diagnostic, Level};
use crate::error::CoreResult;
use crate::node::{Node, NodeId};
use crate::ordering::OrderingEdge;
use crate::resource::{Resource, ResourceId};
use crate::score::Score;

pub struct WorkingSet {
    pub config: SchedulerConfig,
    /// Instant time-based rules are evaluated at.
    pub now: DateTime<Utc>,
    /// Earliest future instant at which a rule outcome changes.
    pub recheck_by: Option<DateTime<Utc>>,

    pub nodes: SlotMap<NodeId, Node>,
    pub resources: SlotMap<ResourceId, Resource>,
    /// Top-level resources in configuration order.
    pub top_level: Vec<ResourceId>,
    pub actions: SlotMap<ActionId, Action>,
    pub tickets: BTreeMap<String, Ticket>,
    /// Tag id to referenced resource ids.
    pub tags: BTreeMap<String, Vec<String>>,
    /// Template id to ids of the primitives derived from it.
    pub templates: BTreeMap<String, Vec<String>>,

    pub locations: Vec<LocationConstraint>,
    pub colocations: Vec<Colocation>,
    pub ticket_constraints: Vec<TicketConstraint>,
    pub orderings: Vec<OrderingEdge>,
    pub diagnostics: Vec<Diagnostic>,

    pub(crate) next_order_id: u32,
}

impl WorkingSet {
    pub fn new(config: SchedulerConfig) -> CoreResult<Self> {
        let now = config.evaluation_time()?;
        Ok(Self::with_now(config, now))
    }

    pub fn with_now(config: SchedulerConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            now,
            recheck_by: None,
            nodes: SlotMap::with_key(),
            resources: SlotMap::with_key(),
            top_level: Vec::new(),
            actions: SlotMap::with_key(),
            tickets: BTreeMap::new(),
            tags: BTreeMap::new(),
            templates: BTreeMap::new(),
            locations: Vec::new(),
            colocations: Vec::new(),
            ticket_constraints: Vec::new(),
            orderings: Vec::new(),
            diagnostics: Vec::new(),
            next_order_id: 1,
        }
    }

    // ── Nodes ──────────────────────────────────────────────────────

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    /// Find a node by name or id.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.uname == name)
            .or_else(|| self.nodes.iter().find(|(_, n)| n.id == name))
            .map(|(id, _)| id)
    }

    pub fn node_name(&self, node: NodeId) -> &str {
        &self.nodes[node].uname
    }

    // ── Resources ──────────────────────────────────────────────────

    /// Insert a resource under `parent`, or at top level.
    ///
    /// In a symmetric cluster every node known at this point starts out
    /// allowed with score zero.
    pub fn add_resource(&mut self, mut rsc: Resource, parent: Option<ResourceId>) -> ResourceId {
        rsc.parent = parent;
        if self.config.symmetric_cluster {
            for node in self.nodes.keys() {
                rsc.allowed_nodes.entry(node).or_insert(Score::ZERO);
            }
        }
        let id = self.resources.insert(rsc);
        match parent {
            Some(parent) => self.resources[parent].children.push(id),
            None => self.top_level.push(id),
        }
        id
    }

    /// All resources in depth-first configuration order.
    pub fn resources_in_order(&self) -> Vec<ResourceId> {
        fn walk(ws: &WorkingSet, id: ResourceId, out: &mut Vec<ResourceId>) {
            out.push(id);
            for child in &ws.resources[id].children {
                walk(ws, *child, out);
            }
        }
        let mut out = Vec::with_capacity(self.resources.len());
        for id in &self.top_level {
            walk(self, *id, &mut out);
        }
        out
    }

    /// Exact id lookup.
    pub fn find_resource(&self, id: &str) -> Option<ResourceId> {
        self.resources_in_order()
            .into_iter()
            .find(|r| self.resources[*r].id == id)
    }

    /// Resolve a constraint reference: an exact id, or else the top-level
    /// ancestor of a clone instance known by its un-suffixed name.
    pub fn find_constraint_resource(&self, id: &str) -> Option<ResourceId> {
        let order = self.resources_in_order();
        if let Some(found) = order.iter().find(|r| self.resources[**r].id == id) {
            return Some(*found);
        }
        let found = order
            .into_iter()
            .find(|r| self.resources[*r].clone_name.as_deref() == Some(id))?;
        let top = self.uber_parent(found);
        debug!(reference = id, resource = %self.resources[top].id, "resolved reference by clone name");
        Some(top)
    }

    /// Find instance `instance` among a clone's children.
    pub fn find_clone_instance(&self, clone: ResourceId, instance: &str) -> Option<ResourceId> {
        self.resources[clone].children.iter().copied().find(|child| {
            self.resources[*child]
                .id
                .rsplit_once(':')
                .is_some_and(|(_, n)| n == instance)
        })
    }

    /// The top-level ancestor of a resource.
    pub fn uber_parent(&self, mut rsc: ResourceId) -> ResourceId {
        while let Some(parent) = self.resources[rsc].parent {
            rsc = parent;
        }
        rsc
    }

    /// Whether `ancestor` is a strict ancestor of `rsc`.
    pub fn is_ancestor(&self, ancestor: ResourceId, rsc: ResourceId) -> bool {
        let mut current = self.resources[rsc].parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.resources[parent].parent;
        }
        false
    }

    /// Whether the resource or one of its ancestors is a promotable clone.
    pub fn is_promotable_context(&self, rsc: ResourceId) -> bool {
        let mut current = Some(rsc);
        while let Some(id) = current {
            if self.resources[id].is_promotable() {
                return true;
            }
            current = self.resources[id].parent;
        }
        false
    }

    // ── Actions ────────────────────────────────────────────────────

    /// Find or create the action with this key on this node.
    pub fn custom_action(
        &mut self,
        rsc: Option<ResourceId>,
        key: String,
        task: ActionKind,
        node: Option<NodeId>,
        optional: bool,
    ) -> ActionId {
        let existing = match rsc {
            Some(r) => self.resources[r]
                .actions
                .iter()
                .copied()
                .find(|a| self.actions[*a].uuid == key && self.actions[*a].node == node),
            None => self
                .actions
                .iter()
                .find(|(_, a)| a.rsc.is_none() && a.uuid == key && a.node == node)
                .map(|(id, _)| id),
        };
        if let Some(id) = existing {
            if !optional {
                self.actions[id].flags.optional = false;
            }
            return id;
        }

        let mut action = Action::new(key, task, rsc, node);
        action.flags.optional = optional;
        let id = self.actions.insert(action);
        if let Some(r) = rsc {
            self.resources[r].actions.push(id);
        }
        id
    }

    /// Find or create a cluster-wide pseudo-action.
    pub fn get_pseudo_op(&mut self, key: &str) -> ActionId {
        let id = self.custom_action(
            None,
            key.to_string(),
            ActionKind::Other(key.to_string()),
            None,
            false,
        );
        let flags = &mut self.actions[id].flags;
        flags.pseudo = true;
        flags.runnable = true;
        id
    }

    pub fn find_action(&self, key: &str) -> Option<ActionId> {
        self.actions
            .iter()
            .find(|(_, a)| a.uuid == key)
            .map(|(id, _)| id)
    }

    /// First action of a resource with the given task.
    pub fn find_first_action(&self, rsc: ResourceId, task: &ActionKind) -> Option<ActionId> {
        self.resources[rsc]
            .actions
            .iter()
            .copied()
            .find(|a| self.actions[*a].task == *task)
    }

    // ── Diagnostics ────────────────────────────────────────────────

    pub fn config_err(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(%message, "configuration error");
        self.diagnostics.push(Diagnostic {
            level: Level::Error,
            message,
            constraint: None,
        });
    }

    pub fn config_warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "configuration warning");
        self.diagnostics.push(Diagnostic {
            level: Level::Warning,
            message,
            constraint: None,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.level == Level::Error)
    }

    /// Remember a future instant at which the schedule must be recomputed.
    pub fn update_recheck(&mut self, at: DateTime<Utc>) {
        if at > self.now && self.recheck_by.is_none_or(|current| at < current) {
            debug!(at = %at, "updated recheck time");
            self.recheck_by = Some(at);
        }
    }
}
