//! Serialized cluster state a working set is built from.
//!
//! Clone instances are listed explicitly as children of their clone and
//! carry a `:<n>` suffix, e.g. `web:0`, `web:1`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{op_key, Action, ActionKind};
use crate::config::SchedulerConfig;
use crate::constraint::Ticket;
use crate::error::{CoreError, CoreResult};
use crate::node::{Node, NodeId};
use crate::resource::{is_true, Resource, ResourceId, RestartType, Variant};
use crate::role::Role;
use crate::working_set::WorkingSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub tags: Vec<TagSpec>,
    #[serde(default)]
    pub templates: Vec<TagSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub uname: Option<String>,
    #[serde(default = "default_true")]
    pub online: bool,
    #[serde(default)]
    pub unclean: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub id: String,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default = "default_role")]
    pub role: Role,
    /// Defaults to the current role.
    pub next_role: Option<Role>,
    #[serde(default)]
    pub running_on: Vec<String>,
    pub allocated_to: Option<String>,
    pub partial_migration_target: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    #[serde(default)]
    pub children: Vec<ResourceSpec>,
}

/// An action already scheduled for a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub task: String,
    pub node: Option<String>,
    #[serde(default)]
    pub interval_ms: u32,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "default_true")]
    pub runnable: bool,
    #[serde(default)]
    pub pseudo: bool,
}

/// A named list of resource ids (a tag, or the primitives of a template).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSpec {
    pub id: String,
    #[serde(default)]
    pub refs: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_role() -> Role {
    Role::Stopped
}

impl WorkingSet {
    pub fn from_snapshot(snapshot: &ClusterSnapshot, config: SchedulerConfig) -> CoreResult<Self> {
        let mut ws = WorkingSet::new(config)?;
        ws.load_snapshot(snapshot)?;
        Ok(ws)
    }

    pub fn load_snapshot(&mut self, snapshot: &ClusterSnapshot) -> CoreResult<()> {
        for spec in &snapshot.nodes {
            if self.nodes.values().any(|n| n.id == spec.id) {
                return Err(CoreError::DuplicateNode(spec.id.clone()));
            }
            let mut node = Node::new(&spec.id, spec.uname.as_deref().unwrap_or(&spec.id));
            node.online = spec.online;
            node.unclean = spec.unclean;
            node.attrs = spec.attributes.clone();
            self.add_node(node);
        }

        for spec in &snapshot.resources {
            self.load_resource(spec, None, None)?;
        }

        for ticket in &snapshot.tickets {
            self.tickets.insert(ticket.id.clone(), ticket.clone());
        }
        for tag in &snapshot.tags {
            self.tags.insert(tag.id.clone(), tag.refs.clone());
        }
        for template in &snapshot.templates {
            self.templates.insert(template.id.clone(), template.refs.clone());
        }

        debug!(
            nodes = self.nodes.len(),
            resources = self.resources.len(),
            tickets = self.tickets.len(),
            "loaded cluster snapshot"
        );
        Ok(())
    }

    fn load_resource(
        &mut self,
        spec: &ResourceSpec,
        parent: Option<ResourceId>,
        clone_ancestor: Option<ResourceId>,
    ) -> CoreResult<ResourceId> {
        if self.resources.values().any(|r| r.id == spec.id) {
            return Err(CoreError::DuplicateResource(spec.id.clone()));
        }

        let mut rsc = Resource::new(&spec.id, spec.variant);
        rsc.meta = spec.meta.clone();
        rsc.params = spec.params.clone();
        rsc.role = spec.role;
        rsc.next_role = spec.next_role.unwrap_or(spec.role);
        rsc.priority = rsc
            .meta_attr("priority")
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);
        if rsc.meta_attr("restart-type") == Some("restart") {
            rsc.restart_type = RestartType::Restart;
        }
        rsc.flags.critical = rsc.meta_attr("critical").is_none_or(is_true);
        rsc.flags.allow_migrate = rsc.meta_attr("allow-migrate").is_some_and(is_true);
        rsc.flags.managed = rsc.meta_attr("is-managed").is_none_or(is_true);
        rsc.flags.notify = rsc.meta_attr("notify").is_some_and(is_true);

        if clone_ancestor.is_some() {
            let (base, _) = spec
                .id
                .rsplit_once(':')
                .ok_or_else(|| CoreError::InvalidInstanceId(spec.id.clone()))?;
            rsc.clone_name = Some(base.to_string());
        }

        rsc.running_on = self.resolve_nodes(&spec.id, &spec.running_on)?;
        rsc.allocated_to = self.resolve_node(&spec.id, spec.allocated_to.as_deref())?;
        rsc.partial_migration_target =
            self.resolve_node(&spec.id, spec.partial_migration_target.as_deref())?;

        let id = self.add_resource(rsc, parent);

        for action in &spec.actions {
            let node = self.resolve_node(&spec.id, action.node.as_deref())?;
            let task = ActionKind::parse(&action.task);
            let mut created = Action::new(
                op_key(&spec.id, &action.task, action.interval_ms),
                task,
                Some(id),
                node,
            );
            created.interval_ms = action.interval_ms;
            created.flags.optional = action.optional;
            created.flags.runnable = action.runnable;
            created.flags.pseudo = action.pseudo;
            let action_id = self.actions.insert(created);
            self.resources[id].actions.push(action_id);
        }

        let clone_ancestor = if spec.variant.is_clone() {
            Some(id)
        } else {
            clone_ancestor
        };
        for child in &spec.children {
            self.load_resource(child, Some(id), clone_ancestor)?;
        }
        Ok(id)
    }

    fn resolve_nodes(&self, rsc: &str, names: &[String]) -> CoreResult<Vec<NodeId>> {
        names
            .iter()
            .map(|name| {
                self.find_node(name).ok_or_else(|| CoreError::UnknownNode {
                    rsc: rsc.to_string(),
                    node: name.clone(),
                })
            })
            .collect()
    }

    fn resolve_node(&self, rsc: &str, name: Option<&str>) -> CoreResult<Option<NodeId>> {
        name.map(|n| {
            self.find_node(n).ok_or_else(|| CoreError::UnknownNode {
                rsc: rsc.to_string(),
                node: n.to_string(),
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(json: serde_json::Value) -> CoreResult<WorkingSet> {
        let snapshot: ClusterSnapshot = serde_json::from_value(json).unwrap();
        let config = SchedulerConfig {
            now: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        };
        WorkingSet::from_snapshot(&snapshot, config)
    }

    #[test]
    fn loads_clone_instances() {
        let ws = load(serde_json::json!({
            "nodes": [{"id": "1", "uname": "alpha"}, {"id": "2", "uname": "beta"}],
            "resources": [{
                "id": "web-clone",
                "variant": "clone",
                "meta": {"notify": "true"},
                "children": [
                    {"id": "web:0", "role": "Started", "running_on": ["alpha"]},
                    {"id": "web:1", "role": "Stopped"}
                ]
            }]
        }))
        .unwrap();

        let clone = ws.find_resource("web-clone").unwrap();
        assert!(ws.resources[clone].flags.notify);
        assert_eq!(ws.resources[clone].children.len(), 2);
        let inst = ws.find_resource("web:0").unwrap();
        assert_eq!(ws.resources[inst].clone_name.as_deref(), Some("web"));
        assert_eq!(ws.resources[inst].running_on.len(), 1);
        assert_eq!(ws.resources[inst].next_role, Role::Started);
    }

    #[test]
    fn meta_attributes_become_flags() {
        let ws = load(serde_json::json!({
            "nodes": [{"id": "alpha"}],
            "resources": [{
                "id": "db",
                "meta": {"critical": "false", "allow-migrate": "true", "priority": "5", "restart-type": "restart"},
                "actions": [{"task": "start", "node": "alpha"}, {"task": "monitor", "node": "alpha", "interval_ms": 10000}]
            }]
        }))
        .unwrap();
        let db = &ws.resources[ws.find_resource("db").unwrap()];
        assert!(!db.flags.critical);
        assert!(db.flags.allow_migrate);
        assert_eq!(db.priority, 5);
        assert_eq!(db.restart_type, RestartType::Restart);
        let keys: Vec<_> = db.actions.iter().map(|a| ws.actions[*a].uuid.as_str()).collect();
        assert_eq!(keys, vec!["db_start_0", "db_monitor_10000"]);
    }

    #[test]
    fn rejects_unknown_node() {
        let err = load(serde_json::json!({
            "resources": [{"id": "db", "running_on": ["ghost"]}]
        }))
        .err()
        .unwrap();
        assert!(matches!(err, CoreError::UnknownNode { .. }));
    }

    #[test]
    fn rejects_duplicate_and_unsuffixed_instances() {
        assert!(matches!(
            load(serde_json::json!({"resources": [{"id": "a"}, {"id": "a"}]})),
            Err(CoreError::DuplicateResource(_))
        ));
        assert!(matches!(
            load(serde_json::json!({"resources": [{"id": "c", "variant": "clone", "children": [{"id": "p"}]}]})),
            Err(CoreError::InvalidInstanceId(_))
        ));
    }
}
