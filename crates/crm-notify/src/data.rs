//! Notification data: the pseudo-actions of one clone action and the
//! instance buckets that become the environment of every notify action.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crm_core::{ActionId, ActionKind, NodeId, ResourceId, WorkingSet};

/// Placeholder for an empty list. Resource agents expect the variable to be
/// set to something other than an empty string.
pub const EMPTY_LIST: &str = " ";

/// One clone instance, and the node it is on or moving to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyEntry {
    pub rsc: Option<ResourceId>,
    pub node: Option<NodeId>,
}

impl NotifyEntry {
    pub fn new(rsc: ResourceId, node: Option<NodeId>) -> Self {
        Self {
            rsc: Some(rsc),
            node,
        }
    }
}

/// Everything needed to notify a clone's instances about one action.
#[derive(Debug, Clone)]
pub struct NotifyData {
    /// The clone action being notified about.
    pub action: ActionKind,
    pub pre: Option<ActionId>,
    pub pre_done: Option<ActionId>,
    pub post: Option<ActionId>,
    pub post_done: Option<ActionId>,

    pub active: Vec<NotifyEntry>,
    pub inactive: Vec<NotifyEntry>,
    pub promoted: Vec<NotifyEntry>,
    pub unpromoted: Vec<NotifyEntry>,
    pub start: Vec<NotifyEntry>,
    pub stop: Vec<NotifyEntry>,
    pub promote: Vec<NotifyEntry>,
    pub demote: Vec<NotifyEntry>,

    /// Nodes the clone may run on, taken from the first resource collected.
    pub allowed_nodes: Option<Vec<NodeId>>,
    /// `notify_*` variables handed to every notify action.
    pub keys: BTreeMap<String, String>,
}

impl NotifyData {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            pre: None,
            pre_done: None,
            post: None,
            post_done: None,
            active: Vec::new(),
            inactive: Vec::new(),
            promoted: Vec::new(),
            unpromoted: Vec::new(),
            start: Vec::new(),
            stop: Vec::new(),
            promote: Vec::new(),
            demote: Vec::new(),
            allowed_nodes: None,
            keys: BTreeMap::new(),
        }
    }

    pub fn add_key(&mut self, name: &str, value: impl Into<String>) {
        self.keys.insert(name.to_string(), value.into());
    }

    /// The action bucket matching the notified action, if it has one.
    pub fn bucket_for_action(&self) -> Option<&[NotifyEntry]> {
        match self.action {
            ActionKind::Start => Some(&self.start),
            ActionKind::Stop => Some(&self.stop),
            ActionKind::Promote => Some(&self.promote),
            ActionKind::Demote => Some(&self.demote),
            _ => None,
        }
    }
}

/// Missing resources and nodes sort first, then resource ids, then node ids.
pub fn compare_entries(ws: &WorkingSet, a: &NotifyEntry, b: &NotifyEntry) -> Ordering {
    match (a.rsc, b.rsc) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(ra), Some(rb)) => {
            let by_id = ws.resources[ra].id.cmp(&ws.resources[rb].id);
            if by_id != Ordering::Equal {
                return by_id;
            }
        }
    }
    match (a.node, b.node) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(na), Some(nb)) => ws.nodes[na].id.cmp(&ws.nodes[nb].id),
    }
}

/// Sort a bucket and render it as space-separated instance names and,
/// when `with_nodes` is set, the parallel list of node names.
///
/// Each instance appears once. Entries without a node are left out of
/// node-bearing lists. An empty list renders as [`EMPTY_LIST`].
pub fn entries_to_strings(
    ws: &WorkingSet,
    entries: &mut [NotifyEntry],
    with_nodes: bool,
) -> (String, Option<String>) {
    entries.sort_by(|a, b| compare_entries(ws, a, b));

    let mut rsc_names: Vec<&str> = Vec::new();
    let mut node_names: Vec<&str> = Vec::new();
    let mut last_rsc: Option<&str> = None;

    for entry in entries.iter() {
        let Some(rsc) = entry.rsc else {
            continue;
        };
        if with_nodes && entry.node.is_none() {
            continue;
        }
        let rsc_id = ws.resources[rsc].id.as_str();
        if last_rsc == Some(rsc_id) {
            continue;
        }
        last_rsc = Some(rsc_id);

        rsc_names.push(rsc_id);
        if let Some(node) = entry.node.filter(|_| with_nodes) {
            node_names.push(ws.nodes[node].uname.as_str());
        }
    }

    let nodes = with_nodes.then(|| join_or_empty(&node_names));
    (join_or_empty(&rsc_names), nodes)
}

/// Node names, space-separated, in the order given.
pub fn node_names(ws: &WorkingSet, nodes: &[NodeId]) -> String {
    let names: Vec<&str> = nodes.iter().map(|n| ws.nodes[*n].uname.as_str()).collect();
    join_or_empty(&names)
}

fn join_or_empty(words: &[&str]) -> String {
    if words.is_empty() {
        EMPTY_LIST.to_string()
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::{Node, Resource, SchedulerConfig, Variant};

    fn make_ws() -> (WorkingSet, Vec<ResourceId>, Vec<NodeId>) {
        let mut ws = WorkingSet::new(SchedulerConfig::default()).unwrap();
        let nodes = vec![
            ws.add_node(Node::new("1", "alpha")),
            ws.add_node(Node::new("2", "beta")),
        ];
        let clone = ws.add_resource(Resource::new("web", Variant::Clone), None);
        let rscs = ["web:1", "web:0", "web:2"]
            .iter()
            .map(|id| ws.add_resource(Resource::new(*id, Variant::Primitive), Some(clone)))
            .collect();
        (ws, rscs, nodes)
    }

    #[test]
    fn empty_bucket_is_a_single_space() {
        let (ws, _, _) = make_ws();
        let (rscs, nodes) = entries_to_strings(&ws, &mut [], true);
        assert_eq!(rscs, " ");
        assert_eq!(nodes.as_deref(), Some(" "));
    }

    #[test]
    fn sorted_by_resource_then_node() {
        let (ws, r, n) = make_ws();
        let mut entries = vec![
            NotifyEntry::new(r[2], Some(n[0])),
            NotifyEntry::new(r[0], Some(n[1])),
            NotifyEntry::new(r[1], Some(n[0])),
        ];
        let (rscs, nodes) = entries_to_strings(&ws, &mut entries, true);
        assert_eq!(rscs, "web:0 web:1 web:2");
        assert_eq!(nodes.as_deref(), Some("alpha beta alpha"));
    }

    #[test]
    fn duplicates_collapse() {
        let (ws, r, n) = make_ws();
        let mut entries = vec![
            NotifyEntry::new(r[0], Some(n[1])),
            NotifyEntry::new(r[0], Some(n[0])),
        ];
        let (rscs, nodes) = entries_to_strings(&ws, &mut entries, true);
        assert_eq!(rscs, "web:1");
        assert_eq!(nodes.as_deref(), Some("alpha"));
    }

    #[test]
    fn nodeless_entries_only_in_resource_lists() {
        let (ws, r, n) = make_ws();
        let mut entries = vec![NotifyEntry::new(r[0], None), NotifyEntry::new(r[1], Some(n[0]))];
        let (rscs, nodes) = entries_to_strings(&ws, &mut entries.clone(), true);
        assert_eq!(rscs, "web:0");
        assert_eq!(nodes.as_deref(), Some("alpha"));

        let (rscs, nodes) = entries_to_strings(&ws, &mut entries, false);
        assert_eq!(rscs, "web:0 web:1");
        assert!(nodes.is_none());
    }

    #[test]
    fn missing_resource_sorts_first() {
        let (ws, r, _) = make_ws();
        let mut entries = vec![
            NotifyEntry::new(r[0], None),
            NotifyEntry {
                rsc: None,
                node: None,
            },
        ];
        entries.sort_by(|a, b| compare_entries(&ws, a, b));
        assert!(entries[0].rsc.is_none());
    }
}
