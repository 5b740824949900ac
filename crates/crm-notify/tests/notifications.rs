//! Clone notifications end to end, from a JSON cluster snapshot.
//!
//! - Promotion of one instance of a promotable clone
//! - Rendering properties of the instance lists

use std::collections::BTreeSet;

use crm_core::{ActionKind, ClusterSnapshot, Node, Resource, ResourceId, SchedulerConfig, Variant, WorkingSet};
use crm_notify::{NotifyEntry, build, create_action_notifications, entries_to_strings};
use proptest::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

fn promotable_cluster() -> WorkingSet {
    let snapshot: ClusterSnapshot = serde_json::from_value(json!({
        "nodes": [{ "id": "1", "uname": "n1" }, { "id": "2", "uname": "n2" }],
        "resources": [{
            "id": "db", "variant": "promotable", "meta": { "notify": "true" },
            "children": [
                {
                    "id": "db:0", "role": "Unpromoted", "next_role": "Promoted",
                    "running_on": ["n1"], "allocated_to": "n1",
                    "actions": [{ "task": "promote", "node": "n1" }]
                },
                {
                    "id": "db:1", "role": "Unpromoted",
                    "running_on": ["n2"], "allocated_to": "n2"
                }
            ]
        }]
    }))
    .unwrap();
    WorkingSet::from_snapshot(&snapshot, SchedulerConfig::default()).unwrap()
}

// ── Promotion ───────────────────────────────────────────────────────

#[test]
fn promote_notifies_every_active_instance() {
    init_tracing();
    let mut ws = promotable_cluster();
    let db = ws.find_resource("db").unwrap();
    let promote = ws.custom_action(Some(db), "db_promote_0".into(), ActionKind::Promote, None, false);
    let promoted = ws.custom_action(Some(db), "db_promoted_0".into(), ActionKind::Promoted, None, false);

    let mut data = build(&mut ws, db, ActionKind::Promote, Some(promote), Some(promoted)).unwrap();
    create_action_notifications(&mut ws, db, &mut data);

    let mut created: Vec<String> = ws
        .actions
        .values()
        .filter(|a| a.task == ActionKind::Notify && a.node.is_some())
        .map(|a| a.uuid.clone())
        .collect();
    created.sort();
    assert_eq!(
        created,
        vec![
            "db:0_post_notify_promote_0",
            "db:0_pre_notify_promote_0",
            "db:1_post_notify_promote_0",
            "db:1_pre_notify_promote_0",
        ]
    );

    let db0 = ws.find_resource("db:0").unwrap();
    let instance_promote = ws.find_first_action(db0, &ActionKind::Promote).unwrap();
    let meta = &ws.actions[instance_promote].meta;
    assert_eq!(meta["notify_promote_resource"], "db:0");
    assert_eq!(meta["notify_promote_uname"], "n1");
    assert_eq!(meta["notify_unpromoted_resource"], "db:0 db:1");
    assert_eq!(meta["notify_slave_uname"], "n1 n2");
    assert_eq!(meta["notify_promoted_resource"], " ");
    assert_eq!(meta["notify_inactive_resource"], " ");

    for id in [data.pre, data.pre_done, data.post, data.post_done] {
        assert!(!ws.actions[id.unwrap()].flags.optional);
    }
}

#[test]
fn clone_without_notify_is_left_alone() {
    init_tracing();
    let mut ws = promotable_cluster();
    let db = ws.find_resource("db").unwrap();
    ws.resources[db].flags.notify = false;
    let promote = ws.custom_action(Some(db), "db_promote_0".into(), ActionKind::Promote, None, false);
    let actions_before = ws.actions.len();

    assert!(build(&mut ws, db, ActionKind::Promote, Some(promote), None).is_none());
    assert_eq!(ws.actions.len(), actions_before);
}

// ── Rendering properties ────────────────────────────────────────────

fn instances(count: usize) -> (WorkingSet, Vec<ResourceId>) {
    let mut ws = WorkingSet::new(SchedulerConfig::default()).unwrap();
    ws.add_node(Node::new("1", "n1"));
    let clone = ws.add_resource(Resource::new("c", Variant::Clone), None);
    let ids = (0..count)
        .map(|i| ws.add_resource(Resource::new(format!("c:{i}"), Variant::Primitive), Some(clone)))
        .collect();
    (ws, ids)
}

proptest! {
    #[test]
    fn rendered_list_is_sorted_and_unique(picks in proptest::collection::vec(0usize..8, 0..20)) {
        let (ws, ids) = instances(8);
        let mut entries: Vec<NotifyEntry> = picks.iter().map(|i| NotifyEntry::new(ids[*i], None)).collect();

        let (rendered, nodes) = entries_to_strings(&ws, &mut entries, false);
        prop_assert!(nodes.is_none());

        let expected: BTreeSet<String> = picks.iter().map(|i| format!("c:{i}")).collect();
        if expected.is_empty() {
            prop_assert_eq!(rendered, " ");
        } else {
            let names: Vec<&str> = rendered.split(' ').collect();
            let want: Vec<&str> = expected.iter().map(String::as_str).collect();
            prop_assert_eq!(names, want);
        }
    }

    #[test]
    fn node_list_parallels_resource_list(picks in proptest::collection::vec(0usize..8, 1..20)) {
        let (ws, ids) = instances(8);
        let node = ws.find_node("n1").unwrap();
        let mut entries: Vec<NotifyEntry> = picks.iter().map(|i| NotifyEntry::new(ids[*i], Some(node))).collect();

        let (rendered, nodes) = entries_to_strings(&ws, &mut entries, true);
        let nodes = nodes.unwrap();
        prop_assert_eq!(rendered.split(' ').count(), nodes.split(' ').count());
        prop_assert!(nodes.split(' ').all(|n| n == "n1"));
    }
}
