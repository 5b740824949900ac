//! End-to-end constraint unpacking from declarative fixtures.
//!
//! Each test loads a cluster snapshot and a constraint document from JSON,
//! runs the whole walker and inspects the working set it leaves behind:
//! - Role filters on non-promotable resources
//! - Mandatory orderings and their inverse
//! - Colocation set chains and anti-colocation edges
//! - Revoked tickets on promoted clone instances
//! - Rule folding across nodes

use crm_constraints::{ConstraintSpec, unpack_constraints};
use crm_core::{
    ClusterSnapshot, Level, LossPolicy, OrderFlags, Role, SchedulerConfig, Score, WorkingSet,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

fn run(snapshot: Value, constraints: Value) -> WorkingSet {
    init_tracing();
    let snapshot: ClusterSnapshot = serde_json::from_value(snapshot).unwrap();
    let constraints: Vec<ConstraintSpec> = serde_json::from_value(constraints).unwrap();
    let config = SchedulerConfig {
        now: Some("2024-06-01T12:00:00Z".into()),
        ..Default::default()
    };
    let mut ws = WorkingSet::from_snapshot(&snapshot, config).unwrap();
    unpack_constraints(&constraints, &mut ws);
    ws
}

fn three_nodes() -> Value {
    json!([
        { "id": "1", "uname": "n1", "attributes": { "rack": "a", "weight": "7" } },
        { "id": "2", "uname": "n2", "attributes": { "rack": "b" } },
        { "id": "3", "uname": "n3", "attributes": { "rack": "c", "weight": "3" } }
    ])
}

fn score_on(ws: &WorkingSet, rsc: &str, node: &str) -> Score {
    let rsc = ws.find_resource(rsc).unwrap();
    let node = ws.find_node(node).unwrap();
    ws.resources[rsc].allowed_nodes[&node]
}

// ── Locations ───────────────────────────────────────────────────────

#[test]
fn promoted_filter_on_primitive_still_applies_score() {
    let ws = run(
        json!({ "nodes": three_nodes(), "resources": [{ "id": "R" }] }),
        json!([{
            "type": "location", "id": "loc1", "rsc": "R",
            "node": "n1", "score": "100", "role": "Promoted"
        }]),
    );

    assert_eq!(ws.errors().count(), 1);
    assert_eq!(score_on(&ws, "R", "n1"), Score::new(100));
    assert_eq!(score_on(&ws, "R", "n2"), Score::ZERO);
    assert_eq!(ws.locations[0].role_filter, Role::Promoted);
}

#[test]
fn and_rule_scores_only_matching_node() {
    let ws = run(
        json!({ "nodes": three_nodes(), "resources": [{ "id": "R" }] }),
        json!([{
            "type": "location", "id": "loc1", "rsc": "R",
            "rules": [{
                "id": "r1", "score": "50",
                "expressions": [
                    { "expression": "attribute", "attribute": "rack", "operation": "eq", "value": "b" }
                ]
            }]
        }]),
    );

    assert_eq!(ws.locations.len(), 1);
    assert_eq!(ws.locations[0].nodes.len(), 1);
    assert_eq!(score_on(&ws, "R", "n2"), Score::new(50));
    assert_eq!(score_on(&ws, "R", "n1"), Score::ZERO);
}

#[test]
fn or_rules_accumulate_across_rules() {
    let ws = run(
        json!({ "nodes": three_nodes(), "resources": [{ "id": "R" }] }),
        json!([{
            "type": "location", "id": "loc1", "rsc": "R",
            "rules": [
                {
                    "id": "r1", "score": "10", "boolean-op": "or",
                    "expressions": [
                        { "expression": "attribute", "attribute": "rack", "operation": "eq", "value": "a" },
                        { "expression": "attribute", "attribute": "rack", "operation": "eq", "value": "c" }
                    ]
                },
                {
                    "id": "r2", "score-attribute": "weight",
                    "expressions": [
                        { "expression": "attribute", "attribute": "weight", "operation": "defined" }
                    ]
                }
            ]
        }]),
    );

    assert_eq!(score_on(&ws, "R", "n1"), Score::new(17));
    assert_eq!(score_on(&ws, "R", "n2"), Score::ZERO);
    assert_eq!(score_on(&ws, "R", "n3"), Score::new(13));
}

// ── Orderings ───────────────────────────────────────────────────────

#[test]
fn mandatory_order_creates_inverse() {
    let ws = run(
        json!({ "nodes": three_nodes(), "resources": [{ "id": "A" }, { "id": "B" }] }),
        json!([{
            "type": "order", "id": "o1", "first": "A", "first-action": "start",
            "then": "B", "then-action": "start", "kind": "Mandatory"
        }]),
    );

    let keys = ws.ordering_keys();
    assert_eq!(keys.len(), 2);
    assert_eq!((keys[0].0.as_str(), keys[0].1.as_str()), ("A_start_0", "B_start_0"));
    assert_eq!(
        keys[0].2,
        OrderFlags::OPTIONAL | OrderFlags::IMPLIES_THEN | OrderFlags::RUNNABLE_LEFT
    );
    assert_eq!((keys[1].0.as_str(), keys[1].1.as_str()), ("B_stop_0", "A_stop_0"));
    assert_eq!(keys[1].2, OrderFlags::OPTIONAL | OrderFlags::IMPLIES_FIRST);
    assert_eq!(ws.orderings[0].id + 1, ws.orderings[1].id);
}

#[test]
fn symmetric_serialize_degrades_to_asymmetric() {
    let ws = run(
        json!({ "nodes": three_nodes(), "resources": [{ "id": "A" }, { "id": "B" }] }),
        json!([{
            "type": "order", "id": "o1", "first": "A", "then": "B",
            "kind": "Serialize", "symmetrical": true
        }]),
    );

    assert_eq!(ws.orderings.len(), 1);
    assert!(ws.orderings[0].flags.serialize_only);
    assert!(ws.diagnostics.iter().any(|d| d.level == Level::Warning));
}

// ── Colocations ─────────────────────────────────────────────────────

#[test]
fn group_colocation_set_chains_members() {
    let ws = run(
        json!({
            "nodes": three_nodes(),
            "resources": [{ "id": "X" }, { "id": "Y" }, { "id": "Z" }]
        }),
        json!([{
            "type": "colocation", "id": "c1", "score": "100",
            "sets": [{ "id": "s1", "resources": ["X", "Y", "Z"], "sequential": true, "ordering": "group" }]
        }]),
    );

    let pairs: Vec<(&str, &str)> = ws
        .colocations
        .iter()
        .map(|c| {
            (
                ws.resources[c.dependent].id.as_str(),
                ws.resources[c.primary].id.as_str(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![("Y", "X"), ("Z", "Y")]);

    let y = ws.find_resource("Y").unwrap();
    assert_eq!(ws.resources[y].colocations_as_dependent.len(), 1);
    assert_eq!(ws.resources[y].colocations_as_primary.len(), 1);
}

#[test]
fn mandatory_anti_colocation_adds_two_edges() {
    let ws = run(
        json!({ "nodes": three_nodes(), "resources": [{ "id": "A" }, { "id": "B" }] }),
        json!([
            { "type": "colocation", "id": "c0", "rsc": "A", "with-rsc": "B", "score": "0" },
            { "type": "colocation", "id": "c1", "rsc": "A", "with-rsc": "B", "score": "-INFINITY" }
        ]),
    );

    assert_eq!(ws.colocations.len(), 1);
    assert_eq!(ws.orderings.len(), 2);
    assert!(ws.orderings.iter().all(|e| e.flags.anti_colocation));
}

// ── Tickets ─────────────────────────────────────────────────────────

#[test]
fn revoked_ticket_blocks_promotion_immediately() {
    let ws = run(
        json!({
            "nodes": three_nodes(),
            "resources": [{
                "id": "ms", "variant": "promotable",
                "children": [
                    { "id": "R:0", "role": "Promoted", "running_on": ["n1"] },
                    { "id": "R:1", "role": "Unpromoted", "running_on": ["n2"] }
                ]
            }],
            "tickets": [{ "id": "T", "granted": false }]
        }),
        json!([{ "type": "ticket", "id": "t1", "ticket": "T", "rsc": "ms", "rsc-role": "Promoted" }]),
    );

    assert_eq!(ws.ticket_constraints.len(), 1);
    assert_eq!(ws.ticket_constraints[0].loss_policy, LossPolicy::Demote);
    assert_eq!(ws.locations.len(), 2);
    for location in &ws.locations {
        assert_eq!(location.role_filter, Role::Promoted);
        assert!(location.nodes.iter().all(|n| n.weight == Score::NEG_INFINITY));
    }
    // Instances may keep running unpromoted.
    assert_eq!(score_on(&ws, "R:0", "n1"), Score::ZERO);
}

#[test]
fn dropped_constraint_does_not_affect_others() {
    let ws = run(
        json!({ "nodes": three_nodes(), "resources": [{ "id": "A" }] }),
        json!([
            { "type": "location", "id": "bad", "rsc": "A", "rsc-pattern": "A" },
            { "type": "location", "rsc": "A", "node": "n1", "score": "5" },
            { "type": "location", "id": "good", "rsc": "A", "node": "n2", "score": "5" }
        ]),
    );

    assert_eq!(ws.locations.len(), 1);
    assert_eq!(ws.locations[0].id, "good");
    assert_eq!(ws.errors().count(), 2);
}
