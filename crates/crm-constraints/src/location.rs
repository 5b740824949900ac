//! Location constraints: node preferences for resources.
//!
//! Three forms feed the same sink:
//! - **node + score** — one literal preference
//! - **`rsc-pattern`** — the constraint applies to every top-level resource
//!   whose id matches a regex (or, with a leading `!`, does not match)
//! - **rules** — each rule is evaluated on every node and the passing nodes
//!   receive the rule's score
//!
//! Every produced constraint is stored in the working set and, unless it is
//! restricted to the promoted role of a promotable clone, folded straight
//! into the resource's allowed-node scores.

use crm_core::{
    Discovery, LocationConstraint, Node, NodeWeight, ResourceId, Role, Score, WorkingSet,
};
use crm_rules::{NextChange, RegexMatch, RuleContext, RuleSpec, evaluate_rule};
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{ConstraintError, ConstraintResult};
use crate::model::LocationSpec;
use crate::sets::{resolve_resource, resolve_sets};
use crate::{parse_score, record, tags};

pub fn unpack_location(id: &str, spec: &LocationSpec, ws: &mut WorkingSet) -> ConstraintResult<()> {
    let expanded = tags::expand_location(id, spec, ws)?;
    let spec = expanded.as_ref().unwrap_or(spec);

    if spec.sets.is_empty() {
        return unpack_simple_location(id, spec, ws);
    }

    let sets = resolve_sets(id, &spec.sets, ws)?;
    for set in &sets {
        for rsc in &set.members {
            let result = unpack_rsc_location(
                id,
                spec,
                *rsc,
                set.role(),
                set.spec.score.as_deref(),
                None,
                ws,
            );
            record(ws, result);
        }
    }
    Ok(())
}

fn unpack_simple_location(id: &str, spec: &LocationSpec, ws: &mut WorkingSet) -> ConstraintResult<()> {
    if spec.rsc.is_none() && spec.rsc_pattern.is_none() {
        return Err(ConstraintError::MissingAttribute {
            constraint: id.to_string(),
            attribute: "rsc",
        });
    }

    if spec.rsc.is_some() {
        let rsc = resolve_resource(id, "rsc", spec.rsc.as_deref(), None, ws)?;
        unpack_rsc_location(id, spec, rsc, None, None, None, ws)?;
    }

    if let Some(pattern) = spec.rsc_pattern.as_deref() {
        let (invert, pattern) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        let re = Regex::new(pattern).map_err(|e| ConstraintError::InvalidPattern {
            constraint: id.to_string(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        for rsc in ws.top_level.clone() {
            let rsc_id = ws.resources[rsc].id.clone();
            match (re.captures(&rsc_id), invert) {
                (Some(captures), false) => {
                    debug!(constraint = id, rsc = %rsc_id, pattern, "resource matched pattern");
                    let re_match = RegexMatch::from_captures(&captures);
                    let result = unpack_rsc_location(id, spec, rsc, None, None, Some(&re_match), ws);
                    record(ws, result);
                }
                (None, true) => {
                    debug!(constraint = id, rsc = %rsc_id, pattern, "resource is an inverted match");
                    let result = unpack_rsc_location(id, spec, rsc, None, None, None, ws);
                    record(ws, result);
                }
                _ => trace!(constraint = id, rsc = %rsc_id, pattern, "resource does not match"),
            }
        }
    }
    Ok(())
}

/// Role filter as written on a location; the unpromoted role and "any" are
/// the same thing since every promoted instance passes through unpromoted.
fn location_role_filter(id: &str, role: Option<&str>) -> ConstraintResult<Role> {
    let Some(text) = role else {
        return Ok(Role::Unknown);
    };
    match text.parse::<Role>() {
        Ok(Role::Started | Role::Unpromoted) => Ok(Role::Unknown),
        Ok(role) => Ok(role),
        Err(_) => Err(ConstraintError::InvalidRole {
            constraint: id.to_string(),
            role: text.to_string(),
        }),
    }
}

fn unpack_rsc_location(
    id: &str,
    spec: &LocationSpec,
    rsc: ResourceId,
    role: Option<&str>,
    score: Option<&str>,
    re_match: Option<&RegexMatch>,
    ws: &mut WorkingSet,
) -> ConstraintResult<()> {
    let discovery = match spec.resource_discovery.as_deref() {
        None => Discovery::Always,
        Some(text) => text.parse().unwrap_or_else(|bad: String| {
            ws.config_err(format!(
                "Invalid resource-discovery value '{bad}' in location constraint '{id}'"
            ));
            Discovery::Always
        }),
    };

    let score = score.or(spec.score.as_deref());
    if let (Some(node_name), Some(score)) = (spec.node.as_deref(), score) {
        let Some(node) = ws.find_node(node_name) else {
            trace!(constraint = id, node = node_name, "location refers to unknown node");
            return Ok(());
        };
        let role_filter = location_role_filter(id, role.or(spec.role.as_deref()))?;
        let weight = parse_score(ws, id, score);
        add_location(
            ws,
            LocationConstraint {
                id: id.to_string(),
                rsc,
                role_filter,
                discovery,
                nodes: vec![NodeWeight { node, weight }],
            },
        );
        return Ok(());
    }

    if spec.rules.is_empty() {
        return Err(ConstraintError::NoRules(id.to_string()));
    }

    let mut next = NextChange::new();
    for rule in &spec.rules {
        generate_location_rule(id, rsc, rule, discovery, &mut next, re_match, ws);
    }
    if let Some(at) = next.get() {
        ws.update_recheck(at);
    }
    Ok(())
}

/// Where a rule's per-node score comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreSource {
    Raw(Score),
    /// Read from this node attribute; a node without it scores -INFINITY.
    Attribute(String),
}

impl ScoreSource {
    pub fn score_for(&self, node: &Node) -> Score {
        match self {
            ScoreSource::Raw(score) => *score,
            ScoreSource::Attribute(name) => match node.attribute(name) {
                Some(value) => Score::parse(value).unwrap_or(Score::ZERO),
                None => {
                    debug!(node = %node.uname, attribute = %name, "node has no value for score attribute");
                    Score::NEG_INFINITY
                }
            },
        }
    }
}

/// Evaluate a rule on every node and return the passing nodes with their
/// weights.
///
/// With `and` the candidate list starts as every node and failures are
/// removed; with `or` it starts empty and passing nodes are admitted with
/// their score added to zero. Since each node evaluates the whole rule once,
/// both converge on the passing nodes; the connective itself is applied by
/// the rule evaluator.
pub fn fold_rule(
    rule: &RuleSpec,
    source: &ScoreSource,
    rsc: ResourceId,
    re_match: Option<&RegexMatch>,
    next: &mut NextChange,
    ws: &WorkingSet,
) -> Vec<NodeWeight> {
    let resource = &ws.resources[rsc];
    let mut matched = Vec::new();
    for (node_id, node) in ws.nodes.iter() {
        let ctx = RuleContext {
            node: Some(node),
            params: Some(&resource.params),
            meta: Some(&resource.meta),
            now: ws.now,
            re_match,
        };
        if !evaluate_rule(rule, &ctx, next) {
            trace!(node = %node.uname, "rule failed on node");
            continue;
        }
        let weight = Score::ZERO + source.score_for(node);
        trace!(node = %node.uname, %weight, "rule passed on node");
        matched.push(NodeWeight {
            node: node_id,
            weight,
        });
    }
    matched
}

fn generate_location_rule(
    id: &str,
    rsc: ResourceId,
    rule: &RuleSpec,
    discovery: Discovery,
    next: &mut NextChange,
    re_match: Option<&RegexMatch>,
    ws: &mut WorkingSet,
) {
    let rule_id = rule.id.clone().unwrap_or_else(|| format!("{id}-rule"));

    let role_filter = match rule.role.as_deref() {
        None => Role::Unknown,
        Some(text) => match text.parse::<Role>() {
            Ok(Role::Unpromoted) => Role::Unknown,
            Ok(role) => role,
            Err(_) => {
                ws.config_err(format!("Bad role specified for rule '{rule_id}': {text}"));
                return;
            }
        },
    };

    let source = match (&rule.score, &rule.score_attribute) {
        (Some(score), _) => ScoreSource::Raw(parse_score(ws, &rule_id, score)),
        (None, Some(attribute)) => ScoreSource::Attribute(match re_match {
            Some(m) => m.expand(attribute),
            None => attribute.clone(),
        }),
        (None, None) => {
            ws.config_err(format!("Rule '{rule_id}' has no score, assuming 0"));
            ScoreSource::Raw(Score::ZERO)
        }
    };

    let nodes = fold_rule(rule, &source, rsc, re_match, next, ws);
    if nodes.is_empty() {
        trace!(rule = %rule_id, "no matching nodes for rule");
        return;
    }
    debug!(rule = %rule_id, nodes = nodes.len(), "rule matched nodes");
    add_location(
        ws,
        LocationConstraint {
            id: rule_id,
            rsc,
            role_filter,
            discovery,
            nodes,
        },
    );
}

/// Store a location constraint and fold it into the resource's scores.
fn add_location(ws: &mut WorkingSet, location: LocationConstraint) {
    let rsc = location.rsc;
    let promotable = ws.is_promotable_context(rsc);

    if location.role_filter == Role::Promoted && !promotable {
        ws.config_err(format!(
            "Role filter '{}' in location constraint '{}' has no effect because '{}' is not promotable",
            location.role_filter, location.id, ws.resources[rsc].id
        ));
    }
    if location.discovery == Discovery::Exclusive {
        ws.resources[rsc].flags.exclusive_discover = true;
    }

    // Promoted-only preferences are left to the promotion pass.
    if !(location.role_filter == Role::Promoted && promotable) {
        fold_into(ws, rsc, &location.nodes);
    }

    store_location(ws, location);
}

fn store_location(ws: &mut WorkingSet, location: LocationConstraint) {
    debug!(
        constraint = %location.id,
        rsc = %ws.resources[location.rsc].id,
        nodes = location.nodes.len(),
        role = %location.role_filter,
        "added location constraint"
    );
    let index = ws.locations.len();
    ws.resources[location.rsc].locations.push(index);
    ws.locations.push(location);
}

fn all_nodes(ws: &WorkingSet, weight: Score) -> Vec<NodeWeight> {
    ws.nodes
        .keys()
        .map(|node| NodeWeight { node, weight })
        .collect()
}

/// Ban a resource from every node.
pub(crate) fn ban_everywhere(ws: &mut WorkingSet, rsc: ResourceId, id: &str) {
    let nodes = all_nodes(ws, Score::NEG_INFINITY);
    add_location(
        ws,
        LocationConstraint {
            id: id.to_string(),
            rsc,
            role_filter: Role::Unknown,
            discovery: Discovery::Always,
            nodes,
        },
    );
}

/// Keep a resource from being promoted on any node. It may still run
/// unpromoted, so nothing is folded into its allowed nodes.
pub(crate) fn ban_promotion(ws: &mut WorkingSet, rsc: ResourceId, id: &str) {
    let nodes = all_nodes(ws, Score::NEG_INFINITY);
    store_location(
        ws,
        LocationConstraint {
            id: id.to_string(),
            rsc,
            role_filter: Role::Promoted,
            discovery: Discovery::Always,
            nodes,
        },
    );
}

fn fold_into(ws: &mut WorkingSet, rsc: ResourceId, nodes: &[NodeWeight]) {
    let allowed = &mut ws.resources[rsc].allowed_nodes;
    for nw in nodes {
        *allowed.entry(nw.node).or_insert(Score::ZERO) += nw.weight;
    }
    for child in ws.resources[rsc].children.clone() {
        fold_into(ws, child, nodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::{Level, Resource, SchedulerConfig, Variant};
    use crm_rules::{AttributeExpression, DateExpression, Expression};

    fn make_ws() -> WorkingSet {
        let mut ws = WorkingSet::with_now(SchedulerConfig::default(), chrono::Utc::now());
        for (id, rack) in [("n1", "r1"), ("n2", "r2"), ("n3", "r1")] {
            let mut node = Node::new(id, id);
            node.attrs.insert("rack".into(), rack.into());
            if id != "n3" {
                node.attrs.insert("weight".into(), "25".into());
            }
            ws.add_node(node);
        }
        ws
    }

    fn rack_rule(op: Option<&str>, racks: &[&str], score: &str) -> RuleSpec {
        RuleSpec {
            id: Some("rule".into()),
            boolean_op: op.map(String::from),
            score: Some(score.into()),
            expressions: racks
                .iter()
                .map(|r| {
                    Expression::Attribute(AttributeExpression {
                        id: None,
                        attribute: "rack".into(),
                        operation: "eq".into(),
                        value: Some(r.to_string()),
                        value_type: None,
                        value_source: None,
                    })
                })
                .collect(),
            ..Default::default()
        }
    }

    fn score_on(ws: &WorkingSet, rsc: ResourceId, node: &str) -> Option<Score> {
        let node = ws.find_node(node)?;
        ws.resources[rsc].allowed_nodes.get(&node).copied()
    }

    #[test]
    fn and_rule_keeps_only_passing_nodes() {
        let mut ws = make_ws();
        let rsc = ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let rule = rack_rule(None, &["r2"], "50");
        let nodes = fold_rule(
            &rule,
            &ScoreSource::Raw(Score::from(50)),
            rsc,
            None,
            &mut NextChange::new(),
            &ws,
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node, ws.find_node("n2").unwrap());
        assert_eq!(nodes[0].weight, Score::from(50));
    }

    #[test]
    fn or_rule_admits_every_match() {
        let mut ws = make_ws();
        let rsc = ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let rule = rack_rule(Some("or"), &["r1", "r2"], "10");
        let nodes = fold_rule(
            &rule,
            &ScoreSource::Raw(Score::from(10)),
            rsc,
            None,
            &mut NextChange::new(),
            &ws,
        );
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| n.weight == Score::from(10)));
    }

    #[test]
    fn missing_score_attribute_is_negative_infinity() {
        let ws = make_ws();
        let n3 = &ws.nodes[ws.find_node("n3").unwrap()];
        let n1 = &ws.nodes[ws.find_node("n1").unwrap()];
        let source = ScoreSource::Attribute("weight".into());
        assert_eq!(source.score_for(n3), Score::NEG_INFINITY);
        assert_eq!(source.score_for(n1), Score::from(25));
    }

    #[test]
    fn rule_locations_fold_into_allowed_nodes() {
        let mut ws = make_ws();
        let rsc = ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("db".into()),
            rules: vec![rack_rule(None, &["r1"], "INFINITY")],
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert_eq!(score_on(&ws, rsc, "n1"), Some(Score::INFINITY));
        assert_eq!(score_on(&ws, rsc, "n2"), Some(Score::ZERO));
        assert_eq!(ws.locations.len(), 1);
        assert_eq!(ws.locations[0].id, "rule");
    }

    #[test]
    fn rule_without_matches_produces_nothing() {
        let mut ws = make_ws();
        ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("db".into()),
            rules: vec![rack_rule(None, &["r9"], "100")],
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert!(ws.locations.is_empty());
        assert!(ws.diagnostics.is_empty());
    }

    #[test]
    fn no_node_and_no_rules_is_an_error() {
        let mut ws = make_ws();
        ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("db".into()),
            ..Default::default()
        };
        assert!(matches!(
            unpack_location("loc", &spec, &mut ws),
            Err(ConstraintError::NoRules(_))
        ));
    }

    #[test]
    fn unknown_node_is_silently_ignored() {
        let mut ws = make_ws();
        ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("db".into()),
            node: Some("ghost".into()),
            score: Some("100".into()),
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert!(ws.locations.is_empty());
        assert!(ws.diagnostics.is_empty());
    }

    #[test]
    fn pattern_with_back_reference() {
        let mut ws = make_ws();
        let ip = ws.add_resource(Resource::new("ip-r2", Variant::Primitive), None);
        let other = ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let mut rule = rack_rule(None, &["%1"], "0");
        rule.score = None;
        rule.score_attribute = Some("weight".into());
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc_pattern: Some("^ip-(.*)$".into()),
            rules: vec![rule],
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert_eq!(score_on(&ws, ip, "n2"), Some(Score::from(25)));
        assert_eq!(score_on(&ws, ip, "n1"), Some(Score::ZERO));
        assert!(ws.resources[other].locations.is_empty());
    }

    #[test]
    fn inverted_pattern() {
        let mut ws = make_ws();
        let ip = ws.add_resource(Resource::new("ip-1", Variant::Primitive), None);
        let db = ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc_pattern: Some("!^ip-".into()),
            node: Some("n1".into()),
            score: Some("-INFINITY".into()),
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert_eq!(score_on(&ws, db, "n1"), Some(Score::NEG_INFINITY));
        assert_eq!(score_on(&ws, ip, "n1"), Some(Score::ZERO));
    }

    #[test]
    fn invalid_pattern_drops_constraint() {
        let mut ws = make_ws();
        ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc_pattern: Some("(unclosed".into()),
            node: Some("n1".into()),
            score: Some("5".into()),
            ..Default::default()
        };
        assert!(matches!(
            unpack_location("loc", &spec, &mut ws),
            Err(ConstraintError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn promoted_filter_on_promotable_clone_is_not_folded() {
        let mut ws = make_ws();
        let clone = ws.add_resource(Resource::new("ms", Variant::Promotable), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("ms".into()),
            role: Some("Promoted".into()),
            node: Some("n1".into()),
            score: Some("100".into()),
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert_eq!(score_on(&ws, clone, "n1"), Some(Score::ZERO));
        assert_eq!(ws.locations[0].role_filter, Role::Promoted);
        assert!(ws.diagnostics.is_empty());
    }

    #[test]
    fn unpromoted_filter_means_any_role() {
        let mut ws = make_ws();
        let clone = ws.add_resource(Resource::new("ms", Variant::Promotable), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("ms".into()),
            role: Some("Slave".into()),
            node: Some("n1".into()),
            score: Some("100".into()),
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert_eq!(ws.locations[0].role_filter, Role::Unknown);
        assert_eq!(score_on(&ws, clone, "n1"), Some(Score::from(100)));
    }

    #[test]
    fn bad_role_and_bad_discovery() {
        let mut ws = make_ws();
        ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("db".into()),
            role: Some("Sleeping".into()),
            node: Some("n1".into()),
            score: Some("100".into()),
            resource_discovery: Some("sometimes".into()),
            ..Default::default()
        };
        assert!(matches!(
            unpack_location("loc", &spec, &mut ws),
            Err(ConstraintError::InvalidRole { .. })
        ));
        assert_eq!(ws.diagnostics[0].level, Level::Error);
    }

    #[test]
    fn unknown_role_text_is_a_bad_role() {
        let mut ws = make_ws();
        ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("db".into()),
            role: Some("unknown".into()),
            node: Some("n1".into()),
            score: Some("100".into()),
            ..Default::default()
        };
        assert!(matches!(
            unpack_location("loc", &spec, &mut ws),
            Err(ConstraintError::InvalidRole { .. })
        ));
        assert!(ws.locations.is_empty());
    }

    #[test]
    fn unknown_rsc_is_rejected_before_unpacking() {
        let mut ws = make_ws();
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("ghost".into()),
            node: Some("n1".into()),
            score: Some("100".into()),
            ..Default::default()
        };
        assert!(matches!(
            unpack_location("loc", &spec, &mut ws),
            Err(ConstraintError::InvalidReference { .. })
        ));
        assert!(ws.locations.is_empty());
    }

    #[test]
    fn clone_name_targets_the_whole_clone() {
        let mut ws = make_ws();
        let clone = ws.add_resource(Resource::new("web-clone", Variant::Clone), None);
        let mut instances = Vec::new();
        for n in 0..2 {
            let mut child = Resource::new(format!("web:{n}"), Variant::Primitive);
            child.clone_name = Some("web".into());
            instances.push(ws.add_resource(child, Some(clone)));
        }
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("web".into()),
            node: Some("n1".into()),
            score: Some("100".into()),
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert_eq!(ws.locations[0].rsc, clone);
        for instance in instances {
            assert_eq!(score_on(&ws, instance, "n1"), Some(Score::from(100)));
        }
    }

    #[test]
    fn date_bound_rules_schedule_earliest_recheck() {
        let at = |s: &str| {
            chrono::DateTime::parse_from_rfc3339(s)
                .unwrap()
                .with_timezone(&chrono::Utc)
        };
        let mut ws = WorkingSet::with_now(SchedulerConfig::default(), at("2024-06-01T12:00:00Z"));
        ws.add_node(Node::new("n1", "n1"));
        let rsc = ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let date_rule = |id: &str, operation: &str, start: Option<&str>, end: Option<&str>| RuleSpec {
            id: Some(id.into()),
            score: Some("10".into()),
            expressions: vec![Expression::Date(DateExpression {
                id: None,
                operation: operation.into(),
                start: start.map(String::from),
                end: end.map(String::from),
                duration: None,
                date_spec: None,
            })],
            ..Default::default()
        };

        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("db".into()),
            rules: vec![date_rule("until-july", "lt", None, Some("2024-07-01"))],
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert_eq!(score_on(&ws, rsc, "n1"), Some(Score::from(10)));
        assert_eq!(ws.recheck_by, Some(at("2024-07-01T00:00:00Z")));

        // A rule that has not started yet still pulls the recheck earlier.
        let spec = LocationSpec {
            id: Some("loc2".into()),
            rsc: Some("db".into()),
            rules: vec![date_rule("from-mid-june", "gt", Some("2024-06-15"), None)],
            ..Default::default()
        };
        unpack_location("loc2", &spec, &mut ws).unwrap();
        assert_eq!(ws.locations.len(), 1);
        assert_eq!(ws.recheck_by, Some(at("2024-06-15T00:00:01Z")));
    }

    #[test]
    fn exclusive_discovery_flags_resource() {
        let mut ws = make_ws();
        let rsc = ws.add_resource(Resource::new("db", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            rsc: Some("db".into()),
            node: Some("n1".into()),
            score: Some("0".into()),
            resource_discovery: Some("exclusive".into()),
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert!(ws.resources[rsc].flags.exclusive_discover);
        assert_eq!(ws.locations[0].discovery, Discovery::Exclusive);
    }

    #[test]
    fn set_score_overrides_constraint_score() {
        let mut ws = make_ws();
        let a = ws.add_resource(Resource::new("a", Variant::Primitive), None);
        let b = ws.add_resource(Resource::new("b", Variant::Primitive), None);
        let spec = LocationSpec {
            id: Some("loc".into()),
            node: Some("n2".into()),
            score: Some("10".into()),
            sets: vec![crate::model::ResourceSetSpec {
                id: Some("s".into()),
                resources: vec!["a".into(), "b".into()],
                score: Some("-20".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        unpack_location("loc", &spec, &mut ws).unwrap();
        assert_eq!(score_on(&ws, a, "n2"), Some(Score::from(-20)));
        assert_eq!(score_on(&ws, b, "n2"), Some(Score::from(-20)));
    }
}
