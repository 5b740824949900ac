//! Colocation constraints.
//!
//! A colocation makes a dependent resource's placement follow a primary
//! resource. Every stored colocation is indexed from both resources, kept in
//! the order the allocator consumes them: higher priority first, clones
//! before groups before primitives, then by id.

use std::cmp::Ordering;

use crm_core::{ActionKind, Colocation, OrderFlags, ResourceId, Role, Score, WorkingSet, parse_bool};
use tracing::{debug, trace};

use crate::error::ConstraintResult;
use crate::model::ColocationSpec;
use crate::sets::{ResolvedSet, resolve_resource_or_warn, resolve_sets};
use crate::{parse_score, tags};

/// Arguments of [`new_colocation`].
#[derive(Debug, Clone, Copy)]
pub struct NewColocation<'a> {
    pub id: &'a str,
    /// Node attribute whose values must match; `#uname` when absent.
    pub node_attribute: Option<&'a str>,
    pub score: Score,
    pub dependent: ResourceId,
    pub primary: ResourceId,
    pub dependent_role: Option<&'a str>,
    pub primary_role: Option<&'a str>,
    pub influence: bool,
}

/// Record a colocation and return its index in the working set.
///
/// A zero score records nothing. A score of -INFINITY additionally orders
/// each side losing its role before the other gains it.
pub fn new_colocation(ws: &mut WorkingSet, request: NewColocation<'_>) -> Option<usize> {
    if request.score == Score::ZERO {
        trace!(constraint = request.id, "ignoring colocation with zero score");
        return None;
    }

    let dependent_role = colocation_role(ws, request.id, request.dependent_role);
    let primary_role = colocation_role(ws, request.id, request.primary_role);
    let colocation = Colocation {
        id: request.id.to_string(),
        dependent: request.dependent,
        primary: request.primary,
        score: request.score,
        dependent_role,
        primary_role,
        node_attribute: request.node_attribute.unwrap_or("#uname").to_string(),
        influence: request.influence,
    };
    debug!(
        constraint = request.id,
        dependent = %ws.resources[request.dependent].id,
        primary = %ws.resources[request.primary].id,
        node_attribute = %colocation.node_attribute,
        score = %request.score,
        "added colocation"
    );

    let index = ws.colocations.len();
    ws.colocations.push(colocation);
    insert_by_precedence(ws, request.dependent, index, |c| c.primary, true);
    insert_by_precedence(ws, request.primary, index, |c| c.dependent, false);

    if request.score.is_neg_infinity() {
        anti_colocation_order(ws, request.dependent, dependent_role, request.primary, primary_role);
        anti_colocation_order(ws, request.primary, primary_role, request.dependent, dependent_role);
    }
    Some(index)
}

/// `Started` and absent both mean "any role".
fn colocation_role(ws: &mut WorkingSet, id: &str, text: Option<&str>) -> Role {
    match Role::parse_filter(text) {
        Ok(role) => role,
        Err(_) => {
            ws.config_err(format!(
                "Treating role '{}' in colocation '{id}' as any role because it is not valid",
                text.unwrap_or_default()
            ));
            Role::Unknown
        }
    }
}

fn precedence(ws: &WorkingSet, a: ResourceId, b: ResourceId) -> Ordering {
    let (a, b) = (&ws.resources[a], &ws.resources[b]);
    b.priority
        .cmp(&a.priority)
        .then(b.variant.cmp(&a.variant))
        .then_with(|| a.id.cmp(&b.id))
}

/// Insert before the first entry that does not sort strictly ahead of the
/// new one, so equal entries keep insertion order reversed.
fn insert_by_precedence(
    ws: &mut WorkingSet,
    owner: ResourceId,
    index: usize,
    key: fn(&Colocation) -> ResourceId,
    as_dependent: bool,
) {
    let new_key = key(&ws.colocations[index]);
    let list = if as_dependent {
        &ws.resources[owner].colocations_as_dependent
    } else {
        &ws.resources[owner].colocations_as_primary
    };
    let position = list
        .iter()
        .position(|existing| {
            precedence(ws, new_key, key(&ws.colocations[*existing])) != Ordering::Greater
        })
        .unwrap_or(list.len());

    let list = if as_dependent {
        &mut ws.resources[owner].colocations_as_dependent
    } else {
        &mut ws.resources[owner].colocations_as_primary
    };
    list.insert(position, index);
}

/// Order `first` losing `first_role` before `then` gaining `then_role`.
fn anti_colocation_order(
    ws: &mut WorkingSet,
    first: ResourceId,
    first_role: Role,
    then: ResourceId,
    then_role: Role,
) {
    let first_tasks: &[ActionKind] = match first_role {
        Role::Promoted => &[ActionKind::Demote],
        Role::Unpromoted => &[ActionKind::Stop, ActionKind::Promote],
        _ => &[ActionKind::Stop],
    };
    let then_tasks: &[ActionKind] = match then_role {
        Role::Promoted => &[ActionKind::Promote],
        Role::Unpromoted => &[ActionKind::Start, ActionKind::Demote],
        _ => &[ActionKind::Start],
    };
    for first_task in first_tasks {
        for then_task in then_tasks {
            ws.order_resources(first, first_task, then, then_task, OrderFlags::ANTI_COLOCATION);
        }
    }
}

/// Explicit `influence`, else the dependent's `critical` meta-attribute.
fn unpack_influence(ws: &mut WorkingSet, id: &str, rsc: ResourceId, influence: Option<&str>) -> bool {
    if let Some(text) = influence {
        match parse_bool(text) {
            Some(value) => return value,
            None => ws.config_err(format!(
                "Constraint '{id}' has invalid value for influence (using default)"
            )),
        }
    }
    ws.resources[rsc].flags.critical
}

pub fn unpack_colocation(id: &str, spec: &ColocationSpec, ws: &mut WorkingSet) -> ConstraintResult<()> {
    let score = spec
        .score
        .as_deref()
        .map_or(Score::ZERO, |s| parse_score(ws, id, s));
    let influence = spec.influence.as_deref();

    let expanded = tags::expand_colocation(id, spec, ws)?;
    let set_specs = expanded.as_ref().map_or(&spec.sets, |e| &e.sets);
    if set_specs.is_empty() {
        return unpack_simple_colocation(id, spec, score, ws);
    }

    let sets = resolve_sets(id, set_specs, ws)?;
    for (i, set) in sets.iter().enumerate() {
        unpack_colocation_set(id, set, score, influence, ws);
        if i > 0 {
            colocate_rsc_sets(id, &sets[i - 1], set, score, influence, ws);
        }
    }
    Ok(())
}

fn unpack_simple_colocation(
    id: &str,
    spec: &ColocationSpec,
    score: Score,
    ws: &mut WorkingSet,
) -> ConstraintResult<()> {
    let Some(dependent) = resolve_resource_or_warn(
        id,
        "rsc",
        spec.rsc.as_deref(),
        spec.rsc_instance.as_deref(),
        ws,
    )?
    else {
        return Ok(());
    };
    let Some(primary) = resolve_resource_or_warn(
        id,
        "with-rsc",
        spec.with_rsc.as_deref(),
        spec.with_rsc_instance.as_deref(),
        ws,
    )?
    else {
        return Ok(());
    };

    if spec.symmetrical == Some(true) {
        ws.config_warn(format!(
            "The symmetrical attribute of colocation constraint '{id}' has been removed"
        ));
    }

    let influence = unpack_influence(ws, id, dependent, spec.influence.as_deref());
    new_colocation(
        ws,
        NewColocation {
            id,
            node_attribute: spec.node_attribute.as_deref(),
            score,
            dependent,
            primary,
            dependent_role: spec.rsc_role.as_deref(),
            primary_role: spec.with_rsc_role.as_deref(),
            influence,
        },
    );
    Ok(())
}

/// Colocations among the members of one set.
///
/// With a positive score a sequential set forms a chain: under `group`
/// ordering each member follows the one before it, under `listed` each
/// member leads the one after it. A negative score keeps every member away
/// from every earlier one.
fn unpack_colocation_set(
    id: &str,
    set: &ResolvedSet<'_>,
    score: Score,
    influence: Option<&str>,
    ws: &mut WorkingSet,
) {
    let score = match set.spec.score.as_deref() {
        Some(text) => parse_score(ws, set.id, text),
        None => score,
    };
    if score == Score::ZERO {
        trace!(constraint = id, set = set.id, "ignoring colocation set with zero score");
        return;
    }
    if set.spec.sequential == Some(false) {
        return;
    }

    let role = set.role();
    let group = set
        .spec
        .ordering
        .as_deref()
        .is_none_or(|o| o.eq_ignore_ascii_case("group"));
    let members = &set.members;

    if score > Score::ZERO {
        for pair in members.windows(2) {
            let (dependent, primary) = if group {
                (pair[1], pair[0])
            } else {
                (pair[0], pair[1])
            };
            let influence = unpack_influence(ws, id, dependent, influence);
            new_colocation(
                ws,
                NewColocation {
                    id: set.id,
                    node_attribute: None,
                    score,
                    dependent,
                    primary,
                    dependent_role: role,
                    primary_role: role,
                    influence,
                },
            );
        }
        return;
    }

    for rsc in members {
        let influence = unpack_influence(ws, id, *rsc, influence);
        for with in members {
            if ws.resources[*with].id.eq_ignore_ascii_case(&ws.resources[*rsc].id) {
                break;
            }
            new_colocation(
                ws,
                NewColocation {
                    id: set.id,
                    node_attribute: None,
                    score,
                    dependent: *rsc,
                    primary: *with,
                    dependent_role: role,
                    primary_role: role,
                    influence,
                },
            );
        }
    }
}

/// Colocate a set with the set before it.
///
/// A sequential set is represented by its boundary member: the first of
/// `set1` and the last of `set2`. Otherwise every member takes part.
fn colocate_rsc_sets(
    id: &str,
    set1: &ResolvedSet<'_>,
    set2: &ResolvedSet<'_>,
    score: Score,
    influence: Option<&str>,
    ws: &mut WorkingSet,
) {
    if score == Score::ZERO {
        trace!(constraint = id, "ignoring colocation between sets with zero score");
        return;
    }

    let rsc_1 = set1.spec.sequential.unwrap_or(true).then(|| set1.first()).flatten();
    let rsc_2 = set2.spec.sequential.unwrap_or(true).then(|| set2.last()).flatten();
    let dependents = rsc_1.map_or_else(|| set1.members.clone(), |r| vec![r]);
    let primaries = rsc_2.map_or_else(|| set2.members.clone(), |r| vec![r]);

    for dependent in dependents {
        let influence = unpack_influence(ws, id, dependent, influence);
        for primary in &primaries {
            new_colocation(
                ws,
                NewColocation {
                    id,
                    node_attribute: None,
                    score,
                    dependent,
                    primary: *primary,
                    dependent_role: set1.role(),
                    primary_role: set2.role(),
                    influence,
                },
            );
        }
    }
}
