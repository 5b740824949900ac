//! Ordering constraints.
//!
//! An ordering becomes one or more [`OrderingEdge`](crm_core::OrderingEdge)s
//! whose flags follow from the constraint's kind and symmetry. Symmetric
//! orderings also get the inverse edge (stop `then` before stopping `first`).

use crm_core::{ActionKind, Endpoint, OrderFlags, ResourceId, RestartType, WorkingSet};
use tracing::{debug, trace, warn};

use crate::error::ConstraintResult;
use crate::model::OrderSpec;
use crate::sets::{ResolvedSet, resolve_resource, resolve_sets};
use crate::{parse_score, tags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Optional,
    Mandatory,
    /// The actions may not run concurrently, in either order.
    Serialize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    Asymmetric,
    Symmetric,
    /// The mirror edge of a symmetric ordering.
    SymmetricInverse,
}

/// Ordering kind from `kind`, falling back to the deprecated `score`.
/// An invalid kind is reset to Mandatory.
pub fn ordering_kind(
    id: &str,
    kind: Option<&str>,
    score: Option<&str>,
    ws: &mut WorkingSet,
) -> OrderKind {
    let Some(kind) = kind else {
        let Some(score) = score else {
            return OrderKind::Mandatory;
        };
        warn!(constraint = id, "score in ordering constraints is deprecated, use kind instead");
        return if parse_score(ws, id, score).value() == 0 {
            OrderKind::Optional
        } else {
            OrderKind::Mandatory
        };
    };

    if kind.eq_ignore_ascii_case("Mandatory") {
        OrderKind::Mandatory
    } else if kind.eq_ignore_ascii_case("Optional") {
        OrderKind::Optional
    } else if kind.eq_ignore_ascii_case("Serialize") {
        OrderKind::Serialize
    } else {
        ws.config_err(format!(
            "Resetting kind for constraint '{id}' to Mandatory because '{kind}' is not valid"
        ));
        OrderKind::Mandatory
    }
}

/// Explicit `symmetrical` (or the enclosing constraint's) wins, except that
/// Serialize orderings are never symmetric.
pub fn ordering_symmetry(
    id: &str,
    kind: OrderKind,
    symmetrical: Option<bool>,
    parent_symmetrical: Option<bool>,
    ws: &mut WorkingSet,
) -> Symmetry {
    match (symmetrical.or(parent_symmetrical), kind) {
        (Some(true), OrderKind::Serialize) => {
            ws.config_warn(format!(
                "Ignoring symmetrical for '{id}' because not valid with kind of Serialize"
            ));
            Symmetry::Asymmetric
        }
        (Some(true), _) => Symmetry::Symmetric,
        (Some(false), _) | (None, OrderKind::Serialize) => Symmetry::Asymmetric,
        (None, _) => Symmetry::Symmetric,
    }
}

pub fn flags_for_kind(kind: OrderKind, first_action: &ActionKind, symmetry: Symmetry) -> OrderFlags {
    let flags = OrderFlags::OPTIONAL;
    match (kind, symmetry) {
        (OrderKind::Serialize, _) => flags | OrderFlags::SERIALIZE_ONLY,
        (_, Symmetry::Asymmetric) => flags | OrderFlags::ASYMMETRICAL,
        (OrderKind::Optional, _) => flags,
        (OrderKind::Mandatory, Symmetry::Symmetric) if first_action.is_start_or_promote() => {
            flags | OrderFlags::IMPLIES_THEN | OrderFlags::RUNNABLE_LEFT
        }
        (OrderKind::Mandatory, Symmetry::Symmetric) => flags | OrderFlags::IMPLIES_THEN,
        (OrderKind::Mandatory, Symmetry::SymmetricInverse) => flags | OrderFlags::IMPLIES_FIRST,
    }
}

/// Deprecated `restart-type=restart` on the `then` resource makes even
/// optional orderings propagate.
fn handle_restart_type(
    ws: &WorkingSet,
    then: ResourceId,
    kind: OrderKind,
    flag: OrderFlags,
    flags: OrderFlags,
) -> OrderFlags {
    if kind == OrderKind::Optional && ws.resources[then].restart_type == RestartType::Restart {
        flags | flag
    } else {
        flags
    }
}

fn parse_action(text: Option<&str>) -> ActionKind {
    text.map(|t| ActionKind::parse(&t.to_ascii_lowercase()))
        .unwrap_or(ActionKind::Start)
}

/// Number of `first` clone instances that must be runnable before `then`,
/// or zero when every instance is required.
fn minimum_first_instances(ws: &WorkingSet, rsc: ResourceId, require_all: Option<bool>) -> u32 {
    let resource = &ws.resources[rsc];
    if !resource.is_clone() {
        return 0;
    }
    if let Some(clone_min) = resource.meta_attr("clone-min") {
        return clone_min
            .trim()
            .parse::<i64>()
            .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
            .unwrap_or(0);
    }
    if let Some(require_all) = require_all {
        warn!(
            rsc = %resource.id,
            "require-all in ordering constraints is deprecated, use the clone-min meta-attribute"
        );
        if !require_all {
            return 1;
        }
    }
    0
}

/// Route the ordering through a pseudo-action that becomes runnable once
/// `clone_min` instances of `first` can run.
fn clone_min_ordering(
    id: &str,
    first: ResourceId,
    first_action: &ActionKind,
    then: ResourceId,
    then_action: &ActionKind,
    flags: OrderFlags,
    clone_min: u32,
    ws: &mut WorkingSet,
) {
    let pseudo = ws.get_pseudo_op(&format!("clone-one-or-more:{id}"));
    let action = &mut ws.actions[pseudo];
    action.required_runnable_before = clone_min;
    action.flags.requires_any = true;

    for child in ws.resources[first].children.clone() {
        let child_ep = Endpoint::task(child, &ws.resources[child].id, first_action);
        ws.custom_order(child_ep, Endpoint::Action(pseudo), OrderFlags::ONE_OR_MORE);
    }

    let then_ep = Endpoint::task(then, &ws.resources[then].id, then_action);
    ws.custom_order(Endpoint::Action(pseudo), then_ep, flags | OrderFlags::RUNNABLE_LEFT);
    debug!(constraint = id, clone_min, "ordered through clone-min pseudo-action");
}

fn inverse_ordering(
    id: &str,
    kind: OrderKind,
    first: ResourceId,
    first_action: &ActionKind,
    then: ResourceId,
    then_action: &ActionKind,
    ws: &mut WorkingSet,
) {
    let (Some(first_action), Some(then_action)) = (first_action.invert(), then_action.invert()) else {
        ws.config_warn(format!(
            "Cannot invert constraint '{id}' (please specify inverse manually)"
        ));
        return;
    };
    let flags = flags_for_kind(kind, &first_action, Symmetry::SymmetricInverse);
    let flags = handle_restart_type(ws, then, kind, OrderFlags::IMPLIES_FIRST, flags);
    ws.order_resources(then, &then_action, first, &first_action, flags);
}

pub fn unpack_order(id: &str, spec: &OrderSpec, ws: &mut WorkingSet) -> ConstraintResult<()> {
    let kind = ordering_kind(id, spec.kind.as_deref(), spec.score.as_deref(), ws);
    let symmetry = ordering_symmetry(id, kind, spec.symmetrical, None, ws);

    let expanded = tags::expand_order(id, spec, ws)?;
    let set_specs = expanded.as_ref().map_or(&spec.sets, |e| &e.sets);
    if set_specs.is_empty() {
        return unpack_simple_order(id, spec, kind, symmetry, ws);
    }

    let sets = resolve_sets(id, set_specs, ws)?;
    for (i, set) in sets.iter().enumerate() {
        unpack_order_set(set, kind, spec.symmetrical, ws);
        if i > 0 {
            let last = &sets[i - 1];
            order_rsc_sets(id, last, set, kind, symmetry, ws);
            if symmetry == Symmetry::Symmetric {
                order_rsc_sets(id, set, last, kind, Symmetry::SymmetricInverse, ws);
            }
        }
    }
    Ok(())
}

fn unpack_simple_order(
    id: &str,
    spec: &OrderSpec,
    kind: OrderKind,
    symmetry: Symmetry,
    ws: &mut WorkingSet,
) -> ConstraintResult<()> {
    let first = resolve_resource(
        id,
        "first",
        spec.first.as_deref(),
        spec.first_instance.as_deref(),
        ws,
    )?;
    let then = resolve_resource(
        id,
        "then",
        spec.then.as_deref(),
        spec.then_instance.as_deref(),
        ws,
    )?;

    let first_action = parse_action(spec.first_action.as_deref());
    let then_action = match spec.then_action.as_deref() {
        Some(text) => parse_action(Some(text)),
        None => first_action.clone(),
    };

    let flags = flags_for_kind(kind, &first_action, symmetry);
    let flags = handle_restart_type(ws, then, kind, OrderFlags::IMPLIES_THEN, flags);

    let clone_min = minimum_first_instances(ws, first, spec.require_all);
    if clone_min > 0 {
        clone_min_ordering(id, first, &first_action, then, &then_action, flags, clone_min, ws);
    } else {
        ws.order_resources(first, &first_action, then, &then_action, flags);
    }

    if symmetry == Symmetry::Symmetric {
        inverse_ordering(id, kind, first, &first_action, then, &then_action, ws);
    }
    debug!(constraint = id, ?kind, ?symmetry, %flags, "unpacked ordering");
    Ok(())
}

/// Orderings among the members of one set.
///
/// Sequential sets chain each member to the next; Serialize sets order every
/// member against every later one.
fn unpack_order_set(
    set: &ResolvedSet<'_>,
    parent_kind: OrderKind,
    parent_symmetrical: Option<bool>,
    ws: &mut WorkingSet,
) {
    let action = parse_action(set.spec.action.as_deref());
    let local_kind = match set.spec.kind.as_deref() {
        Some(kind) => ordering_kind(set.id, Some(kind), None, ws),
        None => parent_kind,
    };
    let symmetry_kind = match (set.spec.kind.is_some(), set.spec.score.as_deref()) {
        (true, _) => local_kind,
        (false, Some(score)) => ordering_kind(set.id, None, Some(score), ws),
        (false, None) => parent_kind,
    };
    let symmetry = ordering_symmetry(set.id, symmetry_kind, set.spec.symmetrical, parent_symmetrical, ws);
    let sequential = set.is_sequential();
    let flags = flags_for_kind(local_kind, &action, symmetry);

    let members = &set.members;
    if members.len() == 1 {
        trace!(set = set.id, "single-member set");
        return;
    }

    for (i, rsc) in members.iter().enumerate() {
        if local_kind == OrderKind::Serialize {
            for later in &members[i + 1..] {
                ws.order_resources(*rsc, &action, *later, &action, flags);
            }
        } else if sequential && i > 0 {
            ws.order_resources(members[i - 1], &action, *rsc, &action, flags);
        }
    }

    if symmetry == Symmetry::Asymmetric || !sequential {
        return;
    }
    let Some(inverse) = action.invert() else {
        ws.config_warn(format!(
            "Cannot invert set '{}' (please specify inverse manually)",
            set.id
        ));
        return;
    };
    let flags = flags_for_kind(local_kind, &inverse, Symmetry::SymmetricInverse);
    for pair in members.windows(2) {
        ws.order_resources(pair[1], &inverse, pair[0], &inverse, flags);
    }
}

/// Connect two adjacent sets of one constraint.
fn order_rsc_sets(
    id: &str,
    set1: &ResolvedSet<'_>,
    set2: &ResolvedSet<'_>,
    kind: OrderKind,
    symmetry: Symmetry,
    ws: &mut WorkingSet,
) {
    let mut action_1 = parse_action(set1.spec.action.as_deref());
    let mut action_2 = parse_action(set2.spec.action.as_deref());
    if symmetry == Symmetry::SymmetricInverse {
        let (Some(inverse_1), Some(inverse_2)) = (action_1.invert(), action_2.invert()) else {
            ws.config_warn(format!(
                "Cannot invert constraint '{id}' (please specify inverse manually)"
            ));
            return;
        };
        action_1 = inverse_1;
        action_2 = inverse_2;
    }

    // One-or-more only gates the start/promote phase; on the way down every
    // member of set1 waits for set2.
    let require_all = set1.spec.require_all.unwrap_or(true)
        || matches!(action_1, ActionKind::Stop | ActionKind::Demote);

    let flags = flags_for_kind(kind, &action_2, symmetry);

    if !require_all {
        let pseudo = ws.get_pseudo_op(&format!("one-or-more:{}", set1.id));
        ws.actions[pseudo].flags.requires_any = true;
        for rsc in &set1.members {
            let ep = Endpoint::task(*rsc, &ws.resources[*rsc].id, &action_1);
            ws.custom_order(ep, Endpoint::Action(pseudo), OrderFlags::ONE_OR_MORE);
        }
        for rsc in &set2.members {
            let ep = Endpoint::task(*rsc, &ws.resources[*rsc].id, &action_2);
            ws.custom_order(Endpoint::Action(pseudo), ep, flags | OrderFlags::RUNNABLE_LEFT);
        }
        return;
    }

    let inverse = symmetry == Symmetry::SymmetricInverse;
    let rsc_1 = match set1.spec.sequential {
        Some(true) if inverse => set1.first(),
        Some(true) => set1.last(),
        _ => None,
    };
    let rsc_2 = match set2.spec.sequential {
        Some(true) if inverse => set2.last(),
        Some(true) => set2.first(),
        _ => None,
    };

    let firsts = rsc_1.map_or_else(|| set1.members.clone(), |r| vec![r]);
    let thens = rsc_2.map_or_else(|| set2.members.clone(), |r| vec![r]);
    for first in &firsts {
        for then in &thens {
            ws.order_resources(*first, &action_1, *then, &action_2, flags);
        }
    }
    trace!(constraint = id, set1 = set1.id, set2 = set2.id, "ordered adjacent sets");
}
