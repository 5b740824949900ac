//! Tag and template expansion.
//!
//! Every function here is pure: it takes a constraint and the working set's
//! tag/template tables and returns an expanded copy, or `None` when the
//! constraint references no tag or template at all. A bare reference that
//! is neither a resource nor a tag fails the constraint.

use crm_core::{ResourceId, WorkingSet};
use tracing::trace;

use crate::error::{ConstraintError, ConstraintResult};
use crate::model::{ColocationSpec, LocationSpec, OrderSpec, ResourceSetSpec, TicketSpec};

/// What a constraint reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    Resource(ResourceId),
    /// Member ids of a tag or template.
    Tag(&'a [String]),
}

/// Resolve an id as a resource, else as a template, else as a tag.
pub fn resolve_reference<'a>(
    ws: &'a WorkingSet,
    constraint: &str,
    id: &str,
) -> ConstraintResult<Reference<'a>> {
    if let Some(rsc) = ws.find_constraint_resource(id) {
        return Ok(Reference::Resource(rsc));
    }
    let refs = ws
        .templates
        .get(id)
        .or_else(|| ws.tags.get(id))
        .ok_or_else(|| ConstraintError::InvalidReference {
            constraint: constraint.to_string(),
            reference: id.to_string(),
        })?;
    if refs.is_empty() {
        return Err(ConstraintError::EmptyTag(id.to_string()));
    }
    Ok(Reference::Tag(refs))
}

/// Replace tag references inside resource sets by the tagged resources,
/// keeping their position within the set.
pub fn expand_tags_in_sets(
    constraint: &str,
    sets: &[ResourceSetSpec],
    ws: &WorkingSet,
) -> ConstraintResult<Option<Vec<ResourceSetSpec>>> {
    let mut any_tags = false;
    let mut expanded = Vec::with_capacity(sets.len());

    for set in sets {
        let mut members = Vec::with_capacity(set.resources.len());
        for reference in &set.resources {
            match resolve_reference(ws, constraint, reference) {
                Ok(Reference::Tag(refs)) => {
                    members.extend(refs.iter().cloned());
                    any_tags = true;
                }
                // Unknown members are reported and dropped by set resolution.
                Ok(Reference::Resource(_)) | Err(ConstraintError::InvalidReference { .. }) => {
                    members.push(reference.clone())
                }
                Err(err) => return Err(err),
            }
        }
        expanded.push(ResourceSetSpec {
            resources: members,
            ..set.clone()
        });
    }

    if any_tags {
        trace!(constraint, sets = expanded.len(), "expanded tags in resource sets");
        Ok(Some(expanded))
    } else {
        Ok(None)
    }
}

/// Turn a bare reference into a resource set.
///
/// A tag always becomes an unordered set of its members. A plain resource
/// becomes a one-member set only when `convert_rsc` is set, which is needed
/// when the other side of the constraint is a tag.
pub fn tag_to_set(
    constraint: &str,
    reference: &str,
    convert_rsc: bool,
    ws: &WorkingSet,
) -> ConstraintResult<Option<ResourceSetSpec>> {
    let set = match resolve_reference(ws, constraint, reference)? {
        Reference::Tag(refs) => ResourceSetSpec {
            id: Some(reference.to_string()),
            resources: refs.to_vec(),
            sequential: Some(false),
            ..Default::default()
        },
        Reference::Resource(_) if convert_rsc => ResourceSetSpec {
            id: Some(reference.to_string()),
            resources: vec![reference.to_string()],
            ..Default::default()
        },
        Reference::Resource(_) => return Ok(None),
    };
    Ok(Some(set))
}

fn is_resource(ws: &WorkingSet, constraint: &str, id: &str) -> ConstraintResult<bool> {
    Ok(matches!(
        resolve_reference(ws, constraint, id)?,
        Reference::Resource(_)
    ))
}

pub fn expand_location(
    constraint: &str,
    spec: &LocationSpec,
    ws: &WorkingSet,
) -> ConstraintResult<Option<LocationSpec>> {
    if let Some(sets) = expand_tags_in_sets(constraint, &spec.sets, ws)? {
        return Ok(Some(LocationSpec {
            sets,
            ..spec.clone()
        }));
    }
    let Some(rsc) = spec.rsc.as_deref() else {
        return Ok(None);
    };
    if is_resource(ws, constraint, rsc)? {
        return Ok(None);
    }
    let Some(mut set) = tag_to_set(constraint, rsc, false, ws)? else {
        return Ok(None);
    };

    let mut expanded = spec.clone();
    set.role = expanded.role.take();
    expanded.rsc = None;
    expanded.sets.push(set);
    Ok(Some(expanded))
}

pub fn expand_order(
    constraint: &str,
    spec: &OrderSpec,
    ws: &WorkingSet,
) -> ConstraintResult<Option<OrderSpec>> {
    if let Some(sets) = expand_tags_in_sets(constraint, &spec.sets, ws)? {
        return Ok(Some(OrderSpec {
            sets,
            ..spec.clone()
        }));
    }
    let (Some(first), Some(then)) = (spec.first.as_deref(), spec.then.as_deref()) else {
        return Ok(None);
    };
    let first_is_rsc = is_resource(ws, constraint, first)?;
    let then_is_rsc = is_resource(ws, constraint, then)?;
    if first_is_rsc && then_is_rsc {
        return Ok(None);
    }

    let mut expanded = spec.clone();
    if let Some(mut set) = tag_to_set(constraint, first, true, ws)? {
        set.action = expanded.first_action.take();
        expanded.first = None;
        expanded.sets.push(set);
    }
    if let Some(mut set) = tag_to_set(constraint, then, true, ws)? {
        set.action = expanded.then_action.take();
        expanded.then = None;
        expanded.sets.push(set);
    }
    Ok(Some(expanded))
}

pub fn expand_colocation(
    constraint: &str,
    spec: &ColocationSpec,
    ws: &WorkingSet,
) -> ConstraintResult<Option<ColocationSpec>> {
    if let Some(sets) = expand_tags_in_sets(constraint, &spec.sets, ws)? {
        return Ok(Some(ColocationSpec {
            sets,
            ..spec.clone()
        }));
    }
    let (Some(rsc), Some(with)) = (spec.rsc.as_deref(), spec.with_rsc.as_deref()) else {
        return Ok(None);
    };
    let rsc_is_rsc = is_resource(ws, constraint, rsc)?;
    let with_is_rsc = is_resource(ws, constraint, with)?;
    match (rsc_is_rsc, with_is_rsc) {
        (true, true) => return Ok(None),
        (false, false) => {
            return Err(ConstraintError::TagToTagColocation {
                constraint: constraint.to_string(),
            });
        }
        _ => {}
    }

    let mut expanded = spec.clone();
    if let Some(mut set) = tag_to_set(constraint, rsc, true, ws)? {
        set.role = expanded.rsc_role.take();
        expanded.rsc = None;
        expanded.sets.push(set);
    }
    if let Some(mut set) = tag_to_set(constraint, with, true, ws)? {
        set.role = expanded.with_rsc_role.take();
        expanded.with_rsc = None;
        expanded.sets.push(set);
    }
    Ok(Some(expanded))
}

pub fn expand_ticket(
    constraint: &str,
    spec: &TicketSpec,
    ws: &WorkingSet,
) -> ConstraintResult<Option<TicketSpec>> {
    if let Some(sets) = expand_tags_in_sets(constraint, &spec.sets, ws)? {
        return Ok(Some(TicketSpec {
            sets,
            ..spec.clone()
        }));
    }
    let Some(rsc) = spec.rsc.as_deref() else {
        return Ok(None);
    };
    if is_resource(ws, constraint, rsc)? {
        return Ok(None);
    }
    let Some(mut set) = tag_to_set(constraint, rsc, false, ws)? else {
        return Ok(None);
    };

    let mut expanded = spec.clone();
    set.role = expanded.rsc_role.take();
    expanded.rsc = None;
    expanded.sets.push(set);
    Ok(Some(expanded))
}
