//! Resolution of constraint references: bare resource attributes with an
//! optional clone instance, and resource sets.

use crm_core::{ResourceId, WorkingSet};
use tracing::trace;

use crate::error::{ConstraintError, ConstraintResult};
use crate::model::ResourceSetSpec;

/// A resource set with its member references resolved, in document order.
#[derive(Debug, Clone)]
pub struct ResolvedSet<'a> {
    pub spec: &'a ResourceSetSpec,
    pub id: &'a str,
    pub members: Vec<ResourceId>,
}

impl<'a> ResolvedSet<'a> {
    pub fn first(&self) -> Option<ResourceId> {
        self.members.first().copied()
    }

    pub fn last(&self) -> Option<ResourceId> {
        self.members.last().copied()
    }

    pub fn role(&self) -> Option<&'a str> {
        self.spec.role.as_deref()
    }

    /// `sequential`, defaulting to true.
    pub fn is_sequential(&self) -> bool {
        self.spec.sequential.unwrap_or(true)
    }
}

/// Resolve a bare resource attribute such as `first` or `with-rsc`,
/// narrowed to one clone instance when `instance` is given.
pub fn resolve_resource(
    constraint: &str,
    attribute: &'static str,
    reference: Option<&str>,
    instance: Option<&str>,
    ws: &WorkingSet,
) -> ConstraintResult<ResourceId> {
    let reference = reference.ok_or_else(|| ConstraintError::MissingAttribute {
        constraint: constraint.to_string(),
        attribute,
    })?;
    let rsc = ws
        .find_constraint_resource(reference)
        .ok_or_else(|| ConstraintError::UnknownResource {
            constraint: constraint.to_string(),
            rsc: reference.to_string(),
        })?;
    let Some(instance) = instance else {
        return Ok(rsc);
    };
    if !ws.resources[rsc].is_clone() {
        return Err(ConstraintError::InstanceOfNonClone {
            constraint: constraint.to_string(),
            rsc: reference.to_string(),
            instance: instance.to_string(),
        });
    }
    ws.find_clone_instance(rsc, instance)
        .ok_or_else(|| ConstraintError::UnknownInstance {
            constraint: constraint.to_string(),
            rsc: reference.to_string(),
            instance: instance.to_string(),
        })
}

/// Like [`resolve_resource`], but a clone instance that does not exist is
/// only a warning and yields `None`.
pub fn resolve_resource_or_warn(
    constraint: &str,
    attribute: &'static str,
    reference: Option<&str>,
    instance: Option<&str>,
    ws: &mut WorkingSet,
) -> ConstraintResult<Option<ResourceId>> {
    match resolve_resource(constraint, attribute, reference, instance, ws) {
        Ok(rsc) => Ok(Some(rsc)),
        Err(err @ ConstraintError::UnknownInstance { .. }) => {
            ws.config_warn(err.to_string());
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Resolve one set. Members that do not exist are dropped with a diagnostic;
/// a set without an id fails the constraint.
pub fn resolve_set<'a>(
    constraint: &str,
    set: &'a ResourceSetSpec,
    ws: &mut WorkingSet,
) -> ConstraintResult<ResolvedSet<'a>> {
    let id = set
        .id
        .as_deref()
        .ok_or_else(|| ConstraintError::MissingSetId {
            constraint: constraint.to_string(),
        })?;

    let mut members = Vec::with_capacity(set.resources.len());
    for reference in &set.resources {
        match ws.find_constraint_resource(reference) {
            Some(rsc) => members.push(rsc),
            None => ws.config_err(format!(
                "Ignoring resource '{reference}' in set '{id}' of constraint '{constraint}' because it does not exist"
            )),
        }
    }
    trace!(constraint, set = id, members = members.len(), "resolved resource set");
    Ok(ResolvedSet { spec: set, id, members })
}

/// Resolve every set of a constraint up front, so that a malformed set
/// drops the constraint before any of it has been applied.
pub fn resolve_sets<'a>(
    constraint: &str,
    sets: &'a [ResourceSetSpec],
    ws: &mut WorkingSet,
) -> ConstraintResult<Vec<ResolvedSet<'a>>> {
    if sets.iter().any(|s| s.id.is_none()) {
        return Err(ConstraintError::MissingSetId {
            constraint: constraint.to_string(),
        });
    }
    sets.iter().map(|set| resolve_set(constraint, set, ws)).collect()
}
