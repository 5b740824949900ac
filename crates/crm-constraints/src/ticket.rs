//! Ticket constraints: resources that may only run while a ticket is granted.
//!
//! A ticket that is revoked or in standby when the constraint is unpacked
//! takes effect immediately, as location bans on the dependent resource.

use crm_core::{LossPolicy, ResourceId, Role, Ticket, TicketConstraint, WorkingSet};
use tracing::{debug, warn};

use crate::error::{ConstraintError, ConstraintResult};
use crate::location::{ban_everywhere, ban_promotion};
use crate::model::TicketSpec;
use crate::sets::{resolve_resource_or_warn, resolve_sets};
use crate::tags;

const LOSS_OF_TICKET: &str = "__loss_of_ticket__";
const NO_TICKET: &str = "__no_ticket__";
const TICKET_STANDBY: &str = "__ticket_standby__";

pub fn unpack_ticket(id: &str, spec: &TicketSpec, ws: &mut WorkingSet) -> ConstraintResult<()> {
    let ticket = spec
        .ticket
        .as_deref()
        .ok_or_else(|| ConstraintError::MissingAttribute {
            constraint: id.to_string(),
            attribute: "ticket",
        })?;
    if !ws.tickets.contains_key(ticket) {
        debug!(ticket, "ticket first seen in constraint, treating as revoked");
        ws.tickets.insert(ticket.to_string(), Ticket::revoked(ticket));
    }

    let expanded = tags::expand_ticket(id, spec, ws)?;
    let set_specs = expanded.as_ref().map_or(&spec.sets, |e| &e.sets);
    if set_specs.is_empty() {
        return unpack_simple_ticket(id, spec, ticket, ws);
    }

    let sets = resolve_sets(id, set_specs, ws)?;
    for set in &sets {
        for rsc in &set.members {
            rsc_ticket_new(ws, set.id, *rsc, ticket, set.role(), spec.loss_policy.as_deref());
        }
    }
    Ok(())
}

fn unpack_simple_ticket(
    id: &str,
    spec: &TicketSpec,
    ticket: &str,
    ws: &mut WorkingSet,
) -> ConstraintResult<()> {
    let Some(rsc) = resolve_resource_or_warn(
        id,
        "rsc",
        spec.rsc.as_deref(),
        spec.rsc_instance.as_deref(),
        ws,
    )?
    else {
        return Ok(());
    };
    rsc_ticket_new(
        ws,
        id,
        rsc,
        ticket,
        spec.rsc_role.as_deref(),
        spec.loss_policy.as_deref(),
    );
    Ok(())
}

/// The requested policy, else demote for promoted-role dependencies and stop
/// for everything else. Fencing falls back to stop while it is disabled.
fn loss_policy(ws: &mut WorkingSet, ticket: &str, role: Role, requested: Option<&str>) -> LossPolicy {
    let explicit = match requested.map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("stop") => Some(LossPolicy::Stop),
        Some("demote") => Some(LossPolicy::Demote),
        Some("freeze") => Some(LossPolicy::Freeze),
        Some("fence") if ws.config.stonith_enabled => Some(LossPolicy::Fence),
        Some("fence") => {
            ws.config_err(format!(
                "Resetting loss-policy for ticket '{ticket}' to 'stop' because fencing is not configured"
            ));
            Some(LossPolicy::Stop)
        }
        Some(other) => {
            ws.config_warn(format!(
                "Using default loss-policy for ticket '{ticket}' because '{other}' is not valid"
            ));
            None
        }
    };
    explicit.unwrap_or(if role == Role::Promoted {
        LossPolicy::Demote
    } else {
        LossPolicy::Stop
    })
}

/// Record that `rsc` depends on `ticket`, applying it at once if the ticket
/// is not currently usable.
fn rsc_ticket_new(
    ws: &mut WorkingSet,
    id: &str,
    rsc: ResourceId,
    ticket: &str,
    role: Option<&str>,
    requested_policy: Option<&str>,
) {
    let role = match Role::parse_filter(role) {
        Ok(role) => role,
        Err(err) => {
            ws.config_err(format!("Treating ticket constraint '{id}' as any role: {err}"));
            Role::Unknown
        }
    };
    let loss_policy = loss_policy(ws, ticket, role, requested_policy);
    debug!(
        constraint = id,
        rsc = %ws.resources[rsc].id,
        ticket,
        %role,
        %loss_policy,
        "added ticket dependency"
    );

    let index = ws.ticket_constraints.len();
    ws.ticket_constraints.push(TicketConstraint {
        id: id.to_string(),
        rsc,
        ticket: ticket.to_string(),
        role,
        loss_policy,
    });
    ws.resources[rsc].ticket_constraints.push(index);

    let usable = ws
        .tickets
        .get(ticket)
        .is_some_and(|t| t.granted && !t.standby);
    if !usable {
        apply_ticket(ws, rsc, index);
    }
}

/// Apply a revoked or standby ticket to `rsc`, or to each of its leaf
/// descendants.
pub fn apply_ticket(ws: &mut WorkingSet, rsc: ResourceId, index: usize) {
    let children = ws.resources[rsc].children.clone();
    if !children.is_empty() {
        for child in children {
            apply_ticket(ws, child, index);
        }
        return;
    }

    let constraint = ws.ticket_constraints[index].clone();
    let Some(ticket) = ws.tickets.get(&constraint.ticket).cloned() else {
        return;
    };
    let resource = &ws.resources[rsc];
    let running_on = resource.running_on.clone();
    let role_matches = constraint.role == Role::Unknown || constraint.role == resource.role;

    if !ticket.granted && !running_on.is_empty() {
        match constraint.loss_policy {
            LossPolicy::Stop => ban_everywhere(ws, rsc, LOSS_OF_TICKET),
            LossPolicy::Demote if constraint.role == Role::Promoted => {
                ban_promotion(ws, rsc, LOSS_OF_TICKET);
            }
            LossPolicy::Demote => ban_everywhere(ws, rsc, LOSS_OF_TICKET),
            LossPolicy::Fence => {
                if !role_matches {
                    return;
                }
                ban_everywhere(ws, rsc, LOSS_OF_TICKET);
                for node in running_on {
                    warn!(
                        node = %ws.nodes[node].uname,
                        ticket = %ticket.id,
                        "node will be fenced because deadman ticket was lost"
                    );
                    ws.nodes[node].unclean = true;
                }
            }
            LossPolicy::Freeze => {
                if !role_matches {
                    return;
                }
                let flags = &mut ws.resources[rsc].flags;
                flags.managed = false;
                flags.blocked = true;
            }
        }
    } else if !ticket.granted {
        restrict(ws, rsc, &constraint, NO_TICKET);
    } else if ticket.standby {
        restrict(ws, rsc, &constraint, TICKET_STANDBY);
    }
}

/// A resource that is not running may not start, or when only its promoted
/// role depends on the ticket, may not be promoted.
fn restrict(ws: &mut WorkingSet, rsc: ResourceId, constraint: &TicketConstraint, id: &str) {
    if constraint.role != Role::Promoted || constraint.loss_policy == LossPolicy::Stop {
        ban_everywhere(ws, rsc, id);
    } else {
        ban_promotion(ws, rsc, id);
    }
}
