//! The constraint walker: dispatches each configured constraint to its
//! builder and turns rejected constraints into diagnostics.

use crm_core::WorkingSet;
use crm_rules::{NextChange, RuleContext, evaluate_rules};
use tracing::{debug, info, warn};

use crate::colocation::unpack_colocation;
use crate::location::unpack_location;
use crate::model::ConstraintSpec;
use crate::order::unpack_order;
use crate::record;
use crate::ticket::unpack_ticket;

/// Unpack every constraint in document order.
///
/// A constraint that cannot be interpreted is reported through
/// [`WorkingSet::config_err`] and skipped; the rest are still applied.
pub fn unpack_constraints(constraints: &[ConstraintSpec], ws: &mut WorkingSet) {
    info!(count = constraints.len(), "unpacking constraints");
    for spec in constraints {
        let Some(id) = spec.id() else {
            ws.config_err(format!(
                "Ignoring <{}> constraint without an id",
                spec.kind_name()
            ));
            continue;
        };

        if !spec.lifetime().is_empty() {
            warn!(constraint = id, "lifetime in constraints is deprecated");
            if !lifetime_active(spec, ws) {
                info!(constraint = id, "constraint lifetime has expired or not yet begun");
                continue;
            }
        }

        let reported = ws.diagnostics.len();
        let result = match spec {
            ConstraintSpec::Location(c) => unpack_location(id, c, ws),
            ConstraintSpec::Order(c) => unpack_order(id, c, ws),
            ConstraintSpec::Colocation(c) => unpack_colocation(id, c, ws),
            ConstraintSpec::Ticket(c) => unpack_ticket(id, c, ws),
        };
        record(ws, result);
        for diag in &mut ws.diagnostics[reported..] {
            diag.constraint.get_or_insert_with(|| id.to_string());
        }
    }
    debug!(
        locations = ws.locations.len(),
        orderings = ws.orderings.len(),
        colocations = ws.colocations.len(),
        tickets = ws.ticket_constraints.len(),
        diagnostics = ws.diagnostics.len(),
        "constraints unpacked"
    );
}

fn lifetime_active(spec: &ConstraintSpec, ws: &mut WorkingSet) -> bool {
    let mut next = NextChange::new();
    let active = evaluate_rules(spec.lifetime(), &RuleContext::at(ws.now), &mut next);
    if let Some(at) = next.get() {
        ws.update_recheck(at);
    }
    active
}
