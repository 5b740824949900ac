//! crm-constraints — turns configured constraints into scheduler records.
//!
//! Each constraint is interpreted against a [`WorkingSet`]: locations become
//! per-node scores, orderings become action edges, colocations are indexed
//! on both resources and tickets become bans when they are not granted.
//! Interpretation is lenient. A constraint that cannot be understood is
//! reported as a configuration diagnostic and dropped.
//!
//! # Components
//!
//! - **`unpack`** — The walker over all configured constraints
//! - **`location`** — Node scores from explicit nodes and rules
//! - **`order`** — Ordering kinds, symmetry and set chaining
//! - **`colocation`** — Sorted colocation records and anti-colocation edges
//! - **`ticket`** — Ticket dependencies and loss policies
//! - **`tags`** / **`sets`** — Tag expansion and resource set resolution
//! - **`model`** — Serde model of the constraint document

pub mod colocation;
pub mod error;
pub mod location;
pub mod model;
pub mod order;
pub mod sets;
pub mod tags;
pub mod ticket;
pub mod unpack;

use crm_core::{Score, WorkingSet};

pub use colocation::{NewColocation, new_colocation, unpack_colocation};
pub use error::{ConstraintError, ConstraintResult};
pub use location::{ScoreSource, fold_rule, unpack_location};
pub use model::{ColocationSpec, ConstraintSpec, LocationSpec, OrderSpec, ResourceSetSpec, TicketSpec};
pub use order::{OrderKind, Symmetry, flags_for_kind, unpack_order};
pub use sets::ResolvedSet;
pub use ticket::unpack_ticket;
pub use unpack::unpack_constraints;

/// Parse a score attribute; an unparsable one is reported and counts as zero.
pub(crate) fn parse_score(ws: &mut WorkingSet, id: &str, text: &str) -> Score {
    match Score::parse(text) {
        Ok(score) => score,
        Err(err) => {
            ws.config_err(format!("Using 0 for score in '{id}': {err}"));
            Score::ZERO
        }
    }
}

/// Report a dropped constraint, or part of one.
pub(crate) fn record(ws: &mut WorkingSet, result: ConstraintResult<()>) {
    if let Err(err) = result {
        ws.config_err(err.to_string());
    }
}
