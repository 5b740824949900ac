//! crm-core — the data model shared by the constraint engine.
//!
//! Holds the cluster as the scheduler sees it: nodes, resources, actions and
//! the constraint records produced while interpreting configuration. All of
//! it lives in one [`WorkingSet`] whose arenas are keyed by slotmap ids.
//!
//! # Components
//!
//! - **`score`** — Saturating score arithmetic with infinity sentinels
//! - **`role`** / **`action`** — Roles, action kinds and operation keys
//! - **`resource`** / **`node`** — Cluster entities
//! - **`ordering`** — Ordering edges, flags and migration mirroring
//! - **`constraint`** — Location, colocation and ticket records
//! - **`working_set`** — The arena holding everything above
//! - **`snapshot`** / **`config`** — Loading state and options

pub mod action;
pub mod config;
pub mod constraint;
pub mod diagnostic;
pub mod error;
pub mod node;
pub mod ordering;
pub mod resource;
pub mod role;
pub mod score;
pub mod snapshot;
pub mod working_set;

pub use action::{Action, ActionFlags, ActionId, ActionKind, notify_key, op_key};
pub use config::SchedulerConfig;
pub use constraint::{
    Colocation, Discovery, LocationConstraint, LossPolicy, NodeWeight, Ticket, TicketConstraint,
};
pub use diagnostic::{Diagnostic, Level};
pub use error::{CoreError, CoreResult};
pub use node::{Node, NodeId};
pub use ordering::{Endpoint, OrderFlags, OrderingEdge};
pub use resource::{Resource, ResourceFlags, ResourceId, RestartType, Variant, is_true, parse_bool};
pub use role::Role;
pub use score::{INFINITY, Score};
pub use snapshot::{ActionSpec, ClusterSnapshot, NodeSpec, ResourceSpec, TagSpec};
pub use working_set::WorkingSet;
