//! crm-notify — notifications for clones whose agents want to hear about
//! their peers.
//!
//! Every clone action that notifies is bracketed by pseudo-actions:
//!
//! ```text
//! pre → pre_done → <action> → <complete> → post → post_done
//! ```
//!
//! and each instance gets a `notify` action per phase, carrying `notify_*`
//! variables that list which instances are active, starting, stopping and
//! so on.
//!
//! # Components
//!
//! - **`pseudo`** — The pseudo-action chain around a clone action
//! - **`collect`** — Instance buckets and `notify_*` variables
//! - **`actions`** — Per-instance notify actions and fencing-implied stops
//! - **`data`** — Notification data and deterministic list rendering

pub mod actions;
pub mod collect;
pub mod data;
pub mod pseudo;

pub use actions::{create_action_notifications, materialize, order_notifs_after_fencing};
pub use collect::{collect_resource_data, populate};
pub use data::{EMPTY_LIST, NotifyData, NotifyEntry, entries_to_strings};
pub use pseudo::build;
