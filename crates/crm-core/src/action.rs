//! Scheduled actions and action naming.

use std::collections::BTreeMap;
use std::fmt;

use slotmap::new_key_type;

use crate::score::Score;
use crate::{NodeId, ResourceId};

new_key_type! {
    /// Arena key for an [`Action`] in the working set.
    pub struct ActionId;
}

/// The task an action performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Start,
    Stop,
    Promote,
    Demote,
    /// Completion of a start (`running`).
    Started,
    Stopped,
    Promoted,
    Demoted,
    MigrateTo,
    MigrateFrom,
    Monitor,
    Notify,
    Notified,
    Cancel,
    Other(String),
}

impl ActionKind {
    pub fn parse(text: &str) -> ActionKind {
        match text {
            "start" => ActionKind::Start,
            "stop" => ActionKind::Stop,
            "promote" => ActionKind::Promote,
            "demote" => ActionKind::Demote,
            "running" => ActionKind::Started,
            "stopped" => ActionKind::Stopped,
            "promoted" => ActionKind::Promoted,
            "demoted" => ActionKind::Demoted,
            "migrate_to" => ActionKind::MigrateTo,
            "migrate_from" => ActionKind::MigrateFrom,
            "monitor" => ActionKind::Monitor,
            "notify" => ActionKind::Notify,
            "notified" => ActionKind::Notified,
            "cancel" => ActionKind::Cancel,
            other => ActionKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Promote => "promote",
            ActionKind::Demote => "demote",
            ActionKind::Started => "running",
            ActionKind::Stopped => "stopped",
            ActionKind::Promoted => "promoted",
            ActionKind::Demoted => "demoted",
            ActionKind::MigrateTo => "migrate_to",
            ActionKind::MigrateFrom => "migrate_from",
            ActionKind::Monitor => "monitor",
            ActionKind::Notify => "notify",
            ActionKind::Notified => "notified",
            ActionKind::Cancel => "cancel",
            ActionKind::Other(name) => name,
        }
    }

    /// The action that undoes this one, if any.
    pub fn invert(&self) -> Option<ActionKind> {
        let inverse = match self {
            ActionKind::Start => ActionKind::Stop,
            ActionKind::Stop => ActionKind::Start,
            ActionKind::Promote => ActionKind::Demote,
            ActionKind::Demote => ActionKind::Promote,
            ActionKind::Promoted => ActionKind::Demoted,
            ActionKind::Demoted => ActionKind::Promoted,
            ActionKind::Started => ActionKind::Stopped,
            ActionKind::Stopped => ActionKind::Started,
            _ => return None,
        };
        Some(inverse)
    }

    pub fn is_start_or_promote(&self) -> bool {
        matches!(self, ActionKind::Start | ActionKind::Promote)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation key: `<rsc>_<task>_<interval_ms>`.
pub fn op_key(rsc_id: &str, task: &str, interval_ms: u32) -> String {
    format!("{rsc_id}_{task}_{interval_ms}")
}

/// Notification key: `<rsc>_<type>_notify_<operation>_0`.
pub fn notify_key(rsc_id: &str, notify_type: &str, operation: &str) -> String {
    format!("{rsc_id}_{notify_type}_notify_{operation}_0")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionFlags {
    /// No real work; exists only to order other actions.
    pub pseudo: bool,
    pub runnable: bool,
    pub optional: bool,
    /// Runnable once `required_runnable_before` predecessors are.
    pub requires_any: bool,
}

impl Default for ActionFlags {
    fn default() -> Self {
        Self {
            pseudo: false,
            runnable: true,
            optional: false,
            requires_any: false,
        }
    }
}

/// A node in the scheduling graph.
#[derive(Debug, Clone)]
pub struct Action {
    pub uuid: String,
    pub task: ActionKind,
    pub rsc: Option<ResourceId>,
    pub node: Option<NodeId>,
    pub flags: ActionFlags,
    pub required_runnable_before: u32,
    pub priority: Score,
    pub interval_ms: u32,
    pub meta: BTreeMap<String, String>,
}

impl Action {
    pub fn new(uuid: String, task: ActionKind, rsc: Option<ResourceId>, node: Option<NodeId>) -> Self {
        Self {
            uuid,
            task,
            rsc,
            node,
            flags: ActionFlags::default(),
            required_runnable_before: 0,
            priority: Score::ZERO,
            interval_ms: 0,
            meta: BTreeMap::new(),
        }
    }

    /// Add a meta attribute unless one with that name is already set.
    pub fn add_meta(&mut self, name: &str, value: impl Into<String>) {
        self.meta
            .entry(name.to_string())
            .or_insert_with(|| value.into());
    }

    /// Whether this is a recurring monitor rather than a one-shot operation.
    pub fn is_recurring(&self) -> bool {
        self.interval_ms != 0 && self.task != ActionKind::Cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inversion_pairs() {
        assert_eq!(ActionKind::Start.invert(), Some(ActionKind::Stop));
        assert_eq!(ActionKind::Demote.invert(), Some(ActionKind::Promote));
        assert_eq!(ActionKind::Started.invert(), Some(ActionKind::Stopped));
        assert_eq!(ActionKind::Monitor.invert(), None);
        assert_eq!(ActionKind::parse("reload").invert(), None);
    }

    #[test]
    fn inversion_is_an_involution() {
        for kind in [
            ActionKind::Start,
            ActionKind::Stop,
            ActionKind::Promote,
            ActionKind::Demote,
            ActionKind::Started,
            ActionKind::Stopped,
            ActionKind::Promoted,
            ActionKind::Demoted,
        ] {
            assert_eq!(kind.invert().and_then(|k| k.invert()), Some(kind));
        }
    }

    #[test]
    fn names_round_trip() {
        for name in ["start", "running", "migrate_to", "notified", "custom"] {
            assert_eq!(ActionKind::parse(name).as_str(), name);
        }
    }

    #[test]
    fn keys_are_formatted() {
        assert_eq!(op_key("db", "start", 0), "db_start_0");
        assert_eq!(notify_key("web", "pre", "start"), "web_pre_notify_start_0");
    }

    #[test]
    fn add_meta_keeps_existing_value() {
        let mut action = Action::new("a_start_0".into(), ActionKind::Start, None, None);
        action.add_meta("notify_type", "pre");
        action.add_meta("notify_type", "post");
        assert_eq!(action.meta["notify_type"], "pre");
    }
}
