//! Per-instance notify actions.

use crm_core::{ActionId, ActionKind, NodeId, OrderFlags, ResourceId, Role, Score, WorkingSet, notify_key};
use tracing::{error, info, trace};

use crate::collect::{collect_resource_data, populate};
use crate::data::NotifyData;
use crate::pseudo::build;

/// Collect, render and create every notification for one clone action.
pub fn create_action_notifications(ws: &mut WorkingSet, rsc: ResourceId, data: &mut NotifyData) {
    populate(ws, rsc, data);
    materialize(ws, rsc, data);
}

/// Create the notify actions of `rsc` (or each of its instances) and hand
/// the rendered variables to the instances' own actions.
pub fn materialize(ws: &mut WorkingSet, rsc: ResourceId, data: &NotifyData) {
    let children = ws.resources[rsc].children.clone();
    if !children.is_empty() {
        for child in children {
            materialize(ws, child, data);
        }
        return;
    }

    for action in ws.resources[rsc].actions.clone() {
        let op = &mut ws.actions[action];
        let notified_task = matches!(
            op.task,
            ActionKind::Start | ActionKind::Stop | ActionKind::Promote | ActionKind::Demote
        );
        if notified_task && !op.flags.optional && op.node.is_some() {
            for (name, value) in &data.keys {
                op.add_meta(name, value.as_str());
            }
        }
    }

    let task = &data.action;
    let nothing_to_do = match task {
        ActionKind::Start => data.start.is_empty(),
        ActionKind::Promote => data.promote.is_empty(),
        ActionKind::Demote => data.demote.is_empty(),
        // A stop may be implied by fencing, so it is never skipped.
        _ => false,
    };
    if nothing_to_do {
        trace!(rsc = %ws.resources[rsc].id, action = %task, "no notify action needed");
        return;
    }

    let resource = &ws.resources[rsc];
    if resource.role != Role::Stopped && matches!(task, ActionKind::Stop | ActionKind::Demote) {
        let stop = ws.find_first_action(rsc, &ActionKind::Stop);
        let stop_flags = stop.map(|s| ws.actions[s].flags);
        let implied_by_fencing = stop_flags.is_some_and(|f| f.pseudo);
        let stop_optional = stop_flags.is_none_or(|f| f.optional);

        for node in resource.running_on.clone() {
            if implied_by_fencing && ws.nodes[node].unclean {
                continue;
            }
            new_notify_action(ws, rsc, node, data.pre, data.pre_done, data);
            if *task == ActionKind::Demote || stop_optional {
                new_post_notify_action(ws, rsc, node, data);
            }
        }
    }

    let resource = &ws.resources[rsc];
    if resource.next_role != Role::Stopped && matches!(task, ActionKind::Start | ActionKind::Promote) {
        let start = ws.find_first_action(rsc, &ActionKind::Start);
        let Some(node) = resource.allocated_to else {
            error!(
                rsc = %resource.id,
                next_role = %resource.next_role,
                "instance has a next role but is not allocated"
            );
            return;
        };
        let start_optional = start.is_none_or(|s| ws.actions[s].flags.optional);
        if *task != ActionKind::Start || start_optional {
            new_notify_action(ws, rsc, node, data.pre, data.pre_done, data);
        }
        new_post_notify_action(ws, rsc, node, data);
    }
}

/// Create the notification for `rsc` on `node` of the phase started by
/// `op`, ordered before `done`.
fn new_notify_action(
    ws: &mut WorkingSet,
    rsc: ResourceId,
    node: NodeId,
    op: Option<ActionId>,
    done: Option<ActionId>,
    data: &NotifyData,
) -> Option<ActionId> {
    let skip_reason = match (op, done) {
        (None, _) => Some("no action"),
        (_, None) => Some("no parent notification"),
        _ if !ws.nodes[node].online => Some("node offline"),
        (Some(op), _) if !ws.actions[op].flags.runnable => Some("original action not runnable"),
        _ => None,
    };
    let (Some(op), Some(done), None) = (op, done, skip_reason) else {
        trace!(
            rsc = %ws.resources[rsc].id,
            node = %ws.nodes[node].uname,
            reason = skip_reason.unwrap_or_default(),
            "skipping notify action"
        );
        return None;
    };

    let origin = &ws.actions[op];
    let notify_type = origin.meta.get("notify_type").cloned().unwrap_or_default();
    let operation = origin.meta.get("notify_operation").cloned().unwrap_or_default();
    let task = origin.task.clone();
    let optional = origin.flags.optional;
    let inherited = origin.meta.clone();

    let key = notify_key(&ws.resources[rsc].id, &notify_type, &operation);
    trace!(
        rsc = %ws.resources[rsc].id,
        node = %ws.nodes[node].uname,
        %key,
        "creating notify action"
    );
    let notify = ws.custom_action(Some(rsc), key, task, Some(node), optional);
    let action = &mut ws.actions[notify];
    for (name, value) in inherited.iter().chain(&data.keys) {
        action.add_meta(name, value.as_str());
    }

    ws.order_actions(op, notify, OrderFlags::OPTIONAL);
    ws.order_actions(notify, done, OrderFlags::OPTIONAL);
    Some(notify)
}

/// Create the post-phase notification for `rsc` on `node`, and keep the
/// instance's recurring monitors until every post notification is done.
fn new_post_notify_action(ws: &mut WorkingSet, rsc: ResourceId, node: NodeId, data: &NotifyData) {
    if let Some(notify) = new_notify_action(ws, rsc, node, data.post, data.post_done, data) {
        ws.actions[notify].priority = Score::INFINITY;
    }

    let Some(post_done) = data.post_done else {
        return;
    };
    let monitors: Vec<ActionId> = ws.resources[rsc]
        .actions
        .iter()
        .copied()
        .filter(|a| ws.actions[*a].is_recurring())
        .collect();
    for monitor in monitors {
        ws.order_actions(post_done, monitor, OrderFlags::OPTIONAL);
    }
}

/// Notify a clone about a stop that fencing implies, ordered after the
/// fencing operation rather than after the stop itself.
pub fn order_notifs_after_fencing(
    ws: &mut WorkingSet,
    stop: ActionId,
    rsc: ResourceId,
    fencing: ActionId,
) {
    info!(stop = %ws.actions[stop].uuid, "ordering notifications for implied stop after fencing");
    let Some(mut data) = build(ws, rsc, ActionKind::Stop, None, Some(fencing)) else {
        return;
    };

    collect_resource_data(ws, rsc, false, &mut data);
    data.add_key("notify_stop_resource", ws.resources[rsc].id.clone());
    let uname = ws.actions[stop]
        .node
        .map(|n| ws.nodes[n].uname.clone())
        .unwrap_or_default();
    data.add_key("notify_stop_uname", uname);

    let top = ws.uber_parent(rsc);
    materialize(ws, top, &data);
}
