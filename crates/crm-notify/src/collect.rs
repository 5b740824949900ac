//! Classifying clone instances into notification buckets and rendering the
//! buckets as `notify_*` variables.

use crm_core::{ActionKind, NodeId, ResourceId, Role, WorkingSet};
use tracing::{error, trace};

use crate::data::{NotifyData, NotifyEntry, entries_to_strings, node_names};

/// Collect the instances of `rsc` into `data` and render the variables.
///
/// When the bucket for the notified action is non-empty the notification
/// pseudo-actions become required.
pub fn populate(ws: &mut WorkingSet, rsc: ResourceId, data: &mut NotifyData) {
    collect_resource_data(ws, rsc, true, data);
    add_notify_keys(ws, data);
}

/// Sort `rsc` (or each of its instances) into role buckets and, when
/// `activity` is set, into buckets for its required actions.
pub fn collect_resource_data(
    ws: &WorkingSet,
    rsc: ResourceId,
    activity: bool,
    data: &mut NotifyData,
) {
    let resource = &ws.resources[rsc];
    if data.allowed_nodes.is_none() {
        data.allowed_nodes = Some(resource.allowed_nodes.keys().copied().collect());
    }

    if !resource.children.is_empty() {
        for child in &resource.children {
            collect_resource_data(ws, *child, activity, data);
        }
        return;
    }

    let entry = NotifyEntry::new(rsc, resource.running_on.first().copied());
    match resource.role {
        Role::Stopped => data.inactive.push(entry),
        Role::Started => data.active.push(entry),
        Role::Unpromoted => {
            data.unpromoted.push(entry);
            data.active.push(entry);
        }
        Role::Promoted => {
            data.promoted.push(entry);
            data.active.push(entry);
        }
        Role::Unknown => {
            error!(
                rsc = %resource.id,
                role = %resource.role,
                "resource role is not supported for notifications"
            );
        }
    }

    if !activity {
        return;
    }

    for action in resource.actions.iter().map(|a| &ws.actions[*a]) {
        let Some(node) = action.node else {
            continue;
        };
        if action.flags.optional {
            continue;
        }
        // Stops on unclean nodes are listed even if fencing is what
        // actually stops them.
        let implied_stop = action.task == ActionKind::Stop && ws.nodes[node].unclean;
        if !implied_stop && !action.flags.runnable {
            continue;
        }

        let entry = NotifyEntry::new(rsc, Some(node));
        match action.task {
            ActionKind::Start => data.start.push(entry),
            ActionKind::Stop => data.stop.push(entry),
            ActionKind::Promote => data.promote.push(entry),
            ActionKind::Demote => data.demote.push(entry),
            _ => {}
        }
    }
}

fn add_notify_keys(ws: &mut WorkingSet, data: &mut NotifyData) {
    let required = data.bucket_for_action().is_some_and(|b| !b.is_empty());

    let mut rendered = Vec::new();
    for (name, bucket) in [
        ("stop", &mut data.stop),
        ("start", &mut data.start),
        ("demote", &mut data.demote),
        ("promote", &mut data.promote),
        ("active", &mut data.active),
        ("unpromoted", &mut data.unpromoted),
        ("promoted", &mut data.promoted),
    ] {
        let (rscs, nodes) = entries_to_strings(ws, bucket, true);
        rendered.push((name, rscs, nodes.unwrap_or_default()));
    }
    for (name, rscs, nodes) in rendered {
        for prefix in std::iter::once(name).chain(legacy_name(name)) {
            data.add_key(&format!("notify_{prefix}_resource"), rscs.clone());
            data.add_key(&format!("notify_{prefix}_uname"), nodes.clone());
        }
    }

    let (rscs, _) = entries_to_strings(ws, &mut data.inactive, false);
    data.add_key("notify_inactive_resource", rscs);

    let mut available = data.allowed_nodes.clone().unwrap_or_default();
    sort_by_name(ws, &mut available);
    data.add_key("notify_available_uname", node_names(ws, &available));

    let mut all: Vec<NodeId> = ws.nodes.keys().collect();
    sort_by_name(ws, &mut all);
    data.add_key("notify_all_uname", node_names(ws, &all));

    trace!(
        action = %data.action,
        required,
        start = %data.keys["notify_start_resource"],
        stop = %data.keys["notify_stop_resource"],
        "rendered notification variables"
    );

    if required {
        for id in [data.pre, data.pre_done, data.post, data.post_done]
            .into_iter()
            .flatten()
        {
            ws.actions[id].flags.optional = false;
        }
    }
}

/// Older spelling of a role bucket, still read by some agents.
fn legacy_name(name: &str) -> Option<&'static str> {
    match name {
        "unpromoted" => Some("slave"),
        "promoted" => Some("master"),
        _ => None,
    }
}

fn sort_by_name(ws: &WorkingSet, nodes: &mut [NodeId]) {
    nodes.sort_by(|a, b| ws.nodes[*a].uname.cmp(&ws.nodes[*b].uname));
}
