//! Pseudo-actions bracketing a clone action:
//! `pre → pre_done → <action>` and `<complete> → post → post_done`.

use crm_core::{ActionId, ActionKind, OrderFlags, ResourceId, Score, WorkingSet, notify_key};
use tracing::debug;

use crate::data::NotifyData;

/// Create the notification pseudo-actions for `task` on clone `rsc`.
///
/// `action` gets a `pre` pair ordered before it and `complete` a `post`
/// pair ordered after it; either may be absent. Returns `None` when the
/// clone does not ask for notifications.
pub fn build(
    ws: &mut WorkingSet,
    rsc: ResourceId,
    task: ActionKind,
    action: Option<ActionId>,
    complete: Option<ActionId>,
) -> Option<NotifyData> {
    if !ws.resources[rsc].flags.notify {
        return None;
    }
    let mut data = NotifyData::new(task);

    if let Some(action) = action {
        let pre = new_pseudo(ws, rsc, action, ActionKind::Notify, "pre", &data.action);
        let pre_done = new_pseudo(
            ws,
            rsc,
            action,
            ActionKind::Notified,
            "confirmed-pre",
            &data.action,
        );
        for id in [pre, pre_done] {
            let notify = &mut ws.actions[id];
            notify.flags.runnable = true;
            notify.add_meta("notify_type", "pre");
        }

        ws.order_actions(pre, pre_done, OrderFlags::OPTIONAL);
        ws.order_actions(pre_done, action, OrderFlags::OPTIONAL);
        data.pre = Some(pre);
        data.pre_done = Some(pre_done);
    }

    if let Some(complete) = complete {
        let runnable = ws.actions[complete].flags.runnable;
        let post = new_pseudo(ws, rsc, complete, ActionKind::Notify, "post", &data.action);
        let post_done = new_pseudo(
            ws,
            rsc,
            complete,
            ActionKind::Notified,
            "confirmed-post",
            &data.action,
        );
        for id in [post, post_done] {
            let notify = &mut ws.actions[id];
            notify.priority = Score::INFINITY;
            notify.flags.runnable = runnable;
            notify.add_meta("notify_type", "post");
        }

        ws.order_actions(complete, post, OrderFlags::IMPLIES_THEN);
        ws.order_actions(post, post_done, OrderFlags::IMPLIES_THEN);
        data.post = Some(post);
        data.post_done = Some(post_done);
    }

    if let (Some(pre_done), Some(post)) = (data.pre_done, data.post) {
        ws.order_actions(pre_done, post, OrderFlags::OPTIONAL);
    }

    debug!(
        rsc = %ws.resources[rsc].id,
        action = %data.action,
        pre = data.pre.is_some(),
        post = data.post.is_some(),
        "created notification pseudo-actions"
    );
    Some(data)
}

fn new_pseudo(
    ws: &mut WorkingSet,
    rsc: ResourceId,
    action: ActionId,
    kind: ActionKind,
    notify_type: &str,
    operation: &ActionKind,
) -> ActionId {
    let task = ws.actions[action].task.clone();
    let optional = ws.actions[action].flags.optional;
    let key = notify_key(&ws.resources[rsc].id, notify_type, task.as_str());

    let id = ws.custom_action(Some(rsc), key, kind, None, optional);
    let notify = &mut ws.actions[id];
    notify.flags.pseudo = true;
    notify.add_meta("notify_key_type", notify_type);
    notify.add_meta("notify_key_operation", task.as_str());
    notify.add_meta("notify_operation", operation.as_str());
    id
}
