//! One-way notification fan-out.
//!
//! Notifications append to a single unread queue keyed by recipient. Social
//! kinds never self-target (hearting your own post is not news to you);
//! system-to-user kinds (achievement, tier, warning) are exempt because they
//! describe the user's own state.

use chrono::{DateTime, Utc};

use crate::types::{new_id, Notification, NotificationKind};

/// Append an unread notification. Returns `false` when suppressed by the
/// self-notification rule.
pub fn emit(
    queue: &mut Vec<Notification>,
    actor: &str,
    recipient: &str,
    kind: NotificationKind,
    snippet: &str,
    post_id: Option<String>,
    now: DateTime<Utc>,
) -> bool {
    if recipient == actor && !kind.allows_self_target() {
        return false;
    }
    queue.push(Notification {
        id: new_id(),
        recipient: recipient.to_string(),
        from_user: actor.to_string(),
        kind,
        post_id,
        snippet: snippet.to_string(),
        timestamp: now,
        read: false,
    });
    true
}

/// Bulk-flip the read flag for everything addressed to `recipient`.
pub fn mark_all_read(queue: &mut [Notification], recipient: &str) {
    for n in queue.iter_mut().filter(|n| n.recipient == recipient) {
        n.read = true;
    }
}

/// Unread count for a recipient, for badge rendering.
pub fn unread_count(queue: &[Notification], recipient: &str) -> usize {
    queue
        .iter()
        .filter(|n| n.recipient == recipient && !n.read)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-08-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn social_self_notification_is_suppressed() {
        let mut queue = Vec::new();
        assert!(!emit(&mut queue, "ana", "ana", NotificationKind::Heart, "", None, now()));
        assert!(queue.is_empty());
    }

    #[test]
    fn warning_self_notification_is_allowed() {
        let mut queue = Vec::new();
        assert!(emit(&mut queue, "ana", "ana", NotificationKind::Warning, "strike 1", None, now()));
        assert_eq!(queue.len(), 1);
        assert!(!queue[0].read);
    }

    #[test]
    fn mark_all_read_only_touches_the_recipient() {
        let mut queue = Vec::new();
        emit(&mut queue, "ana", "ben", NotificationKind::Heart, "hi", None, now());
        emit(&mut queue, "ana", "cleo", NotificationKind::Follow, "", None, now());
        mark_all_read(&mut queue, "ben");
        assert!(queue[0].read);
        assert!(!queue[1].read);
        assert_eq!(unread_count(&queue, "ben"), 0);
        assert_eq!(unread_count(&queue, "cleo"), 1);
    }
}
