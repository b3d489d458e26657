mod conversation;

pub use conversation::*;

use crate::api::{Message, Notification};

/// Number of unread notifications
pub fn unread_notifications(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

/// Flip a message to read locally. Nothing is sent to the server.
/// Returns true if the flag changed.
pub fn mark_message_read(messages: &mut [Message], id: &str) -> bool {
    match messages.iter_mut().find(|m| m.id == id) {
        Some(msg) if !msg.read => {
            msg.read = true;
            true
        }
        _ => false,
    }
}

/// Flip a notification to read locally. Returns true if the flag changed.
pub fn mark_notification_read(notifications: &mut [Notification], id: &str) -> bool {
    match notifications.iter_mut().find(|n| n.id == id) {
        Some(notif) if !notif.read => {
            notif.read = true;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unread_notifications() {
        let notes = vec![
            Notification {
                id: "1".into(),
                read: false,
                ..Default::default()
            },
            Notification {
                id: "2".into(),
                read: true,
                ..Default::default()
            },
            Notification {
                id: "3".into(),
                read: false,
                ..Default::default()
            },
        ];
        assert_eq!(unread_notifications(&notes), 2);
    }

    #[test]
    fn test_mark_message_read_locally() {
        let mut messages = vec![Message {
            id: "m1".into(),
            ..Default::default()
        }];
        assert_eq!(unread_messages(&messages), 1);
        assert!(mark_message_read(&mut messages, "m1"));
        assert!(!mark_message_read(&mut messages, "m1"));
        assert!(!mark_message_read(&mut messages, "missing"));
        assert_eq!(unread_messages(&messages), 0);
    }

    #[test]
    fn test_mark_notification_read_locally() {
        let mut notes = vec![Notification {
            id: "n1".into(),
            ..Default::default()
        }];
        assert!(mark_notification_read(&mut notes, "n1"));
        assert!(notes[0].read);
    }
}
