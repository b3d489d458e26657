use std::collections::HashMap;

use crate::api::{Message, Timestamp};

/// Two-party thread between the viewer and one partner
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub email: String,
    pub name: String,
    /// Oldest first
    pub messages: Vec<Message>,
    /// Newest timestamp among `messages`, used for ordering only
    pub latest: Timestamp,
}

impl Conversation {
    pub fn latest_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.read).count()
    }
}

/// Group a flat message list into conversations.
/// One conversation per partner email, sorted by most recent message
/// (descending); within each conversation messages are chronological
/// (ascending). Both sorts are stable, so ties keep arrival order.
pub fn group_conversations(messages: Vec<Message>) -> Vec<Conversation> {
    if messages.is_empty() {
        return Vec::new();
    }

    // 1. Partition by partner, remembering first-seen order
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut conversations: Vec<Conversation> = Vec::new();

    for msg in messages {
        let email = msg.partner_email().to_string();
        let slot = match index.get(&email) {
            Some(&i) => i,
            None => {
                conversations.push(Conversation {
                    email: email.clone(),
                    name: msg.partner_name().to_string(),
                    messages: Vec::new(),
                    latest: msg.timestamp.clone(),
                });
                index.insert(email, conversations.len() - 1);
                conversations.len() - 1
            }
        };

        // 2. Track the newest timestamp seen for the partner
        let convo = &mut conversations[slot];
        if msg.timestamp.sort_key() > convo.latest.sort_key() {
            convo.latest = msg.timestamp.clone();
        }
        convo.messages.push(msg);
    }

    // 3. Oldest-first inside each thread
    for convo in &mut conversations {
        convo
            .messages
            .sort_by(|a, b| a.timestamp.sort_key().cmp(&b.timestamp.sort_key()));
    }

    // 4. Newest conversation first
    conversations.sort_by(|a, b| b.latest.sort_key().cmp(&a.latest.sort_key()));

    conversations
}

/// Number of unread messages across the whole list
pub fn unread_messages(messages: &[Message]) -> usize {
    messages.iter().filter(|m| !m.read).count()
}
