//! User-facing messages produced by failed operations.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a message within its list.
pub type MessageId = u64;

/// Severity of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    /// An operation completed.
    Success,
    /// An operation failed; the user may retry.
    Failure,
    /// Something failed that the user cannot fix by retrying.
    Severe,
}

/// One message shown in the log view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier within the list.
    pub id: MessageId,
    /// Severity.
    pub level: MessageLevel,
    /// Short headline.
    pub title: String,
    /// Detail text.
    pub text: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether the user has seen the message.
    pub noticed: bool,
}

/// Bounded list of messages, newest last. The oldest message is evicted when full.
#[derive(Debug, Clone)]
pub struct MessageList {
    messages: VecDeque<Message>,
    capacity: usize,
    next_id: MessageId,
}

impl MessageList {
    /// Empty list holding at most `capacity` messages (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            next_id: 1,
        }
    }

    /// Append a message and return its identifier.
    pub fn push(
        &mut self,
        level: MessageLevel,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(Message {
            id,
            level,
            title: title.into(),
            text: text.into(),
            created_at: Utc::now(),
            noticed: false,
        });
        id
    }

    /// Messages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    /// Message by identifier.
    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.position(id).and_then(|index| self.messages.get(index))
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages the user has not seen yet.
    #[must_use]
    pub fn unnoticed(&self) -> usize {
        self.messages.iter().filter(|message| !message.noticed).count()
    }

    /// Mark one message as seen; returns whether it exists.
    pub fn mark_noticed(&mut self, id: MessageId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.messages[index].noticed = true;
                true
            }
            None => false,
        }
    }

    /// Mark every message as seen.
    pub fn mark_all_noticed(&mut self) {
        for message in &mut self.messages {
            message.noticed = true;
        }
    }

    /// Remove a message by identifier.
    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        self.position(id)
            .and_then(|index| self.messages.remove(index))
    }

    // Identifiers are assigned in increasing order, so the deque is sorted by id.
    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages
            .binary_search_by_key(&id, |message| message.id)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut list = MessageList::with_capacity(2);
        let first = list.push(MessageLevel::Failure, "a", "");
        list.push(MessageLevel::Failure, "b", "");
        list.push(MessageLevel::Severe, "c", "");
        assert_eq!(list.len(), 2);
        assert!(list.get(first).is_none());
        let titles: Vec<_> = list.iter().map(|message| message.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[test]
    fn remove_targets_the_requested_message() {
        let mut list = MessageList::with_capacity(8);
        let first = list.push(MessageLevel::Failure, "first", "");
        let second = list.push(MessageLevel::Failure, "second", "");
        let third = list.push(MessageLevel::Failure, "third", "");

        let removed = list.remove(second).expect("message present");
        assert_eq!(removed.title, "second");
        assert!(list.get(first).is_some());
        assert!(list.get(third).is_some());
        assert!(list.remove(second).is_none());
    }

    #[test]
    fn noticed_flags_are_tracked() {
        let mut list = MessageList::with_capacity(8);
        let id = list.push(MessageLevel::Success, "done", "");
        list.push(MessageLevel::Failure, "failed", "");
        assert_eq!(list.unnoticed(), 2);
        assert!(list.mark_noticed(id));
        assert_eq!(list.unnoticed(), 1);
        list.mark_all_noticed();
        assert_eq!(list.unnoticed(), 0);
        assert!(!list.mark_noticed(999));
        assert!(!list.is_empty());
    }
}
