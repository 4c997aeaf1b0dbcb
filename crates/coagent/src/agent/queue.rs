//! Per-agent store of deferred messages.
//!
//! Ordering is priority-major, FIFO-minor: every high entry precedes every
//! normal entry, and insertion order is kept within a band.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub priority: Priority,
}

impl QueuedMessage {
    pub fn new(content: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            priority,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    entries: VecDeque<QueuedMessage>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message and place it according to its priority.
    pub fn enqueue(&mut self, content: impl Into<String>, priority: Priority) -> QueuedMessage {
        let message = QueuedMessage::new(content, priority);
        self.insert(message.clone());
        message
    }

    pub fn insert(&mut self, message: QueuedMessage) {
        match message.priority {
            Priority::High => {
                let position = self
                    .entries
                    .iter()
                    .rposition(|entry| entry.priority == Priority::High)
                    .map_or(0, |index| index + 1);
                self.entries.insert(position, message);
            }
            Priority::Normal => self.entries.push_back(message),
        }
    }

    /// Absent ids are not an error: the entry may already have been drained.
    pub fn remove(&mut self, id: &str) -> Option<QueuedMessage> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        self.entries.remove(index)
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn pop_front(&mut self) -> Option<QueuedMessage> {
        self.entries.pop_front()
    }

    pub fn peek_ordered(&self) -> Vec<QueuedMessage> {
        self.entries.iter().cloned().collect()
    }

    /// Restore priority-major order; stable within each band.
    pub fn reorder_by_priority(&mut self) {
        self.entries
            .make_contiguous()
            .sort_by(|left, right| right.priority.cmp(&left.priority));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(queue: &MessageQueue) -> Vec<String> {
        queue
            .peek_ordered()
            .into_iter()
            .map(|message| message.content)
            .collect()
    }

    #[test]
    fn high_priority_jumps_ahead_of_normal() {
        let mut queue = MessageQueue::new();
        queue.enqueue("a", Priority::Normal);
        queue.enqueue("b", Priority::High);
        queue.enqueue("c", Priority::Normal);
        queue.enqueue("d", Priority::High);

        assert_eq!(contents(&queue), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn every_priority_sequence_keeps_bands_in_insertion_order() {
        for mask in 0u32..(1 << 6) {
            let mut queue = MessageQueue::new();
            let mut highs = Vec::new();
            let mut normals = Vec::new();
            for index in 0..6 {
                let label = index.to_string();
                if mask & (1 << index) != 0 {
                    queue.enqueue(label.clone(), Priority::High);
                    highs.push(label);
                } else {
                    queue.enqueue(label.clone(), Priority::Normal);
                    normals.push(label);
                }
            }

            let mut expected = highs;
            expected.extend(normals);
            assert_eq!(contents(&queue), expected, "mask {mask:06b}");
        }
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let mut queue = MessageQueue::new();
        queue.enqueue("a", Priority::Normal);

        assert!(queue.remove("missing").is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_returns_the_entry() {
        let mut queue = MessageQueue::new();
        let first = queue.enqueue("a", Priority::Normal);
        queue.enqueue("b", Priority::Normal);

        let removed = queue.remove(&first.id).expect("removed");
        assert_eq!(removed.content, "a");
        assert_eq!(contents(&queue), vec!["b"]);
    }

    #[test]
    fn clear_reports_removed_count() {
        let mut queue = MessageQueue::new();
        queue.enqueue("a", Priority::Normal);
        queue.enqueue("b", Priority::High);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }

    #[test]
    fn reorder_restores_priority_bands_stably() {
        let mut queue = MessageQueue::new();
        // Bypass placement to simulate an unordered restore.
        for (content, priority) in [
            ("n1", Priority::Normal),
            ("h1", Priority::High),
            ("n2", Priority::Normal),
            ("h2", Priority::High),
        ] {
            queue.entries.push_back(QueuedMessage::new(content, priority));
        }

        queue.reorder_by_priority();
        assert_eq!(contents(&queue), vec!["h1", "h2", "n1", "n2"]);
    }

    #[test]
    fn pop_front_takes_highest_priority_first() {
        let mut queue = MessageQueue::new();
        queue.enqueue("a", Priority::Normal);
        queue.enqueue("b", Priority::High);
        queue.enqueue("c", Priority::Normal);

        let order: Vec<String> = std::iter::from_fn(|| queue.pop_front())
            .map(|message| message.content)
            .collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }
}
