//! Outbound Queue
//!
//! FIFO buffer for messages composed while the session is not connected.
//! Drained destructively once per successful handshake.

use std::collections::VecDeque;

use crate::message::ChatMessage;

/// FIFO queue of messages awaiting a live connection.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    inner: VecDeque<ChatMessage>,
}

impl OutboundQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message at the back of the queue.
    pub fn push(&mut self, message: ChatMessage) {
        self.inner.push_back(message);
    }

    /// Removes and returns all queued messages in enqueue order.
    pub fn drain(&mut self) -> Vec<ChatMessage> {
        self.inner.drain(..).collect()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> ChatMessage {
        ChatMessage::provisional(1, 2, 3, content)
    }

    #[test]
    fn test_drain_preserves_enqueue_order() {
        let mut queue = OutboundQueue::new();
        queue.push(msg("a"));
        queue.push(msg("b"));
        queue.push(msg("c"));

        let drained = queue.drain();
        let contents: Vec<&str> = drained.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_drain_empties_the_queue() {
        let mut queue = OutboundQueue::new();
        queue.push(msg("a"));
        assert_eq!(queue.len(), 1);

        queue.drain();
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }
}
