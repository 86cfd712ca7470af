// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Chat Message Types
//!
//! The message record exchanged between service seekers and providers.
//! Client-origin messages carry a provisional negative id until the server
//! echo replaces it with the real one.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Message identifier. Server-assigned ids are positive; provisional
/// client-side ids are negative.
pub type MessageId = i64;

static NEXT_PROVISIONAL_ID: AtomicI64 = AtomicI64::new(-1);

/// Hands out the next provisional (negative) message id.
pub fn next_provisional_id() -> MessageId {
    NEXT_PROVISIONAL_ID.fetch_sub(1, Ordering::Relaxed)
}

/// Returns the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A chat message tied to one service request conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message id (negative until assigned by the server).
    pub id: MessageId,
    /// Service request / conversation this message belongs to.
    pub request_id: i64,
    /// Sending user.
    pub sender_id: i64,
    /// Receiving user.
    pub recipient_id: i64,
    /// Message text.
    pub content: String,
    /// Creation time, unix seconds.
    pub sent_at: u64,
    /// Optional structured payload attached to the message.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub proposal: Option<BookingProposal>,
}

impl ChatMessage {
    /// Creates a client-origin message with a provisional id.
    pub fn provisional(request_id: i64, sender_id: i64, recipient_id: i64, content: &str) -> Self {
        ChatMessage {
            id: next_provisional_id(),
            request_id,
            sender_id,
            recipient_id,
            content: content.to_string(),
            sent_at: now_timestamp(),
            proposal: None,
        }
    }

    /// Attaches a booking proposal to the message.
    pub fn with_proposal(mut self, proposal: BookingProposal) -> Self {
        self.proposal = Some(proposal);
        self
    }
}

/// A provider's booking proposal carried inside a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingProposal {
    /// Proposed service time, unix seconds.
    pub proposed_time: u64,
    /// Lower bound of the price range, in minor currency units.
    pub price_min: u32,
    /// Upper bound of the price range, in minor currency units.
    pub price_max: u32,
    /// Free-form notes for the seeker.
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisional_ids_are_negative_and_unique() {
        let a = next_provisional_id();
        let b = next_provisional_id();
        assert!(a < 0);
        assert!(b < 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_provisional_message_fields() {
        let msg = ChatMessage::provisional(42, 7, 9, "hello");
        assert!(msg.id < 0);
        assert_eq!(msg.request_id, 42);
        assert_eq!(msg.sender_id, 7);
        assert_eq!(msg.recipient_id, 9);
        assert_eq!(msg.content, "hello");
        assert!(msg.proposal.is_none());
    }

    #[test]
    fn test_with_proposal() {
        let proposal = BookingProposal {
            proposed_time: 1_700_000_000,
            price_min: 5_000,
            price_max: 8_000,
            notes: "includes materials".into(),
        };
        let msg = ChatMessage::provisional(1, 2, 3, "quote").with_proposal(proposal.clone());
        assert_eq!(msg.proposal, Some(proposal));
    }

    #[test]
    fn test_proposal_omitted_from_json_when_absent() {
        let msg = ChatMessage::provisional(1, 2, 3, "plain");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("proposal"));
    }
}
