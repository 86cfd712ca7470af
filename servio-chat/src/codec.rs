// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Codec
//!
//! Serializes outbound chat messages to their JSON wire body and decodes
//! inbound frames back into typed messages. Inbound payloads may arrive as
//! text or binary; binary is normalized through UTF-8 before parsing.
//! Malformed input is an error for the caller to drop, never a panic.

use crate::error::ChatError;
use crate::message::ChatMessage;
use crate::transport::{FramePayload, InboundFrame};

/// Serializes a message to its JSON wire body.
pub fn encode(message: &ChatMessage) -> Result<String, ChatError> {
    serde_json::to_string(message).map_err(|e| ChatError::Serialization(e.to_string()))
}

/// Decodes an inbound frame into a chat message.
pub fn decode(frame: &InboundFrame) -> Result<ChatMessage, ChatError> {
    let text = match &frame.payload {
        FramePayload::Text(text) => text.as_str(),
        FramePayload::Binary(bytes) => std::str::from_utf8(bytes)
            .map_err(|_| ChatError::InvalidFrame("binary payload is not valid UTF-8".into()))?,
    };
    serde_json::from_str(text).map_err(|e| ChatError::InvalidFrame(e.to_string()))
}
