// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Broker Configuration
//!
//! Connection settings for the message broker. Loaded once at application
//! startup and validated up front, so no call site has to deal with a
//! half-formed endpoint.

use crate::error::ChatError;

/// Configuration for the broker connection.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker endpoint URL (`ws://` or `wss://`).
    pub endpoint: String,
    /// Virtual host sent in the protocol-level connect frame.
    pub vhost: String,
    /// Accepted protocol versions, comma separated.
    pub accept_versions: String,
    /// Heartbeat interval pair in milliseconds (outgoing, incoming).
    pub heartbeat: (u32, u32),
    /// Sub-protocol negotiated during the transport handshake.
    pub subprotocol: String,
    /// Destination path for outbound chat messages.
    pub send_destination: String,
    /// Destination path of the user's private inbound message queue.
    pub inbox_destination: String,
    /// Read/write timeout in milliseconds.
    pub io_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            endpoint: String::new(),
            vhost: "servio".to_string(),
            accept_versions: "1.1,1.2".to_string(),
            heartbeat: (10_000, 10_000),
            subprotocol: "v12.stomp".to_string(),
            send_destination: "/app/chat".to_string(),
            inbox_destination: "/user/queue/messages".to_string(),
            io_timeout_ms: 30_000,
        }
    }
}

impl BrokerConfig {
    /// Creates a config for the given endpoint, validating the URL scheme.
    pub fn new(endpoint: &str) -> Result<Self, ChatError> {
        let config = BrokerConfig {
            endpoint: endpoint.to_string(),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ChatError> {
        if !self.endpoint.starts_with("ws://") && !self.endpoint.starts_with("wss://") {
            return Err(ChatError::InvalidConfig(format!(
                "Invalid endpoint scheme (expected ws:// or wss://): {}",
                self.endpoint
            )));
        }
        if self.inbox_destination.is_empty() || self.send_destination.is_empty() {
            return Err(ChatError::InvalidConfig(
                "Destination paths must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Returns the heartbeat pair formatted for the connect frame header.
    pub fn heartbeat_header(&self) -> String {
        format!("{},{}", self.heartbeat.0, self.heartbeat.1)
    }
}
