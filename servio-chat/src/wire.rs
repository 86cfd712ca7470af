// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Frames
//!
//! Rendering and parsing of the broker's text framing. A frame is a command
//! line, a header block, a blank line, and a NUL-terminated body. The JSON
//! message body is produced by [`crate::codec`]; this module only deals with
//! the framing around it.

use crate::error::ChatError;

/// Frames sent from the client to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Protocol-level session handshake.
    Connect {
        /// Connect headers: bearer auth, host, accepted versions, heartbeats.
        headers: Vec<(String, String)>,
    },
    /// Declares interest in a destination path.
    Subscribe {
        /// Client-generated subscription id.
        id: String,
        /// Destination path to subscribe to.
        destination: String,
    },
    /// Delivers one message body to a destination.
    Send {
        /// Destination path.
        destination: String,
        /// Body content type header value.
        content_type: String,
        /// Serialized message body.
        body: String,
    },
}

/// Frames received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// Handshake acknowledgement.
    Connected,
    /// A message delivered to one of our subscriptions.
    Message {
        destination: String,
        message_id: String,
        body: String,
    },
    /// Broker-reported error.
    Error { detail: String },
    /// Empty keep-alive frame.
    Heartbeat,
}

/// Renders a client frame to its wire text.
pub fn render(frame: &ClientFrame) -> String {
    match frame {
        ClientFrame::Connect { headers } => {
            let pairs: Vec<(&str, &str)> = headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            render_frame("CONNECT", &pairs, None)
        }
        ClientFrame::Subscribe { id, destination } => render_frame(
            "SUBSCRIBE",
            &[("id", id), ("destination", destination), ("ack", "auto")],
            None,
        ),
        ClientFrame::Send {
            destination,
            content_type,
            body,
        } => render_frame(
            "SEND",
            &[("destination", destination), ("content-type", content_type)],
            Some(body),
        ),
    }
}

fn render_frame(command: &str, headers: &[(&str, &str)], body: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(command);
    out.push('\n');
    for (name, value) in headers {
        out.push_str(name);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');
    if let Some(body) = body {
        out.push_str(body);
    }
    out.push('\0');
    out
}

/// Parses one inbound frame.
pub fn parse(raw: &str) -> Result<ServerFrame, ChatError> {
    let raw = raw.trim_end_matches('\0');
    if raw.chars().all(|c| c == '\n' || c == '\r') {
        return Ok(ServerFrame::Heartbeat);
    }

    let (head, body) = match raw.split_once("\r\n\r\n").or_else(|| raw.split_once("\n\n")) {
        Some((head, body)) => (head, body),
        None => (raw, ""),
    };

    let mut lines = head.lines();
    let command = lines
        .next()
        .ok_or_else(|| ChatError::InvalidFrame("empty frame".into()))?
        .trim();

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ChatError::InvalidFrame(format!("malformed header line: {line}")))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    match command {
        "CONNECTED" => Ok(ServerFrame::Connected),
        "MESSAGE" => {
            let destination = header_value(&headers, "destination").ok_or_else(|| {
                ChatError::InvalidFrame("MESSAGE frame without destination".into())
            })?;
            let message_id = header_value(&headers, "message-id").ok_or_else(|| {
                ChatError::InvalidFrame("MESSAGE frame without message-id".into())
            })?;
            Ok(ServerFrame::Message {
                destination,
                message_id,
                body: body.to_string(),
            })
        }
        "ERROR" => {
            let detail = header_value(&headers, "message")
                .unwrap_or_else(|| body.trim().to_string());
            Ok(ServerFrame::Error { detail })
        }
        other => Err(ChatError::InvalidFrame(format!(
            "unsupported frame command: {other}"
        ))),
    }
}

fn header_value(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}
