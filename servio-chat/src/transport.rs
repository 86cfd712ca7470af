//! Transport Trait
//!
//! Platform-agnostic abstraction over the persistent broker connection.
//! The session core drives a transport through this seam; production code
//! uses the WebSocket implementation, tests use the mock.

use crate::error::ChatError;
use crate::wire::ClientFrame;

/// The transport-level handshake request.
///
/// Carries the endpoint plus the headers that must accompany the upgrade:
/// the bearer authorization value and the sub-protocol negotiation header.
/// The same bearer value is sent again in the protocol-level connect frame;
/// the server requires both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Broker endpoint URL.
    pub endpoint: String,
    /// Transport handshake headers.
    pub headers: Vec<(String, String)>,
}

/// Payload of one inbound frame, as produced by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Text(String),
    Binary(Vec<u8>),
}

/// One inbound message frame plus its routing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Destination path the frame was delivered on.
    pub destination: String,
    /// Broker-assigned frame identifier.
    pub message_id: String,
    /// Raw payload, text or binary.
    pub payload: FramePayload,
}

/// Events a transport reports back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The protocol handshake was acknowledged by the broker.
    HandshakeAck,
    /// A message frame arrived on a subscribed destination.
    Frame(InboundFrame),
    /// The underlying connection closed. `clean` is true when the close was
    /// locally requested or negotiated, false for an unexpected drop.
    Closed { clean: bool },
    /// A transport-level failure with a human-readable detail.
    Failed(String),
}

/// Transport abstraction for the persistent broker connection.
///
/// Implementations are polled from the session's owner context; they must
/// never call back into the session directly.
pub trait Transport: Send {
    /// Opens the underlying connection and performs the transport handshake.
    fn open(&mut self, request: &HandshakeRequest) -> Result<(), ChatError>;

    /// Closes the underlying connection. Safe to call when already closed.
    fn close(&mut self);

    /// Returns true while the underlying connection is open.
    fn is_open(&self) -> bool;

    /// Sends one client frame. Returns an error if the frame could not be
    /// handed to the connection.
    fn send(&mut self, frame: &ClientFrame) -> Result<(), ChatError>;

    /// Polls for the next transport event. Returns `None` when nothing is
    /// currently available; failures are reported as events, not errors.
    fn poll(&mut self) -> Option<TransportEvent>;
}
