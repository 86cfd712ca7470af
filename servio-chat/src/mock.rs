//! Mock Transport
//!
//! Mock implementation of the Transport trait for testing.

use std::collections::VecDeque;

use crate::error::ChatError;
use crate::transport::{HandshakeRequest, Transport, TransportEvent};
use crate::wire::ClientFrame;

/// Mock transport for testing.
///
/// Records handshakes and sent frames, replays injected events and errors.
///
/// # Example
///
/// ```ignore
/// use servio_chat::{MockTransport, Transport};
///
/// let mut transport = MockTransport::new();
/// transport.set_auto_ack(true); // acknowledge CONNECT frames automatically
/// transport.push_event(TransportEvent::Closed { clean: false });
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    open: bool,
    /// Acknowledge the protocol handshake as soon as a Connect frame is sent.
    auto_ack: bool,
    /// Fail every open attempt (for reconnection tests).
    fail_opens: bool,
    /// One-shot error injected into the next operation.
    inject_error: Option<ChatError>,
    /// Every handshake request seen by open().
    handshakes: Vec<HandshakeRequest>,
    /// Frames that have been sent.
    sent_frames: Vec<ClientFrame>,
    /// Events to hand out on poll().
    events: VecDeque<TransportEvent>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables automatic handshake acknowledgement.
    pub fn set_auto_ack(&mut self, enabled: bool) {
        self.auto_ack = enabled;
    }

    /// Makes every subsequent open() attempt fail.
    pub fn set_fail_opens(&mut self, enabled: bool) {
        self.fail_opens = enabled;
    }

    /// Injects an error to be returned by the next open() or send().
    pub fn inject_error(&mut self, error: ChatError) {
        self.inject_error = Some(error);
    }

    /// Queues an event to be returned by poll().
    pub fn push_event(&mut self, event: TransportEvent) {
        self.events.push_back(event);
    }

    /// Returns all handshake requests seen so far.
    pub fn handshakes(&self) -> &[HandshakeRequest] {
        &self.handshakes
    }

    /// Returns all frames that have been sent.
    pub fn sent_frames(&self) -> &[ClientFrame] {
        &self.sent_frames
    }

    /// Clears the sent-frames buffer.
    pub fn clear_sent(&mut self) {
        self.sent_frames.clear();
    }

    fn check_error(&mut self) -> Result<(), ChatError> {
        if let Some(err) = self.inject_error.take() {
            return Err(err);
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    fn open(&mut self, request: &HandshakeRequest) -> Result<(), ChatError> {
        self.check_error()?;
        if self.fail_opens {
            return Err(ChatError::ConnectionFailed("injected open failure".into()));
        }
        self.handshakes.push(request.clone());
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn send(&mut self, frame: &ClientFrame) -> Result<(), ChatError> {
        self.check_error()?;
        if !self.open {
            return Err(ChatError::NotConnected);
        }
        self.sent_frames.push(frame.clone());
        if self.auto_ack && matches!(frame, ClientFrame::Connect { .. }) {
            self.events.push_back(TransportEvent::HandshakeAck);
        }
        Ok(())
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}
