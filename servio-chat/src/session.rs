// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Chat Session
//!
//! Owns the lifecycle of the one persistent broker connection: handshake,
//! subscription, offline queuing, automatic reconnection with backoff, and
//! foreground/background handling.
//!
//! All state lives behind `&mut self`; timers and transports report back
//! through an internal signal channel drained by [`ChatSession::pump`], so
//! every transition happens on the owner context.
//!
//! # Example
//!
//! ```ignore
//! use servio_chat::{BrokerConfig, ChatSession, EventDispatcher, MockTransport};
//!
//! let config = BrokerConfig::new("wss://chat.servio.app/ws")?;
//! let events = Arc::new(dispatcher);
//! let mut session = ChatSession::new(MockTransport::new(), config, events);
//!
//! session.connect("bearer-token");
//! session.send_message(ChatMessage::provisional(req, me, them, "hi"));
//! loop { session.pump(); /* ... */ }
//! ```

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc};

use crate::backoff::ReconnectPolicy;
use crate::codec;
use crate::config::BrokerConfig;
use crate::credentials::{CredentialStore, CHAT_TOKEN_SERVICE};
use crate::events::{ChatEvent, EventDispatcher};
use crate::lifecycle::LifecycleEvent;
use crate::message::ChatMessage;
use crate::queue::OutboundQueue;
use crate::subscription::SubscriptionManager;
use crate::timer::ScheduledSignal;
use crate::transport::{HandshakeRequest, Transport, TransportEvent};
use crate::wire::ClientFrame;

/// State shown when automatic reconnection has given up.
pub const RETRY_EXHAUSTED_DETAIL: &str = "Connection failed after multiple retries.";

/// Connection state of the chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to the broker.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Session established and subscribed.
    Connected,
    /// Connection failed; the detail string is suitable for display.
    Error(String),
}

impl ConnectionState {
    /// States from which a (re)connect may be started.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Error(_))
    }
}

/// Signals delivered back to the session from its timers.
#[derive(Debug)]
enum SessionSignal {
    ReconnectDue,
}

/// The chat session controller.
///
/// One instance per application; constructed at the root composition and
/// shared with consumers through the event dispatcher. `connect` and
/// `disconnect` are the only externally triggered state transitions.
pub struct ChatSession<T: Transport> {
    transport: T,
    config: BrokerConfig,
    policy: ReconnectPolicy,
    events: Arc<EventDispatcher>,
    credentials: Option<Arc<dyn CredentialStore>>,

    state: ConnectionState,
    token: Option<String>,
    attempts: u32,
    subscription: SubscriptionManager,
    outbound: OutboundQueue,
    reconnect_timer: Option<ScheduledSignal>,
    /// True after a locally requested close; suppresses reconnection when
    /// the transport reports the resulting close event.
    close_requested: bool,

    signal_tx: Sender<SessionSignal>,
    signal_rx: Receiver<SessionSignal>,
}

impl<T: Transport> ChatSession<T> {
    /// Creates a new session over the given transport.
    pub fn new(transport: T, config: BrokerConfig, events: Arc<EventDispatcher>) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel();
        ChatSession {
            transport,
            config,
            policy: ReconnectPolicy::default(),
            events,
            credentials: None,
            state: ConnectionState::Disconnected,
            token: None,
            attempts: 0,
            subscription: SubscriptionManager::new(),
            outbound: OutboundQueue::new(),
            reconnect_timer: None,
            close_requested: false,
            signal_tx,
            signal_rx,
        }
    }

    /// Overrides the reconnection policy.
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attaches a credential store used for session restore and logout.
    pub fn with_credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Returns the current connection state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Returns true when the session is established.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Returns true while a credential is cached for reconnection.
    pub fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the number of messages waiting for a connection.
    pub fn queued_count(&self) -> usize {
        self.outbound.len()
    }

    /// Returns the retry attempt counter.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns true while a reconnect timer is armed.
    pub fn is_reconnect_armed(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    /// Returns the active subscription id, if subscribed.
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.id()
    }

    /// Returns a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Starts a connection with the given bearer token.
    ///
    /// No-op (with a warning) while a handshake is in flight or the session
    /// is already connected. Resets the retry counter: this is an explicit,
    /// user-triggered attempt.
    pub fn connect(&mut self, token: &str) {
        if !self.state.is_retryable() {
            tracing::warn!(state = ?self.state, "connect ignored; handshake already in progress or established");
            return;
        }
        self.attempts = 0;
        self.reconnect_timer = None;
        if let Some(store) = &self.credentials {
            store.save_token(CHAT_TOKEN_SERVICE, token);
        }
        self.begin_connect(token);
    }

    /// Restores a session from the credential store, if a token is saved.
    pub fn connect_from_store(&mut self) -> Result<(), crate::error::ChatError> {
        if !self.state.is_retryable() {
            tracing::warn!(state = ?self.state, "restore ignored; handshake already in progress or established");
            return Ok(());
        }
        let token = self
            .credentials
            .as_ref()
            .and_then(|store| store.get_token(CHAT_TOKEN_SERVICE))
            .ok_or(crate::error::ChatError::MissingCredential)?;
        self.attempts = 0;
        self.begin_connect(&token);
        Ok(())
    }

    /// Tears the connection down.
    ///
    /// With `persist = false` any pending automatic reconnection is
    /// cancelled and the retry counter cleared; with `persist = true` a
    /// later automatic reconnect stays possible. Safe to call repeatedly.
    /// The cached credential is kept either way (the foreground reconnect
    /// path needs it); only [`ChatSession::log_out`] clears it.
    pub fn disconnect(&mut self, persist: bool) {
        if !persist {
            self.reconnect_timer = None;
            self.attempts = 0;
        }
        self.close_requested = !persist;
        self.subscription.clear();
        self.transport.close();
        self.transition(ConnectionState::Disconnected);
    }

    /// Logs out: disconnects for good and clears the credential everywhere.
    pub fn log_out(&mut self) {
        self.disconnect(false);
        self.token = None;
        if let Some(store) = &self.credentials {
            store.delete_token(CHAT_TOKEN_SERVICE);
        }
    }

    /// Sends a message, or queues it until the session is connected.
    ///
    /// Never fails for the caller: a message that cannot be encoded is
    /// dropped with a logged error, transport failures surface through the
    /// connection state stream.
    pub fn send_message(&mut self, message: ChatMessage) {
        if self.is_connected() {
            self.transmit(message);
        } else {
            tracing::debug!(
                queued = self.outbound.len() + 1,
                "not connected; queueing outbound message"
            );
            self.outbound.push(message);
        }
    }

    /// Applies a host lifecycle transition.
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::EnteredBackground => {
                tracing::debug!("entered background; closing chat connection");
                self.disconnect(false);
            }
            LifecycleEvent::BecameActive => {
                if !self.state.is_retryable() || self.reconnect_timer.is_some() {
                    return;
                }
                if let Some(token) = self.token.clone() {
                    tracing::debug!("became active; reconnecting immediately");
                    self.attempts = 0;
                    self.begin_connect(&token);
                }
            }
        }
    }

    /// Drains pending timer signals and transport events.
    ///
    /// Must be called from the owner context; everything the session does
    /// asynchronously funnels through here.
    pub fn pump(&mut self) {
        while let Ok(signal) = self.signal_rx.try_recv() {
            self.handle_signal(signal);
        }
        while let Some(event) = self.transport.poll() {
            self.handle_transport_event(event);
        }
    }

    fn begin_connect(&mut self, token: &str) {
        if !self.state.is_retryable() {
            tracing::warn!(state = ?self.state, "connect ignored; handshake already in progress or established");
            return;
        }
        self.token = Some(token.to_string());
        self.close_requested = false;
        self.transition(ConnectionState::Connecting);

        // The bearer value travels twice: once on the transport upgrade,
        // once in the protocol-level connect frame. The broker checks both.
        let bearer = format!("Bearer {token}");
        let request = HandshakeRequest {
            endpoint: self.config.endpoint.clone(),
            headers: vec![
                ("Authorization".to_string(), bearer.clone()),
                (
                    "Sec-WebSocket-Protocol".to_string(),
                    self.config.subprotocol.clone(),
                ),
            ],
        };
        if let Err(e) = self.transport.open(&request) {
            self.fail_connection(e.to_string());
            return;
        }

        let connect = ClientFrame::Connect {
            headers: vec![
                (
                    "accept-version".to_string(),
                    self.config.accept_versions.clone(),
                ),
                ("host".to_string(), self.config.vhost.clone()),
                ("heart-beat".to_string(), self.config.heartbeat_header()),
                ("Authorization".to_string(), bearer),
            ],
        };
        if let Err(e) = self.transport.send(&connect) {
            self.transport.close();
            self.fail_connection(e.to_string());
        }
    }

    fn handle_signal(&mut self, signal: SessionSignal) {
        match signal {
            SessionSignal::ReconnectDue => {
                self.reconnect_timer = None;
                // State may have moved on since the timer was armed.
                if !self.state.is_retryable() {
                    self.attempts = 0;
                    return;
                }
                match self.token.clone() {
                    Some(token) => {
                        tracing::debug!(attempt = self.attempts, "reconnect timer fired");
                        self.begin_connect(&token);
                    }
                    None => {
                        // No credential left to retry with; stop here
                        // instead of looping.
                        self.attempts = 0;
                        self.transition(ConnectionState::Error(
                            crate::error::ChatError::MissingCredential.to_string(),
                        ));
                    }
                }
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::HandshakeAck => {
                self.attempts = 0;
                self.reconnect_timer = None;
                self.transition(ConnectionState::Connected);
                self.subscribe();
                self.flush_outbound();
            }
            TransportEvent::Frame(frame) => match codec::decode(&frame) {
                Ok(message) => {
                    self.events.dispatch(ChatEvent::MessageReceived { message });
                }
                Err(e) => {
                    tracing::warn!(
                        destination = %frame.destination,
                        frame_id = %frame.message_id,
                        error = %e,
                        "dropping undecodable inbound frame"
                    );
                }
            },
            TransportEvent::Closed { clean } => {
                self.subscription.clear();
                self.transition(ConnectionState::Disconnected);
                if !clean && !self.close_requested {
                    self.arm_reconnect();
                }
            }
            TransportEvent::Failed(detail) => {
                self.transport.close();
                self.fail_connection(detail);
            }
        }
    }

    /// Routes a transport failure into the error state and schedules retry.
    fn fail_connection(&mut self, detail: String) {
        self.subscription.clear();
        self.transition(ConnectionState::Error(detail));
        self.arm_reconnect();
    }

    fn subscribe(&mut self) {
        match self.subscription.begin() {
            Some(id) => {
                let frame = ClientFrame::Subscribe {
                    id,
                    destination: self.config.inbox_destination.clone(),
                };
                if let Err(e) = self.transport.send(&frame) {
                    tracing::error!(error = %e, "failed to send subscribe frame");
                }
            }
            None => tracing::debug!("subscription already active for this connection"),
        }
    }

    fn flush_outbound(&mut self) {
        let pending = self.outbound.drain();
        if pending.is_empty() {
            return;
        }
        tracing::debug!(count = pending.len(), "flushing queued outbound messages");
        for message in pending {
            self.transmit(message);
        }
    }

    fn transmit(&mut self, message: ChatMessage) {
        let body = match codec::encode(&message) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "dropping outbound message that failed to encode");
                return;
            }
        };
        let frame = ClientFrame::Send {
            destination: self.config.send_destination.clone(),
            content_type: "application/json".to_string(),
            body,
        };
        if let Err(e) = self.transport.send(&frame) {
            tracing::error!(error = %e, "failed to hand message to transport");
        }
    }

    fn arm_reconnect(&mut self) {
        if self.reconnect_timer.is_some() {
            tracing::debug!("reconnect timer already armed");
            return;
        }
        if self.policy.is_exhausted(self.attempts) {
            tracing::warn!(attempts = self.attempts, "giving up on automatic reconnection");
            self.transition(ConnectionState::Error(RETRY_EXHAUSTED_DETAIL.to_string()));
            return;
        }
        let delay = self.policy.delay_for(self.attempts);
        tracing::debug!(attempt = self.attempts, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        self.attempts += 1;
        self.reconnect_timer = Some(ScheduledSignal::arm(
            delay,
            self.signal_tx.clone(),
            SessionSignal::ReconnectDue,
        ));
    }

    /// Applies a state transition and publishes it. Consecutive duplicates
    /// are collapsed so consumers see each state exactly once.
    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        self.state = next.clone();
        self.events
            .dispatch(ChatEvent::ConnectionStateChanged { state: next });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::events::{CallbackHandler, EventHandler};
    use crate::mock::MockTransport;
    use crate::transport::{FramePayload, InboundFrame};
    use std::sync::Mutex;

    fn create_test_config() -> BrokerConfig {
        BrokerConfig {
            endpoint: "wss://chat.servio.test/ws".into(),
            ..Default::default()
        }
    }

    fn collecting_dispatcher() -> (Arc<EventDispatcher>, Arc<Mutex<Vec<ChatEvent>>>) {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = collected.clone();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_handler(Arc::new(CallbackHandler::new(move |event| {
            sink.lock().unwrap().push(event);
        })));
        (Arc::new(dispatcher), collected)
    }

    fn create_session(auto_ack: bool) -> (ChatSession<MockTransport>, Arc<Mutex<Vec<ChatEvent>>>) {
        let mut transport = MockTransport::new();
        transport.set_auto_ack(auto_ack);
        let (events, collected) = collecting_dispatcher();
        let session = ChatSession::new(transport, create_test_config(), events)
            .with_policy(ReconnectPolicy::new(1, 4, 0, 5));
        (session, collected)
    }

    fn states(collected: &Arc<Mutex<Vec<ChatEvent>>>) -> Vec<ConnectionState> {
        collected
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                ChatEvent::ConnectionStateChanged { state } => Some(state.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_sends_both_header_sets() {
        let (mut session, _) = create_session(false);
        session.connect("tok-1");

        let handshakes = session.transport().handshakes();
        assert_eq!(handshakes.len(), 1);
        assert!(handshakes[0]
            .headers
            .contains(&("Authorization".into(), "Bearer tok-1".into())));
        assert!(handshakes[0]
            .headers
            .contains(&("Sec-WebSocket-Protocol".into(), "v12.stomp".into())));

        let sent = session.transport().sent_frames();
        assert_eq!(sent.len(), 1);
        if let ClientFrame::Connect { headers } = &sent[0] {
            assert!(headers.contains(&("Authorization".into(), "Bearer tok-1".into())));
            assert!(headers.contains(&("host".into(), "servio".into())));
            assert!(headers.contains(&("accept-version".into(), "1.1,1.2".into())));
            assert!(headers.contains(&("heart-beat".into(), "10000,10000".into())));
        } else {
            panic!("Expected connect frame");
        }
        assert_eq!(*session.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_double_connect_is_single_handshake() {
        let (mut session, _) = create_session(false);
        session.connect("tok");
        session.connect("tok");
        assert_eq!(session.transport().handshakes().len(), 1);
        assert_eq!(session.transport().sent_frames().len(), 1);
    }

    #[test]
    fn test_connect_while_connected_keeps_existing_credential() {
        let store = Arc::new(MemoryCredentialStore::new());
        let (events, _) = collecting_dispatcher();
        let mut transport = MockTransport::new();
        transport.set_auto_ack(true);
        let mut session = ChatSession::new(transport, create_test_config(), events)
            .with_policy(ReconnectPolicy::new(1, 4, 0, 5))
            .with_credentials(store.clone());

        session.connect("token-a");
        session.pump();
        assert!(session.is_connected());

        // A connect while established must leave no trace anywhere.
        session.connect("token-b");
        assert_eq!(
            store.get_token(CHAT_TOKEN_SERVICE),
            Some("token-a".to_string())
        );
        assert_eq!(session.transport().handshakes().len(), 1);

        // The automatic reconnect after a drop still uses the original token.
        session
            .transport_mut()
            .push_event(TransportEvent::Closed { clean: false });
        session.pump();
        session.handle_signal(SessionSignal::ReconnectDue);
        let handshakes = session.transport().handshakes();
        assert_eq!(handshakes.len(), 2);
        assert!(handshakes[1]
            .headers
            .contains(&("Authorization".into(), "Bearer token-a".into())));
    }

    #[test]
    fn test_persistent_disconnect_preserves_retry_state() {
        let (mut session, _) = create_session(true);
        session.connect("tok");
        session.pump();
        session
            .transport_mut()
            .push_event(TransportEvent::Closed { clean: false });
        session.pump();
        assert!(session.is_reconnect_armed());
        assert_eq!(session.reconnect_attempts(), 1);

        session.disconnect(true);
        assert_eq!(*session.state(), ConnectionState::Disconnected);
        assert!(!session.transport().is_open());
        assert!(session.is_reconnect_armed());
        assert_eq!(session.reconnect_attempts(), 1);

        // The surviving timer still drives a reconnect.
        session.handle_signal(SessionSignal::ReconnectDue);
        assert_eq!(session.transport().handshakes().len(), 2);
        session.pump();
        assert!(session.is_connected());
    }

    #[test]
    fn test_handshake_ack_connects_subscribes_and_resets_counter() {
        let (mut session, collected) = create_session(true);
        session.connect("tok");
        session.pump();

        assert!(session.is_connected());
        assert_eq!(session.reconnect_attempts(), 0);
        assert!(session.subscription_id().is_some());

        let sent = session.transport().sent_frames();
        assert!(matches!(sent[1], ClientFrame::Subscribe { .. }));
        assert_eq!(
            states(&collected),
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
    }

    #[test]
    fn test_offline_messages_flush_in_order_after_subscribe() {
        let (mut session, _) = create_session(false);
        session.send_message(ChatMessage::provisional(1, 2, 3, "a"));
        session.send_message(ChatMessage::provisional(1, 2, 3, "b"));
        session.send_message(ChatMessage::provisional(1, 2, 3, "c"));
        assert_eq!(session.queued_count(), 3);

        session.connect("tok");
        session.transport_mut().push_event(TransportEvent::HandshakeAck);
        session.pump();

        assert_eq!(session.queued_count(), 0);
        let sent = session.transport().sent_frames();
        assert!(matches!(sent[0], ClientFrame::Connect { .. }));
        assert!(matches!(sent[1], ClientFrame::Subscribe { .. }));
        let bodies: Vec<String> = sent[2..]
            .iter()
            .map(|frame| match frame {
                ClientFrame::Send { body, .. } => {
                    serde_json::from_str::<ChatMessage>(body).unwrap().content
                }
                other => panic!("unexpected frame {other:?}"),
            })
            .collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_subscription_ids_differ_across_connections() {
        let (mut session, _) = create_session(true);
        session.connect("tok");
        session.pump();
        let first = session.subscription_id().unwrap().to_string();

        session.disconnect(false);
        assert!(session.subscription_id().is_none());

        session.connect("tok");
        session.pump();
        let second = session.subscription_id().unwrap().to_string();
        assert_ne!(first, second);

        let subscribes = session
            .transport()
            .sent_frames()
            .iter()
            .filter(|frame| matches!(frame, ClientFrame::Subscribe { .. }))
            .count();
        assert_eq!(subscribes, 2);
    }

    #[test]
    fn test_inbound_frame_dispatches_decoded_message() {
        let (mut session, collected) = create_session(true);
        session.connect("tok");

        let message = ChatMessage::provisional(9, 3, 2, "quote ready");
        let body = codec::encode(&message).unwrap();
        session.transport_mut().push_event(TransportEvent::Frame(InboundFrame {
            destination: "/user/queue/messages".into(),
            message_id: "m-1".into(),
            payload: FramePayload::Text(body),
        }));
        session.pump();

        let received: Vec<ChatMessage> = collected
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                ChatEvent::MessageReceived { message } => Some(message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(received, vec![message]);
    }

    #[test]
    fn test_malformed_frames_are_dropped_without_state_change() {
        let (mut session, collected) = create_session(true);
        session.connect("tok");
        session.pump();
        let state_before = session.state().clone();
        let events_before = collected.lock().unwrap().len();

        session.transport_mut().push_event(TransportEvent::Frame(InboundFrame {
            destination: "/user/queue/messages".into(),
            message_id: "m-bad".into(),
            payload: FramePayload::Binary(vec![0xff, 0xfe]),
        }));
        session.transport_mut().push_event(TransportEvent::Frame(InboundFrame {
            destination: "/user/queue/messages".into(),
            message_id: "m-bad2".into(),
            payload: FramePayload::Text("{\"id\": oops".into()),
        }));
        session.pump();

        assert_eq!(*session.state(), state_before);
        assert_eq!(collected.lock().unwrap().len(), events_before);
    }

    #[test]
    fn test_unclean_close_arms_reconnect() {
        let (mut session, _) = create_session(true);
        session.connect("tok");
        session.pump();

        session
            .transport_mut()
            .push_event(TransportEvent::Closed { clean: false });
        session.pump();

        assert_eq!(*session.state(), ConnectionState::Disconnected);
        assert!(session.is_reconnect_armed());
        assert_eq!(session.reconnect_attempts(), 1);
    }

    #[test]
    fn test_requested_disconnect_does_not_reconnect() {
        let (mut session, _) = create_session(true);
        session.connect("tok");
        session.pump();

        session.disconnect(false);
        session
            .transport_mut()
            .push_event(TransportEvent::Closed { clean: false });
        session.pump();

        assert_eq!(*session.state(), ConnectionState::Disconnected);
        assert!(!session.is_reconnect_armed());
        assert_eq!(session.reconnect_attempts(), 0);
        // Credential survives a plain disconnect.
        assert!(session.has_credential());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut session, _) = create_session(true);
        session.disconnect(false);
        session.disconnect(false);
        assert_eq!(*session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_transport_error_enters_error_state_and_arms_retry() {
        let (mut session, _) = create_session(true);
        session.connect("tok");
        session.pump();

        session
            .transport_mut()
            .push_event(TransportEvent::Failed("broker went away".into()));
        session.pump();

        assert_eq!(
            *session.state(),
            ConnectionState::Error("broker went away".into())
        );
        assert!(session.is_reconnect_armed());
    }

    #[test]
    fn test_retries_exhaust_into_terminal_error() {
        let (mut session, _) = create_session(false);
        session = session.with_policy(ReconnectPolicy::new(1, 4, 0, 2));
        session.transport_mut().set_fail_opens(true);

        session.connect("tok");
        assert!(matches!(session.state(), ConnectionState::Error(_)));
        assert_eq!(session.reconnect_attempts(), 1);

        // Drive the timer deterministically.
        session.handle_signal(SessionSignal::ReconnectDue);
        assert_eq!(session.reconnect_attempts(), 2);
        assert!(session.is_reconnect_armed());

        session.handle_signal(SessionSignal::ReconnectDue);
        assert_eq!(
            *session.state(),
            ConnectionState::Error(RETRY_EXHAUSTED_DETAIL.into())
        );
        assert!(!session.is_reconnect_armed());

        // Explicit connect recovers once the transport does.
        session.transport_mut().set_fail_opens(false);
        session.transport_mut().set_auto_ack(true);
        session.connect("tok");
        session.pump();
        assert!(session.is_connected());
    }

    #[test]
    fn test_timer_fire_without_credential_aborts_into_error() {
        let (mut session, _) = create_session(false);
        session.transport_mut().set_fail_opens(true);
        session.connect("tok");
        session.token = None;

        session.handle_signal(SessionSignal::ReconnectDue);
        assert_eq!(session.reconnect_attempts(), 0);
        assert!(!session.is_reconnect_armed());
        assert_eq!(session.transport().handshakes().len(), 0);
        assert_eq!(
            *session.state(),
            ConnectionState::Error("No credential available".into())
        );
    }

    #[test]
    fn test_background_disconnects_without_retry() {
        let (mut session, _) = create_session(true);
        session.connect("tok");
        session.pump();
        assert!(session.is_connected());

        session.handle_lifecycle(LifecycleEvent::EnteredBackground);
        assert_eq!(*session.state(), ConnectionState::Disconnected);
        assert!(!session.is_reconnect_armed());
    }

    #[test]
    fn test_foreground_reconnects_immediately_with_cached_token() {
        let (mut session, _) = create_session(true);
        session.connect("tok");
        session.pump();
        session.handle_lifecycle(LifecycleEvent::EnteredBackground);

        session.handle_lifecycle(LifecycleEvent::BecameActive);
        assert_eq!(*session.state(), ConnectionState::Connecting);
        assert_eq!(session.reconnect_attempts(), 0);
        assert_eq!(session.transport().handshakes().len(), 2);

        session.pump();
        assert!(session.is_connected());
    }

    #[test]
    fn test_foreground_without_credential_stays_disconnected() {
        let (mut session, _) = create_session(true);
        session.handle_lifecycle(LifecycleEvent::BecameActive);
        assert_eq!(*session.state(), ConnectionState::Disconnected);
        assert_eq!(session.transport().handshakes().len(), 0);
    }

    #[test]
    fn test_log_out_clears_credential_and_store() {
        let store = Arc::new(MemoryCredentialStore::new());
        let (events, _) = collecting_dispatcher();
        let mut transport = MockTransport::new();
        transport.set_auto_ack(true);
        let mut session = ChatSession::new(transport, create_test_config(), events)
            .with_credentials(store.clone());

        session.connect("tok");
        assert_eq!(store.get_token(CHAT_TOKEN_SERVICE), Some("tok".into()));

        session.log_out();
        assert!(!session.has_credential());
        assert_eq!(store.get_token(CHAT_TOKEN_SERVICE), None);
        assert_eq!(*session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_from_store() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.save_token(CHAT_TOKEN_SERVICE, "saved-tok");
        let (events, _) = collecting_dispatcher();
        let mut transport = MockTransport::new();
        transport.set_auto_ack(true);
        let mut session = ChatSession::new(transport, create_test_config(), events)
            .with_credentials(store);

        session.connect_from_store().unwrap();
        session.pump();
        assert!(session.is_connected());
        assert!(session.transport().handshakes()[0]
            .headers
            .contains(&("Authorization".into(), "Bearer saved-tok".into())));
    }

    #[test]
    fn test_connect_from_store_without_token_fails() {
        let (events, _) = collecting_dispatcher();
        let mut session =
            ChatSession::new(MockTransport::new(), create_test_config(), events)
                .with_credentials(Arc::new(MemoryCredentialStore::new()));
        assert!(matches!(
            session.connect_from_store(),
            Err(crate::error::ChatError::MissingCredential)
        ));
    }

    #[test]
    fn test_state_transitions_are_deduplicated() {
        let (mut session, collected) = create_session(true);
        session.disconnect(false); // Already disconnected: no event.
        session.connect("tok");
        session.pump();
        session.disconnect(false);
        session.disconnect(false);

        assert_eq!(
            states(&collected),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected,
            ]
        );
    }
}
