// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Servio Chat Core
//!
//! Client-side session layer for the Servio marketplace chat: one broker
//! connection per app, automatic reconnection with exponential backoff,
//! offline queueing, and host lifecycle integration.
//!
//! # Architecture
//!
//! - **Transport trait**: Platform-agnostic interface for the socket
//! - **Wire frames**: Text framing spoken with the broker
//! - **Codec**: JSON message bodies
//! - **Session**: Connection state machine, subscription, queue, backoff
//! - **Events**: Callbacks into the hosting UI layer
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use servio_chat::{
//!     BrokerConfig, CallbackHandler, ChatSession, EventDispatcher, WebSocketTransport,
//! };
//!
//! let config = BrokerConfig::new("wss://chat.servio.app/ws")?;
//! let mut dispatcher = EventDispatcher::new();
//! dispatcher.add_handler(Arc::new(CallbackHandler::new(|event| {
//!     println!("{event:?}");
//! })));
//!
//! let transport = WebSocketTransport::from_config(&config);
//! let mut session = ChatSession::new(transport, config, Arc::new(dispatcher));
//! session.connect(&bearer_token);
//! loop { session.pump(); }
//! ```

pub mod backoff;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod message;
pub mod mock;
pub mod queue;
pub mod session;
pub mod subscription;
mod timer;
pub mod transport;
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub mod websocket;
pub mod wire;

pub use backoff::ReconnectPolicy;
pub use codec::{decode, encode};
pub use config::BrokerConfig;
pub use credentials::{CredentialStore, MemoryCredentialStore, CHAT_TOKEN_SERVICE};
pub use error::ChatError;
pub use events::{CallbackHandler, ChatEvent, EventDispatcher, EventHandler};
pub use lifecycle::LifecycleEvent;
pub use message::{BookingProposal, ChatMessage, MessageId};
pub use mock::MockTransport;
pub use queue::OutboundQueue;
pub use session::{ChatSession, ConnectionState, RETRY_EXHAUSTED_DETAIL};
pub use subscription::SubscriptionManager;
pub use transport::{FramePayload, HandshakeRequest, InboundFrame, Transport, TransportEvent};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use websocket::WebSocketTransport;
pub use wire::{ClientFrame, ServerFrame};
