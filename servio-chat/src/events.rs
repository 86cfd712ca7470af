// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Callbacks for chat session events. Chat view-models register handlers at
//! composition time and receive connection state changes and decoded
//! inbound messages.

use std::sync::Arc;

use crate::message::ChatMessage;
use crate::session::ConnectionState;

/// Events emitted by the chat session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// The connection state changed.
    ConnectionStateChanged {
        /// The new connection state.
        state: ConnectionState,
    },

    /// A decoded message arrived on the private queue.
    MessageReceived {
        /// The decoded message.
        message: ChatMessage,
    },
}

/// Event handler trait.
///
/// Implement this trait to receive chat session events.
pub trait EventHandler: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: ChatEvent);
}

/// Simple callback-based event handler.
pub struct CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(ChatEvent) + Send + Sync,
{
    fn on_event(&self, event: ChatEvent) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }

    /// Adds an event handler.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: ChatEvent) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callback_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let handler = CallbackHandler::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        handler.on_event(ChatEvent::ConnectionStateChanged {
            state: ConnectionState::Connecting,
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatcher_reaches_all_handlers() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = EventDispatcher::new();

        for _ in 0..3 {
            let count_clone = count.clone();
            dispatcher.add_handler(Arc::new(CallbackHandler::new(move |_| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })));
        }
        assert_eq!(dispatcher.handler_count(), 3);

        dispatcher.dispatch(ChatEvent::ConnectionStateChanged {
            state: ConnectionState::Connected,
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_message_event_carries_payload() {
        let event = ChatEvent::MessageReceived {
            message: crate::message::ChatMessage::provisional(1, 2, 3, "hello"),
        };

        if let ChatEvent::MessageReceived { message } = event {
            assert_eq!(message.content, "hello");
        } else {
            panic!("Expected MessageReceived event");
        }
    }
}
