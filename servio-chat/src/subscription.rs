// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Subscription Manager
//!
//! Tracks the single logical subscription to the user's private message
//! queue. A subscription id is valid for exactly one connection: it is
//! generated fresh after each handshake and cleared on every disconnect.

use uuid::Uuid;

/// Tracks the at-most-one active subscription for the current connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    active: Option<String>,
}

impl SubscriptionManager {
    /// Creates a manager with no active subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a subscription for the current connection.
    ///
    /// Returns the freshly generated id, or `None` if a subscription is
    /// already recorded (the second attempt is a no-op).
    pub fn begin(&mut self) -> Option<String> {
        if self.active.is_some() {
            return None;
        }
        let id = Uuid::new_v4().to_string();
        self.active = Some(id.clone());
        Some(id)
    }

    /// Returns the active subscription id, if any.
    pub fn id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Returns true while a subscription is recorded.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Invalidates the subscription. Called on every disconnect; the next
    /// connection must subscribe anew.
    pub fn clear(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_idempotent_within_a_connection() {
        let mut manager = SubscriptionManager::new();
        let first = manager.begin();
        assert!(first.is_some());
        assert!(manager.begin().is_none());
        assert_eq!(manager.id(), first.as_deref());
    }

    #[test]
    fn test_ids_differ_across_connections() {
        let mut manager = SubscriptionManager::new();
        let first = manager.begin().unwrap();
        manager.clear();
        assert!(!manager.is_active());
        let second = manager.begin().unwrap();
        assert_ne!(first, second);
    }
}
