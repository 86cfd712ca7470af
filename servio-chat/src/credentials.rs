//! Credential Store
//!
//! Interface to the host platform's persisted-credential storage. The chat
//! core only reads and deletes the bearer token it connects with; saving
//! happens when the session layer hands a fresh token to `connect`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Service key under which the chat bearer token is stored.
pub const CHAT_TOKEN_SERVICE: &str = "servio.chat";

/// Persisted-credential storage, supplied by the host platform.
pub trait CredentialStore: Send + Sync {
    /// Returns the token stored for a service, if any.
    fn get_token(&self, service: &str) -> Option<String>;

    /// Stores a token for a service, replacing any previous value.
    fn save_token(&self, service: &str, token: &str);

    /// Removes the token stored for a service.
    fn delete_token(&self, service: &str);
}

/// In-memory credential store for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_token(&self, service: &str) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service)
            .cloned()
    }

    fn save_token(&self, service: &str, token: &str) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(service.to_string(), token.to_string());
    }

    fn delete_token(&self, service: &str) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(service);
    }
}
