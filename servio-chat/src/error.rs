//! Chat Error Types
//!
//! Error types for the chat session core and its transports.

use thiserror::Error;

/// Errors produced by the chat session core.
#[derive(Error, Debug, Clone)]
pub enum ChatError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport not connected")]
    NotConnected,

    #[error("Frame send failed: {0}")]
    SendFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("No credential available")]
    MissingCredential,
}
