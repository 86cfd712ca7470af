// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Lifecycle Bridge
//!
//! Host application foreground/background notifications. The root
//! composition forwards these into [`crate::session::ChatSession::handle_lifecycle`]:
//! backgrounding tears the connection down without scheduling reconnection,
//! becoming active reconnects immediately when a credential is cached.

/// Host application lifecycle transitions relevant to the chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The application moved to the background.
    EnteredBackground,
    /// The application became active in the foreground.
    BecameActive,
}
