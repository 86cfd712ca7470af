// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconnection Policy
//!
//! Capped exponential backoff with random jitter. The constants mirror the
//! deployed client behavior (1s base, 30s cap, 0.5s jitter, 5 attempts) and
//! are tunable through [`ReconnectPolicy::new`].

use std::time::Duration;

use rand::Rng;

/// Computes retry delays and the attempt ceiling.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_ms: u64,
    max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(1_000, 30_000, 500, 5)
    }
}

impl ReconnectPolicy {
    /// Creates a policy with custom constants.
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, jitter_ms: u64, max_attempts: u32) -> Self {
        ReconnectPolicy {
            base_delay_ms,
            max_delay_ms,
            jitter_ms,
            max_attempts,
        }
    }

    /// Returns the attempt ceiling.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true once the attempt counter has reached the ceiling.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Deterministic part of the delay: `min(cap, base * 2^attempt)`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.min(20);
        let scaled = self.base_delay_ms.saturating_mul(1_u64 << shift);
        Duration::from_millis(scaled.min(self.max_delay_ms))
    }

    /// Full delay for an attempt, including random jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        self.base_delay(attempt) + Duration::from_millis(jitter)
    }
}
