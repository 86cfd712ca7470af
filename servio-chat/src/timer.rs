// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Scheduled Signal
//!
//! A cancellable one-shot timer that delivers a signal through a channel
//! instead of invoking a callback, so the receiving side stays on its own
//! context. Dropping the handle cancels the timer.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Handle to an armed one-shot timer.
pub struct ScheduledSignal {
    cancel_tx: Sender<()>,
}

impl ScheduledSignal {
    /// Arms a timer that sends `signal` into `sink` after `delay`, unless
    /// cancelled first.
    pub fn arm<T: Send + 'static>(delay: Duration, sink: Sender<T>, signal: T) -> Self {
        let (cancel_tx, cancel_rx) = mpsc::channel();
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(delay) {
                // Receiver may be gone; a missed signal is fine then.
                let _ = sink.send(signal);
            }
        });
        ScheduledSignal { cancel_tx }
    }
}

impl Drop for ScheduledSignal {
    fn drop(&mut self) {
        // Fails when the timer already fired and the thread exited.
        let _ = self.cancel_tx.send(());
    }
}
