// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Completion signal with a lock-free ready flag.
//!
//! Pairs an atomic flag with a condvar: posting is a plain atomic store
//! unless a waiter is parked, and a post that lands before the wait starts
//! is never lost. Used for packet-completion handoff between I/O
//! completion paths and a writer blocked in a strict send.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct WakeSignal {
    ready: AtomicBool,
    /// Guards the parked flag; only locked when a waiter sleeps.
    parked: Mutex<bool>,
    condvar: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            parked: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Post the signal. Cheap when nobody waits; wakes the waiter if one
    /// is parked. The parked check is racy, which at worst costs an extra
    /// notify.
    pub fn notify(&self) {
        self.ready.store(true, Ordering::Release);
        if *self.parked.lock() {
            self.condvar.notify_all();
        }
    }

    /// Consume a pending post, if any, without blocking.
    pub fn check_and_clear(&self) -> bool {
        self.ready.swap(false, Ordering::Acquire)
    }

    /// Block until posted. Consumes the post.
    pub fn wait(&self) {
        if self.ready.swap(false, Ordering::Acquire) {
            return;
        }
        let mut parked = self.parked.lock();
        *parked = true;
        while !self.ready.swap(false, Ordering::Acquire) {
            self.condvar.wait(&mut parked);
        }
        *parked = false;
    }

    /// Block until posted or `timeout` elapses. True when posted.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.ready.swap(false, Ordering::Acquire) {
            return true;
        }
        let deadline = std::time::Instant::now() + timeout;
        let mut parked = self.parked.lock();
        *parked = true;
        let posted = loop {
            if self.ready.swap(false, Ordering::Acquire) {
                break true;
            }
            if self.condvar.wait_until(&mut parked, deadline).timed_out() {
                break self.ready.swap(false, Ordering::Acquire);
            }
        };
        *parked = false;
        posted
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_pre_posted_signal_returns_immediately() {
        let signal = WakeSignal::new();
        signal.notify();
        let start = std::time::Instant::now();
        assert!(signal.wait_timeout(Duration::from_secs(1)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_post_is_consumed_once() {
        let signal = WakeSignal::new();
        signal.notify();
        assert!(signal.check_and_clear());
        assert!(!signal.check_and_clear());
    }

    #[test]
    fn test_notify_wakes_parked_waiter() {
        let signal = WakeSignal::shared();
        let remote = Arc::clone(&signal);
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.notify();
        });
        assert!(signal.wait_timeout(Duration::from_secs(5)));
        waker.join().expect("waker thread");
    }

    #[test]
    fn test_timeout_without_post() {
        let signal = WakeSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_untimed_wait() {
        let signal = WakeSignal::shared();
        let remote = Arc::clone(&signal);
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.notify();
        });
        signal.wait();
        waker.join().expect("waker thread");
    }
}
