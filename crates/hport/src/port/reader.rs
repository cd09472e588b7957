// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inbound buffer: queue/poll, blocking read, push callbacks.
//!
//! One logical reader per port. Network threads hand objects in through
//! the buffer's [`ObjectSink`]; the application either pulls them with
//! [`PortReaderBuffer::read`] or registers a [`ReadCallback`] and gets
//! them pushed on the delivering thread.
//!
//! # Delivery modes
//!
//! ```text
//! lossy (default)   only the newest undelivered object is kept;
//!                   superseded ones are recycled silently
//! strict            nothing is dropped; the queue may grow, or, with a
//!                   max_buffer cap, the producer blocks when it is full
//! callback          arrivals bypass the queue and run on_read inline,
//!                   serialized, in arrival order
//! ```
//!
//! Backing slots are `Box<T>` recycled through a spare list, so a steady
//! stream reuses the same few allocations.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;

use super::{Error, ObjectSink, Port, Result};
use crate::config::{RuntimeConfig, DEFAULT_MAX_BUFFER, DEFAULT_SPARE_LIMIT};

/// Push-mode consumer. Invoked on the delivering (network or dispatcher)
/// thread; a slow implementation backpressures that connection only.
pub trait ReadCallback<T>: Send + Sync {
    fn on_read(&self, obj: T);
}

impl<T, F> ReadCallback<T> for F
where
    F: Fn(T) + Send + Sync,
{
    fn on_read(&self, obj: T) {
        self(obj);
    }
}

struct Entry<T> {
    value: Box<T>,
    envelope: Option<String>,
}

struct ReaderState<T> {
    queue: VecDeque<Entry<T>>,
    spares: Vec<Box<T>>,
    strict: bool,
    max_buffer: usize,
    spare_limit: usize,
    callback: Option<Arc<dyn ReadCallback<T>>>,
    closed: bool,
    attached: bool,
    /// Readers currently parked in a blocking read.
    waiting: usize,
    interrupted: bool,
    last_envelope: Option<String>,
    dropped: u64,
}

struct ReaderShared<T> {
    state: Mutex<ReaderState<T>>,
    /// Signaled on arrival, interrupt and close.
    content: Condvar,
    /// Signaled when a bounded strict queue frees a slot.
    space: Condvar,
    /// Held for the duration of each callback invocation.
    dispatch: Mutex<()>,
}

impl<T> ReaderShared<T> {
    fn recycle(&self, slot: Box<T>) {
        let mut state = self.state.lock();
        if state.spares.len() < state.spare_limit {
            state.spares.push(slot);
        }
    }
}

impl<T: Send + 'static> ObjectSink<T> for ReaderShared<T> {
    fn deliver(&self, obj: T, envelope: Option<String>) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }

        // Push mode: run the callback on this thread, serialized, without
        // holding the state lock (the callback may well call back in).
        if let Some(callback) = state.callback.clone() {
            state.last_envelope = envelope;
            drop(state);
            let _serial = self.dispatch.lock();
            callback.on_read(obj);
            return true;
        }

        if !state.strict {
            // Newest-only: superseded objects go straight back to the
            // spare list. Deliberate lossy-channel semantics, not an error.
            while let Some(old) = state.queue.pop_front() {
                state.dropped += 1;
                if state.spares.len() < state.spare_limit {
                    state.spares.push(old.value);
                }
            }
        } else if state.max_buffer > 0 {
            while state.queue.len() >= state.max_buffer && !state.closed {
                self.space.wait(&mut state);
            }
            if state.closed {
                return false;
            }
        }

        let value = match state.spares.pop() {
            Some(mut slot) => {
                *slot = obj;
                slot
            }
            None => Box::new(obj),
        };
        state.queue.push_back(Entry { value, envelope });
        self.content.notify_one();
        true
    }

    fn port_closed(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.content.notify_all();
        self.space.notify_all();
    }
}

/// One read object, valid until dropped.
///
/// Dropping a sample recycles its backing slot into the buffer's spare
/// list. [`Sample::acquire`] takes the object out instead; the caller
/// then owns it and should eventually hand the box back through
/// [`PortReaderBuffer::release`] — unreturned boxes just shrink the
/// recycle pool, they are not tracked.
pub struct Sample<'a, T> {
    value: Option<Box<T>>,
    envelope: Option<String>,
    shared: &'a ReaderShared<T>,
}

impl<T> Sample<'_, T> {
    /// Envelope delivered alongside the object, if any.
    pub fn envelope(&self) -> Option<&str> {
        self.envelope.as_deref()
    }

    /// Take ownership of the object beyond the sample's lifetime.
    pub fn acquire(mut self) -> Box<T> {
        self.value
            .take()
            .expect("sample value present until drop or acquire")
    }
}

impl<T> Deref for Sample<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
            .as_deref()
            .expect("sample value present until drop or acquire")
    }
}

impl<T> Drop for Sample<'_, T> {
    fn drop(&mut self) {
        if let Some(slot) = self.value.take() {
            self.shared.recycle(slot);
        }
    }
}

/// Per-port inbound buffer decoupling network threads from the reader.
pub struct PortReaderBuffer<T> {
    shared: Arc<ReaderShared<T>>,
}

impl<T: Send + 'static> PortReaderBuffer<T> {
    /// Unbounded buffer in lossy (newest-only) mode.
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    /// Buffer tuned from a [`RuntimeConfig`].
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let buffer = Self::with_max_buffer(config.max_buffer());
        buffer.shared.state.lock().spare_limit = config.spare_limit();
        buffer
    }

    /// Buffer whose strict-mode queue is capped at `max_buffer` objects
    /// (0 = unbounded). A producer delivering to a full bounded queue
    /// blocks until the reader frees a slot.
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            shared: Arc::new(ReaderShared {
                state: Mutex::new(ReaderState {
                    queue: VecDeque::new(),
                    spares: Vec::new(),
                    strict: false,
                    max_buffer,
                    spare_limit: DEFAULT_SPARE_LIMIT,
                    callback: None,
                    closed: false,
                    attached: false,
                    waiting: 0,
                    interrupted: false,
                    last_envelope: None,
                    dropped: 0,
                }),
                content: Condvar::new(),
                space: Condvar::new(),
                dispatch: Mutex::new(()),
            }),
        }
    }

    /// Register this buffer as the port's delivery target.
    pub fn attach(&self, port: &dyn Port<T>) -> Result<()>
    where
        T: Default + Clone,
    {
        {
            let mut state = self.shared.state.lock();
            if state.attached {
                return Err(Error::AlreadyAttached);
            }
            state.attached = true;
        }
        port.set_reader(self.sink());
        Ok(())
    }

    /// The sink network threads deliver through; also usable directly
    /// when wiring a custom port implementation.
    pub fn sink(&self) -> Arc<dyn ObjectSink<T>> {
        Arc::clone(&self.shared) as Arc<dyn ObjectSink<T>>
    }

    /// Strict keeps everything (the queue may grow); lossy keeps only the
    /// newest undelivered object. Lossy is the default.
    pub fn set_strict(&self, strict: bool) {
        self.shared.state.lock().strict = strict;
    }

    /// Dequeue the next object.
    ///
    /// With `wait`, blocks until an object arrives, [`Self::interrupt`] is
    /// called, or the port closes — the latter two return `None`. Without
    /// `wait`, returns `None` immediately when the queue is empty.
    pub fn read(&self, wait: bool) -> Option<Sample<'_, T>> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(entry) = state.queue.pop_front() {
                state.last_envelope = entry.envelope.clone();
                if state.strict && state.max_buffer > 0 {
                    self.shared.space.notify_one();
                }
                drop(state);
                return Some(Sample {
                    value: Some(entry.value),
                    envelope: entry.envelope,
                    shared: &self.shared,
                });
            }
            if state.closed || !wait {
                return None;
            }
            state.waiting += 1;
            self.shared.content.wait(&mut state);
            state.waiting -= 1;
            if state.interrupted {
                state.interrupted = false;
                return None;
            }
        }
    }

    /// Hand back a box taken out with [`Sample::acquire`] so its
    /// allocation can be reused.
    pub fn release(&self, slot: Box<T>) {
        self.shared.recycle(slot);
    }

    /// Switch to push mode: every subsequent arrival is delivered to
    /// `callback` on the delivering thread, in arrival order, one at a
    /// time. Replaces any previously registered callback. Objects already
    /// queued stay queued for [`Self::read`].
    pub fn use_callback(&self, callback: Arc<dyn ReadCallback<T>>) {
        self.shared.state.lock().callback = Some(callback);
    }

    /// Revert to queue/poll mode. On return, no callback invocation is in
    /// flight any more.
    pub fn disable_callback(&self) {
        self.shared.state.lock().callback = None;
        // Barrier: wait out an invocation that already left with the
        // previous callback.
        drop(self.shared.dispatch.lock());
    }

    /// Wake a thread blocked in [`Self::read`]; it returns `None`.
    /// Idempotent, callable from any thread, a no-op when nobody waits.
    pub fn interrupt(&self) {
        let mut state = self.shared.state.lock();
        if state.waiting > 0 {
            state.interrupted = true;
            self.shared.content.notify_all();
        }
    }

    /// Number of objects queued and not yet read.
    pub fn check(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Whether the feeding port has closed.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Envelope of the most recently read or pushed object.
    pub fn get_envelope(&self) -> Option<String> {
        self.shared.state.lock().last_envelope.clone()
    }

    /// Objects discarded by lossy mode since creation.
    pub fn dropped_count(&self) -> u64 {
        self.shared.state.lock().dropped
    }
}

impl<T: Send + 'static> Default for PortReaderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
