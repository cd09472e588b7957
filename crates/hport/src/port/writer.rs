// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound buffer: staged payloads over the packet pool.
//!
//! The application fills a staged payload in place, then hands it to the
//! attached port for fan-out. Each in-flight message is tracked by a
//! packet in a [`PacketPool`]; the buffer's single mutex serializes every
//! pool access, whether it comes from this thread or from a connection
//! dropping its [`super::SendTicket`].
//!
//! A strict write blocks until the packet has departed the local send
//! queues — every destination has taken its copy — not until any remote
//! peer acknowledges; this layer has no end-to-end acknowledgement.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::{Error, Port, Result, SendTicket};
use crate::core::pool::{PacketHandle, PacketPool};

struct Staged<T> {
    handle: PacketHandle,
    value: T,
}

/// Per-port outbound buffer for payloads of type `T`.
pub struct PortWriterBuffer<T: Default + Clone + Send + Sync + 'static> {
    pool: Arc<Mutex<PacketPool<T>>>,
    port: Option<Arc<dyn Port<T>>>,
    staged: Option<Staged<T>>,
    envelope: Option<String>,
    closed: bool,
}

impl<T: Default + Clone + Send + Sync + 'static> PortWriterBuffer<T> {
    pub fn new() -> Self {
        Self {
            pool: Arc::new(Mutex::new(PacketPool::new())),
            port: None,
            staged: None,
            envelope: None,
            closed: false,
        }
    }

    /// Bind this buffer to the port it will write through.
    pub fn attach(&mut self, port: Arc<dyn Port<T>>) -> Result<()> {
        if self.port.is_some() {
            return Err(Error::AlreadyAttached);
        }
        self.port = Some(port);
        Ok(())
    }

    /// Payload object to fill in before [`Self::write`].
    ///
    /// Recycles the content of a free packet when one is available, so a
    /// steady writer reuses a small set of payload instances. Repeated
    /// calls before `write` return the same instance; which instance that
    /// is depends on how many earlier writes are still in flight.
    pub fn prepare(&mut self) -> Result<&mut T> {
        if self.closed {
            return Err(Error::PortClosed);
        }
        if self.staged.is_none() {
            let mut pool = self.pool.lock();
            let handle = pool.get_free_packet();
            let value = pool.take_content(handle);
            drop(pool);
            self.staged = Some(Staged { handle, value });
        }
        match self.staged.as_mut() {
            Some(staged) => Ok(&mut staged.value),
            None => Err(Error::PortClosed),
        }
    }

    /// Give back a prepared, unwritten payload. Its content is kept for
    /// the next [`Self::prepare`].
    pub fn unprepare(&mut self) {
        if let Some(staged) = self.staged.take() {
            let mut pool = self.pool.lock();
            pool.put_content(staged.handle, staged.value);
            pool.free_packet(staged.handle, false);
        }
    }

    /// Envelope attached to subsequent writes (replaces any previous one).
    pub fn set_envelope(&mut self, envelope: impl Into<String>) {
        self.envelope = Some(envelope.into());
    }

    /// Hand the prepared payload to the port for transmission to every
    /// currently connected destination.
    ///
    /// With `strict`, blocks until the packet's pending count reaches
    /// zero; otherwise returns once the message is queued everywhere.
    /// Writing with nothing prepared sends a default payload.
    pub fn write(&mut self, strict: bool) -> Result<()> {
        if self.closed {
            return Err(Error::PortClosed);
        }
        let port = match self.port.as_ref() {
            Some(port) => Arc::clone(port),
            None => return Err(Error::NotAttached),
        };
        if self.staged.is_none() {
            self.prepare()?;
        }
        let staged = match self.staged.take() {
            Some(staged) => staged,
            None => return Err(Error::PortClosed),
        };
        let handle = staged.handle;

        let (payload, wake) = {
            let mut pool = self.pool.lock();
            pool.put_content(handle, staged.value);
            (pool.share_content(handle), pool.wake_handle(handle))
        };
        // The ticket wraps the writer's own hold on the packet; the port
        // clones it per destination and drops this one when the fan-out
        // is queued everywhere.
        let ticket = SendTicket::new(Arc::clone(&self.pool), handle);

        match port.dispatch(payload, self.envelope.clone(), ticket) {
            Ok(_destinations) => {}
            Err(Error::PortClosed) => {
                // The dropped ticket already recycled the packet.
                self.closed = true;
                return Err(Error::PortClosed);
            }
            Err(other) => return Err(other),
        }

        if strict {
            loop {
                if self.pool.lock().is_settled(handle) {
                    break;
                }
                wake.wait();
            }
        }
        Ok(())
    }

    /// Number of packets still in flight.
    pub fn get_count(&self) -> usize {
        self.pool.lock().get_count()
    }

    /// Block until no packet is in flight any more.
    pub fn wait_for_write(&self) {
        let drained = self.pool.lock().drain_signal();
        loop {
            if self.pool.lock().get_count() == 0 {
                return;
            }
            drained.wait_timeout(Duration::from_millis(100));
        }
    }

    /// Whether a write has observed the attached port closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Force-release every in-flight packet (abrupt teardown). Writers
    /// blocked in a strict write elsewhere are released with an implied
    /// failure.
    pub fn reset(&mut self) {
        self.staged = None;
        self.pool.lock().reset();
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for PortWriterBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Drop for PortWriterBuffer<T> {
    fn drop(&mut self) {
        self.reset();
    }
}
