// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Port-facing buffer engine.
//!
//! A port is a named, location-independent endpoint with any number of
//! simultaneous input and output connections. Network threads frame and
//! unframe bytes; the buffer types here bridge those threads to
//! application code wanting plain blocking reads, polls, or callbacks.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `reader` | [`PortReaderBuffer`]: inbound queueing and callback dispatch |
//! | `writer` | [`PortWriterBuffer`]: outbound staging over the packet pool |
//! | `inproc` | In-process port implementation and hub |
//!
//! ## Data flow
//!
//! ```text
//! net thread --deliver()--> PortReaderBuffer --read()/on_read()--> app
//! app --prepare()/write()-> PortWriterBuffer --dispatch()--------> port
//!                                             ^ SendTicket clones track
//!                                               each destination
//! ```

pub mod inproc;
pub mod reader;
pub mod writer;

pub use inproc::{InprocHub, InprocPort};
pub use reader::{PortReaderBuffer, ReadCallback, Sample};
pub use writer::PortWriterBuffer;

use parking_lot::Mutex;
use std::sync::Arc;

use crate::core::pool::{PacketHandle, PacketPool};
use crate::wire::{decode_value, validate_frame, FrameError, WireValue};

/// Errors surfaced by the port buffer engine.
///
/// Framing violations arrive wrapped; resource-lifecycle violations do
/// not appear here at all — they are caller bugs handled by debug
/// assertions, not recoverable conditions.
#[derive(Debug)]
pub enum Error {
    /// The attached port has closed; reads drain, writes are rejected.
    PortClosed,
    /// The buffer was used before any port was attached.
    NotAttached,
    /// A buffer may be attached to at most one port.
    AlreadyAttached,
    /// No port with this name is registered.
    NoSuchPort(String),
    /// An inbound buffer failed frame validation or decoding.
    Frame(FrameError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::PortClosed => write!(f, "port is closed"),
            Error::NotAttached => write!(f, "buffer is not attached to a port"),
            Error::AlreadyAttached => write!(f, "buffer is already attached to a port"),
            Error::NoSuchPort(name) => write!(f, "no port named {:?}", name),
            Error::Frame(e) => write!(f, "frame error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Frame(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}

/// Convenient alias for API results using the public [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Validate and decode one inbound frame.
///
/// The step a network thread runs on a received buffer before delivery:
/// the count-only walk first, so a corrupt frame is rejected before any
/// length field is trusted, then the full decode.
pub fn decode_inbound(buf: &[u8]) -> Result<WireValue> {
    if !validate_frame(buf) {
        // The decoder reports the precise violation; the walker only
        // rejects. Keep rejecting even if they were ever to disagree.
        return match decode_value(buf) {
            Err(e) => Err(Error::Frame(e)),
            Ok(_) => Err(Error::Frame(FrameError::Truncated { offset: buf.len() })),
        };
    }
    Ok(decode_value(buf)?)
}

/// Consumer side of a port: where inbound objects are handed over.
///
/// Implemented by the reader buffer; called on network or dispatcher
/// threads, never on application threads.
pub trait ObjectSink<T>: Send + Sync {
    /// Hand one received object (and its envelope, if any) to the sink.
    /// False means the sink refused it, e.g. because it is closed.
    fn deliver(&self, obj: T, envelope: Option<String>) -> bool;

    /// The feeding port has closed; release any blocked consumer.
    fn port_closed(&self);
}

/// The contact surface a port implementation offers this engine.
///
/// Naming, discovery and the actual carriers live elsewhere; the buffer
/// engine only needs registration, teardown and a tracked fan-out.
pub trait Port<T: Default + Clone>: Send + Sync {
    /// The port's registered name.
    fn name(&self) -> String;

    /// Whether this port currently owns its name (see
    /// [`crate::core::Election`]) and can accept connections.
    fn open(&self) -> bool;

    /// Tear the port down: refuse further traffic, notify the reader
    /// sink, release the name.
    fn close(&self);

    /// Register the delivery target for inbound objects.
    fn set_reader(&self, sink: Arc<dyn ObjectSink<T>>);

    /// Fan one message out to every connected destination.
    ///
    /// The implementation clones `ticket` once per destination it hands
    /// the payload to, then drops the original; each clone is dropped when
    /// that destination has finished with the message. Returns the number
    /// of destinations reached, or [`Error::PortClosed`].
    fn dispatch(
        &self,
        payload: Arc<T>,
        envelope: Option<String>,
        ticket: SendTicket<T>,
    ) -> Result<usize>;

    /// Number of inbound connections.
    fn input_count(&self) -> usize;

    /// Number of outbound connections.
    fn output_count(&self) -> usize;
}

/// Pending-send token for one in-flight packet.
///
/// Cloning registers one more carrier of the packet; dropping reports
/// that carrier done and recycles the packet once nobody is left. Holding
/// a ticket is the only coupling a connection has to the pool — it never
/// sees a pointer into the arena, only the handle inside the ticket.
pub struct SendTicket<T: Default + Clone> {
    pool: Arc<Mutex<PacketPool<T>>>,
    handle: PacketHandle,
}

impl<T: Default + Clone> SendTicket<T> {
    pub(crate) fn new(pool: Arc<Mutex<PacketPool<T>>>, handle: PacketHandle) -> Self {
        Self { pool, handle }
    }

    /// Handle of the packet this ticket tracks.
    pub fn handle(&self) -> PacketHandle {
        self.handle
    }
}

impl<T: Default + Clone> Clone for SendTicket<T> {
    fn clone(&self) -> Self {
        self.pool.lock().inc(self.handle);
        Self {
            pool: Arc::clone(&self.pool),
            handle: self.handle,
        }
    }
}

impl<T: Default + Clone> Drop for SendTicket<T> {
    fn drop(&mut self) {
        let mut pool = self.pool.lock();
        pool.dec(self.handle);
        pool.check_packet(self.handle);
    }
}
