// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HPORT - Named-port transport core
//!
//! A pure Rust port/connection transport core: framed wire encoding,
//! reference-tracked outbound packets, reader/writer buffers bridging
//! network threads and application threads, and a keyed election
//! primitive coordinating one active owner among equivalent peers.
//!
//! ## Quick Start
//!
//! ```rust
//! use hport::{InprocHub, PortReaderBuffer, PortWriterBuffer};
//! use std::sync::Arc;
//!
//! fn main() -> hport::Result<()> {
//!     let hub: InprocHub<Vec<u8>> = InprocHub::new();
//!     let source = hub.create_port("sensor/out");
//!     let target = hub.create_port("logger/in");
//!
//!     let reader: PortReaderBuffer<Vec<u8>> = PortReaderBuffer::new();
//!     reader.set_strict(true);
//!     reader.attach(&target)?;
//!
//!     let mut writer: PortWriterBuffer<Vec<u8>> = PortWriterBuffer::new();
//!     writer.attach(Arc::new(source.clone()))?;
//!     hub.connect(&source, "logger/in")?;
//!
//!     writer.prepare()?.extend_from_slice(b"reading 42");
//!     writer.write(true)?; // blocks until every destination took it
//!
//!     let sample = reader.read(true).expect("delivered");
//!     assert_eq!(&sample[..], b"reading 42");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                     Application Layer                        |
//! |       PortWriterBuffer          PortReaderBuffer             |
//! +--------------------------------------------------------------+
//! |                       Core Layer                             |
//! |   PacketPool (handles) | Election | WakeSignal               |
//! +--------------------------------------------------------------+
//! |                       Wire Layer                             |
//! |   WireWriter | decode_value | validate_frame | blob views    |
//! +--------------------------------------------------------------+
//! |                     Port implementations                     |
//! |   InprocHub / InprocPort  (networked carriers live outside)  |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PortWriterBuffer`] | Stages outbound payloads, tracks in-flight sends |
//! | [`PortReaderBuffer`] | Queues or pushes inbound objects per port |
//! | [`WireValue`] | One atom of the framed wire format |
//! | [`Election`] | Picks one active owner per shared resource key |
//! | [`InprocHub`] | In-process port registry and carrier |
//!
//! ## Delivery guarantees
//!
//! Per connection, objects arrive in send order. Across connections there
//! is no ordering. Lossy buffers keep only the newest object; strict
//! buffers keep everything. A strict write blocks until the message has
//! departed every local send queue — there is no end-to-end
//! acknowledgement at this layer.

/// Global configuration (compile-time defaults, runtime overrides).
pub mod config;
/// Core runtime primitives (packet pool, election, wake signal).
pub mod core;
/// Port buffer engine (reader/writer buffers, port seam, in-process hub).
pub mod port;
/// Tagged wire-format envelope (encode, decode, validate, blob views).
pub mod wire;

pub use config::RuntimeConfig;
pub use core::{Election, PacketHandle, PacketPool, WakeSignal};
pub use port::{
    decode_inbound, Error, InprocHub, InprocPort, ObjectSink, Port, PortReaderBuffer,
    PortWriterBuffer, ReadCallback, Result, Sample, SendTicket,
};
pub use wire::{
    decode_value, encode_value, extract_nested_blob, validate_frame, vocab32, vocab32_to_string,
    FrameError, WireValue, WireWriter,
};

/// HPORT version string.
pub const VERSION: &str = "0.3.2";
