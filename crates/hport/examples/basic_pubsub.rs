// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal publish/subscribe over an in-process hub.
//!
//! Run with: cargo run --example basic_pubsub

use hport::{InprocHub, PortReaderBuffer, PortWriterBuffer, WireValue};
use std::sync::Arc;

fn main() -> hport::Result<()> {
    let hub: InprocHub<Vec<u8>> = InprocHub::new();
    let publisher = hub.create_port("demo/out");
    let subscriber = hub.create_port("demo/in");

    let reader: PortReaderBuffer<Vec<u8>> = PortReaderBuffer::new();
    reader.set_strict(true);
    reader.attach(&subscriber)?;

    let mut writer: PortWriterBuffer<Vec<u8>> = PortWriterBuffer::new();
    writer.attach(Arc::new(publisher.clone()))?;
    hub.connect(&publisher, "demo/in")?;

    for i in 0..5 {
        let message = WireValue::List(vec![
            WireValue::String("reading".into()),
            WireValue::Int32(i),
            WireValue::Float64(f64::from(i) * 0.5),
        ]);
        *writer.prepare()? = message.to_vec();
        writer.set_envelope(format!("seq {}", i));
        writer.write(true)?;
    }

    for _ in 0..5 {
        let sample = reader.read(true).expect("message delivered");
        let value = hport::decode_inbound(&sample)?;
        println!("{:?} <- {:?}", sample.envelope(), value);
    }

    Ok(())
}
