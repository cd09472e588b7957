// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec throughput: encode, validate, decode on representative frames.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hport::{decode_value, validate_frame, WireValue};

fn telemetry_frame() -> WireValue {
    WireValue::List(vec![
        WireValue::Int32(42),
        WireValue::String("base/imu".into()),
        WireValue::List((0..64).map(|i| WireValue::Float64(f64::from(i) * 0.125)).collect()),
        WireValue::Blob(vec![0x5A; 512]),
    ])
}

fn bench_encode(c: &mut Criterion) {
    let frame = telemetry_frame();
    c.bench_function("wire_encode_telemetry", |b| {
        b.iter(|| black_box(&frame).to_vec());
    });
}

fn bench_validate(c: &mut Criterion) {
    let bytes = telemetry_frame().to_vec();
    c.bench_function("wire_validate_telemetry", |b| {
        b.iter(|| validate_frame(black_box(&bytes)));
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = telemetry_frame().to_vec();
    c.bench_function("wire_decode_telemetry", |b| {
        b.iter(|| decode_value(black_box(&bytes)).expect("well-formed"));
    });
}

criterion_group!(benches, bench_encode, bench_validate, bench_decode);
criterion_main!(benches);
