// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Wire-format golden vectors: byte-exact reference encodings.
//
// Each test pins the exact on-wire layout of one value, then verifies the
// full cycle: encode == reference, validate accepts, decode -> re-encode
// reproduces the reference bytes.

use hport::{decode_value, validate_frame, vocab32, WireValue};

fn check(value: &WireValue, reference: &[u8]) {
    let encoded = value.to_vec();
    assert_eq!(encoded, reference, "encoding drifted from reference");
    assert!(validate_frame(reference));
    let decoded = decode_value(reference).expect("reference must decode");
    assert_eq!(&decoded, value);
    assert_eq!(decoded.to_vec(), reference);
}

#[test]
fn golden_int32() {
    check(
        &WireValue::Int32(7),
        &[
            0x01, 0x00, 0x00, 0x00, // tag: int32
            0x07, 0x00, 0x00, 0x00, // value
        ],
    );
}

#[test]
fn golden_float64() {
    check(
        &WireValue::Float64(3.5),
        &[
            0x0A, 0x00, 0x00, 0x00, // tag: float64
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x40, // 3.5
        ],
    );
}

#[test]
fn golden_vocab() {
    check(
        &WireValue::Vocab32(vocab32(b'f', b'a', b'i', b'l')),
        &[
            0x09, 0x00, 0x00, 0x00, // tag: vocab32
            b'f', b'a', b'i', b'l', // packed code, low byte first
        ],
    );
}

#[test]
fn golden_string_includes_nul() {
    check(
        &WireValue::String("hi".into()),
        &[
            0x04, 0x00, 0x00, 0x00, // tag: string
            0x03, 0x00, 0x00, 0x00, // length counts the NUL
            b'h', b'i', 0x00,
        ],
    );
}

#[test]
fn golden_empty_string() {
    check(
        &WireValue::String(String::new()),
        &[
            0x04, 0x00, 0x00, 0x00, //
            0x01, 0x00, 0x00, 0x00, // just the NUL
            0x00,
        ],
    );
}

#[test]
fn golden_blob_has_no_terminator() {
    check(
        &WireValue::Blob(vec![0xDE, 0xAD]),
        &[
            0x0C, 0x00, 0x00, 0x00, // tag: blob
            0x02, 0x00, 0x00, 0x00, // raw length
            0xDE, 0xAD,
        ],
    );
}

#[test]
fn golden_homogeneous_int_list() {
    check(
        &WireValue::List(vec![WireValue::Int32(1), WireValue::Int32(2)]),
        &[
            0x01, 0x01, 0x00, 0x00, // tag: list | int32
            0x02, 0x00, 0x00, 0x00, // count
            0x01, 0x00, 0x00, 0x00, // untagged payloads
            0x02, 0x00, 0x00, 0x00,
        ],
    );
}

// The canonical mixed message: [Int32 = 7, String = "hi", [Float64 = 3.5]].
#[test]
fn golden_mixed_message() {
    let message = WireValue::List(vec![
        WireValue::Int32(7),
        WireValue::String("hi".into()),
        WireValue::List(vec![WireValue::Float64(3.5)]),
    ]);
    check(
        &message,
        &[
            0x00, 0x01, 0x00, 0x00, // tag: list (general form)
            0x03, 0x00, 0x00, 0x00, // count = 3
            0x01, 0x00, 0x00, 0x00, // int32
            0x07, 0x00, 0x00, 0x00, //   7
            0x04, 0x00, 0x00, 0x00, // string
            0x03, 0x00, 0x00, 0x00, //   len = 3
            b'h', b'i', 0x00, //   "hi\0"
            0x0A, 0x01, 0x00, 0x00, // list | float64
            0x01, 0x00, 0x00, 0x00, //   count = 1
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x40, //   3.5
        ],
    );
}

#[test]
fn golden_vectors_survive_any_truncation() {
    let message = WireValue::List(vec![
        WireValue::Int32(7),
        WireValue::String("hi".into()),
        WireValue::List(vec![WireValue::Float64(3.5)]),
    ]);
    let bytes = message.to_vec();
    for cut in 0..bytes.len() {
        assert!(!validate_frame(&bytes[..cut]), "prefix {} accepted", cut);
        assert!(decode_value(&bytes[..cut]).is_err());
    }
}
