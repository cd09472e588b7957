// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Iterative frame decoder.
//!
//! Nesting is tracked on an explicit stack so a hostile frame cannot pick
//! the recursion depth. Preallocation from declared counts is capped; a
//! frame must still deliver every element it declares, so a lying count is
//! caught as truncation, not as an oversized allocation.

use super::cursor::Cursor;
use super::{
    FrameError, FrameResult, WireValue, TAG_BLOB, TAG_FLOAT64, TAG_INT32, TAG_LIST, TAG_STRING,
    TAG_VOCAB32,
};

/// Cap on `Vec::with_capacity` from a wire-declared count.
const MAX_PREALLOC: usize = 256;

struct PendingList {
    items: Vec<WireValue>,
    remaining: u32,
    /// Element tag for a subtype-coded list, 0 when elements carry tags.
    sub: i32,
}

/// Decode exactly one value from `buf`, rejecting trailing bytes.
pub fn decode_value(buf: &[u8]) -> FrameResult<WireValue> {
    let mut cur = Cursor::new(buf);
    let value = read_value(&mut cur)?;
    if !cur.is_eof() {
        return Err(FrameError::TrailingBytes {
            remaining: cur.remaining(),
        });
    }
    Ok(value)
}

fn read_value(cur: &mut Cursor<'_>) -> FrameResult<WireValue> {
    let mut stack: Vec<PendingList> = Vec::new();

    loop {
        // Subtype-coded lists supply the element tag themselves.
        let tag = match stack.last() {
            Some(p) if p.sub != 0 => p.sub,
            _ => cur.read_i32_le()?,
        };

        let mut value = if tag & TAG_LIST != 0 {
            let sub = tag & !TAG_LIST;
            if sub != 0 && !is_scalar_tag(sub) {
                return Err(FrameError::BadTag {
                    tag,
                    offset: cur.offset().saturating_sub(4),
                });
            }
            let count_offset = cur.offset();
            let count = cur.read_i32_le()?;
            if count < 0 {
                return Err(FrameError::BadLength {
                    len: count,
                    offset: count_offset,
                });
            }
            if count == 0 {
                WireValue::List(Vec::new())
            } else {
                stack.push(PendingList {
                    items: Vec::with_capacity((count as usize).min(MAX_PREALLOC)),
                    remaining: count as u32,
                    sub,
                });
                continue;
            }
        } else {
            read_scalar(cur, tag)?
        };

        // Attach the finished value to its parent, closing any lists it
        // completes, until one remains open or the root is done.
        loop {
            let closed = match stack.last_mut() {
                None => return Ok(value),
                Some(parent) => {
                    parent.items.push(value);
                    parent.remaining -= 1;
                    parent.remaining == 0
                }
            };
            if !closed {
                break;
            }
            match stack.pop() {
                Some(done) => value = WireValue::List(done.items),
                None => break,
            }
        }
    }
}

fn is_scalar_tag(tag: i32) -> bool {
    matches!(tag, TAG_INT32 | TAG_VOCAB32 | TAG_FLOAT64 | TAG_STRING | TAG_BLOB)
}

fn read_scalar(cur: &mut Cursor<'_>, tag: i32) -> FrameResult<WireValue> {
    match tag {
        TAG_INT32 => Ok(WireValue::Int32(cur.read_i32_le()?)),
        TAG_VOCAB32 => Ok(WireValue::Vocab32(cur.read_i32_le()?)),
        TAG_FLOAT64 => Ok(WireValue::Float64(cur.read_f64_le()?)),
        TAG_STRING => {
            let len_offset = cur.offset();
            let len = cur.read_i32_le()?;
            // Declared length counts the trailing NUL, so zero is invalid.
            if len < 1 {
                return Err(FrameError::BadLength {
                    len,
                    offset: len_offset,
                });
            }
            let payload_offset = cur.offset();
            let bytes = cur.read_bytes(len as usize)?;
            match std::str::from_utf8(&bytes[..bytes.len() - 1]) {
                Ok(s) => Ok(WireValue::String(s.to_owned())),
                Err(_) => Err(FrameError::NotUtf8 {
                    offset: payload_offset,
                }),
            }
        }
        TAG_BLOB => {
            let len_offset = cur.offset();
            let len = cur.read_i32_le()?;
            if len < 0 {
                return Err(FrameError::BadLength {
                    len,
                    offset: len_offset,
                });
            }
            Ok(WireValue::Blob(cur.read_bytes(len as usize)?.to_vec()))
        }
        other => Err(FrameError::BadTag {
            tag: other,
            offset: cur.offset().saturating_sub(4),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::vocab32;

    fn roundtrip(value: &WireValue) {
        let bytes = value.to_vec();
        assert_eq!(&decode_value(&bytes).expect("well-formed"), value);
    }

    #[test]
    fn test_roundtrip_scalars() {
        roundtrip(&WireValue::Int32(-42));
        roundtrip(&WireValue::Vocab32(vocab32(b's', b't', b'o', b'p')));
        roundtrip(&WireValue::Float64(3.5));
        roundtrip(&WireValue::String(String::new()));
        roundtrip(&WireValue::String("hello port".into()));
        roundtrip(&WireValue::Blob(Vec::new()));
        roundtrip(&WireValue::Blob(vec![0, 255, 128]));
    }

    #[test]
    fn test_roundtrip_nested_depth_three() {
        roundtrip(&WireValue::List(vec![
            WireValue::Int32(1),
            WireValue::List(vec![
                WireValue::String("mid".into()),
                WireValue::List(vec![WireValue::Float64(2.5), WireValue::Float64(-0.5)]),
            ]),
            WireValue::Blob(vec![9, 9]),
        ]));
    }

    #[test]
    fn test_roundtrip_empty_list() {
        roundtrip(&WireValue::List(Vec::new()));
        roundtrip(&WireValue::List(vec![WireValue::List(Vec::new())]));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = WireValue::Int32(7).to_vec();
        bytes.push(0);
        assert_eq!(
            decode_value(&bytes).unwrap_err(),
            FrameError::TrailingBytes { remaining: 1 }
        );
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&TAG_LIST.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            FrameError::BadLength { len: -1, .. }
        ));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&99i32.to_le_bytes());
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            FrameError::BadTag { tag: 99, offset: 0 }
        ));
    }

    #[test]
    fn test_unknown_list_subtype_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(TAG_LIST | 3).to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            FrameError::BadTag { .. }
        ));
    }

    #[test]
    fn test_zero_string_length_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&TAG_STRING.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            FrameError::BadLength { len: 0, .. }
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&TAG_STRING.to_le_bytes());
        bytes.extend_from_slice(&3i32.to_le_bytes());
        bytes.extend_from_slice(&[0xFF, 0xFE, 0x00]);
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            FrameError::NotUtf8 { offset: 8 }
        ));
    }

    #[test]
    fn test_vocab_is_not_utf8_checked() {
        // Any 32-bit pattern is a legal vocab, printable or not.
        roundtrip(&WireValue::Vocab32(i32::from_le_bytes([0xFF, 0xFE, 1, 2])));
    }

    #[test]
    fn test_lying_count_is_truncation() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(TAG_LIST | TAG_INT32).to_le_bytes());
        bytes.extend_from_slice(&1000i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes()); // only one element present
        assert!(matches!(
            decode_value(&bytes).unwrap_err(),
            FrameError::Truncated { .. }
        ));
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        // 4096 nested single-element lists; an unchecked recursive decoder
        // would blow the stack long before this.
        let mut bytes = Vec::new();
        for _ in 0..4096 {
            bytes.extend_from_slice(&TAG_LIST.to_le_bytes());
            bytes.extend_from_slice(&1i32.to_le_bytes());
        }
        bytes.extend_from_slice(&TAG_INT32.to_le_bytes());
        bytes.extend_from_slice(&5i32.to_le_bytes());

        let mut value = decode_value(&bytes).expect("well-formed");
        let mut depth = 0;
        while let WireValue::List(items) = value {
            assert_eq!(items.len(), 1);
            value = items.into_iter().next().expect("one element");
            depth += 1;
        }
        assert_eq!(depth, 4096);
        assert_eq!(value, WireValue::Int32(5));
    }

    #[test]
    fn test_randomized_roundtrips() {
        fn arbitrary(depth: usize) -> WireValue {
            match fastrand::usize(0..if depth >= 3 { 5 } else { 6 }) {
                0 => WireValue::Int32(fastrand::i32(..)),
                1 => WireValue::Vocab32(fastrand::i32(..)),
                2 => WireValue::Float64(f64::from_bits(fastrand::u64(..))),
                3 => {
                    let n = fastrand::usize(0..12);
                    WireValue::String((0..n).map(|_| fastrand::alphanumeric()).collect())
                }
                4 => {
                    let n = fastrand::usize(0..24);
                    WireValue::Blob((0..n).map(|_| fastrand::u8(..)).collect())
                }
                _ => {
                    let n = fastrand::usize(0..5);
                    WireValue::List((0..n).map(|_| arbitrary(depth + 1)).collect())
                }
            }
        }

        fastrand::seed(7);
        for _ in 0..200 {
            let value = arbitrary(0);
            let bytes = value.to_vec();
            let decoded = decode_value(&bytes).expect("well-formed");
            // NaN payloads do not compare equal; compare re-encodings.
            assert_eq!(decoded.to_vec(), bytes);
        }
    }
}
