// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Count-only frame walker.
//!
//! Walks a buffer exactly as the decoder would, but only advances an
//! offset: declared lengths are range-checked against the remaining
//! bytes and never used to index. Externally received buffers must pass
//! this before their element counts are trusted, because a corrupt frame
//! must never be reinterpreted as a different number of elements than it
//! declares.

use super::{TAG_BLOB, TAG_FLOAT64, TAG_INT32, TAG_LIST, TAG_STRING, TAG_VOCAB32};

/// Check that `buf` holds exactly one well-formed value.
///
/// True only when every declared field fits, every tag is recognized, and
/// the walk consumes the whole buffer. False on truncation, a negative or
/// out-of-range length, an unknown tag or list subtype, or leftover bytes.
pub fn validate_frame(buf: &[u8]) -> bool {
    let mut walker = Walker { buf, off: 0 };
    // Stack of open lists: (elements still expected, element tag or 0).
    let mut stack: Vec<(u32, i32)> = Vec::new();

    loop {
        let tag = match stack.last() {
            Some(&(_, sub)) if sub != 0 => sub,
            _ => match walker.take_i32() {
                Some(t) => t,
                None => return false,
            },
        };

        if tag & TAG_LIST != 0 {
            let sub = tag & !TAG_LIST;
            if sub != 0 && !scalar_tag(sub) {
                return false;
            }
            let count = match walker.take_i32() {
                Some(c) if c >= 0 => c as u32,
                _ => return false,
            };
            if count > 0 {
                stack.push((count, sub));
                continue;
            }
            // count == 0 closes immediately; fall through to bookkeeping.
        } else if !walker.skip_scalar(tag) {
            return false;
        }

        // One value finished; unwind lists it completes.
        loop {
            match stack.last_mut() {
                None => return walker.off == buf.len(),
                Some(top) => {
                    top.0 -= 1;
                    if top.0 > 0 {
                        break;
                    }
                    stack.pop();
                }
            }
        }
    }
}

struct Walker<'a> {
    buf: &'a [u8],
    off: usize,
}

impl Walker<'_> {
    fn take(&mut self, n: usize) -> bool {
        if n > self.buf.len() - self.off {
            return false;
        }
        self.off += n;
        true
    }

    fn take_i32(&mut self) -> Option<i32> {
        if self.buf.len() - self.off < 4 {
            return None;
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buf[self.off..self.off + 4]);
        self.off += 4;
        Some(i32::from_le_bytes(bytes))
    }

    /// Advance over one scalar payload without touching its bytes.
    fn skip_scalar(&mut self, tag: i32) -> bool {
        match tag {
            TAG_INT32 | TAG_VOCAB32 => self.take(4),
            TAG_FLOAT64 => self.take(8),
            TAG_STRING => match self.take_i32() {
                Some(len) if len >= 1 => self.take(len as usize),
                _ => false,
            },
            TAG_BLOB => match self.take_i32() {
                Some(len) if len >= 0 => self.take(len as usize),
                _ => false,
            },
            _ => false,
        }
    }
}

fn scalar_tag(tag: i32) -> bool {
    matches!(tag, TAG_INT32 | TAG_VOCAB32 | TAG_FLOAT64 | TAG_STRING | TAG_BLOB)
}
