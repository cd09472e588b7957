// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Segmented frame encoder.
//!
//! [`WireWriter`] accumulates an outbound frame as a list of segments.
//! Small fields are appended to an open segment; caller-owned regions
//! (image planes, large blobs) are attached as shared `Arc<[u8]>` views
//! without copying. [`extract_nested_blob`] pulls a blob payload out of a
//! queued frame as another shared view, so re-framing a large payload
//! never memcpys it.

use std::sync::Arc;

use super::{WireValue, TAG_BLOB, TAG_LIST};

/// One region of an outbound frame.
///
/// `data` is shared; `start..start + len` is the window this frame uses.
#[derive(Clone)]
pub(crate) struct Segment {
    data: Arc<[u8]>,
    start: usize,
    len: usize,
}

impl Segment {
    fn bytes(&self) -> &[u8] {
        &self.data[self.start..self.start + self.len]
    }
}

/// Segmented write buffer for one outbound frame.
pub struct WireWriter {
    segments: Vec<Segment>,
    current: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Append raw bytes to the open segment.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.current.extend_from_slice(bytes);
    }

    pub fn put_i32_le(&mut self, value: i32) {
        self.current.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f64_le(&mut self, value: f64) {
        self.current.extend_from_slice(&value.to_le_bytes());
    }

    /// Attach a caller-owned region as its own segment, without copying.
    pub fn append_shared(&mut self, data: Arc<[u8]>) {
        self.freeze_current();
        let len = data.len();
        if len > 0 {
            self.segments.push(Segment {
                data,
                start: 0,
                len,
            });
        }
    }

    /// Total queued length in bytes.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.len).sum::<usize>() + self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten the frame into one contiguous buffer (copies).
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for seg in &self.segments {
            out.extend_from_slice(seg.bytes());
        }
        out.extend_from_slice(&self.current);
        out
    }

    /// Discard all queued content.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.current.clear();
    }

    fn freeze_current(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let data: Arc<[u8]> = std::mem::take(&mut self.current).into();
        let len = data.len();
        self.segments.push(Segment {
            data,
            start: 0,
            len,
        });
    }

    pub(crate) fn frozen_segments(&mut self) -> &[Segment] {
        self.freeze_current();
        &self.segments
    }
}

impl Default for WireWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode one value, tag included, onto `out`.
pub fn encode_value(value: &WireValue, out: &mut WireWriter) {
    match value {
        WireValue::List(items) => {
            let sub = list_sub_tag(items);
            out.put_i32_le(TAG_LIST | sub);
            out.put_i32_le(items.len() as i32);
            for item in items {
                if sub == 0 {
                    encode_value(item, out);
                } else {
                    encode_payload(item, out);
                }
            }
        }
        scalar => {
            out.put_i32_le(scalar.tag());
            encode_payload(scalar, out);
        }
    }
}

/// Encode the payload of one atom, tag omitted.
fn encode_payload(value: &WireValue, out: &mut WireWriter) {
    match value {
        WireValue::Int32(v) | WireValue::Vocab32(v) => out.put_i32_le(*v),
        WireValue::Float64(v) => out.put_f64_le(*v),
        WireValue::String(s) => {
            // Declared length counts the trailing NUL.
            out.put_i32_le(s.len() as i32 + 1);
            out.append_bytes(s.as_bytes());
            out.append_bytes(&[0]);
        }
        WireValue::Blob(b) => {
            out.put_i32_le(b.len() as i32);
            out.append_bytes(b);
        }
        WireValue::List(_) => encode_value(value, out),
    }
}

/// Subtype tag for a homogeneous list, or 0 for the general form.
///
/// Only non-empty lists of a single scalar atom type qualify; nested
/// lists always keep per-element tags.
fn list_sub_tag(items: &[WireValue]) -> i32 {
    let first = match items.first() {
        Some(WireValue::List(_)) | None => return 0,
        Some(v) => v.tag(),
    };
    for item in &items[1..] {
        if matches!(item, WireValue::List(_)) || item.tag() != first {
            return 0;
        }
    }
    first
}

/// Cursor over frozen segments that tracks (segment, offset) positions.
struct SegCursor<'a> {
    segments: &'a [Segment],
    seg: usize,
    off: usize,
}

impl<'a> SegCursor<'a> {
    fn new(segments: &'a [Segment]) -> Self {
        Self {
            segments,
            seg: 0,
            off: 0,
        }
    }

    /// Position of the next unread byte, skipping exhausted segments.
    fn position(&mut self) -> Option<(usize, usize)> {
        while self.seg < self.segments.len() {
            if self.off < self.segments[self.seg].len {
                return Some((self.seg, self.off));
            }
            self.seg += 1;
            self.off = 0;
        }
        None
    }

    fn next_byte(&mut self) -> Option<u8> {
        let (seg, off) = self.position()?;
        self.off += 1;
        Some(self.segments[seg].bytes()[off])
    }

    fn read_i32_le(&mut self) -> Option<i32> {
        let mut bytes = [0u8; 4];
        for b in &mut bytes {
            *b = self.next_byte()?;
        }
        Some(i32::from_le_bytes(bytes))
    }
}

/// Pull the blob out of a queued `[blob]` frame as a zero-copy view.
///
/// `src` must hold exactly a one-element list whose element is a blob, in
/// either the general or the subtype-coded form, with the blob bytes lying
/// wholly inside one segment. On success the blob region is appended to
/// `dst` as a shared view of `src`'s segment and true is returned; on any
/// mismatch `dst` is left untouched and the result is false.
pub fn extract_nested_blob(src: &mut WireWriter, dst: &mut WireWriter) -> bool {
    let total = src.len();
    let segments = src.frozen_segments();
    let mut cur = SegCursor::new(segments);

    let tag = match cur.read_i32_le() {
        Some(t) => t,
        None => return false,
    };
    let header;
    if tag == TAG_LIST {
        header = 16;
        if cur.read_i32_le() != Some(1) || cur.read_i32_le() != Some(TAG_BLOB) {
            return false;
        }
    } else if tag == TAG_LIST | TAG_BLOB {
        header = 12;
        if cur.read_i32_le() != Some(1) {
            return false;
        }
    } else {
        return false;
    }
    let len = match cur.read_i32_le() {
        Some(l) if l >= 0 => l as usize,
        _ => return false,
    };
    // The blob must be the whole remainder of the frame.
    if header + len != total {
        return false;
    }
    if len == 0 {
        return true;
    }
    let (seg, off) = match cur.position() {
        Some(p) => p,
        None => return false,
    };
    let segment = &segments[seg];
    if off + len > segment.len {
        // Spans a segment boundary; a copy would be needed.
        return false;
    }
    let view = Segment {
        data: Arc::clone(&segment.data),
        start: segment.start + off,
        len,
    };
    dst.freeze_current();
    dst.segments.push(view);
    true
}
