// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handle-indexed arena of in-flight message packets.
//!
//! A packet tracks one outbound message that may be travelling on several
//! connections at once: shared content, a pending-send counter, and a
//! completion signal. Packets live in a grow-only arena and are addressed
//! by [`PacketHandle`]; everything outside the pool holds handles, never
//! references, so recycling can never dangle.
//!
//! The pool itself performs **no locking**. The owning writer buffer
//! serializes every call behind its own mutex, mirroring the split where
//! higher-level port code owns the lock and the pool stays a dumb arena.
//!
//! # Lifecycle
//!
//! ```text
//! get_free_packet          inc/dec per destination        check_packet
//!   inactive -> active ------------------------------> pending==0 -> inactive
//! ```
//!
//! A packet's pending counter starts at 1: the writer holds the packet
//! while fanning it out and drops that hold once every destination has
//! been offered the message.

use std::sync::Arc;

use super::wake::WakeSignal;

/// Stable index of one packet slot in a [`PacketPool`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketHandle(u32);

impl PacketHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

struct Packet<T> {
    content: Arc<T>,
    /// Destinations still carrying the message, plus the writer's hold.
    pending: i32,
    completed: bool,
    active: bool,
    wake: Arc<WakeSignal>,
}

impl<T: Default> Packet<T> {
    fn new() -> Self {
        Self {
            content: Arc::new(T::default()),
            pending: 0,
            completed: true,
            active: false,
            wake: WakeSignal::shared(),
        }
    }
}

/// Reference-counted pool of reusable message packets.
pub struct PacketPool<T> {
    slots: Vec<Packet<T>>,
    inactive: Vec<u32>,
    active_count: usize,
    /// Posted every time a packet returns to the inactive list.
    drained: Arc<WakeSignal>,
}

impl<T: Default + Clone> PacketPool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            inactive: Vec::new(),
            active_count: 0,
            drained: WakeSignal::shared(),
        }
    }

    /// Pop a recycled packet, or grow the arena. The handle is exclusively
    /// the caller's until the packet goes inactive again.
    pub fn get_free_packet(&mut self) -> PacketHandle {
        let index = match self.inactive.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Packet::new());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        debug_assert!(!slot.active, "inactive list held an active packet");
        slot.active = true;
        slot.pending = 1;
        slot.completed = false;
        slot.wake.check_and_clear();
        self.active_count += 1;
        PacketHandle(index)
    }

    /// Move the packet's content out for filling. The slot is left with an
    /// empty placeholder until [`PacketPool::put_content`].
    pub fn take_content(&mut self, handle: PacketHandle) -> T {
        let slot = &mut self.slots[handle.index()];
        let prev = std::mem::replace(&mut slot.content, Arc::new(T::default()));
        // Unique in the normal cycle; a straggler clone forces a copy.
        Arc::try_unwrap(prev).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Install content for transmission.
    pub fn put_content(&mut self, handle: PacketHandle, value: T) {
        self.slots[handle.index()].content = Arc::new(value);
    }

    /// Shared view of the content, for handing to connections.
    pub fn share_content(&self, handle: PacketHandle) -> Arc<T> {
        Arc::clone(&self.slots[handle.index()].content)
    }

    /// One more connection is carrying this packet.
    pub fn inc(&mut self, handle: PacketHandle) {
        self.slots[handle.index()].pending += 1;
    }

    /// One connection has finished with this packet.
    pub fn dec(&mut self, handle: PacketHandle) {
        self.slots[handle.index()].pending -= 1;
    }

    /// Fire the completion signal if no sends remain pending.
    ///
    /// True when the packet is (now or already) complete. Must be invoked
    /// each time a connection finishes transmitting.
    pub fn complete_packet(&mut self, handle: PacketHandle) -> bool {
        let slot = &mut self.slots[handle.index()];
        if slot.pending > 0 {
            return false;
        }
        if !slot.completed {
            slot.completed = true;
            slot.wake.notify();
        }
        true
    }

    /// Force the packet to the inactive list regardless of pending sends.
    ///
    /// Used during teardown. A writer still blocked on this packet is
    /// released with an implied failure. With `clear`, the content is
    /// reset so no stale data leaks into an unrelated later send.
    pub fn free_packet(&mut self, handle: PacketHandle, clear: bool) {
        let slot = &mut self.slots[handle.index()];
        if !slot.active {
            debug_assert!(false, "double free of packet {:?}", handle);
            log::error!("ignoring double free of packet {:?}", handle);
            return;
        }
        if !slot.completed {
            slot.completed = true;
            slot.wake.notify();
        }
        slot.pending = 0;
        if clear {
            slot.content = Arc::new(T::default());
        }
        slot.active = false;
        self.inactive.push(handle.0);
        self.active_count -= 1;
        self.drained.notify();
    }

    /// Completion check plus recycle: the single entry point for
    /// connection-completion callbacks.
    pub fn check_packet(&mut self, handle: PacketHandle) -> bool {
        if !self.slots[handle.index()].active {
            return false;
        }
        if self.complete_packet(handle) {
            self.free_packet(handle, true);
            return true;
        }
        false
    }

    /// Number of packets currently in flight.
    pub fn get_count(&self) -> usize {
        self.active_count
    }

    /// Whether the packet has completed (or been force-freed).
    pub fn is_settled(&self, handle: PacketHandle) -> bool {
        self.slots[handle.index()].completed
    }

    /// Completion signal for this packet; wait on it outside the pool lock.
    pub fn wake_handle(&self, handle: PacketHandle) -> Arc<WakeSignal> {
        Arc::clone(&self.slots[handle.index()].wake)
    }

    /// Signal posted whenever any packet drains back to the pool.
    pub fn drain_signal(&self) -> Arc<WakeSignal> {
        Arc::clone(&self.drained)
    }

    /// Force-free every active packet (abrupt teardown).
    pub fn reset(&mut self) {
        for index in 0..self.slots.len() as u32 {
            if self.slots[index as usize].active {
                self.free_packet(PacketHandle(index), true);
            }
        }
    }
}

impl<T: Default + Clone> Default for PacketPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
