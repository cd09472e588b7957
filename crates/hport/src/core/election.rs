// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Keyed peer registry electing one owner per shared resource.
//!
//! Several equivalent peers may claim the same resource key (a multicast
//! socket, a port name). Exactly one of them is elected at a time; the
//! rest stay passive until the elected peer leaves. Peers are compared by
//! `Arc` identity, so any peer type works without an equality bound.
//!
//! The election policy is explicit: the first successful [`Election::add`]
//! for a key wins and keeps the claim until removed, after which the
//! next-oldest surviving peer takes over. Callers racing to register a
//! brand-new key must not assume which of them wins, only that exactly
//! one does.
//!
//! One coarse lock serializes the whole registry. Registration and
//! removal are rare next to data-path traffic, which never takes this
//! lock, so contention is a non-issue and per-key locking would buy
//! nothing.
//!
//! This is an ordinary value, constructed by whoever owns the resource
//! domain and passed to the peers that need it; nothing here is global.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct PeerRecord<P: ?Sized> {
    /// Insertion order; the front peer is the elected one.
    peers: Vec<Arc<P>>,
}

/// Thread-safe registry tracking peer sets per resource key.
pub struct Election<P: ?Sized> {
    state: Mutex<HashMap<String, PeerRecord<P>>>,
}

impl<P: ?Sized> Election<P> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Register `peer` under `key`, creating the key's record if absent.
    ///
    /// Re-adding a peer already present is a no-op. Returns a snapshot of
    /// the key's full peer set, elected peer first.
    pub fn add(&self, key: &str, peer: &Arc<P>) -> Vec<Arc<P>> {
        let mut state = self.state.lock();
        let record = state
            .entry(key.to_owned())
            .or_insert_with(|| PeerRecord { peers: Vec::new() });
        if !record.peers.iter().any(|p| Arc::ptr_eq(p, peer)) {
            record.peers.push(Arc::clone(peer));
        }
        record.peers.clone()
    }

    /// Remove `peer` from the key's set.
    ///
    /// The key's record persists even when its peer set empties, so a key
    /// once observed stays queryable for the process lifetime. Removing
    /// from a key that was never created is a lifecycle bug in the caller;
    /// debug builds assert, release builds log and carry on.
    pub fn remove(&self, key: &str, peer: &Arc<P>) {
        let mut state = self.state.lock();
        match state.get_mut(key) {
            Some(record) => {
                record.peers.retain(|p| !Arc::ptr_eq(p, peer));
            }
            None => {
                debug_assert!(false, "removing peer from unknown key {:?}", key);
                log::error!("ignoring removal from unknown election key {:?}", key);
            }
        }
    }

    /// The currently elected peer for `key`, or `None` when the key is
    /// unknown or its peer set is empty.
    pub fn elected(&self, key: &str) -> Option<Arc<P>> {
        let state = self.state.lock();
        state.get(key).and_then(|r| r.peers.first().cloned())
    }

    /// Whether `peer` is the elected owner of `key`.
    ///
    /// The convention for shared resources: the elected peer has exclusive
    /// ownership, every other registered peer treats the resource as
    /// read-only.
    pub fn is_elected(&self, key: &str, peer: &Arc<P>) -> bool {
        match self.elected(key) {
            Some(winner) => Arc::ptr_eq(&winner, peer),
            None => false,
        }
    }

    /// Number of peers registered under `key` (0 for unknown keys).
    pub fn peer_count(&self, key: &str) -> usize {
        let state = self.state.lock();
        state.get(key).map_or(0, |r| r.peers.len())
    }
}

impl<P: ?Sized> Default for Election<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_add_wins() {
        let election: Election<u32> = Election::new();
        let p1 = Arc::new(1u32);
        let p2 = Arc::new(2u32);

        election.add("bus", &p1);
        assert!(election.is_elected("bus", &p1));

        election.add("bus", &p2);
        assert!(election.is_elected("bus", &p1), "newcomer must not usurp");
        assert!(!election.is_elected("bus", &p2));
    }

    #[test]
    fn test_removal_promotes_next_oldest() {
        let election: Election<u32> = Election::new();
        let p1 = Arc::new(1u32);
        let p2 = Arc::new(2u32);
        let p3 = Arc::new(3u32);

        election.add("bus", &p1);
        election.add("bus", &p2);
        election.add("bus", &p3);

        election.remove("bus", &p1);
        assert!(election.is_elected("bus", &p2));

        election.remove("bus", &p2);
        assert!(election.is_elected("bus", &p3));
    }

    #[test]
    fn test_key_persists_after_last_peer() {
        let election: Election<u32> = Election::new();
        let p1 = Arc::new(1u32);
        election.add("bus", &p1);
        election.remove("bus", &p1);

        assert_eq!(election.elected("bus"), None);
        assert_eq!(election.peer_count("bus"), 0);
        // Re-adding after emptiness works with the same semantics.
        election.add("bus", &p1);
        assert!(election.is_elected("bus", &p1));
    }

    #[test]
    fn test_unknown_key_queries_are_none() {
        let election: Election<u32> = Election::new();
        assert_eq!(election.elected("nowhere"), None);
        assert_eq!(election.peer_count("nowhere"), 0);
    }

    #[test]
    fn test_add_returns_snapshot_elected_first() {
        let election: Election<u32> = Election::new();
        let p1 = Arc::new(1u32);
        let p2 = Arc::new(2u32);
        election.add("bus", &p1);
        let peers = election.add("bus", &p2);
        assert_eq!(peers.len(), 2);
        assert!(Arc::ptr_eq(&peers[0], &p1));
    }

    #[test]
    fn test_duplicate_add_is_idempotent() {
        let election: Election<u32> = Election::new();
        let p1 = Arc::new(1u32);
        election.add("bus", &p1);
        let peers = election.add("bus", &p1);
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn test_identity_not_equality() {
        // Two peers with equal payloads are still distinct peers.
        let election: Election<u32> = Election::new();
        let p1 = Arc::new(7u32);
        let p2 = Arc::new(7u32);
        election.add("bus", &p1);
        election.add("bus", &p2);
        assert_eq!(election.peer_count("bus"), 2);
        election.remove("bus", &p1);
        assert!(election.is_elected("bus", &p2));
    }

    #[test]
    fn test_remove_unknown_key_is_defensive_in_release() {
        let election: Election<u32> = Election::new();
        let p1 = Arc::new(1u32);
        if cfg!(debug_assertions) {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                election.remove("never-created", &p1);
            }));
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_concurrent_registration_elects_exactly_one() {
        let election: Arc<Election<usize>> = Arc::new(Election::new());
        let peers: Vec<Arc<usize>> = (0..8).map(Arc::new).collect();

        std::thread::scope(|scope| {
            for peer in &peers {
                let election = Arc::clone(&election);
                scope.spawn(move || {
                    election.add("contested", peer);
                });
            }
        });

        let winners = peers
            .iter()
            .filter(|p| election.is_elected("contested", p))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(election.peer_count("contested"), 8);
    }
}
