// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration - single source of truth.
//!
//! All buffer-engine tunables live here. **Never hardcode elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time defaults for queue caps and pool
//!   sizes
//! - **Level 2 (Dynamic)**: [`RuntimeConfig`], a concurrent string store
//!   bootstrapped from `HPORT_*` environment variables
//!
//! Lookups on [`RuntimeConfig`] are lock-free map reads; nothing on the
//! data path touches it after construction time.

use dashmap::DashMap;
use std::sync::Arc;

// =======================================================================
// Level 1: compile-time defaults
// =======================================================================

/// Strict-queue cap for reader buffers. 0 means unbounded: a strict
/// reader that never drains grows without limit, by design.
pub const DEFAULT_MAX_BUFFER: usize = 0;

/// Recycled-slot cap per reader buffer. Slots beyond this are simply
/// dropped instead of hoarded.
pub const DEFAULT_SPARE_LIMIT: usize = 32;

/// Per-connection dispatch channel bound for in-process ports. A full
/// channel blocks the sender of that one connection only.
pub const DEFAULT_DISPATCH_BOUND: usize = 64;

// =======================================================================
// Level 2: runtime overrides
// =======================================================================

/// Environment variable overriding [`DEFAULT_MAX_BUFFER`].
pub const ENV_MAX_BUFFER: &str = "HPORT_MAX_BUFFER";
/// Environment variable overriding [`DEFAULT_SPARE_LIMIT`].
pub const ENV_SPARE_LIMIT: &str = "HPORT_SPARE_LIMIT";
/// Environment variable overriding [`DEFAULT_DISPATCH_BOUND`].
pub const ENV_DISPATCH_BOUND: &str = "HPORT_DISPATCH_BOUND";

/// Runtime tunables store.
///
/// String-keyed so deployment tooling can pass settings through without
/// this crate enumerating them; typed accessors cover the keys the engine
/// itself consumes. Explicitly constructed and passed to whoever needs it
/// (the hub takes one), never a process-wide global.
pub struct RuntimeConfig {
    values: DashMap<String, String>,
}

impl RuntimeConfig {
    /// Empty store: every accessor answers its compile-time default.
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }

    /// Store seeded from the `HPORT_*` environment variables.
    pub fn from_env() -> Self {
        let config = Self::new();
        for key in [ENV_MAX_BUFFER, ENV_SPARE_LIMIT, ENV_DISPATCH_BOUND] {
            if let Ok(value) = std::env::var(key) {
                config.set(key, &value);
            }
        }
        config
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::from_env())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn get_usize(&self, key: &str, default: usize) -> usize {
        match self.values.get(key) {
            Some(value) => match value.parse() {
                Ok(parsed) => parsed,
                Err(_) => {
                    log::warn!("ignoring non-numeric {}={:?}", key, value.as_str());
                    default
                }
            },
            None => default,
        }
    }

    /// Strict-queue cap for reader buffers created from this config.
    pub fn max_buffer(&self) -> usize {
        self.get_usize(ENV_MAX_BUFFER, DEFAULT_MAX_BUFFER)
    }

    /// Recycled-slot cap for reader buffers.
    pub fn spare_limit(&self) -> usize {
        self.get_usize(ENV_SPARE_LIMIT, DEFAULT_SPARE_LIMIT)
    }

    /// Dispatch channel bound for in-process connections.
    pub fn dispatch_bound(&self) -> usize {
        self.get_usize(ENV_DISPATCH_BOUND, DEFAULT_DISPATCH_BOUND).max(1)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
