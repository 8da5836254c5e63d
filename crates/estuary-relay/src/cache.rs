// SPDX-FileCopyrightText: 2026 Estuary Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-scoped cache of mappings verified alive since startup.
//!
//! Purely an optimization that skips the liveness probe on warm keys.
//! Never persisted: every key is cold after a restart and must be
//! verified against the destination before use.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use estuary_core::SourceKey;

/// Set of [`SourceKey`]s whose destination topic was confirmed alive in
/// this process lifetime.
#[derive(Debug, Default)]
pub struct ValidityCache {
    inner: Mutex<HashSet<SourceKey>>,
}

impl ValidityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: SourceKey) -> bool {
        self.set().contains(&key)
    }

    /// Marks a key as verified. Call only after a probe or a creation
    /// has succeeded.
    pub fn mark(&self, key: SourceKey) {
        self.set().insert(key);
    }

    pub fn invalidate(&self, key: SourceKey) {
        self.set().remove(&key);
    }

    // A poisoned lock only means a panicking thread held the guard; the
    // set itself is always in a usable state.
    fn set(&self) -> MutexGuard<'_, HashSet<SourceKey>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
