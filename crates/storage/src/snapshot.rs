//! Read views over a MemoryStore
//!
//! - [`StoreSnapshot`] is pinned to one committed version. Commits made
//!   after it was taken are never visible through it.
//! - [`LiveView`] always reads the latest committed version.
//!
//! # Design Notes
//!
//! - **No copying**: both views share the store's table and filter by
//!   version at read time
//! - **Retention**: a snapshot stays exact only while its version is at or
//!   above the store's vacuum threshold; the transaction manager keeps that
//!   threshold at or below the oldest active transaction

use optirepo_core::{OptiResult, Statement, StatementPattern, StatementSource, StatementStore};

use crate::memory::MemoryStore;

/// A read view pinned to one committed version
///
/// # Example
///
/// ```ignore
/// let store = MemoryStore::new();
/// let snapshot = store.snapshot_view(store.current_version());
///
/// // Commits after the snapshot was taken are not visible
/// store.apply(1, &changes)?;
/// assert!(snapshot.match_pattern(&StatementPattern::any())?.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    store: MemoryStore,
    version: u64,
}

impl StoreSnapshot {
    /// Create a view of `store` at `version`
    ///
    /// Typically called through `MemoryStore::snapshot_view()`.
    pub fn new(store: MemoryStore, version: u64) -> Self {
        Self { store, version }
    }
}

impl StatementSource for StoreSnapshot {
    fn match_pattern(&self, pattern: &StatementPattern) -> OptiResult<Vec<Statement>> {
        self.store.match_at(pattern, self.version)
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// A read view that follows the latest committed version
#[derive(Debug, Clone)]
pub struct LiveView {
    store: MemoryStore,
}

impl LiveView {
    /// Create a live view of `store`
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

impl StatementSource for LiveView {
    fn match_pattern(&self, pattern: &StatementPattern) -> OptiResult<Vec<Statement>> {
        Ok(self.store.match_current(pattern).1)
    }

    fn version(&self) -> u64 {
        self.store.current_version()
    }
}
