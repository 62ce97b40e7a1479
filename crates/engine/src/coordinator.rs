//! Lifecycle bookkeeping around the transaction manager
//!
//! Every begin, commit, rollback and direct write of a repository passes
//! through here, so this is where transaction counters live and where
//! commits are logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use optirepo_concurrency::{CommitOutcome, Isolation, TransactionContext, TransactionManager};
use optirepo_core::{ChangeSet, OptiResult, StatementStore};
use tracing::{info, warn};

/// Transaction coordinator for the repository
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering: they are purely observational
/// and do not synchronize any other memory operations.
pub struct TransactionCoordinator {
    /// Transaction manager for validation and commit serialization
    manager: TransactionManager,
    /// Active transaction count
    active_count: AtomicU64,
    /// Total transactions started
    total_started: AtomicU64,
    /// Total transactions committed
    total_committed: AtomicU64,
    /// Total transactions aborted
    total_aborted: AtomicU64,
}

impl TransactionCoordinator {
    /// Create a coordinator over a store
    pub fn new(store: Arc<dyn StatementStore>) -> Self {
        Self {
            manager: TransactionManager::new(store),
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
        }
    }

    /// Start a new transaction
    pub fn start_transaction(&self, isolation: Isolation) -> TransactionContext {
        self.record_start();
        self.manager.begin(isolation)
    }

    /// Commit a transaction through the concurrency layer
    ///
    /// Only a transaction that was active is counted as finished.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyConflict` on validation failure, or any error
    /// from the store or the hook.
    pub fn commit<F>(&self, txn: &mut TransactionContext, hook: F) -> OptiResult<CommitOutcome>
    where
        F: FnOnce(&CommitOutcome) -> OptiResult<()>,
    {
        let was_active = txn.is_active();
        let result = self.manager.commit(txn, hook);
        if !was_active {
            return result;
        }
        if txn.is_committed() {
            self.record_commit();
            if let Ok(CommitOutcome {
                version: Some(version),
                changes,
            }) = &result
            {
                info!(target: "optirepo::txn", txn_id = txn.txn_id, version, changes = changes.len(), "Transaction committed");
            }
        } else {
            self.record_abort();
        }
        result
    }

    /// Abort a transaction
    pub fn abort(&self, txn: &mut TransactionContext, reason: &str) {
        let was_active = txn.is_active();
        self.manager.abort(txn, reason);
        if was_active {
            self.record_abort();
        }
    }

    /// Apply changes outside of a validated transaction
    ///
    /// Counted as one committed transaction when anything changed.
    ///
    /// # Errors
    ///
    /// Returns any error from the store or the hook.
    pub fn apply_direct<F>(&self, txn_id: u64, changes: &ChangeSet, hook: F) -> OptiResult<CommitOutcome>
    where
        F: FnOnce(&CommitOutcome) -> OptiResult<()>,
    {
        match self.manager.apply_direct(txn_id, changes, hook) {
            Ok(outcome) => {
                if outcome.version.is_some() {
                    self.total_started.fetch_add(1, Ordering::Relaxed);
                    self.total_committed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(target: "optirepo::txn", txn_id, error = %e, "Direct write failed");
                Err(e)
            }
        }
    }

    /// Count a started transaction
    pub fn record_start(&self) {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a committed transaction
    pub fn record_commit(&self) {
        self.finish();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an aborted or rolled back transaction
    pub fn record_abort(&self) {
        self.finish();
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Active count never drops below zero
    fn finish(&self) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |active| {
                Some(active.saturating_sub(1))
            });
    }

    /// Latest committed store version
    pub fn current_version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Allocate a transaction id for a direct write
    pub fn next_txn_id(&self) -> u64 {
        self.manager.next_txn_id()
    }

    /// Commits retained for validation
    pub fn retained_commits(&self) -> usize {
        self.manager.retained_commits()
    }

    /// Snapshot of the counters
    pub fn metrics(&self) -> TransactionMetrics {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        TransactionMetrics {
            active_count: load(&self.active_count),
            total_started: load(&self.total_started),
            total_committed: load(&self.total_committed),
            total_aborted: load(&self.total_aborted),
        }
    }
}

/// Transaction counters of a repository
///
/// Direct writes that changed the store count as started and committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionMetrics {
    /// Transactions begun and not yet finished
    pub active_count: u64,
    /// Transactions begun
    pub total_started: u64,
    /// Transactions committed
    pub total_committed: u64,
    /// Includes rollbacks and validation failures
    pub total_aborted: u64,
}

impl TransactionMetrics {
    /// Committed plus aborted
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_aborted
    }

    fn ratio(count: u64, of: u64) -> f64 {
        if of == 0 {
            0.0
        } else {
            count as f64 / of as f64
        }
    }

    /// Share of started transactions that committed
    pub fn commit_rate(&self) -> f64 {
        Self::ratio(self.total_committed, self.total_started)
    }

    /// Share of started transactions that aborted
    pub fn abort_rate(&self) -> f64 {
        Self::ratio(self.total_aborted, self.total_started)
    }
}
