//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating:
//! 1. Validation (first-committer-wins)
//! 2. Storage application (visibility)
//! 3. The caller's commit hook (named query invalidation, persistence)
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. mark_validating() - Change state to Validating
//! 2. take the commit lock
//! 3. validate_transaction() - Check against the commit log
//! 4. IF conflicts: mark_aborted() and return error
//! 5. IF no changes: mark_committed(), no new version
//! 6. apply at current_version + 1, append to the commit log
//! 7. run the commit hook
//! 8. mark_committed(), release the commit lock
//! ```
//!
//! Steps 3 to 7 run under one lock, so commits are serialized and the hook
//! observes commits in version order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use optirepo_core::{ChangeSet, OptiResult, StatementSource, StatementStore};

use crate::commit_log::{CommitLog, CommitRecord};
use crate::isolation::Isolation;
use crate::transaction::{CommitError, TransactionContext};
use crate::validation::validate_transaction;

/// What a successful commit produced
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// Version the changes were applied at (`None` if nothing changed)
    pub version: Option<u64>,
    /// Effective changes
    pub changes: Arc<ChangeSet>,
}

impl CommitOutcome {
    fn empty() -> Self {
        CommitOutcome {
            version: None,
            changes: Arc::new(ChangeSet::new()),
        }
    }
}

/// Manages transaction lifecycle and atomic commits
///
/// One commit is in flight at a time. Transactions register at begin so the
/// commit log and old statement versions are kept while they may need them.
pub struct TransactionManager {
    store: Arc<dyn StatementStore>,

    /// Next transaction ID
    next_txn_id: AtomicU64,

    /// Commit log, also serving as the commit lock
    commit_lock: Mutex<CommitLog>,

    /// Active transactions and the version they started at
    active: DashMap<u64, u64>,
}

impl TransactionManager {
    /// Create a transaction manager over a store
    pub fn new(store: Arc<dyn StatementStore>) -> Self {
        TransactionManager {
            store,
            next_txn_id: AtomicU64::new(1),
            commit_lock: Mutex::new(CommitLog::new()),
            active: DashMap::new(),
        }
    }

    /// The managed store
    pub fn store(&self) -> &Arc<dyn StatementStore> {
        &self.store
    }

    /// Get current committed version
    pub fn current_version(&self) -> u64 {
        self.store.current_version()
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Number of registered transactions
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of commits retained for validation
    pub fn retained_commits(&self) -> usize {
        self.commit_lock.lock().len()
    }

    /// Begin a transaction
    ///
    /// The start version is read and registered under the commit lock, so
    /// no commit can slip between them and be pruned early.
    pub fn begin(&self, isolation: Isolation) -> TransactionContext {
        let txn_id = self.next_txn_id();
        let _log = self.commit_lock.lock();
        let start_version = self.store.current_version();
        self.active.insert(txn_id, start_version);

        let view = if isolation.read_snapshot {
            self.store.snapshot(start_version)
        } else {
            self.store.live()
        };
        debug!(target: "optirepo::txn", txn_id, start_version, ?isolation, "Transaction started");
        TransactionContext::new(txn_id, start_version, isolation, view)
    }

    /// Commit a transaction atomically
    ///
    /// `hook` runs under the commit lock once the changes are visible. An
    /// error from the hook is returned to the caller but does not undo the
    /// commit.
    ///
    /// # Arguments
    ///
    /// * `txn` - Transaction to commit (must be in Active state)
    /// * `hook` - Post-commit work (invalidation, persistence)
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict` if validation fails; the transaction is aborted
    /// - `TransactionNotActive` if the transaction is not active
    /// - any error from the store or the hook
    pub fn commit<F>(&self, txn: &mut TransactionContext, hook: F) -> OptiResult<CommitOutcome>
    where
        F: FnOnce(&CommitOutcome) -> OptiResult<()>,
    {
        txn.mark_validating()?;

        let result = self.commit_validating(txn, hook);
        match &result {
            Ok(outcome) => debug!(
                target: "optirepo::txn",
                txn_id = txn.txn_id,
                version = ?outcome.version,
                changes = outcome.changes.len(),
                "Transaction committed"
            ),
            Err(e) if e.is_conflict() => warn!(
                target: "optirepo::txn",
                txn_id = txn.txn_id,
                error = %e,
                "Transaction aborted on conflict"
            ),
            Err(e) => warn!(target: "optirepo::txn", txn_id = txn.txn_id, error = %e, "Commit failed"),
        }
        self.release(txn.txn_id);
        result
    }

    fn commit_validating<F>(&self, txn: &mut TransactionContext, hook: F) -> OptiResult<CommitOutcome>
    where
        F: FnOnce(&CommitOutcome) -> OptiResult<()>,
    {
        let mut log = self.commit_lock.lock();

        let validation = match validate_transaction(txn, &log, self.store.as_ref()) {
            Ok(validation) => validation,
            Err(e) => {
                let _ = txn.mark_aborted(format!("validation error: {e}"));
                return Err(e);
            }
        };
        if !validation.is_valid() {
            let _ = txn.mark_aborted(format!("conflict: {validation}"));
            return Err(CommitError::ValidationFailed {
                txn_id: txn.txn_id,
                result: validation,
            }
            .into());
        }

        let changes = txn.take_changes();
        if changes.is_empty() {
            txn.mark_committed()?;
            return Ok(CommitOutcome::empty());
        }

        let outcome = match self.apply_locked(&mut log, txn.txn_id, &changes) {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = txn.mark_aborted(format!("storage error: {e}"));
                return Err(CommitError::Storage {
                    txn_id: txn.txn_id,
                    message: e.to_string(),
                }
                .into());
            }
        };
        txn.mark_committed()?;
        hook(&outcome)?;
        Ok(outcome)
    }

    /// Apply changes without validation
    ///
    /// Used for auto-commit writes and unisolated transactions. The commit
    /// still enters the log, so validating readers see it.
    ///
    /// # Errors
    ///
    /// Returns any error from the store or the hook.
    pub fn apply_direct<F>(&self, txn_id: u64, changes: &ChangeSet, hook: F) -> OptiResult<CommitOutcome>
    where
        F: FnOnce(&CommitOutcome) -> OptiResult<()>,
    {
        let mut log = self.commit_lock.lock();
        let changes = self.effective_changes(changes)?;
        if changes.is_empty() {
            return Ok(CommitOutcome::empty());
        }
        let outcome = self.apply_locked(&mut log, txn_id, &changes)?;
        debug!(
            target: "optirepo::txn",
            txn_id,
            version = ?outcome.version,
            changes = outcome.changes.len(),
            "Changes applied directly"
        );
        hook(&outcome)?;
        Ok(outcome)
    }

    /// Drop removals of absent and additions of present statements
    ///
    /// Must be called under the commit lock.
    fn effective_changes(&self, changes: &ChangeSet) -> OptiResult<ChangeSet> {
        let live = self.store.live();
        let mut effective = ChangeSet::new();
        for statement in changes.removed() {
            if live.contains(statement)? {
                effective.remove(statement.clone());
            }
        }
        for statement in changes.added() {
            if !live.contains(statement)? {
                effective.add(statement.clone());
            }
        }
        Ok(effective)
    }

    fn apply_locked(
        &self,
        log: &mut CommitLog,
        txn_id: u64,
        changes: &ChangeSet,
    ) -> OptiResult<CommitOutcome> {
        let version = self.store.current_version() + 1;
        let effective = Arc::new(self.store.apply(version, changes)?);
        log.append(CommitRecord {
            version,
            txn_id,
            changes: Arc::clone(&effective),
        });
        Ok(CommitOutcome {
            version: Some(version),
            changes: effective,
        })
    }

    /// Abort a transaction, discarding its buffered changes
    pub fn abort(&self, txn: &mut TransactionContext, reason: impl Into<String>) {
        let reason = reason.into();
        if txn.mark_aborted(reason.as_str()).is_ok() {
            debug!(target: "optirepo::txn", txn_id = txn.txn_id, %reason, "Transaction aborted");
        }
        self.release(txn.txn_id);
    }

    /// Unregister a transaction and prune what no one needs anymore
    ///
    /// Commits and statement versions older than the oldest active start
    /// version (or the current version when nothing is active) are dropped.
    pub fn release(&self, txn_id: u64) {
        let mut log = self.commit_lock.lock();
        self.active.remove(&txn_id);

        let oldest = self
            .active
            .iter()
            .map(|entry| *entry.value())
            .min()
            .unwrap_or_else(|| self.store.current_version());
        if log.prune(oldest) > 0 {
            let dropped = self.store.vacuum(oldest);
            debug!(target: "optirepo::txn", oldest, dropped, "Vacuumed statement versions");
        }
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("next_txn_id", &self.next_txn_id)
            .field("active", &self.active.len())
            .finish()
    }
}
