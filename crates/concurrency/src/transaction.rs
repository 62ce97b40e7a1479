//! Transaction context for OCC
//!
//! This module implements the per-transaction change log for optimistic
//! concurrency control. TransactionContext tracks pending additions and
//! removals, every pattern or query read, and the transaction's lifecycle,
//! enabling validation at commit time.
//!
//! # Read-your-writes
//!
//! Reads go through [`TransactionView`], which overlays the transaction's
//! own changes on its base view: pending removals are never returned and
//! pending additions always are.
//!
//! # Net changes
//!
//! Additions of statements already visible and removals of statements not
//! visible are not recorded (they are reads of that statement instead). An
//! addition followed by a removal of the same statement, or the reverse,
//! leaves no trace in the change log.

use std::sync::Arc;

use thiserror::Error;

use optirepo_core::{ChangeSet, OptiError, OptiResult, Statement, StatementPattern, StatementSource};
use optirepo_query::QueryPlan;

use crate::isolation::Isolation;
use crate::validation::ValidationResult;

/// Error type for commit failures
///
/// - All-or-nothing commit: a transaction either commits or aborts entirely
/// - First-committer-wins: the transaction that commits second is the one
///   that fails
#[derive(Debug, Clone, Error)]
pub enum CommitError {
    /// Transaction aborted due to validation conflicts
    #[error("Commit of transaction {txn_id} failed: {result}")]
    ValidationFailed {
        /// Transaction that was aborted
        txn_id: u64,
        /// Conflicts found
        result: ValidationResult,
    },

    /// Transaction was not in the correct state for commit
    #[error("Invalid state for transaction {txn_id}: {state}")]
    InvalidState {
        /// Transaction identifier
        txn_id: u64,
        /// State description
        state: String,
    },

    /// Reading or writing the store failed during commit
    #[error("Storage error during commit of transaction {txn_id}: {message}")]
    Storage {
        /// Transaction identifier
        txn_id: u64,
        /// Underlying error
        message: String,
    },
}

impl From<CommitError> for OptiError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed { txn_id, result } => OptiError::ConcurrencyConflict {
                txn_id,
                reason: result.to_string(),
            },
            CommitError::InvalidState { txn_id, state } => {
                OptiError::TransactionNotActive { txn_id, state }
            }
            CommitError::Storage { message, .. } => OptiError::corruption(message),
        }
    }
}

/// Summary of pending operations that would be discarded on abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperations {
    /// Number of pending additions
    pub additions: usize,
    /// Number of pending removals
    pub removals: usize,
}

impl PendingOperations {
    /// Total number of pending operations
    pub fn total(&self) -> usize {
        self.additions + self.removals
    }

    /// Check if there are no pending operations
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Validating` (begin commit)
/// - `Validating` → `Committed` (validation passed)
/// - `Validating` → `Aborted` (conflict detected)
/// - `Active` → `Aborted` (rollback or error)
///
/// Terminal states: `Committed`, `Aborted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction is being validated for conflicts
    Validating,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// One read recorded for validation
#[derive(Debug, Clone)]
pub enum ReadRecord {
    /// Direct statement match
    Pattern {
        /// Pattern read
        pattern: StatementPattern,
        /// Committed version the read observed
        version: u64,
    },
    /// Query evaluation
    Query {
        /// Dependencies of the evaluated query
        plan: Arc<QueryPlan>,
        /// Committed version the read observed
        version: u64,
    },
}

impl ReadRecord {
    /// Committed version the read observed
    pub fn version(&self) -> u64 {
        match self {
            ReadRecord::Pattern { version, .. } | ReadRecord::Query { version, .. } => *version,
        }
    }
}

/// Transaction context for optimistic concurrency control
///
/// # Lifecycle
///
/// 1. **BEGIN**: created by `TransactionManager::begin()`, status `Active`
/// 2. **READ/WRITE**: `match_pattern()`, `contains()`, `add()`, `remove()`
/// 3. **VALIDATE**: `mark_validating()`, checked against the commit log
/// 4. **COMMIT/ABORT**: `mark_committed()` or `mark_aborted()`
pub struct TransactionContext {
    // Identity
    /// Unique transaction ID
    pub txn_id: u64,

    // Snapshot isolation
    /// Committed version at transaction start
    ///
    /// Commits after this version are checked for conflicts.
    pub start_version: u64,

    isolation: Isolation,

    /// Base read view (pinned snapshot or live store)
    view: Box<dyn StatementSource>,

    // Operation tracking
    /// Buffered additions and removals
    changes: ChangeSet,

    /// Changes already applied to the store (unisolated writes), kept so
    /// rollback can undo them
    applied: ChangeSet,

    /// Patterns and queries read, with the version each observed
    read_set: Vec<ReadRecord>,

    // State
    /// Current transaction status
    pub status: TransactionStatus,
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("isolation", &self.isolation)
            .field("changes", &self.changes.len())
            .field("reads", &self.read_set.len())
            .field("status", &self.status)
            .finish()
    }
}

impl TransactionContext {
    /// Create a new transaction context
    ///
    /// # Arguments
    ///
    /// * `txn_id` - Unique transaction identifier
    /// * `start_version` - Committed version at transaction start
    /// * `isolation` - Settings the transaction runs under
    /// * `view` - Base read view (a snapshot at `start_version` or the live store)
    pub fn new(
        txn_id: u64,
        start_version: u64,
        isolation: Isolation,
        view: Box<dyn StatementSource>,
    ) -> Self {
        TransactionContext {
            txn_id,
            start_version,
            isolation,
            view,
            changes: ChangeSet::new(),
            applied: ChangeSet::new(),
            read_set: Vec::new(),
            status: TransactionStatus::Active,
        }
    }

    /// Settings the transaction runs under
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    // === Read Operations ===

    /// Read-your-writes view of the transaction
    pub fn view(&self) -> TransactionView<'_> {
        TransactionView {
            base: self.view.as_ref(),
            layers: [&self.applied, &self.changes],
        }
    }

    /// Committed version reads currently observe
    pub fn read_version(&self) -> u64 {
        self.view.version()
    }

    /// All statements matching the pattern, recorded as a read
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotActive` if the transaction is not active, or
    /// any error from the base view.
    pub fn match_pattern(&mut self, pattern: &StatementPattern) -> OptiResult<Vec<Statement>> {
        self.ensure_active()?;
        let version = self.read_version();
        let found = self.view().match_pattern(pattern)?;
        self.record_pattern(pattern.clone(), version);
        Ok(found)
    }

    /// Check if the statement is visible, recorded as a read
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotActive` if the transaction is not active, or
    /// any error from the base view.
    pub fn contains(&mut self, statement: &Statement) -> OptiResult<bool> {
        self.ensure_active()?;
        let version = self.read_version();
        let found = self.view().contains(statement)?;
        self.record_pattern(StatementPattern::exact(statement), version);
        Ok(found)
    }

    /// Record a direct pattern read observed at `version`
    pub fn record_pattern(&mut self, pattern: StatementPattern, version: u64) {
        self.read_set.push(ReadRecord::Pattern { pattern, version });
    }

    /// Record a query evaluation observed at `version`
    pub fn record_query(&mut self, plan: Arc<QueryPlan>, version: u64) {
        self.read_set.push(ReadRecord::Query { plan, version });
    }

    /// Reads recorded so far
    pub fn read_set(&self) -> &[ReadRecord] {
        &self.read_set
    }

    // === Write Operations ===

    /// Buffer an addition
    ///
    /// Returns `true` if the transaction's net changes were modified. Adding
    /// a statement that is already visible only records a read of it.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotActive` if the transaction is not active.
    pub fn add(&mut self, statement: Statement) -> OptiResult<bool> {
        self.ensure_active()?;
        if self.changes.is_removed(&statement) {
            return Ok(self.changes.add(statement));
        }
        if self.changes.is_added(&statement) {
            return Ok(false);
        }
        if self.observe(&statement, true)? {
            return Ok(false);
        }
        Ok(self.changes.add(statement))
    }

    /// Buffer a removal
    ///
    /// Returns `true` if the transaction's net changes were modified.
    /// Removing a statement that is not visible only records a read of it.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotActive` if the transaction is not active.
    pub fn remove(&mut self, statement: Statement) -> OptiResult<bool> {
        self.ensure_active()?;
        if self.changes.is_added(&statement) {
            return Ok(self.changes.remove(statement));
        }
        if self.changes.is_removed(&statement) {
            return Ok(false);
        }
        if !self.observe(&statement, false)? {
            return Ok(false);
        }
        Ok(self.changes.remove(statement))
    }

    /// Visibility check behind a write
    ///
    /// A write that turns out to be a no-op (adding a visible statement,
    /// removing an invisible one) is kept as a read of that statement.
    fn observe(&mut self, statement: &Statement, adding: bool) -> OptiResult<bool> {
        let version = self.read_version();
        let visible = self.view().contains(statement)?;
        if visible == adding {
            self.record_pattern(StatementPattern::exact(statement), version);
        }
        Ok(visible)
    }

    /// Buffered changes
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Take the buffered changes, leaving the log empty
    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.changes)
    }

    /// Remember changes applied directly to the store
    pub fn record_applied(&mut self, applied: &ChangeSet) {
        for statement in applied.removed() {
            self.applied.remove(statement.clone());
        }
        for statement in applied.added() {
            self.applied.add(statement.clone());
        }
    }

    /// Take the directly applied changes
    pub fn take_applied(&mut self) -> ChangeSet {
        std::mem::take(&mut self.applied)
    }

    // === State Management ===

    /// Check if transaction is in Active state
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Check if transaction is committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed)
    }

    /// Check if transaction is aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Check if transaction can accept operations
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotActive` if not in `Active` state.
    pub fn ensure_active(&self) -> OptiResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(OptiError::TransactionNotActive {
                txn_id: self.txn_id,
                state: format!("{:?}", self.status),
            })
        }
    }

    /// Transition to Validating state
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if not in `Active` state.
    ///
    /// # State Transition
    /// `Active` → `Validating`
    pub fn mark_validating(&mut self) -> Result<(), CommitError> {
        if !self.is_active() {
            return Err(CommitError::InvalidState {
                txn_id: self.txn_id,
                state: format!("cannot commit from {:?}", self.status),
            });
        }
        self.status = TransactionStatus::Validating;
        Ok(())
    }

    /// Transition to Committed state
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if not in `Validating` state.
    ///
    /// # State Transition
    /// `Validating` → `Committed`
    pub fn mark_committed(&mut self) -> Result<(), CommitError> {
        match &self.status {
            TransactionStatus::Validating => {
                self.status = TransactionStatus::Committed;
                Ok(())
            }
            other => Err(CommitError::InvalidState {
                txn_id: self.txn_id,
                state: format!("cannot mark committed from {other:?}"),
            }),
        }
    }

    /// Abort the transaction, discarding buffered changes
    ///
    /// Can be called from `Active` (rollback) or `Validating` (conflict
    /// detected). The read set is kept for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if already `Committed` or `Aborted`.
    ///
    /// # State Transitions
    /// - `Active` → `Aborted`
    /// - `Validating` → `Aborted`
    pub fn mark_aborted(&mut self, reason: impl Into<String>) -> Result<(), CommitError> {
        match &self.status {
            TransactionStatus::Committed | TransactionStatus::Aborted { .. } => {
                Err(CommitError::InvalidState {
                    txn_id: self.txn_id,
                    state: format!("cannot abort from {:?}", self.status),
                })
            }
            _ => {
                self.status = TransactionStatus::Aborted {
                    reason: reason.into(),
                };
                self.changes.clear();
                Ok(())
            }
        }
    }

    /// Get summary of pending operations
    pub fn pending_operations(&self) -> PendingOperations {
        PendingOperations {
            additions: self.changes.added().len(),
            removals: self.changes.removed().len(),
        }
    }

    /// Check if there are buffered changes
    pub fn has_pending_operations(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Get the abort reason, if aborted
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Base view with the transaction's own changes layered on top
pub struct TransactionView<'a> {
    base: &'a dyn StatementSource,
    layers: [&'a ChangeSet; 2],
}

impl StatementSource for TransactionView<'_> {
    fn match_pattern(&self, pattern: &StatementPattern) -> OptiResult<Vec<Statement>> {
        let mut found: Vec<Statement> = self
            .base
            .match_pattern(pattern)?
            .into_iter()
            .filter(|s| !self.layers.iter().any(|layer| layer.is_removed(s)))
            .collect();
        for layer in self.layers {
            for statement in layer.added() {
                if pattern.matches(statement) && !found.contains(statement) {
                    found.push(statement.clone());
                }
            }
        }
        Ok(found)
    }

    fn contains(&self, statement: &Statement) -> OptiResult<bool> {
        if self.layers.iter().any(|layer| layer.is_removed(statement)) {
            return Ok(false);
        }
        if self.layers.iter().any(|layer| layer.is_added(statement)) {
            return Ok(true);
        }
        self.base.contains(statement)
    }

    fn version(&self) -> u64 {
        self.base.version()
    }
}
