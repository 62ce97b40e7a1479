//! Transaction validation for OCC
//!
//! A committing transaction is compared against every change set committed
//! after the versions it observed:
//! - Snapshot isolation: the transaction's own changes must not touch a
//!   statement another transaction changed since it started, no committed
//!   change may fall within a recorded pattern read, and no committed change
//!   set may alter the result of a recorded query
//! - Serializable: query reads are checked by potential overlap, so any
//!   committed statement matching one of the query's templates conflicts
//!   even when it does not complete a join
//!
//! The first committer wins; the transaction being validated is the one
//! that aborts.

use std::fmt;

use optirepo_core::{OptiResult, Statement, StatementPattern, StatementStore};

use crate::commit_log::{CommitLog, CommitRecord};
use crate::transaction::{ReadRecord, TransactionContext};

/// Types of conflicts that can occur during transaction validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// Write-write conflict: a statement this transaction changes was
    /// changed by a commit after it started
    WriteWrite {
        /// The contested statement
        statement: Statement,
        /// Version of the competing commit
        version: u64,
    },

    /// A committed change falls within a pattern this transaction read
    ReadPattern {
        /// The pattern that was read
        pattern: StatementPattern,
        /// The committed statement that matches it
        statement: Statement,
        /// Version of the competing commit
        version: u64,
    },

    /// A committed change set affects a query this transaction evaluated
    ReadQuery {
        /// Version of the competing commit
        version: u64,
    },
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::WriteWrite { statement, version } => {
                write!(f, "{statement} was modified at version {version}")
            }
            ConflictType::ReadPattern {
                pattern,
                statement,
                version,
            } => write!(
                f,
                "read of {pattern} invalidated by {statement} at version {version}"
            ),
            ConflictType::ReadQuery { version } => {
                write!(f, "query result invalidated at version {version}")
            }
        }
    }
}

/// Result of transaction validation
///
/// Accumulates all conflicts found during validation.
/// A transaction commits only if is_valid() returns true.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Create a validation result with a single conflict
    pub fn conflict(conflict: ConflictType) -> Self {
        ValidationResult {
            conflicts: vec![conflict],
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.conflicts.extend(other.conflicts);
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conflicts.as_slice() {
            [] => write!(f, "no conflicts"),
            [first] => write!(f, "{first}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}

fn competing<'a>(
    txn: &'a TransactionContext,
    log: &'a CommitLog,
    since: u64,
) -> impl Iterator<Item = &'a CommitRecord> {
    log.since(since).filter(move |record| record.txn_id != txn.txn_id)
}

/// Check the transaction's own changes against commits since it started
///
/// Only the first conflicting commit per statement is reported.
pub fn validate_write_set(txn: &TransactionContext, log: &CommitLog) -> ValidationResult {
    let mut result = ValidationResult::ok();
    for statement in txn.changes().iter() {
        if let Some(record) =
            competing(txn, log, txn.start_version).find(|r| r.changes.touches(statement))
        {
            result.merge(ValidationResult::conflict(ConflictType::WriteWrite {
                statement: statement.clone(),
                version: record.version,
            }));
        }
    }
    result
}

/// Check recorded reads against commits after the version each observed
///
/// Query reads are checked with the join-aware plan test: added statements
/// against the state right after the competing commit, removed statements
/// against the state right before it. With `overlap` set, any committed
/// statement one of the query's templates could match is a conflict.
///
/// # Errors
///
/// Returns an error if reading the store fails.
pub fn validate_read_set(
    txn: &TransactionContext,
    log: &CommitLog,
    store: &dyn StatementStore,
    overlap: bool,
) -> OptiResult<ValidationResult> {
    let mut result = ValidationResult::ok();
    for read in txn.read_set() {
        match read {
            ReadRecord::Pattern { pattern, version } => {
                for record in competing(txn, log, *version) {
                    if let Some(statement) = record.changes.iter().find(|s| pattern.matches(s)) {
                        result.merge(ValidationResult::conflict(ConflictType::ReadPattern {
                            pattern: pattern.clone(),
                            statement: statement.clone(),
                            version: record.version,
                        }));
                        break;
                    }
                }
            }
            ReadRecord::Query { plan, version } => {
                for record in competing(txn, log, *version) {
                    let affected = if overlap {
                        record.changes.iter().any(|s| plan.may_match(s))
                    } else {
                        let before = store.snapshot(record.version - 1);
                        let after = store.snapshot(record.version);
                        plan.is_affected_by(&record.changes, before.as_ref(), after.as_ref())?
                    };
                    if affected {
                        result.merge(ValidationResult::conflict(ConflictType::ReadQuery {
                            version: record.version,
                        }));
                        break;
                    }
                }
            }
        }
    }
    Ok(result)
}

/// Validate a transaction under its isolation settings
///
/// Write-write and read checks run whenever the transaction validates at
/// all, including for read-only transactions. Serializable widens query
/// reads to potential overlap.
///
/// # Errors
///
/// Returns an error if reading the store fails.
pub fn validate_transaction(
    txn: &TransactionContext,
    log: &CommitLog,
    store: &dyn StatementStore,
) -> OptiResult<ValidationResult> {
    let isolation = txn.isolation();
    let mut result = ValidationResult::ok();
    if isolation.snapshot {
        result.merge(validate_write_set(txn, log));
    }
    if isolation.validates() {
        result.merge(validate_read_set(txn, log, store, isolation.serializable)?);
    }
    Ok(result)
}
