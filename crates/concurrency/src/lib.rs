//! Concurrency layer for optirepo
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: buffered changes and read set tracking
//! - Isolation: snapshot reads, isolated writes, read validation
//! - Conflict detection at commit time against a log of recent commits
//! - TransactionManager: serialized commits with a post-commit hook

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commit_log;
pub mod isolation;
pub mod manager;
pub mod transaction;
pub mod validation;

pub use commit_log::{CommitLog, CommitRecord};
pub use isolation::Isolation;
pub use manager::{CommitOutcome, TransactionManager};
pub use transaction::{
    CommitError, PendingOperations, ReadRecord, TransactionContext, TransactionStatus,
    TransactionView,
};
pub use validation::{
    validate_read_set, validate_transaction, validate_write_set, ConflictType, ValidationResult,
};
