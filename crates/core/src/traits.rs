//! Core traits for statement storage and read views
//!
//! This module defines the StatementStore and StatementSource traits that
//! let the concurrency layer and the named query engine run against any
//! versioned store implementation.

use crate::error::OptiResult;
use crate::model::{ChangeSet, Statement, StatementPattern};

/// A consistent read view over statements
///
/// Implementations are either pinned to one store version (snapshots) or
/// follow the latest committed version (live views).
///
/// Thread safety: views may be shared across threads (requires Send + Sync).
pub trait StatementSource: Send + Sync {
    /// All statements matching the pattern
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    fn match_pattern(&self, pattern: &StatementPattern) -> OptiResult<Vec<Statement>>;

    /// Check if the view contains the statement
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    fn contains(&self, statement: &Statement) -> OptiResult<bool> {
        Ok(!self
            .match_pattern(&StatementPattern::exact(statement))?
            .is_empty())
    }

    /// Version this view reads at
    ///
    /// For live views this is the latest committed version at call time.
    fn version(&self) -> u64;
}

/// Versioned, multi-reader statement storage
///
/// Every committed change set is applied at a new version; readers can ask
/// for the state at any version that has not been vacuumed.
///
/// Thread safety: All methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait StatementStore: Send + Sync {
    /// Get current committed version
    fn current_version(&self) -> u64;

    /// Statements matching the pattern as of `version`
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn match_at(&self, pattern: &StatementPattern, version: u64) -> OptiResult<Vec<Statement>>;

    /// A read view pinned to `version`
    fn snapshot(&self, version: u64) -> Box<dyn StatementSource>;

    /// A read view following the latest committed version
    fn live(&self) -> Box<dyn StatementSource>;

    /// Apply removals then additions at `version`
    ///
    /// `version` must be greater than the current version. Returns the
    /// effective change set: removals of absent statements and additions of
    /// present ones are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the version does not advance or storage fails.
    fn apply(&self, version: u64, changes: &ChangeSet) -> OptiResult<ChangeSet>;

    /// Drop statement versions that no view at or after `oldest_visible` can see
    ///
    /// Returns the number of dropped entries.
    fn vacuum(&self, oldest_visible: u64) -> usize;
}
