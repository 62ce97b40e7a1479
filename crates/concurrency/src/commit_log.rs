//! Log of recently committed change sets
//!
//! Validation compares a committing transaction against every change set
//! committed after the versions it read. The log keeps those change sets
//! until no active transaction can still need them.

use std::collections::VecDeque;
use std::sync::Arc;

use optirepo_core::ChangeSet;

/// One committed change set
#[derive(Debug, Clone)]
pub struct CommitRecord {
    /// Version the changes were applied at
    pub version: u64,
    /// Transaction that committed them
    pub txn_id: u64,
    /// Effective changes
    pub changes: Arc<ChangeSet>,
}

/// Committed change sets in version order
#[derive(Debug, Default)]
pub struct CommitLog {
    records: VecDeque<CommitRecord>,
}

impl CommitLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit
    ///
    /// Versions must be appended in increasing order.
    pub fn append(&mut self, record: CommitRecord) {
        debug_assert!(self
            .records
            .back()
            .map_or(true, |last| last.version < record.version));
        self.records.push_back(record);
    }

    /// Commits with a version greater than `version`
    pub fn since(&self, version: u64) -> impl Iterator<Item = &CommitRecord> {
        let start = self.records.partition_point(|r| r.version <= version);
        self.records.range(start..)
    }

    /// Drop commits at or below `oldest`
    ///
    /// Returns the number of dropped records.
    pub fn prune(&mut self, oldest: u64) -> usize {
        let count = self.records.partition_point(|r| r.version <= oldest);
        self.records.drain(..count);
        count
    }

    /// Number of retained commits
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no commit is retained
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
