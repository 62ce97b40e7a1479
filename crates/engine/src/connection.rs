//! Connections: one caller's view of the repository
//!
//! A connection starts in auto-commit mode, where every write is committed
//! on its own and reads see the latest committed state. Turning auto-commit
//! off starts a transaction; `commit` and `rollback` end it and start the
//! next one.
//!
//! How a transaction reads and writes follows the repository settings:
//! - `read_snapshot`: reads see the start version, otherwise the latest commit
//! - `snapshot`: writes are buffered until commit and reads are validated
//!   then, otherwise writes are applied at once and undone on rollback
//! - `serializable`: query reads conflict with any overlapping commit

use std::sync::Arc;

use tracing::{debug, warn};

use optirepo_concurrency::{CommitOutcome, TransactionContext};
use optirepo_core::{
    ChangeSet, OptiError, OptiResult, Statement, StatementPattern, StatementSource,
    StatementStore,
};
use optirepo_query::{ParsedQuery, QueryLanguage, Solution};

use crate::repository::RepositoryInner;

/// A connection to a repository
///
/// Owned by one thread at a time. Dropping a connection rolls back any
/// open transaction.
pub struct Connection {
    repo: Arc<RepositoryInner>,
    auto_commit: bool,
    /// Open transaction; `None` in auto-commit mode or once the repository
    /// is closed
    txn: Option<TransactionContext>,
    closed: bool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("auto_commit", &self.auto_commit)
            .field("txn", &self.txn)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Connection {
    pub(crate) fn new(repo: Arc<RepositoryInner>) -> Self {
        Connection {
            repo,
            auto_commit: true,
            txn: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> OptiResult<()> {
        if self.closed {
            return Err(OptiError::Closed);
        }
        self.repo.ensure_open()
    }

    /// The open transaction, `None` in auto-commit mode
    fn txn_mut(&mut self) -> OptiResult<Option<&mut TransactionContext>> {
        if self.auto_commit {
            return Ok(None);
        }
        self.txn.as_mut().map(Some).ok_or(OptiError::Closed)
    }

    fn begin(&self) -> TransactionContext {
        self.repo
            .coordinator
            .start_transaction(self.repo.config.isolation())
    }

    // ========================================================================
    // Transaction control
    // ========================================================================

    /// Whether every write commits on its own
    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Switch auto-commit mode
    ///
    /// Turning auto-commit off starts a transaction. Turning it on commits
    /// the open transaction first; if that commit fails the error is
    /// returned, the buffered changes are gone, and the connection stays in
    /// manual mode with a fresh transaction.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyConflict` if the pending commit fails validation,
    /// or `Closed` if the connection or repository is closed.
    pub fn set_auto_commit(&mut self, auto_commit: bool) -> OptiResult<()> {
        self.ensure_open()?;
        match (auto_commit, self.auto_commit) {
            (false, true) => {
                self.txn = Some(self.begin());
                self.auto_commit = false;
                Ok(())
            }
            (true, false) => {
                if let Some(txn) = self.txn.take() {
                    if let Err(e) = self.commit_txn(txn) {
                        self.txn = Some(self.begin());
                        return Err(e);
                    }
                }
                self.auto_commit = true;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Commit the open transaction and start the next one
    ///
    /// A no-op in auto-commit mode. On failure the transaction is rolled
    /// back and a fresh one is started.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyConflict` if validation fails, or any error from
    /// the store or persistence.
    pub fn commit(&mut self) -> OptiResult<()> {
        self.ensure_open()?;
        if self.auto_commit {
            return Ok(());
        }
        let Some(txn) = self.txn.take() else {
            return Err(OptiError::Closed);
        };
        let result = self.commit_txn(txn);
        self.txn = Some(self.begin());
        result
    }

    fn commit_txn(&self, mut txn: TransactionContext) -> OptiResult<()> {
        let repo = &self.repo;
        repo.coordinator
            .commit(&mut txn, |outcome| repo.after_commit(outcome))
            .map(|_| ())
    }

    /// Discard the open transaction and start the next one
    ///
    /// Store content and named query metadata are left as they were before
    /// the transaction, except that unisolated writes (already applied) are
    /// undone by a compensating commit. A no-op in auto-commit mode. Once
    /// the repository is closed no new transaction is started, but the
    /// connection stays in manual mode.
    ///
    /// # Errors
    ///
    /// Returns an error if undoing unisolated writes fails.
    pub fn rollback(&mut self) -> OptiResult<()> {
        let Some(mut txn) = self.txn.take() else {
            return Ok(());
        };
        let result = self.undo_applied(&mut txn);
        self.repo.coordinator.abort(&mut txn, "rollback");
        debug!(target: "optirepo::txn", txn_id = txn.txn_id, "Transaction rolled back");
        if !self.closed && self.repo.ensure_open().is_ok() {
            self.txn = Some(self.begin());
        }
        result
    }

    fn undo_applied(&self, txn: &mut TransactionContext) -> OptiResult<()> {
        let applied = txn.take_applied();
        if applied.is_empty() {
            return Ok(());
        }
        let repo = &self.repo;
        repo.coordinator
            .apply_direct(txn.txn_id, &applied.inverse(), |outcome| {
                repo.after_commit(outcome)
            })
            .map(|_| ())
    }

    /// Roll back and close the connection
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub fn close(&mut self) -> OptiResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.rollback()
    }

    /// Whether the connection is closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Add a statement
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the connection is closed, or any store error.
    pub fn add(&mut self, statement: Statement) -> OptiResult<()> {
        self.write(ChangeSet::from_parts(Vec::new(), [statement]))
    }

    /// Remove a statement
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the connection is closed, or any store error.
    pub fn remove(&mut self, statement: Statement) -> OptiResult<()> {
        self.write(ChangeSet::from_parts([statement], Vec::new()))
    }

    /// Remove every visible statement matching the pattern
    ///
    /// The match is recorded as a read. Returns the number of statements
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the connection is closed, or any store error.
    pub fn remove_matching(&mut self, pattern: &StatementPattern) -> OptiResult<usize> {
        let matching = self.match_statements(pattern)?;
        let count = matching.len();
        self.write(ChangeSet::from_parts(matching, Vec::new()))?;
        Ok(count)
    }

    fn write(&mut self, changes: ChangeSet) -> OptiResult<()> {
        self.ensure_open()?;
        let repo = Arc::clone(&self.repo);
        let hook = |outcome: &CommitOutcome| repo.after_commit(outcome);

        let Some(txn) = self.txn_mut()? else {
            let txn_id = repo.coordinator.next_txn_id();
            repo.coordinator.apply_direct(txn_id, &changes, hook)?;
            return Ok(());
        };

        if txn.isolation().snapshot {
            for statement in changes.removed() {
                txn.remove(statement.clone())?;
            }
            for statement in changes.added() {
                txn.add(statement.clone())?;
            }
        } else {
            txn.ensure_active()?;
            let outcome = repo.coordinator.apply_direct(txn.txn_id, &changes, hook)?;
            txn.record_applied(&outcome.changes);
        }
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Statements matching the pattern
    ///
    /// Inside a transaction the read includes own changes and is recorded
    /// for validation.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the connection is closed, or any store error.
    pub fn match_statements(&mut self, pattern: &StatementPattern) -> OptiResult<Vec<Statement>> {
        self.ensure_open()?;
        match self.txn_mut()? {
            Some(txn) => txn.match_pattern(pattern),
            None => Ok(self.repo.store.match_current(pattern).1),
        }
    }

    /// Whether the statement is visible
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the connection is closed, or any store error.
    pub fn contains(&mut self, statement: &Statement) -> OptiResult<bool> {
        self.ensure_open()?;
        match self.txn_mut()? {
            Some(txn) => txn.contains(statement),
            None => self.repo.store.live().contains(statement),
        }
    }

    /// Number of visible statements
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the connection is closed, or any store error.
    pub fn size(&mut self) -> OptiResult<usize> {
        if self.auto_commit {
            self.ensure_open()?;
            return Ok(self.repo.store.len());
        }
        Ok(self.match_statements(&StatementPattern::any())?.len())
    }

    /// Parse and evaluate a SPARQL query
    ///
    /// # Errors
    ///
    /// Returns `QuerySyntax` if the text does not parse, or any evaluator
    /// error.
    pub fn evaluate(&mut self, query: &str) -> OptiResult<Vec<Solution>> {
        let parsed = ParsedQuery::parse(QueryLanguage::Sparql, query, None)?;
        self.evaluate_parsed(&parsed)
    }

    /// Evaluate a parsed query
    ///
    /// Inside a transaction the query sees own changes and its plan is
    /// recorded for validation.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the connection is closed, or any evaluator error.
    pub fn evaluate_parsed(&mut self, query: &ParsedQuery) -> OptiResult<Vec<Solution>> {
        self.ensure_open()?;
        let evaluator = Arc::clone(&self.repo.evaluator);
        match self.txn_mut()? {
            Some(txn) => {
                txn.ensure_active()?;
                let version = txn.read_version();
                let solutions = evaluator.evaluate(query, &txn.view())?;
                txn.record_query(Arc::clone(query.plan()), version);
                Ok(solutions)
            }
            None => {
                let live = self.repo.store.live();
                evaluator.evaluate(query, live.as_ref())
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(target: "optirepo::txn", error = %e, "Rollback on drop failed");
        }
    }
}
