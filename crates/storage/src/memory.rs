//! MemoryStore: multi-version in-memory statement storage
//!
//! This module implements the StatementStore trait using:
//! - `FxHashMap<Statement, lifespans>` where each lifespan records the
//!   version a statement was added at and, once removed, the version it
//!   was removed at
//! - `parking_lot::RwLock` for thread-safe access
//! - Positional secondary indices for pattern matching
//!
//! # Design Notes
//!
//! - **Version history**: a statement that is removed and re-added gets a
//!   second lifespan, so snapshots at any retained version stay exact
//! - **Version inside the lock**: the committed version is stored with the
//!   data, so a reader always pairs a version with the matching state
//! - **Vacuum**: lifespans that ended at or before the oldest version any
//!   reader can still ask for are dropped

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

use optirepo_core::{
    ChangeSet, OptiError, OptiResult, Statement, StatementPattern, StatementSource,
    StatementStore,
};

use crate::index::StatementIndex;
use crate::snapshot::{LiveView, StoreSnapshot};

/// Versions during which a statement was present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Lifespan {
    /// Version that added the statement
    since: u64,
    /// Version that removed it (`None` while live)
    until: Option<u64>,
}

impl Lifespan {
    fn visible_at(&self, version: u64) -> bool {
        self.since <= version && self.until.map_or(true, |until| version < until)
    }

    fn is_live(&self) -> bool {
        self.until.is_none()
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Latest committed version
    version: u64,
    /// Statement table with version history
    statements: FxHashMap<Statement, SmallVec<[Lifespan; 1]>>,
    /// Positional indices over every statement in the table
    index: StatementIndex,
    /// Number of live statements
    live_count: usize,
}

impl StoreInner {
    fn is_visible(&self, statement: &Statement, version: u64) -> bool {
        self.statements
            .get(statement)
            .map_or(false, |spans| spans.iter().any(|s| s.visible_at(version)))
    }

    fn match_at(&self, pattern: &StatementPattern, version: u64) -> Vec<Statement> {
        let candidates: Box<dyn Iterator<Item = &Statement> + '_> =
            match self.smallest_posting(pattern) {
                Candidates::Posting(posting) => Box::new(posting.iter()),
                Candidates::Nothing => return Vec::new(),
                Candidates::All => Box::new(self.statements.keys()),
            };
        candidates
            .filter(|statement| pattern.matches(statement) && self.is_visible(statement, version))
            .cloned()
            .collect()
    }

    /// Smallest posting set among the bound positions of the pattern
    fn smallest_posting(&self, pattern: &StatementPattern) -> Candidates<'_> {
        let postings = [
            pattern
                .subject
                .as_ref()
                .map(|s| self.index.subjects.get(s)),
            pattern
                .predicate
                .as_ref()
                .map(|p| self.index.predicates.get(p)),
            pattern.object.as_ref().map(|o| self.index.objects.get(o)),
        ];

        let mut best: Option<&FxHashSet<Statement>> = None;
        for posting in postings.into_iter().flatten() {
            // A bound position with no posting means nothing can match
            let Some(posting) = posting else {
                return Candidates::Nothing;
            };
            if best.map_or(true, |b| posting.len() < b.len()) {
                best = Some(posting);
            }
        }
        best.map_or(Candidates::All, Candidates::Posting)
    }
}

enum Candidates<'a> {
    Posting(&'a FxHashSet<Statement>),
    Nothing,
    All,
}

/// Multi-version in-memory statement store
///
/// Cloning is cheap: clones share the same underlying table, which is how
/// snapshot and live views keep a handle on the store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MemoryStore {
    /// Create a new empty store at version 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a store whose statements were all committed at or before `version`
    ///
    /// Used when reloading persisted statements.
    pub fn restore(version: u64, statements: impl IntoIterator<Item = Statement>) -> Self {
        let mut inner = StoreInner {
            version,
            ..StoreInner::default()
        };
        for statement in statements {
            if inner.statements.contains_key(&statement) {
                continue;
            }
            inner.index.insert(&statement);
            inner.statements.insert(
                statement,
                SmallVec::from_elem(
                    Lifespan {
                        since: 0,
                        until: None,
                    },
                    1,
                ),
            );
            inner.live_count += 1;
        }
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Number of live statements
    pub fn len(&self) -> usize {
        self.inner.read().live_count
    }

    /// Check if no statement is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All live statements together with the version they are current at
    pub fn live_statements(&self) -> (u64, Vec<Statement>) {
        let inner = self.inner.read();
        let statements = inner
            .statements
            .iter()
            .filter(|(_, spans)| spans.iter().any(Lifespan::is_live))
            .map(|(statement, _)| statement.clone())
            .collect();
        (inner.version, statements)
    }

    /// Match against the latest committed state
    ///
    /// Returns the version read together with the statements.
    pub fn match_current(&self, pattern: &StatementPattern) -> (u64, Vec<Statement>) {
        // The version is read under the same lock as the data, so a
        // concurrent apply can never be half visible.
        let inner = self.inner.read();
        let version = inner.version;
        (version, inner.match_at(pattern, version))
    }

    /// Number of table entries, live or historical (for testing/debugging)
    pub fn entry_count(&self) -> usize {
        self.inner.read().statements.len()
    }

    /// A snapshot view pinned to `version`
    pub fn snapshot_view(&self, version: u64) -> StoreSnapshot {
        StoreSnapshot::new(self.clone(), version)
    }

    /// A view following the latest committed version
    pub fn live_view(&self) -> LiveView {
        LiveView::new(self.clone())
    }
}

impl StatementStore for MemoryStore {
    fn current_version(&self) -> u64 {
        self.inner.read().version
    }

    fn match_at(&self, pattern: &StatementPattern, version: u64) -> OptiResult<Vec<Statement>> {
        Ok(self.inner.read().match_at(pattern, version))
    }

    fn snapshot(&self, version: u64) -> Box<dyn StatementSource> {
        Box::new(self.snapshot_view(version))
    }

    fn live(&self) -> Box<dyn StatementSource> {
        Box::new(self.live_view())
    }

    fn apply(&self, version: u64, changes: &ChangeSet) -> OptiResult<ChangeSet> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if version <= inner.version {
            return Err(OptiError::invalid_input(format!(
                "Commit version {} does not advance store version {}",
                version, inner.version
            )));
        }

        let mut effective = ChangeSet::new();

        for statement in changes.removed() {
            let Some(spans) = inner.statements.get_mut(statement) else {
                continue;
            };
            if let Some(live) = spans.iter_mut().find(|s| s.is_live()) {
                live.until = Some(version);
                inner.live_count -= 1;
                effective.remove(statement.clone());
            }
        }

        for statement in changes.added() {
            let is_new = match inner.statements.get_mut(statement) {
                Some(spans) if spans.iter().any(Lifespan::is_live) => continue,
                Some(spans) => {
                    spans.push(Lifespan {
                        since: version,
                        until: None,
                    });
                    false
                }
                None => true,
            };
            if is_new {
                inner.index.insert(statement);
                inner.statements.insert(
                    statement.clone(),
                    SmallVec::from_elem(
                        Lifespan {
                            since: version,
                            until: None,
                        },
                        1,
                    ),
                );
            }
            inner.live_count += 1;
            effective.add(statement.clone());
        }

        inner.version = version;

        debug!(
            target: "optirepo::store",
            version,
            added = effective.added().len(),
            removed = effective.removed().len(),
            "Applied change set"
        );

        Ok(effective)
    }

    fn vacuum(&self, oldest_visible: u64) -> usize {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let mut dropped = 0;
        let mut emptied = Vec::new();

        for (statement, spans) in inner.statements.iter_mut() {
            let before = spans.len();
            spans.retain(|s| s.until.map_or(true, |until| until > oldest_visible));
            dropped += before - spans.len();
            if spans.is_empty() {
                emptied.push(statement.clone());
            }
        }

        for statement in &emptied {
            inner.statements.remove(statement);
            inner.index.remove(statement);
        }

        if dropped > 0 {
            debug!(target: "optirepo::store", oldest_visible, dropped, "Vacuumed statement versions");
        }
        dropped
    }
}
