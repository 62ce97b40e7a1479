//! Secondary indices for efficient pattern matching
//!
//! This module provides secondary indices that let `match_at` avoid
//! scanning every stored statement:
//! - subject index: Subject → statements with that subject
//! - predicate index: NamedNode → statements with that predicate
//! - object index: Term → statements with that object

use optirepo_core::{NamedNode, Statement, Subject, Term};
use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

/// Posting index: term → statements containing it at one position
#[derive(Debug)]
pub struct TermIndex<K: Hash + Eq> {
    index: FxHashMap<K, FxHashSet<Statement>>,
}

impl<K: Hash + Eq> Default for TermIndex<K> {
    fn default() -> Self {
        Self {
            index: FxHashMap::default(),
        }
    }
}

impl<K: Hash + Eq> TermIndex<K> {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add statement to the term's posting set
    ///
    /// If the term doesn't exist yet, creates a new entry.
    pub fn insert(&mut self, key: K, statement: Statement) {
        self.index.entry(key).or_default().insert(statement);
    }

    /// Remove statement from the term's posting set
    ///
    /// If the set becomes empty, removes the term entry entirely
    /// to avoid accumulating empty sets.
    pub fn remove(&mut self, key: &K, statement: &Statement) {
        if let Some(statements) = self.index.get_mut(key) {
            statements.remove(statement);
            if statements.is_empty() {
                self.index.remove(key);
            }
        }
    }

    /// Get all statements for a term
    pub fn get(&self, key: &K) -> Option<&FxHashSet<Statement>> {
        self.index.get(key)
    }

    /// Number of statements posted under the term (0 if absent)
    pub fn count(&self, key: &K) -> usize {
        self.index.get(key).map_or(0, FxHashSet::len)
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get the number of distinct terms in the index
    pub fn len(&self) -> usize {
        self.index.len()
    }
}

/// The three positional indices kept in step with the statement table
#[derive(Debug, Default)]
pub struct StatementIndex {
    /// Subject → statements
    pub subjects: TermIndex<Subject>,
    /// Predicate → statements
    pub predicates: TermIndex<NamedNode>,
    /// Object → statements
    pub objects: TermIndex<Term>,
}

impl StatementIndex {
    /// Create empty indices
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a statement at every position
    pub fn insert(&mut self, statement: &Statement) {
        self.subjects
            .insert(statement.subject.clone(), statement.clone());
        self.predicates
            .insert(statement.predicate.clone(), statement.clone());
        self.objects
            .insert(statement.object.clone(), statement.clone());
    }

    /// Drop a statement from every position
    pub fn remove(&mut self, statement: &Statement) {
        self.subjects.remove(&statement.subject, statement);
        self.predicates.remove(&statement.predicate, statement);
        self.objects.remove(&statement.object, statement);
    }
}
