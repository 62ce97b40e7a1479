//! Statement model: statements, wildcard patterns and change sets
//!
//! Statements are `oxrdf` quads. The graph name plays the role of the
//! statement context; the default graph means "no context".
//!
//! [`StatementPattern::matches`] is the one wildcard-aware overlap test of the
//! repository. Conflict detection and named query invalidation both go
//! through it.

use rustc_hash::FxHashSet;
use std::fmt;

pub use oxrdf::{BlankNode, GraphName, Literal, NamedNode, Quad, Subject, Term};

/// A statement: subject, predicate, object and context
pub type Statement = Quad;

/// A statement pattern where every `None` component is a wildcard
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StatementPattern {
    /// Subject constraint
    pub subject: Option<Subject>,
    /// Predicate constraint
    pub predicate: Option<NamedNode>,
    /// Object constraint
    pub object: Option<Term>,
    /// Context constraint (`Some(GraphName::DefaultGraph)` restricts to the default graph)
    pub context: Option<GraphName>,
}

impl StatementPattern {
    /// Create a pattern from optional components
    pub fn new(
        subject: Option<Subject>,
        predicate: Option<NamedNode>,
        object: Option<Term>,
        context: Option<GraphName>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            context,
        }
    }

    /// The pattern matching every statement
    pub fn any() -> Self {
        Self::default()
    }

    /// The pattern matching exactly one statement
    pub fn exact(statement: &Statement) -> Self {
        Self {
            subject: Some(statement.subject.clone()),
            predicate: Some(statement.predicate.clone()),
            object: Some(statement.object.clone()),
            context: Some(statement.graph_name.clone()),
        }
    }

    /// Constrain the subject
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<Subject>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Constrain the predicate
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Into<NamedNode>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Constrain the object
    #[must_use]
    pub fn with_object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Constrain the context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<GraphName>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Whether every component is a wildcard
    pub fn is_universal(&self) -> bool {
        self.subject.is_none()
            && self.predicate.is_none()
            && self.object.is_none()
            && self.context.is_none()
    }

    /// Whether the statement falls within this pattern
    ///
    /// Each component is either a wildcard or equal to the statement's
    /// component.
    pub fn matches(&self, statement: &Statement) -> bool {
        self.subject
            .as_ref()
            .map_or(true, |s| *s == statement.subject)
            && self
                .predicate
                .as_ref()
                .map_or(true, |p| *p == statement.predicate)
            && self.object.as_ref().map_or(true, |o| *o == statement.object)
            && self
                .context
                .as_ref()
                .map_or(true, |c| *c == statement.graph_name)
    }
}

impl fmt::Display for StatementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(s) => write!(f, "{s} ")?,
            None => f.write_str("* ")?,
        }
        match &self.predicate {
            Some(p) => write!(f, "{p} ")?,
            None => f.write_str("* ")?,
        }
        match &self.object {
            Some(o) => write!(f, "{o}")?,
            None => f.write_str("*")?,
        }
        match &self.context {
            Some(GraphName::DefaultGraph) | None => Ok(()),
            Some(c) => write!(f, " {c}"),
        }
    }
}

/// Net additions and removals of statements
///
/// Both sides keep insertion order and never contain duplicates. Adding a
/// statement that is pending removal cancels the removal (and vice versa),
/// so an add+remove pair of the same statement leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    added: Vec<Statement>,
    removed: Vec<Statement>,
    added_index: FxHashSet<Statement>,
    removed_index: FxHashSet<Statement>,
}

impl ChangeSet {
    /// Create an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a change set from explicit sides
    pub fn from_parts(
        removed: impl IntoIterator<Item = Statement>,
        added: impl IntoIterator<Item = Statement>,
    ) -> Self {
        let mut changes = Self::new();
        for statement in removed {
            changes.remove(statement);
        }
        for statement in added {
            changes.add(statement);
        }
        changes
    }

    /// Record an addition, cancelling a pending removal of the same statement
    ///
    /// Returns `true` if the change set was modified.
    pub fn add(&mut self, statement: Statement) -> bool {
        if self.removed_index.remove(&statement) {
            self.removed.retain(|s| *s != statement);
            return true;
        }
        if self.added_index.insert(statement.clone()) {
            self.added.push(statement);
            return true;
        }
        false
    }

    /// Record a removal, cancelling a pending addition of the same statement
    ///
    /// Returns `true` if the change set was modified.
    pub fn remove(&mut self, statement: Statement) -> bool {
        if self.added_index.remove(&statement) {
            self.added.retain(|s| *s != statement);
            return true;
        }
        if self.removed_index.insert(statement.clone()) {
            self.removed.push(statement);
            return true;
        }
        false
    }

    /// Statements added, in insertion order
    pub fn added(&self) -> &[Statement] {
        &self.added
    }

    /// Statements removed, in insertion order
    pub fn removed(&self) -> &[Statement] {
        &self.removed
    }

    /// Whether the statement is pending addition
    pub fn is_added(&self, statement: &Statement) -> bool {
        self.added_index.contains(statement)
    }

    /// Whether the statement is pending removal
    pub fn is_removed(&self, statement: &Statement) -> bool {
        self.removed_index.contains(statement)
    }

    /// Whether the statement is touched on either side
    pub fn touches(&self, statement: &Statement) -> bool {
        self.is_added(statement) || self.is_removed(statement)
    }

    /// Iterate over removed then added statements
    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.removed.iter().chain(self.added.iter())
    }

    /// Whether any touched statement falls within the pattern
    pub fn intersects(&self, pattern: &StatementPattern) -> bool {
        self.iter().any(|s| pattern.matches(s))
    }

    /// Inverse change set (what undoes this one)
    pub fn inverse(&self) -> Self {
        Self::from_parts(self.added.iter().cloned(), self.removed.iter().cloned())
    }

    /// Number of touched statements
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// Check if nothing is touched
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Drop all recorded changes, keeping capacity
    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.added_index.clear();
        self.removed_index.clear();
    }
}

impl PartialEq for ChangeSet {
    fn eq(&self, other: &Self) -> bool {
        self.added == other.added && self.removed == other.removed
    }
}

impl Eq for ChangeSet {}
