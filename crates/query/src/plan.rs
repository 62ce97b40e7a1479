//! Query plans: which statement changes can affect a query result
//!
//! A [`QueryPlan`] is derived once from the parsed SPARQL algebra and is
//! shared by the invalidation engine (named queries) and by read-set
//! validation of transaction reads.
//!
//! # Structure
//!
//! The graph pattern is flattened into a disjunction of conjunctive
//! [`PatternGroup`]s:
//! - a basic graph pattern is one group
//! - `Join` multiplies groups, `UNION` concatenates them
//! - `OPTIONAL` and `MINUS` contribute the left groups plus the left groups
//!   joined with the right ones (the right side only matters where it meets
//!   a left solution)
//! - `EXISTS` / `NOT EXISTS` sub-patterns in filters, binds, ordering and
//!   left-join conditions contribute their own groups
//! - sub-select variables that are not projected are renamed apart
//!
//! A change affects a group when one of its templates unifies with the
//! changed statement and the rest of the group is still satisfiable in the
//! state that contains the statement. Groups that contain a property path
//! are never pruned this way: any statement on one of the path's
//! predicates affects them.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use spargebra::algebra::{Expression, GraphPattern, OrderExpression, PropertyPathExpression};
use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
use spargebra::Query;
use tracing::debug;

use optirepo_core::{
    ChangeSet, GraphName, NamedNode, OptiResult, Statement, StatementPattern, StatementSource,
    Subject, Term,
};

use crate::solver::{self, Bindings};

/// Above this many groups the plan falls back to one group per template
const MAX_GROUPS: usize = 64;

// =============================================================================
// Templates
// =============================================================================

/// One position of a template: a constant or a named variable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot<T> {
    /// Fixed term
    Const(T),
    /// Variable (query blank nodes become `_:label` variables)
    Var(String),
}

impl<T> Slot<T> {
    fn rename(&mut self, rename: &mut dyn FnMut(&str) -> Option<String>) {
        if let Slot::Var(name) = self {
            if let Some(renamed) = rename(name) {
                *name = renamed;
            }
        }
    }

    fn is_bound(&self, bindings: &Bindings) -> bool {
        match self {
            Slot::Const(_) => true,
            Slot::Var(name) => bindings.contains_key(name),
        }
    }
}

/// Graph position of a template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphSlot {
    /// Outside any `GRAPH` clause: statements from every graph
    Any,
    /// `GRAPH <iri>`
    Const(GraphName),
    /// `GRAPH ?g`: any named graph, never the default graph
    Var(String),
}

impl GraphSlot {
    fn rename(&mut self, rename: &mut dyn FnMut(&str) -> Option<String>) {
        if let GraphSlot::Var(name) = self {
            if let Some(renamed) = rename(name) {
                *name = renamed;
            }
        }
    }

    fn bind(&self, graph: &GraphName, bindings: &mut Bindings) -> bool {
        match self {
            GraphSlot::Any => true,
            GraphSlot::Const(expected) => expected == graph,
            GraphSlot::Var(name) => match graph_term(graph) {
                Some(term) => unify(name, term, bindings),
                None => false,
            },
        }
    }

    fn context(&self, bindings: &Bindings) -> Option<Option<GraphName>> {
        match self {
            GraphSlot::Any => Some(None),
            GraphSlot::Const(graph) => Some(Some(graph.clone())),
            GraphSlot::Var(name) => match bindings.get(name) {
                Some(term) => graph_of(term).map(Some),
                None => Some(None),
            },
        }
    }

    fn constant(&self) -> Option<GraphName> {
        match self {
            GraphSlot::Const(graph) => Some(graph.clone()),
            _ => None,
        }
    }
}

/// A triple pattern placed in a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuadTemplate {
    /// Subject position
    pub subject: Slot<Term>,
    /// Predicate position
    pub predicate: Slot<NamedNode>,
    /// Object position
    pub object: Slot<Term>,
    /// Graph position
    pub graph: GraphSlot,
}

impl QuadTemplate {
    /// Unify the template with a statement, extending `bindings`
    ///
    /// Returns false if a constant differs or a variable is already bound to
    /// another term. `bindings` may be partially extended on failure.
    pub fn bind(&self, statement: &Statement, bindings: &mut Bindings) -> bool {
        let subject = Term::from(statement.subject.clone());
        let predicate = &statement.predicate;

        let subject_ok = match &self.subject {
            Slot::Const(term) => *term == subject,
            Slot::Var(name) => unify(name, subject, bindings),
        };
        subject_ok
            && match &self.predicate {
                Slot::Const(node) => node == predicate,
                Slot::Var(name) => unify(name, predicate.clone().into(), bindings),
            }
            && match &self.object {
                Slot::Const(term) => *term == statement.object,
                Slot::Var(name) => unify(name, statement.object.clone(), bindings),
            }
            && self.graph.bind(&statement.graph_name, bindings)
    }

    /// Check if the template can match the statement on its own
    pub fn may_match(&self, statement: &Statement) -> bool {
        self.bind(statement, &mut Bindings::default())
    }

    /// Store pattern for the template under `bindings`
    ///
    /// Returns `None` if a bound term cannot occur at its position (a
    /// literal subject, for instance), so the template cannot match at all.
    pub fn to_pattern(&self, bindings: &Bindings) -> Option<StatementPattern> {
        let subject = match resolve(&self.subject, bindings) {
            Some(term) => Some(subject_of(term)?),
            None => None,
        };
        let predicate = match &self.predicate {
            Slot::Const(node) => Some(node.clone()),
            Slot::Var(name) => match bindings.get(name) {
                Some(Term::NamedNode(node)) => Some(node.clone()),
                Some(_) => return None,
                None => None,
            },
        };
        let object = resolve(&self.object, bindings).cloned();
        let context = self.graph.context(bindings)?;
        Some(StatementPattern::new(subject, predicate, object, context))
    }

    /// Number of positions fixed by constants or `bindings`
    pub fn bound_positions(&self, bindings: &Bindings) -> usize {
        [
            self.subject.is_bound(bindings),
            self.predicate.is_bound(bindings),
            self.object.is_bound(bindings),
        ]
        .into_iter()
        .filter(|bound| *bound)
        .count()
    }

    fn rename(&mut self, rename: &mut dyn FnMut(&str) -> Option<String>) {
        self.subject.rename(rename);
        self.predicate.rename(rename);
        self.object.rename(rename);
        self.graph.rename(rename);
    }
}

/// A property path between two endpoints
///
/// Only the predicates it can traverse are tracked: intermediate nodes are
/// unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    /// Start of the path
    pub subject: Slot<Term>,
    /// End of the path
    pub object: Slot<Term>,
    /// Predicates the path can traverse (`None`: any predicate)
    pub predicates: Option<Vec<NamedNode>>,
    /// Graph position
    pub graph: GraphSlot,
}

impl PathTemplate {
    /// Check if the statement is an edge the path could traverse
    pub fn may_match(&self, statement: &Statement) -> bool {
        let predicate_ok = self
            .predicates
            .as_ref()
            .map_or(true, |predicates| predicates.contains(&statement.predicate));
        predicate_ok && self.graph.bind(&statement.graph_name, &mut Bindings::default())
    }

    fn rename(&mut self, rename: &mut dyn FnMut(&str) -> Option<String>) {
        self.subject.rename(rename);
        self.object.rename(rename);
        self.graph.rename(rename);
    }
}

/// Element of a conjunctive group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Atom {
    /// Triple pattern
    Quad(QuadTemplate),
    /// Property path
    Path(PathTemplate),
}

impl Atom {
    /// Check if the atom can match the statement on its own
    pub fn may_match(&self, statement: &Statement) -> bool {
        match self {
            Atom::Quad(template) => template.may_match(statement),
            Atom::Path(path) => path.may_match(statement),
        }
    }

    fn rename(&mut self, rename: &mut dyn FnMut(&str) -> Option<String>) {
        match self {
            Atom::Quad(template) => template.rename(rename),
            Atom::Path(path) => path.rename(rename),
        }
    }

    fn affected_patterns(&self, out: &mut Vec<StatementPattern>) {
        match self {
            Atom::Quad(template) => {
                let subject = match &template.subject {
                    Slot::Const(term) => match subject_of(term) {
                        Some(subject) => Some(subject),
                        None => return,
                    },
                    Slot::Var(_) => None,
                };
                let predicate = match &template.predicate {
                    Slot::Const(node) => Some(node.clone()),
                    Slot::Var(_) => None,
                };
                let object = match &template.object {
                    Slot::Const(term) => Some(term.clone()),
                    Slot::Var(_) => None,
                };
                out.push(StatementPattern::new(
                    subject,
                    predicate,
                    object,
                    template.graph.constant(),
                ));
            }
            Atom::Path(path) => match &path.predicates {
                Some(predicates) => out.extend(predicates.iter().map(|predicate| {
                    StatementPattern::new(
                        None,
                        Some(predicate.clone()),
                        None,
                        path.graph.constant(),
                    )
                })),
                None => out.push(StatementPattern::new(None, None, None, path.graph.constant())),
            },
        }
    }
}

// =============================================================================
// Groups
// =============================================================================

/// Atoms that must all match for the query to produce a solution
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternGroup {
    atoms: Vec<Atom>,
}

impl PatternGroup {
    /// Atoms of the group
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Check if one changed statement can change the group's solutions
    ///
    /// `state` must contain the statement: the post-commit state for an
    /// addition, the pre-commit state for a removal.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from `state` fails.
    pub fn is_affected_by(
        &self,
        statement: &Statement,
        state: &dyn StatementSource,
    ) -> OptiResult<bool> {
        if self.atoms.iter().any(|atom| matches!(atom, Atom::Path(_))) {
            return Ok(self.atoms.iter().any(|atom| atom.may_match(statement)));
        }

        let templates: Vec<&QuadTemplate> = self
            .atoms
            .iter()
            .filter_map(|atom| match atom {
                Atom::Quad(template) => Some(template),
                Atom::Path(_) => None,
            })
            .collect();

        for (index, template) in templates.iter().enumerate() {
            let mut bindings = Bindings::default();
            if !template.bind(statement, &mut bindings) {
                continue;
            }
            let rest: Vec<&QuadTemplate> = templates
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, template)| *template)
                .collect();
            if solver::satisfiable(&rest, &bindings, state)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

// =============================================================================
// QueryPlan
// =============================================================================

/// Statement dependencies of one query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryPlan {
    groups: Vec<PatternGroup>,
    /// Every change affects the query (DESCRIBE, SERVICE, unknown algebra)
    universal: bool,
}

impl QueryPlan {
    /// Derive the plan of a parsed query
    pub fn from_query(query: &Query) -> Self {
        let mut builder = PlanBuilder::default();
        let groups = match query {
            Query::Select { pattern, .. }
            | Query::Construct { pattern, .. }
            | Query::Ask { pattern, .. } => builder.pattern(pattern, &GraphSlot::Any),
            // Descriptions include statements about result resources
            Query::Describe { .. } => return QueryPlan::universal(),
        };

        let mut seen = FxHashSet::default();
        let groups: Vec<PatternGroup> = groups
            .into_iter()
            .filter(|atoms| !atoms.is_empty() && seen.insert(atoms.clone()))
            .map(|atoms| PatternGroup { atoms })
            .collect();
        if groups.is_empty() {
            debug!(target: "optirepo::query", "Query plan has no patterns, treating as universal");
            return QueryPlan::universal();
        }

        debug!(
            target: "optirepo::query",
            groups = groups.len(),
            universal = builder.universal,
            "Derived query plan"
        );

        QueryPlan {
            groups,
            universal: builder.universal,
        }
    }

    /// A plan affected by every change
    pub fn universal() -> Self {
        QueryPlan {
            groups: Vec::new(),
            universal: true,
        }
    }

    /// Conjunctive groups of the plan
    pub fn groups(&self) -> &[PatternGroup] {
        &self.groups
    }

    /// Check if every change affects the plan
    pub fn is_universal(&self) -> bool {
        self.universal
    }

    /// Patterns a statement must match to possibly affect the query
    ///
    /// Variables become wildcards. This is the coarse dependency set; the
    /// join-aware test is [`QueryPlan::is_affected_by`].
    pub fn affected_patterns(&self) -> Vec<StatementPattern> {
        if self.universal {
            return vec![StatementPattern::any()];
        }
        let mut patterns = Vec::new();
        for group in &self.groups {
            for atom in group.atoms() {
                atom.affected_patterns(&mut patterns);
            }
        }
        let mut seen = FxHashSet::default();
        patterns.retain(|pattern| seen.insert(pattern.clone()));
        patterns
    }

    /// Check if the statement matches any template of the plan
    pub fn may_match(&self, statement: &Statement) -> bool {
        self.universal
            || self
                .groups
                .iter()
                .any(|group| group.atoms().iter().any(|atom| atom.may_match(statement)))
    }

    /// Check if a committed change set can change the query result
    ///
    /// Additions are checked against `after` (the state with the changes
    /// applied), removals against `before`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from either state fails.
    pub fn is_affected_by(
        &self,
        changes: &ChangeSet,
        before: &dyn StatementSource,
        after: &dyn StatementSource,
    ) -> OptiResult<bool> {
        if changes.is_empty() {
            return Ok(false);
        }
        if self.universal {
            return Ok(true);
        }
        for statement in changes.added() {
            if self.is_affected_by_statement(statement, after)? {
                return Ok(true);
            }
        }
        for statement in changes.removed() {
            if self.is_affected_by_statement(statement, before)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Check if one statement, present in `state`, can change the result
    ///
    /// # Errors
    ///
    /// Returns an error if reading from `state` fails.
    pub fn is_affected_by_statement(
        &self,
        statement: &Statement,
        state: &dyn StatementSource,
    ) -> OptiResult<bool> {
        if self.universal {
            return Ok(true);
        }
        for group in &self.groups {
            if group.is_affected_by(statement, state)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.universal {
            return write!(f, "[*]");
        }
        let patterns = self.affected_patterns();
        write!(f, "[")?;
        for (i, pattern) in patterns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{pattern}")?;
        }
        write!(f, "]")
    }
}

// =============================================================================
// Plan derivation
// =============================================================================

/// Disjunction of conjunctions
type Groups = Vec<Vec<Atom>>;

#[derive(Default)]
struct PlanBuilder {
    fresh: usize,
    universal: bool,
}

impl PlanBuilder {
    fn pattern(&mut self, pattern: &GraphPattern, graph: &GraphSlot) -> Groups {
        match pattern {
            // An empty pattern in a graph still needs the graph to exist
            GraphPattern::Bgp { patterns } if patterns.is_empty() && *graph != GraphSlot::Any => {
                vec![vec![Atom::Quad(QuadTemplate {
                    subject: Slot::Var(self.fresh_name("_:s")),
                    predicate: Slot::Var(self.fresh_name("_:p")),
                    object: Slot::Var(self.fresh_name("_:o")),
                    graph: graph.clone(),
                })]]
            }
            GraphPattern::Bgp { patterns } => vec![patterns
                .iter()
                .map(|triple| Atom::Quad(self.template(triple, graph)))
                .collect()],
            GraphPattern::Path {
                subject,
                path,
                object,
            } => {
                let subject = self.term_slot(subject);
                let object = self.term_slot(object);
                // A zero-length match between two variables binds every node
                let predicates = if nullable(path)
                    && matches!(subject, Slot::Var(_))
                    && matches!(object, Slot::Var(_))
                {
                    None
                } else {
                    path_predicates(path)
                };
                vec![vec![Atom::Path(PathTemplate {
                    subject,
                    object,
                    predicates,
                    graph: graph.clone(),
                })]]
            }
            GraphPattern::Join { left, right } => {
                let left = self.pattern(left, graph);
                let right = self.pattern(right, graph);
                cross(left, right)
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                let left = self.pattern(left, graph);
                let right = self.pattern(right, graph);
                let mut groups = left.clone();
                groups.extend(cross(left, right));
                if let Some(expression) = expression {
                    groups.extend(self.expression(expression, graph));
                }
                limit(groups)
            }
            GraphPattern::Minus { left, right } => {
                let left = self.pattern(left, graph);
                let right = self.pattern(right, graph);
                let mut groups = left.clone();
                groups.extend(cross(left, right));
                limit(groups)
            }
            GraphPattern::Filter { expr, inner } => {
                let mut groups = self.pattern(inner, graph);
                groups.extend(self.expression(expr, graph));
                limit(groups)
            }
            GraphPattern::Union { left, right } => {
                let mut groups = self.pattern(left, graph);
                groups.extend(self.pattern(right, graph));
                limit(groups)
            }
            GraphPattern::Graph { name, inner } => {
                let graph = match name {
                    NamedNodePattern::NamedNode(node) => GraphSlot::Const(node.clone().into()),
                    NamedNodePattern::Variable(variable) => {
                        GraphSlot::Var(variable.as_str().to_owned())
                    }
                };
                self.pattern(inner, &graph)
            }
            GraphPattern::Extend {
                inner, expression, ..
            } => {
                let mut groups = self.pattern(inner, graph);
                groups.extend(self.expression(expression, graph));
                limit(groups)
            }
            GraphPattern::Values { .. } => vec![Vec::new()],
            GraphPattern::OrderBy { inner, expression } => {
                let mut groups = self.pattern(inner, graph);
                for order in expression {
                    let (OrderExpression::Asc(e) | OrderExpression::Desc(e)) = order;
                    groups.extend(self.expression(e, graph));
                }
                limit(groups)
            }
            GraphPattern::Project { inner, variables } => {
                let groups = self.pattern(inner, graph);
                let keep: Vec<&str> = variables.iter().map(|v| v.as_str()).collect();
                self.hide(groups, &keep)
            }
            GraphPattern::Distinct { inner }
            | GraphPattern::Reduced { inner }
            | GraphPattern::Slice { inner, .. } => self.pattern(inner, graph),
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                // Aggregate arguments are opaque here; an EXISTS inside one
                // makes the whole plan universal
                if aggregates
                    .iter()
                    .any(|(_, aggregate)| format!("{aggregate:?}").contains("Exists("))
                {
                    self.universal = true;
                }
                let groups = self.pattern(inner, graph);
                let keep: Vec<&str> = variables.iter().map(|v| v.as_str()).collect();
                self.hide(groups, &keep)
            }
            GraphPattern::Service { .. } => {
                self.universal = true;
                vec![Vec::new()]
            }
            #[allow(unreachable_patterns)]
            _ => {
                self.universal = true;
                vec![Vec::new()]
            }
        }
    }

    /// Groups of every EXISTS sub-pattern inside an expression
    fn expression(&mut self, expression: &Expression, graph: &GraphSlot) -> Groups {
        match expression {
            Expression::Exists(pattern) => self.pattern(pattern, graph),
            Expression::Or(a, b)
            | Expression::And(a, b)
            | Expression::Equal(a, b)
            | Expression::SameTerm(a, b)
            | Expression::Greater(a, b)
            | Expression::GreaterOrEqual(a, b)
            | Expression::Less(a, b)
            | Expression::LessOrEqual(a, b)
            | Expression::Add(a, b)
            | Expression::Subtract(a, b)
            | Expression::Multiply(a, b)
            | Expression::Divide(a, b) => {
                let mut groups = self.expression(a, graph);
                groups.extend(self.expression(b, graph));
                groups
            }
            Expression::In(a, list) => {
                let mut groups = self.expression(a, graph);
                for e in list {
                    groups.extend(self.expression(e, graph));
                }
                groups
            }
            Expression::UnaryPlus(a) | Expression::UnaryMinus(a) | Expression::Not(a) => {
                self.expression(a, graph)
            }
            Expression::If(a, b, c) => {
                let mut groups = self.expression(a, graph);
                groups.extend(self.expression(b, graph));
                groups.extend(self.expression(c, graph));
                groups
            }
            Expression::Coalesce(list) | Expression::FunctionCall(_, list) => {
                let mut groups = Vec::new();
                for e in list {
                    groups.extend(self.expression(e, graph));
                }
                groups
            }
            Expression::NamedNode(_)
            | Expression::Literal(_)
            | Expression::Variable(_)
            | Expression::Bound(_) => Vec::new(),
            #[allow(unreachable_patterns)]
            _ => Vec::new(),
        }
    }

    fn template(&mut self, triple: &TriplePattern, graph: &GraphSlot) -> QuadTemplate {
        QuadTemplate {
            subject: self.term_slot(&triple.subject),
            predicate: match &triple.predicate {
                NamedNodePattern::NamedNode(node) => Slot::Const(node.clone()),
                NamedNodePattern::Variable(variable) => Slot::Var(variable.as_str().to_owned()),
            },
            object: self.term_slot(&triple.object),
            graph: graph.clone(),
        }
    }

    fn term_slot(&mut self, pattern: &TermPattern) -> Slot<Term> {
        match pattern {
            TermPattern::NamedNode(node) => Slot::Const(node.clone().into()),
            TermPattern::Literal(literal) => Slot::Const(literal.clone().into()),
            TermPattern::BlankNode(node) => Slot::Var(format!("_:{}", node.as_str())),
            TermPattern::Variable(variable) => Slot::Var(variable.as_str().to_owned()),
            #[allow(unreachable_patterns)]
            _ => Slot::Var(self.fresh_name("_:quoted")),
        }
    }

    /// Rename variables a sub-select does not project
    fn hide(&mut self, mut groups: Groups, keep: &[&str]) -> Groups {
        let keep: FxHashSet<&str> = keep.iter().copied().collect();
        let mut renamed: FxHashMap<String, String> = FxHashMap::default();
        for atom in groups.iter_mut().flatten() {
            atom.rename(&mut |name: &str| {
                if keep.contains(name) {
                    return None;
                }
                if let Some(existing) = renamed.get(name) {
                    return Some(existing.clone());
                }
                let fresh = self.fresh_name(name);
                renamed.insert(name.to_owned(), fresh.clone());
                Some(fresh)
            });
        }
        groups
    }

    fn fresh_name(&mut self, base: &str) -> String {
        self.fresh += 1;
        format!("{base}~{}", self.fresh)
    }
}

/// Template of one triple pattern placed in `graph`
pub(crate) fn quad_template(triple: &TriplePattern, graph: &GraphSlot) -> QuadTemplate {
    PlanBuilder::default().template(triple, graph)
}

fn cross(left: Groups, right: Groups) -> Groups {
    if left.len().saturating_mul(right.len()) > MAX_GROUPS {
        let mut groups = left;
        groups.extend(right);
        return singletons(groups);
    }
    let mut groups = Vec::with_capacity(left.len() * right.len());
    for l in &left {
        for r in &right {
            let mut joined = l.clone();
            joined.extend(r.iter().cloned());
            groups.push(joined);
        }
    }
    groups
}

fn limit(groups: Groups) -> Groups {
    if groups.len() > MAX_GROUPS {
        singletons(groups)
    } else {
        groups
    }
}

/// One group per distinct atom
///
/// Dropping join partners only weakens each group, so the plan stays sound.
fn singletons(groups: Groups) -> Groups {
    let mut seen = FxHashSet::default();
    groups
        .into_iter()
        .flatten()
        .filter(|atom| seen.insert(atom.clone()))
        .map(|atom| vec![atom])
        .collect()
}

/// Check if the path can match with zero steps
fn nullable(path: &PropertyPathExpression) -> bool {
    match path {
        PropertyPathExpression::NamedNode(_) | PropertyPathExpression::NegatedPropertySet(_) => {
            false
        }
        PropertyPathExpression::ZeroOrMore(_) | PropertyPathExpression::ZeroOrOne(_) => true,
        PropertyPathExpression::Reverse(inner) | PropertyPathExpression::OneOrMore(inner) => {
            nullable(inner)
        }
        PropertyPathExpression::Sequence(a, b) => nullable(a) && nullable(b),
        PropertyPathExpression::Alternative(a, b) => nullable(a) || nullable(b),
    }
}

/// Primitive predicates of a path (`None` if a negated set allows any)
fn path_predicates(path: &PropertyPathExpression) -> Option<Vec<NamedNode>> {
    fn walk(path: &PropertyPathExpression, out: &mut Vec<NamedNode>) -> bool {
        match path {
            PropertyPathExpression::NamedNode(node) => {
                if !out.contains(node) {
                    out.push(node.clone());
                }
                true
            }
            PropertyPathExpression::NegatedPropertySet(_) => false,
            PropertyPathExpression::Reverse(inner)
            | PropertyPathExpression::ZeroOrMore(inner)
            | PropertyPathExpression::OneOrMore(inner)
            | PropertyPathExpression::ZeroOrOne(inner) => walk(inner, out),
            PropertyPathExpression::Sequence(a, b) | PropertyPathExpression::Alternative(a, b) => {
                walk(a, out) && walk(b, out)
            }
        }
    }
    let mut predicates = Vec::new();
    walk(path, &mut predicates).then_some(predicates)
}

fn unify(name: &str, value: Term, bindings: &mut Bindings) -> bool {
    match bindings.get(name) {
        Some(bound) => *bound == value,
        None => {
            bindings.insert(name.to_owned(), value);
            true
        }
    }
}

fn resolve<'a>(slot: &'a Slot<Term>, bindings: &'a Bindings) -> Option<&'a Term> {
    match slot {
        Slot::Const(term) => Some(term),
        Slot::Var(name) => bindings.get(name),
    }
}

fn subject_of(term: &Term) -> Option<Subject> {
    match term {
        Term::NamedNode(node) => Some(node.clone().into()),
        Term::BlankNode(node) => Some(node.clone().into()),
        _ => None,
    }
}

fn graph_of(term: &Term) -> Option<GraphName> {
    match term {
        Term::NamedNode(node) => Some(node.clone().into()),
        Term::BlankNode(node) => Some(node.clone().into()),
        _ => None,
    }
}

fn graph_term(graph: &GraphName) -> Option<Term> {
    match graph {
        GraphName::NamedNode(node) => Some(node.clone().into()),
        GraphName::BlankNode(node) => Some(node.clone().into()),
        GraphName::DefaultGraph => None,
    }
}
