//! Query evaluation seam
//!
//! Full SPARQL evaluation is provided by an external engine through the
//! [`QueryEvaluator`] trait. [`BgpEvaluator`] is the built-in evaluator:
//! it answers SELECT and ASK queries over basic graph patterns (joins and
//! `GRAPH` scopes included) with projection, DISTINCT and LIMIT/OFFSET, and
//! rejects everything else with `UnsupportedQuery`.

use rustc_hash::FxHashSet;
use spargebra::algebra::GraphPattern;
use spargebra::term::{NamedNodePattern, Variable};
use spargebra::Query;

use optirepo_core::{OptiError, OptiResult, StatementSource, Term};

use crate::parsed::ParsedQuery;
use crate::plan::{quad_template, GraphSlot, QuadTemplate};
use crate::solver::{self, Bindings};

/// One row of a query result
///
/// Values are kept sorted by variable name; internal variables (query
/// blank nodes) are never exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Solution {
    values: Vec<(String, Term)>,
}

impl Solution {
    /// Build a row from solver bindings
    pub fn from_bindings(bindings: &Bindings) -> Self {
        let mut values: Vec<(String, Term)> = bindings
            .iter()
            .filter(|(name, _)| !name.starts_with("_:") && !name.contains('~'))
            .map(|(name, term)| (name.clone(), term.clone()))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        Solution { values }
    }

    /// Value bound to a variable
    pub fn get(&self, variable: &str) -> Option<&Term> {
        self.values
            .binary_search_by(|(name, _)| name.as_str().cmp(variable))
            .ok()
            .map(|index| &self.values[index].1)
    }

    /// Bound variables and their values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.values.iter().map(|(name, term)| (name.as_str(), term))
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no variable is bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn project(mut self, variables: &[Variable]) -> Self {
        self.values
            .retain(|(name, _)| variables.iter().any(|v| v.as_str() == name));
        self
    }
}

/// External query engine
///
/// Implementations evaluate the parsed query against the given read view.
/// The view already reflects the caller's isolation level and pending
/// changes.
///
/// Thread safety: evaluators are shared by every connection of a
/// repository (requires Send + Sync).
pub trait QueryEvaluator: Send + Sync {
    /// Evaluate the query against `source`
    ///
    /// ASK queries return one empty solution for `true` and none for
    /// `false`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedQuery` for query shapes the engine cannot answer,
    /// or any error raised while reading `source`.
    fn evaluate(&self, query: &ParsedQuery, source: &dyn StatementSource)
        -> OptiResult<Vec<Solution>>;
}

/// Built-in evaluator for basic graph pattern queries
#[derive(Debug, Clone, Copy, Default)]
pub struct BgpEvaluator;

impl BgpEvaluator {
    /// Create the evaluator
    pub fn new() -> Self {
        BgpEvaluator
    }

    fn select(&self, pattern: &GraphPattern, source: &dyn StatementSource) -> OptiResult<Vec<Solution>> {
        match pattern {
            GraphPattern::Project { inner, variables } => Ok(self
                .select(inner, source)?
                .into_iter()
                .map(|row| row.project(variables))
                .collect()),
            GraphPattern::Distinct { inner } | GraphPattern::Reduced { inner } => {
                let mut seen = FxHashSet::default();
                let mut rows = self.select(inner, source)?;
                rows.retain(|row| seen.insert(row.clone()));
                Ok(rows)
            }
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => {
                let rows = self.select(inner, source)?.into_iter().skip(*start);
                Ok(match length {
                    Some(length) => rows.take(*length).collect(),
                    None => rows.collect(),
                })
            }
            _ => {
                let mut templates = Vec::new();
                collect_templates(pattern, &GraphSlot::Any, &mut templates)?;
                let templates: Vec<&QuadTemplate> = templates.iter().collect();
                Ok(solver::solutions(&templates, source)?
                    .iter()
                    .map(Solution::from_bindings)
                    .collect())
            }
        }
    }
}

impl QueryEvaluator for BgpEvaluator {
    fn evaluate(
        &self,
        query: &ParsedQuery,
        source: &dyn StatementSource,
    ) -> OptiResult<Vec<Solution>> {
        match query.query() {
            Query::Select { pattern, .. } => self.select(pattern, source),
            Query::Ask { pattern, .. } => {
                let found = !self.select(pattern, source)?.is_empty();
                Ok(if found {
                    vec![Solution::default()]
                } else {
                    Vec::new()
                })
            }
            _ => Err(OptiError::UnsupportedQuery(
                "only SELECT and ASK queries can be evaluated".to_string(),
            )),
        }
    }
}

fn collect_templates(
    pattern: &GraphPattern,
    graph: &GraphSlot,
    out: &mut Vec<QuadTemplate>,
) -> OptiResult<()> {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            out.extend(patterns.iter().map(|triple| quad_template(triple, graph)));
            Ok(())
        }
        GraphPattern::Join { left, right } => {
            collect_templates(left, graph, out)?;
            collect_templates(right, graph, out)
        }
        GraphPattern::Graph { name, inner } => {
            let graph = match name {
                NamedNodePattern::NamedNode(node) => GraphSlot::Const(node.clone().into()),
                NamedNodePattern::Variable(variable) => GraphSlot::Var(variable.as_str().to_owned()),
            };
            collect_templates(inner, &graph, out)
        }
        other => Err(OptiError::UnsupportedQuery(format!(
            "graph pattern not supported by the built-in evaluator: {other}"
        ))),
    }
}
