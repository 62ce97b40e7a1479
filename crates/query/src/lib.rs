//! Query layer for optirepo
//!
//! This crate turns query texts into the structures the rest of the
//! repository works with:
//! - ParsedQuery: SPARQL text parsed with `spargebra`
//! - QueryPlan: the statement patterns a query depends on, with a
//!   join-aware "can this change affect the result" test
//! - QueryEvaluator: the seam to an external SPARQL engine, plus the
//!   built-in BgpEvaluator for basic graph pattern queries

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod evaluator;
pub mod language;
pub mod parsed;
pub mod plan;
pub mod solver;

pub use evaluator::{BgpEvaluator, QueryEvaluator, Solution};
pub use language::QueryLanguage;
pub use parsed::ParsedQuery;
pub use plan::{Atom, GraphSlot, PathTemplate, PatternGroup, QuadTemplate, QueryPlan, Slot};
pub use solver::Bindings;
