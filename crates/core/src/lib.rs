//! Core types for optirepo
//!
//! This crate defines the fundamental types shared by the storage,
//! concurrency, query and engine layers:
//! - Statement model (`oxrdf` quads) and wildcard statement patterns
//! - Change sets (net additions and removals)
//! - Error type
//! - Storage and read-view traits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod model;
pub mod traits;

pub use error::{OptiError, OptiResult};
pub use model::{
    BlankNode, ChangeSet, GraphName, Literal, NamedNode, Quad, Statement, StatementPattern,
    Subject, Term,
};
pub use traits::{StatementSource, StatementStore};
