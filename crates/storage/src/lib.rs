//! Storage layer for optirepo
//!
//! This crate implements the statement storage backend with:
//! - MemoryStore: multi-version statement table with RwLock
//! - Positional secondary indices (subject, predicate, object)
//! - StoreSnapshot / LiveView read views
//! - MessagePack persistence of the committed state
//!
//! # Versioning
//!
//! Every committed change set is applied at a new version. Statements keep
//! the versions they were live at, so a snapshot at any version that has
//! not been vacuumed reads exactly the state committed at that version.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod memory;
pub mod persist;
pub mod snapshot;

pub use index::{StatementIndex, TermIndex};
pub use memory::MemoryStore;
pub use persist::{load_statements, save_statements, write_atomic};
pub use snapshot::{LiveView, StoreSnapshot};
