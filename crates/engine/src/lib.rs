//! Repository engine for optirepo
//!
//! This crate orchestrates all lower layers:
//! - Repository: shared store, open/shutdown, persistence
//! - Connection: auto-commit and transactional access
//! - Transaction coordination and metrics
//! - Named query registry and invalidation on commit
//!
//! The engine is the only component that knows about:
//! - Isolation settings of connections
//! - The commit hook (invalidation, persistence)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod coordinator;
pub mod invalidation;
pub mod named_query;
pub mod repository;

pub use connection::Connection;
pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use named_query::{NamedQuery, NamedQueryRecord, NamedQueryRegistry, ResultMetadata};
pub use repository::{Repository, RepositoryConfig, RepositoryStatistics};
