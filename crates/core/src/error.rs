//! Error types for optirepo
//!
//! This module defines the error type shared by every layer of the repository.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for optirepo operations
pub type OptiResult<T> = std::result::Result<T, OptiError>;

/// Error types for the optimistic repository
#[derive(Debug, Error)]
pub enum OptiError {
    /// Commit-time conflict with a concurrently committed transaction
    ///
    /// The transaction has been rolled back; callers retry from a fresh
    /// snapshot.
    #[error("Concurrent modification detected, transaction {txn_id} aborted: {reason}")]
    ConcurrencyConflict {
        /// Transaction that lost the race
        txn_id: u64,
        /// Human-readable description of the first conflict
        reason: String,
    },

    /// Malformed query text
    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    /// Query language other than the supported ones
    #[error("Unsupported query language: {0}")]
    UnsupportedQueryLanguage(String),

    /// Query shape the built-in evaluator cannot answer
    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    /// Invalid IRI (named query identifiers, base IRIs)
    #[error("Invalid IRI '{iri}': {message}")]
    InvalidIri {
        /// The rejected IRI
        iri: String,
        /// Parser message
        message: String,
    },

    /// Operation on a transaction that is no longer active
    #[error("Transaction {txn_id} is not active: {state}")]
    TransactionNotActive {
        /// Transaction identifier
        txn_id: u64,
        /// Current state description
        state: String,
    },

    /// Invalid argument or operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection or repository already shut down
    #[error("Repository closed")]
    Closed,

    /// I/O error (data directory, persisted files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persisted data that cannot be decoded back into RDF terms
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Invalid configuration file
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OptiError {
    /// Build an `InvalidInput` error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        OptiError::InvalidInput(message.into())
    }

    /// Build a `Corruption` error
    pub fn corruption(message: impl Into<String>) -> Self {
        OptiError::Corruption(message.into())
    }

    /// Whether this error is a commit-time concurrency conflict
    ///
    /// Conflicts are the only errors a caller is expected to retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, OptiError::ConcurrencyConflict { .. })
    }
}
