//! optirepo - optimistic-concurrency RDF repository
//!
//! A transactional layer over an in-memory RDF statement store. Each
//! connection reads and writes through its own view; conflicting concurrent
//! commits are detected at commit time. Named queries carry result metadata
//! (last-modified timestamp and tag) that changes whenever a commit may have
//! changed the query's result.
//!
//! # Quick Start
//!
//! ```ignore
//! use optirepo::{Repository, QueryLanguage};
//!
//! let repo = Repository::memory();
//! let q = repo.create_named_query("http://example.com/q", QueryLanguage::Sparql,
//!     "SELECT ?s WHERE { ?s a <http://example.com/Painter> }", None)?;
//!
//! let mut conn = repo.connection()?;
//! conn.set_auto_commit(false)?;
//! conn.add(statement)?;
//! conn.commit()?;   // q.result_tag() has changed
//! ```

pub use optirepo_concurrency::Isolation;
pub use optirepo_core::{
    BlankNode, ChangeSet, GraphName, Literal, NamedNode, OptiError, OptiResult, Quad, Statement,
    StatementPattern, StatementSource, StatementStore, Subject, Term,
};
pub use optirepo_engine::{
    Connection, NamedQuery, Repository, RepositoryConfig, RepositoryStatistics, ResultMetadata,
    TransactionMetrics,
};
pub use optirepo_query::{BgpEvaluator, ParsedQuery, QueryEvaluator, QueryLanguage, Solution};
