//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};

pub use optirepo::{
    Connection, GraphName, Isolation, NamedNode, NamedQuery, OptiError, OptiResult, Quad,
    QueryLanguage, Repository, RepositoryConfig, ResultMetadata, Statement, StatementPattern,
};
pub use tempfile::TempDir;

// ============================================================================
// Vocabulary
// ============================================================================

pub const EX: &str = "http://example.com/";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Prefix block prepended to every test query
pub const PREFIXES: &str = "PREFIX ex: <http://example.com/>\n";

/// Paintings by painters, with the painter as a blank node
pub const PAINTINGS_QUERY: &str =
    "PREFIX ex: <http://example.com/>\nSELECT ?painting WHERE { [a ex:Painter] ex:paints ?painting }";

pub fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{EX}{name}"))
}

pub fn rdf_type() -> NamedNode {
    NamedNode::new_unchecked(RDF_TYPE)
}

/// `ex:s ex:p ex:o` in the default graph
pub fn quad(s: &str, p: &str, o: &str) -> Statement {
    Quad::new(ex(s), ex(p), ex(o), GraphName::DefaultGraph)
}

/// `ex:s ex:p ex:o` in graph `ex:g`
pub fn quad_in(s: &str, p: &str, o: &str, g: &str) -> Statement {
    Quad::new(ex(s), ex(p), ex(o), ex(g))
}

/// `ex:s rdf:type ex:class`
pub fn typed(s: &str, class: &str) -> Statement {
    Quad::new(ex(s), rdf_type(), ex(class), GraphName::DefaultGraph)
}

/// Pattern `?x rdf:type ex:class`
pub fn instances_of(class: &str) -> StatementPattern {
    StatementPattern::any()
        .with_predicate(rdf_type())
        .with_object(ex(class))
}

// ============================================================================
// Repositories
// ============================================================================

pub fn repo_with(isolation: Isolation) -> Repository {
    Repository::open(RepositoryConfig::with_isolation(isolation)).unwrap()
}

/// Connection with auto-commit turned off
pub fn manual(repo: &Repository) -> Connection {
    let mut conn = repo.connection().unwrap();
    conn.set_auto_commit(false).unwrap();
    conn
}

pub fn named(repo: &Repository, id: &str, body: &str) -> Arc<NamedQuery> {
    repo.create_transient_named_query(
        &format!("{EX}{id}"),
        QueryLanguage::Sparql,
        &format!("{PREFIXES}{body}"),
        None,
    )
    .unwrap()
}

/// Auto-commit a single addition
pub fn add_now(repo: &Repository, statement: Statement) {
    repo.connection().unwrap().add(statement).unwrap();
}

/// Commit both connections, racing from a shared barrier
pub fn commit_concurrently(a: Connection, b: Connection) -> (OptiResult<()>, OptiResult<()>) {
    let barrier = Arc::new(Barrier::new(2));
    let spawn = |mut conn: Connection| -> JoinHandle<OptiResult<()>> {
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            conn.commit()
        })
    };
    let ha = spawn(a);
    let hb = spawn(b);
    (ha.join().unwrap(), hb.join().unwrap())
}
