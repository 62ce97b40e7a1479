//! Statement file format
//!
//! The committed state is persisted as a single MessagePack document
//! (`statements.bin`) holding every live statement and the version it is
//! current at. Terms are stored in a tagged record form so the file does
//! not depend on any in-memory layout.
//!
//! # Format
//!
//! ```text
//! StatementFile {
//!     magic:          "ORST"
//!     format_version: u32
//!     version:        u64   latest committed version
//!     statements:     [StatementRecord]
//! }
//! ```
//!
//! Files are written with the write-fsync-rename pattern, so a crash never
//! leaves a half-written file at the final path.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use optirepo_core::{
    BlankNode, GraphName, Literal, NamedNode, OptiError, OptiResult, Quad, Statement, Subject,
    Term,
};

use crate::memory::MemoryStore;

/// Statement file magic bytes: "ORST"
pub const STATEMENTS_MAGIC: [u8; 4] = *b"ORST";

/// Current statement file format version
pub const STATEMENTS_FORMAT_VERSION: u32 = 1;

/// Serialized form of one RDF term or graph name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermRecord {
    /// IRI
    Iri(String),
    /// Blank node identifier
    Blank(String),
    /// Literal with its datatype IRI and optional language tag
    Literal {
        /// Lexical form
        value: String,
        /// Datatype IRI
        datatype: String,
        /// Language tag
        language: Option<String>,
    },
    /// The default graph (graph position only)
    DefaultGraph,
}

/// Serialized form of one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRecord {
    subject: TermRecord,
    predicate: String,
    object: TermRecord,
    graph: TermRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatementFile {
    magic: [u8; 4],
    format_version: u32,
    version: u64,
    statements: Vec<StatementRecord>,
}

impl From<&Subject> for TermRecord {
    fn from(subject: &Subject) -> Self {
        match subject {
            Subject::NamedNode(node) => TermRecord::Iri(node.as_str().to_owned()),
            Subject::BlankNode(node) => TermRecord::Blank(node.as_str().to_owned()),
            #[allow(unreachable_patterns)]
            other => TermRecord::Iri(other.to_string()),
        }
    }
}

impl From<&Term> for TermRecord {
    fn from(term: &Term) -> Self {
        match term {
            Term::NamedNode(node) => TermRecord::Iri(node.as_str().to_owned()),
            Term::BlankNode(node) => TermRecord::Blank(node.as_str().to_owned()),
            Term::Literal(literal) => TermRecord::Literal {
                value: literal.value().to_owned(),
                datatype: literal.datatype().as_str().to_owned(),
                language: literal.language().map(str::to_owned),
            },
            #[allow(unreachable_patterns)]
            other => TermRecord::Iri(other.to_string()),
        }
    }
}

impl From<&GraphName> for TermRecord {
    fn from(graph: &GraphName) -> Self {
        match graph {
            GraphName::NamedNode(node) => TermRecord::Iri(node.as_str().to_owned()),
            GraphName::BlankNode(node) => TermRecord::Blank(node.as_str().to_owned()),
            GraphName::DefaultGraph => TermRecord::DefaultGraph,
        }
    }
}

impl TermRecord {
    fn into_term(self) -> OptiResult<Term> {
        Ok(match self {
            TermRecord::Iri(iri) => NamedNode::new_unchecked(iri).into(),
            TermRecord::Blank(id) => BlankNode::new_unchecked(id).into(),
            TermRecord::Literal {
                value,
                language: Some(language),
                ..
            } => Literal::new_language_tagged_literal_unchecked(value, language).into(),
            TermRecord::Literal {
                value, datatype, ..
            } => Literal::new_typed_literal(value, NamedNode::new_unchecked(datatype)).into(),
            TermRecord::DefaultGraph => {
                return Err(OptiError::corruption(
                    "default graph marker in term position",
                ))
            }
        })
    }

    fn into_subject(self) -> OptiResult<Subject> {
        match self {
            TermRecord::Iri(iri) => Ok(NamedNode::new_unchecked(iri).into()),
            TermRecord::Blank(id) => Ok(BlankNode::new_unchecked(id).into()),
            other => Err(OptiError::corruption(format!(
                "invalid subject record: {other:?}"
            ))),
        }
    }

    fn into_graph_name(self) -> OptiResult<GraphName> {
        match self {
            TermRecord::Iri(iri) => Ok(NamedNode::new_unchecked(iri).into()),
            TermRecord::Blank(id) => Ok(BlankNode::new_unchecked(id).into()),
            TermRecord::DefaultGraph => Ok(GraphName::DefaultGraph),
            other => Err(OptiError::corruption(format!(
                "invalid graph record: {other:?}"
            ))),
        }
    }
}

impl From<&Statement> for StatementRecord {
    fn from(statement: &Statement) -> Self {
        StatementRecord {
            subject: (&statement.subject).into(),
            predicate: statement.predicate.as_str().to_owned(),
            object: (&statement.object).into(),
            graph: (&statement.graph_name).into(),
        }
    }
}

impl StatementRecord {
    /// Rebuild the statement
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if a term record is not valid at its position.
    pub fn into_statement(self) -> OptiResult<Statement> {
        Ok(Quad::new(
            self.subject.into_subject()?,
            NamedNode::new_unchecked(self.predicate),
            self.object.into_term()?,
            self.graph.into_graph_name()?,
        ))
    }
}

/// Persist every live statement of `store` to `path`
///
/// # Errors
///
/// Returns an error if encoding or any file operation fails.
pub fn save_statements(path: &Path, store: &MemoryStore) -> OptiResult<()> {
    let (version, statements) = store.live_statements();
    let file = StatementFile {
        magic: STATEMENTS_MAGIC,
        format_version: STATEMENTS_FORMAT_VERSION,
        version,
        statements: statements.iter().map(StatementRecord::from).collect(),
    };
    let bytes =
        rmp_serde::to_vec_named(&file).map_err(|e| OptiError::Serialization(e.to_string()))?;
    write_atomic(path, &bytes)?;

    debug!(
        target: "optirepo::store",
        path = %path.display(),
        version,
        statements = file.statements.len(),
        "Saved statements"
    );
    Ok(())
}

/// Load a store previously written by [`save_statements`]
///
/// Returns `None` if the file does not exist.
///
/// # Errors
///
/// Returns `Corruption` for a bad header or malformed records and `Io` if
/// reading fails.
pub fn load_statements(path: &Path) -> OptiResult<Option<MemoryStore>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    let file: StatementFile = rmp_serde::from_slice(&bytes)
        .map_err(|e| OptiError::corruption(format!("unreadable statement file: {e}")))?;

    if file.magic != STATEMENTS_MAGIC {
        return Err(OptiError::corruption("bad statement file magic"));
    }
    if file.format_version != STATEMENTS_FORMAT_VERSION {
        return Err(OptiError::corruption(format!(
            "unsupported statement file format version {}",
            file.format_version
        )));
    }

    let statements = file
        .statements
        .into_iter()
        .map(StatementRecord::into_statement)
        .collect::<OptiResult<Vec<_>>>()?;

    info!(
        target: "optirepo::store",
        path = %path.display(),
        version = file.version,
        statements = statements.len(),
        "Loaded statements"
    );
    Ok(Some(MemoryStore::restore(file.version, statements)))
}

/// Write `bytes` to `path` atomically (write-fsync-rename)
///
/// # Errors
///
/// Returns any I/O error from the write, sync or rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, path)?;

    // Sync parent directory
    if let Some(parent) = path.parent() {
        if parent.exists() {
            File::open(parent)?.sync_all()?;
        }
    }
    Ok(())
}
