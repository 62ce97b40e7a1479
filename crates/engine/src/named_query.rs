//! Named query registry
//!
//! A named query is a registered query text with result metadata: a
//! last-modified timestamp and an opaque tag. Both change together, exactly
//! when a commit may have changed the query's result.
//!
//! Persistent named queries are written to `named-queries.json` in the data
//! directory and reloaded at open. Their metadata starts fresh on reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use optirepo_core::{NamedNode, OptiError, OptiResult};
use optirepo_query::{ParsedQuery, QueryLanguage, QueryPlan};
use optirepo_storage::write_atomic;

/// File holding persistent named queries.
pub const NAMED_QUERIES_FILE_NAME: &str = "named-queries.json";

/// Result metadata of a named query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultMetadata {
    /// When the result last (possibly) changed
    pub last_modified: DateTime<Utc>,
    /// Opaque tag, derived from the query id and `last_modified`
    /// (microsecond precision)
    pub tag: String,
}

impl ResultMetadata {
    fn new(id: &str, last_modified: DateTime<Utc>) -> Self {
        let mut key = id.as_bytes().to_vec();
        key.extend_from_slice(&last_modified.timestamp_micros().to_be_bytes());
        ResultMetadata {
            last_modified,
            tag: format!("W/\"{:016x}\"", xxh3_64(&key)),
        }
    }

    fn next(&self, id: &str) -> Self {
        let floor = self.last_modified + Duration::microseconds(1);
        Self::new(id, truncate_to_micros(Utc::now()).max(floor))
    }
}

/// A registered query with its result metadata
#[derive(Debug)]
pub struct NamedQuery {
    id: String,
    query: ParsedQuery,
    persistent: bool,
    metadata: RwLock<ResultMetadata>,
}

impl NamedQuery {
    fn new(id: String, query: ParsedQuery, persistent: bool) -> Self {
        let metadata = ResultMetadata::new(&id, truncate_to_micros(Utc::now()));
        NamedQuery {
            id,
            query,
            persistent,
            metadata: RwLock::new(metadata),
        }
    }

    /// Query identifier (an IRI)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Original query text
    pub fn query_string(&self) -> &str {
        self.query.text()
    }

    /// Query language
    pub fn language(&self) -> QueryLanguage {
        self.query.language()
    }

    /// Base IRI the text was parsed against
    pub fn base_iri(&self) -> Option<&str> {
        self.query.base_iri()
    }

    /// Parsed query
    pub fn parsed(&self) -> &ParsedQuery {
        &self.query
    }

    /// Dependency plan
    pub fn plan(&self) -> &Arc<QueryPlan> {
        self.query.plan()
    }

    /// Whether the query survives a restart
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// When the result last (possibly) changed
    pub fn result_last_modified(&self) -> DateTime<Utc> {
        self.metadata.read().last_modified
    }

    /// Opaque result tag
    pub fn result_tag(&self) -> String {
        self.metadata.read().tag.clone()
    }

    /// Timestamp and tag read together
    pub fn metadata(&self) -> ResultMetadata {
        self.metadata.read().clone()
    }

    /// Mark the result as changed
    ///
    /// The new timestamp is strictly later than the previous one.
    pub(crate) fn touch(&self) -> ResultMetadata {
        let mut metadata = self.metadata.write();
        *metadata = metadata.next(&self.id);
        metadata.clone()
    }

    fn record(&self) -> NamedQueryRecord {
        NamedQueryRecord {
            id: self.id.clone(),
            query: self.query.text().to_owned(),
            language: self.query.language(),
            base_iri: self.query.base_iri().map(str::to_owned),
        }
    }
}

fn truncate_to_micros(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(time.timestamp_micros()).unwrap_or(time)
}

/// Persisted form of a named query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedQueryRecord {
    /// Query identifier
    pub id: String,
    /// Query text
    pub query: String,
    /// Query language
    #[serde(default)]
    pub language: QueryLanguage,
    /// Base IRI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_iri: Option<String>,
}

/// Registry of named queries
///
/// Owned by the repository. Metadata is only touched from the commit path.
#[derive(Debug, Default)]
pub struct NamedQueryRegistry {
    queries: DashMap<String, Arc<NamedQuery>>,
    path: Option<PathBuf>,
    save_lock: Mutex<()>,
}

impl NamedQueryRegistry {
    /// In-memory registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry persisted in `dir`, loaded from it if present
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded,
    /// or if a stored query no longer parses.
    pub fn open(dir: &Path) -> OptiResult<Self> {
        let path = dir.join(NAMED_QUERIES_FILE_NAME);
        let registry = NamedQueryRegistry {
            path: Some(path.clone()),
            ..Self::default()
        };
        if !path.exists() {
            return Ok(registry);
        }

        let bytes = std::fs::read(&path)?;
        let records: Vec<NamedQueryRecord> = serde_json::from_slice(&bytes).map_err(|e| {
            OptiError::corruption(format!("Failed to decode '{}': {}", path.display(), e))
        })?;
        for record in records {
            let query = ParsedQuery::parse(record.language, &record.query, record.base_iri.as_deref())?;
            registry
                .queries
                .insert(record.id.clone(), Arc::new(NamedQuery::new(record.id, query, true)));
        }
        info!(target: "optirepo::query", count = registry.queries.len(), "Loaded named queries");
        Ok(registry)
    }

    /// Whether registered queries can be persistent
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    /// Parse and register a query, replacing any query with the same id
    ///
    /// # Errors
    ///
    /// Returns `InvalidIri` if `id` is not an IRI, `QuerySyntax` if the text
    /// does not parse, or an I/O error if saving the registry fails.
    pub fn register(
        &self,
        id: &str,
        language: QueryLanguage,
        text: &str,
        base_iri: Option<&str>,
        persistent: bool,
    ) -> OptiResult<Arc<NamedQuery>> {
        NamedNode::new(id).map_err(|e| OptiError::InvalidIri {
            iri: id.to_owned(),
            message: e.to_string(),
        })?;
        let query = ParsedQuery::parse(language, text, base_iri)?;
        let persistent = persistent && self.is_persistent();

        let named = Arc::new(NamedQuery::new(id.to_owned(), query, persistent));
        let replaced = self.queries.insert(id.to_owned(), Arc::clone(&named));
        debug!(target: "optirepo::query", id, persistent, plan = %named.plan(), "Registered named query");

        if persistent || replaced.is_some_and(|q| q.is_persistent()) {
            self.save()?;
        }
        Ok(named)
    }

    /// Look up a query
    pub fn get(&self, id: &str) -> Option<Arc<NamedQuery>> {
        self.queries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.queries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// All registered queries
    pub fn queries(&self) -> Vec<Arc<NamedQuery>> {
        self.queries.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Number of registered queries
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Deregister a query
    ///
    /// Unknown ids are ignored. Returns `true` if a query was removed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if saving the registry fails.
    pub fn remove(&self, id: &str) -> OptiResult<bool> {
        let Some((_, removed)) = self.queries.remove(id) else {
            return Ok(false);
        };
        debug!(target: "optirepo::query", id, "Removed named query");
        if removed.is_persistent() {
            self.save()?;
        }
        Ok(true)
    }

    /// Write all persistent queries to disk
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub fn save(&self) -> OptiResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.save_lock.lock();
        let mut records: Vec<NamedQueryRecord> = self
            .queries
            .iter()
            .filter(|e| e.value().is_persistent())
            .map(|e| e.value().record())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let bytes = serde_json::to_vec_pretty(&records)
            .map_err(|e| OptiError::Serialization(e.to_string()))?;
        write_atomic(path, &bytes)?;
        Ok(())
    }
}
