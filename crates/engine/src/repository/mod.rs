//! Repository: the shared store, its transaction coordinator and the named
//! query registry
//!
//! A repository is opened either in memory or over a data directory. Over a
//! data directory it reads `optirepo.toml`, reloads `statements.bin` and
//! `named-queries.json`, and writes them back at shutdown.
//!
//! # Example
//!
//! ```ignore
//! let repo = Repository::memory();
//! let mut conn = repo.connection()?;
//! conn.set_auto_commit(false)?;
//! conn.add(statement)?;
//! conn.commit()?;
//! ```

pub mod config;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use optirepo_concurrency::CommitOutcome;
use optirepo_core::{OptiError, OptiResult, StatementStore};
use optirepo_query::{BgpEvaluator, QueryEvaluator, QueryLanguage};
use optirepo_storage::{load_statements, save_statements, MemoryStore};

use crate::connection::Connection;
use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use crate::invalidation::invalidate;
use crate::named_query::{NamedQuery, NamedQueryRegistry};

pub use config::{RepositoryConfig, CONFIG_FILE_NAME};

/// File holding the committed statements of a persistent repository.
pub const STATEMENTS_FILE_NAME: &str = "statements.bin";

/// State shared by a repository handle and its connections
pub(crate) struct RepositoryInner {
    pub(crate) config: RepositoryConfig,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) coordinator: TransactionCoordinator,
    pub(crate) registry: NamedQueryRegistry,
    pub(crate) evaluator: Arc<dyn QueryEvaluator>,
    closed: AtomicBool,
}

impl RepositoryInner {
    pub(crate) fn ensure_open(&self) -> OptiResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(OptiError::Closed)
        } else {
            Ok(())
        }
    }

    /// Commit hook: invalidate named queries, then persist if configured
    ///
    /// Runs under the commit lock.
    pub(crate) fn after_commit(&self, outcome: &CommitOutcome) -> OptiResult<()> {
        let Some(version) = outcome.version else {
            return Ok(());
        };
        let before = self.store.snapshot(version - 1);
        let after = self.store.snapshot(version);
        invalidate(&self.registry, &outcome.changes, before.as_ref(), after.as_ref());

        if self.config.sync_on_commit {
            self.save_statements()?;
        }
        Ok(())
    }

    fn statements_path(&self) -> Option<PathBuf> {
        self.config
            .data_dir
            .as_ref()
            .map(|dir| dir.join(STATEMENTS_FILE_NAME))
    }

    fn save_statements(&self) -> OptiResult<()> {
        match self.statements_path() {
            Some(path) => save_statements(&path, &self.store),
            None => Ok(()),
        }
    }

    fn flush(&self) -> OptiResult<()> {
        self.save_statements()?;
        self.registry.save()
    }
}

impl Drop for RepositoryInner {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            if let Err(e) = self.flush() {
                warn!(target: "optirepo::store", error = %e, "Failed to flush repository on drop");
            }
        }
    }
}

/// Repository statistics
#[derive(Debug, Clone)]
pub struct RepositoryStatistics {
    /// Current committed version
    pub version: u64,
    /// Number of visible statements
    pub statements: usize,
    /// Number of registered named queries
    pub named_queries: usize,
    /// Commits retained for validation
    pub retained_commits: usize,
    /// Transaction metrics
    pub transactions: TransactionMetrics,
}

/// Handle to a repository
///
/// Cheap to clone; all clones share the same store.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("config", &self.inner.config)
            .field("version", &self.inner.store.current_version())
            .finish()
    }
}

impl Repository {
    /// In-memory repository with default settings
    pub fn memory() -> Self {
        Self::from_parts(
            RepositoryConfig::default(),
            MemoryStore::new(),
            NamedQueryRegistry::new(),
            Arc::new(BgpEvaluator::new()),
        )
    }

    /// Open a repository with the built-in evaluator
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or its
    /// files cannot be loaded.
    pub fn open(config: RepositoryConfig) -> OptiResult<Self> {
        Self::open_with_evaluator(config, Arc::new(BgpEvaluator::new()))
    }

    /// Open a repository answering queries with `evaluator`
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or its
    /// files cannot be loaded.
    pub fn open_with_evaluator(
        config: RepositoryConfig,
        evaluator: Arc<dyn QueryEvaluator>,
    ) -> OptiResult<Self> {
        let (store, registry) = match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let store = load_statements(&dir.join(STATEMENTS_FILE_NAME))?.unwrap_or_default();
                (store, NamedQueryRegistry::open(dir)?)
            }
            None => (MemoryStore::new(), NamedQueryRegistry::new()),
        };
        info!(
            target: "optirepo::store",
            data_dir = ?config.data_dir,
            statements = store.len(),
            named_queries = registry.len(),
            "Repository opened"
        );
        Ok(Self::from_parts(config, store, registry, evaluator))
    }

    /// Open the repository in `dir`, reading `optirepo.toml`
    ///
    /// A default config file is written if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the data cannot be
    /// loaded.
    pub fn open_dir(dir: impl AsRef<Path>) -> OptiResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let config_path = dir.join(CONFIG_FILE_NAME);
        RepositoryConfig::write_default_if_missing(&config_path)?;
        let config = RepositoryConfig::from_file(&config_path)?.data_dir(dir);
        Self::open(config)
    }

    fn from_parts(
        config: RepositoryConfig,
        store: MemoryStore,
        registry: NamedQueryRegistry,
        evaluator: Arc<dyn QueryEvaluator>,
    ) -> Self {
        let store = Arc::new(store);
        Repository {
            inner: Arc::new(RepositoryInner {
                coordinator: TransactionCoordinator::new(store.clone()),
                config,
                store,
                registry,
                evaluator,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Repository settings
    pub fn config(&self) -> &RepositoryConfig {
        &self.inner.config
    }

    /// Current committed version
    pub fn version(&self) -> u64 {
        self.inner.store.current_version()
    }

    /// Open a connection in auto-commit mode
    ///
    /// # Errors
    ///
    /// Returns `Closed` after shutdown.
    pub fn connection(&self) -> OptiResult<Connection> {
        self.inner.ensure_open()?;
        Ok(Connection::new(Arc::clone(&self.inner)))
    }

    /// Register a named query
    ///
    /// The query is persistent when the repository has a data directory.
    /// An existing query with the same id is replaced.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIri`, `QuerySyntax`, or an I/O error if the registry
    /// cannot be saved.
    pub fn create_named_query(
        &self,
        id: &str,
        language: QueryLanguage,
        query: &str,
        base_iri: Option<&str>,
    ) -> OptiResult<Arc<NamedQuery>> {
        self.inner.ensure_open()?;
        self.inner.registry.register(id, language, query, base_iri, true)
    }

    /// Register a named query that is never persisted
    ///
    /// # Errors
    ///
    /// Returns `InvalidIri` or `QuerySyntax`.
    pub fn create_transient_named_query(
        &self,
        id: &str,
        language: QueryLanguage,
        query: &str,
        base_iri: Option<&str>,
    ) -> OptiResult<Arc<NamedQuery>> {
        self.inner.ensure_open()?;
        self.inner.registry.register(id, language, query, base_iri, false)
    }

    /// Look up a named query
    pub fn named_query(&self, id: &str) -> Option<Arc<NamedQuery>> {
        self.inner.registry.get(id)
    }

    /// Registered named query ids, sorted
    pub fn named_query_ids(&self) -> Vec<String> {
        self.inner.registry.ids()
    }

    /// Deregister a named query; unknown ids are ignored
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the registry cannot be saved.
    pub fn remove_named_query(&self, id: &str) -> OptiResult<()> {
        self.inner.registry.remove(id)?;
        Ok(())
    }

    /// Current statistics
    pub fn statistics(&self) -> RepositoryStatistics {
        RepositoryStatistics {
            version: self.inner.store.current_version(),
            statements: self.inner.store.len(),
            named_queries: self.inner.registry.len(),
            retained_commits: self.inner.coordinator.retained_commits(),
            transactions: self.inner.coordinator.metrics(),
        }
    }

    /// Write everything to disk and refuse further connections
    ///
    /// Open connections fail with `Closed` on their next operation.
    /// Calling shutdown twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn shutdown(&self) -> OptiResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.flush()?;
        info!(target: "optirepo::store", version = self.version(), "Repository shut down");
        Ok(())
    }

    /// Whether shutdown has been called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}
