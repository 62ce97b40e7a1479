//! Repository configuration via `optirepo.toml`
//!
//! On first open of a data directory a default `optirepo.toml` is created.
//! To change settings, edit the file and reopen the repository.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use optirepo_concurrency::Isolation;
use optirepo_core::{OptiError, OptiResult};

/// Config file name placed in the repository data directory.
pub const CONFIG_FILE_NAME: &str = "optirepo.toml";

/// Repository configuration loaded from `optirepo.toml`.
///
/// # Example
///
/// ```toml
/// read_snapshot = true
/// snapshot = true
/// serializable = false
/// sync_on_commit = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Reads inside a transaction see the store as of transaction start.
    #[serde(default = "default_true")]
    pub read_snapshot: bool,
    /// Writes are buffered and reads validated at commit.
    #[serde(default = "default_true")]
    pub snapshot: bool,
    /// Query reads conflict with any overlapping commit.
    #[serde(default)]
    pub serializable: bool,
    /// Write statements to disk on every commit instead of only at shutdown.
    #[serde(default)]
    pub sync_on_commit: bool,
    /// Data directory; `None` keeps everything in memory.
    #[serde(skip)]
    pub data_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            read_snapshot: true,
            snapshot: true,
            serializable: false,
            sync_on_commit: false,
            data_dir: None,
        }
    }
}

impl RepositoryConfig {
    /// In-memory configuration with the given isolation
    pub fn with_isolation(isolation: Isolation) -> Self {
        Self {
            read_snapshot: isolation.read_snapshot,
            snapshot: isolation.snapshot,
            serializable: isolation.serializable,
            ..Self::default()
        }
    }

    /// Use `dir` as the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Isolation settings for new transactions
    pub fn isolation(&self) -> Isolation {
        Isolation {
            read_snapshot: self.read_snapshot,
            snapshot: self.snapshot,
            serializable: self.serializable,
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# optirepo repository configuration
#
# Reads inside a transaction see the store as of transaction start
# (false = every read sees the latest commit)
read_snapshot = true

# Writes are buffered until commit and checked for write-write conflicts
# (false = every write is applied immediately and never conflicts)
snapshot = true

# Reads are validated at commit: a concurrent commit that changes what a
# transaction read aborts it
serializable = false

# Write statements to disk on every commit (default: only at shutdown)
sync_on_commit = false
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> OptiResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OptiError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            OptiError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> OptiResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                OptiError::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to_file(&self, path: &Path) -> OptiResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| OptiError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            OptiError::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
