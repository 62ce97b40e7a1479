//! Isolation settings
//!
//! Three independent switches decide how a transaction reads, buffers
//! writes and gets validated:
//!
//! | setting | true | false |
//! |---|---|---|
//! | `read_snapshot` | reads see the start version plus own changes | reads see the latest commit plus own changes |
//! | `snapshot` | writes buffered until commit, write-write and read conflicts detected | writes applied immediately, never conflict |
//! | `serializable` | any committed statement a read query could match aborts the reader | query reads conflict only when their result changes |

use serde::{Deserialize, Serialize};

/// Isolation settings of a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Isolation {
    /// Reads inside a transaction see a fixed point-in-time view
    pub read_snapshot: bool,
    /// Writes are isolated until commit
    pub snapshot: bool,
    /// Query reads are validated by potential overlap
    pub serializable: bool,
}

impl Default for Isolation {
    fn default() -> Self {
        Isolation {
            read_snapshot: true,
            snapshot: true,
            serializable: false,
        }
    }
}

impl Isolation {
    /// Snapshot isolation with overlap validation of query reads
    pub fn serializable() -> Self {
        Isolation {
            serializable: true,
            ..Isolation::default()
        }
    }

    /// Latest-commit reads with buffered writes
    pub fn read_committed() -> Self {
        Isolation {
            read_snapshot: false,
            ..Isolation::default()
        }
    }

    /// Writes applied immediately without commit-time validation
    pub fn unisolated() -> Self {
        Isolation {
            read_snapshot: false,
            snapshot: false,
            serializable: false,
        }
    }

    /// Check if commit has to consult the commit log
    pub fn validates(&self) -> bool {
        self.snapshot || self.serializable
    }
}
