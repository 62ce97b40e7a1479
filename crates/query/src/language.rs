//! Query language identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use optirepo_core::OptiError;

/// Dialect of a query text
///
/// Only SPARQL is understood; other names are rejected when a query is
/// parsed or a named query is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    /// SPARQL 1.1 query language
    #[default]
    Sparql,
}

impl QueryLanguage {
    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            QueryLanguage::Sparql => "sparql",
        }
    }
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryLanguage {
    type Err = OptiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("sparql") {
            Ok(QueryLanguage::Sparql)
        } else {
            Err(OptiError::UnsupportedQueryLanguage(s.to_string()))
        }
    }
}
