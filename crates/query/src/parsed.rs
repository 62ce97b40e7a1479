//! Parsed queries

use std::sync::Arc;

use spargebra::Query;

use optirepo_core::{OptiError, OptiResult};

use crate::language::QueryLanguage;
use crate::plan::QueryPlan;

/// A query text parsed once, together with its dependency plan
///
/// Cloning is cheap for the plan, which is shared with read sets and the
/// named query registry.
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    text: String,
    language: QueryLanguage,
    base_iri: Option<String>,
    query: Query,
    plan: Arc<QueryPlan>,
}

impl ParsedQuery {
    /// Parse a query text and derive its plan
    ///
    /// # Errors
    ///
    /// Returns `QuerySyntax` if the text (or the base IRI) is rejected by
    /// the parser.
    pub fn parse(language: QueryLanguage, text: &str, base_iri: Option<&str>) -> OptiResult<Self> {
        let query = match language {
            QueryLanguage::Sparql => {
                Query::parse(text, base_iri).map_err(|e| OptiError::QuerySyntax(e.to_string()))?
            }
        };
        let plan = Arc::new(QueryPlan::from_query(&query));
        Ok(ParsedQuery {
            text: text.to_owned(),
            language,
            base_iri: base_iri.map(str::to_owned),
            query,
            plan,
        })
    }

    /// Parse a SPARQL query text
    ///
    /// # Errors
    ///
    /// Returns `QuerySyntax` if the text is rejected by the parser.
    pub fn sparql(text: &str) -> OptiResult<Self> {
        Self::parse(QueryLanguage::Sparql, text, None)
    }

    /// Original query text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Language the text was parsed as
    pub fn language(&self) -> QueryLanguage {
        self.language
    }

    /// Base IRI used for relative references
    pub fn base_iri(&self) -> Option<&str> {
        self.base_iri.as_deref()
    }

    /// Parsed algebra
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Dependency plan
    pub fn plan(&self) -> &Arc<QueryPlan> {
        &self.plan
    }
}
