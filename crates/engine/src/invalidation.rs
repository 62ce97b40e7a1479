//! Named query invalidation
//!
//! Runs from the commit hook, under the commit lock, for every commit that
//! changed the store. Each registered query whose plan is affected by the
//! committed change set gets new result metadata; every other query is left
//! untouched.

use tracing::{debug, warn};

use optirepo_core::{ChangeSet, StatementSource};

use crate::named_query::NamedQueryRegistry;

/// Touch every named query affected by a committed change set
///
/// `before` and `after` are the store states right before and right after
/// the commit. When a plan check fails to read the store the query is
/// touched anyway. Returns the number of touched queries.
pub fn invalidate(
    registry: &NamedQueryRegistry,
    changes: &ChangeSet,
    before: &dyn StatementSource,
    after: &dyn StatementSource,
) -> usize {
    if changes.is_empty() {
        return 0;
    }

    let mut touched = 0;
    for query in registry.queries() {
        let affected = match query.plan().is_affected_by(changes, before, after) {
            Ok(affected) => affected,
            Err(e) => {
                warn!(target: "optirepo::query", id = query.id(), error = %e, "Plan check failed, invalidating");
                true
            }
        };
        if affected {
            let metadata = query.touch();
            debug!(
                target: "optirepo::query",
                id = query.id(),
                tag = %metadata.tag,
                version = after.version(),
                "Named query invalidated"
            );
            touched += 1;
        }
    }
    touched
}
