//! Backtracking matcher for conjunctive quad templates
//!
//! Used in two places:
//! - invalidation and read validation ask whether the rest of a join is
//!   still satisfiable once one template has been unified with a changed
//!   statement
//! - the built-in evaluator enumerates every solution of a basic graph
//!   pattern
//!
//! The search always expands the template with the most bound positions
//! next, so each step hits the narrowest store index available.

use rustc_hash::FxHashMap;

use optirepo_core::{OptiResult, StatementSource, Term};

use crate::plan::QuadTemplate;

/// Variable name → bound term
pub type Bindings = FxHashMap<String, Term>;

/// Check if the templates have at least one solution extending `bindings`
///
/// # Errors
///
/// Returns an error if reading from `source` fails.
pub fn satisfiable(
    templates: &[&QuadTemplate],
    bindings: &Bindings,
    source: &dyn StatementSource,
) -> OptiResult<bool> {
    let mut found = false;
    search(templates, bindings.clone(), source, &mut |_: &Bindings| {
        found = true;
        false
    })?;
    Ok(found)
}

/// Every solution of the templates
///
/// # Errors
///
/// Returns an error if reading from `source` fails.
pub fn solutions(
    templates: &[&QuadTemplate],
    source: &dyn StatementSource,
) -> OptiResult<Vec<Bindings>> {
    let mut out = Vec::new();
    search(templates, Bindings::default(), source, &mut |bindings: &Bindings| {
        out.push(bindings.clone());
        true
    })?;
    Ok(out)
}

/// Depth-first search; `visit` returns false to stop early
///
/// Returns false once the search has been stopped.
fn search(
    remaining: &[&QuadTemplate],
    bindings: Bindings,
    source: &dyn StatementSource,
    visit: &mut dyn FnMut(&Bindings) -> bool,
) -> OptiResult<bool> {
    let Some(next) = remaining
        .iter()
        .enumerate()
        .max_by_key(|(_, template)| template.bound_positions(&bindings))
        .map(|(index, _)| index)
    else {
        return Ok(visit(&bindings));
    };

    let template = remaining[next];
    let rest: Vec<&QuadTemplate> = remaining
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != next)
        .map(|(_, template)| *template)
        .collect();

    // A binding of the wrong kind (literal subject, blank predicate) can never match
    let Some(pattern) = template.to_pattern(&bindings) else {
        return Ok(true);
    };

    for statement in source.match_pattern(&pattern)? {
        let mut extended = bindings.clone();
        if template.bind(&statement, &mut extended) && !search(&rest, extended, source, visit)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{GraphSlot, Slot};
    use optirepo_core::{ChangeSet, GraphName, NamedNode, Quad, StatementStore};
    use optirepo_storage::MemoryStore;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{name}"))
    }

    fn var(name: &str) -> Slot<Term> {
        Slot::Var(name.to_owned())
    }

    fn template(s: Slot<Term>, p: &str, o: Slot<Term>) -> QuadTemplate {
        QuadTemplate {
            subject: s,
            predicate: Slot::Const(ex(p)),
            object: o,
            graph: GraphSlot::Any,
        }
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        let quad = |s: &str, p: &str, o: &str| {
            Quad::new(ex(s), ex(p), ex(o), GraphName::DefaultGraph)
        };
        store
            .apply(
                1,
                &ChangeSet::from_parts(
                    Vec::new(),
                    vec![
                        quad("picasso", "type", "Painter"),
                        quad("picasso", "paints", "guernica"),
                        quad("rembrandt", "paints", "nightwatch"),
                    ],
                ),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_solutions_of_join() {
        let store = store();
        let view = store.live_view();
        let typed = template(var("x"), "type", Slot::Const(ex("Painter").into()));
        let paints = template(var("x"), "paints", var("w"));

        let found = solutions(&[&typed, &paints], &view).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("w"), Some(&Term::from(ex("guernica"))));
    }

    #[test]
    fn test_satisfiable_respects_bindings() {
        let store = store();
        let view = store.live_view();
        let typed = template(var("x"), "type", Slot::Const(ex("Painter").into()));

        let mut bindings = Bindings::default();
        bindings.insert("x".to_owned(), ex("rembrandt").into());
        assert!(!satisfiable(&[&typed], &bindings, &view).unwrap());

        bindings.insert("x".to_owned(), ex("picasso").into());
        assert!(satisfiable(&[&typed], &bindings, &view).unwrap());
    }

    #[test]
    fn test_empty_conjunction_is_satisfiable() {
        let store = MemoryStore::new();
        let view = store.live_view();
        assert!(satisfiable(&[], &Bindings::default(), &view).unwrap());
    }
}
