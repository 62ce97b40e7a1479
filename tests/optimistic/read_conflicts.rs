//! Read-set validation of pattern and query reads

use crate::common::*;

fn painters_query() -> String {
    format!("{PREFIXES}SELECT ?p WHERE {{ ?p a ex:Painter }}")
}

#[test]
fn query_read_invalidated_by_concurrent_commit() {
    let repo = repo_with(Isolation::serializable());
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    assert!(t1.evaluate(&painters_query()).unwrap().is_empty());
    t1.add(quad("gallery", "hasPainters", "none")).unwrap();

    t2.add(typed("rembrandt", "Painter")).unwrap();
    t2.commit().unwrap();

    let err = t1.commit().unwrap_err();
    assert!(matches!(err, OptiError::ConcurrencyConflict { .. }));
    assert!(!t1.contains(&quad("gallery", "hasPainters", "none")).unwrap());
}

#[test]
fn pattern_read_invalidated_by_concurrent_commit() {
    let repo = repo_with(Isolation::serializable());
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    t1.match_statements(&instances_of("Painter")).unwrap();
    t2.add(typed("rembrandt", "Painter")).unwrap();
    t2.commit().unwrap();

    assert!(t1.commit().unwrap_err().is_conflict());
}

#[test]
fn read_only_transaction_is_validated() {
    let repo = repo_with(Isolation::serializable());
    let mut t1 = manual(&repo);
    t1.size().unwrap();

    add_now(&repo, quad("a", "p", "b"));
    assert!(t1.commit().unwrap_err().is_conflict());
}

#[test]
fn removal_matching_read_conflicts() {
    let repo = repo_with(Isolation::serializable());
    add_now(&repo, typed("picasso", "Painter"));

    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);
    assert_eq!(t1.match_statements(&instances_of("Painter")).unwrap().len(), 1);

    t2.remove(typed("picasso", "Painter")).unwrap();
    t2.commit().unwrap();
    assert!(t1.commit().is_err());
}

#[test]
fn unrelated_write_on_read_predicate_is_safe() {
    let repo = repo_with(Isolation::serializable());
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    t1.match_statements(&instances_of("Painter")).unwrap();
    t1.add(typed("picasso", "Painter")).unwrap();

    // same predicate, different class
    t2.add(typed("mozart", "Composer")).unwrap();
    t2.commit().unwrap();

    t1.commit().unwrap();
}

/// `t1` reads the paintings of known painters; `t2` commits a painting by
/// someone who is not a known painter
fn unjoined_painting(isolation: Isolation) -> OptiResult<()> {
    let repo = repo_with(isolation);
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    t1.evaluate(PAINTINGS_QUERY).unwrap();
    t1.add(quad("gallery", "opened", "today")).unwrap();

    t2.add(quad("rembrandt", "paints", "nightwatch")).unwrap();
    t2.commit().unwrap();

    t1.commit()
}

#[test]
fn query_join_not_satisfied_is_safe() {
    // the query result cannot change
    unjoined_painting(Isolation::default()).unwrap();
}

#[test]
fn serializable_query_conflicts_on_any_overlap() {
    let err = unjoined_painting(Isolation::serializable()).unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn write_skew_prevented() {
    let repo = repo_with(Isolation::serializable());
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    t1.match_statements(&StatementPattern::any().with_subject(ex("bob"))).unwrap();
    t2.match_statements(&StatementPattern::any().with_subject(ex("alice"))).unwrap();
    t1.add(quad("alice", "on", "call")).unwrap();
    t2.add(quad("bob", "on", "call")).unwrap();

    let (r1, r2) = commit_concurrently(t1, t2);
    assert!(r1.is_ok() != r2.is_ok());
}

#[test]
fn own_writes_are_not_conflicts() {
    let repo = repo_with(Isolation::serializable());
    let mut t1 = manual(&repo);
    t1.match_statements(&instances_of("Painter")).unwrap();
    t1.add(typed("picasso", "Painter")).unwrap();
    t1.match_statements(&instances_of("Painter")).unwrap();
    t1.commit().unwrap();
}
