//! Write-write conflicts under snapshot isolation

use crate::common::*;

#[test]
fn same_statement_added_twice_conflicts() {
    let repo = Repository::memory();
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);
    t1.add(typed("picasso", "Painter")).unwrap();
    t2.add(typed("picasso", "Painter")).unwrap();

    let (r1, r2) = commit_concurrently(t1, t2);
    assert!(r1.is_ok() != r2.is_ok(), "exactly one commit wins");
    let err = r1.err().or(r2.err()).unwrap();
    assert!(err.is_conflict());
    assert_eq!(repo.statistics().statements, 1);
}

#[test]
fn remove_versus_remove_conflicts() {
    let repo = Repository::memory();
    add_now(&repo, quad("picasso", "paints", "guernica"));

    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);
    t1.remove(quad("picasso", "paints", "guernica")).unwrap();
    t2.remove(quad("picasso", "paints", "guernica")).unwrap();

    t1.commit().unwrap();
    let err = t2.commit().unwrap_err();
    assert!(matches!(err, OptiError::ConcurrencyConflict { .. }));
}

#[test]
fn conflict_leaves_transaction_rolled_back() {
    let repo = Repository::memory();
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);
    t1.add(quad("a", "p", "b")).unwrap();
    t2.add(quad("a", "p", "b")).unwrap();
    t2.add(quad("only", "in", "t2")).unwrap();

    t1.commit().unwrap();
    assert!(t2.commit().is_err());

    // nothing of t2 is visible, and a retry from a fresh snapshot works
    assert!(!t2.contains(&quad("only", "in", "t2")).unwrap());
    t2.add(quad("only", "in", "t2")).unwrap();
    t2.commit().unwrap();
    assert_eq!(repo.statistics().statements, 2);
}

#[test]
fn cancelled_pair_does_not_conflict() {
    let repo = Repository::memory();
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    // add + remove in t2 leaves no trace, so nothing to conflict with
    t2.add(quad("a", "p", "b")).unwrap();
    t2.remove(quad("a", "p", "b")).unwrap();
    t1.add(quad("a", "p", "b")).unwrap();

    t1.commit().unwrap();
    t2.commit().unwrap();
    assert_eq!(repo.version(), 1);
}

#[test]
fn contexts_are_distinct_statements() {
    let repo = Repository::memory();
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);
    t1.add(quad_in("picasso", "type", "Painter", "g1")).unwrap();
    t2.add(quad_in("picasso", "type", "Painter", "g2")).unwrap();

    t1.commit().unwrap();
    t2.commit().unwrap();
}
