//! Transactions writing disjoint statements never conflict

use crate::common::*;

#[test]
fn concurrent_painters_both_commit() {
    let repo = Repository::memory();
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    t1.add(typed("picasso", "Painter")).unwrap();
    t2.add(typed("rembrandt", "Painter")).unwrap();

    let (r1, r2) = commit_concurrently(t1, t2);
    r1.unwrap();
    r2.unwrap();

    let mut reader = repo.connection().unwrap();
    assert_eq!(reader.match_statements(&instances_of("Painter")).unwrap().len(), 2);
}

#[test]
fn disjoint_commits_succeed_in_either_order() {
    for first_wins in [true, false] {
        for isolation in [Isolation::default(), Isolation::serializable()] {
            let repo = repo_with(isolation);
            let mut t1 = manual(&repo);
            let mut t2 = manual(&repo);
            t1.add(quad("picasso", "name", "Pablo")).unwrap();
            t2.add(quad("rembrandt", "name", "Rembrandt")).unwrap();

            if first_wins {
                t1.commit().unwrap();
                t2.commit().unwrap();
            } else {
                t2.commit().unwrap();
                t1.commit().unwrap();
            }
            assert_eq!(repo.statistics().statements, 2);
        }
    }
}

#[test]
fn same_predicate_different_subjects_is_safe() {
    let repo = repo_with(Isolation::serializable());
    add_now(&repo, quad("picasso", "age", "a91"));
    add_now(&repo, quad("rembrandt", "age", "a63"));

    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    // each transaction reads and rewrites only its own subject
    let own = |s: &str| StatementPattern::any().with_subject(ex(s)).with_predicate(ex("age"));
    for (conn, subject, value) in [(&mut t1, "picasso", "a92"), (&mut t2, "rembrandt", "a64")] {
        let current = conn.match_statements(&own(subject)).unwrap();
        for statement in current {
            conn.remove(statement).unwrap();
        }
        conn.add(quad(subject, "age", value)).unwrap();
    }

    t1.commit().unwrap();
    t2.commit().unwrap();
    assert_eq!(repo.statistics().statements, 2);
}

#[test]
fn unisolated_writers_never_conflict() {
    let repo = repo_with(Isolation::unisolated());
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    t1.add(quad("a", "p", "b")).unwrap();
    t2.add(quad("a", "p", "b")).unwrap();
    t2.remove(quad("a", "p", "b")).unwrap();

    t1.commit().unwrap();
    t2.commit().unwrap();
}
