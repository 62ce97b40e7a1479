//! Rollback leaves the store and named query metadata untouched

use crate::common::*;

#[test]
fn rollback_is_invisible() {
    let repo = Repository::memory();
    add_now(&repo, typed("picasso", "Painter"));
    let query = named(&repo, "paintings", "SELECT ?w WHERE { [a ex:Painter] ex:paints ?w }");
    let metadata = query.metadata();
    let version = repo.version();

    let mut conn = manual(&repo);
    conn.add(quad("picasso", "paints", "guernica")).unwrap();
    conn.remove(typed("picasso", "Painter")).unwrap();
    conn.rollback().unwrap();

    assert_eq!(query.metadata(), metadata);
    assert_eq!(repo.version(), version);
    let mut reader = repo.connection().unwrap();
    assert_eq!(reader.size().unwrap(), 1);
    assert!(reader.contains(&typed("picasso", "Painter")).unwrap());
}

#[test]
fn add_remove_pair_never_visible() {
    let repo = Repository::memory();
    let query = named(&repo, "all", "SELECT * WHERE { ?s ?p ?o }");
    let metadata = query.metadata();

    let mut conn = manual(&repo);
    conn.add(quad("a", "p", "b")).unwrap();
    conn.remove(quad("a", "p", "b")).unwrap();
    conn.commit().unwrap();

    assert_eq!(query.metadata(), metadata);
    assert_eq!(repo.version(), 0);
}

#[test]
fn dropped_connection_rolls_back() {
    let repo = Repository::memory();
    {
        let mut conn = manual(&repo);
        conn.add(quad("a", "p", "b")).unwrap();
    }
    assert_eq!(repo.statistics().statements, 0);
}

#[test]
fn rollback_in_auto_commit_mode_is_noop() {
    let repo = Repository::memory();
    let mut conn = repo.connection().unwrap();
    conn.add(quad("a", "p", "b")).unwrap();
    conn.rollback().unwrap();
    assert!(conn.contains(&quad("a", "p", "b")).unwrap());
}

#[test]
fn transaction_usable_after_rollback() {
    let repo = Repository::memory();
    let mut conn = manual(&repo);
    conn.add(quad("a", "p", "b")).unwrap();
    conn.rollback().unwrap();

    conn.add(quad("c", "p", "d")).unwrap();
    conn.commit().unwrap();
    assert_eq!(repo.statistics().statements, 1);
}
