//! Tag and last-modified change together

use std::collections::HashSet;

use crate::common::*;

fn assert_covariant(before: &ResultMetadata, after: &ResultMetadata) {
    assert_eq!(
        before.tag != after.tag,
        before.last_modified != after.last_modified,
        "tag and timestamp diverged: {before:?} -> {after:?}"
    );
    assert!(after.last_modified >= before.last_modified);
}

#[test]
fn tag_changes_with_timestamp_across_commits() {
    let repo = Repository::memory();
    let queries = vec![
        named(&repo, "paintings", "SELECT ?w WHERE { [a ex:Painter] ex:paints ?w }"),
        named(&repo, "painters", "SELECT ?p WHERE { ?p a ex:Painter }"),
        named(&repo, "everything", "SELECT * WHERE { ?s ?p ?o }"),
    ];

    let commits = [
        typed("picasso", "Painter"),
        quad("rembrandt", "paints", "nightwatch"),
        quad("picasso", "paints", "guernica"),
        typed("rembrandt", "Painter"),
        quad("mozart", "composed", "requiem"),
    ];

    for statement in commits {
        let before: Vec<ResultMetadata> = queries.iter().map(|q| q.metadata()).collect();
        add_now(&repo, statement);
        for (query, before) in queries.iter().zip(&before) {
            assert_covariant(before, &query.metadata());
        }
    }
}

#[test]
fn rapid_commits_produce_distinct_tags() {
    let repo = Repository::memory();
    let query = named(&repo, "everything", "SELECT * WHERE { ?s ?p ?o }");

    let mut tags = HashSet::new();
    tags.insert(query.result_tag());
    let mut conn = repo.connection().unwrap();
    for i in 0..200 {
        conn.add(quad(&format!("s{i}"), "p", "o")).unwrap();
        assert!(tags.insert(query.result_tag()), "tag repeated after commit {i}");
    }
}

#[test]
fn timestamps_strictly_increase() {
    let repo = Repository::memory();
    let query = named(&repo, "everything", "SELECT * WHERE { ?s ?p ?o }");

    let mut last = query.result_last_modified();
    let mut conn = repo.connection().unwrap();
    for i in 0..100 {
        conn.add(quad("s", "p", &format!("o{i}"))).unwrap();
        let current = query.result_last_modified();
        assert!(current > last);
        last = current;
    }
}

#[test]
fn same_instant_different_ids_differ() {
    let repo = Repository::memory();
    let a = named(&repo, "a", "SELECT * WHERE { ?s ?p ?o }");
    let b = named(&repo, "b", "SELECT * WHERE { ?s ?p ?o }");
    add_now(&repo, quad("s", "p", "o"));
    assert_ne!(a.result_tag(), b.result_tag());
}
