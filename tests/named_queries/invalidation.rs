//! Which commits change a named query's result metadata

use crate::common::*;

#[test]
fn painting_by_known_painter_invalidates() {
    let repo = Repository::memory();
    let q1 = named(&repo, "q1", "SELECT ?painting WHERE { [a ex:Painter] ex:paints ?painting }");
    let before = q1.metadata();

    add_now(&repo, typed("picasso", "Painter"));
    add_now(&repo, quad("picasso", "paints", "guernica"));

    assert!(q1.result_last_modified() > before.last_modified);
    assert_ne!(q1.result_tag(), before.tag);
}

#[test]
fn painting_by_unknown_painter_does_not_invalidate() {
    let repo = Repository::memory();
    let q1 = named(&repo, "q1", "SELECT ?painting WHERE { [a ex:Painter] ex:paints ?painting }");
    let before = q1.metadata();

    add_now(&repo, quad("rembrandt", "paints", "nightwatch"));

    assert_eq!(q1.metadata(), before);
}

#[test]
fn painter_without_paintings_does_not_invalidate() {
    let repo = Repository::memory();
    let q1 = named(&repo, "q1", "SELECT ?painting WHERE { [a ex:Painter] ex:paints ?painting }");
    let before = q1.metadata();

    add_now(&repo, typed("picasso", "Painter"));
    assert_eq!(q1.metadata(), before);

    // completing the join later does
    add_now(&repo, quad("picasso", "paints", "guernica"));
    assert_ne!(q1.metadata(), before);
}

#[test]
fn new_named_graph_invalidates_graph_listing() {
    let repo = Repository::memory();
    let graphs = named(&repo, "graphs", "SELECT ?g WHERE { GRAPH ?g { } }");
    let before = graphs.metadata();

    add_now(&repo, quad("picasso", "paints", "guernica"));
    assert_eq!(graphs.metadata(), before);

    add_now(&repo, quad_in("picasso", "paints", "guernica", "newgraph"));
    assert!(graphs.result_last_modified() > before.last_modified);
    assert_ne!(graphs.result_tag(), before.tag);
}

#[test]
fn pattern_free_query_invalidated_by_any_commit() {
    let repo = Repository::memory();
    let constant = named(&repo, "constant", "SELECT ?x WHERE { VALUES ?x { ex:a } }");
    let before = constant.metadata();

    add_now(&repo, quad("mozart", "composed", "requiem"));
    assert_ne!(constant.metadata(), before);
}

#[test]
fn removal_invalidates() {
    let repo = Repository::memory();
    add_now(&repo, typed("picasso", "Painter"));
    add_now(&repo, quad("picasso", "paints", "guernica"));
    let q1 = named(&repo, "q1", "SELECT ?painting WHERE { [a ex:Painter] ex:paints ?painting }");
    let before = q1.metadata();

    repo.connection()
        .unwrap()
        .remove(typed("picasso", "Painter"))
        .unwrap();

    assert_ne!(q1.metadata(), before);
}

#[test]
fn optional_clause_invalidates() {
    let repo = Repository::memory();
    add_now(&repo, typed("picasso", "Painter"));
    let query = named(
        &repo,
        "names",
        "SELECT ?p ?n WHERE { ?p a ex:Painter OPTIONAL { ?p ex:name ?n } }",
    );
    let before = query.metadata();

    add_now(&repo, quad("mozart", "composed", "requiem"));
    assert_eq!(query.metadata(), before);

    add_now(&repo, quad("picasso", "name", "pablo"));
    assert_ne!(query.metadata(), before);
}

#[test]
fn union_branch_invalidates() {
    let repo = Repository::memory();
    let query = named(
        &repo,
        "artists",
        "SELECT ?x WHERE { { ?x a ex:Painter } UNION { ?x a ex:Sculptor } }",
    );
    let before = query.metadata();

    add_now(&repo, typed("mozart", "Composer"));
    assert_eq!(query.metadata(), before);

    add_now(&repo, typed("rodin", "Sculptor"));
    assert_ne!(query.metadata(), before);
}

#[test]
fn filter_exists_invalidates() {
    let repo = Repository::memory();
    add_now(&repo, typed("picasso", "Painter"));
    let query = named(
        &repo,
        "working",
        "SELECT ?p WHERE { ?p a ex:Painter FILTER EXISTS { ?p ex:paints ?w } }",
    );
    let before = query.metadata();

    add_now(&repo, quad("mozart", "composed", "requiem"));
    assert_eq!(query.metadata(), before);

    add_now(&repo, quad("picasso", "paints", "guernica"));
    assert_ne!(query.metadata(), before);
}

#[test]
fn filter_not_exists_invalidates() {
    let repo = Repository::memory();
    add_now(&repo, typed("picasso", "Painter"));
    let query = named(
        &repo,
        "idle",
        "SELECT ?p WHERE { ?p a ex:Painter FILTER NOT EXISTS { ?p ex:paints ?w } }",
    );
    let before = query.metadata();

    add_now(&repo, quad("picasso", "paints", "guernica"));
    assert_ne!(query.metadata(), before);
}

#[test]
fn graph_clause_limits_invalidation() {
    let repo = Repository::memory();
    let query = named(&repo, "g1", "SELECT ?s WHERE { GRAPH ex:g1 { ?s ?p ?o } }");
    let before = query.metadata();

    add_now(&repo, quad_in("a", "p", "b", "g2"));
    add_now(&repo, quad("a", "p", "b"));
    assert_eq!(query.metadata(), before);

    add_now(&repo, quad_in("a", "p", "b", "g1"));
    assert_ne!(query.metadata(), before);
}

#[test]
fn buffered_changes_invalidate_at_commit() {
    let repo = Repository::memory();
    let q1 = named(&repo, "q1", "SELECT ?painting WHERE { [a ex:Painter] ex:paints ?painting }");
    let before = q1.metadata();

    let mut conn = manual(&repo);
    conn.add(typed("picasso", "Painter")).unwrap();
    conn.add(quad("picasso", "paints", "guernica")).unwrap();
    assert_eq!(q1.metadata(), before);

    conn.commit().unwrap();
    assert_ne!(q1.metadata(), before);
}

#[test]
fn failed_commit_does_not_invalidate() {
    let repo = Repository::memory();
    let query = named(&repo, "all", "SELECT * WHERE { ?s ?p ?o }");

    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);
    t1.add(quad("a", "p", "b")).unwrap();
    t2.add(quad("a", "p", "b")).unwrap();
    t2.add(quad("c", "p", "d")).unwrap();

    t1.commit().unwrap();
    let after_first = query.metadata();
    assert!(t2.commit().is_err());
    assert_eq!(query.metadata(), after_first);
}

#[test]
fn queries_registered_later_start_fresh() {
    let repo = Repository::memory();
    add_now(&repo, typed("picasso", "Painter"));
    add_now(&repo, quad("picasso", "paints", "guernica"));

    let q1 = named(&repo, "q1", "SELECT ?painting WHERE { [a ex:Painter] ex:paints ?painting }");
    let before = q1.metadata();
    add_now(&repo, quad("rembrandt", "paints", "nightwatch"));
    assert_eq!(q1.metadata(), before);
}
