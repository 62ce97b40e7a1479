//! Named queries across shutdown and reopen

use crate::common::*;

const QUERY1: &str = "PREFIX ex: <http://example.com/>\n\
                      SELECT ?painting WHERE {[a ex:Painter] ex:paints ?painting}";

fn query1_id() -> String {
    format!("{EX}query1")
}

#[test]
fn persistent_query_survives_restart() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::open_dir(dir.path()).unwrap();
    let created = repo
        .create_named_query(&query1_id(), QueryLanguage::Sparql, QUERY1, None)
        .unwrap();
    assert!(created.is_persistent());
    repo.shutdown().unwrap();

    let repo = Repository::open_dir(dir.path()).unwrap();
    let reloaded = repo.named_query(&query1_id()).unwrap();
    assert_eq!(reloaded.query_string(), QUERY1);
    assert_eq!(reloaded.language(), QueryLanguage::Sparql);
}

#[test]
fn transient_query_absent_after_restart() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::open_dir(dir.path()).unwrap();
    repo.create_transient_named_query(&query1_id(), QueryLanguage::Sparql, QUERY1, None)
        .unwrap();
    repo.shutdown().unwrap();

    let repo = Repository::open_dir(dir.path()).unwrap();
    assert!(repo.named_query(&query1_id()).is_none());
}

#[test]
fn removed_query_absent_after_restart() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::open_dir(dir.path()).unwrap();
    repo.create_named_query(&query1_id(), QueryLanguage::Sparql, QUERY1, None)
        .unwrap();
    repo.create_named_query(&format!("{EX}kept"), QueryLanguage::Sparql, QUERY1, None)
        .unwrap();
    repo.remove_named_query(&query1_id()).unwrap();
    repo.shutdown().unwrap();

    let repo = Repository::open_dir(dir.path()).unwrap();
    assert_eq!(repo.named_query_ids(), vec![format!("{EX}kept")]);
}

#[test]
fn replaced_query_keeps_latest_text() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::open_dir(dir.path()).unwrap();
    let replacement = format!("{PREFIXES}SELECT ?p WHERE {{ ?p a ex:Painter }}");
    repo.create_named_query(&query1_id(), QueryLanguage::Sparql, QUERY1, None)
        .unwrap();
    repo.create_named_query(&query1_id(), QueryLanguage::Sparql, &replacement, None)
        .unwrap();
    drop(repo);

    let repo = Repository::open_dir(dir.path()).unwrap();
    assert_eq!(repo.named_query(&query1_id()).unwrap().query_string(), replacement);
}

#[test]
fn base_iri_round_trips() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::open_dir(dir.path()).unwrap();
    let text = "SELECT ?w WHERE { ?p <paints> ?w }";
    repo.create_named_query(&query1_id(), QueryLanguage::Sparql, text, Some(EX))
        .unwrap();
    repo.shutdown().unwrap();

    let repo = Repository::open_dir(dir.path()).unwrap();
    let reloaded = repo.named_query(&query1_id()).unwrap();
    assert_eq!(reloaded.base_iri(), Some(EX));
    assert_eq!(reloaded.query_string(), text);
}

#[test]
fn reloaded_query_is_still_invalidated() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::open_dir(dir.path()).unwrap();
    add_now(&repo, typed("picasso", "Painter"));
    repo.create_named_query(&query1_id(), QueryLanguage::Sparql, QUERY1, None)
        .unwrap();
    repo.shutdown().unwrap();

    let repo = Repository::open_dir(dir.path()).unwrap();
    assert_eq!(repo.statistics().statements, 1);
    let query = repo.named_query(&query1_id()).unwrap();
    let before = query.metadata();

    add_now(&repo, quad("rembrandt", "paints", "nightwatch"));
    assert_eq!(query.metadata(), before);
    add_now(&repo, quad("picasso", "paints", "guernica"));
    assert_ne!(query.metadata(), before);
}

#[test]
fn memory_repository_never_persists() {
    let repo = Repository::memory();
    let query = repo
        .create_named_query(&query1_id(), QueryLanguage::Sparql, QUERY1, None)
        .unwrap();
    assert!(!query.is_persistent());
}

#[test]
fn invalid_queries_rejected_at_creation() {
    let repo = Repository::memory();

    let err = repo
        .create_named_query("not an iri", QueryLanguage::Sparql, QUERY1, None)
        .unwrap_err();
    assert!(matches!(err, OptiError::InvalidIri { .. }));

    let err = repo
        .create_named_query(&query1_id(), QueryLanguage::Sparql, "SELECT WHERE {", None)
        .unwrap_err();
    assert!(matches!(err, OptiError::QuerySyntax(_)));
    assert!(repo.named_query(&query1_id()).is_none());
}

#[test]
fn corrupt_registry_file_fails_open() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("named-queries.json"), b"{ not json").unwrap();
    let err = Repository::open_dir(dir.path()).unwrap_err();
    assert!(matches!(err, OptiError::Corruption(_)));
}

#[test]
fn shutdown_closes_connections() {
    let dir = TempDir::new().unwrap();
    let repo = Repository::open_dir(dir.path()).unwrap();
    let mut conn = repo.connection().unwrap();
    repo.shutdown().unwrap();
    repo.shutdown().unwrap();

    assert!(matches!(conn.add(quad("a", "p", "b")), Err(OptiError::Closed)));
    assert!(matches!(repo.connection(), Err(OptiError::Closed)));
}
