//! Behavior of the three isolation settings

use crate::common::*;

#[test]
fn snapshot_isolation_detects_query_read_conflicts() {
    let repo = Repository::memory();
    let mut t1 = manual(&repo);
    let mut t2 = manual(&repo);

    assert!(t1
        .evaluate(&format!("{PREFIXES}SELECT ?p WHERE {{ ?p a ex:Painter }}"))
        .unwrap()
        .is_empty());
    t1.add(quad("gallery", "hasPainters", "none")).unwrap();

    t2.add(typed("rembrandt", "Painter")).unwrap();
    t2.commit().unwrap();

    let err = t1.commit().unwrap_err();
    assert!(matches!(err, OptiError::ConcurrencyConflict { .. }));
    assert!(!t1.contains(&quad("gallery", "hasPainters", "none")).unwrap());
}

#[test]
fn read_only_transaction_validated_by_default() {
    let repo = Repository::memory();
    let mut reader = manual(&repo);
    assert!(reader.match_statements(&instances_of("Painter")).unwrap().is_empty());

    add_now(&repo, typed("picasso", "Painter"));
    assert!(reader.commit().unwrap_err().is_conflict());

    // an untouched read commits
    reader.match_statements(&instances_of("Composer")).unwrap();
    add_now(&repo, typed("rembrandt", "Painter"));
    reader.commit().unwrap();
}

#[test]
fn bound_subject_read_conflicts_only_with_matching_commits() {
    let repo = Repository::memory();
    let about_picasso = StatementPattern::any().with_subject(ex("picasso"));

    let mut t1 = manual(&repo);
    t1.match_statements(&about_picasso).unwrap();
    t1.add(quad("gallery", "opened", "today")).unwrap();
    add_now(&repo, quad("rembrandt", "paints", "nightwatch"));
    t1.commit().unwrap();

    t1.match_statements(&about_picasso).unwrap();
    t1.add(quad("gallery", "closed", "tomorrow")).unwrap();
    add_now(&repo, quad("picasso", "paints", "guernica"));
    assert!(t1.commit().unwrap_err().is_conflict());
    assert_eq!(repo.statistics().statements, 3);
}

fn write_skew(repo: &Repository) -> (OptiResult<()>, OptiResult<()>) {
    let mut t1 = manual(repo);
    let mut t2 = manual(repo);

    t1.match_statements(&StatementPattern::any().with_subject(ex("bob"))).unwrap();
    t2.match_statements(&StatementPattern::any().with_subject(ex("alice"))).unwrap();
    t1.add(quad("alice", "on", "call")).unwrap();
    t2.add(quad("bob", "on", "call")).unwrap();

    commit_concurrently(t1, t2)
}

#[test]
fn write_skew_prevented_under_snapshot_isolation() {
    let repo = Repository::memory();
    let (r1, r2) = write_skew(&repo);
    assert!(r1.is_ok() != r2.is_ok());
    assert_eq!(repo.statistics().statements, 1);
}

#[test]
fn write_skew_allowed_when_unisolated() {
    let repo = repo_with(Isolation::unisolated());
    let (r1, r2) = write_skew(&repo);
    r1.unwrap();
    r2.unwrap();
    assert_eq!(repo.statistics().statements, 2);
}

#[test]
fn snapshot_reads_are_repeatable() {
    let repo = Repository::memory();
    let mut reader = manual(&repo);
    let before = reader.match_statements(&instances_of("Painter")).unwrap();

    add_now(&repo, typed("picasso", "Painter"));

    let after = reader.match_statements(&instances_of("Painter")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn read_committed_sees_concurrent_commits() {
    let repo = repo_with(Isolation::read_committed());
    let mut reader = manual(&repo);
    assert!(reader.match_statements(&instances_of("Painter")).unwrap().is_empty());

    add_now(&repo, typed("picasso", "Painter"));

    assert_eq!(reader.match_statements(&instances_of("Painter")).unwrap().len(), 1);

    // the empty result read first is stale
    assert!(reader.commit().unwrap_err().is_conflict());
}

#[test]
fn read_committed_keeps_own_changes_on_top() {
    let repo = repo_with(Isolation::read_committed());
    let mut conn = manual(&repo);
    add_now(&repo, typed("picasso", "Painter"));

    conn.remove(typed("picasso", "Painter")).unwrap();
    conn.add(typed("rembrandt", "Painter")).unwrap();

    let painters = conn.match_statements(&instances_of("Painter")).unwrap();
    assert_eq!(painters, vec![typed("rembrandt", "Painter")]);
}

#[test]
fn unisolated_writes_are_visible_immediately() {
    let repo = repo_with(Isolation::unisolated());
    let mut writer = manual(&repo);
    let mut reader = repo.connection().unwrap();

    writer.add(typed("picasso", "Painter")).unwrap();
    assert!(reader.contains(&typed("picasso", "Painter")).unwrap());
    writer.commit().unwrap();
    assert!(reader.contains(&typed("picasso", "Painter")).unwrap());
}

#[test]
fn config_file_selects_isolation() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("optirepo.toml"),
        "serializable = true\nread_snapshot = true\n",
    )
    .unwrap();
    let repo = Repository::open_dir(dir.path()).unwrap();
    assert_eq!(repo.config().isolation(), Isolation::serializable());

    let mut t1 = manual(&repo);
    t1.match_statements(&instances_of("Painter")).unwrap();
    add_now(&repo, typed("picasso", "Painter"));
    assert!(t1.commit().is_err());
}
