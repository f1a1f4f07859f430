//! Provenance store behavior against real git notes.

#[macro_use]
mod repos;

use git_authorship::authorship::record::{AuthorInfo, AuthorshipRecord};
use git_authorship::authorship::store::NotesStore;
use git_authorship::config::Config;
use git_authorship::error::AttributionError;
use repos::test_repo::TestRepo;

/// Three commits: human, AI, human
fn three_commit_history(repo: &TestRepo) -> Vec<String> {
    repo.write("app.py", &lines!["a = 1"]);
    let first = repo.commit("first", "Alice");
    repo.write("app.py", &lines!["a = 1", "b = 2"]);
    let second = repo.commit("second", "Alice");
    repo.write("app.py", &lines!["a = 1", "b = 2", "c = 3"]);
    let third = repo.commit("third", "Bob");
    vec![first, second, third]
}

#[test]
fn test_put_then_get_round_trips() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);

    let mut record = AuthorshipRecord::new(&commits[1]);
    record.add_author("app.py", AuthorInfo::human("Alice"));
    record.add_author("app.py", AuthorInfo::ai("Claude Code", Some("claude-sonnet-4")));
    repo.store().put(&record).unwrap();

    assert_eq!(repo.store().get(&commits[1]).unwrap(), Some(record));
    assert_eq!(repo.store().get(&commits[0]).unwrap(), None);
}

#[test]
fn test_note_is_canonical_json_under_reserved_ref() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);
    let record = repo.record(&commits[0], &["app.py"], AuthorInfo::human("Alice"));

    let raw = repo.git(&["notes", "--ref=ai-authorship", "show", &commits[0]]);
    assert_eq!(raw.trim_end(), record.to_canonical_json().unwrap());
    assert!(raw.contains(r#""version":"1.0""#));
}

#[test]
fn test_last_write_wins() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);
    repo.record(&commits[2], &["app.py"], AuthorInfo::human("Bob"));
    let second = repo.record(&commits[2], &["app.py"], AuthorInfo::ai("Copilot", None));

    assert_eq!(repo.store().get(&commits[2]).unwrap(), Some(second));
}

#[test]
fn test_range_is_subset_of_individual_gets() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);
    repo.record(&commits[0], &["app.py"], AuthorInfo::human("Alice"));
    repo.record(&commits[1], &["app.py"], AuthorInfo::ai("Claude", Some("claude-3-opus")));

    let store = repo.store();
    let range = store.get_range(&format!("{}..HEAD", commits[0]));
    assert_eq!(range.len(), 1);
    for (sha, record) in &range {
        assert_eq!(store.get(sha).unwrap().as_ref(), Some(record));
    }

    let all = store.get_range("HEAD");
    assert_eq!(all.len(), 2);
    for sha in &commits {
        assert_eq!(all.get(sha), store.get(sha).unwrap().as_ref());
    }
}

#[test]
fn test_corrupt_note_is_strict_for_get_and_skipped_in_batches() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);
    repo.record(&commits[0], &["app.py"], AuthorInfo::human("Alice"));
    repo.git(&[
        "notes",
        "--ref=ai-authorship",
        "add",
        "-f",
        "-m",
        r#"{"version":"9.9","commit":"x","timestamp":"2024-01-01T00:00:00Z","files":{}}"#,
        &commits[1],
    ]);
    repo.git(&["notes", "--ref=ai-authorship", "add", "-f", "-m", "{not json", &commits[2]]);

    let store = repo.store();
    assert!(matches!(
        store.get(&commits[1]),
        Err(AttributionError::StoreCorrupt { .. })
    ));
    assert!(matches!(
        store.get(&commits[2]),
        Err(AttributionError::StoreCorrupt { .. })
    ));

    let range = store.get_range("HEAD");
    assert_eq!(range.keys().collect::<Vec<_>>(), vec![&commits[0]]);

    let listed = store.list().unwrap();
    assert_eq!(listed.keys().collect::<Vec<_>>(), vec![&commits[0]]);
}

#[test]
fn test_bad_range_reads_as_empty() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);
    repo.record(&commits[0], &["app.py"], AuthorInfo::human("Alice"));

    assert!(repo.store().get_range("no-such-branch..HEAD").is_empty());
}

#[test]
fn test_missing_namespace() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);

    let store = repo.store();
    assert!(!store.has_namespace());
    assert!(store.list().unwrap().is_empty());
    assert!(store.get_range("HEAD").is_empty());
    assert_eq!(store.get(&commits[0]).unwrap(), None);
}

#[test]
fn test_custom_namespace_is_isolated() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);
    repo.record(&commits[0], &["app.py"], AuthorInfo::human("Alice"));

    let config = Config::default().with_notes_ref("refs/notes/other");
    let other = NotesStore::new(repo.repo(), config.notes_ref());
    assert_eq!(other.namespace(), "other");
    assert_eq!(other.get(&commits[0]).unwrap(), None);
    assert!(other.list().unwrap().is_empty());
}

#[test]
fn test_get_many_matches_get() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);
    repo.record(&commits[0], &["app.py"], AuthorInfo::human("Alice"));
    repo.record(&commits[2], &["app.py"], AuthorInfo::ai("Cursor", None));

    let store = repo.store();
    let batch = store.get_many(&commits).unwrap();
    assert_eq!(batch.len(), 3);
    for sha in &commits {
        assert_eq!(batch.get(sha).cloned().flatten(), store.get(sha).unwrap());
    }
}

#[test]
fn test_remove() {
    let repo = TestRepo::new();
    let commits = three_commit_history(&repo);
    repo.record(&commits[0], &["app.py"], AuthorInfo::human("Alice"));

    let store = repo.store();
    store.remove(&commits[0]).unwrap();
    assert_eq!(store.get(&commits[0]).unwrap(), None);
    // removing again is not an error
    store.remove(&commits[0]).unwrap();
}
