use crate::authorship::record::{AuthorInfo, AuthorshipRecord};
use crate::authorship::store::NotesStore;
use crate::commands::absolute_file_arg;
use crate::config::Config;
use crate::error::AttributionError;
use crate::git::repository::Repository;
use crate::stats::events::{EventKind, EventLog, FileChange, TrackingEvent};
use crate::utils::{debug_log, short_sha};

#[derive(Debug, Clone)]
pub struct AnnotateArgs {
    pub commit: String,
    pub file: String,
    pub author: String,
    pub ai: bool,
    pub model: Option<String>,
}

/// Add an author for one file to a commit's record, creating the record if
/// needed, and log the matching tracking event.
pub fn handle_annotate(
    repo: &Repository,
    config: &Config,
    args: &AnnotateArgs,
) -> Result<AuthorshipRecord, AttributionError> {
    let sha = repo
        .rev_parse_commit(&args.commit)?
        .ok_or_else(|| AttributionError::Generic(format!("Unknown revision '{}'", args.commit)))?;
    let path = repo.relative_path(&absolute_file_arg(&args.file)?)?;

    let author = if args.ai {
        AuthorInfo::ai(&args.author, args.model.as_deref())
    } else {
        AuthorInfo::human(&args.author)
    };

    let store = NotesStore::new(repo, config.notes_ref());
    let mut record = store
        .get(&sha)?
        .unwrap_or_else(|| AuthorshipRecord::new(&sha));
    record.add_author(&path, author);
    store.put(&record)?;

    let (added, deleted) = repo.numstat(&sha, &path)?;
    let kind = if args.ai { EventKind::Ai } else { EventKind::Human };
    let mut event = TrackingEvent::new(kind, &args.author)
        .with_file(FileChange::new(&path, added, 0, deleted));
    if args.ai
        && let Some(model) = args.model.as_deref()
    {
        event = event.with_model(model);
    }
    if let Some(branch) = repo.current_branch()? {
        event = event.with_branch(&branch);
    }
    EventLog::for_repo(repo).append(&event)?;
    debug_log(&format!("Logged event {} for {}", event.id, path));

    println!(
        "Recorded {} ({}) for {} in {}",
        args.author,
        kind.as_str(),
        path,
        short_sha(&sha)
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorship::record::AuthorKind;
    use crate::git::test_utils::TmpRepo;

    fn annotate_args(commit: &str, file: &str, author: &str, model: Option<&str>) -> AnnotateArgs {
        AnnotateArgs {
            commit: commit.to_string(),
            file: file.to_string(),
            author: author.to_string(),
            ai: model.is_some(),
            model: model.map(|m| m.to_string()),
        }
    }

    #[test]
    fn test_annotate_merges_into_existing_record() {
        let tmp_repo = TmpRepo::new().expect("tmp repo");
        tmp_repo.write_file("a.py", "x = 1\ny = 2\n").unwrap();
        let sha = tmp_repo.commit_all("init", "Alice").unwrap();
        let abs = tmp_repo.path().join("a.py").to_string_lossy().to_string();
        let config = Config::default();

        handle_annotate(
            tmp_repo.repo(),
            &config,
            &annotate_args("HEAD", &abs, "Alice", None),
        )
        .unwrap();
        let record = handle_annotate(
            tmp_repo.repo(),
            &config,
            &annotate_args(&sha, &abs, "Claude Code", Some("claude-3-5-sonnet")),
        )
        .unwrap();

        let stored = NotesStore::new(tmp_repo.repo(), config.notes_ref())
            .get(&sha)
            .unwrap()
            .unwrap();
        assert_eq!(stored, record);
        let authors = &stored.file("a.py").unwrap().authors;
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].kind, AuthorKind::Human);
        assert_eq!(authors[1].model.as_deref(), Some("claude-3-5-sonnet"));

        let events = EventLog::for_repo(tmp_repo.repo()).read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, EventKind::Ai);
        assert_eq!(events[1].branch.as_deref(), Some("main"));
        assert_eq!(events[1].lines_added(), 2);
    }

    #[test]
    fn test_annotate_unknown_commit() {
        let tmp_repo = TmpRepo::new().expect("tmp repo");
        tmp_repo.write_file("a.py", "x\n").unwrap();
        tmp_repo.commit_all("init", "Alice").unwrap();
        let abs = tmp_repo.path().join("a.py").to_string_lossy().to_string();

        let result = handle_annotate(
            tmp_repo.repo(),
            &Config::default(),
            &annotate_args("nope", &abs, "Alice", None),
        );
        assert!(matches!(result, Err(AttributionError::Generic(_))));
    }
}
