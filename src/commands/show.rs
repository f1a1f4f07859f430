use std::collections::BTreeMap;

use crate::authorship::record::AuthorshipRecord;
use crate::authorship::store::NotesStore;
use crate::config::Config;
use crate::error::AttributionError;
use crate::git::repository::Repository;
use crate::utils::short_sha;

fn resolve_commit(repo: &Repository, rev: &str) -> Result<String, AttributionError> {
    repo.rev_parse_commit(rev)?
        .ok_or_else(|| AttributionError::Generic(format!("Unknown revision '{}'", rev)))
}

/// Print the record attached to one commit
pub fn handle_show(repo: &Repository, config: &Config, rev: &str) -> Result<(), AttributionError> {
    let sha = resolve_commit(repo, rev)?;
    let store = NotesStore::new(repo, config.notes_ref());
    match store.get(&sha)? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No authorship data for {}", short_sha(&sha)),
    }
    Ok(())
}

pub fn handle_range(repo: &Repository, config: &Config, range: &str) -> Result<(), AttributionError> {
    let store = NotesStore::new(repo, config.notes_ref());
    let records = store.get_range(range);
    if records.is_empty() {
        println!("No authorship data in {}", range);
    } else {
        print!("{}", format_records(&records));
    }
    Ok(())
}

pub fn handle_list(repo: &Repository, config: &Config) -> Result<(), AttributionError> {
    let store = NotesStore::new(repo, config.notes_ref());
    let records = store.list()?;
    if records.is_empty() {
        println!("No authorship records under refs/notes/{}", store.namespace());
    } else {
        print!("{}", format_records(&records));
    }
    Ok(())
}

/// One line per commit: short sha, file count and the AI-touched files
pub fn format_records(records: &BTreeMap<String, AuthorshipRecord>) -> String {
    let mut out = String::new();
    for (sha, record) in records {
        let ai_files: Vec<&str> = record.ai_files().collect();
        let mut row = format!(
            "{} {} {}, {} AI",
            short_sha(sha),
            record.files.len(),
            if record.files.len() == 1 { "file" } else { "files" },
            ai_files.len()
        );
        if !ai_files.is_empty() {
            row.push_str(&format!(": {}", ai_files.join(", ")));
        }
        out.push_str(&row);
        out.push('\n');
    }
    out
}
