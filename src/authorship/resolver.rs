use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::authorship::blame::{BlameLine, BlameOptions};
use crate::authorship::heuristic::HeuristicClassifier;
use crate::authorship::record::AuthorshipRecord;
use crate::authorship::store::{NotesStore, ProvenanceLookup};
use crate::config::Config;
use crate::error::AttributionError;
use crate::git::repository::Repository;
use crate::observability;
use crate::utils::debug_log;

/// How a line's verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributionSource {
    /// An authorship record for the commit listed the file
    Record,
    /// No record; the blame author name matched a known AI tool
    Heuristic,
    /// No record and no match; credited to the blame author
    Blame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLine {
    pub line_number: u32,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub is_ai: bool,
    pub model: Option<String>,
    pub commit_sha: String,
    pub content: String,
    pub source: AttributionSource,
}

type RecordCache = HashMap<String, Option<AuthorshipRecord>>;

/// Joins `git blame` with authorship records to decide, line by line, who
/// wrote a file.
///
/// The per-commit record cache lives as long as the resolver, so one
/// resolver should be reused for every file of an analysis run.
pub struct AttributionResolver {
    repo: Repository,
    lookup: Arc<dyn ProvenanceLookup>,
    classifier: Option<HeuristicClassifier>,
    batch_prefetch: bool,
    blame_options: BlameOptions,
    cache: Mutex<RecordCache>,
}

impl AttributionResolver {
    pub fn new(repo: &Repository, config: &Config) -> Self {
        let store = NotesStore::new(repo, config.notes_ref());
        Self::with_lookup(repo, config, Arc::new(store))
    }

    pub fn with_lookup(repo: &Repository, config: &Config, lookup: Arc<dyn ProvenanceLookup>) -> Self {
        let flags = config.feature_flags();
        AttributionResolver {
            repo: repo.clone(),
            lookup,
            classifier: flags
                .heuristic_fallback
                .then(|| HeuristicClassifier::from_config(config)),
            batch_prefetch: flags.batch_prefetch,
            blame_options: BlameOptions::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_blame_options(mut self, options: BlameOptions) -> Self {
        self.blame_options = options;
        self
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Number of commits whose record (or absence) is memoized
    pub fn cached_commits(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> MutexGuard<'_, RecordCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve every line of `file_path` (absolute or workdir-relative).
    ///
    /// Blame and store failures are returned as-is; nothing is partially
    /// resolved.
    pub fn resolve_file(&self, file_path: &str) -> Result<Vec<ResolvedLine>, AttributionError> {
        let start = Instant::now();
        let relative = self.repo.relative_path(file_path)?;
        let blame = self.repo.blame_lines(&relative, &self.blame_options)?;

        let mut commits: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for line in &blame {
            if seen.insert(line.commit_sha.as_str()) {
                commits.push(line.commit_sha.clone());
            }
        }
        let records = self.records_for(&commits)?;
        let resolved = resolve_blame_lines(&relative, &blame, &records, self.classifier.as_ref());

        observability::log_performance(
            "resolver.resolve_file",
            start.elapsed(),
            Some(serde_json::json!({
                "lines": resolved.len(),
                "commits": commits.len(),
            })),
        );
        Ok(resolved)
    }

    /// Records for `commits`, served from the cache where possible.
    ///
    /// The cache lock is never held across a git call. Two threads missing
    /// the same commit may both read it; reads are idempotent.
    fn records_for(&self, commits: &[String]) -> Result<RecordCache, AttributionError> {
        let missing: Vec<String> = {
            let cache = self.lock_cache();
            commits
                .iter()
                .filter(|sha| !cache.contains_key(*sha))
                .filter(|sha| !is_uncommitted(sha))
                .cloned()
                .collect()
        };

        if !missing.is_empty() {
            let fetched = if self.batch_prefetch {
                self.lookup.lookup_many(&missing)?
            } else {
                let mut fetched = HashMap::new();
                for sha in &missing {
                    fetched.insert(sha.clone(), self.lookup.lookup(sha)?);
                }
                fetched
            };
            debug_log(&format!(
                "Fetched authorship for {} commits ({} with records)",
                missing.len(),
                fetched.values().filter(|r| r.is_some()).count()
            ));
            let mut cache = self.lock_cache();
            for sha in &missing {
                let record = fetched.get(sha).cloned().flatten();
                cache.insert(sha.clone(), record);
            }
        }

        let cache = self.lock_cache();
        Ok(commits
            .iter()
            .map(|sha| (sha.clone(), cache.get(sha).cloned().flatten()))
            .collect())
    }

    /// Resolve many files in parallel, sharing the commit cache.
    ///
    /// A file that cannot be resolved maps to `None` instead of failing the
    /// whole batch.
    pub async fn resolve_files(
        self: Arc<Self>,
        paths: Vec<String>,
    ) -> Vec<(String, Option<Vec<ResolvedLine>>)> {
        self.resolve_files_with(paths, |_| {}).await
    }

    /// `resolve_files` with a callback run as each file finishes, in
    /// completion order
    pub async fn resolve_files_with<F>(
        self: Arc<Self>,
        paths: Vec<String>,
        on_file_done: F,
    ) -> Vec<(String, Option<Vec<ResolvedLine>>)>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let on_file_done = Arc::new(on_file_done);
        let tasks = paths.into_iter().map(|path| {
            let resolver = Arc::clone(&self);
            let on_file_done = Arc::clone(&on_file_done);
            smol::unblock(move || {
                let result = match resolver.resolve_file(&path) {
                    Ok(lines) => Some(lines),
                    Err(e) => {
                        debug_log(&format!("No attribution for {}: {}", path, e));
                        if !e.is_skippable() {
                            observability::log_error(&e, Some(serde_json::json!({ "path": path })));
                        }
                        None
                    }
                };
                on_file_done(&path);
                (path, result)
            })
        });
        futures::future::join_all(tasks).await
    }

    /// Blocking wrapper around `resolve_files`
    pub fn resolve_files_blocking(
        self: Arc<Self>,
        paths: Vec<String>,
    ) -> Vec<(String, Option<Vec<ResolvedLine>>)> {
        smol::block_on(self.resolve_files(paths))
    }
}

/// Blame reports lines changed in the working tree under the all-zero id
fn is_uncommitted(sha: &str) -> bool {
    !sha.is_empty() && sha.bytes().all(|b| b == b'0')
}

/// Decide each blamed line of `file_path` from the prefetched `records`.
pub fn resolve_blame_lines(
    file_path: &str,
    blame: &[BlameLine],
    records: &RecordCache,
    classifier: Option<&HeuristicClassifier>,
) -> Vec<ResolvedLine> {
    blame
        .iter()
        .map(|line| {
            let record = records.get(&line.commit_sha).and_then(|r| r.as_ref());
            resolve_line(file_path, line, record, classifier)
        })
        .collect()
}

fn resolve_line(
    file_path: &str,
    line: &BlameLine,
    record: Option<&AuthorshipRecord>,
    classifier: Option<&HeuristicClassifier>,
) -> ResolvedLine {
    let mut resolved = ResolvedLine {
        line_number: line.line_number,
        author: line.author.clone(),
        timestamp: line.author_time,
        is_ai: false,
        model: None,
        commit_sha: line.commit_sha.clone(),
        content: line.content.clone(),
        source: AttributionSource::Blame,
    };

    if let Some(file) = record.and_then(|r| r.file(file_path))
        && let Some(author) = file.attributed_author()
    {
        resolved.author = author.name.clone();
        resolved.is_ai = author.is_ai();
        resolved.model = if author.is_ai() {
            author.model.clone()
        } else {
            None
        };
        resolved.source = AttributionSource::Record;
        return resolved;
    }

    if let Some(matched) = classifier.and_then(|c| c.classify_author(&line.author, line.author_time)) {
        resolved.is_ai = true;
        resolved.model = Some(matched.model);
        resolved.source = AttributionSource::Heuristic;
    }

    resolved
}
