use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use crate::authorship::record::AuthorshipRecord;
use crate::error::AttributionError;
use crate::git::refs::{
    batch_read_blobs, log_notes_for_range, note_blob_oids_for_commits, notes_add, notes_list,
    notes_ref_name, notes_remove, notes_show, ref_exists,
};
use crate::git::repository::Repository;
use crate::observability;
use crate::utils::{debug_log, short_sha};

/// Read access to authorship records, as the resolver needs it
pub trait ProvenanceLookup: Send + Sync {
    /// Record for one commit. Strict: a corrupt record is an error.
    fn lookup(&self, commit_sha: &str) -> Result<Option<AuthorshipRecord>, AttributionError>;

    /// Records for several commits; every requested commit appears in the result.
    fn lookup_many(
        &self,
        commit_shas: &[String],
    ) -> Result<HashMap<String, Option<AuthorshipRecord>>, AttributionError> {
        let mut result = HashMap::new();
        for sha in commit_shas {
            result.insert(sha.clone(), self.lookup(sha)?);
        }
        Ok(result)
    }
}

/// Authorship records stored as git notes under a reserved namespace.
///
/// Notes hang off the commit object, so they travel with the commit through
/// rebase and cherry-pick (with `notes.rewriteRef`) and can be read in bulk.
#[derive(Debug, Clone)]
pub struct NotesStore {
    repo: Repository,
    namespace: String,
}

impl NotesStore {
    pub fn new(repo: &Repository, namespace: &str) -> Self {
        NotesStore {
            repo: repo.clone(),
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// True once at least one record has been written
    pub fn has_namespace(&self) -> bool {
        ref_exists(&self.repo, &notes_ref_name(&self.namespace))
    }

    /// Write (or overwrite) the record for `record.commit`. Last write wins.
    pub fn put(&self, record: &AuthorshipRecord) -> Result<(), AttributionError> {
        let write_failed = |reason: String| AttributionError::StoreWriteFailed {
            commit: record.commit.clone(),
            reason,
        };

        record.validate().map_err(|e| write_failed(e.to_string()))?;
        let json = record
            .to_canonical_json()
            .map_err(|e| write_failed(e.to_string()))?;

        notes_add(&self.repo, &self.namespace, &record.commit, &json)
            .map_err(|e| write_failed(git_failure_reason(e)))?;

        debug_log(&format!(
            "Wrote authorship record for {} ({} files)",
            short_sha(&record.commit),
            record.files.len()
        ));
        Ok(())
    }

    /// Record for one commit; `Ok(None)` when the commit has none.
    pub fn get(&self, commit_sha: &str) -> Result<Option<AuthorshipRecord>, AttributionError> {
        let content = notes_show(&self.repo, &self.namespace, commit_sha).map_err(|e| {
            AttributionError::StoreReadFailed {
                commit: commit_sha.to_string(),
                reason: git_failure_reason(e),
            }
        })?;

        match content {
            Some(content) => decode_record(commit_sha, &content).map(Some),
            None => Ok(None),
        }
    }

    /// Strict batch read for an arbitrary set of commits (two git calls total).
    pub fn get_many(
        &self,
        commit_shas: &[String],
    ) -> Result<HashMap<String, Option<AuthorshipRecord>>, AttributionError> {
        let read_failed = |e: AttributionError| AttributionError::StoreReadFailed {
            commit: commit_shas.join(","),
            reason: git_failure_reason(e),
        };

        let blob_map =
            note_blob_oids_for_commits(&self.repo, &self.namespace, commit_shas).map_err(read_failed)?;

        let unique: HashSet<&String> = blob_map.values().collect();
        let mut blob_oids: Vec<String> = unique.into_iter().cloned().collect();
        blob_oids.sort();
        let contents = batch_read_blobs(&self.repo, &blob_oids).map_err(read_failed)?;

        let mut result = HashMap::new();
        for sha in commit_shas {
            let record = match blob_map.get(sha).and_then(|oid| contents.get(oid)) {
                Some(content) if !content.trim().is_empty() => Some(decode_record(sha, content)?),
                _ => None,
            };
            result.insert(sha.clone(), record);
        }
        Ok(result)
    }

    /// Every record in the namespace, keyed by commit.
    ///
    /// A namespace that does not exist yet lists as empty. Corrupt records are
    /// skipped, like in `get_range`.
    pub fn list(&self) -> Result<BTreeMap<String, AuthorshipRecord>, AttributionError> {
        let read_failed = |e: AttributionError| AttributionError::StoreReadFailed {
            commit: notes_ref_name(&self.namespace),
            reason: git_failure_reason(e),
        };

        let pairs = notes_list(&self.repo, &self.namespace).map_err(read_failed)?;
        if pairs.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut blob_oids: Vec<String> = pairs.iter().map(|(blob, _)| blob.clone()).collect();
        blob_oids.sort();
        blob_oids.dedup();
        let contents = batch_read_blobs(&self.repo, &blob_oids).map_err(read_failed)?;

        let mut records = BTreeMap::new();
        for (blob, commit_sha) in pairs {
            let Some(content) = contents.get(&blob) else {
                continue;
            };
            match decode_record(&commit_sha, content) {
                Ok(record) => {
                    records.insert(commit_sha, record);
                }
                Err(e) => skip_corrupt(&commit_sha, &e),
            }
        }
        Ok(records)
    }

    /// Records for every commit in `range` using a single history walk.
    ///
    /// Commits without a record are omitted, corrupt records are skipped, and
    /// an unusable range yields an empty map rather than an error.
    pub fn get_range(&self, range: &str) -> BTreeMap<String, AuthorshipRecord> {
        let start = Instant::now();
        let segments = match log_notes_for_range(&self.repo, &self.namespace, range) {
            Ok(segments) => segments,
            Err(e) => {
                debug_log(&format!("Range walk over '{}' failed: {}", range, e));
                return BTreeMap::new();
            }
        };

        let mut records = BTreeMap::new();
        for (commit_sha, body) in &segments {
            if body.is_empty() {
                continue;
            }
            match decode_record(commit_sha, body) {
                Ok(record) => {
                    records.insert(commit_sha.clone(), record);
                }
                Err(e) => skip_corrupt(commit_sha, &e),
            }
        }

        observability::log_performance(
            "store.get_range",
            start.elapsed(),
            Some(serde_json::json!({
                "range": range,
                "commits": segments.len(),
                "records": records.len(),
            })),
        );
        records
    }

    pub fn remove(&self, commit_sha: &str) -> Result<(), AttributionError> {
        notes_remove(&self.repo, &self.namespace, commit_sha).map_err(|e| {
            AttributionError::StoreWriteFailed {
                commit: commit_sha.to_string(),
                reason: git_failure_reason(e),
            }
        })
    }
}

impl ProvenanceLookup for NotesStore {
    fn lookup(&self, commit_sha: &str) -> Result<Option<AuthorshipRecord>, AttributionError> {
        self.get(commit_sha)
    }

    fn lookup_many(
        &self,
        commit_shas: &[String],
    ) -> Result<HashMap<String, Option<AuthorshipRecord>>, AttributionError> {
        self.get_many(commit_shas)
    }
}

/// In-memory records, for callers that already hold them (e.g. from `get_range`)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<String, AuthorshipRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: AuthorshipRecord) {
        self.records.insert(record.commit.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<AuthorshipRecord> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = AuthorshipRecord>>(iter: I) -> Self {
        let mut store = MemoryStore::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

impl ProvenanceLookup for MemoryStore {
    fn lookup(&self, commit_sha: &str) -> Result<Option<AuthorshipRecord>, AttributionError> {
        Ok(self.records.get(commit_sha).cloned())
    }
}

fn decode_record(commit_sha: &str, content: &str) -> Result<AuthorshipRecord, AttributionError> {
    let mut record =
        AuthorshipRecord::from_json(content).map_err(|e| AttributionError::StoreCorrupt {
            commit: commit_sha.to_string(),
            reason: e.to_string(),
        })?;
    // A note copied onto a rewritten commit still names the old one; the
    // commit it hangs off is authoritative.
    if is_full_object_id(commit_sha) {
        record.commit = commit_sha.to_string();
    }
    Ok(record)
}

fn is_full_object_id(s: &str) -> bool {
    (s.len() == 40 || s.len() == 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn skip_corrupt(commit_sha: &str, error: &AttributionError) {
    debug_log(&format!(
        "Skipping corrupt authorship record on {}: {}",
        short_sha(commit_sha),
        error
    ));
    observability::log_error(error, Some(serde_json::json!({ "commit": commit_sha })));
}

fn git_failure_reason(error: AttributionError) -> String {
    match error {
        AttributionError::GitCliError { stderr, .. } => stderr,
        other => other.to_string(),
    }
}
