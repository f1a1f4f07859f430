use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_BRANCH;
use crate::error::AttributionError;
use crate::git::repository::Repository;
use crate::utils::debug_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Ai,
    Human,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ai => "ai",
            EventKind::Human => "human",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_modified: u64,
    #[serde(default)]
    pub lines_deleted: u64,
}

impl FileChange {
    pub fn new(path: &str, lines_added: u64, lines_modified: u64, lines_deleted: u64) -> Self {
        FileChange {
            path: path.to_string(),
            lines_added,
            lines_modified,
            lines_deleted,
        }
    }
}

/// A single authoring action: one author (human or AI tool) changing a set
/// of files at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: String,
    pub kind: EventKind,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Older events were written without a branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

impl TrackingEvent {
    pub fn new(kind: EventKind, author: &str) -> Self {
        TrackingEvent {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            author: author.to_string(),
            model: None,
            timestamp: Utc::now(),
            branch: None,
            files: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_file(mut self, change: FileChange) -> Self {
        self.files.push(change);
        self
    }

    pub fn is_ai(&self) -> bool {
        self.kind == EventKind::Ai
    }

    pub fn branch_or_default(&self) -> &str {
        self.branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }

    pub fn lines_added(&self) -> u64 {
        self.files.iter().map(|f| f.lines_added).sum()
    }

    pub fn lines_modified(&self) -> u64 {
        self.files.iter().map(|f| f.lines_modified).sum()
    }

    pub fn lines_deleted(&self) -> u64 {
        self.files.iter().map(|f| f.lines_deleted).sum()
    }
}

/// Append-only JSON-lines store of tracking events
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub const FILE_NAME: &'static str = "events.jsonl";

    pub fn for_repo(repo: &Repository) -> Self {
        Self::at(repo.storage_dir().join(Self::FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        EventLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &TrackingEvent) -> Result<(), AttributionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json_line = serde_json::to_string(event)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json_line)?;
        Ok(())
    }

    /// All readable events in file order. A missing log is empty; lines that
    /// fail to parse are skipped.
    pub fn read_all(&self) -> Result<Vec<TrackingEvent>, AttributionError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let mut events = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TrackingEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => debug_log(&format!(
                    "Skipping malformed event at {}:{}: {}",
                    self.path.display(),
                    idx + 1,
                    e
                )),
            }
        }
        Ok(events)
    }

    pub fn read_since(&self, since: DateTime<Utc>) -> Result<Vec<TrackingEvent>, AttributionError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.timestamp >= since)
            .collect())
    }
}
