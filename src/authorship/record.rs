use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Authorship record format version written by this crate
pub const AUTHORSHIP_RECORD_VERSION: &str = "1.0";

/// Versions this crate can read
const SUPPORTED_VERSIONS: &[&str] = &[AUTHORSHIP_RECORD_VERSION];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorKind {
    Human,
    Ai,
}

impl AuthorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorKind::Human => "human",
            AuthorKind::Ai => "ai",
        }
    }
}

impl fmt::Display for AuthorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AuthorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AuthorInfo {
    pub fn human(name: &str) -> Self {
        AuthorInfo {
            name: name.to_string(),
            kind: AuthorKind::Human,
            model: None,
        }
    }

    pub fn ai(name: &str, model: Option<&str>) -> Self {
        AuthorInfo {
            name: name.to_string(),
            kind: AuthorKind::Ai,
            model: model.map(|m| m.to_string()),
        }
    }

    pub fn is_ai(&self) -> bool {
        self.kind == AuthorKind::Ai
    }
}

/// Who touched one file in one commit.
///
/// The record is per file, not per line: a commit that mixes AI and human
/// edits to the same file lists both authors and cannot say which lines
/// belong to whom.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileAuthorship {
    pub authors: Vec<AuthorInfo>,
}

impl FileAuthorship {
    /// The author a line from this commit is credited to: the first AI author
    /// if there is one, otherwise the first human.
    pub fn attributed_author(&self) -> Option<&AuthorInfo> {
        self.authors
            .iter()
            .find(|a| a.is_ai())
            .or_else(|| self.authors.first())
    }

    pub fn has_ai_author(&self) -> bool {
        self.authors.iter().any(|a| a.is_ai())
    }

    /// Append an author unless an identical one is already listed
    pub fn add_author(&mut self, author: AuthorInfo) {
        if !self.authors.contains(&author) {
            self.authors.push(author);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorshipRecord {
    pub version: String,
    pub commit: String,
    pub timestamp: DateTime<Utc>,
    pub files: BTreeMap<String, FileAuthorship>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDecodeError {
    Malformed(String),
    MissingVersion,
    UnsupportedVersion(String),
    EmptyAuthors(String),
}

impl fmt::Display for RecordDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordDecodeError::Malformed(e) => write!(f, "malformed record: {}", e),
            RecordDecodeError::MissingVersion => write!(f, "record has no version"),
            RecordDecodeError::UnsupportedVersion(v) => write!(
                f,
                "unsupported record version {} (expected {})",
                v, AUTHORSHIP_RECORD_VERSION
            ),
            RecordDecodeError::EmptyAuthors(path) => {
                write!(f, "file {} has an empty author list", path)
            }
        }
    }
}

impl AuthorshipRecord {
    /// Empty record for `commit`, stamped with the current time
    pub fn new(commit: &str) -> Self {
        Self::with_timestamp(commit, Utc::now())
    }

    pub fn with_timestamp(commit: &str, timestamp: DateTime<Utc>) -> Self {
        AuthorshipRecord {
            version: AUTHORSHIP_RECORD_VERSION.to_string(),
            commit: commit.to_string(),
            // RFC3339 on disk carries whole seconds
            timestamp: timestamp.trunc_subsecs(0),
            files: BTreeMap::new(),
        }
    }

    pub fn add_author(&mut self, file_path: &str, author: AuthorInfo) {
        self.files
            .entry(file_path.to_string())
            .or_default()
            .add_author(author);
    }

    pub fn file(&self, file_path: &str) -> Option<&FileAuthorship> {
        self.files.get(file_path)
    }

    pub fn ai_files(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|(_, fa)| fa.has_ai_author())
            .map(|(path, _)| path.as_str())
    }

    /// Canonical JSON (RFC 8785): sorted keys, no insignificant whitespace
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json_canonicalizer::to_string(self)
    }

    /// Decode a stored record, rejecting unknown or missing versions and
    /// files with no authors.
    pub fn from_json(content: &str) -> Result<Self, RecordDecodeError> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| RecordDecodeError::Malformed(e.to_string()))?;

        let version = match value.get("version") {
            Some(serde_json::Value::String(v)) => v.clone(),
            _ => return Err(RecordDecodeError::MissingVersion),
        };
        if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
            return Err(RecordDecodeError::UnsupportedVersion(version));
        }

        let record: AuthorshipRecord = serde_json::from_value(value)
            .map_err(|e| RecordDecodeError::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), RecordDecodeError> {
        for (path, file) in &self.files {
            if file.authors.is_empty() {
                return Err(RecordDecodeError::EmptyAuthors(path.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> AuthorshipRecord {
        let ts = Utc.with_ymd_and_hms(2024, 8, 1, 12, 30, 0).unwrap();
        let mut record = AuthorshipRecord::with_timestamp(&"c".repeat(40), ts);
        record.add_author("src/main.rs", AuthorInfo::human("Alice"));
        record.add_author(
            "src/main.rs",
            AuthorInfo::ai("Claude Code", Some("claude-3-5-sonnet")),
        );
        record.add_author("README.md", AuthorInfo::human("Alice"));
        record
    }

    #[test]
    fn test_canonical_json_shape() {
        let json = sample_record().to_canonical_json().unwrap();
        assert_eq!(
            json,
            format!(
                concat!(
                    r#"{{"commit":"{}","files":{{"README.md":{{"authors":[{{"name":"Alice","type":"human"}}]}},"#,
                    r#""src/main.rs":{{"authors":[{{"name":"Alice","type":"human"}},"#,
                    r#"{{"model":"claude-3-5-sonnet","name":"Claude Code","type":"ai"}}]}}}},"#,
                    r#""timestamp":"2024-08-01T12:30:00Z","version":"1.0"}}"#
                ),
                "c".repeat(40)
            )
        );
    }

    #[test]
    fn test_json_round_trip() {
        let record = sample_record();
        let json = record.to_canonical_json().unwrap();
        assert_eq!(AuthorshipRecord::from_json(&json).unwrap(), record);
    }

    #[test]
    fn test_missing_version_rejected() {
        let json = r#"{"commit":"abc","timestamp":"2024-08-01T12:30:00Z","files":{}}"#;
        assert_eq!(
            AuthorshipRecord::from_json(json),
            Err(RecordDecodeError::MissingVersion)
        );
    }

    #[test]
    fn test_unknown_version_rejected() {
        let json =
            r#"{"version":"9.9","commit":"abc","timestamp":"2024-08-01T12:30:00Z","files":{}}"#;
        assert_eq!(
            AuthorshipRecord::from_json(json),
            Err(RecordDecodeError::UnsupportedVersion("9.9".to_string()))
        );
    }

    #[test]
    fn test_unknown_author_type_rejected() {
        let json = r#"{"version":"1.0","commit":"abc","timestamp":"2024-08-01T12:30:00Z",
            "files":{"a.rs":{"authors":[{"name":"x","type":"robot"}]}}}"#;
        assert!(matches!(
            AuthorshipRecord::from_json(json),
            Err(RecordDecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_author_list_rejected() {
        let json = r#"{"version":"1.0","commit":"abc","timestamp":"2024-08-01T12:30:00Z",
            "files":{"a.rs":{"authors":[]}}}"#;
        assert_eq!(
            AuthorshipRecord::from_json(json),
            Err(RecordDecodeError::EmptyAuthors("a.rs".to_string()))
        );
    }

    #[test]
    fn test_attributed_author_prefers_ai() {
        let record = sample_record();
        let file = record.file("src/main.rs").unwrap();
        let author = file.attributed_author().unwrap();
        assert_eq!(author.name, "Claude Code");
        assert_eq!(author.model.as_deref(), Some("claude-3-5-sonnet"));

        let readme = record.file("README.md").unwrap();
        assert_eq!(readme.attributed_author().unwrap().name, "Alice");
        assert_eq!(record.ai_files().collect::<Vec<_>>(), vec!["src/main.rs"]);
    }

    #[test]
    fn test_add_author_dedupes() {
        let mut record = AuthorshipRecord::new("abc");
        record.add_author("a.rs", AuthorInfo::human("Bob"));
        record.add_author("a.rs", AuthorInfo::human("Bob"));
        assert_eq!(record.file("a.rs").unwrap().authors.len(), 1);
    }
}
