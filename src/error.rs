use std::fmt;

#[derive(Debug)]
pub enum AttributionError {
    IoError(std::io::Error),
    /// Errors from invoking the git CLI that exited with a non-zero status
    GitCliError {
        code: Option<i32>,
        stderr: String,
        args: Vec<String>,
    },
    JsonError(serde_json::Error),
    Utf8Error(std::str::Utf8Error),
    FromUtf8Error(std::string::FromUtf8Error),
    /// The file cannot be blamed (binary, untracked, or absent from history).
    /// Batch callers skip the file instead of aborting.
    BlameUnavailable { path: String, reason: String },
    /// Reading a note failed for a reason other than "no note for this object"
    StoreReadFailed { commit: String, reason: String },
    StoreWriteFailed { commit: String, reason: String },
    /// A note exists but does not decode as a supported authorship record
    StoreCorrupt { commit: String, reason: String },
    InvalidFilterPattern { pattern: String, reason: String },
    Generic(String),
}

impl fmt::Display for AttributionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributionError::IoError(e) => write!(f, "IO error: {}", e),
            AttributionError::GitCliError { code, stderr, args } => match code {
                Some(c) => write!(
                    f,
                    "Git CLI ({}) failed with exit code {}: {}",
                    args.join(" "),
                    c,
                    stderr
                ),
                None => write!(f, "Git CLI ({}) failed: {}", args.join(" "), stderr),
            },
            AttributionError::JsonError(e) => write!(f, "JSON error: {}", e),
            AttributionError::Utf8Error(e) => write!(f, "UTF-8 error: {}", e),
            AttributionError::FromUtf8Error(e) => write!(f, "From UTF-8 error: {}", e),
            AttributionError::BlameUnavailable { path, reason } => {
                write!(f, "Blame unavailable for {}: {}", path, reason)
            }
            AttributionError::StoreReadFailed { commit, reason } => {
                write!(f, "Failed to read authorship note for {}: {}", commit, reason)
            }
            AttributionError::StoreWriteFailed { commit, reason } => {
                write!(f, "Failed to write authorship note for {}: {}", commit, reason)
            }
            AttributionError::StoreCorrupt { commit, reason } => {
                write!(f, "Corrupt authorship note for {}: {}", commit, reason)
            }
            AttributionError::InvalidFilterPattern { pattern, reason } => {
                write!(f, "Invalid filter pattern '{}': {}", pattern, reason)
            }
            AttributionError::Generic(e) => write!(f, "Generic error: {}", e),
        }
    }
}

impl std::error::Error for AttributionError {}

impl AttributionError {
    /// True for failures that a batch run should treat as "skip this item".
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            AttributionError::BlameUnavailable { .. } | AttributionError::StoreCorrupt { .. }
        )
    }
}

impl From<std::io::Error> for AttributionError {
    fn from(err: std::io::Error) -> Self {
        AttributionError::IoError(err)
    }
}

impl From<serde_json::Error> for AttributionError {
    fn from(err: serde_json::Error) -> Self {
        AttributionError::JsonError(err)
    }
}

impl From<std::str::Utf8Error> for AttributionError {
    fn from(err: std::str::Utf8Error) -> Self {
        AttributionError::Utf8Error(err)
    }
}

impl From<std::string::FromUtf8Error> for AttributionError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        AttributionError::FromUtf8Error(err)
    }
}

impl Clone for AttributionError {
    fn clone(&self) -> Self {
        match self {
            AttributionError::IoError(e) => {
                AttributionError::IoError(std::io::Error::new(e.kind(), e.to_string()))
            }
            AttributionError::GitCliError { code, stderr, args } => AttributionError::GitCliError {
                code: *code,
                stderr: stderr.clone(),
                args: args.clone(),
            },
            AttributionError::JsonError(e) => {
                AttributionError::Generic(format!("JSON error: {}", e))
            }
            AttributionError::Utf8Error(e) => AttributionError::Utf8Error(*e),
            AttributionError::FromUtf8Error(e) => AttributionError::FromUtf8Error(e.clone()),
            AttributionError::BlameUnavailable { path, reason } => {
                AttributionError::BlameUnavailable {
                    path: path.clone(),
                    reason: reason.clone(),
                }
            }
            AttributionError::StoreReadFailed { commit, reason } => {
                AttributionError::StoreReadFailed {
                    commit: commit.clone(),
                    reason: reason.clone(),
                }
            }
            AttributionError::StoreWriteFailed { commit, reason } => {
                AttributionError::StoreWriteFailed {
                    commit: commit.clone(),
                    reason: reason.clone(),
                }
            }
            AttributionError::StoreCorrupt { commit, reason } => AttributionError::StoreCorrupt {
                commit: commit.clone(),
                reason: reason.clone(),
            },
            AttributionError::InvalidFilterPattern { pattern, reason } => {
                AttributionError::InvalidFilterPattern {
                    pattern: pattern.clone(),
                    reason: reason.clone(),
                }
            }
            AttributionError::Generic(s) => AttributionError::Generic(s.clone()),
        }
    }
}
