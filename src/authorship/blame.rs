use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

use crate::error::AttributionError;
use crate::git::repository::Repository;

/// One line of a blamed file, as reported by `git blame --porcelain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    /// 1-based line number in the current file
    pub line_number: u32,
    pub commit_sha: String,
    pub author: String,
    pub author_time: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct BlameOptions {
    /// Only consider history up to and including this revision
    pub newest_commit: Option<String>,
}

/// Commit metadata is printed only for the first block of each commit in
/// porcelain mode; later blocks of the same commit carry just the header.
#[derive(Debug, Clone, Default)]
struct CommitMeta {
    author: String,
    author_time: i64,
}

fn is_commit_header(sha: &str) -> bool {
    (sha.len() == 40 || sha.len() == 64) && sha.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse `git blame --porcelain` output into per-line records.
///
/// Empty input yields an empty vec. Lines that belong to no block are ignored.
pub fn parse_porcelain(output: &str) -> Vec<BlameLine> {
    let mut lines = Vec::new();
    let mut meta_by_commit: HashMap<String, CommitMeta> = HashMap::new();

    let mut cur_commit: Option<String> = None;
    let mut cur_final_line: u32 = 0;

    for line in output.lines() {
        if let Some(content) = line.strip_prefix('\t') {
            // Content line closes the current block
            if let Some(sha) = cur_commit.take() {
                let meta = meta_by_commit.get(&sha).cloned().unwrap_or_default();
                lines.push(BlameLine {
                    line_number: cur_final_line,
                    commit_sha: sha,
                    author: meta.author,
                    author_time: Utc
                        .timestamp_opt(meta.author_time, 0)
                        .single()
                        .unwrap_or_default(),
                    content: content.to_string(),
                });
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        if cur_commit.is_none() {
            // Header: <sha> <orig_lineno> <final_lineno> [<group_size>]
            let mut parts = line.split_whitespace();
            let sha = parts.next().unwrap_or("");
            let _orig = parts.next();
            let final_line = parts.next().and_then(|p| p.parse::<u32>().ok());

            if let Some(final_line) = final_line
                && is_commit_header(sha)
            {
                meta_by_commit.entry(sha.to_string()).or_default();
                cur_commit = Some(sha.to_string());
                cur_final_line = final_line;
            }
            continue;
        }

        let Some(sha) = cur_commit.as_ref() else {
            continue;
        };
        let meta = meta_by_commit.entry(sha.clone()).or_default();

        if let Some(rest) = line.strip_prefix("author ") {
            meta.author = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("author-time ") {
            if let Ok(t) = rest.trim().parse::<i64>() {
                meta.author_time = t;
            }
        }
        // author-mail, author-tz, committer*, summary, previous, filename, boundary: unused
    }

    lines
}

impl Repository {
    /// Blame `file_path` (relative to the workdir) line by line.
    ///
    /// Any git failure (binary or untracked file, path absent from history)
    /// comes back as `BlameUnavailable`.
    pub fn blame_lines(
        &self,
        file_path: &str,
        options: &BlameOptions,
    ) -> Result<Vec<BlameLine>, AttributionError> {
        if let Some(commit) = options.newest_commit.as_deref()
            && commit.starts_with('-')
        {
            return Err(AttributionError::BlameUnavailable {
                path: file_path.to_string(),
                reason: format!("invalid revision '{}'", commit),
            });
        }

        let mut args = self.global_args_for_exec();
        args.push("blame".to_string());
        args.push("--porcelain".to_string());

        if let Some(ref commit) = options.newest_commit {
            args.push(commit.clone());
        }

        // Separator then file path
        args.push("--".to_string());
        args.push(file_path.to_string());

        let output = self
            .exec(&args)
            .map_err(|e| AttributionError::BlameUnavailable {
                path: file_path.to_string(),
                reason: match e {
                    AttributionError::GitCliError { stderr, .. } => stderr,
                    other => other.to_string(),
                },
            })?;

        let stdout = String::from_utf8(output.stdout).map_err(|_| {
            AttributionError::BlameUnavailable {
                path: file_path.to_string(),
                reason: "blame output is not valid UTF-8".to_string(),
            }
        })?;

        Ok(parse_porcelain(&stdout))
    }
}
