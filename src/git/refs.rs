use crate::error::AttributionError;
use crate::git::repository::Repository;
use crate::utils::debug_log;
use std::collections::HashMap;

/// Delimits per-commit segments in a batched `git log` walk.
pub const NOTE_SEGMENT_SENTINEL: &str = "@@git-authorship-note@@";

pub fn notes_ref_name(namespace: &str) -> String {
    format!("refs/notes/{}", namespace)
}

/// Attach `note_content` to `commit_sha`, replacing any existing note.
pub fn notes_add(
    repo: &Repository,
    namespace: &str,
    commit_sha: &str,
    note_content: &str,
) -> Result<(), AttributionError> {
    let mut args = repo.global_args_for_exec();
    args.push("notes".to_string());
    args.push(format!("--ref={}", namespace));
    args.push("add".to_string());
    args.push("-f".to_string()); // Always force overwrite
    args.push("-m".to_string());
    args.push(note_content.to_string());
    args.push("--".to_string());
    args.push(commit_sha.to_string());

    repo.exec(&args)?;
    Ok(())
}

/// Raw note body for `commit_sha`; `Ok(None)` when the commit has no note.
pub fn notes_show(
    repo: &Repository,
    namespace: &str,
    commit_sha: &str,
) -> Result<Option<String>, AttributionError> {
    let mut args = repo.global_args_for_exec();
    args.push("notes".to_string());
    args.push(format!("--ref={}", namespace));
    args.push("show".to_string());
    args.push("--".to_string());
    args.push(commit_sha.to_string());

    match repo.exec(&args) {
        Ok(output) => {
            let content = String::from_utf8(output.stdout)?;
            let trimmed = content.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Err(AttributionError::GitCliError {
            code: Some(1),
            ref stderr,
            ..
        }) if is_no_note_message(stderr) => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_no_note_message(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("no note found") || lower.contains("has no note")
}

pub fn notes_remove(
    repo: &Repository,
    namespace: &str,
    commit_sha: &str,
) -> Result<(), AttributionError> {
    let mut args = repo.global_args_for_exec();
    args.push("notes".to_string());
    args.push(format!("--ref={}", namespace));
    args.push("remove".to_string());
    args.push("--ignore-missing".to_string());
    args.push("--".to_string());
    args.push(commit_sha.to_string());

    repo.exec(&args)?;
    Ok(())
}

/// All notes in the namespace as (note_blob_sha, commit_sha) pairs.
/// A namespace that does not exist yet lists as empty.
pub fn notes_list(
    repo: &Repository,
    namespace: &str,
) -> Result<Vec<(String, String)>, AttributionError> {
    if !ref_exists(repo, &notes_ref_name(namespace)) {
        return Ok(Vec::new());
    }

    let mut args = repo.global_args_for_exec();
    args.push("notes".to_string());
    args.push(format!("--ref={}", namespace));
    args.push("list".to_string());

    let output = repo.exec(&args)?;
    let stdout = String::from_utf8(output.stdout)?;
    Ok(parse_notes_list(&stdout))
}

fn parse_notes_list(stdout: &str) -> Vec<(String, String)> {
    let mut mappings = Vec::new();
    for line in stdout.lines() {
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            mappings.push((parts[0].to_string(), parts[1].to_string()));
        }
    }
    mappings
}

/// Check if a ref exists in the repository
pub fn ref_exists(repo: &Repository, ref_name: &str) -> bool {
    let mut args = repo.global_args_for_exec();
    args.push("show-ref".to_string());
    args.push("--verify".to_string());
    args.push("--quiet".to_string());
    args.push(ref_name.to_string());

    repo.exec(&args).is_ok()
}

/// Walk `range` once and return (commit_sha, note_body) for every commit in it.
///
/// Commits without a note come back with an empty body.
pub fn log_notes_for_range(
    repo: &Repository,
    namespace: &str,
    range: &str,
) -> Result<Vec<(String, String)>, AttributionError> {
    if range.starts_with('-') {
        return Err(AttributionError::Generic(format!(
            "Invalid revision range '{}'",
            range
        )));
    }
    let mut args = repo.global_args_for_exec();
    args.push("log".to_string());
    args.push(range.to_string());
    args.push(format!("--notes={}", namespace));
    args.push(format!("--format={}%H%n%N", NOTE_SEGMENT_SENTINEL));
    args.push("--".to_string());

    let output = repo.exec(&args)?;
    let stdout = String::from_utf8(output.stdout)?;
    Ok(split_note_segments(&stdout))
}

/// Split sentinel-delimited `git log` output into (sha, body) pairs
pub fn split_note_segments(output: &str) -> Vec<(String, String)> {
    let mut segments = Vec::new();
    for segment in output.split(NOTE_SEGMENT_SENTINEL) {
        if segment.trim().is_empty() {
            continue;
        }
        let (sha, body) = match segment.split_once('\n') {
            Some((sha, body)) => (sha.trim(), body.trim()),
            None => (segment.trim(), ""),
        };
        if !is_object_id(sha) {
            debug_log(&format!("Ignoring malformed log segment header '{}'", sha));
            continue;
        }
        segments.push((sha.to_string(), body.to_string()));
    }
    segments
}

fn is_object_id(s: &str) -> bool {
    (s.len() == 40 || s.len() == 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn notes_path_for_object(oid: &str) -> String {
    if oid.len() <= 2 {
        oid.to_string()
    } else {
        format!("{}/{}", &oid[..2], &oid[2..])
    }
}

fn parse_batch_check_blob_oid(line: &str) -> Option<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let oid = parts.first().copied().unwrap_or_default();
    if parts.len() >= 2 && parts[1] == "blob" && is_object_id(oid) {
        Some(oid.to_string())
    } else {
        None
    }
}

/// Resolve note blob OIDs for a set of commits using one batched cat-file call.
///
/// Returns a map of commit SHA -> note blob SHA for commits that currently have notes.
pub fn note_blob_oids_for_commits(
    repo: &Repository,
    namespace: &str,
    commit_shas: &[String],
) -> Result<HashMap<String, String>, AttributionError> {
    if commit_shas.is_empty() {
        return Ok(HashMap::new());
    }

    let mut args = repo.global_args_for_exec();
    args.push("cat-file".to_string());
    args.push("--batch-check".to_string());

    let notes_ref = notes_ref_name(namespace);
    let mut stdin_data = String::new();
    for commit_sha in commit_shas {
        // Notes live at flat (<sha>) or fanout (<aa>/<bb...>) paths depending on
        // how many notes the ref holds, so ask for both.
        stdin_data.push_str(&format!("{}:{}\n", notes_ref, commit_sha));
        stdin_data.push_str(&format!("{}:{}\n", notes_ref, notes_path_for_object(commit_sha)));
    }

    let output = repo.exec_stdin(&args, stdin_data.as_bytes())?;
    let stdout = String::from_utf8(output.stdout)?;
    let mut lines = stdout.lines();
    let mut result = HashMap::new();

    for commit_sha in commit_shas {
        let Some(flat_line) = lines.next() else {
            break;
        };
        let fanout_line = lines.next().unwrap_or_default();

        if let Some(oid) = parse_batch_check_blob_oid(flat_line)
            .or_else(|| parse_batch_check_blob_oid(fanout_line))
        {
            result.insert(commit_sha.clone(), oid);
        }
    }

    Ok(result)
}

/// Read blob contents for `blob_oids` with a single `cat-file --batch`
pub fn batch_read_blobs(
    repo: &Repository,
    blob_oids: &[String],
) -> Result<HashMap<String, String>, AttributionError> {
    if blob_oids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut args = repo.global_args_for_exec();
    args.push("cat-file".to_string());
    args.push("--batch".to_string());

    let stdin_data = blob_oids.join("\n") + "\n";
    let output = repo.exec_stdin(&args, stdin_data.as_bytes())?;

    parse_cat_file_batch_output(&output.stdout)
}

fn parse_cat_file_batch_output(data: &[u8]) -> Result<HashMap<String, String>, AttributionError> {
    let mut results = HashMap::new();
    let mut pos = 0usize;

    while pos < data.len() {
        let header_end = match data[pos..].iter().position(|&b| b == b'\n') {
            Some(idx) => pos + idx,
            None => break,
        };

        let header = std::str::from_utf8(&data[pos..header_end])?;
        let parts: Vec<&str> = header.split_whitespace().collect();
        if parts.len() < 3 || parts[1] == "missing" {
            pos = header_end + 1;
            continue;
        }

        let oid = parts[0].to_string();
        let size: usize = parts[2].parse().map_err(|e| {
            AttributionError::Generic(format!("Invalid size in cat-file output: {}", e))
        })?;

        let content_start = header_end + 1;
        let content_end = content_start + size;
        if content_end > data.len() {
            return Err(AttributionError::Generic(
                "Malformed cat-file --batch output: truncated content".to_string(),
            ));
        }

        let content = String::from_utf8_lossy(&data[content_start..content_end]).to_string();
        results.insert(oid, content);

        // content is followed by a single LF
        pos = content_end + 1;
    }

    Ok(results)
}
