use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::config::Config;
use crate::error::AttributionError;
use crate::utils::debug_log;

/// A git repository addressed through the git CLI.
///
/// Cheap to clone; holds only paths and the git command to run.
#[derive(Debug, Clone)]
pub struct Repository {
    git_cmd: String,
    workdir: PathBuf,
    git_dir: PathBuf,
}

impl Repository {
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn git_cmd(&self) -> &str {
        &self.git_cmd
    }

    /// Directory for files this crate owns inside the git dir
    pub fn storage_dir(&self) -> PathBuf {
        self.git_dir.join("ai-authorship")
    }

    /// Arguments that pin every git invocation to this repository
    pub fn global_args_for_exec(&self) -> Vec<String> {
        vec![
            "-C".to_string(),
            self.workdir.to_string_lossy().to_string(),
            "-c".to_string(),
            "core.quotepath=false".to_string(),
        ]
    }

    pub fn exec(&self, args: &[String]) -> Result<Output, AttributionError> {
        exec_git(&self.git_cmd, args)
    }

    pub fn exec_stdin(&self, args: &[String], stdin: &[u8]) -> Result<Output, AttributionError> {
        exec_git_stdin(&self.git_cmd, args, stdin)
    }

    /// Full sha of a revision, or `None` if it does not resolve to a commit
    pub fn rev_parse_commit(&self, rev: &str) -> Result<Option<String>, AttributionError> {
        if rev.starts_with('-') {
            return Ok(None);
        }
        let mut args = self.global_args_for_exec();
        args.push("rev-parse".to_string());
        args.push("--verify".to_string());
        args.push("--quiet".to_string());
        args.push(format!("{}^{{commit}}", rev));

        match self.exec(&args) {
            Ok(output) => {
                let sha = String::from_utf8(output.stdout)?.trim().to_string();
                Ok(Some(sha).filter(|s| !s.is_empty()))
            }
            Err(AttributionError::GitCliError { code: Some(1), .. })
            | Err(AttributionError::GitCliError {
                code: Some(128), ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn head_sha(&self) -> Result<Option<String>, AttributionError> {
        self.rev_parse_commit("HEAD")
    }

    /// Short name of the checked-out branch; `None` when HEAD is detached
    pub fn current_branch(&self) -> Result<Option<String>, AttributionError> {
        let mut args = self.global_args_for_exec();
        args.push("symbolic-ref".to_string());
        args.push("--quiet".to_string());
        args.push("--short".to_string());
        args.push("HEAD".to_string());

        match self.exec(&args) {
            Ok(output) => {
                let branch = String::from_utf8(output.stdout)?.trim().to_string();
                Ok(Some(branch).filter(|b| !b.is_empty()))
            }
            Err(AttributionError::GitCliError { code: Some(1), .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Commits reachable in `range`, newest first
    pub fn rev_list(&self, range: &str) -> Result<Vec<String>, AttributionError> {
        let mut args = self.global_args_for_exec();
        args.push("rev-list".to_string());
        args.push(range.to_string());
        args.push("--".to_string());

        let output = self.exec(&args)?;
        let stdout = String::from_utf8(output.stdout)?;
        Ok(stdout
            .lines()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// Tracked files at HEAD, relative to the workdir
    pub fn tracked_files(&self) -> Result<Vec<String>, AttributionError> {
        let mut args = self.global_args_for_exec();
        args.push("ls-files".to_string());
        args.push("-z".to_string());

        let output = self.exec(&args)?;
        let stdout = String::from_utf8(output.stdout)?;
        Ok(stdout
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect())
    }

    /// Lines (added, deleted) that `commit` changed in `file_path`.
    /// Binary files and untouched paths report zeros.
    pub fn numstat(&self, commit: &str, file_path: &str) -> Result<(u64, u64), AttributionError> {
        let mut args = self.global_args_for_exec();
        args.push("show".to_string());
        args.push("--numstat".to_string());
        args.push("--format=".to_string());
        args.push(commit.to_string());
        args.push("--".to_string());
        args.push(file_path.to_string());

        let output = self.exec(&args)?;
        let stdout = String::from_utf8(output.stdout)?;
        let (mut added, mut deleted) = (0, 0);
        for line in stdout.lines() {
            let mut parts = line.split('\t');
            let a = parts.next().and_then(|p| p.parse::<u64>().ok());
            let d = parts.next().and_then(|p| p.parse::<u64>().ok());
            if let (Some(a), Some(d)) = (a, d) {
                added += a;
                deleted += d;
            }
        }
        Ok((added, deleted))
    }

    /// Path of `file_path` relative to the workdir, accepting absolute and relative input
    pub fn relative_path(&self, file_path: &str) -> Result<String, AttributionError> {
        let path = Path::new(file_path);
        if path.is_relative() {
            return Ok(file_path.replace('\\', "/"));
        }
        let workdir = self.workdir.canonicalize()?;
        let abs = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let relative = abs.strip_prefix(&workdir).map_err(|_| {
            AttributionError::Generic(format!(
                "File path '{}' is not within repository root '{}'",
                file_path,
                workdir.display()
            ))
        })?;
        Ok(relative.to_string_lossy().replace('\\', "/"))
    }
}

/// Locate the repository containing `path` (which may be a subdirectory)
pub fn find_repository_in_path(path: &Path, config: &Config) -> Result<Repository, AttributionError> {
    let args = vec![
        "-C".to_string(),
        path.to_string_lossy().to_string(),
        "rev-parse".to_string(),
        "--show-toplevel".to_string(),
        "--absolute-git-dir".to_string(),
    ];
    let output = exec_git(config.git_cmd(), &args)?;
    let stdout = String::from_utf8(output.stdout)?;
    let mut lines = stdout.lines();
    let workdir = lines
        .next()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AttributionError::Generic(format!("{} is not inside a work tree", path.display()))
        })?;
    let git_dir = lines
        .next()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AttributionError::Generic(format!("Could not resolve git dir for {}", path.display()))
        })?;

    Ok(Repository {
        git_cmd: config.git_cmd().to_string(),
        workdir: PathBuf::from(workdir),
        git_dir: PathBuf::from(git_dir),
    })
}

pub fn find_repository(config: &Config) -> Result<Repository, AttributionError> {
    let cwd = std::env::current_dir()?;
    find_repository_in_path(&cwd, config)
}

/// Run git with `args` and return its output; non-zero exit becomes `GitCliError`
pub fn exec_git(git_cmd: &str, args: &[String]) -> Result<Output, AttributionError> {
    debug_log(&format!("exec: git {}", args.join(" ")));
    let output = Command::new(git_cmd)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(AttributionError::GitCliError {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            args: args.to_vec(),
        });
    }
    Ok(output)
}

/// Same as `exec_git` with `stdin` piped to the child
pub fn exec_git_stdin(
    git_cmd: &str,
    args: &[String],
    stdin: &[u8],
) -> Result<Output, AttributionError> {
    debug_log(&format!("exec (stdin {} bytes): git {}", stdin.len(), args.join(" ")));
    let mut child = Command::new(git_cmd)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Feed stdin from its own thread so git can fill stdout while we write
    let child_stdin = child.stdin.take();
    let (written, output) = std::thread::scope(|scope| {
        let writer = scope.spawn(move || match child_stdin {
            // dropping closes the pipe so git sees EOF
            Some(mut pipe) => pipe.write_all(stdin),
            None => Ok(()),
        });
        let output = child.wait_with_output();
        (writer.join(), output)
    });
    let output = output?;

    if !output.status.success() {
        return Err(AttributionError::GitCliError {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            args: args.to_vec(),
        });
    }
    match written {
        Ok(result) => result?,
        Err(_) => {
            return Err(AttributionError::Generic(
                "stdin writer for git panicked".to_string(),
            ));
        }
    }
    Ok(output)
}
