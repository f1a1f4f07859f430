use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::config::Config;
use crate::error::AttributionError;
use crate::git::repository::{Repository, find_repository_in_path};

/// Throwaway repository on disk for tests that need real git plumbing
pub struct TmpRepo {
    _dir: TempDir,
    path: PathBuf,
    repo: Repository,
}

impl TmpRepo {
    pub fn new() -> Result<Self, AttributionError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().to_path_buf();

        run_git(&path, &["init", "--quiet"], &[])?;
        run_git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"], &[])?;
        run_git(&path, &["config", "user.name", "Test User"], &[])?;
        run_git(&path, &["config", "user.email", "test@example.com"], &[])?;
        run_git(&path, &["config", "commit.gpgsign", "false"], &[])?;

        let repo = find_repository_in_path(&path, &Config::default())?;
        Ok(TmpRepo {
            _dir: dir,
            path,
            repo,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn write_file(&self, relative: &str, contents: &str) -> Result<(), AttributionError> {
        let file_path = self.path.join(relative);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(file_path, contents)?;
        Ok(())
    }

    pub fn write_bytes(&self, relative: &str, contents: &[u8]) -> Result<(), AttributionError> {
        std::fs::write(self.path.join(relative), contents)?;
        Ok(())
    }

    /// Stage everything and commit as `author`; returns the new HEAD sha
    pub fn commit_all(&self, message: &str, author: &str) -> Result<String, AttributionError> {
        self.commit_all_at(message, author, None)
    }

    /// Like `commit_all` with a fixed author date (`2024-08-01T12:00:00Z` style)
    pub fn commit_all_at(
        &self,
        message: &str,
        author: &str,
        date: Option<&str>,
    ) -> Result<String, AttributionError> {
        run_git(&self.path, &["add", "-A"], &[])?;

        let email = format!("{}@example.com", author.to_lowercase().replace(' ', "."));
        let mut env = vec![
            ("GIT_AUTHOR_NAME", author.to_string()),
            ("GIT_AUTHOR_EMAIL", email),
        ];
        if let Some(date) = date {
            env.push(("GIT_AUTHOR_DATE", date.to_string()));
            env.push(("GIT_COMMITTER_DATE", date.to_string()));
        }
        run_git(&self.path, &["commit", "--quiet", "-m", message], &env)?;

        self.repo
            .head_sha()?
            .ok_or_else(|| AttributionError::Generic("commit produced no HEAD".to_string()))
    }

    pub fn checkout_new_branch(&self, name: &str) -> Result<(), AttributionError> {
        run_git(&self.path, &["checkout", "--quiet", "-b", name], &[])
    }

    /// Run an arbitrary git command in the repository
    pub fn git(&self, args: &[&str]) -> Result<String, AttributionError> {
        let output = Command::new("git").current_dir(&self.path).args(args).output()?;
        if !output.status.success() {
            return Err(AttributionError::GitCliError {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
            });
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

fn run_git(dir: &Path, args: &[&str], env: &[(&str, String)]) -> Result<(), AttributionError> {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir).args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(AttributionError::GitCliError {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        });
    }
    Ok(())
}
