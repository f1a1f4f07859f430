use assert_cmd::Command;
use std::path::Path;

use git_authorship::authorship::record::{AuthorInfo, AuthorshipRecord};
use git_authorship::authorship::store::NotesStore;
use git_authorship::config::Config;
use git_authorship::git::repository::Repository;
use git_authorship::git::test_utils::TmpRepo;

/// Throwaway repository for integration tests. Panics on setup failures so
/// tests can stay focused on the behavior under test.
pub struct TestRepo {
    inner: TmpRepo,
    config: Config,
}

impl TestRepo {
    pub fn new() -> Self {
        TestRepo {
            inner: TmpRepo::new().expect("failed to create test repository"),
            config: Config::default(),
        }
    }

    pub fn with_config(config: Config) -> Self {
        TestRepo {
            inner: TmpRepo::new().expect("failed to create test repository"),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn repo(&self) -> &Repository {
        self.inner.repo()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> NotesStore {
        NotesStore::new(self.repo(), self.config.notes_ref())
    }

    pub fn write(&self, relative: &str, contents: &str) {
        self.inner
            .write_file(relative, contents)
            .expect("failed to write file");
    }

    /// Stage everything and commit as `author`
    pub fn commit(&self, message: &str, author: &str) -> String {
        self.inner
            .commit_all(message, author)
            .expect("commit failed")
    }

    /// Commit with fixed author and committer dates
    pub fn commit_at(&self, message: &str, author: &str, date: &str) -> String {
        self.inner
            .commit_all_at(message, author, Some(date))
            .expect("commit failed")
    }

    pub fn git(&self, args: &[&str]) -> String {
        self.inner.git(args).expect("git command failed")
    }

    /// Store a record naming `author` for each of `files` in `commit`
    pub fn record(&self, commit: &str, files: &[&str], author: AuthorInfo) -> AuthorshipRecord {
        let mut record = AuthorshipRecord::new(commit);
        for file in files {
            record.add_author(file, author.clone());
        }
        self.store().put(&record).expect("failed to store record");
        record
    }

    /// Run the `git-authorship` binary inside the repository.
    /// Ok(stdout) on success, Err(stderr) otherwise.
    pub fn git_authorship(&self, args: &[&str]) -> Result<String, String> {
        let output = self
            .command()
            .args(args)
            .output()
            .expect("failed to run git-authorship");
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).to_string())
        }
    }

    /// Binary command preconfigured to run in this repository, isolated from
    /// the user's config file
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("git-authorship").expect("binary not built");
        cmd.current_dir(self.path())
            .env("GIT_AUTHORSHIP_CONFIG", self.path().join(".git").join("no-config.json"))
            .env("GIT_AUTHORSHIP_DEBUG", "0")
            .env_remove("GIT_AUTHORSHIP_NOTES_REF")
            .env_remove("GIT_AUTHORSHIP_GIT_PATH");
        cmd
    }
}
