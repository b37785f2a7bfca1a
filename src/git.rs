//! Thin git plumbing layer.
//!
//! All repository work shells out to the `git` binary with captured output.
//! Local operations that can hit transient index-lock contention retry with
//! exponential backoff; pushes never retry here, the publisher owns the
//! conflict loop.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

/// Default number of retry attempts for transient local failures
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Result type alias for git operations
pub type GitResult<T> = Result<T, GitError>;

/// A failed git invocation, carrying the operation and its stderr.
#[derive(Error, Debug, Clone)]
#[error("git {operation} failed: {message}")]
pub struct GitError {
    pub operation: String,
    pub message: String,
}

impl GitError {
    fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Transient local failures worth an automatic retry (lock files,
    /// another process holding the repository).
    pub fn is_transient(&self) -> bool {
        let lower = self.message.to_lowercase();
        lower.contains("index.lock")
            || lower.contains("could not lock")
            || lower.contains("unable to create")
            || lower.contains("another git process")
    }

    /// Push rejections caused by the remote having advanced past the local
    /// base: non-fast-forward refusals and remote-side ref lock races.
    pub fn is_remote_advanced(&self) -> bool {
        let lower = self.message.to_lowercase();
        lower.contains("non-fast-forward")
            || lower.contains("fetch first")
            || lower.contains("[rejected]")
            || lower.contains("cannot lock ref")
    }
}

/// One parsed commit from the log.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Handle to one local checkout.
#[derive(Debug)]
pub struct GitRepo {
    workdir: PathBuf,
    max_retries: u32,
}

impl GitRepo {
    /// Wrap an existing checkout directory.
    pub fn open(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Clone `remote` into `target` and return a handle to the clone.
    ///
    /// On failure any partially created target directory is removed before
    /// the error is returned.
    pub fn clone_from(remote: &str, target: &Path) -> GitResult<Self> {
        let output = Command::new("git")
            .args(["clone", remote])
            .arg(target)
            .output()
            .map_err(|e| GitError::new("clone", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // git usually removes its own failed clone target; make sure.
            if target.exists() {
                if let Err(e) = std::fs::remove_dir_all(target) {
                    warn!(path = %target.display(), "Failed to remove partial clone: {e}");
                }
            }
            return Err(GitError::new("clone", stderr.to_string()));
        }

        Ok(Self::open(target))
    }

    /// Directory of the checkout.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run git command and return output
    fn run_git(&self, args: &[&str]) -> GitResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| GitError::new("execute", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::new(args.join(" "), stderr.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git command with automatic retry for transient failures
    ///
    /// Uses exponential backoff: 100ms, 200ms, 400ms, etc.
    fn run_git_with_retry(&self, args: &[&str]) -> GitResult<String> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.run_git(args) {
                Ok(output) => return Ok(output),
                Err(e) => {
                    if e.is_transient() && attempt < self.max_retries {
                        let delay = RETRY_BASE_DELAY_MS * (1 << attempt);
                        warn!(
                            attempt = attempt + 1,
                            delay_ms = delay,
                            "Transient git failure, retrying: {}",
                            e.message.trim()
                        );
                        std::thread::sleep(std::time::Duration::from_millis(delay));
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GitError::new("retry", "Max retries exceeded")))
    }

    /// Get current branch name
    pub fn current_branch(&self) -> GitResult<String> {
        self.run_git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Get current commit hash (short)
    pub fn current_commit(&self) -> GitResult<String> {
        self.run_git(&["rev-parse", "--short", "HEAD"])
    }

    /// Set the commit author identity in the checkout's local config, so
    /// commits do not depend on global git state.
    pub fn set_identity(&self, name: &str, email: &str) -> GitResult<()> {
        self.run_git(&["config", "user.name", name])?;
        self.run_git(&["config", "user.email", email])?;
        Ok(())
    }

    /// Stage one path (retry-safe).
    pub fn stage(&self, path: &str) -> GitResult<()> {
        self.run_git_with_retry(&["add", path])?;
        Ok(())
    }

    /// Check whether anything is staged for commit.
    pub fn has_staged_changes(&self) -> GitResult<bool> {
        let output = Command::new("git")
            .args(["diff", "--cached", "--quiet"])
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| GitError::new("diff", e.to_string()))?;

        // Exit code 0 means no staged diff.
        Ok(!output.status.success())
    }

    /// Create a commit from the staged changes (retry-safe).
    pub fn commit(&self, message: &str) -> GitResult<()> {
        self.run_git_with_retry(&["commit", "-m", message])?;
        Ok(())
    }

    /// Push the branch to origin. No retry here: a rejected push is the
    /// publisher's signal to re-sync and re-merge.
    pub fn push(&self, branch: &str) -> GitResult<()> {
        self.run_git(&["push", "origin", branch])?;
        Ok(())
    }

    /// Fetch the latest remote state.
    pub fn fetch(&self) -> GitResult<()> {
        self.run_git(&["fetch", "origin"])?;
        Ok(())
    }

    /// Hard-reset the checkout to `rev`, discarding local commits and
    /// working-tree changes (retry-safe).
    pub fn reset_hard(&self, rev: &str) -> GitResult<()> {
        self.run_git_with_retry(&["reset", "--hard", rev])?;
        Ok(())
    }

    /// Get recent commits
    pub fn recent_commits(&self, count: usize) -> GitResult<Vec<CommitInfo>> {
        // Unit-separator delimited, subject last: submitted titles flow into
        // the subject and may contain '|'.
        let format = "--format=%h%x1f%an%x1f%aI%x1f%s";
        let output = self.run_git(&["log", format, &format!("-{count}")])?;

        let commits: Vec<CommitInfo> = output
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.splitn(4, '\u{1f}').collect();
                if parts.len() == 4 {
                    let timestamp = DateTime::parse_from_rfc3339(parts[2])
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc));
                    Some(CommitInfo {
                        hash: parts[0].to_string(),
                        author: parts[1].to_string(),
                        message: parts[3].to_string(),
                        timestamp,
                    })
                } else {
                    None
                }
            })
            .collect();

        Ok(commits)
    }
}
