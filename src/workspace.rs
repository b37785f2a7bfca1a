//! Per-submission workspaces over the remote content repository.
//!
//! Every submission gets its own clone under the configured workspace root,
//! named after the submission id, so concurrent submissions can never step
//! on each other's checkout.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::{SubmitError, SubmitResult};
use crate::git::GitRepo;

/// Produces fresh workspaces bound to the configured remote.
pub struct Synchronizer {
    remote_url: String,
    workspace_root: PathBuf,
    author_name: String,
    author_email: String,
}

impl Synchronizer {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            remote_url: config.remote_url.clone(),
            workspace_root: config.workspace_root.clone(),
            author_name: config.commit_author.clone(),
            author_email: config.commit_email.clone(),
        }
    }

    /// Clone the remote into a fresh workspace for one submission.
    ///
    /// The checkout lands at `<workspace_root>/<submission_id>`. On any
    /// failure no partial workspace remains.
    pub fn acquire(&self, submission_id: Uuid) -> SubmitResult<Workspace> {
        fs::create_dir_all(&self.workspace_root)
            .map_err(|e| SubmitError::sync("create workspace root", e.to_string()))?;
        let path = self.workspace_root.join(submission_id.to_string());

        let repo = GitRepo::clone_from(&self.remote_url, &path)
            .map_err(|e| SubmitError::sync(e.operation, e.message))?;

        match Self::prepare(&repo, &self.author_name, &self.author_email) {
            Ok(branch) => {
                debug!(
                    path = %path.display(),
                    branch = %branch,
                    "Workspace ready"
                );
                Ok(Workspace {
                    repo,
                    branch,
                    cleaned: false,
                })
            }
            Err(e) => {
                if let Err(remove_err) = fs::remove_dir_all(&path) {
                    warn!(
                        path = %path.display(),
                        "Failed to remove partial workspace: {remove_err}"
                    );
                }
                Err(e)
            }
        }
    }

    /// Post-clone setup: commit identity and the checked-out branch name.
    fn prepare(repo: &GitRepo, author_name: &str, author_email: &str) -> SubmitResult<String> {
        repo.set_identity(author_name, author_email)
            .map_err(|e| SubmitError::sync(e.operation, e.message))?;
        repo.current_branch()
            .map_err(|e| SubmitError::sync(e.operation, e.message))
    }
}

/// An ephemeral checkout owned by exactly one submission.
///
/// `cleanup` removes the directory explicitly; dropping a workspace that
/// was never cleaned removes it as a backstop, so a panicking or abandoned
/// submission cannot leak the checkout.
#[derive(Debug)]
pub struct Workspace {
    repo: GitRepo,
    branch: String,
    cleaned: bool,
}

impl Workspace {
    /// Directory of the checkout.
    pub fn path(&self) -> &Path {
        self.repo.workdir()
    }

    /// Git handle for the checkout.
    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Branch the clone checked out (the remote's default).
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Absolute path of a repository-relative file inside this workspace.
    pub fn file_path(&self, relative: &str) -> PathBuf {
        self.path().join(relative)
    }

    /// Remove the checkout.
    ///
    /// Failure is reported as `SubmitError::Cleanup`; the submission's
    /// outcome is decided elsewhere and must not change because of it.
    pub fn cleanup(mut self) -> SubmitResult<()> {
        self.cleaned = true;
        let path = self.repo.workdir().to_path_buf();
        fs::remove_dir_all(&path)
            .map_err(|e| SubmitError::cleanup(path.display().to_string(), e.to_string()))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let path = self.repo.workdir();
        if !self.cleaned && path.exists() {
            if let Err(e) = fs::remove_dir_all(path) {
                warn!(path = %path.display(), "Failed to remove workspace on drop: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::tempdir;

    fn run_git(dir: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// A local repository usable as a clone source.
    fn setup_source_repo(root: &Path) -> PathBuf {
        let source = root.join("source");
        fs::create_dir_all(&source).unwrap();
        run_git(&source, &["init"]);
        run_git(&source, &["config", "user.email", "test@test.com"]);
        run_git(&source, &["config", "user.name", "Test"]);
        fs::write(source.join("urls.json"), "{}\n").unwrap();
        run_git(&source, &["add", "."]);
        run_git(&source, &["commit", "-m", "Initial catalog"]);
        source
    }

    fn test_config(root: &Path, remote: &Path) -> ServiceConfig {
        ServiceConfig {
            remote_url: remote.to_str().unwrap().to_string(),
            document_path: "urls.json".to_string(),
            workspace_root: root.join("workspaces"),
            max_push_attempts: 3,
            commit_author: "Catalog Bot".to_string(),
            commit_email: "bot@catalog".to_string(),
            port: 0,
        }
    }

    /// Set or clear an e2fs attribute. Returns false where the filesystem
    /// or privileges do not support it.
    fn chattr(path: &Path, flag: &str) -> bool {
        Command::new("chattr")
            .arg(flag)
            .arg(path)
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_acquire_creates_unique_workspaces() {
        let dir = tempdir().unwrap();
        let source = setup_source_repo(dir.path());
        let sync = Synchronizer::new(&test_config(dir.path(), &source));

        let a = sync.acquire(Uuid::new_v4()).unwrap();
        let b = sync.acquire(Uuid::new_v4()).unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.file_path("urls.json").exists());
        assert!(b.file_path("urls.json").exists());

        a.cleanup().unwrap();
        b.cleanup().unwrap();
    }

    #[test]
    fn test_acquire_applies_commit_identity() {
        let dir = tempdir().unwrap();
        let source = setup_source_repo(dir.path());
        let sync = Synchronizer::new(&test_config(dir.path(), &source));

        let ws = sync.acquire(Uuid::new_v4()).unwrap();
        let output = Command::new("git")
            .args(["config", "user.name"])
            .current_dir(ws.path())
            .output()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Catalog Bot");
        ws.cleanup().unwrap();
    }

    #[test]
    fn test_cleanup_removes_directory() {
        let dir = tempdir().unwrap();
        let source = setup_source_repo(dir.path());
        let sync = Synchronizer::new(&test_config(dir.path(), &source));

        let ws = sync.acquire(Uuid::new_v4()).unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.exists());

        ws.cleanup().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_blocked_removal_surfaces_cleanup_error() {
        let dir = tempdir().unwrap();
        let source = setup_source_repo(dir.path());
        let sync = Synchronizer::new(&test_config(dir.path(), &source));

        let ws = sync.acquire(Uuid::new_v4()).unwrap();
        let path = ws.path().to_path_buf();
        let pinned = ws.file_path("urls.json");
        if !chattr(&pinned, "+i") {
            // Filesystem without immutable-attribute support; nothing can
            // block the removal here.
            ws.cleanup().unwrap();
            return;
        }

        let result = ws.cleanup();
        assert!(chattr(&pinned, "-i"));

        let err = result.unwrap_err();
        assert!(matches!(err, SubmitError::Cleanup { .. }));
        assert!(path.exists());
        fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_drop_removes_uncleaned_workspace() {
        let dir = tempdir().unwrap();
        let source = setup_source_repo(dir.path());
        let sync = Synchronizer::new(&test_config(dir.path(), &source));

        let path = {
            let ws = sync.acquire(Uuid::new_v4()).unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_clone_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path(), &dir.path().join("missing"));
        let sync = Synchronizer::new(&config);

        let id = Uuid::new_v4();
        let err = sync.acquire(id).unwrap_err();
        assert!(matches!(err, SubmitError::Sync { .. }));
        assert!(!config.workspace_root.join(id.to_string()).exists());
    }
}
