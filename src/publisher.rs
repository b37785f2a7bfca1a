//! Commit and push merged catalog changes, retrying when the remote moves.
//!
//! Pushes race against other submissions touching the same document. A
//! rejected push is resolved by re-syncing the workspace onto the remote
//! head, re-merging the batch into the fresh document, and pushing again,
//! up to a bounded number of attempts.

use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::document::merge_entries;
use crate::entry::ValidatedEntry;
use crate::error::{SubmitError, SubmitResult};
use crate::git::GitError;
use crate::workspace::Workspace;

pub const DEFAULT_MAX_PUSH_ATTEMPTS: u32 = 3;
const CONFLICT_BASE_DELAY_MS: u64 = 100;

/// Outcome of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishReport {
    /// Short hash of the pushed commit.
    pub commit: String,
    /// Push attempts used, including the successful one.
    pub attempts: u32,
}

/// Publishes a merged document from a workspace to the remote.
pub struct Publisher {
    max_attempts: u32,
    document_path: String,
}

impl Publisher {
    pub fn new(max_attempts: u32, document_path: impl Into<String>) -> Self {
        Self {
            max_attempts,
            document_path: document_path.into(),
        }
    }

    /// Commit the already-merged document and push it to the remote.
    ///
    /// On a rejected push the workspace is reset onto the remote head and
    /// the batch is merged again before the next attempt, so the commit
    /// always contains both the remote's latest records and this batch.
    pub fn publish(
        &self,
        workspace: &Workspace,
        entries: &[ValidatedEntry],
    ) -> SubmitResult<PublishReport> {
        let repo = workspace.repo();
        let branch = workspace.branch();
        let message = commit_message(entries);

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = CONFLICT_BASE_DELAY_MS * (1 << (attempt - 1));
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay,
                    "Remote advanced during publish, re-syncing workspace"
                );
                thread::sleep(Duration::from_millis(delay));
                repo.fetch().map_err(publish_err)?;
                repo.reset_hard(&format!("origin/{branch}")).map_err(publish_err)?;
                merge_entries(&workspace.file_path(&self.document_path), entries)?;
            }

            repo.stage(&self.document_path).map_err(publish_err)?;
            if !repo.has_staged_changes().map_err(publish_err)? {
                return Err(SubmitError::publish(
                    "commit",
                    "merge produced no staged changes",
                ));
            }
            repo.commit(&message).map_err(publish_err)?;

            match repo.push(branch) {
                Ok(()) => {
                    let commit = repo.current_commit().map_err(publish_err)?;
                    info!(
                        commit = %commit,
                        attempts = attempt + 1,
                        "Published catalog update"
                    );
                    return Ok(PublishReport {
                        commit,
                        attempts: attempt + 1,
                    });
                }
                Err(e) if e.is_remote_advanced() => continue,
                Err(e) => return Err(publish_err(e)),
            }
        }

        Err(SubmitError::PublishConflict {
            attempts: self.max_attempts,
        })
    }
}

/// Commit message listing every title in the batch, in submission order.
pub fn commit_message(entries: &[ValidatedEntry]) -> String {
    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    format!("Added {}", titles.join(", "))
}

fn publish_err(e: GitError) -> SubmitError {
    SubmitError::publish(e.operation, e.message)
}
