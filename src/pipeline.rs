//! The submission pipeline: validate, sync, merge, publish, clean up.
//!
//! `submit` drives one batch through the whole lifecycle and settles it as
//! succeeded or failed. Whatever happens after a workspace is acquired, the
//! workspace is removed before the outcome is returned.

use tracing::{error, info};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::document::merge_entries;
use crate::entry::{validate_batch, SubmissionEntry, ValidatedEntry};
use crate::error::SubmitResult;
use crate::publisher::{PublishReport, Publisher};
use crate::state_machine::{StateMachine, SubmissionState};
use crate::workspace::{Synchronizer, Workspace};

/// What a settled successful submission hands back.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub submission_id: Uuid,
    /// Urls recorded, in submission order.
    pub urls: Vec<String>,
    /// Short hash of the commit that landed at the remote.
    pub commit: String,
    /// Push attempts used, including the successful one.
    pub push_attempts: u32,
}

/// Runs submissions against one configured remote.
pub struct SubmissionPipeline {
    synchronizer: Synchronizer,
    publisher: Publisher,
    document_path: String,
}

impl SubmissionPipeline {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            synchronizer: Synchronizer::new(config),
            publisher: Publisher::new(config.max_push_attempts, config.document_path.clone()),
            document_path: config.document_path.clone(),
        }
    }

    /// Run one batch through the full pipeline.
    ///
    /// Blocking: clones, merges and pushes synchronously. A batch is
    /// all-or-nothing; one invalid entry rejects the whole submission
    /// before anything touches the remote.
    pub fn submit(&self, entries: &[SubmissionEntry]) -> SubmitResult<SubmissionReceipt> {
        let submission_id = Uuid::new_v4();
        let mut machine = StateMachine::new();
        info!(
            submission_id = %submission_id,
            entries = entries.len(),
            "Submission received"
        );

        advance(&mut machine, SubmissionState::Validating, None);
        let validated = match validate_batch(entries) {
            Ok(validated) => validated,
            Err(e) => {
                advance(&mut machine, SubmissionState::Failed, Some(&e.to_string()));
                info!(
                    submission_id = %submission_id,
                    history = %machine.summary(),
                    "Submission rejected: {e}"
                );
                return Err(e);
            }
        };

        advance(&mut machine, SubmissionState::Syncing, None);
        let workspace = match self.synchronizer.acquire(submission_id) {
            Ok(workspace) => workspace,
            Err(e) => {
                advance(&mut machine, SubmissionState::Failed, Some(&e.to_string()));
                error!(
                    submission_id = %submission_id,
                    history = %machine.summary(),
                    "Sync failed: {e}"
                );
                return Err(e);
            }
        };

        // A workspace now exists. The outcome settles only after cleanup.
        let outcome = self.merge_and_publish(&mut machine, &workspace, &validated);

        advance(&mut machine, SubmissionState::CleaningUp, None);
        if let Err(e) = workspace.cleanup() {
            // Never changes the submission's outcome.
            error!(submission_id = %submission_id, "Workspace cleanup failed: {e}");
        }

        match outcome {
            Ok(report) => {
                advance(&mut machine, SubmissionState::Succeeded, None);
                info!(
                    submission_id = %submission_id,
                    commit = %report.commit,
                    attempts = report.attempts,
                    history = %machine.summary(),
                    "Submission published"
                );
                Ok(SubmissionReceipt {
                    submission_id,
                    urls: validated.iter().map(|e| e.url.clone()).collect(),
                    commit: report.commit,
                    push_attempts: report.attempts,
                })
            }
            Err(e) => {
                advance(&mut machine, SubmissionState::Failed, Some(&e.to_string()));
                error!(
                    submission_id = %submission_id,
                    history = %machine.summary(),
                    "Submission failed: {e}"
                );
                Err(e)
            }
        }
    }

    fn merge_and_publish(
        &self,
        machine: &mut StateMachine,
        workspace: &Workspace,
        entries: &[ValidatedEntry],
    ) -> SubmitResult<PublishReport> {
        advance(machine, SubmissionState::Merging, None);
        let document = merge_entries(&workspace.file_path(&self.document_path), entries)?;

        let reason = format!("{} records total", document.len());
        advance(machine, SubmissionState::Publishing, Some(&reason));
        self.publisher.publish(workspace, entries)
    }
}

/// Advance the state machine along an edge the control flow guarantees.
///
/// A rejected transition here is a pipeline bug, not a submitter problem,
/// so it is logged instead of failing the submission.
fn advance(machine: &mut StateMachine, to: SubmissionState, reason: Option<&str>) {
    if let Err(e) = machine.advance(to, reason) {
        error!("{e}");
    }
}
