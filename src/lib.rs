//! Linkpress records contributor-submitted links in a git-backed catalog.
//!
//! A submission is a batch of entries, each carrying a url, a title, an
//! optional description and a category. Every batch runs through the same
//! lifecycle:
//!
//! 1. Validate the batch against the acceptance rules.
//! 2. Clone the content repository into a fresh per-submission workspace.
//! 3. Merge the entries into the catalog document.
//! 4. Commit and push, retrying when another submission got there first.
//! 5. Remove the workspace, whatever the outcome was.
//!
//! [`pipeline::SubmissionPipeline`] drives that lifecycle; [`server`]
//! exposes it over HTTP.

pub mod config;
pub mod document;
pub mod entry;
pub mod error;
pub mod git;
pub mod pipeline;
pub mod publisher;
pub mod server;
pub mod state_machine;
pub mod workspace;

pub use config::ServiceConfig;
pub use document::{ContentDocument, MediaAppearance, PublishedWork};
pub use entry::{Category, SubmissionEntry, ValidatedEntry};
pub use error::{SubmitError, SubmitResult};
pub use pipeline::{SubmissionPipeline, SubmissionReceipt};
pub use state_machine::{StateMachine, SubmissionState};
