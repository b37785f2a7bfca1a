//! Error taxonomy for the submission pipeline.
//!
//! Every failure path of a submission maps onto exactly one variant, so the
//! transport layer can tell client faults from server faults and the caller
//! always learns which stage gave up.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Errors a submission can end in.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The submitted batch failed structural validation. Nothing was touched.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The remote repository could not be cloned into a workspace.
    #[error("Sync failed: {operation} - {message}")]
    Sync { operation: String, message: String },

    /// The existing catalog document could not be read or parsed into the
    /// expected shape.
    #[error("Catalog document {path} is unusable: {message}")]
    DocumentCorrupt { path: String, message: String },

    /// The remote kept advancing past this workspace; push retries exhausted.
    #[error("Publish conflict: remote advanced past this workspace on all {attempts} attempts")]
    PublishConflict { attempts: u32 },

    /// A non-conflict failure while committing or pushing.
    #[error("Publish failed: {operation} - {message}")]
    Publish { operation: String, message: String },

    /// The workspace directory could not be removed. Reported, but never
    /// overrides the submission's already-determined outcome.
    #[error("Cleanup failed for {path}: {message}")]
    Cleanup { path: String, message: String },
}

impl SubmitError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a sync error
    pub fn sync(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sync {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a document corruption error
    pub fn document_corrupt(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DocumentCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a publish error
    pub fn publish(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a cleanup error
    pub fn cleanup(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Cleanup {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for faults the submitter caused (HTTP 4xx); everything else is
    /// a server-side failure.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
