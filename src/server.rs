//! HTTP surface: a health check and the upload endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::entry::SubmissionEntry;
use crate::error::SubmitError;
use crate::pipeline::SubmissionPipeline;

/// Accepted request bodies for `POST /upload`.
///
/// Clients send either a bare array of entries or an object wrapping the
/// array under `urls`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UploadRequest {
    Entries(Vec<SubmissionEntry>),
    Wrapped { urls: Vec<SubmissionEntry> },
}

impl UploadRequest {
    fn into_entries(self) -> Vec<SubmissionEntry> {
        match self {
            Self::Entries(entries) => entries,
            Self::Wrapped { urls } => urls,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub urls: Vec<String>,
}

pub fn router(pipeline: Arc<SubmissionPipeline>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn upload(
    State(pipeline): State<Arc<SubmissionPipeline>>,
    Json(request): Json<UploadRequest>,
) -> Response {
    let entries = request.into_entries();

    // The pipeline blocks on git. Running it on the blocking pool also lets
    // the submission settle and clean up even if the client disconnects.
    let result = tokio::task::spawn_blocking(move || pipeline.submit(&entries)).await;

    match result {
        Ok(Ok(receipt)) => (
            StatusCode::OK,
            Json(UploadResponse {
                message: "Urls uploaded successfully".to_string(),
                urls: receipt.urls,
            }),
        )
            .into_response(),
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            error!("Submission task panicked: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}

/// Map a pipeline error to a status: the submitter's fault gets a 400,
/// everything else is a 500.
fn error_response(e: SubmitError) -> Response {
    let status = if e.is_client_fault() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}
