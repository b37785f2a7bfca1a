//! HTTP endpoint tests over the in-process router.
//!
//! The router is exercised with `tower::ServiceExt::oneshot`; submissions
//! land in a real local bare remote, same as the pipeline tests.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

use linkpress::config::ServiceConfig;
use linkpress::document::{ContentDocument, DEFAULT_DOCUMENT_PATH};
use linkpress::pipeline::SubmissionPipeline;
use linkpress::server;

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

/// Bare remote seeded with an empty catalog document on `main`.
fn setup_remote(root: &Path) -> String {
    let remote = root.join("remote.git");
    fs::create_dir_all(&remote).unwrap();
    run_git(&remote, &["init", "--bare"]);
    run_git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    let seed = root.join("seed");
    run_git(root, &["clone", remote.to_str().unwrap(), "seed"]);
    run_git(&seed, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git(&seed, &["config", "user.email", "test@test.com"]);
    run_git(&seed, &["config", "user.name", "Test"]);
    fs::write(
        seed.join(DEFAULT_DOCUMENT_PATH),
        ContentDocument::empty().to_pretty_json().unwrap(),
    )
    .unwrap();
    run_git(&seed, &["add", "."]);
    run_git(&seed, &["commit", "-m", "Initial catalog"]);
    run_git(&seed, &["push", "origin", "main"]);

    remote.to_str().unwrap().to_string()
}

fn test_config(root: &Path, remote_url: &str) -> ServiceConfig {
    ServiceConfig {
        remote_url: remote_url.to_string(),
        document_path: DEFAULT_DOCUMENT_PATH.to_string(),
        workspace_root: root.join("workspaces"),
        max_push_attempts: 3,
        commit_author: "Catalog Bot".to_string(),
        commit_email: "bot@catalog".to_string(),
        port: 0,
    }
}

fn remote_document(root: &Path, remote_url: &str) -> ContentDocument {
    let check = tempfile::tempdir_in(root).unwrap();
    run_git(check.path(), &["clone", remote_url, "check"]);
    let raw = fs::read_to_string(check.path().join("check").join(DEFAULT_DOCUMENT_PATH)).unwrap();
    ContentDocument::parse(&raw).unwrap()
}

fn test_router(config: &ServiceConfig) -> axum::Router {
    server::router(Arc::new(SubmissionPipeline::new(config)))
}

async fn post_upload(router: axum::Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let dir = tempdir().unwrap();
    let remote_url = setup_remote(dir.path());
    let router = test_router(&test_config(dir.path(), &remote_url));

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["status"], "ok");
}

#[tokio::test]
async fn test_upload_records_batch() {
    let dir = tempdir().unwrap();
    let remote_url = setup_remote(dir.path());
    let config = test_config(dir.path(), &remote_url);
    let router = test_router(&config);

    let body = json!([
        {
            "url": "https://example.com/shiur",
            "title": "Evening Shiur",
            "category": "media_appearances"
        },
        {
            "url": "https://example.com/sefer",
            "title": "Gates of Repentance",
            "description": "Annotated edition",
            "category": "published_works"
        }
    ]);
    let (status, value) = post_upload(router, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["message"], "Urls uploaded successfully");
    assert_eq!(value["urls"][0], "https://example.com/shiur");
    assert_eq!(value["urls"][1], "https://example.com/sefer");

    let doc = remote_document(dir.path(), &remote_url);
    assert_eq!(doc.media_appearances.len(), 1);
    assert_eq!(doc.published_works.len(), 1);
    assert_eq!(doc.published_works[0].sefer, "Gates of Repentance");
}

#[tokio::test]
async fn test_upload_accepts_wrapped_body() {
    let dir = tempdir().unwrap();
    let remote_url = setup_remote(dir.path());
    let config = test_config(dir.path(), &remote_url);
    let router = test_router(&config);

    let body = json!({
        "urls": [{
            "url": "https://example.com/clip",
            "title": "Podcast Clip",
            "category": "media_appearances"
        }]
    });
    let (status, value) = post_upload(router, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["urls"][0], "https://example.com/clip");

    let doc = remote_document(dir.path(), &remote_url);
    assert_eq!(doc.media_appearances[0].title, "Podcast Clip");
}

#[tokio::test]
async fn test_invalid_entry_is_bad_request() {
    let dir = tempdir().unwrap();
    let remote_url = setup_remote(dir.path());
    let config = test_config(dir.path(), &remote_url);
    let router = test_router(&config);

    let body = json!([{
        "url": "https://example.com/x",
        "title": "",
        "category": "media_appearances"
    }]);
    let (status, value) = post_upload(router, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = value["error"].as_str().unwrap();
    assert!(message.contains("entry 0"));

    let doc = remote_document(dir.path(), &remote_url);
    assert!(doc.is_empty());
}

#[tokio::test]
async fn test_unreachable_remote_is_server_error() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path(), "ignored");
    config.remote_url = dir.path().join("no-such-remote").display().to_string();
    let router = test_router(&config);

    let body = json!([{
        "url": "https://example.com/x",
        "title": "Talk",
        "category": "media_appearances"
    }]);
    let (status, value) = post_upload(router, body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(value["error"].as_str().unwrap().contains("clone"));
}
