//! Linkpress service binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use linkpress::config::ServiceConfig;
use linkpress::pipeline::SubmissionPipeline;
use linkpress::server;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Path to an env file (default: .env in the working directory)
    #[arg(long)]
    env_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = ServiceConfig::default();
    if let Some(port) = args.port {
        config.port = port;
    }
    if config.remote_url.is_empty() {
        anyhow::bail!(
            "no content repository configured; set CATALOG_REMOTE_URL or \
             GITHUB_USERNAME, GITHUB_TOKEN and GITHUB_REPO"
        );
    }

    let addr = format!("{}:{}", args.bind, config.port);
    // The remote url may embed a push token, so it stays out of the logs.
    info!(
        document = %config.document_path,
        workspace_root = %config.workspace_root.display(),
        max_push_attempts = config.max_push_attempts,
        "Linkpress starting on {addr}"
    );

    let pipeline = Arc::new(SubmissionPipeline::new(&config));
    let app = server::router(pipeline);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
