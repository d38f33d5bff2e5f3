use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use rubric_runner::llm::LlmClient;
use rubric_runner::server::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rubric_runner=info,tower_http=info".into()),
        )
        .init();

    // Configure from env
    let addr: SocketAddr = std::env::var("RUBRIC_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .context("RUBRIC_BIND_ADDR is not a valid socket address")?;
    let auth_token = std::env::var("RUBRIC_AUTH_TOKEN").ok();

    let llm = LlmClient::from_env();
    if std::env::var("LLM_API_KEY").is_err() {
        tracing::warn!("LLM_API_KEY is not set; rubric endpoints will return configuration errors");
    }
    if auth_token.is_none() {
        tracing::warn!("RUBRIC_AUTH_TOKEN is not set; auth check disabled");
    }

    let state = Arc::new(AppState { llm, auth_token });

    tracing::info!(%addr, "rubric-runner listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
