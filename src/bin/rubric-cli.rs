use anyhow::{anyhow, bail, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::io::{self, Read};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rubric-cli")]
#[command(about = "CLI client for the rubric-runner HTTP service")]
struct Cli {
    /// Server base URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,

    /// Bearer token for the service (falls back to RUBRIC_AUTH_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Pitch context file path (use "-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Target pitch length in seconds
    #[arg(long)]
    target_seconds: Option<f64>,

    /// Rubric style hint (e.g. "investor", "demo-day")
    #[arg(long)]
    rubric_type: Option<String>,

    /// Free-text edit instructions applied to --current-rubric
    #[arg(long)]
    user_edits: Option<String>,

    /// Path to an existing rubric JSON file to refine
    #[arg(long)]
    current_rubric: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "120")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Read the pitch context
    let context_text = if cli.input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| anyhow!("Failed to read from stdin: {e}"))?;
        buffer
    } else {
        std::fs::read_to_string(&cli.input)
            .map_err(|e| anyhow!("Failed to read input file {}: {e}", cli.input))?
    };
    if context_text.trim().is_empty() {
        bail!("Pitch context is empty");
    }

    let current_rubric = match &cli.current_rubric {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .map_err(|e| anyhow!("Failed to read rubric file {path}: {e}"))?,
        ),
        None => None,
    };

    let mut body = json!({ "contextText": context_text });
    if let Some(seconds) = cli.target_seconds {
        body["targetLengthSeconds"] = json!(seconds);
    }
    if let Some(rubric_type) = &cli.rubric_type {
        body["rubricType"] = json!(rubric_type);
    }
    if let Some(edits) = &cli.user_edits {
        body["userEdits"] = json!(edits);
    }
    if let Some(rubric) = &current_rubric {
        body["currentRubric"] = json!(rubric);
    }

    let token = cli
        .token
        .clone()
        .or_else(|| std::env::var("RUBRIC_AUTH_TOKEN").ok());

    let url = format!("{}/api/rubric/draft", cli.server.trim_end_matches('/'));
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()?;

    let mut request = http.post(&url).json(&body);
    if let Some(token) = &token {
        request = request.bearer_auth(token);
    }

    let resp = request
        .send()
        .await
        .map_err(|e| anyhow!("Request to {url} failed: {e}"))?;

    let status = resp.status();
    let payload: Value = resp
        .json()
        .await
        .map_err(|e| anyhow!("Server returned a non-JSON body: {e}"))?;

    if !status.is_success() {
        let error = payload["error"].as_str().unwrap_or("unknown error");
        let details = payload["details"].as_str().unwrap_or("");
        bail!("Server returned {status}: {error} {details}");
    }

    let pretty = serde_json::to_string_pretty(&payload["draftRubric"])
        .map_err(|e| anyhow!("Failed to render draft: {e}"))?;
    println!("{pretty}");

    Ok(())
}
