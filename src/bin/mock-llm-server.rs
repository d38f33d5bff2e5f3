//! Stand-in for the hosted completion API during local development and
//! manual testing. Speaks just enough of the chat-completions shape for
//! `LlmClient`, and can wrap its canned rubric in prose or fences (or emit
//! garbage) to exercise every extractor fallback branch end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReplyMode {
    /// Bare JSON object, exercises the direct-parse step.
    Clean,
    /// JSON inside a ```json fence with chatty prose around it.
    Fenced,
    /// JSON buried in prose with a decoy braced segment before it.
    Prose,
    /// Not JSON at all; the pipeline should report a parse error.
    Garbage,
    /// Valid JSON that misses the rubric schema (two criteria only).
    Invalid,
}

impl ReplyMode {
    fn from_env() -> Self {
        match std::env::var("MOCK_LLM_MODE").as_deref() {
            Ok("fenced") => ReplyMode::Fenced,
            Ok("prose") => ReplyMode::Prose,
            Ok("garbage") => ReplyMode::Garbage,
            Ok("invalid") => ReplyMode::Invalid,
            _ => ReplyMode::Clean,
        }
    }
}

#[derive(Clone)]
struct MockState {
    mode: ReplyMode,
    request_count: Arc<AtomicUsize>,
}

#[derive(Serialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Serialize)]
struct Choice {
    message: Message,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

fn canned_rubric() -> String {
    json!({
        "title": "Seed-stage investor pitch",
        "description": "Scores a 90-second seed pitch on narrative and substance.",
        "targetDurationSeconds": 90,
        "criteria": [
            {
                "name": "Hook",
                "description": "Opens with a concrete, attention-grabbing problem statement.",
                "scoringGuide": "0 = no hook; 5 = generic opener; 10 = memorable and specific.",
                "weight": 1.0
            },
            {
                "name": "Problem",
                "description": "Makes the pain point and who suffers from it unambiguous.",
                "scoringGuide": "0 = vague; 10 = quantified and vivid."
            },
            {
                "name": "Solution",
                "description": "Connects the product directly to the stated problem.",
                "scoringGuide": "0 = disconnect; 10 = obvious fit with evidence."
            },
            {
                "name": "Ask",
                "description": "Closes with a clear, sized ask and use of funds.",
                "weight": 0.5
            }
        ]
    })
    .to_string()
}

fn reply_text(mode: ReplyMode) -> String {
    let rubric = canned_rubric();
    match mode {
        ReplyMode::Clean => rubric,
        ReplyMode::Fenced => {
            format!("Sure! Here is the rubric you asked for:\n```json\n{rubric}\n```\nLet me know if you want changes.")
        }
        ReplyMode::Prose => {
            format!("Note: {{this part is commentary}} and the rubric follows: {rubric} -- happy pitching!")
        }
        ReplyMode::Garbage => "I'm sorry, I can't produce a rubric right now.".to_string(),
        ReplyMode::Invalid => json!({
            "title": "Too short",
            "criteria": [
                {"name": "A", "description": "a"},
                {"name": "B", "description": "b"}
            ]
        })
        .to_string(),
    }
}

async fn chat_completions(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Json<Completion> {
    let n = state.request_count.fetch_add(1, Ordering::SeqCst) + 1;
    let message_count = body["messages"].as_array().map(|m| m.len()).unwrap_or(0);
    tracing::info!(request = n, message_count, mode = ?state.mode, "mock completion request");

    Json(Completion {
        choices: vec![Choice {
            message: Message {
                role: "assistant",
                content: reply_text(state.mode),
            },
        }],
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let port = std::env::var("MOCK_LLM_PORT")
        .unwrap_or_else(|_| "8081".to_string())
        .parse::<u16>()
        .unwrap_or(8081);
    let mode = ReplyMode::from_env();

    let state = MockState {
        mode,
        request_count: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(%addr, ?mode, "mock LLM server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
