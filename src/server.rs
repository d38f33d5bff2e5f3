use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::RunnerError;
use crate::llm::{LlmClient, SamplingParams};
use crate::prompt::{build_draft_messages, build_refine_messages, RawMessage};
use crate::rubric::{generate_draft, RubricDraft};

pub struct AppState {
    pub llm: LlmClient,
    /// Shared secret presented as a bearer token. Identity itself lives with
    /// the external auth provider; this service only checks the token it was
    /// configured with. `None` disables the check (local development).
    pub auth_token: Option<String>,
}

/// Body for `POST /api/rubric/draft` (single-shot mode).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    pub context_text: String,
    #[serde(default)]
    pub target_length_seconds: Option<f64>,
    #[serde(default)]
    pub rubric_type: Option<String>,
    #[serde(default)]
    pub user_edits: Option<String>,
    /// Current rubric as a JSON string, passed through into the prompt.
    #[serde(default)]
    pub current_rubric: Option<String>,
}

/// Body for `POST /api/rubric/refine` (conversational mode).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    pub messages: Vec<RawMessage>,
    #[serde(default)]
    pub current_draft: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DraftResponse {
    ok: bool,
    draft_rubric: RubricDraft,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_error: Option<bool>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/rubric/draft", post(draft_handler))
        .route("/api/rubric/refine", post(refine_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn error_response(
    status: StatusCode,
    error: &str,
    details: Option<String>,
    parse_error: Option<bool>,
) -> Response {
    let body = ErrorBody {
        ok: false,
        error: error.to_string(),
        details,
        parse_error,
    };
    (status, Json(body)).into_response()
}

/// Check the presented bearer token against the configured shared secret.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = state.auth_token.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            None,
            None,
        )),
    }
}

/// Map a pipeline failure onto the structured 500 bodies. `parseError`
/// distinguishes "the model produced garbage" (extraction) from "the model
/// produced JSON that missed the schema" (validation).
fn pipeline_error_response(err: RunnerError) -> Response {
    tracing::error!(error = %err, "rubric pipeline failed");
    match &err {
        RunnerError::Extraction(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to parse rubric draft",
            Some(err.details()),
            Some(true),
        ),
        RunnerError::Validation(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Invalid rubric draft structure",
            Some(err.details()),
            Some(false),
        ),
        RunnerError::Config(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error",
            Some(err.details()),
            None,
        ),
        RunnerError::Upstream(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Completion service error",
            Some(err.details()),
            None,
        ),
    }
}

// Bodies are taken as raw JSON and mapped by hand so that malformed shapes
// come back as 400 with a reason, matching the client-input error category.
fn bad_request(details: String) -> Response {
    error_response(StatusCode::BAD_REQUEST, "Malformed request body", Some(details), None)
}

async fn draft_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }

    let req: DraftRequest = match serde_json::from_value(body) {
        Ok(r) => r,
        Err(e) => return bad_request(e.to_string()),
    };
    if req.context_text.trim().is_empty() {
        return bad_request("contextText must be a non-empty string".to_string());
    }

    let messages = build_draft_messages(&req);
    match generate_draft(&state.llm, &messages, &SamplingParams::default()).await {
        Ok(draft) => {
            tracing::info!(criteria = draft.criteria.len(), "generated rubric draft");
            (StatusCode::OK, Json(DraftResponse { ok: true, draft_rubric: draft })).into_response()
        }
        Err(err) => pipeline_error_response(err),
    }
}

async fn refine_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }

    let req: RefineRequest = match serde_json::from_value(body) {
        Ok(r) => r,
        Err(e) => return bad_request(e.to_string()),
    };
    if req.messages.is_empty() {
        return bad_request("messages must be a non-empty array".to_string());
    }

    let messages = build_refine_messages(&req.messages, req.current_draft.as_ref());
    match generate_draft(&state.llm, &messages, &SamplingParams::default()).await {
        Ok(draft) => {
            tracing::info!(criteria = draft.criteria.len(), "refined rubric draft");
            (StatusCode::OK, Json(DraftResponse { ok: true, draft_rubric: draft })).into_response()
        }
        Err(err) => pipeline_error_response(err),
    }
}
