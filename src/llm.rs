use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::RunnerError;
use crate::prompt::ChatMessage;

/// Sampling knobs forwarded to the completion API.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        // Low temperature: we want schema-shaped output, not creativity.
        Self { temperature: 0.2, max_tokens: 2048 }
    }
}

/// Client for an OpenAI-style chat-completions endpoint.
///
/// This is the pipeline's only suspension point. It performs exactly one
/// request per call; failed completions are surfaced, never retried.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(base_url: String, api_key: Option<String>, model: String) -> Self {
        // HTTP/1.1 only, no upgrade; keeps behavior predictable against
        // local mock servers as well as the hosted API.
        let http = Client::builder()
            .http1_only()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { http, base_url, api_key, model }
    }

    /// Read endpoint configuration from the environment.
    ///
    /// `LLM_API_KEY` may be absent: a missing credential is reported
    /// per-request as a configuration error, before any upstream call is
    /// attempted, so the server can still start and serve health checks.
    pub fn from_env() -> Self {
        let base_url = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let api_key = std::env::var("LLM_API_KEY").ok();
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Self::new(base_url, api_key, model)
    }

    /// Send one completion request and return the raw text of the first
    /// choice. An empty completion comes back as an empty string and is
    /// left to fail at the extraction step downstream.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String, RunnerError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(RunnerError::Config(
                "LLM_API_KEY is not set; refusing to call the completion API".to_string(),
            ));
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
                temperature: params.temperature,
                max_tokens: params.max_tokens,
                response_format: ResponseFormat { kind: "json_object" },
            })
            .send()
            .await
            .map_err(|e| {
                RunnerError::Upstream(format!("completion request failed: {e} (url: {url})"))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RunnerError::Upstream(format!(
                "completion API returned {status}: {body}"
            )));
        }

        let body: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| RunnerError::Upstream(format!("unreadable completion response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content)
    }
}
