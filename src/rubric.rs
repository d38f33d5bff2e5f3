use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RunnerError;
use crate::extract::extract_json;
use crate::llm::{LlmClient, SamplingParams};
use crate::prompt::ChatMessage;
use crate::schema::{validate, FieldDef, TypeDef};

/// A validated, not-yet-persisted rubric. Only ever constructed after the
/// raw JSON passed [`validate_draft`]; callers never see a partial draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_duration_seconds: Option<f64>,
    /// Ordered; insertion order is display and evaluation order.
    pub criteria: Vec<Criterion>,
}

/// One scored dimension of a rubric (e.g. "Hook", "Clarity").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_guide: Option<String>,
    #[serde(default = "default_weight", deserialize_with = "weight_or_default")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

// The schema admits an explicit `"weight": null`, which must land on the
// default just like an absent field.
fn weight_or_default<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<f64>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_else(default_weight))
}

/// Minimum number of criteria for a draft to be usable.
pub const MIN_CRITERIA: usize = 3;

/// Structural contract for LLM-produced rubric JSON.
pub fn rubric_draft_typedef() -> TypeDef {
    TypeDef::Object(vec![
        FieldDef {
            name: "title",
            ty: TypeDef::NonEmptyText,
            required: true,
        },
        FieldDef {
            name: "description",
            ty: TypeDef::Nullable(Box::new(TypeDef::Text)),
            required: false,
        },
        FieldDef {
            name: "targetDurationSeconds",
            ty: TypeDef::Nullable(Box::new(TypeDef::Number)),
            required: false,
        },
        FieldDef {
            name: "criteria",
            ty: TypeDef::List {
                item: Box::new(TypeDef::Object(vec![
                    FieldDef {
                        name: "name",
                        ty: TypeDef::NonEmptyText,
                        required: true,
                    },
                    FieldDef {
                        name: "description",
                        ty: TypeDef::NonEmptyText,
                        required: true,
                    },
                    FieldDef {
                        name: "scoringGuide",
                        ty: TypeDef::Nullable(Box::new(TypeDef::Text)),
                        required: false,
                    },
                    FieldDef {
                        name: "weight",
                        ty: TypeDef::Nullable(Box::new(TypeDef::Number)),
                        required: false,
                    },
                ])),
                min_len: MIN_CRITERIA,
            },
            required: true,
        },
    ])
}

/// Check an extracted JSON value against the rubric contract and, on
/// success, deserialize it into a typed draft. No coercion: the value
/// either satisfies every check or the whole thing is rejected.
pub fn validate_draft(value: &Value) -> Result<RubricDraft, RunnerError> {
    validate(&rubric_draft_typedef(), value)?;
    let draft: RubricDraft = serde_json::from_value(value.clone())
        .map_err(|e| RunnerError::Upstream(format!("validated JSON failed to deserialize: {e}")))?;
    Ok(draft)
}

/// Run the full pipeline once: invoke the completion API, recover JSON from
/// the response text, validate it, return the typed draft.
///
/// Single-shot by design. A failed completion is surfaced immediately and
/// resubmission is the caller's decision; nothing here retries.
pub async fn generate_draft(
    llm: &LlmClient,
    messages: &[ChatMessage],
    params: &SamplingParams,
) -> Result<RubricDraft, RunnerError> {
    let text = llm.complete(messages, params).await?;
    let value = extract_json(&text)?;
    validate_draft(&value)
}
