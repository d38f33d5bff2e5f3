//! rubric-runner: turn free-text LLM output into validated pitch rubrics.
//!
//! The pipeline is prompt assembly -> one completion call -> JSON recovery
//! from whatever the model actually returned -> schema validation -> typed
//! [`rubric::RubricDraft`]. Extraction and validation are pure functions of
//! the completion text; the HTTP layer in [`server`] is thin orchestration.

pub mod error;
pub mod extract;
pub mod llm;
pub mod prompt;
pub mod rubric;
pub mod schema;
pub mod server;
