use crate::extract::ExtractError;
use crate::schema::ValidationError;

/// Everything that can go wrong between receiving a request body and
/// handing back a validated draft.
///
/// The four variants map one-to-one to the error categories the HTTP layer
/// reports, so callers can tell "the model produced garbage" apart from
/// "the model produced JSON that doesn't match the rubric contract".
#[derive(Debug)]
pub enum RunnerError {
    /// Missing or unusable configuration (e.g. no API credential). Surfaced
    /// before any upstream request is attempted.
    Config(String),
    /// Transport failure, non-2xx status, or an unreadable body from the
    /// completion API. Carries the underlying message for diagnostics.
    Upstream(String),
    /// No JSON value could be recovered from the completion text.
    Extraction(ExtractError),
    /// JSON was recovered but failed the rubric schema contract.
    Validation(Vec<ValidationError>),
}

impl RunnerError {
    /// True when the failure is the model emitting unparseable text, as
    /// opposed to structurally wrong JSON. Drives the `parseError` flag
    /// in HTTP error bodies.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, RunnerError::Extraction(_))
    }

    /// Human-readable detail string for the `details` field.
    pub fn details(&self) -> String {
        match self {
            RunnerError::Config(msg) | RunnerError::Upstream(msg) => msg.clone(),
            RunnerError::Extraction(e) => e.to_string(),
            RunnerError::Validation(errors) => errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

impl std::fmt::Display for RunnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunnerError::Config(msg) => write!(f, "configuration error: {msg}"),
            RunnerError::Upstream(msg) => write!(f, "upstream completion error: {msg}"),
            RunnerError::Extraction(e) => write!(f, "failed to parse rubric draft: {e}"),
            RunnerError::Validation(errors) => {
                write!(f, "invalid rubric draft structure: ")?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for RunnerError {}

impl From<ExtractError> for RunnerError {
    fn from(e: ExtractError) -> Self {
        RunnerError::Extraction(e)
    }
}

impl From<Vec<ValidationError>> for RunnerError {
    fn from(errors: Vec<ValidationError>) -> Self {
        RunnerError::Validation(errors)
    }
}
