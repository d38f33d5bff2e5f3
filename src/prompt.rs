use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rubric::rubric_draft_typedef;
use crate::schema::TypeDef;
use crate::server::DraftRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    fn parse(s: &str) -> Option<Role> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// One role-tagged turn in the request sent to the completion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Inbound message shape: role arrives as an arbitrary string and is
/// filtered during prompt assembly rather than rejected at deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub role: String,
    pub content: String,
}

fn system_instruction() -> String {
    let mut s = String::new();
    s.push_str("You are a pitch-coaching assistant that strictly outputs JSON.\n");
    s.push_str("You must produce a single JSON object describing an evaluation rubric, matching this schema:\n\n");
    s.push_str(&describe_schema(&rubric_draft_typedef(), 0));
    s.push_str("\nThe rubric must contain at least 3 criteria.\n");
    s.push_str("Each scoringGuide, when present, describes a 0-10 scale.\n");
    s.push_str("The JSON must be parseable and not contain comments or explanations.\n");
    s.push_str("Do not wrap it in markdown code fences.\n");
    s
}

/// Assemble the message list for single-shot draft generation.
///
/// One fixed system instruction, then a single user turn built from the
/// request's context text and optional refinement hints. Pure function,
/// no I/O.
pub fn build_draft_messages(req: &DraftRequest) -> Vec<ChatMessage> {
    let mut user = String::new();

    user.push_str("Create an evaluation rubric for the following pitch context.\n\n");
    user.push_str("Context:\n");
    user.push_str(&req.context_text);
    user.push('\n');

    if let Some(seconds) = req.target_length_seconds {
        user.push_str(&format!("\nThe pitch should target roughly {seconds} seconds; set targetDurationSeconds accordingly.\n"));
    }
    if let Some(rubric_type) = req.rubric_type.as_deref() {
        user.push_str(&format!("\nRubric style: {rubric_type}\n"));
    }
    if let Some(current) = req.current_rubric.as_deref() {
        user.push_str("\nThe user already has this rubric; treat it as the starting point and revise it:\n");
        user.push_str(current);
        user.push('\n');
    }
    if let Some(edits) = req.user_edits.as_deref() {
        user.push_str("\nThe user asked for these changes:\n");
        user.push_str(edits);
        user.push('\n');
    }

    vec![ChatMessage::system(system_instruction()), ChatMessage::user(user)]
}

/// Assemble the message list for conversational refinement.
///
/// Fixed system instruction, an optional system turn carrying the current
/// draft, then the conversation verbatim and in order. Messages with an
/// unknown role are dropped defensively rather than failing the request.
pub fn build_refine_messages(
    conversation: &[RawMessage],
    current_draft: Option<&Value>,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_instruction())];

    if let Some(draft) = current_draft {
        messages.push(ChatMessage::system(format!(
            "The current draft rubric is:\n{draft}\nRevise it according to the conversation; always return the complete revised rubric.",
        )));
    }

    for msg in conversation {
        if let Some(role) = Role::parse(&msg.role) {
            messages.push(ChatMessage {
                role,
                content: msg.content.clone(),
            });
        }
    }

    messages
}

// Human-readable schema description for the system prompt.
fn describe_schema(ty: &TypeDef, indent: usize) -> String {
    let mut s = String::new();
    let pad = " ".repeat(indent);

    match ty {
        TypeDef::Text => s.push_str(&format!("{pad}- string\n")),
        TypeDef::NonEmptyText => s.push_str(&format!("{pad}- non-empty string\n")),
        TypeDef::Number => s.push_str(&format!("{pad}- number\n")),
        TypeDef::Bool => s.push_str(&format!("{pad}- boolean\n")),
        TypeDef::Nullable(inner) => {
            s.push_str(&format!("{pad}- optional (may be null):\n"));
            s.push_str(&describe_schema(inner, indent + 2));
        }
        TypeDef::List { item, min_len } => {
            if *min_len > 0 {
                s.push_str(&format!("{pad}- array ({min_len}+ items) of:\n"));
            } else {
                s.push_str(&format!("{pad}- array of:\n"));
            }
            s.push_str(&describe_schema(item, indent + 2));
        }
        TypeDef::Object(fields) => {
            s.push_str(&format!("{pad}- object with fields:\n"));
            for f in fields {
                let opt = if f.required { "" } else { " (optional)" };
                s.push_str(&format!("{pad}  - {}{opt}: ", f.name));
                match &f.ty {
                    TypeDef::Text => s.push_str("string\n"),
                    TypeDef::NonEmptyText => s.push_str("non-empty string\n"),
                    TypeDef::Number => s.push_str("number\n"),
                    TypeDef::Bool => s.push_str("boolean\n"),
                    TypeDef::Nullable(inner) => match inner.as_ref() {
                        TypeDef::Text => s.push_str("string or null\n"),
                        TypeDef::NonEmptyText => s.push_str("non-empty string or null\n"),
                        TypeDef::Number => s.push_str("number or null\n"),
                        TypeDef::Bool => s.push_str("boolean or null\n"),
                        other => {
                            s.push_str("optional:\n");
                            s.push_str(&describe_schema(other, indent + 4));
                        }
                    },
                    TypeDef::List { .. } => {
                        s.push_str("array:\n");
                        s.push_str(&describe_schema(&f.ty, indent + 4));
                    }
                    TypeDef::Object(_) => {
                        s.push_str("nested object:\n");
                        s.push_str(&describe_schema(&f.ty, indent + 4));
                    }
                }
            }
        }
    }

    s
}
