use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Why no JSON value could be recovered from a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Input was empty or whitespace-only; no step was attempted.
    EmptyInput,
    /// Every fallback step failed. Carries the direct-parse error for context.
    NoJsonFound { parse_error: String },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::EmptyInput => write!(f, "completion text is empty"),
            ExtractError::NoJsonFound { parse_error } => {
                write!(f, "no valid JSON found in completion text ({parse_error})")
            }
        }
    }
}

impl std::error::Error for ExtractError {}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Non-greedy so the first closing fence terminates the block.
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap())
}

fn greedy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap())
}

/// Recover a single JSON value from arbitrary model output.
///
/// The input may be clean JSON, JSON inside a markdown code fence, JSON
/// surrounded by prose, or not JSON at all. Steps run in strict fallback
/// order, each only after the previous one failed to yield a parseable value:
///
/// 1. direct parse of the trimmed text
/// 2. first fenced code block, with or without a `json` language tag
/// 3. brace-balanced scan (string-literal aware)
/// 4. greedy first-`{`-to-last-`}` regex
///
/// Shape is not checked here: a bare array or number that parses is returned
/// and left for the schema validator to reject.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::EmptyInput);
    }

    // Step 1: the whole thing is JSON.
    let direct_err = match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => return Ok(v),
        Err(e) => e.to_string(),
    };

    // Step 2: fenced code block.
    if let Some(caps) = fence_re().captures(text) {
        if let Ok(v) = serde_json::from_str::<Value>(caps[1].trim()) {
            return Ok(v);
        }
    }

    // Step 3: brace-balanced scan. Handles prose on either side, decoy
    // balanced segments before the real object, and braces inside string
    // values, which is where the greedy regex truncates or over-matches.
    if let Some(v) = brace_scan(text) {
        return Ok(v);
    }

    // Step 4: greedy regex, last resort.
    if let Some(m) = greedy_re().find(text) {
        if let Ok(v) = serde_json::from_str::<Value>(m.as_str()) {
            return Ok(v);
        }
    }

    Err(ExtractError::NoJsonFound {
        parse_error: direct_err,
    })
}

/// Walk the text from each `{`, tracking brace depth while skipping braces
/// that occur inside JSON string literals. The first depth-zero-closing
/// candidate that actually parses wins.
fn brace_scan(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let starts = text
        .char_indices()
        .filter(|&(_, c)| c == '{')
        .map(|(i, _)| i);

    for start in starts {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut i = start;

        while i < bytes.len() {
            let b = bytes[i];
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
            } else {
                match b {
                    b'"' => in_string = true,
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            let candidate = &text[start..=i];
                            if let Ok(v) = serde_json::from_str::<Value>(candidate) {
                                return Some(v);
                            }
                            break; // this start is a dud, try the next `{`
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_parse_round_trips_clean_json() {
        let input = r#"{"title":"Seed pitch","criteria":[{"name":"Hook","description":"x"},{"name":"Problem","description":"y"},{"name":"Solution","description":"z"}]}"#;
        let v = extract_json(input).unwrap();
        assert_eq!(v, serde_json::from_str::<Value>(input).unwrap());
        assert_eq!(v["criteria"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn direct_parse_accepts_non_object_values() {
        // Shape checking belongs to the validator, not the extractor.
        assert_eq!(extract_json("[1, 2, 3]").unwrap(), json!([1, 2, 3]));
        assert_eq!(extract_json("42").unwrap(), json!(42));
    }

    #[test]
    fn fenced_block_with_surrounding_prose() {
        let input = "Sure! ```json\n{\"title\":\"T\",\"criteria\":[{\"name\":\"A\",\"description\":\"a\"},{\"name\":\"B\",\"description\":\"b\"},{\"name\":\"C\",\"description\":\"c\"}]}\n```";
        let v = extract_json(input).unwrap();
        assert_eq!(v["title"], "T");
        assert_eq!(v["criteria"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn fenced_block_without_language_tag() {
        let input = "Here you go:\n```\n{\"title\":\"T\",\"criteria\":[]}\n```\nHope that helps.";
        let v = extract_json(input).unwrap();
        assert_eq!(v["title"], "T");
    }

    #[test]
    fn brace_scan_skips_leading_decoy_and_inner_string_brace() {
        let input = r#"Note: {ignore this} then {"title":"T","description":"has a { in it? no.","criteria":[{"name":"A","description":"a"},{"name":"B","description":"b"},{"name":"C","description":"c"}]}"#;
        let v = extract_json(input).unwrap();
        assert_eq!(v["title"], "T");
        assert_eq!(v["description"], "has a { in it? no.");
        assert_eq!(v["criteria"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn brace_scan_handles_trailing_prose() {
        let input = r#"{"title":"T","criteria":[]} -- let me know if you want changes!"#;
        let v = extract_json(input).unwrap();
        assert_eq!(v["title"], "T");
    }

    #[test]
    fn greedy_regex_alone_fails_where_brace_scan_succeeds() {
        // Regression guard for the fallback ordering: first-{-to-last-}
        // spans the decoy prefix and the trailing stray brace, so the greedy
        // match is not valid JSON. The brace scan must be tried first.
        let input = r#"intro {not json} body {"title":"T","criteria":[]} outro }"#;
        let greedy = greedy_re().find(input).unwrap().as_str();
        assert!(serde_json::from_str::<Value>(greedy).is_err());

        let v = extract_json(input).unwrap();
        assert_eq!(v["title"], "T");
    }

    #[test]
    fn empty_input_fails_before_any_step() {
        assert_eq!(extract_json(""), Err(ExtractError::EmptyInput));
        assert_eq!(extract_json("   \n\t "), Err(ExtractError::EmptyInput));
    }

    #[test]
    fn plain_prose_is_no_json_found() {
        match extract_json("not json at all") {
            Err(ExtractError::NoJsonFound { .. }) => {}
            other => panic!("expected NoJsonFound, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_braces_fail() {
        match extract_json(r#"{"title": "never closed"#) {
            Err(ExtractError::NoJsonFound { .. }) => {}
            other => panic!("expected NoJsonFound, got {other:?}"),
        }
    }

    #[test]
    fn nested_objects_resolve_to_the_outer_object() {
        let input = r#"prose {"outer":{"inner":{"k":"v"}},"n":1} more prose"#;
        let v = extract_json(input).unwrap();
        assert_eq!(v["outer"]["inner"]["k"], "v");
        assert_eq!(v["n"], 1);
    }
}
