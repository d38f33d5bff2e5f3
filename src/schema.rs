use serde_json::Value;

/// Minimal declarative type language for validating LLM-produced JSON.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Text,
    /// String that must contain at least one non-whitespace character.
    NonEmptyText,
    Number,
    Bool,
    /// Inner type, or explicit `null`. Absent optional fields and explicit
    /// nulls are treated identically by the object walker.
    Nullable(Box<TypeDef>),
    List {
        item: Box<TypeDef>,
        min_len: usize,
    },
    Object(Vec<FieldDef>),
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: TypeDef,
    pub required: bool,
}

/// Single validation error, with a JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField { path: String },
    TypeMismatch { path: String, expected: &'static str, found: &'static str },
    EmptyText { path: String },
    TooFewItems { path: String, min: usize, found: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingField { path } => {
                write!(f, "missing required field at {path}")
            }
            ValidationError::TypeMismatch { path, expected, found } => {
                write!(f, "type mismatch at {path}: expected {expected}, found {found}")
            }
            ValidationError::EmptyText { path } => {
                write!(f, "field at {path} must be a non-empty string")
            }
            ValidationError::TooFewItems { path, min, found } => {
                write!(f, "array at {path} needs at least {min} items, found {found}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a `serde_json::Value` against a `TypeDef`.
///
/// Collects every failure rather than stopping at the first, so rejection
/// messages can name all the problems in one pass. Never coerces or fills
/// defaults; a value either satisfies the schema or is rejected whole.
pub fn validate(ty: &TypeDef, value: &Value) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_inner(ty, value, "$", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_inner(ty: &TypeDef, value: &Value, path: &str, errors: &mut Vec<ValidationError>) {
    match ty {
        TypeDef::Text => {
            if !value.is_string() {
                errors.push(ValidationError::TypeMismatch {
                    path: path.to_string(),
                    expected: "string",
                    found: value_type_name(value),
                });
            }
        }
        TypeDef::NonEmptyText => match value.as_str() {
            Some(s) if !s.trim().is_empty() => {}
            Some(_) => errors.push(ValidationError::EmptyText {
                path: path.to_string(),
            }),
            None => errors.push(ValidationError::TypeMismatch {
                path: path.to_string(),
                expected: "string",
                found: value_type_name(value),
            }),
        },
        TypeDef::Number => {
            if !value.is_number() {
                errors.push(ValidationError::TypeMismatch {
                    path: path.to_string(),
                    expected: "number",
                    found: value_type_name(value),
                });
            }
        }
        TypeDef::Bool => {
            if !value.is_boolean() {
                errors.push(ValidationError::TypeMismatch {
                    path: path.to_string(),
                    expected: "boolean",
                    found: value_type_name(value),
                });
            }
        }
        TypeDef::Nullable(inner) => {
            if !value.is_null() {
                validate_inner(inner, value, path, errors);
            }
        }
        TypeDef::List { item, min_len } => {
            if let Value::Array(items) = value {
                if items.len() < *min_len {
                    errors.push(ValidationError::TooFewItems {
                        path: path.to_string(),
                        min: *min_len,
                        found: items.len(),
                    });
                }
                for (idx, v) in items.iter().enumerate() {
                    let child_path = format!("{path}[{idx}]");
                    validate_inner(item, v, &child_path, errors);
                }
            } else {
                errors.push(ValidationError::TypeMismatch {
                    path: path.to_string(),
                    expected: "array",
                    found: value_type_name(value),
                });
            }
        }
        TypeDef::Object(fields) => {
            let Some(obj) = value.as_object() else {
                errors.push(ValidationError::TypeMismatch {
                    path: path.to_string(),
                    expected: "object",
                    found: value_type_name(value),
                });
                return;
            };

            for field in fields {
                let field_path = format!("{path}.{}", field.name);
                match obj.get(field.name) {
                    None => {
                        if field.required {
                            errors.push(ValidationError::MissingField { path: field_path });
                        }
                        // Absent optional field == explicit null.
                    }
                    Some(Value::Null) if !field.required => {}
                    Some(v) => validate_inner(&field.ty, v, &field_path, errors),
                }
            }

            // Extra fields are ignored (lenient). Can tighten later.
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_schema() -> TypeDef {
        TypeDef::Object(vec![
            FieldDef {
                name: "title",
                ty: TypeDef::NonEmptyText,
                required: true,
            },
            FieldDef {
                name: "note",
                ty: TypeDef::Nullable(Box::new(TypeDef::Text)),
                required: false,
            },
            FieldDef {
                name: "items",
                ty: TypeDef::List {
                    item: Box::new(TypeDef::Number),
                    min_len: 2,
                },
                required: true,
            },
        ])
    }

    #[test]
    fn accepts_conforming_object() {
        let v = json!({"title": "t", "note": "n", "items": [1, 2]});
        assert!(validate(&sample_schema(), &v).is_ok());
    }

    #[test]
    fn absent_optional_equals_explicit_null() {
        let absent = json!({"title": "t", "items": [1, 2]});
        let null = json!({"title": "t", "note": null, "items": [1, 2]});
        assert!(validate(&sample_schema(), &absent).is_ok());
        assert!(validate(&sample_schema(), &null).is_ok());
    }

    #[test]
    fn wrong_optional_type_is_rejected() {
        let v = json!({"title": "t", "note": 7, "items": [1, 2]});
        let errors = validate(&sample_schema(), &v).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::TypeMismatch {
                path: "$.note".into(),
                expected: "string",
                found: "number",
            }]
        );
    }

    #[test]
    fn empty_string_fails_non_empty_text() {
        let v = json!({"title": "   ", "items": [1, 2]});
        let errors = validate(&sample_schema(), &v).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyText { path: "$.title".into() }]);
    }

    #[test]
    fn short_list_reports_min_len() {
        let v = json!({"title": "t", "items": [1]});
        let errors = validate(&sample_schema(), &v).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::TooFewItems {
                path: "$.items".into(),
                min: 2,
                found: 1,
            }]
        );
    }

    #[test]
    fn non_object_root_is_a_single_mismatch() {
        let errors = validate(&sample_schema(), &json!([1, 2])).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::TypeMismatch {
                path: "$".into(),
                expected: "object",
                found: "array",
            }]
        );
    }

    #[test]
    fn all_failures_collected_in_one_pass() {
        let v = json!({"items": "nope"});
        let errors = validate(&sample_schema(), &v).unwrap_err();
        assert_eq!(errors.len(), 2); // missing title + items type mismatch
    }
}
