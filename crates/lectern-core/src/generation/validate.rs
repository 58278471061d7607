//! All-or-nothing structural validation of normalized model output.

use serde_json::{Map, Value};

use crate::error::{LecternError, LecternResult};
use crate::types::{GenerationKind, StudyItem, ValidationIssue};

/// Longest accepted quiz explanation, in UTF-16 code units.
pub const MAX_EXPLANATION_CHARS: usize = 500;

/// Number of answer options every quiz item must carry.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Check every item against the rules for `kind`.
///
/// Returns all issues found, not just the first.
pub fn validate(items: &[Value], kind: GenerationKind) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let Some(fields) = item.as_object() else {
            issues.push(ValidationIssue::new(Some(i), "item", "must be an object"));
            continue;
        };
        match kind {
            GenerationKind::Quiz => check_quiz(i, fields, &mut issues),
            GenerationKind::Flashcard => check_flashcard(i, fields, &mut issues),
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Validate and deserialize a chunk's items, rejecting the whole batch on
/// any issue.
pub fn validate_items<T: StudyItem>(items: Vec<Value>) -> LecternResult<Vec<T>> {
    validate(&items, T::KIND).map_err(LecternError::validation_rejected)?;
    deserialize_items(items)
}

/// Convert items that already passed [`validate`].
pub(crate) fn deserialize_items<T: StudyItem>(items: Vec<Value>) -> LecternResult<Vec<T>> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(LecternError::from))
        .collect()
}

fn check_quiz(i: usize, fields: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) {
    require_text(i, fields, "question", issues);
    require_text(i, fields, "correctAnswer", issues);

    match fields.get("options") {
        Some(Value::Array(options)) => {
            if options.len() != QUIZ_OPTION_COUNT {
                issues.push(ValidationIssue::new(
                    Some(i),
                    "options",
                    format!(
                        "must have exactly {} entries, got {}",
                        QUIZ_OPTION_COUNT,
                        options.len()
                    ),
                ));
            }
            for (j, option) in options.iter().enumerate() {
                if !is_non_empty_str(option) {
                    issues.push(ValidationIssue::new(
                        Some(i),
                        format!("options[{}]", j),
                        "must be a non-empty string",
                    ));
                }
            }
        }
        Some(_) => issues.push(ValidationIssue::new(Some(i), "options", "must be an array")),
        None => issues.push(ValidationIssue::new(Some(i), "options", "is required")),
    }

    match fields.get("explanation") {
        None => {}
        Some(Value::String(text)) => {
            let len = text.encode_utf16().count();
            if len > MAX_EXPLANATION_CHARS {
                issues.push(ValidationIssue::new(
                    Some(i),
                    "explanation",
                    format!(
                        "must be at most {} characters, got {}",
                        MAX_EXPLANATION_CHARS, len
                    ),
                ));
            }
        }
        Some(_) => issues.push(ValidationIssue::new(
            Some(i),
            "explanation",
            "must be a string",
        )),
    }
}

fn check_flashcard(i: usize, fields: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) {
    require_text(i, fields, "front", issues);
    require_text(i, fields, "back", issues);
}

fn require_text(
    i: usize,
    fields: &Map<String, Value>,
    name: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    match fields.get(name) {
        Some(value) if is_non_empty_str(value) => {}
        Some(_) => issues.push(ValidationIssue::new(Some(i), name, "must be a non-empty string")),
        None => issues.push(ValidationIssue::new(Some(i), name, "is required")),
    }
}

fn is_non_empty_str(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}
