//! JSON parsing utilities for model output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{LecternError, LecternResult};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^```[a-zA-Z0-9]*\s*([\s\S]*?)\s*```$").expect("code fence pattern is valid")
});

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fences(content: &str) -> &str {
    let content = content.trim();
    CODE_FENCE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(content)
}

/// Parse a model completion into a JSON value.
pub fn parse_model_json(content: &str) -> LecternResult<Value> {
    let cleaned = strip_code_fences(content);
    if cleaned.is_empty() {
        return Err(LecternError::llm("No content generated"));
    }
    serde_json::from_str(cleaned)
        .map_err(|e| LecternError::parse(format!("Model output is not valid JSON: {}", e)))
}

/// Salvage a partial generation by wrapping it as a single-element array.
pub fn recover_failed_generation(fragment: &str) -> LecternResult<Value> {
    serde_json::from_str(&format!("[{}]", fragment)).map_err(|e| {
        LecternError::parse(format!("Failed to parse failed generation data: {}", e))
    })
}
