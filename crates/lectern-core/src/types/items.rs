//! Study material produced from lecture chunks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString, IntoStaticStr};

/// Kind of study material a batch produces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    /// Multiple-choice quiz questions.
    Quiz,
    /// Front/back flashcards.
    Flashcard,
}

/// A multiple-choice question.
///
/// `correct_answer` is expected to be one of `options`, but that is the
/// model's responsibility; validation only checks it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    /// At most 500 UTF-16 code units. Absent, never `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A two-sided flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardItem {
    pub front: String,
    pub back: String,
}

/// A validated item type the generator can produce.
pub trait StudyItem: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Which prompt and schema apply to this item type.
    const KIND: GenerationKind;
}

impl StudyItem for QuizItem {
    const KIND: GenerationKind = GenerationKind::Quiz;
}

impl StudyItem for FlashcardItem {
    const KIND: GenerationKind = GenerationKind::Flashcard;
}

/// One structural problem found in model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Index of the offending item, `None` for batch-level problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<usize>,
    /// Field path, e.g. `options[2]`.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(item: Option<usize>, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item {
            Some(i) => write!(f, "item {}: {} {}", i, self.field, self.message),
            None => write!(f, "{} {}", self.field, self.message),
        }
    }
}
