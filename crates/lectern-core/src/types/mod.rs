//! Core data types for lectern.

mod chunk;
mod items;
mod message;

pub use chunk::TextChunk;
pub use items::{FlashcardItem, GenerationKind, QuizItem, StudyItem, ValidationIssue};
pub use message::{Message, MessageRole};
