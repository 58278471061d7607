//! Core traits for lectern collaborators.

mod llm;
mod tokenizer;

pub use llm::*;
pub use tokenizer::*;
