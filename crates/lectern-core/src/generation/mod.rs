//! Resilient generation of study material from text chunks.
//!
//! Per chunk: prompt -> [`RetryController`] -> [`normalize`] -> [`validate`].
//! The [`Generator`] runs that for every chunk of a batch, isolating
//! per-chunk failures and aggregating accepted items in chunk order.

mod json;
mod normalize;
mod orchestrator;
pub mod prompts;
mod retry;
mod validate;

pub use json::{parse_model_json, recover_failed_generation, strip_code_fences};
pub use normalize::{normalize, MAX_NORMALIZE_DEPTH};
pub use orchestrator::{ChunkOutcome, ChunkReport, GenerationBatch, Generator};
pub use retry::{GenerationAttempt, RetryController, RetryPolicy};
pub use validate::{validate, validate_items, MAX_EXPLANATION_CHARS, QUIZ_OPTION_COUNT};
