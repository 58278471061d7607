//! lectern-core - Core library for lectern.
//!
//! Turns lecture text into quizzes and flashcards: token-aware chunking,
//! resilient model calls with backoff and recovery, result normalization,
//! schema validation, and a batch orchestrator that isolates per-chunk
//! failures.
//!
//! # Example
//!
//! ```ignore
//! use lectern_core::{Chunker, Generator, TiktokenTokenizer};
//!
//! let chunker = Chunker::new(Arc::new(TiktokenTokenizer::cl100k()?), 1800);
//! let chunks = chunker.split(&lecture_text);
//!
//! let generator = Generator::new(llm).with_concurrency(2);
//! let batch = generator.generate_quizzes(&chunks).await?;
//! for question in &batch.items {
//!     println!("{}", question.question);
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod traits;
pub mod types;

#[cfg(feature = "documents")]
pub mod ingest;

// Re-export commonly used types
pub use chunking::{Chunker, TiktokenTokenizer, DEFAULT_CHUNK_TOKENS};
pub use config::{LecternConfig, LlmProvider, LlmProviderConfig};
pub use error::{ErrorCode, LecternError, LecternResult};
pub use generation::{
    normalize, validate, ChunkOutcome, ChunkReport, GenerationBatch, Generator, RetryController,
    RetryPolicy,
};
pub use logging::{ErrorLog, JsonFileErrorLog, LogEntry, MemoryErrorLog, TracingErrorLog};
pub use traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, Tokenizer};
pub use types::{
    FlashcardItem, GenerationKind, Message, MessageRole, QuizItem, StudyItem, TextChunk,
    ValidationIssue,
};

#[cfg(feature = "documents")]
pub use ingest::{prepare_chunks, DocumentInput, DocumentSummary, IngestOutput};
