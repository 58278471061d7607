//! lectern-llm - LLM provider implementations for lectern.
//!
//! Every supported provider speaks the OpenAI chat-completions protocol, so
//! a single client covers them all. Provider error bodies are mapped onto
//! [`lectern_core::LecternError`], including Groq's `failed_generation`
//! field, which the retry controller uses to salvage malformed JSON.
//!
//! # Supported Providers
//!
//! - **Groq** (default) - `llama-3.1-70b-versatile`
//! - **OpenAI**
//! - **Ollama** - local models via its OpenAI-compatible endpoint
//!
//! # Example
//!
//! ```ignore
//! use lectern_llm::LlmFactory;
//!
//! // Reads GROQ_API_KEY
//! let llm = LlmFactory::groq()?;
//!
//! let llm = LlmFactory::ollama_with_model("llama3.1")?;
//! ```

mod factory;
mod openai_compatible;

pub use factory::LlmFactory;
pub use openai_compatible::OpenAiCompatibleLlm;

// Re-export core types for convenience
pub use lectern_core::config::LlmProvider;
pub use lectern_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
