//! Factory for creating LLM providers.

use std::sync::Arc;

use lectern_core::config::{LlmProvider, LlmProviderConfig};
use lectern_core::error::LecternResult;
use lectern_core::traits::{Llm, LlmConfig};

use crate::openai_compatible::OpenAiCompatibleLlm;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> LecternResult<Arc<dyn Llm>> {
        Ok(Arc::new(OpenAiCompatibleLlm::new(provider, config)?))
    }

    /// Create the provider described by a configuration section.
    pub fn from_config(config: &LlmProviderConfig) -> LecternResult<Arc<dyn Llm>> {
        Self::create(config.provider, config.config.clone())
    }

    /// Create a Groq LLM provider with default configuration.
    pub fn groq() -> LecternResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::Groq, LlmConfig::default())
    }

    /// Create an OpenAI LLM provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> LecternResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::OpenAI, config)
    }

    /// Create an Ollama LLM provider with a specific model.
    pub fn ollama_with_model(model: impl Into<String>) -> LecternResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::Ollama, config)
    }
}
