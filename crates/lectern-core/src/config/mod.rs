//! Configuration system for lectern.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::chunking::DEFAULT_CHUNK_TOKENS;
use crate::error::{LecternError, LecternResult};
use crate::generation::RetryPolicy;
use crate::traits::LlmConfig;

/// Default per-file upload limit (10 MiB).
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// LLM provider type. All speak the OpenAI chat-completions protocol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmProvider {
    #[default]
    Groq,
    OpenAI,
    Ollama,
}

impl LlmProvider {
    /// API root used when no `base_url` is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Groq => "llama-3.1-70b-versatile",
            Self::OpenAI => "gpt-4o-mini",
            Self::Ollama => "llama3.1",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Groq => Some("GROQ_API_KEY"),
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Ollama => None,
        }
    }
}

/// Provider configuration with type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl LlmProviderConfig {
    /// Configured model, or the provider default.
    pub fn model(&self) -> &str {
        if self.config.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.config.model
        }
    }

    /// Configured base URL, or the provider default.
    pub fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Token budget per chunk.
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_CHUNK_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Chunks processed at once.
    pub concurrency: usize,
    /// Wall-clock limit for one batch; unfinished chunks are skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            deadline_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_file_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Main lectern configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LecternConfig {
    pub llm: LlmProviderConfig,
    pub chunking: ChunkingConfig,
    pub retry: RetryPolicy,
    pub generation: GenerationConfig,
    pub ingest: IngestConfig,
    /// File that receives the JSON error log. Unset logs via tracing only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_log_path: Option<PathBuf>,
}

impl LecternConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> LecternResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| LecternError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| LecternError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| LecternError::Configuration(e.to_string()))?,
            _ => {
                return Err(LecternError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> LecternResult<Self> {
        Self::default().with_env()
    }

    /// Overlay `LECTERN_*` environment variables onto this configuration.
    pub fn with_env(self) -> LecternResult<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> LecternResult<Self> {
        if let Some(provider) = var("LECTERN_LLM_PROVIDER") {
            self.llm.provider = LlmProvider::from_str(&provider).map_err(|_| {
                LecternError::Configuration(format!("Unknown LLM provider: {}", provider))
            })?;
        }
        if let Some(model) = var("LECTERN_LLM_MODEL") {
            self.llm.config.model = model;
        }
        if let Some(url) = var("LECTERN_LLM_BASE_URL") {
            self.llm.config.base_url = Some(url);
        }

        let provider_key = self.llm.provider.api_key_env().and_then(&var);
        if let Some(api_key) = var("LECTERN_API_KEY").or(provider_key) {
            self.llm.config.api_key = Some(api_key);
        }

        if let Some(value) = var("LECTERN_CHUNK_TOKENS") {
            self.chunking.max_tokens = parse_var("LECTERN_CHUNK_TOKENS", &value)?;
        }
        if let Some(value) = var("LECTERN_MAX_RETRIES") {
            self.retry.max_retries = parse_var("LECTERN_MAX_RETRIES", &value)?;
        }
        if let Some(value) = var("LECTERN_CONCURRENCY") {
            self.generation.concurrency = parse_var("LECTERN_CONCURRENCY", &value)?;
        }
        if let Some(value) = var("LECTERN_DEADLINE_SECS") {
            self.generation.deadline_secs = Some(parse_var("LECTERN_DEADLINE_SECS", &value)?);
        }
        if let Some(path) = var("LECTERN_ERROR_LOG") {
            self.error_log_path = Some(PathBuf::from(path));
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> LecternResult<()> {
        if self.chunking.max_tokens == 0 {
            return Err(LecternError::Configuration(
                "chunking.max_tokens must be greater than zero".to_string(),
            ));
        }
        if self.generation.concurrency == 0 {
            return Err(LecternError::Configuration(
                "generation.concurrency must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(LecternError::Configuration(format!(
                "retry.jitter must be within [0, 1], got {}",
                self.retry.jitter
            )));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(LecternError::Configuration(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> LecternConfigBuilder {
        LecternConfigBuilder::default()
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> LecternResult<T> {
    value.trim().parse().map_err(|_| {
        LecternError::Configuration(format!("Invalid value for {}: {:?}", name, value))
    })
}

/// Builder for LecternConfig.
#[derive(Default)]
pub struct LecternConfigBuilder {
    config: LecternConfig,
}

impl LecternConfigBuilder {
    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    pub fn provider(mut self, provider: LlmProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.config.model = model.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.llm.config.api_key = Some(api_key.into());
        self
    }

    /// Set the chunk token budget.
    pub fn chunk_tokens(mut self, max_tokens: usize) -> Self {
        self.config.chunking.max_tokens = max_tokens;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.generation.concurrency = concurrency;
        self
    }

    pub fn deadline_secs(mut self, secs: u64) -> Self {
        self.config.generation.deadline_secs = Some(secs);
        self
    }

    pub fn max_file_bytes(mut self, bytes: usize) -> Self {
        self.config.ingest.max_file_bytes = bytes;
        self
    }

    pub fn error_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.error_log_path = Some(path.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> LecternResult<LecternConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LecternConfig::default();
        assert_eq!(config.llm.provider, LlmProvider::Groq);
        assert_eq!(config.llm.model(), "llama-3.1-70b-versatile");
        assert_eq!(config.llm.base_url(), "https://api.groq.com/openai/v1");
        assert_eq!(config.chunking.max_tokens, 1800);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.generation.concurrency, 1);
        assert_eq!(config.ingest.max_file_bytes, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
error_log_path = "logs/error.log"

[llm]
provider = "ollama"
model = "mistral"

[chunking]
max_tokens = 900

[retry]
max_retries = 5
"#
        )
        .unwrap();

        let config = LecternConfig::from_file(file.path()).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.model(), "mistral");
        assert_eq!(config.llm.base_url(), "http://localhost:11434/v1");
        assert_eq!(config.chunking.max_tokens, 900);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.error_log_path, Some(PathBuf::from("logs/error.log")));
    }

    #[test]
    fn test_from_yaml_and_json_files() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "generation:\n  concurrency: 3\n  deadline_secs: 60").unwrap();
        let config = LecternConfig::from_file(yaml.path()).unwrap();
        assert_eq!(config.generation.concurrency, 3);
        assert_eq!(config.generation.deadline_secs, Some(60));

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(json, r#"{{"llm": {{"provider": "openai"}}}}"#).unwrap();
        let config = LecternConfig::from_file(json.path()).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::OpenAI);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = LecternConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, LecternError::Configuration(_)));
    }

    #[test]
    fn test_env_overlay() {
        let config = LecternConfig::default()
            .with_vars(vars(&[
                ("LECTERN_LLM_PROVIDER", "OpenAI"),
                ("OPENAI_API_KEY", "sk-test"),
                ("GROQ_API_KEY", "gsk-ignored"),
                ("LECTERN_CHUNK_TOKENS", "1200"),
                ("LECTERN_CONCURRENCY", "2"),
                ("LECTERN_ERROR_LOG", "error.log"),
            ]))
            .unwrap();

        assert_eq!(config.llm.provider, LlmProvider::OpenAI);
        assert_eq!(config.llm.config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.chunking.max_tokens, 1200);
        assert_eq!(config.generation.concurrency, 2);
        assert_eq!(config.error_log_path, Some(PathBuf::from("error.log")));
    }

    #[test]
    fn test_explicit_key_wins_over_provider_key() {
        let config = LecternConfig::default()
            .with_vars(vars(&[("LECTERN_API_KEY", "explicit"), ("GROQ_API_KEY", "gsk")]))
            .unwrap();
        assert_eq!(config.llm.config.api_key.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let err = LecternConfig::default()
            .with_vars(vars(&[("LECTERN_MAX_RETRIES", "three")]))
            .unwrap_err();
        assert!(err.to_string().contains("LECTERN_MAX_RETRIES"));

        assert!(LecternConfig::default()
            .with_vars(vars(&[("LECTERN_LLM_PROVIDER", "anthropic")]))
            .is_err());
    }

    #[test]
    fn test_validate() {
        assert!(LecternConfig::builder().chunk_tokens(0).build().is_err());
        assert!(LecternConfig::builder().concurrency(0).build().is_err());
        assert!(LecternConfig::builder()
            .retry(RetryPolicy {
                jitter: 1.5,
                ..Default::default()
            })
            .build()
            .is_err());
        assert!(LecternConfig::builder()
            .retry(RetryPolicy {
                base_delay_ms: 20_000,
                ..Default::default()
            })
            .build()
            .is_err());

        let config = LecternConfig::builder()
            .provider(LlmProvider::Ollama)
            .model("llama3.1")
            .chunk_tokens(500)
            .build()
            .unwrap();
        assert_eq!(config.chunking.max_tokens, 500);
    }
}
