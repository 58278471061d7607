//! OpenAI-compatible chat-completions provider (Groq, OpenAI, Ollama).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use lectern_core::config::{LlmProvider, LlmProviderConfig};
use lectern_core::error::{ErrorCode, LecternError, LecternResult};
use lectern_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage};
use lectern_core::types::Message;

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct OpenAiCompatibleLlm {
    client: Client,
    provider: LlmProvider,
    config: LlmConfig,
    base_url: String,
    api_key: Option<SecretString>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatBody>,
}

#[derive(Debug, Serialize)]
struct ResponseFormatBody {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    /// Groq attaches the partial output when JSON mode validation fails.
    #[serde(default)]
    failed_generation: Option<String>,
}

impl OpenAiCompatibleLlm {
    /// Create a client for `provider`.
    ///
    /// The API key comes from the config or the provider's environment
    /// variable; Ollama needs none.
    pub fn new(provider: LlmProvider, config: LlmConfig) -> LecternResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| provider.api_key_env().and_then(|var| std::env::var(var).ok()))
            .map(SecretString::new);

        if api_key.is_none() {
            if let Some(var) = provider.api_key_env() {
                return Err(LecternError::Configuration(format!(
                    "{} API key not found. Set {} environment variable or provide api_key in config.",
                    provider, var
                )));
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LecternError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        let mut config = config;
        if config.model.is_empty() {
            config.model = provider.default_model().to_string();
        }

        Ok(Self {
            client,
            provider,
            config,
            base_url,
            api_key,
        })
    }

    /// Create a client from a provider section of the configuration.
    pub fn from_provider_config(config: &LlmProviderConfig) -> LecternResult<Self> {
        Self::new(config.provider, config.config.clone())
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Map a non-success response onto the error taxonomy.
pub(crate) fn error_from_response(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> LecternError {
    let detail = serde_json::from_str::<ApiError>(body).ok().map(|e| e.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .unwrap_or_else(|| body.to_string());

    if let Some(fragment) = detail.and_then(|d| d.failed_generation) {
        return LecternError::llm_with_failed_generation(
            format!("HTTP {}: {}", status.as_u16(), message),
            fragment,
        );
    }

    match LecternError::from_http_status(status.as_u16(), &message) {
        LecternError::RateLimit { message, code, .. } => LecternError::RateLimit {
            message,
            code,
            retry_after,
        },
        other => other,
    }
}

#[async_trait]
impl Llm for OpenAiCompatibleLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> LecternResult<LlmResponse> {
        let options = options.unwrap_or_default();
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: options.temperature.unwrap_or(self.config.temperature),
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
            top_p: options.top_p,
            response_format: match options.response_format {
                Some(ResponseFormat::JsonObject) => Some(ResponseFormatBody {
                    format_type: "json_object",
                }),
                _ => None,
            },
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        debug!(provider = %self.provider, model = %self.config.model, "Sending chat completion");
        let response = builder.send().await.map_err(|e| {
            let code = if e.is_timeout() {
                ErrorCode::NetTimeout
            } else {
                ErrorCode::NetConnectionFailed
            };
            LecternError::Network {
                message: format!("{} request failed: {}", self.provider, e),
                code,
                source: Some(Box::new(e)),
            }
        })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let body = response
            .text()
            .await
            .map_err(|e| LecternError::llm(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(error_from_response(status, retry_after, &body));
        }

        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LecternError::llm(format!("Failed to parse response: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_generation_is_surfaced() {
        let body = json!({
            "error": {
                "message": "Failed to generate JSON. Please adjust your prompt.",
                "type": "invalid_request_error",
                "code": "json_validate_failed",
                "failed_generation": "{\"front\": \"ATP\", \"back\": \"Energy\"}"
            }
        })
        .to_string();

        let err = error_from_response(StatusCode::BAD_REQUEST, None, &body);
        assert_eq!(
            err.failed_generation(),
            Some("{\"front\": \"ATP\", \"back\": \"Energy\"}")
        );
        assert!(err.to_string().contains("Failed to generate JSON"));
    }

    #[test]
    fn test_status_mapping() {
        let body = json!({"error": {"message": "Invalid API Key"}}).to_string();
        let err = error_from_response(StatusCode::UNAUTHORIZED, None, &body);
        assert!(matches!(err, LecternError::Authentication { .. }));

        let err = error_from_response(StatusCode::TOO_MANY_REQUESTS, Some(7), "slow down");
        match err {
            LecternError::RateLimit { retry_after, message, .. } => {
                assert_eq!(retry_after, Some(7));
                assert_eq!(message, "slow down");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = error_from_response(StatusCode::BAD_GATEWAY, None, "<html>");
        assert_eq!(err.code(), ErrorCode::LlmConnectionFailed);
    }

    #[test]
    fn test_request_shape() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let request = ChatRequest {
            model: "llama-3.1-70b-versatile",
            messages: &messages,
            temperature: 0.2,
            max_tokens: 4096,
            top_p: None,
            response_format: Some(ResponseFormatBody {
                format_type: "json_object",
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"], json!({"type": "json_object"}));
        assert_eq!(value["messages"][0], json!({"role": "system", "content": "sys"}));
        assert!(value.get("top_p").is_none());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = LlmConfig {
            api_key: None,
            ..Default::default()
        };
        let llm = OpenAiCompatibleLlm::new(LlmProvider::Ollama, config).unwrap();
        assert_eq!(llm.model_name(), "llama3.1");
        assert_eq!(llm.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_explicit_key_and_base_url() {
        let config = LlmConfig {
            api_key: Some("gsk-test".into()),
            base_url: Some("http://127.0.0.1:9999/v1/".into()),
            model: "mixtral".into(),
            ..Default::default()
        };
        let llm = OpenAiCompatibleLlm::new(LlmProvider::Groq, config).unwrap();
        assert_eq!(llm.base_url(), "http://127.0.0.1:9999/v1");
        assert_eq!(llm.model_name(), "mixtral");
    }
}
