//! Bounded exponential backoff around a single generation call.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::json::{parse_model_json, recover_failed_generation};
use super::prompts;
use crate::error::{LecternError, LecternResult};
use crate::logging::{ErrorLog, LogEntry, TracingErrorLog};
use crate::traits::{GenerationOptions, Llm};

/// Backoff parameters for model calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of the base delay added as random jitter, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Delay before jitter: `min(base * 2^attempt, max)`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Delay for `attempt` given a uniform sample `unit` in `[0, 1]`.
    pub fn delay_with_jitter(&self, attempt: u32, unit: f64) -> Duration {
        let unit = unit.clamp(0.0, 1.0);
        self.base_delay(attempt)
            .mul_f64(1.0 + self.jitter.max(0.0) * unit)
    }

    /// Delay for `attempt` with freshly sampled jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let unit = rand::thread_rng().gen::<f64>();
        self.delay_with_jitter(attempt, unit)
    }

    /// Total calls made before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// One model call as recorded in the error log.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationAttempt<'a> {
    pub prompt: &'a str,
    pub attempt: u32,
}

impl GenerationAttempt<'_> {
    fn context(&self, outcome: &str) -> Value {
        json!({
            "prompt": self.prompt,
            "attempt": self.attempt,
            "outcome": outcome,
        })
    }
}

/// Runs a prompt against the model until it yields JSON, backing off
/// between failures.
pub struct RetryController {
    llm: Arc<dyn Llm>,
    policy: RetryPolicy,
    error_log: Arc<dyn ErrorLog>,
    cancel: CancellationToken,
}

impl RetryController {
    pub fn new(llm: Arc<dyn Llm>, policy: RetryPolicy) -> Self {
        Self {
            llm,
            policy,
            error_log: Arc::new(TracingErrorLog),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_error_log(mut self, error_log: Arc<dyn ErrorLog>) -> Self {
        self.error_log = error_log;
        self
    }

    /// Abort in-flight calls and pending sleeps when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `prompt` and return the parsed JSON output.
    ///
    /// After the last retry fails, a `failed_generation` fragment attached to
    /// the error is salvaged if it parses; otherwise the call fails with
    /// [`LecternError::GenerationFailed`].
    pub async fn invoke(&self, prompt: &str) -> LecternResult<Value> {
        let messages = prompts::messages_for(prompt);
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(LecternError::Cancelled);
            }

            let record = GenerationAttempt { prompt, attempt };
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(LecternError::Cancelled),
                result = self.call(&messages) => result,
            };

            let err = match result {
                Ok(value) => {
                    self.error_log
                        .record(LogEntry::event(record.context("success")))
                        .await;
                    debug!(attempt, "Generation attempt succeeded");
                    return Ok(value);
                }
                Err(err) => err,
            };

            self.error_log
                .record(LogEntry::error(&err, record.context("failure")))
                .await;

            let attempts = attempt + 1;
            if attempts >= self.policy.max_attempts() {
                return self.give_up(err, attempts);
            }

            let delay = self.policy.delay(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Generation attempt failed, retrying"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(LecternError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn call(&self, messages: &[crate::types::Message]) -> LecternResult<Value> {
        let response = self
            .llm
            .generate(messages, Some(GenerationOptions::json()))
            .await?;
        match response.content.as_deref() {
            Some(content) if !content.trim().is_empty() => parse_model_json(content),
            _ => Err(LecternError::llm("No content generated")),
        }
    }

    fn give_up(&self, err: LecternError, attempts: u32) -> LecternResult<Value> {
        let Some(fragment) = err.failed_generation() else {
            return Err(LecternError::generation_failed(err.to_string(), attempts));
        };

        match recover_failed_generation(fragment) {
            Ok(value) => {
                info!(attempts, "Recovered output from failed generation");
                Ok(value)
            }
            Err(parse_err) => Err(LecternError::generation_failed(
                format!("{}; {}", err, parse_err),
                attempts,
            )),
        }
    }
}
