//! Error types for lectern operations.
//!
//! Extraction errors surface to the caller immediately. Generation and
//! validation errors are chunk-level: the orchestrator logs and skips them,
//! and only [`LecternError::NoValidContentGenerated`] escapes a batch.

use thiserror::Error;

use crate::types::ValidationIssue;

/// Result type alias for lectern operations.
pub type LecternResult<T> = Result<T, LecternError>;

/// Main error type for all lectern operations.
#[derive(Error, Debug)]
pub enum LecternError {
    /// Declared file type is not one we can extract.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The extraction backend failed on the document.
    #[error("Extraction failed: {message}")]
    ExtractionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Model call failed after exhausting retries with nothing recoverable.
    #[error("Generation failed after {attempts} attempt(s): {message}")]
    GenerationFailed { message: String, attempts: u32 },

    /// Model output did not pass structural validation.
    #[error("Validation rejected: {message}")]
    ValidationRejected {
        message: String,
        issues: Vec<ValidationIssue>,
    },

    /// Every chunk of a batch failed.
    #[error("No valid content generated from {chunks} chunk(s)")]
    NoValidContentGenerated { chunks: usize },

    /// A single model call failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        /// Partial output the provider attached to its error response.
        failed_generation: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication with the model provider failed.
    #[error("Authentication error: {message}")]
    Authentication { message: String, code: ErrorCode },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        code: ErrorCode,
        retry_after: Option<u64>,
    },

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// Work was abandoned because the batch was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Extraction (EXT_xxx)
    ExtUnsupportedFormat,
    ExtFailed,

    // Generation (GEN_xxx)
    GenFailed,
    GenNoValidContent,
    GenCancelled,

    // Validation (VAL_xxx)
    ValRejected,

    // Authentication (AUTH_xxx)
    AuthInvalidKey,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,

    // Configuration
    Configuration,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ExtUnsupportedFormat => "EXT_001",
            ErrorCode::ExtFailed => "EXT_002",
            ErrorCode::GenFailed => "GEN_001",
            ErrorCode::GenNoValidContent => "GEN_002",
            ErrorCode::GenCancelled => "GEN_003",
            ErrorCode::ValRejected => "VAL_001",
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::Configuration => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl LecternError {
    /// Create an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            failed_generation: None,
            source: None,
        }
    }

    /// Create an LLM error carrying the provider's partial output.
    pub fn llm_with_failed_generation(
        message: impl Into<String>,
        failed_generation: impl Into<String>,
    ) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmInvalidResponse,
            failed_generation: Some(failed_generation.into()),
            source: None,
        }
    }

    /// Create a generation failure after `attempts` calls.
    pub fn generation_failed(message: impl Into<String>, attempts: u32) -> Self {
        Self::GenerationFailed {
            message: message.into(),
            attempts,
        }
    }

    /// Create a validation rejection.
    pub fn validation_rejected(issues: Vec<ValidationIssue>) -> Self {
        let message = match issues.as_slice() {
            [] => "output failed validation".to_string(),
            [only] => only.to_string(),
            [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
        };
        Self::ValidationRejected { message, issues }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Partial generation payload attached to this error, if any.
    pub fn failed_generation(&self) -> Option<&str> {
        match self {
            Self::Llm {
                failed_generation, ..
            } => failed_generation.as_deref(),
            _ => None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedFormat(_) => ErrorCode::ExtUnsupportedFormat,
            Self::ExtractionFailed { .. } => ErrorCode::ExtFailed,
            Self::GenerationFailed { .. } => ErrorCode::GenFailed,
            Self::ValidationRejected { .. } => ErrorCode::ValRejected,
            Self::NoValidContentGenerated { .. } => ErrorCode::GenNoValidContent,
            Self::Cancelled => ErrorCode::GenCancelled,
            Self::Llm { code, .. } => *code,
            Self::Authentication { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::Configuration,
            _ => ErrorCode::Internal,
        }
    }

    /// Short variant name, used when formatting errors for the error log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::ExtractionFailed { .. } => "ExtractionFailed",
            Self::GenerationFailed { .. } => "GenerationFailed",
            Self::ValidationRejected { .. } => "ValidationRejected",
            Self::NoValidContentGenerated { .. } => "NoValidContentGenerated",
            Self::Llm { .. } => "LlmError",
            Self::Authentication { .. } => "AuthenticationError",
            Self::RateLimit { .. } => "RateLimitError",
            Self::Network { .. } => "NetworkError",
            Self::Configuration(_) => "ConfigurationError",
            Self::Parse { .. } => "ParseError",
            Self::Cancelled => "Cancelled",
            Self::Io(_) => "IoError",
            Self::Serialization(_) => "SerializationError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::UnsupportedFormat(_) => Some("Upload a PDF, DOCX, or TXT file"),
            Self::GenerationFailed { .. } => Some("Check the error log for the failed attempts"),
            Self::ValidationRejected { .. } => {
                Some("Run the batch again; the model returned malformed items")
            }
            Self::Authentication { .. } => Some("Please check your model provider API key"),
            Self::RateLimit { .. } => Some("Please wait before making more requests"),
            Self::NoValidContentGenerated { .. } => {
                Some("Try again, or split the document into smaller files")
            }
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            _ => None,
        }
    }

    /// Convert from an HTTP status code returned by a model provider.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Authentication {
                message: body.to_string(),
                code: ErrorCode::AuthInvalidKey,
            },
            408 | 504 => Self::Network {
                message: body.to_string(),
                code: ErrorCode::NetTimeout,
                source: None,
            },
            429 => Self::RateLimit {
                message: body.to_string(),
                code: ErrorCode::RateLimitExceeded,
                retry_after: None,
            },
            400..=499 => Self::Llm {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::LlmInvalidResponse,
                failed_generation: None,
                source: None,
            },
            _ => Self::Llm {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::LlmConnectionFailed,
                failed_generation: None,
                source: None,
            },
        }
    }
}

#[cfg(feature = "documents")]
impl From<lectern_extractors::ExtractError> for LecternError {
    fn from(err: lectern_extractors::ExtractError) -> Self {
        match err {
            lectern_extractors::ExtractError::UnsupportedFormat(format) => {
                Self::UnsupportedFormat(format)
            }
            other => Self::ExtractionFailed {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}
