//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Propagation
//!
//! - **File errors** (`NotFound`, `NotAFile`, `BinaryFile`): recorded as notes by
//!   the engine, never abort exploration
//! - **Resolution errors** (`RetryLimitExceeded`, `NoAlternativeFound`): also
//!   recoverable; they feed the failed-attempt counters
//! - **LLM errors**: recoverable in every phase except synthesis, where they are
//!   wrapped in `Synthesis` and returned to the caller

use thiserror::Error;

// =============================================================================
// LLM Error
// =============================================================================

/// What went wrong talking to the model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Transport failure, non-success status, or undecodable body
    RequestFailed,
    /// Model reported completion but produced no text
    EmptyResponse,
    /// Model interface reports the output was not finished
    IncompleteResponse,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed => write!(f, "REQUEST_FAILED"),
            Self::EmptyResponse => write!(f, "EMPTY_RESPONSE"),
            Self::IncompleteResponse => write!(f, "INCOMPLETE_RESPONSE"),
        }
    }
}

/// LLM error with kind, provider context, and a transient hint
#[derive(Debug, Clone)]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    pub provider: Option<String>,
    /// Connection failures, timeouts, 429 and 5xx. Only the streaming restart
    /// policy looks at this; the client itself never retries.
    pub transient: bool,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.kind, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
            transient: false,
        }
    }

    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RequestFailed, message)
    }

    pub fn empty_response(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::EmptyResponse, message)
    }

    pub fn incomplete_response(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::IncompleteResponse, message)
    }

    /// Add provider context
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Mark as transient
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Classify an HTTP status returned by a backend
    pub fn from_http_status(status: u16, body: &str, provider: &str) -> Self {
        let err = Self::request_failed(format!("HTTP {}: {}", status, body)).provider(provider);
        match status {
            429 | 500 | 502 | 503 | 504 => err.transient(),
            _ => err,
        }
    }

    /// Classify a reqwest transport error
    pub fn from_transport(err: &reqwest::Error, provider: &str) -> Self {
        let transient = err.is_connect() || err.is_timeout();
        let mut llm = Self::request_failed(err.to_string()).provider(provider);
        llm.transient = transient;
        llm
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum AskError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // File Reading
    // -------------------------------------------------------------------------
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("'{path}' is a directory, not a file")]
    NotAFile { path: String },

    #[error("'{path}' looks like a binary file")]
    BinaryFile { path: String },

    // -------------------------------------------------------------------------
    // File Resolution
    // -------------------------------------------------------------------------
    #[error("'{path}' has exceeded the maximum retry attempts ({attempts})")]
    RetryLimitExceeded { path: String, attempts: u32 },

    #[error("'{path}' not found and no suitable alternative available")]
    NoAlternativeFound { path: String },

    // -------------------------------------------------------------------------
    // LLM
    // -------------------------------------------------------------------------
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// The only phase failure surfaced to callers
    #[error("failed to generate final answer: {0}")]
    Synthesis(LlmError),

    // -------------------------------------------------------------------------
    // Request Lifecycle
    // -------------------------------------------------------------------------
    #[error("analysis cancelled: client disconnected")]
    Cancelled,

    #[error("upload error: {0}")]
    Upload(String),
}

impl From<LlmError> for AskError {
    fn from(err: LlmError) -> Self {
        AskError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, AskError>;

impl AskError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Whether restarting the whole analysis might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Llm(e) | Self::Synthesis(e) => e.transient,
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
