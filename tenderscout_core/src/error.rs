// src/error.rs
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("credential not configured: {0}")]
    MissingCredential(&'static str),

    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    UpstreamStatus(StatusCode),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AdapterError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AdapterError::MissingCredential(_) => "missing_credential",
            AdapterError::HttpRequest(_) => "upstream_error",
            AdapterError::UpstreamStatus(_) => "upstream_error",
            AdapterError::SerdeJson(_) => "parse_error",
            AdapterError::MalformedPayload(_) => "parse_error",
            AdapterError::Timeout(_) => "timeout",
            AdapterError::InvalidInput(_) => "invalid_input",
            AdapterError::Internal(_) => "internal_error",
        }
    }

    /// Whether this failure means the source could not be attempted at all
    /// (configuration absence) as opposed to an attempted call that failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AdapterError::MissingCredential(_))
    }
}
