pub mod types;
pub mod prompt;
pub mod parser;
pub mod normalize;
pub mod gemini;
pub mod openai;

#[cfg(test)]
pub(crate) mod mock;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use normalize::*;
pub use gemini::*;
pub use openai::*;

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static RATE_LIMIT_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b429\b|rate.?limit").expect("static regex"));
static QUOTA_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)quota|exceeded|insufficient").expect("static regex"));
static NOT_FOUND_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b404\b|not found").expect("static regex"));

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} API key is not configured (set {env_var})")]
    MissingApiKey {
        provider: ProviderKind,
        env_var: &'static str,
    },

    #[error("Could not reach {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model {model} not found: {body}")]
    ModelNotFound { model: String, body: String },

    #[error("Rate limited (status {status}): {body}")]
    RateLimited { status: u16, body: String },

    #[error("Provider returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("{provider} exhausted after {attempts} attempt(s): {errors}")]
    Exhausted {
        provider: ProviderKind,
        attempts: usize,
        /// Attempt errors, numbered and joined.
        errors: String,
    },
}

impl ProviderError {
    /// Free text returned by the remote side, where classification by
    /// message is meaningful.
    fn remote_detail(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(body),
            Self::HttpClient(msg) => Some(msg),
            Self::Exhausted { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// HTTP 429 or an error message that talks about rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status: 429, .. } => true,
            Self::Exhausted { .. } => false,
            other => other
                .remote_detail()
                .is_some_and(|d| RATE_LIMIT_TEXT.is_match(d)),
        }
    }

    /// Rate limits plus quota and billing exhaustion.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Api { status: 429, .. })
            || self
                .remote_detail()
                .is_some_and(|d| RATE_LIMIT_TEXT.is_match(d) || QUOTA_TEXT.is_match(d))
    }

    /// The requested model does not exist for this API key or version.
    pub fn is_model_not_found(&self) -> bool {
        match self {
            Self::ModelNotFound { .. } => true,
            Self::Api { status: 404, .. } => true,
            Self::Exhausted { .. } => false,
            other => other
                .remote_detail()
                .is_some_and(|d| NOT_FOUND_TEXT.is_match(d)),
        }
    }

    /// Missing credentials. Never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingApiKey { .. })
    }
}
