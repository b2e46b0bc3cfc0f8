//! Process configuration.
//!
//! Values are read once into an [`AnalyzerConfig`] and handed to each
//! orchestrator at construction. Nothing below the orchestrators reads the
//! environment.

use std::fmt;

use thiserror::Error;

use crate::pipeline::structuring::{ProviderKind, UnknownProvider, DEFAULT_OPENAI_MODEL};

/// Application-level constants
pub const APP_NAME: &str = "medscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const OCR_SPACE_ENDPOINT: &str = "https://api.ocr.space/parse/image";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Largest document accepted for analysis (15 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medscan=info,medscan_lib=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ANALYZER_PROVIDER: {0}")]
    Provider(#[from] UnknownProvider),

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// API credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub api_key: Option<Secret>,
    pub endpoint: String,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: OCR_SPACE_ENDPOINT.to_string(),
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<Secret>,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<Secret>,
    /// Tried before the built-in candidate list.
    pub model_override: Option<String>,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_override: None,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }
}

/// Everything the analysis pipeline needs from the operator.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub ocr: OcrConfig,
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
    /// Explicit report provider. `None` selects by available credentials.
    pub provider: Option<ProviderKind>,
    /// Return OCR text with a placeholder summary when the AI stage fails.
    pub fallback_ocr_only: bool,
    pub max_upload_bytes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            provider: None,
            fallback_ocr_only: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AnalyzerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        config.ocr.api_key = get("OCR_SPACE_API_KEY").map(Secret::new);
        if let Some(endpoint) = get("OCR_SPACE_ENDPOINT") {
            config.ocr.endpoint = endpoint;
        }

        config.openai.api_key = get("OPENAI_API_KEY").map(Secret::new);
        if let Some(model) = get("OPENAI_MODEL") {
            config.openai.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            config.openai.base_url = url;
        }

        config.gemini.api_key = get("GEMINI_API_KEY").map(Secret::new);
        config.gemini.model_override = get("GEMINI_MODEL");
        if let Some(url) = get("GEMINI_BASE_URL") {
            config.gemini.base_url = url;
        }

        config.provider = get("ANALYZER_PROVIDER")
            .map(|p| p.parse::<ProviderKind>())
            .transpose()?;
        config.fallback_ocr_only = get("FALLBACK_OCR_ONLY")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        if let Some(raw) = get("MEDSCAN_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidNumber {
                    name: "MEDSCAN_MAX_UPLOAD_BYTES",
                    value: raw,
                })?;
        }

        Ok(config)
    }

    /// Provider for report analysis.
    ///
    /// An explicit choice wins. Otherwise Gemini is used only when it is the
    /// sole provider with a credential; OpenAI is the default.
    pub fn report_provider(&self) -> ProviderKind {
        if let Some(kind) = self.provider {
            return kind;
        }
        if self.openai.api_key.is_none() && self.gemini.api_key.is_some() {
            ProviderKind::Gemini
        } else {
            ProviderKind::OpenAi
        }
    }
}
