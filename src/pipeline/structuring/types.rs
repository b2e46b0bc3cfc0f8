use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ProviderError;

/// Outcome of one report analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub summary: String,
    pub parameters: Vec<Parameter>,
    pub issues: Vec<String>,
}

/// A single measured value pulled from a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub status: ParameterStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterStatus {
    Normal,
    High,
    Low,
    #[default]
    Unknown,
}

impl ParameterStatus {
    /// Case-insensitive exact match; anything else, including padded
    /// values, is `Unknown`.
    pub fn coerce(raw: Option<&str>) -> Self {
        match raw.map(str::to_lowercase).as_deref() {
            Some("normal") => Self::Normal,
            Some("high") => Self::High,
            Some("low") => Self::Low,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ParameterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one symptom triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageResult {
    pub condition: String,
    pub urgency: Urgency,
    pub explanation: String,
    pub recommendations: Vec<String>,
    pub red_flags: Vec<String>,
    /// Diagnostic message, only set on the safe-default result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

impl Urgency {
    /// Case-insensitive exact match; anything else is `Medium`.
    pub fn coerce(raw: Option<&str>) -> Self {
        match raw.map(str::to_lowercase).as_deref() {
            Some("low") => Self::Low,
            Some("high") => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown provider '{0}' (expected 'openai' or 'gemini')")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Instructions for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn user(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
        }
    }

    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
        }
    }

    /// System and user text as a single block, for APIs without roles.
    pub fn flattened(&self) -> String {
        match &self.system {
            Some(system) => format!("{system}\n{}", self.user),
            None => self.user.clone(),
        }
    }
}

/// One try of one model on one provider. Lives only for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub struct ProviderAttempt<'a> {
    pub provider: ProviderKind,
    pub model: &'a str,
    /// Zero-based.
    pub attempt: usize,
}

impl<'a> ProviderAttempt<'a> {
    pub fn new(provider: ProviderKind, model: &'a str, attempt: usize) -> Self {
        Self {
            provider,
            model,
            attempt,
        }
    }
}

/// HTTP transport to a text-generation API (allows mocking).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one generation request and return the raw completion text.
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError>;
}

/// A provider strategy: generation plus its retry/fallback policy, returning
/// repaired JSON.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn generate_json(&self, prompt: &Prompt) -> Result<serde_json::Value, ProviderError>;
}
