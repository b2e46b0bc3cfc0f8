//! Google Gemini `generateContent` client and the model-candidate fallback
//! provider built on it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parser::parse_json_response;
use super::types::{AiProvider, LlmClient, Prompt, ProviderAttempt, ProviderKind};
use super::ProviderError;
use crate::config::{GeminiConfig, Secret};
use crate::pipeline::fallback::{run_ordered, FallbackError};

/// Fixed model candidates, most preferred first. An operator override is
/// tried before all of these.
pub const GEMINI_MODEL_CANDIDATES: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.0-flash-lite",
    "gemini-2.5-flash-lite",
    "gemini-pro",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-1.5-flash-002",
    "gemini-1.5-pro-002",
];

/// Ordered candidate list: override (if non-blank) then the fixed list.
pub fn model_candidates(override_model: Option<&str>) -> Vec<String> {
    let mut models = Vec::with_capacity(GEMINI_MODEL_CANDIDATES.len() + 1);
    if let Some(model) = override_model.map(str::trim).filter(|m| !m.is_empty()) {
        models.push(model.to_string());
    }
    for model in GEMINI_MODEL_CANDIDATES {
        if !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }
    models
}

// ──────────────────────────────────────────────
// HTTP client
// ──────────────────────────────────────────────

pub struct GeminiClient {
    base_url: String,
    api_key: Option<Secret>,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: Option<Secret>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(&config.base_url, config.api_key.clone())
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [GeminiContentOut<'a>; 1],
}

#[derive(Serialize)]
struct GeminiContentOut<'a> {
    role: &'static str,
    parts: [GeminiPartOut<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPartOut<'a> {
    text: &'a str,
}

/// Response body from `models/{model}:generateContent`.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiPart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::MissingApiKey {
            provider: ProviderKind::Gemini,
            env_var: "GEMINI_API_KEY",
        })?;

        let text = prompt.flattened();
        let body = GenerateContentRequest {
            contents: [GeminiContentOut {
                role: "user",
                parts: [GeminiPartOut { text: &text }],
            }],
        };
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::Connection(self.base_url.clone())
                } else {
                    ProviderError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 => ProviderError::ModelNotFound {
                    model: model.to_string(),
                    body,
                },
                429 => ProviderError::RateLimited { status: 429, body },
                code => ProviderError::Api { status: code, body },
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;

        Ok(parsed.text())
    }
}

// ──────────────────────────────────────────────
// Model-fallback provider
// ──────────────────────────────────────────────

/// Walks the model candidates until one returns parseable JSON.
///
/// "Model not found" and quota/rate-limit errors move on to the next
/// candidate. Anything else ends the call without trying the rest.
pub struct GeminiProvider {
    client: Arc<dyn LlmClient>,
    candidates: Vec<String>,
}

impl GeminiProvider {
    pub fn new(client: Arc<dyn LlmClient>, candidates: Vec<String>) -> Self {
        Self { client, candidates }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(
            Arc::new(GeminiClient::from_config(config)),
            model_candidates(config.model_override.as_deref()),
        )
    }
}

fn advances_to_next_model(e: &ProviderError) -> bool {
    e.is_model_not_found() || e.is_quota()
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate_json(&self, prompt: &Prompt) -> Result<Value, ProviderError> {
        let client = &self.client;
        let outcome = run_ordered(
            self.candidates.iter(),
            move |index, model| async move {
                let attempt = ProviderAttempt::new(ProviderKind::Gemini, model, index);
                tracing::debug!(
                    provider = %attempt.provider,
                    model = attempt.model,
                    attempt = attempt.attempt + 1,
                    "Gemini generation attempt"
                );
                let raw = client.generate(model, prompt).await?;
                parse_json_response(&raw)
            },
            |e: &ProviderError| {
                let advance = advances_to_next_model(e);
                if advance {
                    tracing::warn!(error = %e, "Gemini model unavailable, trying next candidate");
                }
                advance
            },
        )
        .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(FallbackError::Fatal { index, error }) => {
                tracing::error!(
                    model = self.candidates.get(index).map(String::as_str).unwrap_or_default(),
                    error = %error,
                    "Gemini generation failed"
                );
                Err(error)
            }
            Err(exhausted) => {
                let attempts = exhausted.attempts();
                let errors = exhausted
                    .summary()
                    .unwrap_or_else(|| "no model candidates configured".to_string());
                tracing::error!(attempts, %errors, "Gemini exhausted all model candidates");
                Err(ProviderError::Exhausted {
                    provider: ProviderKind::Gemini,
                    attempts,
                    errors,
                })
            }
        }
    }
}
