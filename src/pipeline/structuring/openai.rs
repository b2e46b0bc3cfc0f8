//! OpenAI chat-completions client and the rate-limit retrying provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parser::parse_json_response;
use super::types::{AiProvider, LlmClient, Prompt, ProviderAttempt, ProviderKind};
use super::ProviderError;
use crate::config::{OpenAiConfig, Secret};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature for report analysis.
pub const OPENAI_TEMPERATURE: f32 = 0.2;

/// Retries after the first attempt, rate limits only.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 2;

pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Delay before retry number `attempt + 1`: 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt))
}

// ──────────────────────────────────────────────
// HTTP client
// ──────────────────────────────────────────────

pub struct OpenAiClient {
    base_url: String,
    api_key: Option<Secret>,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: Option<Secret>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self::new(&config.base_url, config.api_key.clone())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response body from `/v1/chat/completions`.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first choice, empty if absent.
    pub fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

fn chat_messages(prompt: &Prompt) -> Vec<ChatMessage<'_>> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &prompt.system {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &prompt.user,
    });
    messages
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::MissingApiKey {
            provider: ProviderKind::OpenAi,
            env_var: "OPENAI_API_KEY",
        })?;

        let body = ChatCompletionRequest {
            model,
            messages: chat_messages(prompt),
            temperature: OPENAI_TEMPERATURE,
        };
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose())
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
                429 => ProviderError::RateLimited { status: 429, body },
                404 => ProviderError::ModelNotFound {
                    model: model.to_string(),
                    body,
                },
                code => ProviderError::Api { status: code, body },
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;

        Ok(parsed.text())
    }
}

// ──────────────────────────────────────────────
// Retrying provider
// ──────────────────────────────────────────────

/// One fixed model with bounded exponential backoff on rate limits.
/// Every other error propagates on the first occurrence.
pub struct OpenAiProvider {
    client: Arc<dyn LlmClient>,
    model: String,
    max_retries: u32,
}

impl OpenAiProvider {
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_retries: MAX_RATE_LIMIT_RETRIES,
        }
    }

    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self::new(Arc::new(OpenAiClient::from_config(config)), &config.model)
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate_json(&self, prompt: &Prompt) -> Result<Value, ProviderError> {
        let mut retry: u32 = 0;
        let mut rate_limits: Vec<String> = Vec::new();
        loop {
            let attempt = ProviderAttempt::new(ProviderKind::OpenAi, &self.model, retry as usize);
            tracing::debug!(
                provider = %attempt.provider,
                model = attempt.model,
                attempt = attempt.attempt + 1,
                "OpenAI generation attempt"
            );

            match self.client.generate(&self.model, prompt).await {
                Ok(raw) => return parse_json_response(&raw),
                Err(e) if e.is_rate_limit() => {
                    rate_limits.push(format!("#{}: {e}", retry + 1));
                    if retry >= self.max_retries {
                        let errors = rate_limits.join("; ");
                        tracing::error!(attempts = retry + 1, %errors, "OpenAI rate limit retries exhausted");
                        return Err(ProviderError::Exhausted {
                            provider: ProviderKind::OpenAi,
                            attempts: retry as usize + 1,
                            errors,
                        });
                    }
                    let delay = backoff_delay(retry);
                    tracing::warn!(
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "OpenAI rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    tracing::error!(model = %self.model, error = %e, "OpenAI generation failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::mock::{rate_limited, server_error, ScriptedLlmClient};
    use crate::pipeline::http_stub::StubServer;

    fn provider(client: &Arc<ScriptedLlmClient>) -> OpenAiProvider {
        OpenAiProvider::new(client.clone(), DEFAULT_OPENAI_MODEL)
    }

    #[test]
    fn backoff_doubles_from_one_second() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_twice_on_429_then_succeeds() {
        let client = Arc::new(ScriptedLlmClient::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Ok(r#"{"summary": "third time"}"#.into()),
        ]));
        let started = tokio::time::Instant::now();
        let value = provider(&client)
            .generate_json(&Prompt::user("p"))
            .await
            .unwrap();

        assert_eq!(value["summary"], "third time");
        assert_eq!(client.calls(), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3), "waited {waited:?}");
        assert!(waited < Duration::from_millis(3100), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_detected_from_message_text() {
        let client = Arc::new(ScriptedLlmClient::new(vec![
            Err(ProviderError::HttpClient("Rate limit reached, retry later".into())),
            Ok(r#"{"ok": 1}"#.into()),
        ]));
        let value = provider(&client)
            .generate_json(&Prompt::user("p"))
            .await
            .unwrap();
        assert_eq!(value["ok"], 1);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_rate_limit_error_is_not_retried() {
        let client = Arc::new(ScriptedLlmClient::new(vec![
            Err(server_error()),
            Ok(r#"{"never": 1}"#.into()),
        ]));
        let started = tokio::time::Instant::now();
        let err = provider(&client)
            .generate_json(&Prompt::user("p"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Api { status: 500, .. }));
        assert_eq!(client.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_exhausts_after_three_calls() {
        let client = Arc::new(ScriptedLlmClient::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
            Ok(r#"{"never": 1}"#.into()),
        ]));
        let err = provider(&client)
            .generate_json(&Prompt::user("p"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::Exhausted {
                provider: ProviderKind::OpenAi,
                attempts: 3,
                ..
            }
        ));
        assert!(err.is_quota());
        assert_eq!(client.calls(), 3);
        let text = err.to_string();
        assert!(text.contains("#1: Rate limited"));
        assert!(text.contains("#3: Rate limited"));
    }

    #[tokio::test]
    async fn malformed_reply_is_not_retried() {
        let client = Arc::new(ScriptedLlmClient::replying("no json here"));
        let err = provider(&client)
            .generate_json(&Prompt::user("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn sends_configured_model() {
        let client = Arc::new(ScriptedLlmClient::replying("{}"));
        OpenAiProvider::new(client.clone(), "gpt-4.1")
            .generate_json(&Prompt::with_system("s", "u"))
            .await
            .unwrap();
        assert_eq!(client.models_called(), vec!["gpt-4.1"]);
        assert_eq!(client.last_prompt().unwrap().system.as_deref(), Some("s"));
    }

    #[test]
    fn chat_messages_put_system_first() {
        let prompt = Prompt::with_system("sys", "usr");
        let messages = chat_messages(&prompt);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "usr");
        assert_eq!(chat_messages(&Prompt::user("only")).len(), 1);
    }

    #[test]
    fn response_text_reads_first_choice() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"a\":1}"}, "finish_reason": "stop"}]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text(), r#"{"a":1}"#);

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(empty.text().is_empty());
    }

    #[test]
    fn request_serializes_temperature() {
        let prompt = Prompt::with_system("s", "u");
        let body = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: chat_messages(&prompt),
            temperature: OPENAI_TEMPERATURE,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[tokio::test]
    async fn client_sends_bearer_auth_and_chat_body() {
        let server = StubServer::start(vec![(
            200,
            r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"summary\": \"ok\"}"}}]}"#,
        )])
        .await;
        let client = OpenAiClient::new(server.base_url(), Some(Secret::new("sk-test")));

        let text = client
            .generate("gpt-4o-mini", &Prompt::with_system("sys", "usr"))
            .await
            .unwrap();
        assert_eq!(text, r#"{"summary": "ok"}"#);

        let request = &server.requests()[0];
        assert_eq!(request.request_line, "POST /v1/chat/completions HTTP/1.1");
        assert_eq!(request.header("authorization"), Some("Bearer sk-test"));
        assert_eq!(request.header("content-type"), Some("application/json"));

        let json = request.body_json();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "sys");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "usr");
    }

    #[tokio::test]
    async fn client_maps_statuses_to_provider_errors() {
        let server = StubServer::start(vec![
            (429, r#"{"error": {"message": "Rate limit reached"}}"#),
            (404, r#"{"error": {"message": "The model does not exist"}}"#),
            (401, r#"{"error": {"message": "Incorrect API key"}}"#),
        ])
        .await;
        let client = OpenAiClient::new(server.base_url(), Some(Secret::new("sk")));
        let prompt = Prompt::user("p");

        let err = client.generate("gpt-4o-mini", &prompt).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { status: 429, .. }));
        assert!(err.is_rate_limit());
        let err = client.generate("gpt-x", &prompt).await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelNotFound { ref model, .. } if model == "gpt-x"));
        let err = client.generate("gpt-4o-mini", &prompt).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 401, .. }));
    }

    // Real clock: one 1s backoff against a live socket.
    #[tokio::test]
    async fn provider_retries_http_429_then_succeeds() {
        let server = StubServer::start(vec![
            (429, r#"{"error": {"message": "Rate limit reached"}}"#),
            (200, r#"{"choices": [{"message": {"content": "{\"n\": 2}"}}]}"#),
        ])
        .await;
        let provider = OpenAiProvider::new(
            Arc::new(OpenAiClient::new(server.base_url(), Some(Secret::new("sk")))),
            DEFAULT_OPENAI_MODEL,
        );

        let value = provider.generate_json(&Prompt::user("p")).await.unwrap();
        assert_eq!(value["n"], 2);
        assert_eq!(server.requests().len(), 2);
    }
}
