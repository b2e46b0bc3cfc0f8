use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{LlmClient, Prompt};
use super::ProviderError;

/// LLM client that replays scripted outcomes and records the model of each call.
pub struct ScriptedLlmClient {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    models: Mutex<Vec<String>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedLlmClient {
    pub fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            models: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Succeeds once with `response`.
    pub fn replying(response: &str) -> Self {
        Self::new(vec![Ok(response.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.models.lock().unwrap().len()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

pub fn not_found(model: &str) -> ProviderError {
    ProviderError::ModelNotFound {
        model: model.to_string(),
        body: format!("models/{model} is not found for API version v1beta"),
    }
}

pub fn rate_limited() -> ProviderError {
    ProviderError::RateLimited {
        status: 429,
        body: "Rate limit reached for requests".into(),
    }
}

pub fn server_error() -> ProviderError {
    ProviderError::Api {
        status: 500,
        body: "internal server error".into(),
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        self.models.lock().unwrap().push(model.to_string());
        self.prompts.lock().unwrap().push(prompt.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::HttpClient("script exhausted".into())))
    }
}
