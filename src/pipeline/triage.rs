//! Symptom triage: free-text description → [`TriageResult`].
//!
//! Only empty input is reported as an error. Every failure past that point
//! degrades to a fixed safe-default result.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::structuring::{
    build_triage_prompt, normalize_triage, safe_default_triage, AiProvider, GeminiProvider,
    TriageResult,
};
use super::AnalysisError;
use crate::config::AnalyzerConfig;

pub struct SymptomTriage {
    provider: Arc<dyn AiProvider>,
}

impl SymptomTriage {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Triage always runs on Gemini.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(Arc::new(GeminiProvider::from_config(&config.gemini)))
    }

    pub async fn analyze_symptoms(&self, description: &str) -> Result<TriageResult, AnalysisError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AnalysisError::InvalidInput("Symptoms are required.".into()));
        }

        let span = tracing::info_span!(
            "analyze_symptoms",
            triage_id = %Uuid::new_v4(),
            provider = %self.provider.kind(),
        );
        let prompt = build_triage_prompt(description);
        let outcome = self.provider.generate_json(&prompt).instrument(span).await;

        Ok(match outcome {
            Ok(json) => {
                let triage = normalize_triage(&json);
                tracing::info!(urgency = %triage.urgency, "Symptoms triaged");
                triage
            }
            Err(e) => {
                tracing::error!(error = %e, "Symptom triage failed, returning safe default");
                safe_default_triage(e.to_string())
            }
        })
    }
}
