//! Report analysis: document bytes → OCR text → AI structuring →
//! normalized [`AnalysisResult`].
//!
//! Engines are injected as trait objects so the orchestrator runs against
//! scripted backends in tests.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::extraction::{OcrSpaceClient, TextExtractor};
use super::structuring::{
    build_report_prompt, normalize_analysis, ocr_only_analysis, AiProvider, AnalysisResult,
    GeminiProvider, OpenAiProvider, ProviderKind,
};
use super::AnalysisError;
use crate::config::{AnalyzerConfig, DEFAULT_MAX_UPLOAD_BYTES};

pub struct ReportAnalyzer {
    extractor: TextExtractor,
    provider: Arc<dyn AiProvider>,
    fallback_ocr_only: bool,
    max_upload_bytes: usize,
}

impl ReportAnalyzer {
    pub fn new(extractor: TextExtractor, provider: Arc<dyn AiProvider>) -> Self {
        Self {
            extractor,
            provider,
            fallback_ocr_only: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Wire the OCR.space backend and the configured AI provider.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let extractor = TextExtractor::new(Arc::new(OcrSpaceClient::from_config(&config.ocr)));
        let provider: Arc<dyn AiProvider> = match config.report_provider() {
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(&config.openai)),
            ProviderKind::Gemini => Arc::new(GeminiProvider::from_config(&config.gemini)),
        };
        Self::new(extractor, provider)
            .with_fallback_ocr_only(config.fallback_ocr_only)
            .with_max_upload_bytes(config.max_upload_bytes)
    }

    pub fn with_fallback_ocr_only(mut self, enabled: bool) -> Self {
        self.fallback_ocr_only = enabled;
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Provider that structures reports, for callers persisting provenance.
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// Analyze one uploaded report.
    ///
    /// Extraction failures always propagate. AI failures propagate unless
    /// OCR-only fallback is enabled, in which case the raw text comes back
    /// with a placeholder summary.
    pub async fn analyze_report(
        &self,
        document: &[u8],
        filename: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let span = tracing::info_span!(
            "analyze_report",
            analysis_id = %Uuid::new_v4(),
            provider = %self.provider.kind(),
            bytes = document.len(),
        );
        self.run(document, filename).instrument(span).await
    }

    async fn run(&self, document: &[u8], filename: &str) -> Result<AnalysisResult, AnalysisError> {
        if document.len() > self.max_upload_bytes {
            tracing::warn!(limit = self.max_upload_bytes, "Upload rejected: too large");
            return Err(AnalysisError::InvalidInput(format!(
                "File is too large. Maximum size is {}.",
                describe_size(self.max_upload_bytes)
            )));
        }

        let text = self.extractor.extract_text(document, filename).await?;

        let prompt = build_report_prompt(self.provider.kind(), &text);
        match self.provider.generate_json(&prompt).await {
            Ok(json) => {
                let result = normalize_analysis(text, &json);
                tracing::info!(
                    parameters = result.parameters.len(),
                    issues = result.issues.len(),
                    "Report analyzed"
                );
                Ok(result)
            }
            Err(e) if self.fallback_ocr_only => {
                tracing::warn!(error = %e, "AI analysis failed, returning OCR text only");
                Ok(ocr_only_analysis(text))
            }
            Err(e) => {
                tracing::error!(error = %e, "AI analysis failed");
                Err(e.into())
            }
        }
    }
}

/// Whole mebibytes as "N MB", anything else in bytes.
fn describe_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}
