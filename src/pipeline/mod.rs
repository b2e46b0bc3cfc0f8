pub mod fallback;
pub mod extraction;
pub mod structuring;
pub mod report;
pub mod triage;

#[cfg(test)]
pub(crate) mod http_stub;

pub use report::ReportAnalyzer;
pub use triage::SymptomTriage;

use thiserror::Error;

use extraction::ExtractionError;
use structuring::ProviderError;

/// Errors surfaced by the report and triage orchestrators.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("AI analysis failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AnalysisError {
    /// Missing credentials anywhere in the pipeline.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Extraction(e) => matches!(e, ExtractionError::MissingApiKey),
            Self::Provider(e) => e.is_configuration(),
            Self::InvalidInput(_) => false,
        }
    }

    /// Message safe to show an end user. Internal detail stays in the logs.
    pub fn user_message(&self) -> String {
        if self.is_configuration() {
            return "The analysis service is not configured. Please contact support.".into();
        }
        match self {
            Self::Extraction(ExtractionError::EmptyDocument) => "No file uploaded.".into(),
            Self::Extraction(_) => {
                "Could not read text from the document. Please upload a clearer scan.".into()
            }
            Self::Provider(e) if e.is_quota() => "AI quota exceeded. Please try again later. \
                 If this persists, enable OCR-only fallback by setting FALLBACK_OCR_ONLY=true \
                 on the server."
                .into(),
            Self::Provider(_) => "Failed to analyze report.".into(),
            Self::InvalidInput(msg) => msg.clone(),
        }
    }
}
