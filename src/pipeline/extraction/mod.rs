pub mod types;
pub mod ocr;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod mock;

pub use types::*;
pub use ocr::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("OCR API key is not configured (set OCR_SPACE_API_KEY)")]
    MissingApiKey,

    #[error("Uploaded document is empty")]
    EmptyDocument,

    #[error("Could not reach OCR service at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("OCR service returned error (status {status}): {body}")]
    OcrService { status: u16, body: String },

    #[error("OCR response parsing error: {0}")]
    ResponseParsing(String),

    #[error("OCR returned no text")]
    NoText,

    #[error("OCR failed after {attempts} attempt(s): {errors}")]
    Exhausted { attempts: usize, errors: String },
}

impl ExtractionError {
    /// Whether the next OCR variant might still succeed after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingApiKey | Self::EmptyDocument)
    }
}
