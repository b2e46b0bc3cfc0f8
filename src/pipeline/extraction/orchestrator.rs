//! Document text extraction: bytes → plain text through the remote OCR
//! backend, walking the variant list until one yields text.

use std::sync::Arc;

use bytes::Bytes;

use super::types::{OcrBackend, OcrVariant, OCR_VARIANTS};
use super::ExtractionError;
use crate::pipeline::fallback::{run_ordered, FallbackError};

/// Filename sent to the OCR service when the caller has none.
pub const DEFAULT_FILENAME: &str = "report.pdf";

pub struct TextExtractor {
    backend: Arc<dyn OcrBackend>,
    variants: Vec<OcrVariant>,
}

impl TextExtractor {
    pub fn new(backend: Arc<dyn OcrBackend>) -> Self {
        Self::with_variants(backend, OCR_VARIANTS.to_vec())
    }

    pub fn with_variants(backend: Arc<dyn OcrBackend>, variants: Vec<OcrVariant>) -> Self {
        Self { backend, variants }
    }

    /// Extract text from a document, trying each OCR variant in order.
    ///
    /// Fails only after every variant errored or returned whitespace, or
    /// immediately on a configuration problem (missing API key).
    pub async fn extract_text(
        &self,
        document: &[u8],
        filename: &str,
    ) -> Result<String, ExtractionError> {
        if document.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        let filename = if filename.trim().is_empty() {
            DEFAULT_FILENAME
        } else {
            filename
        };
        // One copy, shared by every variant request.
        let document = &Bytes::copy_from_slice(document);

        let outcome = run_ordered(
            self.variants.iter(),
            move |attempt, variant| async move {
                tracing::debug!(
                    attempt = attempt + 1,
                    is_table = variant.is_table,
                    scale = variant.scale,
                    engine = ?variant.engine,
                    "OCR attempt"
                );
                let text = self.backend.recognize(document, filename, variant).await?;
                if text.chars().all(char::is_whitespace) {
                    return Err(ExtractionError::NoText);
                }
                Ok(text)
            },
            |e: &ExtractionError| {
                if e.is_retryable() {
                    tracing::warn!(error = %e, "OCR variant failed, trying next");
                    true
                } else {
                    false
                }
            },
        )
        .await;

        match outcome {
            Ok(text) => {
                tracing::info!(chars = text.len(), "OCR text extracted");
                Ok(text)
            }
            Err(FallbackError::Fatal { error, .. }) => Err(error),
            Err(exhausted) => {
                let attempts = exhausted.attempts();
                let errors = exhausted
                    .summary()
                    .unwrap_or_else(|| "no OCR variants configured".to_string());
                tracing::error!(attempts, %errors, "OCR exhausted all variants");
                Err(ExtractionError::Exhausted { attempts, errors })
            }
        }
    }
}
