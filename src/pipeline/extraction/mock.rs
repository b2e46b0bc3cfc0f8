use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::types::{OcrBackend, OcrVariant};
use super::ExtractionError;

/// OCR backend that replays scripted outcomes and records each variant tried.
pub struct ScriptedOcrBackend {
    outcomes: Mutex<VecDeque<Result<String, ExtractionError>>>,
    seen: Mutex<Vec<OcrVariant>>,
}

impl ScriptedOcrBackend {
    pub fn new(outcomes: Vec<Result<String, ExtractionError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Succeeds on the first attempt.
    pub fn text(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn variants_seen(&self) -> Vec<OcrVariant> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrBackend for ScriptedOcrBackend {
    async fn recognize(
        &self,
        _document: &Bytes,
        _filename: &str,
        variant: &OcrVariant,
    ) -> Result<String, ExtractionError> {
        self.seen.lock().unwrap().push(*variant);
        // An exhausted script behaves like a page with no recognizable text.
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
