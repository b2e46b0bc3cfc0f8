use async_trait::async_trait;
use bytes::Bytes;

use super::ExtractionError;

/// OCR.space engine generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrEngineVersion {
    V1,
    V2,
}

impl OcrEngineVersion {
    pub fn as_form_value(self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2 => "2",
        }
    }
}

/// One OCR request configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrVariant {
    pub is_table: bool,
    pub scale: bool,
    pub engine: OcrEngineVersion,
}

impl OcrVariant {
    pub const fn new(is_table: bool, scale: bool, engine: OcrEngineVersion) -> Self {
        Self {
            is_table,
            scale,
            engine,
        }
    }

    /// Form fields that vary per attempt. The fixed fields live in the client.
    pub fn form_fields(&self) -> [(&'static str, &'static str); 3] {
        [
            ("isTable", bool_field(self.is_table)),
            ("scale", bool_field(self.scale)),
            ("OCREngine", self.engine.as_form_value()),
        ]
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Attempt order: table-aware, scaled engine v2 first, simpler engine v1 last.
pub const OCR_VARIANTS: [OcrVariant; 5] = [
    OcrVariant::new(true, true, OcrEngineVersion::V2),
    OcrVariant::new(false, true, OcrEngineVersion::V2),
    OcrVariant::new(true, false, OcrEngineVersion::V2),
    OcrVariant::new(true, true, OcrEngineVersion::V1),
    OcrVariant::new(false, true, OcrEngineVersion::V1),
];

/// Remote OCR abstraction (allows mocking for tests).
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Run one OCR request and return the recognized text, possibly empty.
    /// `document` is shared across attempts; cloning it is cheap.
    async fn recognize(
        &self,
        document: &Bytes,
        filename: &str,
        variant: &OcrVariant,
    ) -> Result<String, ExtractionError>;
}
