use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::types::{OcrBackend, OcrVariant};
use super::ExtractionError;
use crate::config::{OcrConfig, Secret};

/// OCR.space HTTP client.
pub struct OcrSpaceClient {
    endpoint: String,
    api_key: Option<Secret>,
    language: String,
    client: reqwest::Client,
}

impl OcrSpaceClient {
    pub fn new(endpoint: &str, api_key: Option<Secret>, language: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key,
            language: language.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.endpoint, config.api_key.clone(), &config.language)
    }

    fn build_form(
        &self,
        document: &Bytes,
        filename: &str,
        variant: &OcrVariant,
    ) -> Result<Form, ExtractionError> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let file = Part::stream_with_length(document.clone(), document.len() as u64)
            .file_name(filename.to_string())
            .mime_str(mime.essence_str())
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        let mut form = Form::new()
            .part("file", file)
            .text("language", self.language.clone())
            .text("isOverlayRequired", "false")
            .text("detectOrientation", "true");
        for (name, value) in variant.form_fields() {
            form = form.text(name, value);
        }
        Ok(form)
    }
}

/// Response body from OCR.space `/parse/image`.
#[derive(Debug, Deserialize)]
pub struct OcrSpaceResponse {
    #[serde(rename = "ParsedResults", default)]
    pub parsed_results: Option<Vec<OcrSpaceParsedResult>>,
}

#[derive(Debug, Deserialize)]
pub struct OcrSpaceParsedResult {
    #[serde(rename = "ParsedText", default)]
    pub parsed_text: Option<String>,
}

impl OcrSpaceResponse {
    /// Page texts joined by newlines, trimmed. Empty when nothing was parsed.
    pub fn joined_text(&self) -> String {
        self.parsed_results
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|r| r.parsed_text.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

#[async_trait]
impl OcrBackend for OcrSpaceClient {
    async fn recognize(
        &self,
        document: &Bytes,
        filename: &str,
        variant: &OcrVariant,
    ) -> Result<String, ExtractionError> {
        let api_key = self.api_key.as_ref().ok_or(ExtractionError::MissingApiKey)?;
        let form = self.build_form(document, filename, variant)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", api_key.expose())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ExtractionError::Connection(self.endpoint.clone())
                } else {
                    ExtractionError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::OcrService {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OcrSpaceResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        Ok(parsed.joined_text())
    }
}
