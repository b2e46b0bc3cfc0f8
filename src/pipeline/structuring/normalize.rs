//! Coerce loosely-shaped model JSON into the result types.
//!
//! Every list field comes out as a list and every enum field as a member of
//! its closed set, whatever the model returned.

use serde_json::Value;

use super::types::{AnalysisResult, Parameter, ParameterStatus, TriageResult, Urgency};

pub const SUMMARY_PLACEHOLDER: &str = "No summary available.";
pub const OCR_ONLY_SUMMARY: &str = "AI analysis temporarily unavailable. Showing OCR text only.";

const UNKNOWN_PARAMETER_NAME: &str = "Unknown";
const DEFAULT_CONDITION: &str = "General assessment required";
const DEFAULT_EXPLANATION: &str =
    "Monitor your symptoms and consult a doctor if they persist.";
const DEFAULT_RECOMMENDATIONS: [&str; 2] = [
    "Stay hydrated and rest.",
    "Schedule a consultation with a healthcare professional if symptoms worsen.",
];

const SAFE_CONDITION: &str = "Medical review recommended";
const SAFE_EXPLANATION: &str = "We could not analyze your symptoms automatically. Please monitor your condition and consult a doctor if symptoms persist or worsen.";
const SAFE_RECOMMENDATIONS: [&str; 2] = [
    "Note when symptoms started and any triggers.",
    "If new or severe symptoms appear, contact a healthcare professional promptly.",
];

/// Render a scalar as text. Null, empty strings and `false` count as absent.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// First present key wins.
fn text_field(json: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text_of(json.get(*k)))
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    )
}

fn parameter(item: &Value) -> Parameter {
    let status = item.get("status").and_then(Value::as_str);
    Parameter {
        name: text_field(item, &["name"]).unwrap_or_else(|| UNKNOWN_PARAMETER_NAME.to_string()),
        value: text_field(item, &["value"]).unwrap_or_default(),
        status: ParameterStatus::coerce(status),
    }
}

/// Build an [`AnalysisResult`] from model JSON and the OCR text it was given.
pub fn normalize_analysis(text: String, json: &Value) -> AnalysisResult {
    let parameters = json
        .get("parameters")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(parameter).collect())
        .unwrap_or_default();

    AnalysisResult {
        text,
        summary: text_field(json, &["summary"]).unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string()),
        parameters,
        issues: string_list(json.get("issues")).unwrap_or_default(),
    }
}

/// Result returned when OCR worked but every AI call failed.
pub fn ocr_only_analysis(text: String) -> AnalysisResult {
    AnalysisResult {
        text,
        summary: OCR_ONLY_SUMMARY.to_string(),
        parameters: Vec::new(),
        issues: Vec::new(),
    }
}

/// Build a [`TriageResult`] from model JSON.
pub fn normalize_triage(json: &Value) -> TriageResult {
    let urgency = text_field(json, &["urgency"]);
    TriageResult {
        condition: text_field(json, &["condition", "diagnosis"])
            .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
        urgency: Urgency::coerce(urgency.as_deref()),
        explanation: text_field(json, &["explanation", "summary"])
            .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
        recommendations: string_list(json.get("recommendations"))
            .unwrap_or_else(|| DEFAULT_RECOMMENDATIONS.map(String::from).to_vec()),
        red_flags: string_list(json.get("redFlags")).unwrap_or_default(),
        error: None,
    }
}

/// Fixed advice returned whenever triage could not run, carrying the cause.
pub fn safe_default_triage(error: impl Into<String>) -> TriageResult {
    TriageResult {
        condition: SAFE_CONDITION.to_string(),
        urgency: Urgency::Medium,
        explanation: SAFE_EXPLANATION.to_string(),
        recommendations: SAFE_RECOMMENDATIONS.map(String::from).to_vec(),
        red_flags: Vec::new(),
        error: Some(error.into()),
    }
}
