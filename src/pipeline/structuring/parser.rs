use serde_json::Value;

use super::ProviderError;

/// Recover a JSON value from free-text model output.
///
/// Tries a strict parse first, then the greedy span from the first `{` to
/// the last `}`. Output holding two separate objects with prose between them
/// therefore fails; no stricter grammar is attempted.
pub fn parse_json_response(raw: &str) -> Result<Value, ProviderError> {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(value);
    }

    let span = brace_span(raw)
        .ok_or_else(|| ProviderError::MalformedResponse("no JSON object in model output".into()))?;

    serde_json::from_str(span).map_err(|e| {
        tracing::debug!(error = %e, chars = raw.len(), "JSON span did not parse");
        ProviderError::MalformedResponse(format!("invalid JSON object in model output: {e}"))
    })
}

fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}
