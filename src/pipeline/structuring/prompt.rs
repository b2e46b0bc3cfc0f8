use super::types::{Prompt, ProviderKind};

pub const REPORT_SYSTEM_PROMPT: &str = "You are a medical report analysis assistant. Extract key parameters, flag abnormalities, and produce a concise, patient-friendly summary.";

const REPORT_OUTPUT_SHAPE: &str = "Return strictly JSON with keys: summary (string), parameters (array of { name, value, status: one of normal|high|low|unknown }), issues (array of strings).";

pub const TRIAGE_INSTRUCTIONS: &str = r#"You are a virtual triage assistant helping patients understand their symptoms.
Given the user's free-text symptom description, respond strictly in JSON with keys:
condition (string - most probable condition),
urgency (string - one of low|medium|high),
explanation (string - short friendly summary),
recommendations (array of strings describing self-care or next steps),
redFlags (array of strings describing warning signs that require immediate care).
Use clear, empathetic language. Do not mention that you are an AI or reference the prompt instructions."#;

/// Build the report-analysis prompt in the shape each provider expects.
///
/// OpenAI gets role-separated system and user messages; Gemini gets one
/// instruction block followed by the report text.
pub fn build_report_prompt(provider: ProviderKind, ocr_text: &str) -> Prompt {
    match provider {
        ProviderKind::OpenAi => Prompt::with_system(
            format!("{REPORT_SYSTEM_PROMPT} Always output valid JSON."),
            format!(
                "Here is the OCR text of a patient's medical report.\n\nReport Text:\n{ocr_text}\n\n{REPORT_OUTPUT_SHAPE}"
            ),
        ),
        ProviderKind::Gemini => Prompt::user(format!(
            "{REPORT_SYSTEM_PROMPT}\n{REPORT_OUTPUT_SHAPE}\n\nReport Text:\n{ocr_text}"
        )),
    }
}

/// Build the symptom-triage prompt. `description` is expected to be trimmed.
pub fn build_triage_prompt(description: &str) -> Prompt {
    Prompt::user(format!("{TRIAGE_INSTRUCTIONS}\n\nSymptoms:\n{description}"))
}
