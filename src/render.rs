//! Plain-text rendering for chat replies and terminal output.

use std::fmt::Write;

use crate::pipeline::structuring::{AnalysisResult, TriageResult};

/// Render a report analysis as a chat message. Empty sections are omitted.
pub fn render_report_text(result: &AnalysisResult) -> String {
    let mut out = String::from("Report Analysis:\n");
    let _ = writeln!(out, "Summary: {}", result.summary);

    if !result.parameters.is_empty() {
        out.push_str("\nParameters:\n");
        for p in &result.parameters {
            let _ = writeln!(out, "- {}: {} ({})", p.name, p.value, p.status);
        }
    }

    if !result.issues.is_empty() {
        out.push_str("\nIssues:\n");
        for issue in &result.issues {
            let _ = writeln!(out, "- {issue}");
        }
    }

    out.truncate(out.trim_end().len());
    out
}

pub fn render_triage_text(result: &TriageResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Condition: {}", result.condition);
    let _ = writeln!(out, "Urgency: {}", result.urgency);
    let _ = writeln!(out, "\n{}", result.explanation);

    if !result.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for r in &result.recommendations {
            let _ = writeln!(out, "- {r}");
        }
    }

    if !result.red_flags.is_empty() {
        out.push_str("\nSeek care immediately if:\n");
        for flag in &result.red_flags {
            let _ = writeln!(out, "- {flag}");
        }
    }

    out.truncate(out.trim_end().len());
    out
}
