//! JSON reporter
//!
//! Outputs `{ "valid", "summary", "findings" }` as pretty-printed JSON.
//! Useful for machine consumption, piping to jq, or further processing.

use crate::models::{Finding, FindingsSummary, ValidationResult};
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    /// No error-severity findings
    valid: bool,
    summary: FindingsSummary,
    findings: &'a [Finding],
}

impl<'a> From<&'a ValidationResult> for JsonReport<'a> {
    fn from(result: &'a ValidationResult) -> Self {
        Self {
            valid: !result.has_errors(),
            summary: result.summary(),
            findings: result.findings(),
        }
    }
}

/// Render result as JSON
pub fn render(result: &ValidationResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport::from(result))?)
}

#[derive(Serialize)]
struct LabeledReport<'a> {
    file: &'a str,
    #[serde(flatten)]
    report: JsonReport<'a>,
}

/// Render several results as a JSON array, each entry tagged with its file
pub fn render_many(results: &[(String, ValidationResult)]) -> Result<String> {
    let reports: Vec<LabeledReport<'_>> = results
        .iter()
        .map(|(file, result)| LabeledReport {
            file,
            report: JsonReport::from(result),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&reports)?)
}

/// Render result as compact JSON (single line)
pub fn render_compact(result: &ValidationResult) -> Result<String> {
    Ok(serde_json::to_string(&JsonReport::from(result))?)
}
