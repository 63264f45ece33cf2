//! Output reporters for validation results
//!
//! Supports two output formats:
//! - `text` - Grouped Errors / Warnings / Notes, the form attached to API responses
//! - `json` - Machine-readable JSON

mod json;
mod text;

pub use json::render_compact as render_json_compact;
pub use text::{render_finding, CLEAN_MESSAGE};

use crate::models::ValidationResult;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a validation result in the specified format
pub fn report(result: &ValidationResult, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(result, fmt)
}

/// Render a validation result using an OutputFormat enum
pub fn report_with_format(result: &ValidationResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(result),
        OutputFormat::Json => json::render(result),
    }
}

/// Render several labelled results; a single result renders unlabelled
pub fn report_many(results: &[(String, ValidationResult)], format: OutputFormat) -> Result<String> {
    if let [(_, only)] = results {
        return report_with_format(only, format);
    }
    match format {
        OutputFormat::Text => text::render_many(results),
        OutputFormat::Json => json::render_many(results),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Findings of every severity, deliberately not in severity order
    pub(crate) fn test_result() -> ValidationResult {
        use crate::models::{Finding, FindingKind};

        ValidationResult::new(vec![
            Finding::error(FindingKind::Security, "eval() is not allowed").at_line(5),
            Finding::warning(FindingKind::OutputMismatch, "Output `Out` is never returned").at_line(1),
            Finding::error(FindingKind::Syntax, "Syntax error: Unexpected token `}`").at(9, 3),
            Finding::info(FindingKind::BestPractice, "Unlocated note"),
        ])
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("sarif").is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_report_dispatch() {
        let result = test_result();
        assert!(report(&result, "text").unwrap().starts_with("Errors:"));
        assert!(report(&result, "json").unwrap().trim_start().starts_with('{'));
        assert!(report(&result, "xml").is_err());
    }

    #[test]
    fn test_report_many_single_is_unlabelled() {
        let results = vec![("only.js".to_string(), test_result())];
        let out = report_many(&results, OutputFormat::Text).unwrap();
        assert!(out.starts_with("Errors:"));
        assert!(!out.contains("only.js"));
    }
}
