//! Plain-text reporter
//!
//! The grouped layout below is what callers attach to node create/update
//! responses, so it carries no colour codes:
//!
//! ```text
//! Errors:
//! - require() is not allowed: modules cannot be loaded in the sandbox (line 2)
//!
//! Warnings:
//! - Output `Out` is declared but `processData` never returns it; ... (line 1)
//! ```

use crate::models::{Finding, ValidationResult};
use anyhow::Result;

pub const CLEAN_MESSAGE: &str = "No issues found.";

/// `- <message> (line <n>[:<col>])`, or just `- <message>` without a location
pub fn render_finding(finding: &Finding) -> String {
    match finding.location() {
        Some(location) => format!("- {} ({})", finding.message, location),
        None => format!("- {}", finding.message),
    }
}

/// Render findings grouped by severity; empty groups are omitted
pub fn render(result: &ValidationResult) -> Result<String> {
    if result.is_empty() {
        return Ok(format!("{CLEAN_MESSAGE}\n"));
    }

    let groups: [(&str, Vec<&Finding>); 3] = [
        ("Errors", result.errors().collect()),
        ("Warnings", result.warnings().collect()),
        ("Notes", result.notes().collect()),
    ];

    let sections: Vec<String> = groups
        .iter()
        .filter(|(_, findings)| !findings.is_empty())
        .map(|(header, findings)| {
            let mut section = format!("{header}:\n");
            for finding in findings {
                section.push_str(&render_finding(finding));
                section.push('\n');
            }
            section
        })
        .collect();

    Ok(sections.join("\n"))
}

/// One labelled section per result, separated by blank lines
pub fn render_many(results: &[(String, ValidationResult)]) -> Result<String> {
    let mut sections = Vec::with_capacity(results.len());
    for (file, result) in results {
        sections.push(format!("{file}\n{}", render(result)?));
    }
    Ok(sections.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_result;

    #[test]
    fn test_text_render_groups_in_severity_order() {
        let out = render(&test_result()).expect("render text");
        let expected = "\
Errors:
- eval() is not allowed (line 5)
- Syntax error: Unexpected token `}` (line 9:3)

Warnings:
- Output `Out` is never returned (line 1)

Notes:
- Unlocated note
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_text_render_clean() {
        let out = render(&ValidationResult::default()).expect("render text");
        assert_eq!(out.trim_end(), "No issues found.");
    }

    #[test]
    fn test_text_render_many() {
        let results = vec![
            ("a.js".to_string(), ValidationResult::default()),
            ("b.js".to_string(), test_result()),
        ];
        let out = render_many(&results).expect("render text");
        assert!(out.starts_with("a.js\nNo issues found.\n\nb.js\nErrors:\n"));
    }

    #[test]
    fn test_text_render_omits_empty_groups() {
        let result = ValidationResult::new(
            test_result()
                .into_iter()
                .filter(|f| f.severity == crate::models::Severity::Warning)
                .collect(),
        );
        let out = render(&result).expect("render text");
        assert!(out.starts_with("Warnings:\n"));
        assert!(!out.contains("Errors:"));
        assert!(!out.contains("Notes:"));
    }
}
