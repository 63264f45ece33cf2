//! Core data models for nodelint
//!
//! These models describe what a validation run consumes (socket
//! definitions) and what it produces (findings and the ordered result).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Severity levels for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(anyhow::anyhow!(
                "Unknown severity '{}'. Valid severities: error, warning, info",
                s
            )),
        }
    }
}

/// What kind of problem a finding reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingFunction,
    OutputMismatch,
    Syntax,
    Security,
    BestPractice,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FindingKind::MissingFunction => "missing_function",
            FindingKind::OutputMismatch => "output_mismatch",
            FindingKind::Syntax => "syntax",
            FindingKind::Security => "security",
            FindingKind::BestPractice => "best_practice",
        };
        f.write_str(s)
    }
}

/// A single issue reported by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    /// 1-based line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// 1-based column, counted in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Finding {
    pub fn new(kind: FindingKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn error(kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    pub fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    pub fn info(kind: FindingKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Location suffix used by the text reporter: `line 3` or `line 3:7`
    pub fn location(&self) -> Option<String> {
        match (self.line, self.column) {
            (Some(line), Some(col)) => Some(format!("line {line}:{col}")),
            (Some(line), None) => Some(format!("line {line}")),
            _ => None,
        }
    }
}

/// Declared data type of a socket. Accepted but never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Number,
    Boolean,
    Json,
    Array,
    #[default]
    Any,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Json => "json",
            DataType::Array => "array",
            DataType::Any => "any",
        };
        f.write_str(s)
    }
}

/// Errors from parsing socket definitions given as text (`Name:type`)
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SocketParseError {
    #[error("Socket name must not be empty")]
    EmptyName,

    #[error("Unknown data type '{0}'. Did you mean 'text'?")]
    StringType(String),

    #[error("Unknown data type '{0}'. Valid types: text, number, boolean, json, array, any")]
    UnknownType(String),
}

impl FromStr for DataType {
    type Err = SocketParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(DataType::Text),
            "number" => Ok(DataType::Number),
            "boolean" => Ok(DataType::Boolean),
            "json" => Ok(DataType::Json),
            "array" => Ok(DataType::Array),
            "any" => Ok(DataType::Any),
            "string" => Err(SocketParseError::StringType(s.to_string())),
            _ => Err(SocketParseError::UnknownType(s.to_string())),
        }
    }
}

/// A declared input or output slot of a custom node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketDefinition {
    pub name: String,
    #[serde(default, rename = "dataType", alias = "data_type", alias = "type")]
    pub data_type: DataType,
}

impl SocketDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

impl FromStr for SocketDefinition {
    type Err = SocketParseError;

    /// Parse `Name` or `Name:type`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, data_type) = match s.split_once(':') {
            Some((name, ty)) => (name.trim(), ty.parse()?),
            None => (s.trim(), DataType::Any),
        };
        if name.is_empty() {
            return Err(SocketParseError::EmptyName);
        }
        Ok(Self::new(name, data_type))
    }
}

/// Counts of findings by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub total: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.severity {
                Severity::Error => summary.error += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Ordered findings produced by one validation call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult {
    findings: Vec<Finding>,
}

impl ValidationResult {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self { findings }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.findings.iter()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// No findings at all, not even notes
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::Warning)
    }

    pub fn notes(&self) -> impl Iterator<Item = &Finding> {
        self.with_severity(Severity::Info)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    pub fn summary(&self) -> FindingsSummary {
        FindingsSummary::from_findings(&self.findings)
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a Finding;
    type IntoIter = std::slice::Iter<'a, Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.iter()
    }
}

impl IntoIterator for ValidationResult {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_finding_serializes_snake_case_without_empty_location() {
        let finding = Finding::warning(FindingKind::OutputMismatch, "missing");
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "output_mismatch");
        assert_eq!(json["severity"], "warning");
        assert!(json.get("line").is_none());

        let located = Finding::error(FindingKind::Syntax, "bad").at(3, 7);
        assert_eq!(located.location().as_deref(), Some("line 3:7"));
    }

    #[test]
    fn test_socket_from_str() {
        let socket: SocketDefinition = "Out:number".parse().unwrap();
        assert_eq!(socket, SocketDefinition::new("Out", DataType::Number));

        let bare: SocketDefinition = "Out".parse().unwrap();
        assert_eq!(bare.data_type, DataType::Any);

        assert_eq!(
            "Out:string".parse::<SocketDefinition>(),
            Err(SocketParseError::StringType("string".to_string()))
        );
        assert_eq!(
            ":text".parse::<SocketDefinition>(),
            Err(SocketParseError::EmptyName)
        );
    }

    #[test]
    fn test_socket_deserializes_data_type() {
        let socket: SocketDefinition =
            serde_json::from_str(r#"{"name": "Out", "dataType": "json"}"#).unwrap();
        assert_eq!(socket.data_type, DataType::Json);

        let untyped: SocketDefinition = serde_json::from_str(r#"{"name": "In"}"#).unwrap();
        assert_eq!(untyped.data_type, DataType::Any);
    }

    #[test]
    fn test_result_summary() {
        let result = ValidationResult::new(vec![
            Finding::error(FindingKind::Security, "a"),
            Finding::warning(FindingKind::OutputMismatch, "b"),
            Finding::info(FindingKind::BestPractice, "c"),
            Finding::info(FindingKind::BestPractice, "d"),
        ]);
        let summary = result.summary();
        assert_eq!(summary.error, 1);
        assert_eq!(summary.warning, 1);
        assert_eq!(summary.info, 2);
        assert_eq!(summary.total, 4);
        assert!(result.has_errors());
        assert_eq!(result.max_severity(), Some(Severity::Error));
        assert_eq!(result.notes().count(), 2);
    }
}
