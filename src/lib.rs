//! nodelint - static validator for custom-node scripts
//!
//! Checks a JavaScript script against the custom-node contract before it is
//! saved: it must parse as a plain script, define the entry function
//! (`processData` by default), return its declared outputs, and stay clear
//! of APIs the sandbox forbids. Nothing is executed.
//!
//! ```
//! use nodelint::{validate, DataType, SocketDefinition};
//!
//! let outputs = vec![SocketDefinition::new("Out", DataType::Text)];
//! let script = "function processData(inputs, properties) { return { Out: inputs.In }; }";
//! assert!(validate(script, &outputs, None).is_clean());
//! ```

pub mod config;
pub mod detectors;
pub mod models;
pub mod parsers;
pub mod reporters;

pub use config::{load_project_config, ProjectConfig};
pub use detectors::{Detector, DetectorEngine, DetectorEngineBuilder};
pub use models::{
    DataType, Finding, FindingKind, FindingsSummary, Severity, SocketDefinition, ValidationResult,
};
pub use reporters::{report, report_with_format, OutputFormat};

use std::sync::OnceLock;

static DEFAULT_ENGINE: OnceLock<DetectorEngine> = OnceLock::new();

/// Validate `script` with the default detectors and entry function.
///
/// Findings come back in detection order. Pass `inputs` to also check
/// reads of undeclared input sockets.
pub fn validate(
    script: &str,
    outputs: &[SocketDefinition],
    inputs: Option<&[SocketDefinition]>,
) -> ValidationResult {
    DEFAULT_ENGINE
        .get_or_init(DetectorEngine::new)
        .validate(script, outputs, inputs)
}
