//! Base detector trait and types
//!
//! This module defines the core abstractions for script checks:
//! - `Detector` trait that all detectors must implement
//! - `ScriptContext` carrying the parsed script and declared sockets
//! - `DetectorResult` for capturing per-detector execution results

use crate::detectors::structure::EntryLookup;
use crate::models::{Finding, SocketDefinition};
use crate::parsers::{FunctionDecl, ParsedScript};
use anyhow::Result;

/// Everything a detector may look at for one validation call
pub struct ScriptContext<'a> {
    /// The parsed script
    pub script: &'a ParsedScript<'a>,
    /// Name of the function the runtime invokes
    pub entry_name: &'a str,
    /// Where (and how) the entry function was declared
    pub entry: EntryLookup<'a>,
    /// Declared output sockets, in declaration order
    pub outputs: &'a [SocketDefinition],
    /// Declared input sockets, when the caller supplied them
    pub inputs: Option<&'a [SocketDefinition]>,
}

impl<'a> ScriptContext<'a> {
    pub fn source(&self) -> &'a str {
        self.script.source()
    }

    /// The entry function the runtime will call, if declared
    pub fn entry_function(&self) -> Option<FunctionDecl<'a>> {
        self.entry.function()
    }

    pub fn is_declared_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o.name == name)
    }
}

/// Result from running a single detector
#[derive(Debug, Clone)]
pub struct DetectorResult {
    /// Name of the detector that produced these results
    pub detector_name: String,
    /// Findings produced by the detector
    pub findings: Vec<Finding>,
    /// Execution time in microseconds
    pub duration_us: u64,
}

/// Trait for all script detectors
///
/// Detectors run in registration order against one parsed script. A
/// detector that returns `Err` is treated as an internal fault by the
/// engine, so ordinary problems in the script must be reported as findings.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyDetector;
///
/// impl Detector for MyDetector {
///     fn name(&self) -> &'static str {
///         "my-detector"
///     }
///
///     fn description(&self) -> &'static str {
///         "Detects my specific mistake"
///     }
///
///     fn detect(&self, ctx: &ScriptContext<'_>) -> Result<Vec<Finding>> {
///         Ok(vec![])
///     }
/// }
/// ```
pub trait Detector: Send + Sync {
    /// Unique kebab-case identifier, also used as the config key
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    /// Run detection and return findings in the order they should be shown
    fn detect(&self, ctx: &ScriptContext<'_>) -> Result<Vec<Finding>>;
}
