//! Script detectors
//!
//! This module provides the detector framework and the checks run against
//! every custom-node script.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DetectorEngine                          │
//! │  - Parses the script (syntax errors stop the pipeline)      │
//! │  - Locates the entry function                               │
//! │  - Runs detectors in registration order                     │
//! │  - Turns internal faults into a single finding              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Detector Trait                         │
//! │  - name(): Unique identifier (config key)                   │
//! │  - description(): Human-readable description                │
//! │  - detect(ctx): Run detection, return findings              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Detectors (in run order)
//!
//! - `StructureDetector` - entry function present, parameters, top-level returns
//! - `OutputCoverageDetector` - returned keys vs declared outputs
//! - `SecurityDetector` - sandbox-forbidden APIs, line by line
//! - `HeuristicsDetector` - common non-fatal mistakes

mod base;
mod engine;
mod heuristics;
mod outputs;
mod security;
mod structure;

pub use base::{Detector, DetectorResult, ScriptContext};
pub use engine::{DetectorEngine, DetectorEngineBuilder};
pub use heuristics::HeuristicsDetector;
pub use outputs::{returned_objects, OutputCoverageDetector};
pub use security::{builtin_patterns, SecurityDetector, SecurityPattern};
pub use structure::{locate_entry, EntryLookup, StructureDetector, ENTRY_FUNCTION};

use std::sync::Arc;

/// The standard detector set, in the order findings are reported
pub fn default_detectors() -> Vec<Arc<dyn Detector>> {
    detectors_with_security(SecurityDetector::new())
}

/// The standard set with a customised security detector
pub fn detectors_with_security(security: SecurityDetector) -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(StructureDetector),
        Arc::new(OutputCoverageDetector),
        Arc::new(security),
        Arc::new(HeuristicsDetector),
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{DataType, Finding, SocketDefinition};
    use crate::parsers::{parse_script, ParseOutcome};
    use std::collections::HashSet;

    pub(crate) fn outputs(names: &[&str]) -> Vec<SocketDefinition> {
        names
            .iter()
            .map(|n| SocketDefinition::new(*n, DataType::Any))
            .collect()
    }

    /// Parse `source` and run a single detector against it
    pub(crate) fn run_detector(
        detector: &dyn Detector,
        source: &str,
        outputs: &[SocketDefinition],
        inputs: Option<&[SocketDefinition]>,
    ) -> Vec<Finding> {
        let ParseOutcome::Parsed(script) = parse_script(source).expect("parser should load") else {
            panic!("test script has a syntax error: {source}");
        };
        let ctx = ScriptContext {
            script: &script,
            entry_name: ENTRY_FUNCTION,
            entry: locate_entry(&script, ENTRY_FUNCTION),
            outputs,
            inputs,
        };
        detector.detect(&ctx).expect("detector should not fail")
    }

    #[test]
    fn test_detector_names_are_unique() {
        let names: Vec<&str> = default_detectors().iter().map(|d| d.name()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len(), "duplicate detector name in {names:?}");
        assert!(default_detectors().iter().all(|d| !d.description().is_empty()));
    }
}
