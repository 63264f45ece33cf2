//! Detector execution engine
//!
//! The DetectorEngine is the only public way into the analysis:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     DetectorEngine                       │
//! ├──────────────────────────────────────────────────────────┤
//! │  1. Parse the script (a syntax error stops here)         │
//! │  2. Locate the entry function                            │
//! │  3. Run detectors in registration order                  │
//! │  4. Concatenate findings, no dedup, no filtering         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Faults inside the engine (a detector error or panic, a parser that
//! produces no tree) never escape: they become one generic syntax error.

use crate::detectors::base::{Detector, DetectorResult, ScriptContext};
use crate::detectors::structure::{locate_entry, ENTRY_FUNCTION};
use crate::detectors::default_detectors;
use crate::models::{Finding, FindingKind, SocketDefinition, ValidationResult};
use crate::parsers::{parse_script, ParseOutcome};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

const INTERNAL_FAULT: &str =
    "Validation failed unexpectedly: an internal error occurred while analyzing the script";

/// Runs the parser and every registered detector over one script
#[derive(Clone)]
pub struct DetectorEngine {
    detectors: Vec<Arc<dyn Detector>>,
    entry_function: String,
    timeout: Option<Duration>,
}

impl DetectorEngine {
    /// Engine with the default detectors and no timeout
    pub fn new() -> Self {
        DetectorEngineBuilder::new().detectors(default_detectors()).build()
    }

    pub fn builder() -> DetectorEngineBuilder {
        DetectorEngineBuilder::new()
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn entry_function(&self) -> &str {
        &self.entry_function
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Validate a script. Never fails: faults come back as a single finding.
    pub fn validate(
        &self,
        script: &str,
        outputs: &[SocketDefinition],
        inputs: Option<&[SocketDefinition]>,
    ) -> ValidationResult {
        let start = Instant::now();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.run(script, outputs, inputs)
        }));

        let findings = match outcome {
            Ok(Ok(findings)) => findings,
            Ok(Err(e)) => {
                error!("Validation fault: {:#}", e);
                vec![internal_fault()]
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!("Validation panicked: {}", panic_msg);
                vec![internal_fault()]
            }
        };

        debug!(
            "Validated {} bytes: {} findings in {}us",
            script.len(),
            findings.len(),
            start.elapsed().as_micros()
        );
        ValidationResult::new(findings)
    }

    /// Validate with the configured timeout, if any
    pub fn validate_guarded(
        &self,
        script: &str,
        outputs: &[SocketDefinition],
        inputs: Option<&[SocketDefinition]>,
    ) -> ValidationResult {
        match self.timeout {
            Some(timeout) => self.validate_with_timeout(script, outputs, inputs, timeout),
            None => self.validate(script, outputs, inputs),
        }
    }

    /// Validate on a worker thread, giving up after `timeout`.
    ///
    /// On expiry the worker is left to finish in the background and its
    /// result is dropped.
    pub fn validate_with_timeout(
        &self,
        script: &str,
        outputs: &[SocketDefinition],
        inputs: Option<&[SocketDefinition]>,
        timeout: Duration,
    ) -> ValidationResult {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let engine = self.clone();
        let script_owned = script.to_owned();
        let outputs_owned = outputs.to_vec();
        let inputs_owned = inputs.map(|i| i.to_vec());

        let spawned = std::thread::Builder::new()
            .name("nodelint-validate".to_string())
            .spawn(move || {
                let result = engine.validate(&script_owned, &outputs_owned, inputs_owned.as_deref());
                // The receiver is gone if we timed out
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            warn!("Could not spawn validation thread, validating inline: {}", e);
            return self.validate(script, outputs, inputs);
        }

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                warn!("Validation timed out after {}ms", timeout.as_millis());
                ValidationResult::new(vec![Finding::error(
                    FindingKind::Syntax,
                    format!("Validation timed out after {} ms", timeout.as_millis()),
                )])
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                error!("Validation thread exited without a result");
                ValidationResult::new(vec![internal_fault()])
            }
        }
    }

    fn run(
        &self,
        source: &str,
        outputs: &[SocketDefinition],
        inputs: Option<&[SocketDefinition]>,
    ) -> Result<Vec<Finding>> {
        let script = match parse_script(source)? {
            ParseOutcome::Parsed(script) => script,
            ParseOutcome::Failed(err) => {
                let mut finding = Finding::error(FindingKind::Syntax, err.message);
                finding.line = err.line;
                finding.column = err.column;
                return Ok(vec![finding]);
            }
        };

        let ctx = ScriptContext {
            script: &script,
            entry_name: &self.entry_function,
            entry: locate_entry(&script, &self.entry_function),
            outputs,
            inputs,
        };

        let mut findings = Vec::new();
        for detector in &self.detectors {
            let result = self.run_single_detector(detector, &ctx)?;
            findings.extend(result.findings);
        }
        Ok(findings)
    }

    fn run_single_detector(
        &self,
        detector: &Arc<dyn Detector>,
        ctx: &ScriptContext<'_>,
    ) -> Result<DetectorResult> {
        let name = detector.name();
        let start = Instant::now();
        let findings = detector
            .detect(ctx)
            .with_context(|| format!("Detector {name} failed"))?;
        let duration_us = start.elapsed().as_micros() as u64;
        debug!("Detector {} found {} findings in {}us", name, findings.len(), duration_us);
        Ok(DetectorResult {
            detector_name: name.to_string(),
            findings,
            duration_us,
        })
    }
}

impl Default for DetectorEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn internal_fault() -> Finding {
    Finding::error(FindingKind::Syntax, INTERNAL_FAULT)
}

/// Builder for DetectorEngine with fluent API
pub struct DetectorEngineBuilder {
    detectors: Vec<Arc<dyn Detector>>,
    entry_function: String,
    timeout: Option<Duration>,
}

impl DetectorEngineBuilder {
    /// Create a new builder with no detectors registered
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
            entry_function: ENTRY_FUNCTION.to_string(),
            timeout: None,
        }
    }

    /// Add a detector; detectors run in the order they are added
    pub fn detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Add multiple detectors
    pub fn detectors(mut self, detectors: impl IntoIterator<Item = Arc<dyn Detector>>) -> Self {
        self.detectors.extend(detectors);
        self
    }

    /// Name of the function the runtime invokes (default: `processData`)
    pub fn entry_function(mut self, name: impl Into<String>) -> Self {
        self.entry_function = name.into();
        self
    }

    /// Timeout used by `validate_guarded` (default: none)
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> DetectorEngine {
        DetectorEngine {
            detectors: self.detectors,
            entry_function: self.entry_function,
            timeout: self.timeout,
        }
    }
}

impl Default for DetectorEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::tests::outputs;
    use crate::models::Severity;

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn description(&self) -> &'static str {
            "always errors"
        }
        fn detect(&self, _ctx: &ScriptContext<'_>) -> Result<Vec<Finding>> {
            anyhow::bail!("boom")
        }
    }

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn description(&self) -> &'static str {
            "always panics"
        }
        fn detect(&self, _ctx: &ScriptContext<'_>) -> Result<Vec<Finding>> {
            panic!("detector bug")
        }
    }

    struct SlowDetector;

    impl Detector for SlowDetector {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn description(&self) -> &'static str {
            "sleeps"
        }
        fn detect(&self, _ctx: &ScriptContext<'_>) -> Result<Vec<Finding>> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(vec![])
        }
    }

    const CLEAN: &str = "function processData(inputs, properties) { return { Out: inputs.In }; }";

    fn assert_single_fault(result: &ValidationResult) {
        assert_eq!(result.len(), 1);
        let finding = &result.findings()[0];
        assert_eq!(finding.kind, FindingKind::Syntax);
        assert_eq!(finding.severity, Severity::Error);
        assert!(finding.line.is_none());
    }

    #[test]
    fn test_default_detector_order() {
        let engine = DetectorEngine::new();
        assert_eq!(
            engine.detector_names(),
            vec!["structure", "output-coverage", "security", "heuristics"]
        );
        assert_eq!(engine.entry_function(), "processData");
    }

    #[test]
    fn test_detector_error_becomes_single_finding() {
        let engine = DetectorEngine::builder()
            .detectors(default_detectors())
            .detector(Arc::new(FailingDetector))
            .build();
        let result = engine.validate("eval(x)", &outputs(&["Out"]), None);
        assert_single_fault(&result);
        assert!(result.findings()[0].message.contains("internal error"));
    }

    #[test]
    fn test_detector_panic_becomes_single_finding() {
        let engine = DetectorEngine::builder()
            .detector(Arc::new(PanickingDetector))
            .build();
        assert_single_fault(&engine.validate(CLEAN, &[], None));
    }

    #[test]
    fn test_timeout_yields_single_finding() {
        let engine = DetectorEngine::builder()
            .detector(Arc::new(SlowDetector))
            .timeout(Some(Duration::from_millis(20)))
            .build();
        let result = engine.validate_guarded(CLEAN, &[], None);
        assert_single_fault(&result);
        assert!(result.findings()[0].message.contains("timed out after 20 ms"));
    }

    #[test]
    fn test_timeout_returns_result_when_fast_enough() {
        let engine = DetectorEngine::new();
        let result = engine.validate_with_timeout(CLEAN, &outputs(&["Out"]), None, Duration::from_secs(10));
        assert!(result.is_clean());
    }

    #[test]
    fn test_custom_entry_function() {
        let engine = DetectorEngine::builder()
            .detectors(default_detectors())
            .entry_function("run")
            .build();
        let result = engine.validate("function run(inputs, properties) { return { Out: 1 }; }", &outputs(&["Out"]), None);
        assert!(result.is_clean());

        let missing = engine.validate(CLEAN, &outputs(&["Out"]), None);
        assert_eq!(missing.len(), 1);
        assert!(missing.findings()[0].message.contains("`run`"));
    }
}
