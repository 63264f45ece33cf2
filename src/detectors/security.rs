//! Sandbox security pattern detector
//!
//! Scans the raw source line by line against a fixed, ordered table of
//! disallowed APIs. This deliberately ignores the syntax tree so that code
//! the tree walk would not recognise (bracket access assembled from strings,
//! code in comments that may later be uncommented) is still caught. It can
//! be evaded; it is a linter, not the sandbox.

use crate::detectors::base::{Detector, ScriptContext};
use crate::models::{Finding, FindingKind};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

/// `(pattern, message)` pairs, checked in this order on every line.
///
/// `(?:^|[^.\w$])` stands in for a look-behind: the name must not be a
/// property (`obj.process`) or part of a longer identifier (`processData`).
/// `process` and `global` also match as bare values (`const p = process;`).
const BUILTIN_PATTERNS: &[(&str, &str)] = &[
    (
        r"\beval\s*\(",
        "eval() is not allowed: dynamic code execution is blocked in the sandbox",
    ),
    (
        r"(?:^|[^.\w$])Function\s*\(",
        "The Function constructor is not allowed: dynamic code execution is blocked in the sandbox",
    ),
    (
        r"\brequire\s*\(",
        "require() is not allowed: modules cannot be loaded in the sandbox",
    ),
    (
        r#"(?:^|[^.\w$])import\s*\(|^\s*import\s+[\w{*'"]"#,
        "import is not allowed: modules cannot be loaded in the sandbox",
    ),
    (
        r"(?:^|[^.\w$])process\s*(?:[.\[;,)\]}?]|$)",
        "Access to `process` is not allowed in the sandbox",
    ),
    (
        r"(?:^|[^.\w$])global\s*(?:[.\[;,)\]}?]|$)",
        "Access to `global` is not allowed in the sandbox",
    ),
    (
        r"\bglobalThis\b",
        "Access to `globalThis` is not allowed in the sandbox",
    ),
    (
        r"__proto__",
        "Access to `__proto__` is not allowed: prototype manipulation is blocked",
    ),
    (
        r#"\.constructor\s*(?:\.\s*constructor\b|\[\s*['"`]constructor)"#,
        "Chained `.constructor.constructor` access is not allowed: it can reach the Function constructor",
    ),
    (
        r"(?:^|[^.\w$])fs\s*\.\s*\w|\bchild_process\b",
        "Filesystem and process APIs (`fs`, `child_process`) are not available in the sandbox",
    ),
    (
        r"\b(?:spawn|spawnSync|execSync|execFile|execFileSync|fork)\s*\(",
        "Spawning processes is not allowed in the sandbox",
    ),
    (
        r#"\bset(?:Timeout|Interval|Immediate)\s*\(\s*['"`]"#,
        "Timers with string arguments evaluate code and are not allowed; pass a function instead",
    ),
];

/// A compiled disallowed-API pattern
#[derive(Debug, Clone)]
pub struct SecurityPattern {
    regex: Regex,
    message: String,
}

impl SecurityPattern {
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            message: message.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

static BUILTIN: OnceLock<Vec<SecurityPattern>> = OnceLock::new();

/// The built-in pattern table, compiled once
pub fn builtin_patterns() -> &'static [SecurityPattern] {
    BUILTIN.get_or_init(|| {
        BUILTIN_PATTERNS
            .iter()
            .map(|(pattern, message)| {
                SecurityPattern::new(pattern, *message).expect("valid regex: hardcoded security pattern")
            })
            .collect()
    })
}

/// Detects sandbox-forbidden APIs in the raw source
#[derive(Debug, Clone, Default)]
pub struct SecurityDetector {
    /// Checked after the built-in table
    extra_patterns: Vec<SecurityPattern>,
}

impl SecurityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra_patterns(extra_patterns: Vec<SecurityPattern>) -> Self {
        Self { extra_patterns }
    }

    /// Built-in patterns followed by configured ones
    pub fn patterns(&self) -> impl Iterator<Item = &SecurityPattern> {
        builtin_patterns().iter().chain(self.extra_patterns.iter())
    }

    /// One finding per (line, matching pattern), in line then table order
    pub fn scan(&self, source: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (i, line) in source.lines().enumerate() {
            for pattern in self.patterns() {
                if pattern.is_match(line) {
                    findings.push(
                        Finding::error(FindingKind::Security, pattern.message())
                            .at_line((i + 1) as u32),
                    );
                }
            }
        }
        findings
    }
}

impl Detector for SecurityDetector {
    fn name(&self) -> &'static str {
        "security"
    }

    fn description(&self) -> &'static str {
        "Detects APIs and keywords the sandbox forbids"
    }

    fn detect(&self, ctx: &ScriptContext<'_>) -> Result<Vec<Finding>> {
        Ok(self.scan(ctx.source()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn scan(source: &str) -> Vec<Finding> {
        SecurityDetector::new().scan(source)
    }

    fn lines(findings: &[Finding]) -> Vec<u32> {
        findings.iter().filter_map(|f| f.line).collect()
    }

    #[test]
    fn test_builtin_patterns_compile() {
        assert_eq!(builtin_patterns().len(), BUILTIN_PATTERNS.len());
    }

    #[test]
    fn test_eval_counted_per_line() {
        let source = "a\nb\nc\nd\nconst v = eval(x);\nf\ng\nh\neval(x)\n";
        let findings = scan(source);
        assert_eq!(lines(&findings), vec![5, 9]);
        assert!(findings
            .iter()
            .all(|f| f.kind == FindingKind::Security && f.severity == Severity::Error));
    }

    #[test]
    fn test_require_reports_once() {
        let findings = scan("const fs = require('fs');");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("require"));
    }

    #[test]
    fn test_several_patterns_on_one_line() {
        let findings = scan("const cp = require('child_process'); eval(code);");
        assert_eq!(findings.len(), 3);
        assert_eq!(lines(&findings), vec![1, 1, 1]);
        assert!(findings[0].message.starts_with("eval()"));
        assert!(findings[1].message.starts_with("require()"));
        assert!(findings[2].message.contains("child_process"));
    }

    #[test]
    fn test_detects_each_category() {
        let cases = [
            "const f = new Function('return 1');",
            "const f = Function('return 1');",
            "import('lodash')",
            "import x from 'y'",
            "process.env.SECRET",
            "const p = process;",
            "const { env } = process",
            "callWith(process, 1)",
            "global['x'] = 1",
            "const g = global;",
            "globalThis.fetch",
            "obj.__proto__.polluted = true",
            "''.constructor.constructor('return this')()",
            "x.constructor['constructor']('code')",
            "fs.readFileSync('/etc/passwd')",
            "spawn('ls')",
            "setTimeout(\"alert(1)\", 10)",
        ];
        for case in cases {
            assert_eq!(scan(case).len(), 1, "expected exactly one finding for {case:?}");
        }
    }

    #[test]
    fn test_ignores_lookalikes() {
        let clean = [
            "function processData(inputs, properties) {",
            "const evaluate = (x) => x;",
            "const re = /a/; re.exec(text);",
            "inputs.process.value",
            "// process the inputs first",
            "const processed = inputs.process;",
            "const g = { global: true };",
            "const globalConfig = {};",
            "myFunction(1)",
            "setTimeout(() => done(), 10)",
            "const prefs = properties.fs;",
            "obj.constructor.name",
        ];
        for case in clean {
            assert!(scan(case).is_empty(), "unexpected finding for {case:?}");
        }
    }

    #[test]
    fn test_extra_patterns_run_after_builtin() {
        let extra = SecurityPattern::new(r"\bfetch\s*\(", "fetch() is not available").unwrap();
        let detector = SecurityDetector::with_extra_patterns(vec![extra]);
        let findings = detector.scan("eval(fetch(url))");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[1].message, "fetch() is not available");
        assert_eq!(detector.patterns().count(), BUILTIN_PATTERNS.len() + 1);
    }
}
