//! Best-practice heuristics
//!
//! A small, non-exhaustive set of checks for mistakes that show up often in
//! custom-node scripts. Each one may misfire; none reports an error.
//!
//! - assigning into or reading from an ambient `outputs` object
//! - a `result` variable that never makes it into a returned object
//! - `"string"` used as a `dataType` (the vocabulary uses `"text"`)
//! - reading `inputs.<name>` for an input that was never declared

use crate::detectors::base::{Detector, ScriptContext};
use crate::detectors::outputs::returned_objects;
use crate::models::{Finding, FindingKind};
use crate::parsers::{classify, location, preorder, FunctionDecl, Syntax};
use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static OUTPUTS_REFERENCE: OnceLock<Regex> = OnceLock::new();
static RESULT_BINDING: OnceLock<Regex> = OnceLock::new();
static RESULT_WORD: OnceLock<Regex> = OnceLock::new();
static STRING_DATA_TYPE: OnceLock<Regex> = OnceLock::new();

fn outputs_reference() -> &'static Regex {
    OUTPUTS_REFERENCE.get_or_init(|| {
        Regex::new(r"(?:^|[^.\w$])outputs\s*(?:\.|\[|=[^=>]|=$)").expect("valid regex")
    })
}

fn result_binding() -> &'static Regex {
    RESULT_BINDING.get_or_init(|| Regex::new(r"\b(?:const|let|var)\s+result\b").expect("valid regex"))
}

fn result_word() -> &'static Regex {
    RESULT_WORD.get_or_init(|| Regex::new(r"\bresult\b").expect("valid regex"))
}

fn string_data_type() -> &'static Regex {
    STRING_DATA_TYPE.get_or_init(|| {
        Regex::new(r#"\bdataType['"]?\s*[:=]\s*['"`]string['"`]"#).expect("valid regex")
    })
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

/// `(1-based line, text)` for every line that is not obviously a comment
fn code_lines(source: &str) -> impl Iterator<Item = (u32, &str)> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !is_comment_line(line))
        .map(|(i, line)| ((i + 1) as u32, line))
}

pub struct HeuristicsDetector;

impl HeuristicsDetector {
    /// The runtime has no `outputs` object; values must be returned
    fn ambient_outputs(&self, ctx: &ScriptContext<'_>) -> Option<Finding> {
        let source = ctx.source();
        let (line, _) = code_lines(source).find(|(_, text)| outputs_reference().is_match(text))?;

        let binds_outputs = preorder(ctx.script.root())
            .any(|n| matches!(classify(n, source), Syntax::Binding { name: "outputs", .. }));
        let param_outputs = ctx
            .entry_function()
            .map(|f| (0..f.params().len()).any(|i| f.param_name(i) == Some("outputs")))
            .unwrap_or(false);
        if binds_outputs || param_outputs {
            return None;
        }

        Some(
            Finding::warning(
                FindingKind::BestPractice,
                format!(
                    "`outputs` is not defined in the custom node runtime. Return your values \
                     from `{}` instead: `return {{ OutputName: value }}`",
                    ctx.entry_name
                ),
            )
            .at_line(line),
        )
    }

    /// Matched on text, not scope: `result` anywhere inside a returned object
    /// literal counts as used
    fn unused_result(&self, ctx: &ScriptContext<'_>, entry: FunctionDecl<'_>) -> Option<Finding> {
        let source = ctx.source();
        let (line, _) = code_lines(source).find(|(_, text)| result_binding().is_match(text))?;
        if ctx.is_declared_output("result") {
            return None;
        }
        let returned = returned_objects(entry, source)
            .iter()
            .any(|(object, _)| result_word().is_match(object.text()));
        if returned {
            return None;
        }
        Some(
            Finding::info(
                FindingKind::BestPractice,
                "`result` is computed but never returned; include it in the returned object, \
                 e.g. `return { Output: result }`",
            )
            .at_line(line),
        )
    }

    fn string_data_types(&self, ctx: &ScriptContext<'_>) -> Vec<Finding> {
        code_lines(ctx.source())
            .filter(|(_, text)| string_data_type().is_match(text))
            .map(|(line, _)| {
                Finding::info(
                    FindingKind::BestPractice,
                    "`\"string\"` is not a valid dataType; use `\"text\"` for string values",
                )
                .at_line(line)
            })
            .collect()
    }

    /// `inputs.Foo` where `Foo` is not a declared input socket
    fn undeclared_inputs(&self, ctx: &ScriptContext<'_>, entry: FunctionDecl<'_>) -> Vec<Finding> {
        let (Some(inputs), Some(param), Some(body)) = (ctx.inputs, entry.param_name(0), entry.body())
        else {
            return vec![];
        };
        let source = ctx.source();
        let declared: HashSet<&str> = inputs.iter().map(|s| s.name.as_str()).collect();
        let mut reported = HashSet::new();
        let mut findings = Vec::new();

        for node in preorder(body) {
            let Syntax::Member(member) = classify(node, source) else {
                continue;
            };
            if member.object_name() != Some(param) || is_called(member.node()) {
                continue;
            }
            let Some(name) = member.property_name() else {
                continue;
            };
            if declared.contains(name.as_ref()) || !reported.insert(name.clone()) {
                continue;
            }
            let (line, column) = location(member.node(), source);
            findings.push(
                Finding::info(
                    FindingKind::BestPractice,
                    format!(
                        "`{param}.{name}` does not match any declared input; it will be undefined at runtime"
                    ),
                )
                .at(line, column),
            );
        }
        findings
    }
}

/// `inputs.hasOwnProperty(...)` is a method call, not an input read
fn is_called(node: tree_sitter::Node<'_>) -> bool {
    node.parent()
        .filter(|p| p.kind() == "call_expression")
        .and_then(|p| p.child_by_field_name("function"))
        .is_some_and(|f| f.id() == node.id())
}

impl Detector for HeuristicsDetector {
    fn name(&self) -> &'static str {
        "heuristics"
    }

    fn description(&self) -> &'static str {
        "Flags common custom-node mistakes that are not contract violations"
    }

    fn detect(&self, ctx: &ScriptContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        findings.extend(self.ambient_outputs(ctx));
        if let Some(entry) = ctx.entry_function() {
            findings.extend(self.unused_result(ctx, entry));
        }
        findings.extend(self.string_data_types(ctx));
        if let Some(entry) = ctx.entry_function() {
            findings.extend(self.undeclared_inputs(ctx, entry));
        }
        Ok(findings)
    }
}
