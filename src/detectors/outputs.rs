//! Output coverage detector
//!
//! Compares the keys `processData` returns in object literals against the
//! declared output sockets. Every `return` reachable from the function body
//! counts, including ones in nested blocks and callbacks, and keys are
//! unioned across them: a key returned on any path is "possibly returned".
//! Keys that need evaluation (computed, spread) are ignored.

use crate::detectors::base::{Detector, ScriptContext};
use crate::models::{Finding, FindingKind};
use crate::parsers::{classify, location, preorder, FunctionDecl, ObjectLiteral, Syntax};
use anyhow::Result;
use std::collections::HashSet;

/// Object literals returned anywhere inside `entry`, with the 1-based line of
/// their `return` statement
pub fn returned_objects<'a>(entry: FunctionDecl<'a>, source: &'a str) -> Vec<(ObjectLiteral<'a>, u32)> {
    let Some(body) = entry.body() else {
        return vec![];
    };
    preorder(body)
        .filter_map(|node| match classify(node, source) {
            Syntax::Return(ret) => ret.object().map(|obj| (obj, location(ret.node(), source).0)),
            _ => None,
        })
        .collect()
}

/// Statically known returned keys in first-seen order, each with the line of
/// the first return that produced it
fn returned_keys(entry: FunctionDecl<'_>, source: &str) -> Vec<(String, u32)> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for (object, line) in returned_objects(entry, source) {
        for key in object.keys() {
            if seen.insert(key.as_str().to_string()) {
                keys.push((key.as_str().to_string(), line));
            }
        }
    }
    keys
}

pub struct OutputCoverageDetector;

impl Detector for OutputCoverageDetector {
    fn name(&self) -> &'static str {
        "output-coverage"
    }

    fn description(&self) -> &'static str {
        "Compares keys returned by the entry function with the declared outputs"
    }

    fn detect(&self, ctx: &ScriptContext<'_>) -> Result<Vec<Finding>> {
        let Some(entry) = ctx.entry_function() else {
            return Ok(vec![]);
        };
        if ctx.outputs.is_empty() {
            return Ok(vec![]);
        }

        let source = ctx.source();
        let name = ctx.entry_name;
        let (entry_line, _) = location(entry.node(), source);
        let returned = returned_keys(entry, source);
        let returned_names: HashSet<&str> = returned.iter().map(|(k, _)| k.as_str()).collect();

        let mut findings = Vec::new();
        for output in ctx.outputs {
            if !returned_names.contains(output.name.as_str()) {
                findings.push(
                    Finding::warning(
                        FindingKind::OutputMismatch,
                        format!(
                            "Output `{}` is declared but `{name}` never returns it; it will be undefined at runtime",
                            output.name
                        ),
                    )
                    .at_line(entry_line),
                );
            }
        }
        for (key, line) in &returned {
            if !ctx.is_declared_output(key) {
                findings.push(
                    Finding::info(
                        FindingKind::OutputMismatch,
                        format!(
                            "`{name}` returns `{key}`, which is not a declared output; the runtime ignores it"
                        ),
                    )
                    .at_line(*line),
                );
            }
        }
        Ok(findings)
    }
}
