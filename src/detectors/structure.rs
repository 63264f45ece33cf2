//! Entry-function contract detector
//!
//! The runtime calls one top-level function, `processData(inputs,
//! properties, llm)`. This detector reports when that function is missing,
//! declared more than once, or declared with too few parameters, and flags
//! `return` statements sitting at the top level of the script.

use crate::detectors::base::{Detector, ScriptContext};
use crate::models::{Finding, FindingKind};
use crate::parsers::{classify, location, preorder, FunctionDecl, ParsedScript, Syntax};
use anyhow::Result;
use tree_sitter::Node;

/// Name of the function the runtime invokes
pub const ENTRY_FUNCTION: &str = "processData";

/// Declarations of the entry-function name found at the top level
#[derive(Debug, Clone, Default)]
pub struct EntryLookup<'a> {
    declarations: Vec<FunctionDecl<'a>>,
    /// `const processData = ...` and friends
    other_binding: Option<Node<'a>>,
}

impl<'a> EntryLookup<'a> {
    /// The declaration the runtime sees: the last one wins in JavaScript
    pub fn function(&self) -> Option<FunctionDecl<'a>> {
        self.declarations.last().copied()
    }

    pub fn declaration_count(&self) -> usize {
        self.declarations.len()
    }
}

/// Scan top-level statements (not nested scopes) for the entry function
pub fn locate_entry<'a>(script: &'a ParsedScript<'a>, name: &str) -> EntryLookup<'a> {
    let source = script.source();
    let mut lookup = EntryLookup::default();

    for stmt in script.top_level() {
        match classify(stmt, source) {
            Syntax::Function(func) if func.name() == Some(name) => lookup.declarations.push(func),
            Syntax::Other(node)
                if matches!(node.kind(), "lexical_declaration" | "variable_declaration") =>
            {
                // Only the declarators themselves; names inside initializers are not top level
                let mut cursor = node.walk();
                let bound = node.named_children(&mut cursor).find(|n| {
                    matches!(classify(*n, source), Syntax::Binding { name: bound, .. } if bound == name)
                });
                if lookup.other_binding.is_none() {
                    lookup.other_binding = bound;
                }
            }
            _ => {}
        }
    }
    lookup
}

pub struct StructureDetector;

impl StructureDetector {
    fn check_entry(&self, ctx: &ScriptContext<'_>, findings: &mut Vec<Finding>) {
        let name = ctx.entry_name;
        let source = ctx.source();

        let Some(entry) = ctx.entry_function() else {
            findings.push(missing_entry(ctx));
            return;
        };
        let (line, _) = location(entry.node(), source);

        let count = ctx.entry.declaration_count();
        if count > 1 {
            findings.push(
                Finding::warning(
                    FindingKind::BestPractice,
                    format!(
                        "`{name}` is declared {count} times; only the last declaration is used"
                    ),
                )
                .at_line(line),
            );
        }

        match entry.params().len() {
            0 => findings.push(
                Finding::warning(
                    FindingKind::BestPractice,
                    format!(
                        "`{name}` takes no parameters, so it cannot receive inputs. \
                         Use `function {name}(inputs, properties, llm)`"
                    ),
                )
                .at_line(line),
            ),
            1 if references_properties(entry, source) => findings.push(
                Finding::info(
                    FindingKind::BestPractice,
                    format!(
                        "`{name}` uses `properties` but declares only one parameter; \
                         add it as the second parameter: `{name}(inputs, properties)`"
                    ),
                )
                .at_line(line),
            ),
            _ => {}
        }
    }

    fn check_top_level_returns(&self, ctx: &ScriptContext<'_>, findings: &mut Vec<Finding>) {
        let source = ctx.source();
        for stmt in ctx.script.top_level() {
            if let Syntax::Return(ret) = classify(stmt, source) {
                let (line, column) = location(ret.node(), source);
                findings.push(
                    Finding::error(
                        FindingKind::Syntax,
                        format!(
                            "`return` must be inside `{}`; top-level return statements are not allowed",
                            ctx.entry_name
                        ),
                    )
                    .at(line, column),
                );
            }
        }
    }
}

/// Always reported on line 1; a variable binding is named in the message
fn missing_entry(ctx: &ScriptContext<'_>) -> Finding {
    let name = ctx.entry_name;
    let signature = format!("function {name}(inputs, properties, llm) {{ ... }}");
    match ctx.entry.other_binding {
        Some(binding) => {
            let (line, _) = location(binding, ctx.source());
            Finding::error(
                FindingKind::MissingFunction,
                format!(
                    "`{name}` is assigned to a variable on line {line}, but the runtime only calls \
                     a top-level function declaration. Declare it as `{signature}`"
                ),
            )
            .at_line(1)
        }
        None => Finding::error(
            FindingKind::MissingFunction,
            format!(
                "Missing required function `{name}`. Declare it at the top level as \
                 `{signature}` and return an object with your output values"
            ),
        )
        .at_line(1),
    }
}

fn references_properties(entry: FunctionDecl<'_>, source: &str) -> bool {
    let Some(body) = entry.body() else {
        return false;
    };
    preorder(body).any(|n| matches!(classify(n, source), Syntax::Identifier("properties")))
}

impl Detector for StructureDetector {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn description(&self) -> &'static str {
        "Checks that the entry function exists with the expected parameters and that nothing returns at the top level"
    }

    fn detect(&self, ctx: &ScriptContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        self.check_entry(ctx, &mut findings);
        self.check_top_level_returns(ctx, &mut findings);
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::tests::run_detector;
    use crate::models::Severity;

    #[test]
    fn test_missing_entry_function() {
        let findings = run_detector(&StructureDetector, "function helper(a, b) { return {}; }", &[], None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::MissingFunction);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].line, Some(1));
        assert!(findings[0].message.contains("processData(inputs, properties, llm)"));
    }

    #[test]
    fn test_nested_entry_function_does_not_count() {
        let source = "function outer() {\n  function processData(i, p) { return {}; }\n}";
        let findings = run_detector(&StructureDetector, source, &[], None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::MissingFunction);
    }

    #[test]
    fn test_entry_bound_to_variable() {
        let source = "// helper\nconst processData = (inputs, properties) => ({});";
        let findings = run_detector(&StructureDetector, source, &[], None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::MissingFunction);
        assert_eq!(findings[0].line, Some(1));
        assert!(findings[0].message.contains("assigned to a variable on line 2"));
    }

    #[test]
    fn test_binding_inside_initializer_is_not_the_entry() {
        let source = "const helper = () => {
  const processData = 1;
  return processData;
};";
        let findings = run_detector(&StructureDetector, source, &[], None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::MissingFunction);
        assert_eq!(findings[0].line, Some(1));
        assert!(findings[0].message.starts_with("Missing required function `processData`"));
    }

    #[test]
    fn test_zero_parameters_warns() {
        let findings = run_detector(&StructureDetector, "\nfunction processData() { return {}; }", &[], None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::BestPractice);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].line, Some(2));
    }

    #[test]
    fn test_single_parameter_suggests_properties_when_used() {
        let source = "function processData(inputs) { return { Out: properties.prefix + inputs.In }; }";
        let findings = run_detector(&StructureDetector, source, &[], None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert!(findings[0].message.contains("properties"));

        let quiet = "function processData(inputs) { return { Out: inputs.properties }; }";
        assert!(run_detector(&StructureDetector, quiet, &[], None).is_empty());
    }

    #[test]
    fn test_two_parameters_are_enough() {
        let source = "async function processData(inputs, properties) { return {}; }";
        assert!(run_detector(&StructureDetector, source, &[], None).is_empty());
    }

    #[test]
    fn test_duplicate_declarations() {
        let source = "function processData(a, b) { return {}; }\nfunction processData(a, b) { return {}; }";
        let findings = run_detector(&StructureDetector, source, &[], None);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("declared 2 times"));
        assert_eq!(findings[0].line, Some(2));
    }

    #[test]
    fn test_top_level_returns() {
        let source = "return 1;\nfunction processData(i, p) { return {}; }\n  return 2;";
        let findings = run_detector(&StructureDetector, source, &[], None);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.kind == FindingKind::Syntax && f.severity == Severity::Error));
        assert_eq!((findings[0].line, findings[0].column), (Some(1), Some(1)));
        assert_eq!((findings[1].line, findings[1].column), (Some(3), Some(3)));
    }

    #[test]
    fn test_missing_function_comes_before_top_level_return() {
        let findings = run_detector(&StructureDetector, "return 1;", &[], None);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, FindingKind::MissingFunction);
        assert_eq!(findings[1].kind, FindingKind::Syntax);
    }
}
