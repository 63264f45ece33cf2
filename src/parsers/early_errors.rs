//! Early errors the grammar does not enforce
//!
//! tree-sitter accepts `const x;` and `let a; let a;`, but an engine refuses
//! to run either. This pass checks declarations per scope:
//!
//! - `const` declarators need an initializer
//! - `let` / `const` / `class` names are unique within a block or program
//! - a lexical name may not also be a `var` (hoisted through nested blocks),
//!   a function declared in the same scope, or a parameter of the function
//!   whose body is the scope

use super::javascript::{node_text, preorder};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

pub(super) struct EarlyError<'a> {
    pub node: Node<'a>,
    pub message: String,
}

/// The earliest early error in source order
pub(super) fn first_early_error<'a>(root: Node<'a>, source: &'a str) -> Option<EarlyError<'a>> {
    let mut errors = Vec::new();
    let mut var_names: HashMap<usize, HashSet<&'a str>> = HashMap::new();

    for node in preorder(root) {
        match node.kind() {
            "lexical_declaration" => check_const_initializers(node, source, &mut errors),
            "variable_declaration" => hoist_var_names(node, source, &mut var_names),
            _ => {}
        }
    }

    let empty = HashSet::new();
    for scope in preorder(root).filter(is_scope) {
        let vars = var_names.get(&scope.id()).unwrap_or(&empty);
        check_scope(scope, source, vars, &mut errors);
    }

    errors.into_iter().min_by_key(|e| e.node.start_byte())
}

fn is_scope(node: &Node<'_>) -> bool {
    matches!(node.kind(), "program" | "statement_block" | "switch_body")
}

fn is_function_boundary(node: &Node<'_>) -> bool {
    matches!(
        node.kind(),
        "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
            | "class_static_block"
    )
}

fn check_const_initializers<'a>(decl: Node<'a>, source: &'a str, errors: &mut Vec<EarlyError<'a>>) {
    let is_const = decl
        .child_by_field_name("kind")
        .is_some_and(|k| node_text(k, source) == "const");
    if !is_const {
        return;
    }
    let mut cursor = decl.walk();
    for declarator in decl.named_children(&mut cursor) {
        if declarator.kind() == "variable_declarator" && declarator.child_by_field_name("value").is_none() {
            errors.push(EarlyError {
                node: declarator,
                message: "Missing initializer in const declaration".to_string(),
            });
        }
    }
}

/// Record each `var` name in every scope between the declaration and its
/// enclosing function
fn hoist_var_names<'a>(decl: Node<'a>, source: &'a str, var_names: &mut HashMap<usize, HashSet<&'a str>>) {
    let names: Vec<&'a str> = declarator_names(decl, source)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    let mut current = decl.parent();
    while let Some(node) = current {
        if is_scope(&node) {
            var_names.entry(node.id()).or_default().extend(names.iter().copied());
        }
        if is_function_boundary(&node) {
            break;
        }
        current = node.parent();
    }
}

fn check_scope<'a>(
    scope: Node<'a>,
    source: &'a str,
    vars: &HashSet<&'a str>,
    errors: &mut Vec<EarlyError<'a>>,
) {
    let params: HashSet<&str> = function_params(scope, source).into_iter().map(|(n, _)| n).collect();
    let mut lexical: HashSet<&str> = HashSet::new();
    let mut functions: HashSet<&str> = HashSet::new();

    for stmt in scope_statements(scope) {
        match stmt.kind() {
            "lexical_declaration" | "class_declaration" => {
                for (name, node) in lexical_names(stmt, source) {
                    let clash = lexical.contains(name)
                        || functions.contains(name)
                        || params.contains(name)
                        || vars.contains(name);
                    if clash {
                        errors.push(already_declared(name, node));
                    }
                    lexical.insert(name);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                let Some(name_node) = stmt.child_by_field_name("name") else {
                    continue;
                };
                let name = node_text(name_node, source);
                if lexical.contains(name) {
                    errors.push(already_declared(name, name_node));
                }
                functions.insert(name);
            }
            _ => {}
        }
    }
}

fn already_declared<'a>(name: &str, node: Node<'a>) -> EarlyError<'a> {
    EarlyError {
        node,
        message: format!("Identifier '{name}' has already been declared"),
    }
}

/// Statements directly inside a scope; `case` bodies share the switch scope
fn scope_statements(scope: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = scope.walk();
    let children: Vec<Node<'_>> = scope.named_children(&mut cursor).collect();
    if scope.kind() != "switch_body" {
        return children;
    }

    let mut statements = Vec::new();
    for case in children {
        let value = case.child_by_field_name("value").map(|v| v.id());
        let mut cursor = case.walk();
        statements.extend(case.named_children(&mut cursor).filter(|n| Some(n.id()) != value));
    }
    statements
}

/// Parameters of the function whose body is `scope`
fn function_params<'a>(scope: Node<'a>, source: &'a str) -> Vec<(&'a str, Node<'a>)> {
    let Some(function) = scope.parent().filter(is_function_boundary) else {
        return vec![];
    };
    if let Some(params) = function.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        let patterns: Vec<Node<'a>> = params.named_children(&mut cursor).collect();
        return patterns
            .into_iter()
            .flat_map(|p| binding_names(p, source))
            .collect();
    }
    function
        .child_by_field_name("parameter")
        .map(|p| binding_names(p, source))
        .unwrap_or_default()
}

fn lexical_names<'a>(stmt: Node<'a>, source: &'a str) -> Vec<(&'a str, Node<'a>)> {
    if stmt.kind() == "class_declaration" {
        return stmt
            .child_by_field_name("name")
            .map(|n| vec![(node_text(n, source), n)])
            .unwrap_or_default();
    }
    declarator_names(stmt, source)
}

/// Names bound by the declarators of a `let`/`const`/`var` declaration
fn declarator_names<'a>(decl: Node<'a>, source: &'a str) -> Vec<(&'a str, Node<'a>)> {
    let mut cursor = decl.walk();
    let declarators: Vec<Node<'a>> = decl
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "variable_declarator")
        .collect();
    declarators
        .into_iter()
        .filter_map(|d| d.child_by_field_name("name"))
        .flat_map(|pattern| binding_names(pattern, source))
        .collect()
}

/// Identifiers bound by a binding pattern, in source order. Default values
/// and property keys are not bindings.
fn binding_names<'a>(pattern: Node<'a>, source: &'a str) -> Vec<(&'a str, Node<'a>)> {
    let mut names = Vec::new();
    let mut stack = vec![pattern];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                names.push((node_text(node, source), node));
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                stack.extend(node.child_by_field_name("left"));
            }
            "pair_pattern" => {
                stack.extend(node.child_by_field_name("value"));
            }
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                let mut cursor = node.walk();
                let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
            _ => {}
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use crate::parsers::{parse_script, ParseOutcome, SyntaxError};

    fn early_error(source: &str) -> Option<SyntaxError> {
        match parse_script(source).expect("parser should load") {
            ParseOutcome::Failed(err) => Some(err),
            ParseOutcome::Parsed(_) => None,
        }
    }

    #[test]
    fn test_const_without_initializer() {
        let err = early_error("const x;\nfunction processData(i, p) { return { Out: 1 }; }")
            .expect("const without initializer");
        assert_eq!(err.message, "Syntax error: Missing initializer in const declaration");
        assert_eq!((err.line, err.column), (Some(1), Some(7)));
    }

    #[test]
    fn test_duplicate_lexical_declaration() {
        let err = early_error("let a = 1; let a = 2;\nfunction processData(i, p) { return {}; }")
            .expect("duplicate let");
        assert_eq!(err.message, "Syntax error: Identifier 'a' has already been declared");
        assert_eq!((err.line, err.column), (Some(1), Some(16)));
    }

    #[test]
    fn test_lexical_conflicts() {
        let cases = [
            "const a = 1, a = 2;",
            "class A {}\nlet A = 1;",
            "function f() {}\nlet f = 1;",
            "let f = 1;\nfunction f() {}",
            "var v = 1;\nlet v = 2;",
            "let v = 1;\n{ var v = 2; }",
            "function g(x) { let x = 1; }",
            "const h = (y) => { const y = 1; };",
            "function k({ a, b: [c] }) { let c; }",
            "switch (x) { case 1: let s = 1; break; case 2: let s = 2; }",
        ];
        for case in cases {
            let err = early_error(case).unwrap_or_else(|| panic!("expected an early error for {case:?}"));
            assert!(err.message.contains("has already been declared"), "{case:?}: {}", err.message);
        }
    }

    #[test]
    fn test_legal_shadowing_is_accepted() {
        let cases = [
            "let a = 1;\n{ let a = 2; }",
            "let a = 1;\nfunction f() { var a = 2; }",
            "{ let b = 1; }\nvar b = 2;",
            "var c = 1; var c = 2;",
            "function d() {}\nfunction d() {}",
            "for (let i = 0; i < 1; i++) { let i = 2; }",
            "for (const item of list) { const item2 = item; }",
            "const { a = other, b: renamed } = obj;\nlet other = 1;\nlet b = 2;",
            "function e(x) { { let x = 1; } }",
        ];
        for case in cases {
            assert!(early_error(case).is_none(), "unexpected early error for {case:?}");
        }
    }
}
