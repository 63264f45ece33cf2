//! Typed view over the tree-sitter JavaScript syntax tree
//!
//! Detectors never match on raw node-kind strings. They walk the tree with
//! [`preorder`] and [`classify`] each node into a [`Syntax`] variant, which
//! wraps the node in a small accessor struct for the shapes they care about.

use std::borrow::Cow;
use tree_sitter::Node;

/// Extract text from a tree-sitter node.
pub fn node_text<'a>(node: Node<'a>, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Node kinds the detectors distinguish
#[derive(Debug, Clone, Copy)]
pub enum Syntax<'a> {
    Function(FunctionDecl<'a>),
    Return(ReturnStmt<'a>),
    Object(ObjectLiteral<'a>),
    Member(MemberAccess<'a>),
    /// A name in expression position (`foo`, or shorthand `{ foo }`)
    Identifier(&'a str),
    /// `const|let|var <name> = ...`
    Binding { name: &'a str, node: Node<'a> },
    /// `import` / `export` declarations
    Module(Node<'a>),
    Jsx(Node<'a>),
    Other(Node<'a>),
}

pub fn classify<'a>(node: Node<'a>, source: &'a str) -> Syntax<'a> {
    match node.kind() {
        "function_declaration" => Syntax::Function(FunctionDecl { node, source }),
        "return_statement" => Syntax::Return(ReturnStmt { node, source }),
        "object" => Syntax::Object(ObjectLiteral { node, source }),
        "member_expression" | "subscript_expression" => {
            Syntax::Member(MemberAccess { node, source })
        }
        "identifier" | "shorthand_property_identifier" => {
            Syntax::Identifier(node_text(node, source))
        }
        "variable_declarator" => match node.child_by_field_name("name") {
            Some(name) if name.kind() == "identifier" => Syntax::Binding {
                name: node_text(name, source),
                node,
            },
            _ => Syntax::Other(node),
        },
        "import_statement" | "export_statement" => Syntax::Module(node),
        kind if kind.starts_with("jsx_") => Syntax::Jsx(node),
        _ => Syntax::Other(node),
    }
}

/// `function name(params) { body }`
#[derive(Debug, Clone, Copy)]
pub struct FunctionDecl<'a> {
    node: Node<'a>,
    source: &'a str,
}

impl<'a> FunctionDecl<'a> {
    pub fn node(&self) -> Node<'a> {
        self.node
    }

    pub fn name(&self) -> Option<&'a str> {
        self.node
            .child_by_field_name("name")
            .map(|n| node_text(n, self.source))
    }

    /// Declared parameters, comments excluded
    pub fn params(&self) -> Vec<Node<'a>> {
        let Some(params) = self.node.child_by_field_name("parameters") else {
            return vec![];
        };
        let mut cursor = params.walk();
        let params: Vec<Node<'a>> = params
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();
        params
    }

    /// Name of the parameter at `index` when it is a plain identifier
    pub fn param_name(&self, index: usize) -> Option<&'a str> {
        self.params()
            .get(index)
            .filter(|n| n.kind() == "identifier")
            .map(|n| node_text(*n, self.source))
    }

    pub fn body(&self) -> Option<Node<'a>> {
        self.node.child_by_field_name("body")
    }
}

/// `return <argument>;`
#[derive(Debug, Clone, Copy)]
pub struct ReturnStmt<'a> {
    node: Node<'a>,
    source: &'a str,
}

impl<'a> ReturnStmt<'a> {
    pub fn node(&self) -> Node<'a> {
        self.node
    }

    pub fn argument(&self) -> Option<Node<'a>> {
        let mut cursor = self.node.walk();
        let arg = self
            .node
            .named_children(&mut cursor)
            .find(|n| n.kind() != "comment");
        arg
    }

    /// The returned object literal, looking through parentheses
    pub fn object(&self) -> Option<ObjectLiteral<'a>> {
        let mut arg = self.argument()?;
        while arg.kind() == "parenthesized_expression" {
            let mut cursor = arg.walk();
            let inner = arg
                .named_children(&mut cursor)
                .find(|n| n.kind() != "comment")?;
            arg = inner;
        }
        (arg.kind() == "object").then_some(ObjectLiteral {
            node: arg,
            source: self.source,
        })
    }
}

/// A statically known property key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKey<'a> {
    /// `{ name: ... }`, `{ name }`, `{ name() {} }`
    Identifier(&'a str),
    /// `{ "name": ... }`
    StringLiteral(String),
}

impl PropertyKey<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyKey::Identifier(name) => name,
            PropertyKey::StringLiteral(value) => value,
        }
    }
}

/// `{ ... }` in expression position
#[derive(Debug, Clone, Copy)]
pub struct ObjectLiteral<'a> {
    node: Node<'a>,
    source: &'a str,
}

impl<'a> ObjectLiteral<'a> {
    pub fn node(&self) -> Node<'a> {
        self.node
    }

    pub fn text(&self) -> &'a str {
        node_text(self.node, self.source)
    }

    /// Keys that can be resolved without evaluation. Computed keys, numeric
    /// keys and spreads are skipped.
    pub fn keys(&self) -> Vec<PropertyKey<'a>> {
        let mut keys = Vec::new();
        let mut cursor = self.node.walk();
        for member in self.node.named_children(&mut cursor) {
            let key = match member.kind() {
                "pair" => member.child_by_field_name("key"),
                "method_definition" => member.child_by_field_name("name"),
                "shorthand_property_identifier" => Some(member),
                _ => None,
            };
            let Some(key) = key else { continue };
            match key.kind() {
                "property_identifier" | "shorthand_property_identifier" => {
                    keys.push(PropertyKey::Identifier(node_text(key, self.source)));
                }
                "string" => keys.push(PropertyKey::StringLiteral(string_value(key, self.source))),
                _ => {}
            }
        }
        keys
    }
}

/// `object.property` or `object[index]`
#[derive(Debug, Clone, Copy)]
pub struct MemberAccess<'a> {
    node: Node<'a>,
    source: &'a str,
}

impl<'a> MemberAccess<'a> {
    pub fn node(&self) -> Node<'a> {
        self.node
    }

    /// Name of the accessed object when it is a plain identifier
    pub fn object_name(&self) -> Option<&'a str> {
        self.node
            .child_by_field_name("object")
            .filter(|n| n.kind() == "identifier")
            .map(|n| node_text(n, self.source))
    }

    /// Statically known property name: `.name` or `["name"]`
    pub fn property_name(&self) -> Option<Cow<'a, str>> {
        if let Some(prop) = self.node.child_by_field_name("property") {
            return (prop.kind() == "property_identifier")
                .then(|| Cow::Borrowed(node_text(prop, self.source)));
        }
        let index = self.node.child_by_field_name("index")?;
        (index.kind() == "string").then(|| Cow::Owned(string_value(index, self.source)))
    }
}

/// Value of a string literal node with simple escapes decoded
pub fn string_value(node: Node<'_>, source: &str) -> String {
    let mut value = String::new();
    let mut cursor = node.walk();
    for part in node.named_children(&mut cursor) {
        let text = node_text(part, source);
        match part.kind() {
            "string_fragment" => value.push_str(text),
            "escape_sequence" => value.push_str(&decode_escape(text)),
            _ => {}
        }
    }
    value
}

fn decode_escape(seq: &str) -> Cow<'_, str> {
    let decoded = match seq {
        "\\n" => '\n',
        "\\t" => '\t',
        "\\r" => '\r',
        "\\0" => '\0',
        "\\\\" => '\\',
        "\\'" => '\'',
        "\\\"" => '"',
        _ => {
            let hex = seq
                .strip_prefix("\\u{")
                .and_then(|s| s.strip_suffix('}'))
                .or_else(|| seq.strip_prefix("\\u"))
                .or_else(|| seq.strip_prefix("\\x"));
            match hex
                .and_then(|h| u32::from_str_radix(h, 16).ok())
                .and_then(char::from_u32)
            {
                Some(c) => c,
                // line continuations and unknown escapes keep their text
                None => return Cow::Borrowed(seq.strip_prefix('\\').unwrap_or(seq)),
            }
        }
    };
    Cow::Owned(decoded.to_string())
}

/// Pre-order walk over a subtree on an explicit stack, so deeply nested
/// scripts cannot exhaust the call stack.
pub struct Preorder<'a> {
    stack: Vec<Node<'a>>,
    named_only: bool,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Node<'a>> {
        let node = self.stack.pop()?;
        let mut cursor = node.walk();
        let children: Vec<Node<'a>> = if self.named_only {
            node.named_children(&mut cursor).collect()
        } else {
            node.children(&mut cursor).collect()
        };
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

/// Named nodes of a subtree, root first, in source order
pub fn preorder(root: Node<'_>) -> Preorder<'_> {
    Preorder {
        stack: vec![root],
        named_only: true,
    }
}

/// Every node of a subtree including anonymous tokens
pub fn preorder_all(root: Node<'_>) -> Preorder<'_> {
    Preorder {
        stack: vec![root],
        named_only: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{parse_script, ParseOutcome};

    fn with_script(source: &str, f: impl FnOnce(&crate::parsers::ParsedScript<'_>)) {
        match parse_script(source).expect("parser should load") {
            ParseOutcome::Parsed(script) => f(&script),
            ParseOutcome::Failed(err) => panic!("unexpected syntax error: {}", err.message),
        }
    }

    fn first_object<'a>(root: Node<'a>, source: &'a str) -> ObjectLiteral<'a> {
        preorder(root)
            .find_map(|n| match classify(n, source) {
                Syntax::Return(ret) => ret.object(),
                _ => None,
            })
            .expect("a returned object")
    }

    #[test]
    fn test_function_decl_accessors() {
        let source = "async function processData(inputs, /* note */ properties, llm = null) {}";
        with_script(source, |script| {
            let Syntax::Function(func) = classify(script.top_level()[0], source) else {
                panic!("expected function");
            };
            assert_eq!(func.name(), Some("processData"));
            assert_eq!(func.params().len(), 3);
            assert_eq!(func.param_name(0), Some("inputs"));
            assert_eq!(func.param_name(2), None);
            assert!(func.body().is_some());
        });
    }

    #[test]
    fn test_object_keys() {
        let source = r#"function f(a) {
            const Short = 1;
            return ({ Plain: 1, "Quoted Key": 2, 'it\'s': 3, Short, method() {}, [a]: 4, 5: 6, ...a });
        }"#;
        with_script(source, |script| {
            let object = first_object(script.root(), source);
            let keys: Vec<String> = object.keys().iter().map(|k| k.as_str().to_string()).collect();
            assert_eq!(keys, vec!["Plain", "Quoted Key", "it's", "Short", "method"]);
        });
    }

    #[test]
    fn test_member_access() {
        let source = "x = inputs.First + inputs['Second'] + inputs[key] + other.inputs.Third;";
        with_script(source, |script| {
            let members: Vec<(Option<&str>, Option<String>)> = preorder(script.root())
                .filter_map(|n| match classify(n, source) {
                    Syntax::Member(m) => Some((m.object_name(), m.property_name().map(|p| p.into_owned()))),
                    _ => None,
                })
                .collect();
            assert!(members.contains(&(Some("inputs"), Some("First".to_string()))));
            assert!(members.contains(&(Some("inputs"), Some("Second".to_string()))));
            assert!(members.contains(&(Some("inputs"), None)));
            assert!(members.contains(&(None, Some("Third".to_string()))));
        });
    }

    #[test]
    fn test_preorder_is_source_ordered() {
        let source = "a; b; c;";
        with_script(source, |script| {
            let names: Vec<&str> = preorder(script.root())
                .filter_map(|n| match classify(n, source) {
                    Syntax::Identifier(name) => Some(name),
                    _ => None,
                })
                .collect();
            assert_eq!(names, vec!["a", "b", "c"]);
        });
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let depth = 2_000;
        let source = format!("x = {}1{};", "(".repeat(depth), ")".repeat(depth));
        with_script(&source, |script| {
            assert!(preorder(script.root()).count() > depth);
        });
    }
}
