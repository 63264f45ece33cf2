//! Script parsing using tree-sitter
//!
//! Custom-node scripts are parsed as plain JavaScript *scripts*. The grammar
//! is error tolerant, so this module turns the first `ERROR`/`MISSING` node
//! into a [`SyntaxError`], then applies the declaration early errors the
//! grammar skips (see `early_errors`), and rejects constructs a script may
//! not contain (module declarations, JSX). A top-level `return` is accepted here
//! and reported later as a structural problem.

mod early_errors;
pub mod javascript;

pub use javascript::{
    classify, node_text, preorder, FunctionDecl, MemberAccess, ObjectLiteral, Preorder,
    PropertyKey, ReturnStmt, Syntax,
};

use anyhow::{Context, Result};
use tracing::debug;
use tree_sitter::{Language, Node, Parser, Tree};

/// A successfully parsed script
pub struct ParsedScript<'s> {
    source: &'s str,
    tree: Tree,
}

impl<'s> ParsedScript<'s> {
    pub fn source(&self) -> &'s str {
        self.source
    }

    /// The `program` node
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Top-level statements, comments excluded
    pub fn top_level(&self) -> Vec<Node<'_>> {
        let root = self.root();
        let mut cursor = root.walk();
        let statements: Vec<Node<'_>> = root
            .named_children(&mut cursor)
            .filter(|n| !is_trivia(n))
            .collect();
        statements
    }
}

/// Why a script could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Outcome of parsing. A syntax error is an expected result, not a fault.
pub enum ParseOutcome<'s> {
    Parsed(ParsedScript<'s>),
    Failed(SyntaxError),
}

/// Parse `source` as a standalone script.
///
/// Returns `Err` only for internal faults (grammar fails to load, the parser
/// produces no tree).
pub fn parse_script(source: &str) -> Result<ParseOutcome<'_>> {
    let language: Language = tree_sitter_javascript::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .context("Failed to set JavaScript language")?;

    let tree = parser
        .parse(source, None)
        .context("Parser produced no syntax tree")?;

    let script = ParsedScript { source, tree };
    if let Some(err) = first_syntax_error(&script) {
        debug!("Script rejected by parser: {}", err.message);
        return Ok(ParseOutcome::Failed(err));
    }
    Ok(ParseOutcome::Parsed(script))
}

fn first_syntax_error(script: &ParsedScript<'_>) -> Option<SyntaxError> {
    let root = script.root();
    let source = script.source();

    if root.has_error() {
        let node = javascript::preorder_all(root).find(|n| n.is_error() || n.is_missing())?;
        return Some(describe_error(node, source));
    }

    if let Some(err) = early_errors::first_early_error(root, source) {
        return Some(syntax_error_at(err.node, source, &err.message));
    }

    // The grammar accepts module syntax and JSX; a plain script does not.
    for node in script.top_level() {
        if let Syntax::Module(node) = classify(node, source) {
            return Some(syntax_error_at(
                node,
                source,
                "'import' and 'export' may appear only in modules; custom node scripts run as plain scripts",
            ));
        }
    }
    preorder(root)
        .find(|n| matches!(classify(*n, source), Syntax::Jsx(_)))
        .map(|n| syntax_error_at(n, source, "JSX syntax is not supported"))
}

fn describe_error(node: Node<'_>, source: &str) -> SyntaxError {
    if node.is_missing() {
        let expected = node.kind();
        let message = if node.is_named() {
            format!("Expected {}", expected.replace('_', " "))
        } else {
            format!("Expected `{expected}`")
        };
        return syntax_error_at(node, source, &message);
    }

    // Report the first token swallowed by the ERROR node
    let token = javascript::preorder_all(node)
        .find(|n| n.child_count() == 0 && n.end_byte() > n.start_byte())
        .unwrap_or(node);
    let text = node_text(token, source).trim();
    if text.is_empty() {
        return syntax_error_at(token, source, "Unexpected end of input");
    }
    let shown: String = text.lines().next().unwrap_or(text).chars().take(24).collect();
    syntax_error_at(token, source, &format!("Unexpected token `{shown}`"))
}

fn syntax_error_at(node: Node<'_>, source: &str, message: &str) -> SyntaxError {
    let (line, column) = location(node, source);
    SyntaxError {
        message: format!("Syntax error: {message}"),
        line: Some(line),
        column: Some(column),
    }
}

/// 1-based (line, column) of a node's start, column counted in characters
pub fn location(node: Node<'_>, source: &str) -> (u32, u32) {
    let pos = node.start_position();
    let start = node.start_byte();
    let line_start = start.saturating_sub(pos.column);
    let column = source
        .get(line_start..start)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(pos.column);
    (pos.row as u32 + 1, column as u32 + 1)
}

fn is_trivia(node: &Node<'_>) -> bool {
    matches!(node.kind(), "comment" | "hash_bang_line")
}
