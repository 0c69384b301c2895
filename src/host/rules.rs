//! Rule implementations over a parsed program

use super::query_helpers::CaptureIndices;
use super::scope_analysis::{ScopeTree, VariableKind};
use super::utils::{get_query_source, CharOffsets, NodeTextExt};
use crate::linter::AnalysisConfig;
use crate::syntax::{Diagnostic, Severity};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Query, QueryCursor};

pub const NO_UNDEF: &str = "no-undef";
pub const NO_UNUSED_VARS: &str = "no-unused-vars";
pub const NO_VAR: &str = "no-var";
pub const NO_DEBUGGER: &str = "no-debugger";

/// What every rule gets to look at
pub struct RuleContext<'a> {
    pub content: &'a str,
    pub offsets: &'a CharOffsets,
    pub config: &'a AnalysisConfig,
}

impl RuleContext<'_> {
    fn report(
        &self,
        rule: &str,
        severity: Severity,
        message: String,
        (start_byte, end_byte): (usize, usize),
    ) -> Diagnostic {
        let start = self.offsets.location(start_byte);
        let end = self.offsets.location(end_byte);
        Diagnostic::new(Some(rule), severity, message, start.line, start.column)
            .with_end(end.line, end.column)
    }
}

/// References to names nothing declares
pub fn no_undef(tree: &ScopeTree, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
    let severity = ctx.config.severity(NO_UNDEF);
    if !severity.is_enabled() {
        return Vec::new();
    }

    tree.undeclared(ctx.config)
        .filter(|reference| !reference.in_typeof)
        .map(|reference| {
            ctx.report(
                NO_UNDEF,
                severity,
                format!("'{}' is not defined.", reference.name),
                (reference.start_byte, reference.end_byte),
            )
        })
        .collect()
}

/// Declarations that are never read
pub fn no_unused_vars(tree: &ScopeTree, ctx: &RuleContext<'_>) -> Vec<Diagnostic> {
    let severity = ctx.config.severity(NO_UNUSED_VARS);
    if !severity.is_enabled() {
        return Vec::new();
    }

    tree.variables()
        .filter(|v| !matches!(v.kind, VariableKind::Parameter | VariableKind::Implicit))
        .filter(|v| !v.read && !v.exported)
        .map(|v| {
            let message = if v.assigned {
                format!("'{}' is assigned a value but never used.", v.name)
            } else {
                format!("'{}' is defined but never used.", v.name)
            };
            ctx.report(NO_UNUSED_VARS, severity, message, (v.start_byte, v.end_byte))
        })
        .collect()
}

/// `no-var` and `no-debugger`, selected through the rule query
pub fn syntactic_rules(
    root: Node<'_>,
    language: &Language,
    ctx: &RuleContext<'_>,
) -> Vec<Diagnostic> {
    let no_var = ctx.config.severity(NO_VAR);
    let no_debugger = ctx.config.severity(NO_DEBUGGER);
    if !no_var.is_enabled() && !no_debugger.is_enabled() {
        return Vec::new();
    }

    let query = match Query::new(language, get_query_source()) {
        Ok(query) => query,
        Err(e) => {
            tracing::error!(error = %e, "rule query does not compile");
            return Vec::new();
        }
    };
    let indices =
        CaptureIndices::from_query(&query, &["var_declaration", "var_keyword", "debugger"]);

    let mut diagnostics = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, ctx.content.as_bytes());

    while let Some(m) = matches.next() {
        if no_var.is_enabled() {
            if let (Some(declaration), Some(keyword)) = (
                indices.find_capture(m.captures, "var_declaration"),
                indices.find_capture(m.captures, "var_keyword"),
            ) {
                let keyword = keyword.node;
                let fix_start = ctx.offsets.char_index(keyword.start_byte());
                let fix_end = ctx.offsets.char_index(keyword.end_byte());
                diagnostics.push(
                    ctx.report(
                        NO_VAR,
                        no_var,
                        "Unexpected var, use let or const instead.".to_string(),
                        (declaration.node.start_byte(), declaration.node.end_byte()),
                    )
                    .with_fix(fix_start, fix_end, "let"),
                );
            }
        }

        if no_debugger.is_enabled() {
            if let Some(statement) = indices.find_capture(m.captures, "debugger") {
                diagnostics.push(ctx.report(
                    NO_DEBUGGER,
                    no_debugger,
                    "Unexpected 'debugger' statement.".to_string(),
                    (statement.node.start_byte(), statement.node.end_byte()),
                ));
            }
        }
    }

    diagnostics
}

/// Tokens that cannot end a program
const CONTINUATION_TOKENS: &[&str] = &[
    "(", "[", "{", ",", ".", "=", "=>", "?", ":", "+", "-", "*", "/", "%", "&&", "||", "??",
];

/// First syntax error of the tree as a fatal diagnostic
pub fn parse_error(root: Node<'_>, ctx: &RuleContext<'_>) -> Option<Diagnostic> {
    let node = first_error(root)?;

    // input that stops mid-construct fails where it ends
    let end_of_input = ctx.content.trim_end().len();
    let ends_early = !node.is_missing()
        && last_leaf(node).is_some_and(|leaf| {
            leaf.end_byte() >= end_of_input && CONTINUATION_TOKENS.contains(&leaf.kind())
        });

    let token = if node.is_missing() || ends_early {
        String::new()
    } else {
        first_leaf(node)
            .map(|leaf| leaf.text_ref(ctx.content).trim().to_string())
            .unwrap_or_default()
    };
    let message = if token.is_empty() {
        "Parsing error: Unexpected token".to_string()
    } else {
        format!("Parsing error: Unexpected token {token}")
    };

    // an ERROR node may start on whitespace, report its first token
    let start = if ends_early {
        end_of_input
    } else {
        first_leaf(node).map_or(node.start_byte(), |leaf| leaf.start_byte())
    };
    let location = ctx.offsets.location(start);
    Some(Diagnostic::new(None, Severity::Error, message, location.line, location.column).fatal())
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error).or(Some(node))
}

fn first_leaf(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    while cursor.goto_first_child() {}
    let leaf = cursor.node();
    (leaf.start_byte() < leaf.end_byte()).then_some(leaf)
}

/// Last token of a node that covers some text
fn last_leaf(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let last = node
        .children(&mut cursor)
        .filter(|child| child.start_byte() < child.end_byte())
        .last();
    match last {
        Some(child) => last_leaf(child),
        None => (node.start_byte() < node.end_byte()).then_some(node),
    }
}
