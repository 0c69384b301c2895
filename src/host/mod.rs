//! Reference verify host built on tree-sitter
//!
//! Parses JavaScript or TypeScript text, runs a lexical scope analysis and
//! a small rule set over it. The host knows nothing about markup: it sees
//! one plain program per call.

pub mod globals;
pub mod query_helpers;
pub mod rules;
pub mod scope_analysis;
pub mod utils;

use crate::linter::{ParserKind, Verifier, VerifyOutcome, VerifyRequest};
use crate::scope::{ScopeObservation, ScopePass};
use rules::RuleContext;
use scope_analysis::ScopeTree;
use tree_sitter::{Language, Parser};
use utils::CharOffsets;

/// Verifier backed by the tree-sitter JavaScript and TypeScript grammars
///
/// Holds no parser between calls, so it is `Send + Sync` and every call
/// starts fresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterVerifier;

impl TreeSitterVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn language(kind: ParserKind) -> Language {
        match kind {
            ParserKind::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            ParserKind::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

impl Verifier for TreeSitterVerifier {
    fn verify(&mut self, request: &VerifyRequest<'_>) -> VerifyOutcome {
        let config = request.config;
        let language = Self::language(config.parser);
        let observe = matches!(request.scope, ScopePass::Observe);

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&language) {
            tracing::error!(parser = ?config.parser, error = %e, "failed to set language");
            return VerifyOutcome::default();
        }
        let Some(tree) = parser.parse(request.text, None) else {
            tracing::error!(parser = ?config.parser, "parser returned no tree");
            return VerifyOutcome::default();
        };

        let offsets = CharOffsets::new(request.text);
        let ctx = RuleContext {
            content: request.text,
            offsets: &offsets,
            config,
        };
        let root = tree.root_node();

        if let Some(fatal) = rules::parse_error(root, &ctx) {
            tracing::debug!(
                file = ?request.location.filename,
                line = fatal.line,
                "fragment does not parse"
            );
            return VerifyOutcome {
                diagnostics: vec![fatal],
                observation: observe.then(ScopeObservation::default),
            };
        }

        let mut scopes = ScopeTree::analyze(root, request.text);
        match request.scope {
            ScopePass::Standalone => {}
            ScopePass::Observe => {
                return VerifyOutcome {
                    diagnostics: Vec::new(),
                    observation: Some(scopes.observe(config)),
                };
            }
            ScopePass::Apply(adjustments) => {
                scopes.mark_used(&adjustments.used_later);
                scopes.predeclare(&adjustments.declared_earlier);
            }
        }

        let mut diagnostics = rules::no_undef(&scopes, &ctx);
        diagnostics.extend(rules::no_unused_vars(&scopes, &ctx));
        diagnostics.extend(rules::syntactic_rules(root, &language, &ctx));
        diagnostics.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.column.cmp(&b.column)));

        VerifyOutcome {
            diagnostics,
            observation: None,
        }
    }
}
