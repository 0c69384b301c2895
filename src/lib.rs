//! Lints JavaScript embedded in HTML and XML documents
//!
//! Scripts are extracted into fragments, verified by an analysis host
//! with a scope shared across fragments, and the host's diagnostics are
//! mapped back onto the document. The LSP server in `main.rs` is a thin
//! shell over [`linter::analyze_document`].

#![warn(clippy::all, clippy::pedantic)]

pub mod capabilities;
pub mod config;
pub mod extract;
pub mod file_processor;
pub mod fragment;
pub mod host;
pub mod initialization;
pub mod linter;
pub mod position;
pub mod remap;
pub mod scanner;
pub mod scope;
pub mod syntax;
