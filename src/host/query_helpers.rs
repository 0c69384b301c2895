//! Query helpers for tree-sitter parsing
//!
//! Capture indices are looked up once per query and then matched by index.

use std::collections::HashMap;
use tree_sitter::{Query, QueryCapture};

/// Helper for managing query capture indices
#[derive(Debug)]
pub struct CaptureIndices {
    indices: HashMap<String, Option<u32>>,
}

impl CaptureIndices {
    /// Create a new `CaptureIndices` from a query and list of capture names
    ///
    /// # Example
    ///
    /// ```ignore
    /// let indices = CaptureIndices::from_query(&query, &["var_keyword", "debugger"]);
    /// ```
    #[must_use]
    pub fn from_query(query: &Query, names: &[&str]) -> Self {
        let indices = names
            .iter()
            .map(|name| ((*name).to_string(), query.capture_index_for_name(name)))
            .collect();
        Self { indices }
    }

    /// Capture index for a name, `None` if the query has no such capture
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u32> {
        self.indices.get(name).copied().flatten()
    }

    /// Find the first capture in a list that matches the given name
    #[must_use]
    pub fn find_capture<'a>(
        &self,
        captures: &'a [QueryCapture<'a>],
        name: &str,
    ) -> Option<&'a QueryCapture<'a>> {
        let idx = self.get(name)?;
        captures.iter().find(|c| c.index == idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_indices_creation() {
        let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();
        let query = Query::new(&language, super::super::utils::get_query_source()).unwrap();

        let indices = CaptureIndices::from_query(&query, &["var_keyword", "debugger"]);

        assert!(indices.get("var_keyword").is_some());
        assert!(indices.get("debugger").is_some());
        assert!(indices.get("nonexistent").is_none());
    }

    #[test]
    fn test_query_compiles_for_typescript() {
        let language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        assert!(Query::new(&language, super::super::utils::get_query_source()).is_ok());
    }
}
