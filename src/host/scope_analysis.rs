//! Lexical scope analysis over a tree-sitter syntax tree
//!
//! The walk records scopes, declared variables and identifier references.
//! References are resolved only once the walk is over, so hoisted `var`
//! and function declarations are visible before their text position.

use super::globals::is_known_global;
use super::utils::NodeTextExt;
use crate::linter::AnalysisConfig;
use crate::scope::ScopeObservation;
use std::collections::{BTreeSet, HashMap};
use tree_sitter::Node;

pub type ScopeId = usize;
pub type VariableId = usize;

/// Scope of the program text
pub const GLOBAL_SCOPE: ScopeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Parameter,
    CatchParameter,
    Import,
    /// `arguments` and the name of a function expression
    Implicit,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    names: HashMap<String, VariableId>,
}

#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub scope: ScopeId,
    /// Byte range of the declaring identifier
    pub start_byte: usize,
    pub end_byte: usize,
    /// Has an initializer or is assigned somewhere
    pub assigned: bool,
    pub read: bool,
    pub exported: bool,
}

#[derive(Debug)]
pub struct Reference {
    pub name: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub scope: ScopeId,
    /// Plain assignment target
    pub write: bool,
    /// Operand of `typeof`
    pub in_typeof: bool,
    pub resolved: Option<VariableId>,
}

/// Scopes, variables and references of one program
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
    references: Vec<Reference>,
    /// Names declared outside of the analysed text
    predeclared: BTreeSet<String>,
}

impl ScopeTree {
    /// Analyse the tree rooted at `root`
    #[must_use]
    pub fn analyze(root: Node<'_>, content: &str) -> Self {
        let mut analyzer = Analyzer {
            content,
            tree: Self::default(),
            exporting: false,
        };
        let global = analyzer.push_scope(ScopeKind::Global, None);
        analyzer.visit_children(root, global);
        analyzer.tree.resolve();
        analyzer.tree
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter()
    }

    /// Variables declared in the top-level scope
    pub fn global_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables
            .iter()
            .filter(|v| v.scope == GLOBAL_SCOPE && v.kind != VariableKind::Implicit)
    }

    /// References that nothing declares, in text order
    pub fn undeclared<'s, 'c>(
        &'s self,
        config: &'c AnalysisConfig,
    ) -> impl Iterator<Item = &'s Reference> + use<'s, 'c> {
        self.references.iter().filter(move |r| {
            r.resolved.is_none()
                && !self.predeclared.contains(&r.name)
                && !is_known_global(&r.name, config)
        })
    }

    /// What this program needs from and offers to its neighbours
    #[must_use]
    pub fn observe(&self, config: &AnalysisConfig) -> ScopeObservation {
        ScopeObservation {
            through: self.undeclared(config).map(|r| r.name.clone()).collect(),
            declared: self.global_variables().map(|v| v.name.clone()).collect(),
        }
    }

    /// Count top-level variables named in `names` as read
    pub fn mark_used<'n>(&mut self, names: impl IntoIterator<Item = &'n String>) {
        for name in names {
            if let Some(&id) = self.scopes[GLOBAL_SCOPE].names.get(name) {
                self.variables[id].read = true;
            }
        }
    }

    /// Treat `names` as declared by someone else
    pub fn predeclare<'n>(&mut self, names: impl IntoIterator<Item = &'n String>) {
        self.predeclared.extend(names.into_iter().cloned());
    }

    fn resolve(&mut self) {
        for reference in &mut self.references {
            let mut current = Some(reference.scope);
            while let Some(id) = current {
                let scope = &self.scopes[id];
                if let Some(&variable) = scope.names.get(&reference.name) {
                    reference.resolved = Some(variable);
                    break;
                }
                current = scope.parent;
            }

            if let Some(id) = reference.resolved {
                let variable = &mut self.variables[id];
                if reference.write {
                    variable.assigned = true;
                } else {
                    variable.read = true;
                }
            }
        }
    }
}

/// Value of the expression is thrown away
fn is_statement(node: Node<'_>) -> bool {
    node.parent()
        .is_some_and(|parent| parent.kind() == "expression_statement")
}

struct Analyzer<'a> {
    content: &'a str,
    tree: ScopeTree,
    /// Inside the declaration of an `export` statement
    exporting: bool,
}

impl Analyzer<'_> {
    fn push_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        self.tree.scopes.push(Scope {
            kind,
            parent,
            names: HashMap::new(),
        });
        self.tree.scopes.len() - 1
    }

    /// Nearest function or global scope
    fn hoist_target(&self, mut scope: ScopeId) -> ScopeId {
        loop {
            let current = &self.tree.scopes[scope];
            match (current.kind, current.parent) {
                (ScopeKind::Block, Some(parent)) => scope = parent,
                _ => return scope,
            }
        }
    }

    fn declare(&mut self, node: Node<'_>, scope: ScopeId, kind: VariableKind, assigned: bool) {
        let name = node.text_or_default(self.content);
        if name.is_empty() {
            return;
        }
        self.declare_name(name, scope, kind, (node.start_byte(), node.end_byte()), assigned);
    }

    fn declare_name(
        &mut self,
        name: String,
        scope: ScopeId,
        kind: VariableKind,
        (start_byte, end_byte): (usize, usize),
        assigned: bool,
    ) {
        let scope = if kind == VariableKind::Var {
            self.hoist_target(scope)
        } else {
            scope
        };

        if let Some(&existing) = self.tree.scopes[scope].names.get(&name) {
            let variable = &mut self.tree.variables[existing];
            variable.assigned |= assigned;
            variable.exported |= self.exporting;
            return;
        }

        let id = self.tree.variables.len();
        self.tree.scopes[scope].names.insert(name.clone(), id);
        self.tree.variables.push(Variable {
            name,
            kind,
            scope,
            start_byte,
            end_byte,
            assigned,
            read: false,
            exported: self.exporting,
        });
    }

    fn reference(&mut self, node: Node<'_>, scope: ScopeId, write: bool, in_typeof: bool) {
        let name = node.text_or_default(self.content);
        if name.is_empty() {
            return;
        }
        self.tree.references.push(Reference {
            name,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            scope,
            write,
            in_typeof,
            resolved: None,
        });
    }

    fn visit_children(&mut self, node: Node<'_>, scope: ScopeId) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, scope);
        }
    }

    fn visit_field(&mut self, node: Node<'_>, field: &str, scope: ScopeId) {
        if let Some(child) = node.child_by_field_name(field) {
            self.visit(child, scope);
        }
    }

    fn visit(&mut self, node: Node<'_>, scope: ScopeId) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier" => {
                self.reference(node, scope, false, false);
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.declare(name, scope, VariableKind::Function, false);
                }
                self.visit_function(node, scope, None);
            }
            "function_expression" | "function" | "generator_function" => {
                let name = node.child_by_field_name("name");
                self.visit_function(node, scope, name);
            }
            "arrow_function" => self.visit_function(node, scope, None),
            "method_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    if name.kind() == "computed_property_name" {
                        self.visit(name, scope);
                    }
                }
                self.visit_function(node, scope, None);
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.declare(name, scope, VariableKind::Class, false);
                }
                self.visit_class(node, scope);
            }
            "class" => {
                let inner = self.push_scope(ScopeKind::Block, Some(scope));
                if let Some(name) = node.child_by_field_name("name") {
                    self.declare(name, inner, VariableKind::Implicit, false);
                }
                self.visit_class(node, inner);
            }
            "enum_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.declare(name, scope, VariableKind::Class, false);
                }
            }
            "variable_declaration" => self.visit_declaration(node, scope, VariableKind::Var),
            "lexical_declaration" => {
                let kind = match node.child_by_field_name("kind") {
                    Some(kind) if kind.text_ref(self.content) == "const" => VariableKind::Const,
                    _ => VariableKind::Let,
                };
                self.visit_declaration(node, scope, kind);
            }
            "statement_block" => {
                let inner = self.push_scope(ScopeKind::Block, Some(scope));
                self.visit_children(node, inner);
            }
            "for_statement" => {
                let inner = self.push_scope(ScopeKind::Block, Some(scope));
                self.visit_children(node, inner);
            }
            "for_in_statement" => self.visit_for_in(node, scope),
            "catch_clause" => {
                let inner = self.push_scope(ScopeKind::Block, Some(scope));
                if let Some(parameter) = node.child_by_field_name("parameter") {
                    self.bind_pattern(parameter, VariableKind::CatchParameter, inner, false);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_children(body, inner);
                }
            }
            "import_statement" => self.visit_import(node, scope),
            "export_statement" => self.visit_export(node, scope),
            "assignment_expression" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.visit_target(left, scope);
                }
                self.visit_field(node, "right", scope);
            }
            // `x += 1;` and `x++;` as statements only write
            "augmented_assignment_expression" | "update_expression" if is_statement(node) => {
                let target = node
                    .child_by_field_name("left")
                    .or_else(|| node.child_by_field_name("argument"));
                match target {
                    Some(target) if target.kind() == "identifier" => {
                        self.reference(target, scope, true, false);
                        self.visit_field(node, "right", scope);
                    }
                    _ => self.visit_children(node, scope),
                }
            }
            "unary_expression" => {
                let is_typeof = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| op.kind() == "typeof");
                match node.child_by_field_name("argument") {
                    Some(argument) if is_typeof && argument.kind() == "identifier" => {
                        self.reference(argument, scope, false, true);
                    }
                    _ => self.visit_children(node, scope),
                }
            }
            "labeled_statement" => self.visit_field(node, "body", scope),
            "jsx_opening_element" | "jsx_self_closing_element" => {
                let name = node.child_by_field_name("name").map(|n| n.id());
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if Some(child.id()) != name {
                        self.visit(child, scope);
                    }
                }
            }
            // names only, or types
            "break_statement"
            | "continue_statement"
            | "jsx_closing_element"
            | "type_annotation"
            | "type_arguments"
            | "type_parameters"
            | "implements_clause"
            | "interface_declaration"
            | "type_alias_declaration"
            | "ambient_declaration"
            | "function_signature" => {}
            _ => self.visit_children(node, scope),
        }
    }

    fn visit_function(&mut self, node: Node<'_>, outer: ScopeId, self_name: Option<Node<'_>>) {
        let scope = self.push_scope(ScopeKind::Function, Some(outer));
        if let Some(name) = self_name {
            self.declare(name, scope, VariableKind::Implicit, false);
        }
        if node.kind() != "arrow_function" {
            self.declare_name(
                "arguments".to_string(),
                scope,
                VariableKind::Implicit,
                (node.start_byte(), node.start_byte()),
                false,
            );
        }

        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for parameter in parameters.named_children(&mut cursor) {
                self.bind_pattern(parameter, VariableKind::Parameter, scope, false);
            }
        } else if let Some(parameter) = node.child_by_field_name("parameter") {
            self.bind_pattern(parameter, VariableKind::Parameter, scope, false);
        }

        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() == "statement_block" {
                self.visit_children(body, scope);
            } else {
                self.visit(body, scope);
            }
        }
    }

    fn visit_class(&mut self, node: Node<'_>, scope: ScopeId) {
        let name = node.child_by_field_name("name").map(|n| n.id());
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if Some(child.id()) != name {
                self.visit(child, scope);
            }
        }
    }

    fn visit_declaration(&mut self, node: Node<'_>, scope: ScopeId, kind: VariableKind) {
        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let value = declarator.child_by_field_name("value");
            if let Some(name) = declarator.child_by_field_name("name") {
                self.bind_pattern(name, kind, scope, value.is_some());
            }
            if let Some(value) = value {
                self.visit(value, scope);
            }
        }
    }

    fn visit_for_in(&mut self, node: Node<'_>, scope: ScopeId) {
        let inner = self.push_scope(ScopeKind::Block, Some(scope));

        let mut kind = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            kind = match child.kind() {
                "var" => Some(VariableKind::Var),
                "let" => Some(VariableKind::Let),
                "const" => Some(VariableKind::Const),
                _ => continue,
            };
            break;
        }

        if let Some(left) = node.child_by_field_name("left") {
            match kind {
                Some(kind) => self.bind_pattern(left, kind, inner, true),
                None => self.visit_target(left, inner),
            }
        }
        self.visit_field(node, "right", inner);
        self.visit_field(node, "body", inner);
    }

    fn visit_import(&mut self, node: Node<'_>, scope: ScopeId) {
        let mut cursor = node.walk();
        for clause in node.named_children(&mut cursor) {
            if clause.kind() != "import_clause" {
                continue;
            }
            let mut clause_cursor = clause.walk();
            for part in clause.named_children(&mut clause_cursor) {
                match part.kind() {
                    "identifier" => self.declare(part, scope, VariableKind::Import, true),
                    "namespace_import" => {
                        let mut ns_cursor = part.walk();
                        for name in part.named_children(&mut ns_cursor) {
                            if name.kind() == "identifier" {
                                self.declare(name, scope, VariableKind::Import, true);
                            }
                        }
                    }
                    "named_imports" => {
                        let mut spec_cursor = part.walk();
                        for specifier in part.named_children(&mut spec_cursor) {
                            let local = specifier
                                .child_by_field_name("alias")
                                .or_else(|| specifier.child_by_field_name("name"));
                            if let Some(local) = local.filter(|n| n.kind() == "identifier") {
                                self.declare(local, scope, VariableKind::Import, true);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn visit_export(&mut self, node: Node<'_>, scope: ScopeId) {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            let previous = std::mem::replace(&mut self.exporting, true);
            self.visit(declaration, scope);
            self.exporting = previous;
            return;
        }
        if let Some(value) = node.child_by_field_name("value") {
            self.visit(value, scope);
            return;
        }
        // `export { a as b } from "x"` names nothing local
        if node.child_by_field_name("source").is_some() {
            return;
        }

        let mut cursor = node.walk();
        for clause in node.named_children(&mut cursor) {
            if clause.kind() != "export_clause" {
                continue;
            }
            let mut spec_cursor = clause.walk();
            for specifier in clause.named_children(&mut spec_cursor) {
                if let Some(name) = specifier.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        self.reference(name, scope, false, false);
                    }
                }
            }
        }
    }

    /// Declare every name bound by a declaration pattern
    fn bind_pattern(&mut self, node: Node<'_>, kind: VariableKind, scope: ScopeId, assigned: bool) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                self.declare(node, scope, kind, assigned);
            }
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.bind_pattern(child, kind, scope, assigned);
                }
            }
            "pair_pattern" => {
                if let Some(key) = node.child_by_field_name("key") {
                    if key.kind() == "computed_property_name" {
                        self.visit(key, scope);
                    }
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.bind_pattern(value, kind, scope, assigned);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind_pattern(left, kind, scope, true);
                }
                self.visit_field(node, "right", scope);
            }
            "required_parameter" | "optional_parameter" => {
                if let Some(pattern) = node.child_by_field_name("pattern") {
                    self.bind_pattern(pattern, kind, scope, assigned);
                }
                self.visit_field(node, "value", scope);
            }
            "comment" | "this" | "accessibility_modifier" | "type_annotation" => {}
            _ => self.visit(node, scope),
        }
    }

    /// Record the names written by an assignment target
    fn visit_target(&mut self, node: Node<'_>, scope: ScopeId) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                self.reference(node, scope, true, false);
            }
            "object_pattern" | "array_pattern" | "rest_pattern" | "parenthesized_expression" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit_target(child, scope);
                }
            }
            "pair_pattern" => {
                if let Some(key) = node.child_by_field_name("key") {
                    if key.kind() == "computed_property_name" {
                        self.visit(key, scope);
                    }
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit_target(value, scope);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.visit_target(left, scope);
                }
                self.visit_field(node, "right", scope);
            }
            _ => self.visit(node, scope),
        }
    }
}
