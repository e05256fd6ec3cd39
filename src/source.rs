//! Source Files
//!
//! A parsed TypeScript file backed by tree-sitter, plus the handful of
//! declaration-level views the analyzers and the checker share: top-level
//! variable declarations, import bindings, export clauses, enums and type
//! declarations.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::error::{ExtractError, Result};
use crate::scan;

/// Module specifiers whose bindings count as the schema library namespace
pub const ZOD_MODULES: &[&str] = &["zod", "zod/v4", "zod/v3", "zod/mini", "zod/v4-mini"];

/// A parsed TypeScript source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    tree: Tree,
}

/// A top-level `const`/`let`/`var` declarator
#[derive(Debug, Clone, Copy)]
pub struct VariableDecl<'t> {
    pub name: &'t str,
    pub exported: bool,
    /// 1-based source line of the declarator
    pub line: usize,
    pub declarator: Node<'t>,
    pub value: Option<Node<'t>>,
    /// The type node inside the `: T` annotation, when present
    pub type_annotation: Option<Node<'t>>,
}

/// What an import binding refers to in its module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Imported {
    Named(String),
    Default,
    Namespace,
}

/// One local binding introduced by an `import` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub imported: Imported,
    pub specifier: String,
    pub type_only: bool,
}

/// `export { name as alias }` without a `from` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExport {
    pub name: String,
    pub alias: Option<String>,
}

impl LocalExport {
    /// Name the binding is visible as from outside the module
    pub fn exported_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Re-export statements that forward another module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReExport {
    /// `export * from "./x"`
    Star { specifier: String },
    /// `export { name as alias } from "./x"`
    Named {
        name: String,
        alias: Option<String>,
        specifier: String,
    },
}

/// A member of a native `enum` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumValue {
    Str(String),
    Num(String),
}

/// A native `enum` declaration with evaluated member values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<(String, EnumValue)>,
}

impl SourceFile {
    /// Parse `text` as TypeScript (TSX for `.tsx` paths).
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let text = text.into();
        let language: tree_sitter::Language =
            if path.extension().is_some_and(|ext| ext == "tsx") {
                tree_sitter_typescript::LANGUAGE_TSX.into()
            } else {
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
            };

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|_| ExtractError::Parse { path: path.clone() })?;
        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| ExtractError::Parse { path: path.clone() })?;

        Ok(Self { path, text, tree })
    }

    /// Read and parse a file from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
        Self::parse(path, text)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text of a node
    pub fn node_text<'a>(&'a self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.text.as_bytes()).unwrap_or("")
    }

    /// 1-based line of a node
    pub fn line_of(&self, node: Node<'_>) -> usize {
        node.start_position().row + 1
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// All top-level variable declarators, in source order.
    pub fn variable_declarations(&self) -> Vec<VariableDecl<'_>> {
        let mut decls = Vec::new();
        let root = self.root();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    self.collect_declarators(child, false, &mut decls);
                }
                "export_statement" => {
                    if let Some(decl) = child.child_by_field_name("declaration") {
                        if matches!(decl.kind(), "lexical_declaration" | "variable_declaration") {
                            self.collect_declarators(decl, true, &mut decls);
                        }
                    }
                }
                _ => {}
            }
        }
        decls
    }

    fn collect_declarators<'t>(
        &'t self,
        declaration: Node<'t>,
        exported: bool,
        out: &mut Vec<VariableDecl<'t>>,
    ) {
        let mut cursor = declaration.walk();
        for declarator in declaration.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name.kind() != "identifier" {
                continue;
            }
            let type_annotation = declarator
                .child_by_field_name("type")
                .and_then(|annotation| first_named_child(annotation));
            out.push(VariableDecl {
                name: self.node_text(name),
                exported,
                line: self.line_of(declarator),
                declarator,
                value: declarator.child_by_field_name("value"),
                type_annotation,
            });
        }
    }

    /// Find a top-level variable declaration by name.
    pub fn find_variable(&self, name: &str) -> Option<VariableDecl<'_>> {
        self.variable_declarations()
            .into_iter()
            .find(|decl| decl.name == name)
    }

    /// Local `export { ... }` clauses (no `from`).
    pub fn local_exports(&self) -> Vec<LocalExport> {
        let mut exports = Vec::new();
        for statement in self.export_statements() {
            if statement.child_by_field_name("source").is_some() {
                continue;
            }
            for (name, alias) in self.export_specifiers(statement) {
                exports.push(LocalExport { name, alias });
            }
        }
        exports
    }

    /// Re-exports (`export * from`, `export { x } from`).
    pub fn reexports(&self) -> Vec<ReExport> {
        let mut reexports = Vec::new();
        for statement in self.export_statements() {
            let Some(source) = statement.child_by_field_name("source") else {
                continue;
            };
            let specifier = self.string_value(source).unwrap_or_default();
            let specifiers = self.export_specifiers(statement);
            if specifiers.is_empty() {
                let mut cursor = statement.walk();
                let is_star = statement.children(&mut cursor).any(|c| c.kind() == "*");
                let mut cursor = statement.walk();
                let is_namespace = statement
                    .named_children(&mut cursor)
                    .any(|c| c.kind() == "namespace_export");
                if is_star && !is_namespace {
                    reexports.push(ReExport::Star { specifier });
                }
                continue;
            }
            for (name, alias) in specifiers {
                reexports.push(ReExport::Named {
                    name,
                    alias,
                    specifier: specifier.clone(),
                });
            }
        }
        reexports
    }

    fn export_statements(&self) -> Vec<Node<'_>> {
        let root = self.root();
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter(|child| child.kind() == "export_statement")
            .collect()
    }

    fn export_specifiers(&self, statement: Node<'_>) -> Vec<(String, Option<String>)> {
        let mut specifiers = Vec::new();
        let mut cursor = statement.walk();
        for clause in statement.named_children(&mut cursor) {
            if clause.kind() != "export_clause" {
                continue;
            }
            let mut inner = clause.walk();
            for specifier in clause.named_children(&mut inner) {
                if specifier.kind() != "export_specifier" {
                    continue;
                }
                let Some(name) = specifier.child_by_field_name("name") else {
                    continue;
                };
                let alias = specifier
                    .child_by_field_name("alias")
                    .map(|alias| self.identifier_or_string(alias));
                specifiers.push((self.identifier_or_string(name), alias));
            }
        }
        specifiers
    }

    /// Every binding introduced by import statements.
    pub fn imports(&self) -> Vec<ImportBinding> {
        let mut bindings = Vec::new();
        let root = self.root();
        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            if statement.kind() != "import_statement" {
                continue;
            }
            let Some(source) = statement.child_by_field_name("source") else {
                continue;
            };
            let specifier = self.string_value(source).unwrap_or_default();
            let mut token_cursor = statement.walk();
            let type_only = statement
                .children(&mut token_cursor)
                .any(|c| !c.is_named() && c.kind() == "type");

            let mut clause_cursor = statement.walk();
            for clause in statement.named_children(&mut clause_cursor) {
                if clause.kind() != "import_clause" {
                    continue;
                }
                let mut parts = clause.walk();
                for part in clause.named_children(&mut parts) {
                    match part.kind() {
                        "identifier" => bindings.push(ImportBinding {
                            local: self.node_text(part).to_string(),
                            imported: Imported::Default,
                            specifier: specifier.clone(),
                            type_only,
                        }),
                        "namespace_import" => {
                            if let Some(ident) = first_named_child(part) {
                                bindings.push(ImportBinding {
                                    local: self.node_text(ident).to_string(),
                                    imported: Imported::Namespace,
                                    specifier: specifier.clone(),
                                    type_only,
                                });
                            }
                        }
                        "named_imports" => {
                            let mut specs = part.walk();
                            for spec in part.named_children(&mut specs) {
                                if spec.kind() != "import_specifier" {
                                    continue;
                                }
                                let Some(name) = spec.child_by_field_name("name") else {
                                    continue;
                                };
                                let imported = self.identifier_or_string(name);
                                let local = spec
                                    .child_by_field_name("alias")
                                    .map(|alias| self.node_text(alias).to_string())
                                    .unwrap_or_else(|| imported.clone());
                                let mut spec_tokens = spec.walk();
                                let spec_type_only = spec
                                    .children(&mut spec_tokens)
                                    .any(|c| !c.is_named() && c.kind() == "type");
                                bindings.push(ImportBinding {
                                    local,
                                    imported: Imported::Named(imported),
                                    specifier: specifier.clone(),
                                    type_only: type_only || spec_type_only,
                                });
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        bindings
    }

    /// Find the import binding for a local name.
    pub fn find_import(&self, local: &str) -> Option<ImportBinding> {
        self.imports().into_iter().find(|binding| binding.local == local)
    }

    /// Native enum declarations (exported or not).
    pub fn enums(&self) -> Vec<EnumDecl> {
        self.top_level_declarations("enum_declaration")
            .into_iter()
            .filter_map(|node| self.enum_decl(node))
            .collect()
    }

    fn enum_decl(&self, node: Node<'_>) -> Option<EnumDecl> {
        let name = self.node_text(node.child_by_field_name("name")?).to_string();
        let body = node.child_by_field_name("body")?;
        let mut members = Vec::new();
        let mut next_auto: Option<i64> = Some(0);
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "property_identifier" | "string" => {
                    let member = self.identifier_or_string(child);
                    let value = next_auto.map(|n| n.to_string()).unwrap_or_default();
                    members.push((member, EnumValue::Num(value)));
                    next_auto = next_auto.map(|n| n + 1);
                }
                "enum_assignment" => {
                    let Some(member) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let member = self.identifier_or_string(member);
                    let Some(value) = child.child_by_field_name("value") else {
                        continue;
                    };
                    if let Some(text) = self.string_value(value) {
                        members.push((member, EnumValue::Str(text)));
                        next_auto = None;
                    } else {
                        let raw = self.node_text(value).trim().to_string();
                        next_auto = raw.parse::<i64>().ok().map(|n| n + 1);
                        members.push((member, EnumValue::Num(raw)));
                    }
                }
                _ => {}
            }
        }
        Some(EnumDecl { name, members })
    }

    /// Interface or type alias declaration with the given name.
    pub fn find_type_declaration(&self, name: &str) -> Option<Node<'_>> {
        ["interface_declaration", "type_alias_declaration"]
            .iter()
            .flat_map(|kind| self.top_level_declarations(kind))
            .find(|node| {
                node.child_by_field_name("name")
                    .is_some_and(|n| self.node_text(n) == name)
            })
    }

    /// Function declaration with the given name.
    pub fn find_function(&self, name: &str) -> Option<Node<'_>> {
        self.top_level_declarations("function_declaration")
            .into_iter()
            .find(|node| {
                node.child_by_field_name("name")
                    .is_some_and(|n| self.node_text(n) == name)
            })
    }

    fn top_level_declarations(&self, kind: &str) -> Vec<Node<'_>> {
        let root = self.root();
        let mut cursor = root.walk();
        let mut nodes = Vec::new();
        for child in root.named_children(&mut cursor) {
            if child.kind() == kind {
                nodes.push(child);
            } else if child.kind() == "export_statement" {
                if let Some(decl) = child.child_by_field_name("declaration") {
                    if decl.kind() == kind {
                        nodes.push(decl);
                    }
                }
            }
        }
        nodes
    }

    // =========================================================================
    // Literal helpers
    // =========================================================================

    /// Value of a string literal (or substitution-free template string), escapes resolved.
    pub fn string_value(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "string" | "template_string" => {
                let mut cursor = node.walk();
                if node
                    .named_children(&mut cursor)
                    .any(|c| c.kind() == "template_substitution")
                {
                    return None;
                }
                let raw = self.node_text(node);
                if raw.len() < 2 {
                    return None;
                }
                Some(scan::unescape(&raw[1..raw.len() - 1]))
            }
            _ => None,
        }
    }

    fn identifier_or_string(&self, node: Node<'_>) -> String {
        self.string_value(node)
            .unwrap_or_else(|| self.node_text(node).to_string())
    }

    /// Identifiers bound to the schema library in this file (`z` always included).
    pub fn zod_namespaces(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = BTreeSet::from(["z".to_string()]);
        for binding in self.imports() {
            if !ZOD_MODULES.contains(&binding.specifier.as_str()) {
                continue;
            }
            match &binding.imported {
                Imported::Named(name) if name == "z" => {
                    names.insert(binding.local);
                }
                Imported::Default | Imported::Namespace => {
                    names.insert(binding.local);
                }
                Imported::Named(_) => {}
            }
        }
        names
    }
}

/// First named child of a node.
pub fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let child = node.named_children(&mut cursor).next();
    child
}

/// Named children of a node, collected.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Strip `( ... )`, `x as T`, `x satisfies T` and `x!` around an expression.
pub fn unwrap_expression(mut node: Node<'_>) -> Node<'_> {
    loop {
        match node.kind() {
            "parenthesized_expression" | "as_expression" | "satisfies_expression"
            | "non_null_expression" => match first_named_child(node) {
                Some(inner) => node = inner,
                None => return node,
            },
            _ => return node,
        }
    }
}
