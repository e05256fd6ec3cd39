//! Static Analysis Passes
//!
//! Everything the checker cannot tell us is recovered here from the syntax
//! tree: which declarations are schemas, which fields refer to other schemas
//! (directly, through getters, or as union members), where brands are applied,
//! which schemas come from other files, native enum values, and descriptions.
//!
//! All passes are pure reads of a parsed [`SourceFile`].

pub mod brands;
pub mod descriptions;
pub mod detect;
pub mod enums;
pub mod getters;
pub mod imports;
pub mod references;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;
use tree_sitter::Node;

use crate::checker::eval::call_arguments;
use crate::source::{unwrap_expression, SourceFile, VariableDecl};

pub use brands::detect_brands;
pub use descriptions::{DescriptionProvider, Descriptions, StaticDescriptions};
pub use detect::{detect, DetectedSchema};
pub use enums::EnumTable;
pub use getters::{analyze_getters, has_self_references, resolve_any_types};
pub use imports::find_imported_schemas;
pub use references::{analyze_references, analyze_union_references};

// =============================================================================
// Analysis records
// =============================================================================

/// An accessor-style field (`get child() { return X; }`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetterFieldInfo {
    pub field_name: String,
    /// Dotted path of the field from the schema root
    pub field_path: String,
    pub referenced_schema: String,
    pub is_array: bool,
    pub is_record: bool,
    pub is_optional: bool,
    pub is_self_reference: bool,
}

/// Getter fields of one schema, by field name
pub type GetterFields = BTreeMap<String, GetterFieldInfo>;

/// An inline field whose value is another schema variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReferenceInfo {
    pub field_path: String,
    pub referenced_schema: String,
    pub is_array: bool,
    pub is_record: bool,
    pub is_optional: bool,
}

/// A union built directly from named member schemas
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionReferenceInfo {
    pub member_schemas: Vec<String>,
    pub is_discriminated: bool,
    pub discriminator_key: Option<String>,
}

/// A brand applied to a schema (`field_path == ""`) or to one of its fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandInfo {
    pub brand_name: String,
    pub field_path: String,
    /// Array wrappers between the field and the branded element
    #[serde(skip_serializing_if = "is_zero")]
    pub element_depth: usize,
}

impl BrandInfo {
    pub fn new(brand_name: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            brand_name: brand_name.into(),
            field_path: field_path.into(),
            element_depth: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.field_path.is_empty()
    }
}

fn is_zero(depth: &usize) -> bool {
    *depth == 0
}

/// A schema imported from another local file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedSchemaInfo {
    pub local_name: String,
    /// Name the schema is emitted under in its origin file
    pub original_name: String,
    /// Variable that holds the schema in its origin file
    pub declaration_name: String,
    pub source_file_path: Option<PathBuf>,
    pub resolved: bool,
}

// =============================================================================
// Schema names
// =============================================================================

/// Known schemas of a file, keyed by the identifier that refers to them.
///
/// A re-exported alias is referred to in code by its local name but emitted
/// under the alias, so lookups go through this table instead of a plain set.
#[derive(Debug, Clone, Default)]
pub struct SchemaNames {
    by_local: BTreeMap<String, String>,
}

impl SchemaNames {
    pub fn from_detected(schemas: &[DetectedSchema]) -> Self {
        let mut names = Self::default();
        for schema in schemas {
            names.insert(&schema.local_name, &schema.name);
        }
        names
    }

    /// Add imported schemas (keyed by their local alias).
    pub fn with_imports<'a>(mut self, imports: impl IntoIterator<Item = &'a ImportedSchemaInfo>) -> Self {
        for import in imports {
            if import.resolved {
                self.insert(&import.local_name, &import.local_name);
            }
        }
        self
    }

    pub fn insert(&mut self, local: &str, name: &str) {
        self.by_local
            .entry(local.to_string())
            .or_insert_with(|| name.to_string());
    }

    /// Schema name an identifier refers to, if any.
    pub fn resolve(&self, local: &str) -> Option<&str> {
        self.by_local.get(local).map(String::as_str)
    }

    pub fn names(&self) -> BTreeSet<&str> {
        self.by_local.values().map(String::as_str).collect()
    }
}

// =============================================================================
// Shared syntax helpers
// =============================================================================

/// A parsed file together with its schema library namespaces.
pub struct SchemaSyntax<'f> {
    pub file: &'f SourceFile,
    pub namespaces: BTreeSet<String>,
}

impl<'f> SchemaSyntax<'f> {
    pub fn new(file: &'f SourceFile) -> Self {
        Self {
            file,
            namespaces: file.zod_namespaces(),
        }
    }

    pub fn text(&self, node: Node<'_>) -> &'f str {
        self.file.node_text(node)
    }

    pub fn is_namespace(&self, node: Node<'_>) -> bool {
        node.kind() == "identifier" && self.namespaces.contains(self.text(node))
    }

    /// `z.method(args)` → `(method, args)`
    pub fn namespace_call<'t>(&self, node: Node<'t>) -> Option<(&'f str, Vec<Node<'t>>)> {
        let node = unwrap_expression(node);
        if node.kind() != "call_expression" {
            return None;
        }
        let callee = node.child_by_field_name("function")?;
        if callee.kind() != "member_expression" {
            return None;
        }
        let object = callee.child_by_field_name("object")?;
        if !self.is_namespace(object) {
            return None;
        }
        let method = self.text(callee.child_by_field_name("property")?);
        Some((method, call_arguments(node)))
    }

    /// `receiver.method(args)` for a receiver that is not the namespace
    pub fn method_call<'t>(&self, node: Node<'t>) -> Option<(Node<'t>, &'f str, Vec<Node<'t>>)> {
        let node = unwrap_expression(node);
        if node.kind() != "call_expression" {
            return None;
        }
        let callee = node.child_by_field_name("function")?;
        if callee.kind() != "member_expression" {
            return None;
        }
        let object = callee.child_by_field_name("object")?;
        if self.is_namespace(object) {
            return None;
        }
        let method = self.text(callee.child_by_field_name("property")?);
        Some((object, method, call_arguments(node)))
    }

    /// First-level builder of a call chain: `z.object({}).extend()` → `object`.
    pub fn chain_root(&self, node: Node<'_>) -> Option<&'f str> {
        let mut node = unwrap_expression(node);
        loop {
            match node.kind() {
                "call_expression" => node = node.child_by_field_name("function")?,
                "member_expression" => {
                    let object = node.child_by_field_name("object")?;
                    if self.is_namespace(object) {
                        return Some(self.text(node.child_by_field_name("property")?));
                    }
                    node = unwrap_expression(object);
                }
                _ => return None,
            }
        }
    }

    /// Initializer of the declaration behind a detected schema.
    pub fn initializer(&self, schema: &DetectedSchema) -> Option<VariableDecl<'f>> {
        self.file
            .find_variable(&schema.local_name)
            .filter(|decl| decl.value.is_some())
    }
}

/// A schema reference with the wrappers around it peeled off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedReference {
    pub identifier: String,
    pub is_array: bool,
    pub is_record: bool,
    pub is_optional: bool,
}

/// Peel `.optional()`/`.nullable()`, then an array or record wrapper, off an
/// expression and return the schema identifier underneath.
pub fn unwrap_reference(syntax: &SchemaSyntax<'_>, node: Node<'_>) -> Option<WrappedReference> {
    let mut node = unwrap_expression(node);
    let mut is_optional = false;

    loop {
        if let Some((receiver, method, _)) = syntax.method_call(node) {
            if matches!(method, "optional" | "nullable" | "nullish") {
                is_optional = true;
                node = unwrap_expression(receiver);
                continue;
            }
        }
        if let Some((builder, args)) = syntax.namespace_call(node) {
            if matches!(builder, "optional" | "nullable" | "nullish") && args.len() == 1 {
                is_optional = true;
                node = unwrap_expression(args[0]);
                continue;
            }
        }
        break;
    }

    let mut reference = WrappedReference {
        identifier: String::new(),
        is_array: false,
        is_record: false,
        is_optional,
    };

    let base = if let Some((receiver, "array", _)) = syntax.method_call(node) {
        reference.is_array = true;
        receiver
    } else if let Some((builder, args)) = syntax.namespace_call(node) {
        match (builder, args.as_slice()) {
            ("array", [element]) => {
                reference.is_array = true;
                *element
            }
            ("record", [_, value]) => {
                reference.is_record = true;
                *value
            }
            ("lazy", [callback]) => crate::checker::eval::callback_result(*callback)?,
            _ => return None,
        }
    } else {
        node
    };

    let base = unwrap_expression(base);
    if !matches!(base.kind(), "identifier" | "shorthand_property_identifier") {
        return None;
    }
    reference.identifier = syntax.text(base).to_string();
    Some(reference)
}

/// Join a parent field path and a key.
pub fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Key text of an object literal member (identifier, string or computed string).
pub fn member_key(syntax: &SchemaSyntax<'_>, member: Node<'_>) -> Option<String> {
    let key = match member.kind() {
        "pair" => member.child_by_field_name("key")?,
        "method_definition" => member.child_by_field_name("name")?,
        "shorthand_property_identifier" => return Some(syntax.text(member).to_string()),
        _ => return None,
    };
    if let Some(value) = syntax.file.string_value(key) {
        return Some(value);
    }
    Some(syntax.text(key).to_string())
}

/// True for a `get name() { ... }` accessor
pub fn is_getter(member: Node<'_>) -> bool {
    if member.kind() != "method_definition" {
        return false;
    }
    let mut cursor = member.walk();
    let found = member
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == "get");
    found
}
