//! Schema descriptions
//!
//! Descriptions are human-authored strings attached with `.describe("...")` or
//! `.meta({ description: "..." })`. They end up as doc comments above the
//! generated declaration and its fields. Field paths are dotted; array and
//! optional wrappers do not add a segment.

use std::collections::BTreeMap;

use serde::Serialize;
use tree_sitter::Node;

use super::{is_getter, join_path, member_key, DetectedSchema, SchemaSyntax};
use crate::checker::eval::block_return_value;
use crate::source::{named_children, unwrap_expression, SourceFile};

const OBJECT_BUILDERS: &[&str] = &["object", "strictObject", "looseObject", "interface"];

/// Bound on identifier hops while looking for a description
const MAX_HOPS: usize = 8;

/// Descriptions of one schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptions {
    pub root: Option<String>,
    /// Field path → description
    pub fields: BTreeMap<String, String>,
}

impl Descriptions {
    pub fn is_empty(&self) -> bool {
        self.root.is_none() && self.fields.is_empty()
    }
}

/// Source of description strings for detected schemas.
///
/// Providers are best-effort: a schema they cannot read has no descriptions.
pub trait DescriptionProvider {
    fn describe(&self, file: &SourceFile, schema: &DetectedSchema) -> Descriptions;
}

/// Reads descriptions straight from the syntax tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDescriptions;

impl DescriptionProvider for StaticDescriptions {
    fn describe(&self, file: &SourceFile, schema: &DetectedSchema) -> Descriptions {
        let syntax = SchemaSyntax::new(file);
        let Some(value) = syntax.initializer(schema).and_then(|decl| decl.value) else {
            return Descriptions::default();
        };
        let mut fields = BTreeMap::new();
        collect_fields(&syntax, value, "", &mut fields);
        Descriptions {
            root: chain_description(&syntax, value, 0),
            fields,
        }
    }
}

/// Description applied last along a method chain, looking through wrappers.
fn chain_description(syntax: &SchemaSyntax<'_>, node: Node<'_>, hops: usize) -> Option<String> {
    if hops > MAX_HOPS {
        return None;
    }
    let mut node = unwrap_expression(node);
    loop {
        if let Some((receiver, method, args)) = syntax.method_call(node) {
            match method {
                "describe" => {
                    if let Some(text) = args.first().and_then(|a| syntax.file.string_value(*a)) {
                        return Some(text);
                    }
                }
                "meta" => {
                    if let Some(text) = args.first().and_then(|a| meta_description(syntax, *a)) {
                        return Some(text);
                    }
                }
                _ => {}
            }
            node = unwrap_expression(receiver);
            continue;
        }
        if let Some((builder, args)) = syntax.namespace_call(node) {
            return match (builder, args.as_slice()) {
                ("optional" | "nullable" | "nullish" | "array" | "readonly", [inner]) => {
                    chain_description(syntax, *inner, hops + 1)
                }
                _ => None,
            };
        }
        if node.kind() == "identifier" {
            let decl = syntax.file.find_variable(syntax.text(node))?;
            return chain_description(syntax, decl.value?, hops + 1);
        }
        return None;
    }
}

fn meta_description(syntax: &SchemaSyntax<'_>, object: Node<'_>) -> Option<String> {
    let object = unwrap_expression(object);
    if object.kind() != "object" {
        return None;
    }
    named_children(object)
        .into_iter()
        .filter(|m| m.kind() == "pair")
        .find(|m| member_key(syntax, *m).as_deref() == Some("description"))
        .and_then(|m| m.child_by_field_name("value"))
        .and_then(|v| syntax.file.string_value(v))
}

fn collect_fields(
    syntax: &SchemaSyntax<'_>,
    node: Node<'_>,
    path: &str,
    out: &mut BTreeMap<String, String>,
) {
    if matches!(node.kind(), "arrow_function" | "function_expression") {
        return;
    }
    if let Some((builder, args)) = syntax.namespace_call(node) {
        if OBJECT_BUILDERS.contains(&builder) {
            if let Some(shape) = args.first() {
                shape_fields(syntax, *shape, path, out);
            }
            return;
        }
    }
    if let Some((receiver, method, args)) = syntax.method_call(node) {
        if matches!(method, "extend" | "safeExtend") {
            collect_fields(syntax, receiver, path, out);
            if let Some(shape) = args.first() {
                shape_fields(syntax, *shape, path, out);
            }
            return;
        }
    }
    for child in named_children(node) {
        collect_fields(syntax, child, path, out);
    }
}

fn shape_fields(
    syntax: &SchemaSyntax<'_>,
    shape: Node<'_>,
    path: &str,
    out: &mut BTreeMap<String, String>,
) {
    let shape = unwrap_expression(shape);
    if shape.kind() != "object" {
        return;
    }
    for member in named_children(shape) {
        let Some(key) = member_key(syntax, member) else {
            continue;
        };
        let value = if is_getter(member) {
            member
                .child_by_field_name("body")
                .and_then(block_return_value)
        } else if member.kind() == "shorthand_property_identifier" {
            Some(member)
        } else {
            member.child_by_field_name("value")
        };
        let Some(value) = value else {
            continue;
        };
        let field_path = join_path(path, &key);
        let lookup = if value.kind() == "shorthand_property_identifier" {
            syntax
                .file
                .find_variable(syntax.text(value))
                .and_then(|decl| decl.value)
                .and_then(|v| chain_description(syntax, v, 1))
        } else {
            chain_description(syntax, value, 0)
        };
        if let Some(description) = lookup {
            out.insert(field_path.clone(), description);
        }
        collect_fields(syntax, value, &field_path, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detect;

    #[test]
    fn test_root_and_nested_field_descriptions() {
        let file = SourceFile::parse(
            "described.ts",
            r#"import { z } from "zod";
const Email = z.string().email().describe("Primary email");
export const User = z.object({
  id: z.string().describe("Unique id"),
  email: Email.optional(),
  tags: z.array(z.object({ label: z.string().meta({ description: "Tag label" }) })),
  plain: z.number(),
}).describe("A registered user");
"#,
        )
        .unwrap();
        let schemas = detect(&file);
        let user = schemas.iter().find(|s| s.name == "User").unwrap();
        let descriptions = StaticDescriptions.describe(&file, user);

        assert_eq!(descriptions.root.as_deref(), Some("A registered user"));
        assert_eq!(descriptions.fields["id"], "Unique id");
        assert_eq!(descriptions.fields["email"], "Primary email");
        assert_eq!(descriptions.fields["tags.label"], "Tag label");
        assert!(!descriptions.fields.contains_key("plain"));
    }

    #[test]
    fn test_last_description_wins() {
        let file = SourceFile::parse(
            "d.ts",
            "import { z } from \"zod\";\nexport const A = z.string().describe(\"first\").describe(\"second\");",
        )
        .unwrap();
        let schemas = detect(&file);
        let descriptions = StaticDescriptions.describe(&file, &schemas[0]);
        assert_eq!(descriptions.root.as_deref(), Some("second"));
        assert!(descriptions.fields.is_empty());
    }
}
