//! Brand detection
//!
//! `.brand<"Name">()` only exists on the output side and is erased by
//! normalization, so brands are read from the syntax tree and re-attached to
//! the output text later.

use std::collections::BTreeMap;

use tree_sitter::Node;

use super::{is_getter, join_path, member_key, BrandInfo, DetectedSchema, SchemaSyntax};
use crate::checker::eval::block_return_value;
use crate::source::{first_named_child, named_children, SourceFile};

/// Brands of every detected schema, keyed by schema name.
pub fn detect_brands(file: &SourceFile, schemas: &[DetectedSchema]) -> BTreeMap<String, Vec<BrandInfo>> {
    let syntax = SchemaSyntax::new(file);
    let mut result = BTreeMap::new();

    for schema in schemas {
        let Some(value) = syntax.initializer(schema).and_then(|decl| decl.value) else {
            continue;
        };
        let mut brands = Vec::new();
        walk(&syntax, value, "", 0, &mut brands);
        if !brands.is_empty() {
            result.insert(schema.name.clone(), brands);
        }
    }
    result
}

fn walk(syntax: &SchemaSyntax<'_>, node: Node<'_>, path: &str, depth: usize, out: &mut Vec<BrandInfo>) {
    match node.kind() {
        "call_expression" => {
            if let Some(name) = brand_name(syntax, node) {
                out.push(BrandInfo {
                    brand_name: name,
                    field_path: path.to_string(),
                    element_depth: depth,
                });
            }
            let element = array_element(syntax, node);
            for child in named_children(node) {
                let depth = if Some(child) == element { depth + 1 } else { depth };
                walk(syntax, child, path, depth, out);
            }
        }
        "object" => {
            for member in named_children(node) {
                let Some(key) = member_key(syntax, member) else {
                    if member.kind() == "spread_element" {
                        walk(syntax, member, path, depth, out);
                    }
                    continue;
                };
                let field_path = join_path(path, &key);
                let value = if is_getter(member) {
                    member
                        .child_by_field_name("body")
                        .and_then(block_return_value)
                } else {
                    member.child_by_field_name("value")
                };
                if let Some(value) = value {
                    // a nested object inside an array is addressed by its own path
                    walk(syntax, value, &field_path, 0, out);
                }
            }
        }
        // callbacks (refine, transform) never carry field brands
        "arrow_function" | "function_expression" => {}
        _ => {
            for child in named_children(node) {
                walk(syntax, child, path, depth, out);
            }
        }
    }
}

/// Child of an array builder call that holds the element schema:
/// the arguments of `z.array(x)` or the receiver side of `x.array()`.
fn array_element<'t>(syntax: &SchemaSyntax<'_>, call: Node<'t>) -> Option<Node<'t>> {
    if let Some((method, _)) = syntax.namespace_call(call) {
        return if method == "array" {
            call.child_by_field_name("arguments")
        } else {
            None
        };
    }
    match syntax.method_call(call) {
        Some((_, "array", _)) => call.child_by_field_name("function"),
        _ => None,
    }
}

/// `X.brand<"Name">()` → `Name`
fn brand_name(syntax: &SchemaSyntax<'_>, call: Node<'_>) -> Option<String> {
    let callee = call.child_by_field_name("function")?;
    if callee.kind() != "member_expression" {
        return None;
    }
    let property = callee.child_by_field_name("property")?;
    if syntax.text(property) != "brand" {
        return None;
    }
    let type_args = call.child_by_field_name("type_arguments")?;
    let first = first_named_child(type_args)?;
    let literal = if first.kind() == "literal_type" {
        first_named_child(first)?
    } else {
        first
    };
    syntax.file.string_value(literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detect;

    #[test]
    fn test_root_and_field_brands() {
        let file = SourceFile::parse(
            "brands.ts",
            r#"import { z } from "zod";
export const UserId = z.string().uuid().brand<"UserId">();
export const User = z.object({
  id: z.string().brand<"UserId">(),
  profile: z.object({ email: z.string().email().brand<"Email">().optional() }),
  name: z.string(),
}).brand<"User">();
export const Plain = z.object({ a: z.string() });
"#,
        )
        .unwrap();
        let schemas = detect(&file);
        let brands = detect_brands(&file, &schemas);

        assert_eq!(
            brands["UserId"],
            vec![BrandInfo::new("UserId", "")]
        );
        let user: Vec<(&str, &str)> = brands["User"]
            .iter()
            .map(|b| (b.brand_name.as_str(), b.field_path.as_str()))
            .collect();
        assert_eq!(
            user,
            vec![("User", ""), ("UserId", "id"), ("Email", "profile.email")]
        );
        assert!(!brands.contains_key("Plain"));
    }

    #[test]
    fn test_array_element_brands() {
        let file = SourceFile::parse(
            "posts.ts",
            r#"import { z } from "zod";
export const Post = z.object({
  tags: z.array(z.string().brand<"Tag">()),
  grid: z.array(z.number().brand<"Cell">().array()),
  ids: z.array(z.string()).brand<"Ids">(),
});
"#,
        )
        .unwrap();
        let schemas = detect(&file);
        let brands = detect_brands(&file, &schemas);

        let post: Vec<(&str, &str, usize)> = brands["Post"]
            .iter()
            .map(|b| (b.brand_name.as_str(), b.field_path.as_str(), b.element_depth))
            .collect();
        assert_eq!(
            post,
            vec![("Tag", "tags", 1), ("Cell", "grid", 2), ("Ids", "ids", 0)]
        );
    }
}
