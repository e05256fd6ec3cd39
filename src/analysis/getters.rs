//! Getter reference resolution
//!
//! Recursive schemas are written with accessor fields so the reference is
//! evaluated lazily:
//!
//! ```ts
//! const Category = z.object({
//!   name: z.string(),
//!   get children() { return z.array(Category); },
//! });
//! ```
//!
//! The checker cannot name a type defined in terms of itself and prints `any`
//! for such fields; [`resolve_any_types`] patches those placeholders back.

use std::collections::BTreeMap;

use tree_sitter::Node;

use super::{
    is_getter, join_path, member_key, unwrap_reference, DetectedSchema, GetterFieldInfo,
    GetterFields, SchemaNames, SchemaSyntax,
};
use crate::checker::eval::block_return_value;
use crate::scan;
use crate::source::{named_children, SourceFile};

/// Getter fields of every detected schema, keyed by schema name.
pub fn analyze_getters(
    file: &SourceFile,
    schemas: &[DetectedSchema],
    names: &SchemaNames,
) -> BTreeMap<String, GetterFields> {
    let syntax = SchemaSyntax::new(file);
    let mut result = BTreeMap::new();

    for schema in schemas {
        let Some(value) = syntax.initializer(schema).and_then(|decl| decl.value) else {
            continue;
        };
        let mut fields = GetterFields::new();
        collect(&syntax, schema, names, value, "", &mut fields);
        if !fields.is_empty() {
            result.insert(schema.name.clone(), fields);
        }
    }
    result
}

fn collect(
    syntax: &SchemaSyntax<'_>,
    schema: &DetectedSchema,
    names: &SchemaNames,
    node: Node<'_>,
    path: &str,
    fields: &mut GetterFields,
) {
    if node.kind() != "object" {
        for child in named_children(node) {
            collect(syntax, schema, names, child, path, fields);
        }
        return;
    }

    for member in named_children(node) {
        let Some(key) = member_key(syntax, member) else {
            if member.kind() == "spread_element" {
                collect(syntax, schema, names, member, path, fields);
            }
            continue;
        };
        let field_path = join_path(path, &key);

        if is_getter(member) {
            let Some(returned) = member
                .child_by_field_name("body")
                .and_then(block_return_value)
            else {
                continue;
            };
            if let Some(reference) = unwrap_reference(syntax, returned) {
                let referenced = names
                    .resolve(&reference.identifier)
                    .unwrap_or(&reference.identifier)
                    .to_string();
                fields.insert(
                    key.clone(),
                    GetterFieldInfo {
                        field_name: key,
                        field_path: field_path.clone(),
                        is_self_reference: referenced == schema.name,
                        referenced_schema: referenced,
                        is_array: reference.is_array,
                        is_record: reference.is_record,
                        is_optional: reference.is_optional,
                    },
                );
            } else {
                collect(syntax, schema, names, returned, &field_path, fields);
            }
        } else if let Some(value) = member.child_by_field_name("value") {
            collect(syntax, schema, names, value, &field_path, fields);
        }
    }
}

/// Whether any getter field refers back to its own schema.
pub fn has_self_references(fields: &GetterFields) -> bool {
    fields.values().any(|f| f.is_self_reference)
}

/// Replace `any` placeholders of self-referencing getter fields with `type_name`.
pub fn resolve_any_types(type_text: &str, fields: &GetterFields, type_name: &str) -> String {
    let mut edits: Vec<(scan::Span, String)> = Vec::new();

    for field in fields.values().filter(|f| f.is_self_reference) {
        for start in value_starts(type_text, &field.field_name) {
            let rest = &type_text[start..];
            let record_prefix = "{ [x: string]: ";
            if let Some(inner) = rest.strip_prefix(record_prefix) {
                if inner.starts_with("any;") {
                    let at = start + record_prefix.len();
                    edits.push((at..at + 3, type_name.to_string()));
                }
                continue;
            }
            if !starts_with_token(rest, "any") {
                continue;
            }
            if rest.starts_with("any[]") {
                edits.push((start..start + 5, format!("{type_name}[]")));
            } else if field.is_array {
                edits.push((start..start + 3, format!("{type_name}[]")));
            } else if field.is_record {
                edits.push((start..start + 3, format!("{{ [x: string]: {type_name}; }}")));
            } else {
                edits.push((start..start + 3, type_name.to_string()));
            }
        }
    }

    edits.sort_by_key(|(span, _)| span.start);
    edits.dedup_by_key(|(span, _)| span.start);
    let mut out = type_text.to_string();
    for (span, replacement) in edits.into_iter().rev() {
        out = scan::replace_span(&out, span, &replacement);
    }
    out
}

/// Offsets where the value of property `field` begins (after `: ` / `?: `).
fn value_starts(text: &str, field: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    for c in scan::scan(text) {
        if !text[c.index..].starts_with(field) {
            continue;
        }
        let prev = text[..c.index].chars().next_back();
        if prev.is_some_and(|p| scan::is_ident_char(p) || p == '.') {
            continue;
        }
        let after = &text[c.index + field.len()..];
        let skip = if after.starts_with("?: ") {
            3
        } else if after.starts_with(": ") {
            2
        } else {
            continue;
        };
        starts.push(c.index + field.len() + skip);
    }
    starts
}

fn starts_with_token(text: &str, token: &str) -> bool {
    text.starts_with(token)
        && !text[token.len()..]
            .chars()
            .next()
            .is_some_and(scan::is_ident_char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detect;

    fn analyze(text: &str) -> BTreeMap<String, GetterFields> {
        let file = SourceFile::parse(
            "tree.ts",
            format!("import {{ z }} from \"zod\";\n{text}"),
        )
        .unwrap();
        let schemas = detect(&file);
        let names = SchemaNames::from_detected(&schemas);
        analyze_getters(&file, &schemas, &names)
    }

    #[test]
    fn test_self_and_sibling_getters() {
        let result = analyze(
            r#"
export const Category = z.object({
  name: z.string(),
  get parent() { return Category.optional(); },
  get children() { return z.array(Category); },
  meta: z.object({ get owner() { return User; } }),
});
export const User = z.object({ id: z.string() });
"#,
        );
        let fields = &result["Category"];
        assert!(has_self_references(fields));
        assert!(fields["parent"].is_optional && fields["parent"].is_self_reference);
        assert!(fields["children"].is_array);
        assert_eq!(fields["owner"].field_path, "meta.owner");
        assert!(!fields["owner"].is_self_reference);
        assert_eq!(fields["owner"].referenced_schema, "User");
    }

    #[test]
    fn test_resolve_any_types() {
        let result = analyze(
            r#"
export const Node = z.object({
  get next() { return Node.optional(); },
  get kids() { return z.array(Node); },
  get byId() { return z.record(z.string(), Node); },
});
"#,
        );
        let fields = &result["Node"];
        let text = "{ next?: any; kids: any[]; byId: { [x: string]: any; }; label: any; }";
        assert_eq!(
            resolve_any_types(text, fields, "NodeOutput"),
            "{ next?: NodeOutput; kids: NodeOutput[]; byId: { [x: string]: NodeOutput; }; label: any; }"
        );
    }

    #[test]
    fn test_resolve_leaves_non_any_values() {
        let result = analyze(
            "export const Node = z.object({ get next() { return Node.optional(); } });",
        );
        let text = "{ next?: anything; }";
        assert_eq!(resolve_any_types(text, &result["Node"], "N"), text);
    }
}
