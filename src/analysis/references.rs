//! Cross-schema references
//!
//! Inline field references (`address: Address`, `tags: z.array(Tag)`) are found
//! by walking the object literals passed to object builders. Union references
//! are recorded when a schema is a union built straight from named members.

use std::collections::BTreeMap;

use tree_sitter::Node;

use super::{
    join_path, member_key, unwrap_reference, DetectedSchema, SchemaNames, SchemaReferenceInfo,
    SchemaSyntax, UnionReferenceInfo,
};
use crate::source::{named_children, unwrap_expression, SourceFile};

const OBJECT_BUILDERS: &[&str] = &["object", "strictObject", "looseObject", "interface"];

/// Metadata methods that do not change a union's type
const TRANSPARENT_METHODS: &[&str] = &["describe", "meta"];

/// Inline references of every detected schema, keyed by schema name.
pub fn analyze_references(
    file: &SourceFile,
    schemas: &[DetectedSchema],
    names: &SchemaNames,
) -> BTreeMap<String, Vec<SchemaReferenceInfo>> {
    let syntax = SchemaSyntax::new(file);
    let mut result = BTreeMap::new();

    for schema in schemas {
        let Some(value) = syntax.initializer(schema).and_then(|decl| decl.value) else {
            continue;
        };
        let mut refs = Vec::new();
        let walker = ReferenceWalker {
            syntax: &syntax,
            names,
            owner: &schema.name,
        };
        walker.find(value, "", &mut refs);
        if !refs.is_empty() {
            result.insert(schema.name.clone(), refs);
        }
    }
    result
}

struct ReferenceWalker<'a, 'f> {
    syntax: &'a SchemaSyntax<'f>,
    names: &'a SchemaNames,
    owner: &'a str,
}

impl ReferenceWalker<'_, '_> {
    /// Find object builder calls under `node`.
    fn find(&self, node: Node<'_>, path: &str, out: &mut Vec<SchemaReferenceInfo>) {
        if let Some((builder, args)) = self.syntax.namespace_call(node) {
            if OBJECT_BUILDERS.contains(&builder) {
                if let Some(shape) = args.first() {
                    self.fields(*shape, path, out);
                }
                return;
            }
        }
        if let Some((receiver, method, args)) = self.syntax.method_call(node) {
            if matches!(method, "extend" | "safeExtend") {
                self.find(receiver, path, out);
                if let Some(shape) = args.first() {
                    self.fields(*shape, path, out);
                }
                return;
            }
        }
        for child in named_children(node) {
            self.find(child, path, out);
        }
    }

    /// Walk the properties of an object literal shape.
    fn fields(&self, shape: Node<'_>, path: &str, out: &mut Vec<SchemaReferenceInfo>) {
        let shape = unwrap_expression(shape);
        if shape.kind() != "object" {
            return;
        }
        for member in named_children(shape) {
            let value = match member.kind() {
                "pair" => member.child_by_field_name("value"),
                "shorthand_property_identifier" => Some(member),
                _ => None,
            };
            let (Some(key), Some(value)) = (member_key(self.syntax, member), value) else {
                continue;
            };
            let field_path = join_path(path, &key);

            let resolved = unwrap_reference(self.syntax, value).and_then(|reference| {
                let name = self.names.resolve(&reference.identifier)?;
                (name != self.owner).then(|| (name.to_string(), reference))
            });
            match resolved {
                Some((name, reference)) => out.push(SchemaReferenceInfo {
                    field_path,
                    referenced_schema: name,
                    is_array: reference.is_array,
                    is_record: reference.is_record,
                    is_optional: reference.is_optional,
                }),
                None => self.find(value, &field_path, out),
            }
        }
    }
}

/// Union references of every detected schema built directly from named members.
pub fn analyze_union_references(
    file: &SourceFile,
    schemas: &[DetectedSchema],
    names: &SchemaNames,
) -> BTreeMap<String, UnionReferenceInfo> {
    let syntax = SchemaSyntax::new(file);
    let mut result = BTreeMap::new();

    for schema in schemas {
        let Some(mut value) = syntax.initializer(schema).and_then(|decl| decl.value) else {
            continue;
        };
        while let Some((receiver, method, _)) = syntax.method_call(value) {
            if !TRANSPARENT_METHODS.contains(&method) {
                break;
            }
            value = receiver;
        }
        if let Some(info) = union_reference(&syntax, value, names, &schema.name) {
            result.insert(schema.name.clone(), info);
        }
    }
    result
}

fn union_reference(
    syntax: &SchemaSyntax<'_>,
    value: Node<'_>,
    names: &SchemaNames,
    owner: &str,
) -> Option<UnionReferenceInfo> {
    let (builder, args) = syntax.namespace_call(value)?;
    let (members, discriminator_key) = match (builder, args.as_slice()) {
        ("union", [members, ..]) => (*members, None),
        ("discriminatedUnion", [key, members, ..]) => {
            (*members, Some(syntax.file.string_value(*key)?))
        }
        _ => return None,
    };

    let members = unwrap_expression(members);
    if members.kind() != "array" {
        return None;
    }

    // computed or partially unknown member lists fall back to checker expansion
    let mut member_schemas = Vec::new();
    for element in named_children(members) {
        if element.kind() == "comment" {
            continue;
        }
        let element = unwrap_expression(element);
        if element.kind() != "identifier" {
            return None;
        }
        let name = names.resolve(syntax.text(element))?;
        if name == owner {
            return None;
        }
        member_schemas.push(name.to_string());
    }
    if member_schemas.is_empty() {
        return None;
    }

    Some(UnionReferenceInfo {
        member_schemas,
        is_discriminated: discriminator_key.is_some(),
        discriminator_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detect;

    fn setup(text: &str) -> (SourceFile, Vec<DetectedSchema>, SchemaNames) {
        let file = SourceFile::parse(
            "refs.ts",
            format!("import {{ z }} from \"zod\";\n{text}"),
        )
        .unwrap();
        let schemas = detect(&file);
        let names = SchemaNames::from_detected(&schemas);
        (file, schemas, names)
    }

    #[test]
    fn test_field_references_with_wrappers() {
        let (file, schemas, names) = setup(
            r#"
export const Address = z.object({ street: z.string() });
export const Tag = z.string();
export const User = z.object({
  home: Address,
  work: Address.optional(),
  tags: z.array(Tag),
  profile: z.object({ byKey: z.record(z.string(), Address) }),
  name: z.string(),
}).extend({ Tag });
"#,
        );
        let refs = &analyze_references(&file, &schemas, &names)["User"];
        let paths: Vec<&str> = refs.iter().map(|r| r.field_path.as_str()).collect();
        assert_eq!(paths, vec!["home", "work", "tags", "profile.byKey", "Tag"]);
        assert!(refs[1].is_optional);
        assert!(refs[2].is_array);
        assert!(refs[3].is_record);
        assert_eq!(refs[3].referenced_schema, "Address");
    }

    #[test]
    fn test_unknown_identifiers_are_not_references() {
        let (file, schemas, names) = setup(
            "import { External } from \"pkg\";\nexport const A = z.object({ e: External, self: z.string() });",
        );
        assert!(analyze_references(&file, &schemas, &names).is_empty());
    }

    #[test]
    fn test_discriminated_union_members() {
        let (file, schemas, names) = setup(
            r#"
export const Circle = z.object({ kind: z.literal("circle"), r: z.number() });
export const Square = z.object({ kind: z.literal("square"), s: z.number() });
export const Line = z.object({ kind: z.literal("line"), l: z.number() });
export const Shape = z.discriminatedUnion("kind", [Circle, Square, Line]).describe("a shape");
export const Mixed = z.union([Circle, z.string()]);
"#,
        );
        let unions = analyze_union_references(&file, &schemas, &names);
        let shape = &unions["Shape"];
        assert_eq!(shape.member_schemas, vec!["Circle", "Square", "Line"]);
        assert!(shape.is_discriminated);
        assert_eq!(shape.discriminator_key.as_deref(), Some("kind"));
        assert!(!unions.contains_key("Mixed"));
    }
}
