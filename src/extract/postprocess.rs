//! Text clean-up applied to raw checker output

use tree_sitter::Node;

use crate::scan;
use crate::source::{first_named_child, named_children, SourceFile};

/// Placeholder for the library's internal function types
pub const FUNCTION_PLACEHOLDER: &str = "(...args: any[]) => any";

const FUNCTION_MARKERS: &[&str] = &["$InferOuterFunctionType<", "$InferInnerFunctionType<"];

/// Collapse `core.$InferOuterFunctionType<...>` (and the inner variant) to a
/// plain function type.
pub fn collapse_function_types(text: &str) -> String {
    let mut out = text.to_string();
    while let Some((start, open)) = find_marker(&out) {
        let Some(close) = scan::matching_close(&out, open) else {
            break;
        };
        let end = close + 1;
        let replacement = if needs_parentheses(&out, start, end) {
            format!("({FUNCTION_PLACEHOLDER})")
        } else {
            FUNCTION_PLACEHOLDER.to_string()
        };
        out = scan::replace_span(&out, start..end, &replacement);
    }
    out
}

/// Start of the qualified marker name and the index of its `<`.
fn find_marker(text: &str) -> Option<(usize, usize)> {
    let (at, marker) = FUNCTION_MARKERS
        .iter()
        .filter_map(|m| text.find(m).map(|at| (at, *m)))
        .min_by_key(|(at, _)| *at)?;
    let start = text[..at]
        .char_indices()
        .rev()
        .take_while(|(_, c)| scan::is_ident_char(*c) || *c == '.')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(at);
    Some((start, at + marker.len() - 1))
}

fn needs_parentheses(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].trim_end();
    let after = text[end..].trim_start();
    if before.ends_with('(') && after.starts_with(')') {
        return false;
    }
    after.starts_with("[]")
        || after.starts_with('|')
        || after.starts_with('&')
        || before.ends_with('|')
        || before.ends_with('&')
}

/// Checker-style text of a local interface or non-generic type alias.
///
/// Interfaces with `extends` render as an intersection with their bases.
pub fn render_local_type(file: &SourceFile, name: &str) -> Option<String> {
    let declaration = file.find_type_declaration(name)?;
    if declaration.child_by_field_name("type_parameters").is_some() {
        return None;
    }
    match declaration.kind() {
        "interface_declaration" => {
            let body = declaration.child_by_field_name("body")?;
            let mut parts: Vec<String> = named_children(declaration)
                .into_iter()
                .filter(|c| c.kind() == "extends_type_clause")
                .flat_map(named_children)
                .map(|base| collapse_whitespace(file.node_text(base)))
                .collect();
            parts.push(render_members(file, body));
            Some(parts.join(" & "))
        }
        "type_alias_declaration" => {
            let value = declaration.child_by_field_name("value")?;
            if value.kind() == "object_type" {
                Some(render_members(file, value))
            } else {
                Some(collapse_whitespace(file.node_text(value)))
            }
        }
        _ => None,
    }
}

fn render_members(file: &SourceFile, body: Node<'_>) -> String {
    let members: Vec<String> = named_children(body)
        .into_iter()
        .filter(|m| m.kind() != "comment")
        .map(|member| render_member(file, member))
        .collect();
    if members.is_empty() {
        return "{}".to_string();
    }
    format!("{{ {} }}", members.join(" "))
}

fn render_member(file: &SourceFile, member: Node<'_>) -> String {
    if member.kind() != "property_signature" {
        let text = collapse_whitespace(file.node_text(member));
        let text = text.trim_end_matches([';', ',']);
        return format!("{text};");
    }
    let name = member
        .child_by_field_name("name")
        .map(|n| file.node_text(n))
        .unwrap_or_default();
    let mut cursor = member.walk();
    let tokens: Vec<&str> = member
        .children(&mut cursor)
        .filter(|c| !c.is_named())
        .map(|c| c.kind())
        .collect();
    let optional = tokens.contains(&"?");
    let readonly = tokens.contains(&"readonly");

    let ty = member
        .child_by_field_name("type")
        .and_then(first_named_child)
        .map(|t| collapse_whitespace(file.node_text(t)))
        .unwrap_or_else(|| "any".to_string());
    let ty = if optional && !has_undefined(&ty) {
        format!("{ty} | undefined")
    } else {
        ty
    };

    format!(
        "{}{}{}: {};",
        if readonly { "readonly " } else { "" },
        name,
        if optional { "?" } else { "" },
        ty
    )
}

fn has_undefined(ty: &str) -> bool {
    scan::split_top_level(ty, '|')
        .into_iter()
        .any(|s| &ty[s] == "undefined")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTER: &str = "z.core.$InferOuterFunctionType<z.core.$ZodFunctionArgs, z.core.$ZodFunctionOut>";

    #[test]
    fn test_collapse_function_types() {
        assert_eq!(
            collapse_function_types(&format!("{{ onClick: {OUTER}; }}")),
            "{ onClick: (...args: any[]) => any; }"
        );
        assert_eq!(
            collapse_function_types(&format!("{{ handlers: {OUTER}[]; cb?: {OUTER} | undefined; }}")),
            "{ handlers: ((...args: any[]) => any)[]; cb?: ((...args: any[]) => any) | undefined; }"
        );
        assert_eq!(collapse_function_types("{ a: string; }"), "{ a: string; }");
    }

    #[test]
    fn test_render_interface_and_alias() {
        let file = SourceFile::parse(
            "types.ts",
            r#"interface Base { id: string }
interface Category extends Base {
  name: string;
  readonly children?: Category[];
}
type Pair = { left: number, right: number };
type Id = string | number;
type Box<T> = { value: T };
"#,
        )
        .unwrap();
        assert_eq!(
            render_local_type(&file, "Category").as_deref(),
            Some("Base & { name: string; readonly children?: Category[] | undefined; }")
        );
        assert_eq!(
            render_local_type(&file, "Pair").as_deref(),
            Some("{ left: number; right: number; }")
        );
        assert_eq!(render_local_type(&file, "Id").as_deref(), Some("string | number"));
        assert_eq!(render_local_type(&file, "Box"), None);
        assert_eq!(render_local_type(&file, "Missing"), None);
    }
}
