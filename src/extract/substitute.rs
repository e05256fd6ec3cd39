//! Reference and brand surgery on resolved type texts
//!
//! The checker inlines every referenced schema. These edits put the generated
//! names back where a field's value is another schema, and attach brand
//! markers the normalizer erased.

use crate::analysis::BrandInfo;
use crate::scan;

const NULLISH: &[&str] = &["null", "undefined"];

/// How a referenced schema is wrapped at the field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wrapping {
    pub is_array: bool,
    pub is_record: bool,
}

impl Wrapping {
    fn wrap(&self, inner: &str) -> String {
        if self.is_array {
            format!("{}[]", scan::parenthesize_compound(inner))
        } else if self.is_record {
            format!("{{ [x: string]: {inner}; }}")
        } else {
            inner.to_string()
        }
    }
}

/// Replace the expanded value of the field at `path` with `name`.
///
/// `expanded` is the referenced schema's own resolved text on the same side.
/// The whole non-nullish part of the field is replaced when it equals the
/// (wrapped) expansion; otherwise only members that still look like an
/// inline object or a record signature are. Returns `None` when nothing
/// changed.
pub fn substitute_reference(
    text: &str,
    path: &str,
    expanded: &str,
    wrapping: Wrapping,
    name: &str,
) -> Option<String> {
    let segments: Vec<&str> = path.split('.').collect();
    let span = scan::find_property_value(text, &segments)?;
    let value = &text[span.clone()];

    let members: Vec<&str> = scan::split_top_level(value, '|')
        .into_iter()
        .map(|s| &value[s])
        .collect();
    let (nullish, core): (Vec<&str>, Vec<&str>) =
        members.iter().partition(|m| NULLISH.contains(m));
    if core.is_empty() {
        return None;
    }

    let expected = wrapping.wrap(expanded);
    let replacement = wrapping.wrap(name);
    let joined = core.join(" | ");

    let new_core: Vec<String> = if let Some(rest) = joined.strip_prefix("readonly ") {
        if rest == expected {
            vec![format!("readonly {replacement}")]
        } else {
            replace_members(&core, expanded, &replacement)?
        }
    } else if joined == expected {
        vec![replacement]
    } else {
        replace_members(&core, expanded, &replacement)?
    };

    let mut rebuilt = new_core;
    rebuilt.extend(nullish.iter().map(|m| m.to_string()));
    Some(scan::replace_span(text, span, &rebuilt.join(" | ")))
}

fn replace_members(core: &[&str], expanded: &str, replacement: &str) -> Option<Vec<String>> {
    let mut changed = false;
    let members = core
        .iter()
        .map(|member| {
            let (prefix, body) = match member.strip_prefix("readonly ") {
                Some(rest) => ("readonly ", rest),
                None => ("", *member),
            };
            if scan::looks_like_inline_object(body)
                || scan::looks_like_record(body)
                || body == expanded
            {
                changed = true;
                format!("{prefix}{replacement}")
            } else {
                member.to_string()
            }
        })
        .collect();
    changed.then_some(members)
}

/// Marker type intersected into branded output types
pub fn brand_marker(brand: &str) -> String {
    format!("$brand<{}>", crate::checker::types::quote(brand))
}

/// Attach brand markers to an output type text.
pub fn inject_brands(text: &str, brands: &[BrandInfo]) -> String {
    let mut out = text.to_string();
    // field brands first: their paths are looked up in the unbranded root
    for brand in brands.iter().filter(|b| !b.is_root()) {
        let segments: Vec<&str> = brand.field_path.split('.').collect();
        if let Some(span) = scan::find_property_value(&out, &segments) {
            let marker = brand_marker(&brand.brand_name);
            let branded = brand_value(&out[span.clone()], &marker, brand.element_depth);
            out = scan::replace_span(&out, span, &branded);
        }
    }
    for brand in brands.iter().filter(|b| b.is_root()) {
        let marker = brand_marker(&brand.brand_name);
        out = if brand.element_depth == 0 {
            format!("{} & {marker}", scan::parenthesize_compound(&out))
        } else {
            brand_value(&out, &marker, brand.element_depth)
        };
    }
    out
}

/// Intersect `marker` into every non-nullish member of `value`, `depth`
/// array levels down.
fn brand_value(value: &str, marker: &str, depth: usize) -> String {
    let members: Vec<String> = scan::split_top_level(value, '|')
        .into_iter()
        .map(|s| &value[s])
        .map(|member| {
            if NULLISH.contains(&member) {
                member.to_string()
            } else if depth == 0 {
                format!("{} & {marker}", scan::parenthesize_compound(member))
            } else {
                brand_element(member, marker, depth).unwrap_or_else(|| member.to_string())
            }
        })
        .collect();
    members.join(" | ")
}

/// `T[]` → `(T & marker)[]`; `None` when `member` is not an array type.
fn brand_element(member: &str, marker: &str, depth: usize) -> Option<String> {
    let (prefix, body) = match member.strip_prefix("readonly ") {
        Some(rest) => ("readonly ", rest),
        None => ("", member),
    };
    let element = body.strip_suffix("[]")?.trim();
    let element = if scan::is_wrapped(element, '(') {
        &element[1..element.len() - 1]
    } else {
        element
    };
    let branded = brand_value(element, marker, depth - 1);
    Some(format!("{prefix}{}[]", scan::parenthesize_compound(&branded)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "{ street: string; city: string; }";

    #[test]
    fn test_direct_and_optional_reference() {
        let text = format!("{{ id: string; home: {ADDRESS}; work?: {ADDRESS} | undefined; }}");
        let once = substitute_reference(&text, "home", ADDRESS, Wrapping::default(), "AddressOutput").unwrap();
        let twice = substitute_reference(&once, "work", ADDRESS, Wrapping::default(), "AddressOutput").unwrap();
        assert_eq!(
            twice,
            "{ id: string; home: AddressOutput; work?: AddressOutput | undefined; }"
        );
    }

    #[test]
    fn test_array_and_record_wrapping() {
        let text = format!("{{ items: {ADDRESS}[]; byId: {{ [x: string]: {ADDRESS}; }}; }}");
        let array = Wrapping { is_array: true, is_record: false };
        let record = Wrapping { is_array: false, is_record: true };
        let step = substitute_reference(&text, "items", ADDRESS, array, "Address").unwrap();
        let done = substitute_reference(&step, "byId", ADDRESS, record, "Address").unwrap();
        assert_eq!(done, "{ items: Address[]; byId: { [x: string]: Address; }; }");
    }

    #[test]
    fn test_readonly_array_prefix_kept() {
        let text = format!("{{ items: readonly {ADDRESS}[]; }}");
        let array = Wrapping { is_array: true, is_record: false };
        assert_eq!(
            substitute_reference(&text, "items", ADDRESS, array, "A").unwrap(),
            "{ items: readonly A[]; }"
        );
    }

    #[test]
    fn test_primitive_reference_by_equality() {
        let text = r#"{ status: "on" | "off"; note: string; }"#;
        let replaced =
            substitute_reference(text, "status", r#""on" | "off""#, Wrapping::default(), "Status")
                .unwrap();
        assert_eq!(replaced, "{ status: Status; note: string; }");
        assert!(substitute_reference(text, "note", "number", Wrapping::default(), "N").is_none());
    }

    #[test]
    fn test_nested_path() {
        let text = format!("{{ meta: {{ owner: {ADDRESS}; }}; }}");
        assert_eq!(
            substitute_reference(&text, "meta.owner", ADDRESS, Wrapping::default(), "Addr").unwrap(),
            "{ meta: { owner: Addr; }; }"
        );
    }

    #[test]
    fn test_brand_injection() {
        let root = vec![BrandInfo::new("UserId", "")];
        assert_eq!(inject_brands("string", &root), r#"string & $brand<"UserId">"#);
        assert_eq!(
            inject_brands("string | number", &root),
            r#"(string | number) & $brand<"UserId">"#
        );

        let field = vec![BrandInfo::new("Email", "email")];
        assert_eq!(
            inject_brands("{ email?: string | undefined; name: string; }", &field),
            r#"{ email?: string & $brand<"Email"> | undefined; name: string; }"#
        );
    }

    #[test]
    fn test_array_element_brand() {
        let tags = vec![BrandInfo {
            element_depth: 1,
            ..BrandInfo::new("Tag", "tags")
        }];
        assert_eq!(
            inject_brands("{ tags: string[]; other?: number[] | undefined; }", &tags),
            r#"{ tags: (string & $brand<"Tag">)[]; other?: number[] | undefined; }"#
        );
        assert_eq!(
            inject_brands("{ tags?: readonly (string | null)[] | undefined; }", &tags),
            r#"{ tags?: readonly (string & $brand<"Tag"> | null)[] | undefined; }"#
        );

        let grid = vec![BrandInfo {
            element_depth: 2,
            ..BrandInfo::new("Cell", "")
        }];
        assert_eq!(
            inject_brands("number[][]", &grid),
            r#"(number & $brand<"Cell">)[][]"#
        );
    }
}
