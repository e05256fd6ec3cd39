//! Multi-line layout for object types
//!
//! Object literals are expanded one member per line with two-space indent.
//! Described fields get a `/** ... */` comment on the line above. Paths follow
//! the description convention: nested objects add a segment, arrays and
//! unions do not.

use std::collections::BTreeMap;

use crate::analysis::join_path;
use crate::scan::{self, MemberKind};

const INDENT: &str = "  ";

/// Lay out `text`, attaching `descriptions` keyed by dotted field path.
pub fn format_type(text: &str, descriptions: &BTreeMap<String, String>) -> String {
    format_at(text, 0, "", descriptions)
}

fn format_at(text: &str, level: usize, path: &str, descriptions: &BTreeMap<String, String>) -> String {
    let opens: Vec<usize> = scan::scan(text)
        .into_iter()
        .filter(|c| c.depth == 0 && c.ch == '{')
        .map(|c| c.index)
        .collect();

    let mut out = String::with_capacity(text.len() * 2);
    let mut last = 0;
    for open in opens {
        if open < last {
            continue;
        }
        let Some(close) = scan::matching_close(text, open) else {
            continue;
        };
        out.push_str(&text[last..open]);
        let group = &text[open..=close];
        match scan::object_members(group) {
            Some(members) if !members.is_empty() => {
                out.push_str(&format_object(group, &members, level, path, descriptions));
            }
            _ => out.push_str(group),
        }
        last = close + 1;
    }
    out.push_str(&text[last..]);
    out
}

fn format_object(
    group: &str,
    members: &[scan::Member],
    level: usize,
    path: &str,
    descriptions: &BTreeMap<String, String>,
) -> String {
    let pad = INDENT.repeat(level + 1);
    let mut out = String::from("{\n");

    for member in members {
        let member_path = match member.kind {
            MemberKind::Property => join_path(path, &member.key),
            MemberKind::Index => path.to_string(),
        };
        if member.kind == MemberKind::Property {
            if let Some(description) = descriptions.get(&member_path) {
                out.push_str(&doc_comment(description, &pad));
            }
        }
        let head = group[member.span.start..member.value.start].trim_end();
        let value = &group[member.value.clone()];
        out.push_str(&format!(
            "{pad}{head} {};\n",
            format_at(value, level + 1, &member_path, descriptions)
        ));
    }

    out.push_str(&INDENT.repeat(level));
    out.push('}');
    out
}

/// `/** ... */` comment block, one line when the text is one line.
pub fn doc_comment(text: &str, pad: &str) -> String {
    let text = text.replace("*/", "*\\/");
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    match lines.as_slice() {
        [] => String::new(),
        [single] => format!("{pad}/** {single} */\n"),
        many => {
            let mut out = format!("{pad}/**\n");
            for line in many {
                if line.is_empty() {
                    out.push_str(&format!("{pad} *\n"));
                } else {
                    out.push_str(&format!("{pad} * {line}\n"));
                }
            }
            out.push_str(&format!("{pad} */\n"));
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_objects_expand() {
        let text = "{ id: string; tags: { label: string; }[]; meta?: { [x: string]: number; } | undefined; }";
        assert_eq!(
            format_type(text, &BTreeMap::new()),
            "{\n  id: string;\n  tags: {\n    label: string;\n  }[];\n  meta?: {\n    [x: string]: number;\n  } | undefined;\n}"
        );
    }

    #[test]
    fn test_field_descriptions_become_comments() {
        let descriptions = BTreeMap::from([
            ("id".to_string(), "Unique id".to_string()),
            ("tags.label".to_string(), "Shown in the UI\nkeep short".to_string()),
        ]);
        let text = "{ id: string; tags: { label: string; }[]; }";
        assert_eq!(
            format_type(text, &descriptions),
            "{\n  /** Unique id */\n  id: string;\n  tags: {\n    /**\n     * Shown in the UI\n     * keep short\n     */\n    label: string;\n  }[];\n}"
        );
    }

    #[test]
    fn test_non_objects_unchanged() {
        let empty = BTreeMap::new();
        assert_eq!(format_type("string | number", &empty), "string | number");
        assert_eq!(format_type("{}", &empty), "{}");
        assert_eq!(format_type(r#""{ not: an; object }""#, &empty), r#""{ not: an; object }""#);
    }
}
