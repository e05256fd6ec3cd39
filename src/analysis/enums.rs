//! Native enum values
//!
//! `z.nativeEnum(Color)` resolves to the bare name `Color`, which means nothing
//! in a generated file that does not import it. The table built here replaces
//! such names with the literal union of the enum's values.

use std::collections::BTreeMap;

use crate::checker::types::quote;
use crate::scan;
use crate::source::{EnumValue, SourceFile};

/// Native enums of a file with their literal unions
#[derive(Debug, Clone, Default)]
pub struct EnumTable {
    unions: BTreeMap<String, String>,
}

impl EnumTable {
    pub fn from_file(file: &SourceFile) -> Self {
        let unions = file
            .enums()
            .into_iter()
            .filter(|decl| !decl.members.is_empty())
            .map(|decl| {
                let members: Vec<String> = decl
                    .members
                    .iter()
                    .map(|(_, value)| match value {
                        EnumValue::Str(s) => quote(s),
                        EnumValue::Num(n) => n.clone(),
                    })
                    .collect();
                (decl.name, members.join(" | "))
            })
            .collect();
        Self { unions }
    }

    pub fn is_empty(&self) -> bool {
        self.unions.is_empty()
    }

    /// Literal union for an enum name
    pub fn literal_union(&self, name: &str) -> Option<&str> {
        self.unions.get(name).map(String::as_str)
    }

    /// Whole-text replacement: the resolved type is exactly one enum name.
    pub fn replace_whole(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if !trimmed.starts_with(|c: char| c.is_ascii_uppercase()) {
            return None;
        }
        self.literal_union(trimmed).map(str::to_string)
    }

    /// Replace enum names used as types anywhere inside `text`.
    pub fn replace_in_fields(&self, text: &str) -> String {
        if let Some(whole) = self.replace_whole(text) {
            return whole;
        }
        let mut out = text.to_string();
        for (name, union) in &self.unions {
            let spans = scan::identifier_tokens(&out, name);
            for span in spans.into_iter().rev() {
                let followed_by_array = out[span.end..].starts_with("[]");
                let replacement = if followed_by_array {
                    format!("({union})")
                } else {
                    union.clone()
                };
                out = scan::replace_span(&out, span, &replacement);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EnumTable {
        let file = SourceFile::parse(
            "enums.ts",
            "enum Color { Red = \"red\", Blue = \"blue\" }\nexport enum Level { Low, High }",
        )
        .unwrap();
        EnumTable::from_file(&file)
    }

    #[test]
    fn test_whole_text_replacement() {
        let table = table();
        assert_eq!(table.replace_whole("Color").as_deref(), Some(r#""red" | "blue""#));
        assert_eq!(table.replace_whole("Level").as_deref(), Some("0 | 1"));
        assert_eq!(table.replace_whole("Missing"), None);
    }

    #[test]
    fn test_field_position_replacement() {
        let table = table();
        assert_eq!(
            table.replace_in_fields("{ color: Color; levels: Level[]; Color: string; note: \"Color\"; }"),
            r#"{ color: "red" | "blue"; levels: (0 | 1)[]; Color: string; note: "Color"; }"#
        );
    }
}
