//! Structural type representation produced by the checker
//!
//! `TsType` is only ever turned into text; printing follows the conventions of
//! the TypeScript checker's `typeToString` with truncation disabled.

use std::fmt;

use crate::scan;

/// A literal type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    /// Numeric literal as written in source
    Num(String),
    Bool(bool),
    BigInt(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{}", quote(s)),
            Literal::Num(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::BigInt(n) => write!(f, "{}n", n),
        }
    }
}

/// A property of an object type
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
    pub readonly: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, ty: TsType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            readonly: false,
        }
    }
}

/// Side of the schema-library function wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionSide {
    Inner,
    Outer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    Any,
    Unknown,
    Never,
    Undefined,
    Null,
    Void,
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    Literal(Literal),
    Object(Vec<Property>),
    /// Index signature `{ [x: K]: V; }`
    Record {
        key: Box<TsType>,
        value: Box<TsType>,
    },
    Array {
        element: Box<TsType>,
        readonly: bool,
    },
    Tuple {
        items: Vec<TsType>,
        rest: Option<Box<TsType>>,
        readonly: bool,
    },
    Union(Vec<TsType>),
    Intersection(Vec<TsType>),
    /// A named type printed as-is (`Date`, an enum, a class)
    Ref(String),
    /// A named generic (`Promise<T>`, `Map<K, V>`, `Set<T>`)
    Generic {
        name: String,
        args: Vec<TsType>,
    },
    /// The schema library's internal function type wrapper
    Function(FunctionSide),
    /// Brand marker; only ever appears inside an intersection
    Brand(String),
    /// Verbatim type text (annotations, template literals)
    Raw(String),
}

impl TsType {
    pub fn string_literal(value: impl Into<String>) -> Self {
        TsType::Literal(Literal::Str(value.into()))
    }

    pub fn array(element: TsType) -> Self {
        TsType::Array {
            element: Box::new(element),
            readonly: false,
        }
    }

    pub fn generic(name: &str, args: Vec<TsType>) -> Self {
        TsType::Generic {
            name: name.to_string(),
            args,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, TsType::Undefined | TsType::Null)
    }

    /// Union members, or the type itself
    pub fn members(&self) -> Vec<TsType> {
        match self {
            TsType::Union(members) => members.clone(),
            other => vec![other.clone()],
        }
    }

    /// Remove `undefined` from a union.
    pub fn without_undefined(&self) -> TsType {
        union(
            self.members()
                .into_iter()
                .filter(|m| *m != TsType::Undefined)
                .collect(),
        )
    }

    /// Widen literal types to their primitive.
    pub fn widen(&self) -> TsType {
        match self {
            TsType::Literal(Literal::Str(_)) => TsType::String,
            TsType::Literal(Literal::Num(_)) => TsType::Number,
            TsType::Literal(Literal::Bool(_)) => TsType::Boolean,
            TsType::Literal(Literal::BigInt(_)) => TsType::BigInt,
            TsType::Union(members) => union(members.iter().map(TsType::widen).collect()),
            other => other.clone(),
        }
    }

    /// Apply `Readonly<T>` the way the checker prints it.
    pub fn readonly(&self) -> TsType {
        match self {
            TsType::Object(props) => TsType::Object(
                props
                    .iter()
                    .cloned()
                    .map(|p| Property { readonly: true, ..p })
                    .collect(),
            ),
            TsType::Array { element, .. } => TsType::Array {
                element: element.clone(),
                readonly: true,
            },
            TsType::Tuple { items, rest, .. } => TsType::Tuple {
                items: items.clone(),
                rest: rest.clone(),
                readonly: true,
            },
            TsType::Generic { name, args } if name == "Map" || name == "Set" => TsType::Generic {
                name: format!("Readonly{name}"),
                args: args.clone(),
            },
            TsType::Union(members) => union(members.iter().map(TsType::readonly).collect()),
            other => other.clone(),
        }
    }

    fn print_element(&self) -> String {
        match self {
            TsType::Union(_) | TsType::Intersection(_) | TsType::Function(_) => {
                format!("({})", self)
            }
            TsType::Array { readonly: true, .. } | TsType::Tuple { readonly: true, .. } => {
                format!("({})", self)
            }
            TsType::Raw(text) => scan::parenthesize_compound(text),
            other => other.to_string(),
        }
    }

    fn print_intersection_member(&self) -> String {
        match self {
            TsType::Union(_) | TsType::Function(_) => format!("({})", self),
            TsType::Raw(text) => scan::parenthesize_compound(text),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TsType::Any => f.write_str("any"),
            TsType::Unknown => f.write_str("unknown"),
            TsType::Never => f.write_str("never"),
            TsType::Undefined => f.write_str("undefined"),
            TsType::Null => f.write_str("null"),
            TsType::Void => f.write_str("void"),
            TsType::String => f.write_str("string"),
            TsType::Number => f.write_str("number"),
            TsType::Boolean => f.write_str("boolean"),
            TsType::BigInt => f.write_str("bigint"),
            TsType::Symbol => f.write_str("symbol"),
            TsType::Literal(lit) => write!(f, "{}", lit),
            TsType::Object(props) => {
                if props.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for prop in props {
                    if prop.readonly {
                        f.write_str("readonly ")?;
                    }
                    f.write_str(&property_key(&prop.name))?;
                    if prop.optional {
                        f.write_str("?")?;
                    }
                    write!(f, ": {}; ", prop.ty)?;
                }
                f.write_str("}")
            }
            TsType::Record { key, value } => {
                let key = match key.as_ref() {
                    TsType::Number => "number",
                    TsType::Symbol => "symbol",
                    _ => "string",
                };
                write!(f, "{{ [x: {}]: {}; }}", key, value)
            }
            TsType::Array { element, readonly } => {
                if *readonly {
                    f.write_str("readonly ")?;
                }
                write!(f, "{}[]", element.print_element())
            }
            TsType::Tuple {
                items,
                rest,
                readonly,
            } => {
                if *readonly {
                    f.write_str("readonly ")?;
                }
                let mut parts: Vec<String> = items.iter().map(|t| t.to_string()).collect();
                if let Some(rest) = rest {
                    parts.push(format!("...{}[]", rest.print_element()));
                }
                write!(f, "[{}]", parts.join(", "))
            }
            TsType::Union(members) => {
                let parts: Vec<String> = members
                    .iter()
                    .map(|m| match m {
                        TsType::Function(_) => format!("({})", m),
                        TsType::Raw(text) if text.contains("=>") => {
                            scan::parenthesize_compound(text)
                        }
                        other => other.to_string(),
                    })
                    .collect();
                f.write_str(&parts.join(" | "))
            }
            TsType::Intersection(members) => {
                let parts: Vec<String> = members
                    .iter()
                    .map(TsType::print_intersection_member)
                    .collect();
                f.write_str(&parts.join(" & "))
            }
            TsType::Ref(name) => f.write_str(name),
            TsType::Generic { name, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}<{}>", name, args.join(", "))
            }
            TsType::Function(FunctionSide::Outer) => f.write_str(
                "z.core.$InferOuterFunctionType<z.core.$ZodFunctionArgs, z.core.$ZodFunctionOut>",
            ),
            TsType::Function(FunctionSide::Inner) => f.write_str(
                "z.core.$InferInnerFunctionType<z.core.$ZodFunctionArgs, z.core.$ZodFunctionOut>",
            ),
            TsType::Brand(name) => write!(f, "{{ [z.$brand]: {{ {}: true; }}; }}", property_key(name)),
            TsType::Raw(text) => f.write_str(text),
        }
    }
}

/// Build a union the way the checker reduces one.
///
/// Nested unions flatten, `any`/`unknown` absorb everything, `never` drops out,
/// duplicates collapse, `true | false` becomes `boolean`, and `null` then
/// `undefined` move to the end.
pub fn union(members: Vec<TsType>) -> TsType {
    let mut flat: Vec<TsType> = Vec::new();
    for member in members {
        match member {
            TsType::Union(inner) => flat.extend(inner),
            TsType::Never => {}
            other => flat.push(other),
        }
    }

    if flat.contains(&TsType::Any) {
        return TsType::Any;
    }
    if flat.contains(&TsType::Unknown) {
        return TsType::Unknown;
    }

    let mut out: Vec<TsType> = Vec::new();
    let mut has_null = false;
    let mut has_undefined = false;
    for member in flat {
        match member {
            TsType::Null => has_null = true,
            TsType::Undefined => has_undefined = true,
            other => {
                if !out.contains(&other) {
                    out.push(other);
                }
            }
        }
    }

    if out.contains(&TsType::Boolean) {
        out.retain(|m| !matches!(m, TsType::Literal(Literal::Bool(_))));
    }
    let true_at = out
        .iter()
        .position(|m| *m == TsType::Literal(Literal::Bool(true)));
    let false_at = out
        .iter()
        .position(|m| *m == TsType::Literal(Literal::Bool(false)));
    if let (Some(t), Some(f)) = (true_at, false_at) {
        let first = t.min(f);
        out[first] = TsType::Boolean;
        out.remove(t.max(f));
    }
    if out.contains(&TsType::String) {
        out.retain(|m| !matches!(m, TsType::Literal(Literal::Str(_))));
    }
    if out.contains(&TsType::Number) {
        out.retain(|m| !matches!(m, TsType::Literal(Literal::Num(_))));
    }

    if has_null {
        out.push(TsType::Null);
    }
    if has_undefined {
        out.push(TsType::Undefined);
    }

    match out.len() {
        0 => TsType::Never,
        1 => out.remove(0),
        _ => TsType::Union(out),
    }
}

/// Build an intersection, flattening nested ones.
pub fn intersection(members: Vec<TsType>) -> TsType {
    let mut flat = Vec::new();
    for member in members {
        match member {
            TsType::Intersection(inner) => flat.extend(inner),
            TsType::Unknown => {}
            other => flat.push(other),
        }
    }
    if flat.contains(&TsType::Never) {
        return TsType::Never;
    }
    match flat.len() {
        0 => TsType::Unknown,
        1 => flat.remove(0),
        _ => TsType::Intersection(flat),
    }
}

/// Quote a string the way the checker prints string literal types.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Print a property key, quoting it when it is not an identifier.
pub fn property_key(name: &str) -> String {
    let numeric = !name.is_empty() && name.chars().all(|c| c.is_ascii_digit());
    if scan::is_identifier(name) || numeric {
        name.to_string()
    } else {
        quote(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(props: Vec<Property>) -> TsType {
        TsType::Object(props)
    }

    #[test]
    fn test_object_printing() {
        let ty = object(vec![
            Property::new("id", TsType::String),
            Property {
                optional: true,
                ..Property::new("age", union(vec![TsType::Number, TsType::Undefined]))
            },
            Property::new("odd-key", TsType::Boolean),
        ]);
        assert_eq!(
            ty.to_string(),
            r#"{ id: string; age?: number | undefined; "odd-key": boolean; }"#
        );
        assert_eq!(object(vec![]).to_string(), "{}");
    }

    #[test]
    fn test_union_reduction() {
        let ty = union(vec![
            TsType::Undefined,
            TsType::Literal(Literal::Bool(true)),
            TsType::Null,
            TsType::String,
            TsType::Literal(Literal::Bool(false)),
            TsType::String,
        ]);
        assert_eq!(ty.to_string(), "boolean | string | null | undefined");

        assert_eq!(union(vec![TsType::Number, TsType::Any]), TsType::Any);
        assert_eq!(union(vec![TsType::Never, TsType::Number]), TsType::Number);
        assert_eq!(union(vec![]), TsType::Never);
    }

    #[test]
    fn test_array_and_tuple_printing() {
        let elem = union(vec![TsType::String, TsType::Number]);
        assert_eq!(TsType::array(elem).to_string(), "(string | number)[]");
        assert_eq!(TsType::array(TsType::String).readonly().to_string(), "readonly string[]");

        let tuple = TsType::Tuple {
            items: vec![TsType::String, TsType::Number],
            rest: Some(Box::new(TsType::Boolean)),
            readonly: false,
        };
        assert_eq!(tuple.to_string(), "[string, number, ...boolean[]]");
    }

    #[test]
    fn test_record_and_generic_printing() {
        let record = TsType::Record {
            key: Box::new(TsType::String),
            value: Box::new(TsType::Number),
        };
        assert_eq!(record.to_string(), "{ [x: string]: number; }");
        assert_eq!(
            TsType::generic("Map", vec![TsType::String, TsType::Ref("Date".into())]).to_string(),
            "Map<string, Date>"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b"#), r#""a\"b""#);
        assert_eq!(TsType::string_literal("x").to_string(), r#""x""#);
    }

    #[test]
    fn test_property_keys() {
        assert_eq!(property_key("ñ"), "ñ");
        assert_eq!(property_key("Über_1"), "Über_1");
        assert_eq!(property_key("42"), "42");
        assert_eq!(property_key("odd-key"), r#""odd-key""#);
        assert_eq!(property_key(r#"q"k"#), r#""q\"k""#);
    }
}
