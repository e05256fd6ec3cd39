//! Return type inference for transform callbacks
//!
//! A small expression typer: literals, the callback parameter, common
//! string/number/array/date methods, global conversions, constructors, object
//! and array literals and conditionals. Anything it cannot see through is
//! `unknown`. Return types are widened the way an unannotated callback's are.

use std::collections::HashMap;

use tree_sitter::Node;

use super::types::{union, Property, TsType};
use crate::source::{first_named_child, named_children, unwrap_expression, SourceFile};

const STRING_METHODS: &[&str] = &[
    "toUpperCase", "toLowerCase", "toLocaleUpperCase", "toLocaleLowerCase", "trim",
    "trimStart", "trimEnd", "padStart", "padEnd", "substring", "substr", "replace",
    "replaceAll", "charAt", "repeat", "normalize", "toString", "toFixed", "toPrecision",
    "toISOString", "toDateString", "toTimeString", "toLocaleString", "toLocaleDateString",
    "toLocaleTimeString", "toUTCString", "toJSON", "join",
];

const BOOLEAN_METHODS: &[&str] = &[
    "includes", "startsWith", "endsWith", "some", "every", "has", "test", "isArray",
    "isInteger", "isFinite", "isNaN", "isSafeInteger",
];

const NUMBER_METHODS: &[&str] = &[
    "indexOf", "lastIndexOf", "findIndex", "getTime", "charCodeAt", "codePointAt",
    "getFullYear", "getMonth", "getDate", "getDay", "getHours", "getMinutes", "getSeconds",
    "getMilliseconds", "getTimezoneOffset", "localeCompare", "push", "unshift", "now",
];

/// Receiver-preserving array methods
const SAME_ARRAY_METHODS: &[&str] = &["filter", "sort", "reverse", "slice", "concat", "toSorted", "toReversed"];

type Env = HashMap<String, TsType>;

/// Output type of `callback` when called with a value of type `param`.
pub fn infer_callback(file: &SourceFile, callback: Node<'_>, param: &TsType) -> TsType {
    let callback = unwrap_expression(callback);

    // `.transform(normalizeName)` where the function is declared in the file
    if callback.kind() == "identifier" {
        let name = file.node_text(callback);
        if let Some(function) = file.find_function(name) {
            return infer_function(file, function, param);
        }
        if let Some(value) = file.find_variable(name).and_then(|decl| decl.value) {
            return infer_callback(file, value, param);
        }
        return TsType::Unknown;
    }

    if !matches!(
        callback.kind(),
        "arrow_function" | "function_expression" | "function" | "function_declaration"
    ) {
        return TsType::Unknown;
    }
    infer_function(file, callback, param)
}

fn infer_function(file: &SourceFile, function: Node<'_>, param: &TsType) -> TsType {
    if let Some(annotation) = function.child_by_field_name("return_type") {
        let text = first_named_child(annotation)
            .map(|ty| file.node_text(ty))
            .unwrap_or_else(|| file.node_text(annotation))
            .trim();
        return TsType::Raw(awaited_text(text).to_string());
    }

    let mut env = Env::new();
    if let Some(name) = first_parameter(file, function) {
        env.insert(name, param.clone());
    }

    let Some(body) = function.child_by_field_name("body") else {
        return TsType::Unknown;
    };
    let result = if body.kind() == "statement_block" {
        let mut returns = Vec::new();
        collect_returns(file, body, &mut env, &mut returns);
        if returns.is_empty() {
            TsType::Void
        } else {
            union(returns)
        }
    } else {
        type_of(file, body, &env)
    };

    match result.widen() {
        TsType::Generic { name, mut args } if name == "Promise" && args.len() == 1 => {
            args.remove(0)
        }
        other => other,
    }
}

/// Strip a `Promise<...>` wrapper; async transforms resolve before output.
fn awaited_text(text: &str) -> &str {
    text.strip_prefix("Promise<")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(text)
}

fn first_parameter(file: &SourceFile, function: Node<'_>) -> Option<String> {
    if let Some(single) = function.child_by_field_name("parameter") {
        return Some(file.node_text(single).to_string());
    }
    let params = function.child_by_field_name("parameters")?;
    let first = named_children(params)
        .into_iter()
        .find(|p| p.kind() != "comment")?;
    let pattern = match first.kind() {
        "identifier" => first,
        _ => first.child_by_field_name("pattern")?,
    };
    (pattern.kind() == "identifier").then(|| file.node_text(pattern).to_string())
}

/// Collect return types from a block, recording `const` bindings on the way.
fn collect_returns(file: &SourceFile, block: Node<'_>, env: &mut Env, out: &mut Vec<TsType>) {
    for statement in named_children(block) {
        match statement.kind() {
            "return_statement" => {
                let ty = first_named_child(statement)
                    .map(|value| type_of(file, value, env))
                    .unwrap_or(TsType::Undefined);
                out.push(ty);
            }
            "lexical_declaration" | "variable_declaration" => {
                for declarator in named_children(statement) {
                    let (Some(name), Some(value)) = (
                        declarator.child_by_field_name("name"),
                        declarator.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    if name.kind() == "identifier" {
                        let ty = type_of(file, value, env).widen();
                        env.insert(file.node_text(name).to_string(), ty);
                    }
                }
            }
            "if_statement" | "else_clause" | "statement_block" | "try_statement"
            | "catch_clause" | "finally_clause" | "switch_statement" | "switch_body"
            | "switch_case" | "switch_default" | "for_statement" | "for_in_statement"
            | "while_statement" => {
                let mut scoped = env.clone();
                collect_returns(file, statement, &mut scoped, out);
            }
            _ => {}
        }
    }
}

fn type_of(file: &SourceFile, node: Node<'_>, env: &Env) -> TsType {
    let text = file.node_text(node);
    match node.kind() {
        "string" | "template_string" => TsType::String,
        "number" => TsType::Number,
        "true" | "false" => TsType::Boolean,
        "null" => TsType::Null,
        "undefined" => TsType::Undefined,
        "regex" => TsType::Ref("RegExp".to_string()),
        "identifier" => match text {
            "undefined" => TsType::Undefined,
            "NaN" | "Infinity" => TsType::Number,
            name => env.get(name).cloned().unwrap_or(TsType::Unknown),
        },
        "parenthesized_expression" | "satisfies_expression" => first_named_child(node)
            .map(|inner| type_of(file, inner, env))
            .unwrap_or(TsType::Unknown),
        "non_null_expression" => first_named_child(node)
            .map(|inner| {
                let ty = type_of(file, inner, env);
                union(ty.members().into_iter().filter(|m| !m.is_nullish()).collect())
            })
            .unwrap_or(TsType::Unknown),
        "as_expression" => {
            let children = named_children(node);
            match (children.first(), children.get(1)) {
                (Some(inner), Some(ty)) if file.node_text(*ty) == "const" => {
                    type_of(file, *inner, env)
                }
                (_, Some(ty)) => TsType::Raw(file.node_text(*ty).to_string()),
                _ => TsType::Unknown,
            }
        }
        "await_expression" => match first_named_child(node).map(|inner| type_of(file, inner, env)) {
            Some(TsType::Generic { name, mut args }) if name == "Promise" && args.len() == 1 => {
                args.remove(0)
            }
            Some(other) => other,
            None => TsType::Unknown,
        },
        "unary_expression" => {
            let operator = node
                .child_by_field_name("operator")
                .map(|op| file.node_text(op))
                .unwrap_or("");
            match operator {
                "!" => TsType::Boolean,
                "typeof" => TsType::String,
                "void" => TsType::Undefined,
                _ => TsType::Number,
            }
        }
        "binary_expression" => binary_type(file, node, env),
        "ternary_expression" => {
            let branch = |field: &str| {
                node.child_by_field_name(field)
                    .map(|b| type_of(file, b, env).widen())
                    .unwrap_or(TsType::Unknown)
            };
            union(vec![branch("consequence"), branch("alternative")])
        }
        "object" => object_type(file, node, env),
        "array" => {
            let mut elements = Vec::new();
            for element in named_children(node) {
                match element.kind() {
                    "spread_element" => {
                        if let Some(TsType::Array { element, .. }) =
                            first_named_child(element).map(|inner| type_of(file, inner, env))
                        {
                            elements.push(*element);
                        }
                    }
                    "comment" => {}
                    _ => elements.push(type_of(file, element, env).widen()),
                }
            }
            TsType::array(union(elements))
        }
        "new_expression" => {
            let constructor = node
                .child_by_field_name("constructor")
                .map(|c| file.node_text(c))
                .unwrap_or("");
            match constructor {
                "Map" => TsType::generic("Map", vec![TsType::Any, TsType::Any]),
                "Set" => TsType::generic("Set", vec![TsType::Any]),
                "" => TsType::Unknown,
                name => TsType::Ref(name.to_string()),
            }
        }
        "call_expression" => call_type(file, node, env),
        "member_expression" => {
            let receiver = node
                .child_by_field_name("object")
                .map(|o| type_of(file, o, env))
                .unwrap_or(TsType::Unknown);
            let property = node
                .child_by_field_name("property")
                .map(|p| file.node_text(p))
                .unwrap_or("");
            member_type(&receiver, property)
        }
        _ => TsType::Unknown,
    }
}

fn member_type(receiver: &TsType, property: &str) -> TsType {
    match (receiver, property) {
        (TsType::String | TsType::Array { .. } | TsType::Tuple { .. }, "length") => TsType::Number,
        (TsType::Generic { name, .. }, "size") if name == "Map" || name == "Set" => TsType::Number,
        (TsType::Object(props), field) => props
            .iter()
            .find(|p| p.name == field)
            .map(|p| p.ty.clone())
            .unwrap_or(TsType::Unknown),
        (TsType::Union(members), field) => {
            let defined: Vec<TsType> = members
                .iter()
                .filter(|m| !m.is_nullish())
                .map(|m| member_type(m, field))
                .collect();
            union(defined)
        }
        (_, "length") => TsType::Number,
        _ => TsType::Unknown,
    }
}

fn binary_type(file: &SourceFile, node: Node<'_>, env: &Env) -> TsType {
    let operator = node
        .child_by_field_name("operator")
        .map(|op| file.node_text(op))
        .unwrap_or("");
    let side = |field: &str| {
        node.child_by_field_name(field)
            .map(|n| type_of(file, n, env))
            .unwrap_or(TsType::Unknown)
    };

    match operator {
        "===" | "!==" | "==" | "!=" | "<" | ">" | "<=" | ">=" | "instanceof" | "in" => {
            TsType::Boolean
        }
        "+" => {
            let (left, right) = (side("left").widen(), side("right").widen());
            if left == TsType::String || right == TsType::String {
                TsType::String
            } else if left == TsType::Number && right == TsType::Number {
                TsType::Number
            } else {
                TsType::Unknown
            }
        }
        "-" | "*" | "/" | "%" | "**" | "<<" | ">>" | ">>>" | "&" | "|" | "^" => TsType::Number,
        "&&" => side("right"),
        "||" | "??" => {
            let left = side("left");
            let defined = union(left.members().into_iter().filter(|m| !m.is_nullish()).collect());
            union(vec![defined, side("right")])
        }
        _ => TsType::Unknown,
    }
}

fn object_type(file: &SourceFile, node: Node<'_>, env: &Env) -> TsType {
    let mut props: Vec<Property> = Vec::new();
    let mut set = |prop: Property| match props.iter_mut().find(|p| p.name == prop.name) {
        Some(existing) => *existing = prop,
        None => props.push(prop),
    };

    for member in named_children(node) {
        match member.kind() {
            "pair" => {
                let (Some(key), Some(value)) = (
                    member.child_by_field_name("key"),
                    member.child_by_field_name("value"),
                ) else {
                    continue;
                };
                let name = file
                    .string_value(key)
                    .unwrap_or_else(|| file.node_text(key).to_string());
                set(Property::new(name, type_of(file, value, env).widen()));
            }
            "shorthand_property_identifier" => {
                let name = file.node_text(member);
                let ty = env.get(name).cloned().unwrap_or(TsType::Unknown);
                set(Property::new(name, ty.widen()));
            }
            "spread_element" => {
                if let Some(TsType::Object(spread)) =
                    first_named_child(member).map(|inner| type_of(file, inner, env))
                {
                    for prop in spread {
                        set(prop);
                    }
                }
            }
            _ => {}
        }
    }
    TsType::Object(props)
}

fn call_type(file: &SourceFile, node: Node<'_>, env: &Env) -> TsType {
    let Some(callee) = node.child_by_field_name("function") else {
        return TsType::Unknown;
    };
    let args: Vec<Node<'_>> = node
        .child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default();

    if callee.kind() == "identifier" {
        return match file.node_text(callee) {
            "Number" | "parseInt" | "parseFloat" => TsType::Number,
            "String" | "encodeURIComponent" | "decodeURIComponent" => TsType::String,
            "Boolean" | "isNaN" | "isFinite" => TsType::Boolean,
            "BigInt" => TsType::BigInt,
            _ => TsType::Unknown,
        };
    }
    if callee.kind() != "member_expression" {
        return TsType::Unknown;
    }

    let (Some(object), Some(property)) = (
        callee.child_by_field_name("object"),
        callee.child_by_field_name("property"),
    ) else {
        return TsType::Unknown;
    };
    let method = file.node_text(property);

    match (file.node_text(object), method) {
        ("Math", _) => return TsType::Number,
        ("JSON", "stringify") => return TsType::String,
        ("JSON", "parse") => return TsType::Any,
        ("Object", "keys") => return TsType::array(TsType::String),
        ("Number", "parseInt" | "parseFloat") => return TsType::Number,
        _ => {}
    }

    let receiver = type_of(file, object, env);
    let element = match &receiver {
        TsType::Array { element, .. } => Some(element.as_ref().clone()),
        _ => None,
    };

    if method == "split" {
        return TsType::array(TsType::String);
    }
    if method == "map" {
        let mapped = args
            .first()
            .map(|callback| infer_callback(file, *callback, element.as_ref().unwrap_or(&TsType::Unknown)))
            .unwrap_or(TsType::Unknown);
        return TsType::array(mapped);
    }
    if matches!(method, "find" | "at" | "pop" | "shift") {
        if let Some(element) = element {
            return union(vec![element, TsType::Undefined]);
        }
    }
    if SAME_ARRAY_METHODS.contains(&method) && element.is_some() {
        return receiver;
    }
    if method == "slice" || method == "concat" || method == "at" {
        return TsType::String;
    }
    if STRING_METHODS.contains(&method) {
        return TsType::String;
    }
    if BOOLEAN_METHODS.contains(&method) {
        return TsType::Boolean;
    }
    if NUMBER_METHODS.contains(&method) {
        return TsType::Number;
    }
    if method == "valueOf" {
        return match receiver {
            TsType::Ref(name) if name == "Date" => TsType::Number,
            other => other,
        };
    }
    if method == "get" {
        if let TsType::Generic { name, args } = &receiver {
            if name == "Map" && args.len() == 2 {
                return union(vec![args[1].clone(), TsType::Undefined]);
            }
        }
    }
    TsType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(callback: &str, param: TsType) -> String {
        let text = format!("const f = {};", callback);
        let file = SourceFile::parse("t.ts", text).unwrap();
        let value = file.find_variable("f").unwrap().value.unwrap();
        infer_callback(&file, value, &param).to_string()
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(infer("(s) => s.trim().toLowerCase()", TsType::String), "string");
        assert_eq!(infer("(s) => s.split(\",\")", TsType::String), "string[]");
        assert_eq!(infer("(s) => s.length", TsType::String), "number");
        assert_eq!(infer("(s) => parseInt(s, 10)", TsType::String), "number");
    }

    #[test]
    fn test_constructors_and_conditionals() {
        assert_eq!(infer("(s) => new Date(s)", TsType::String), "Date");
        assert_eq!(infer("(n) => n > 0 ? \"pos\" : null", TsType::Number), "string | null");
        assert_eq!(infer("(v) => !v", TsType::String), "boolean");
    }

    #[test]
    fn test_object_literal_and_spread() {
        let param = TsType::Object(vec![
            Property::new("first", TsType::String),
            Property::new("last", TsType::String),
        ]);
        assert_eq!(
            infer("(u) => ({ ...u, full: u.first + \" \" + u.last, size: 1 })", param),
            "{ first: string; last: string; full: string; size: number; }"
        );
    }

    #[test]
    fn test_block_body_and_annotation() {
        assert_eq!(
            infer("(s) => { const n = Number(s); if (n > 1) { return n; } return 0; }", TsType::String),
            "number"
        );
        assert_eq!(infer("(s): Date => new Date(s)", TsType::String), "Date");
        assert_eq!(infer("async (s): Promise<number> => 1", TsType::String), "number");
        assert_eq!(infer("(s) => someHelper(s)", TsType::String), "unknown");
    }
}
