//! Schema detection
//!
//! A declaration is a schema when any of these hold:
//!
//! 1. its type annotation names a schema marker type (`z.ZodType<User>`);
//! 2. its initializer is a call chain rooted at the schema namespace whose
//!    first-level builder is in [`SCHEMA_BUILDERS`];
//! 3. its initializer text contains one of [`CHAIN_METHODS`].
//!
//! Local `export { X as Y }` clauses then add `Y` as a detected name for `X`'s
//! definition, and `export { X }` marks `X` as exported.

use serde::Serialize;

use super::SchemaSyntax;
use crate::scan;
use crate::source::SourceFile;

/// Type annotation markers that identify a schema declaration
pub const SCHEMA_MARKERS: &[&str] = &[
    "ZodType", "ZodSchema", "Schema", "ZodTypeAny", "ZodObject", "ZodString", "ZodNumber",
    "ZodBoolean", "ZodBigInt", "ZodDate", "ZodArray", "ZodTuple", "ZodRecord", "ZodMap",
    "ZodSet", "ZodUnion", "ZodDiscriminatedUnion", "ZodIntersection", "ZodEnum",
    "ZodNativeEnum", "ZodLiteral", "ZodOptional", "ZodNullable", "ZodDefault", "ZodCatch",
    "ZodLazy", "ZodEffects", "ZodPipe", "ZodPipeline", "ZodTransform", "ZodBranded",
    "ZodReadonly", "ZodPromise", "ZodAny", "ZodUnknown", "ZodCodec",
];

/// Markers whose first type argument is the schema's declared type
pub const EXPLICIT_MARKERS: &[&str] = &["ZodType", "ZodSchema", "Schema"];

/// First-level builders that make a namespace call chain a schema
pub const SCHEMA_BUILDERS: &[&str] = &[
    "object", "strictObject", "looseObject", "interface", "string", "number", "int",
    "float32", "float64", "int32", "uint32", "int64", "uint64", "bigint", "boolean", "date",
    "symbol", "undefined", "null", "void", "any", "unknown", "never", "nan", "literal",
    "enum", "nativeEnum", "array", "tuple", "record", "partialRecord", "map", "set", "union",
    "xor", "discriminatedUnion", "intersection", "optional", "nullable", "nullish", "lazy",
    "promise", "function", "instanceof", "custom", "preprocess", "pipe", "transform",
    "coerce", "stringbool", "templateLiteral", "readonly", "keyof", "file", "json", "iso",
    "email", "url", "httpUrl", "uuid", "uuidv4", "uuidv6", "uuidv7", "guid", "cuid", "cuid2",
    "ulid", "xid", "ksuid", "nanoid", "emoji", "base64", "base64url", "ipv4", "ipv6",
    "cidrv4", "cidrv6", "mac", "e164", "jwt", "hostname", "hex", "hash",
];

/// Chainable methods whose presence marks a derived schema
pub const CHAIN_METHODS: &[&str] = &[
    ".pick(", ".omit(", ".extend(", ".merge(", ".partial(", ".required(", ".transform(",
    ".refine(", ".superRefine(", ".pipe(", ".brand<", ".brand(", ".array(", ".optional(",
    ".nullable(", ".or(", ".and(", ".default(", ".describe(",
];

/// A declaration classified as a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedSchema {
    /// Name the schema is emitted under (the alias for a re-exported schema)
    pub name: String,
    /// Identifier of the declaration in the file
    pub local_name: String,
    pub is_exported: bool,
    /// 1-based line of the declaration
    pub source_line: usize,
    pub explicit_type_annotation: Option<String>,
}

/// A schema marker found in a type annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationMarker {
    pub name: String,
    /// Top-level type arguments, verbatim
    pub arguments: Vec<String>,
}

impl AnnotationMarker {
    /// Whether the first argument is the schema's declared type
    pub fn is_explicit(&self) -> bool {
        EXPLICIT_MARKERS.contains(&self.name.as_str())
    }

    /// The captured explicit type, if this marker carries one
    pub fn explicit_type(&self) -> Option<&str> {
        if self.is_explicit() {
            self.arguments.first().map(String::as_str)
        } else {
            None
        }
    }
}

/// Parse `z.ZodType<A, B>` style annotation text.
///
/// Arguments are split with the bracket scanner so nested generics and object
/// types survive intact.
pub fn annotation_marker(annotation: &str) -> Option<AnnotationMarker> {
    let annotation = annotation.trim();
    let (head, arguments) = match annotation.find('<') {
        Some(open) => {
            let close = scan::matching_close(annotation, open)?;
            let inner = &annotation[open + 1..close];
            let arguments = scan::split_top_level(inner, ',')
                .into_iter()
                .map(|span| inner[span].to_string())
                .collect();
            (&annotation[..open], arguments)
        }
        None => (annotation, Vec::new()),
    };

    let head = head.trim();
    let name = head.rsplit('.').next()?;
    let qualifier_ok = head
        .rsplit_once('.')
        .map_or(true, |(qualifier, _)| qualifier.split('.').all(scan::is_identifier));
    if !qualifier_ok || !SCHEMA_MARKERS.contains(&name) {
        return None;
    }
    Some(AnnotationMarker {
        name: name.to_string(),
        arguments,
    })
}

/// True when an initializer expression is classified as a schema.
pub fn is_schema_initializer(syntax: &SchemaSyntax<'_>, value: tree_sitter::Node<'_>) -> bool {
    if syntax
        .chain_root(value)
        .is_some_and(|builder| SCHEMA_BUILDERS.contains(&builder))
    {
        return true;
    }
    let text = syntax.text(value);
    CHAIN_METHODS.iter().any(|method| text.contains(method))
}

/// Detect schema declarations in a file.
pub fn detect(file: &SourceFile) -> Vec<DetectedSchema> {
    let syntax = SchemaSyntax::new(file);
    let mut schemas: Vec<DetectedSchema> = Vec::new();

    for decl in file.variable_declarations() {
        let marker = decl
            .type_annotation
            .and_then(|ty| annotation_marker(file.node_text(ty)));
        let by_value = decl
            .value
            .is_some_and(|value| is_schema_initializer(&syntax, value));
        if marker.is_none() && !by_value {
            continue;
        }
        schemas.push(DetectedSchema {
            name: decl.name.to_string(),
            local_name: decl.name.to_string(),
            is_exported: decl.exported,
            source_line: decl.line,
            explicit_type_annotation: marker
                .as_ref()
                .and_then(|m| m.explicit_type())
                .map(str::to_string),
        });
    }

    apply_local_exports(file, schemas)
}

fn apply_local_exports(file: &SourceFile, mut schemas: Vec<DetectedSchema>) -> Vec<DetectedSchema> {
    let exports = file.local_exports();

    // `export { X }` exports the declaration under its own name
    for export in &exports {
        if export.exported_name() == export.name {
            if let Some(schema) = schemas.iter_mut().find(|s| s.local_name == export.name) {
                schema.is_exported = true;
            }
        }
    }

    for export in &exports {
        let alias = export.exported_name();
        if alias == export.name || schemas.iter().any(|s| s.name == alias) {
            continue;
        }
        let Some(index) = schemas
            .iter()
            .position(|s| s.local_name == export.name && s.name == s.local_name)
        else {
            continue;
        };
        let original = &schemas[index];
        let aliased = DetectedSchema {
            name: alias.to_string(),
            is_exported: true,
            ..original.clone()
        };
        if original.is_exported {
            schemas.insert(index + 1, aliased);
        } else {
            // a private schema exported under another name is emitted once
            schemas[index] = aliased;
        }
    }
    schemas
}
