//! Schema expression evaluation
//!
//! Walks a schema builder expression (`z.object({...}).extend(...)`) and
//! computes the input and output types the schema library's type-level
//! machinery would produce for it. Bindings are followed through local
//! declarations, imports and re-exports; a binding reached again while it is
//! still being evaluated yields `any`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;
use tree_sitter::Node;

use super::transform::infer_callback;
use super::types::{intersection, union, FunctionSide, Literal, Property, TsType};
use crate::analysis::detect::annotation_marker;
use crate::error::Result;
use crate::project::Project;
use crate::source::{
    first_named_child, named_children, unwrap_expression, Imported, ReExport, SourceFile,
    ZOD_MODULES,
};

/// String format builders that validate but infer `string`
const STRING_BUILDERS: &[&str] = &[
    "string", "email", "url", "httpUrl", "uuid", "uuidv4", "uuidv6", "uuidv7", "guid", "cuid",
    "cuid2", "ulid", "xid", "ksuid", "nanoid", "emoji", "base64", "base64url", "ipv4", "ipv6",
    "cidrv4", "cidrv6", "mac", "e164", "jwt", "hostname", "hex", "hash", "lowercase",
    "uppercase",
];

const NUMBER_BUILDERS: &[&str] = &["number", "int", "float32", "float64", "int32", "uint32", "nan"];

/// The evaluated type of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub input: TsType,
    pub output: TsType,
    /// Key is optional when this schema sits in an object on the input side
    pub optional_in: bool,
    /// Key is optional when this schema sits in an object on the output side
    pub optional_out: bool,
    /// Field schemas of an object schema, in declaration order
    pub fields: Option<Vec<(String, Shape)>>,
    /// Element schema of an array schema
    pub element: Option<Box<Shape>>,
    /// Values of a literal enum schema
    pub options: Option<Vec<Literal>>,
}

impl Shape {
    pub fn simple(ty: TsType) -> Self {
        Self::split(ty.clone(), ty)
    }

    pub fn split(input: TsType, output: TsType) -> Self {
        Self {
            input,
            output,
            optional_in: false,
            optional_out: false,
            fields: None,
            element: None,
            options: None,
        }
    }

    pub fn unknown() -> Self {
        Self::simple(TsType::Unknown)
    }

    /// Object schema from its fields
    pub fn object(fields: Vec<(String, Shape)>) -> Self {
        let side = |input: bool| {
            TsType::Object(
                fields
                    .iter()
                    .map(|(name, shape)| Property {
                        name: name.clone(),
                        ty: if input {
                            shape.input.clone()
                        } else {
                            shape.output.clone()
                        },
                        optional: if input {
                            shape.optional_in
                        } else {
                            shape.optional_out
                        },
                        readonly: false,
                    })
                    .collect(),
            )
        };
        Self {
            fields: Some(fields.clone()),
            ..Self::split(side(true), side(false))
        }
    }

    fn enumeration(values: Vec<Literal>) -> Self {
        let ty = union(values.iter().cloned().map(TsType::Literal).collect());
        Self {
            options: Some(values),
            ..Self::simple(ty)
        }
    }

    fn array(element: Shape) -> Self {
        Self {
            element: Some(Box::new(element.clone())),
            ..Self::split(TsType::array(element.input), TsType::array(element.output))
        }
    }

    fn map(self, f: impl Fn(&TsType) -> TsType) -> Self {
        Self {
            optional_in: self.optional_in,
            optional_out: self.optional_out,
            ..Self::split(f(&self.input), f(&self.output))
        }
    }

    fn optional(self) -> Self {
        Self {
            optional_in: true,
            optional_out: true,
            ..self.map(|t| union(vec![t.clone(), TsType::Undefined]))
        }
    }

    fn nullable(self) -> Self {
        self.map(|t| union(vec![t.clone(), TsType::Null]))
    }

    fn nullish(self) -> Self {
        self.nullable().optional()
    }

    /// `.default()`: optional to construct, always present after parsing.
    fn defaulted(self) -> Self {
        Self {
            optional_in: true,
            optional_out: false,
            ..Self::split(
                union(vec![self.input.clone(), TsType::Undefined]),
                self.output.without_undefined(),
            )
        }
    }

    fn prefaulted(self) -> Self {
        Self {
            optional_in: true,
            optional_out: self.optional_out,
            ..Self::split(union(vec![self.input.clone(), TsType::Undefined]), self.output)
        }
    }

    fn required(self) -> Self {
        self.map(TsType::without_undefined).with_optional(false, false)
    }

    fn with_optional(mut self, input: bool, output: bool) -> Self {
        self.optional_in = input;
        self.optional_out = output;
        self
    }

    fn pipe(self, next: Shape) -> Self {
        Self {
            optional_in: self.optional_in,
            optional_out: next.optional_out,
            ..Self::split(self.input, next.output)
        }
    }
}

/// Lexical context of the expression being evaluated
struct Scope<'f> {
    file: &'f SourceFile,
    namespaces: BTreeSet<String>,
}

impl<'f> Scope<'f> {
    fn new(file: &'f SourceFile) -> Self {
        Self {
            file,
            namespaces: file.zod_namespaces(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'f str {
        self.file.node_text(node)
    }

    fn is_namespace(&self, node: Node<'_>) -> bool {
        node.kind() == "identifier" && self.namespaces.contains(self.text(node))
    }
}

type BindingKey = (PathBuf, String);

/// Evaluates schema bindings against the current project state.
pub struct Evaluator<'p> {
    project: &'p Project,
    stack: RefCell<Vec<BindingKey>>,
    memo: RefCell<HashMap<BindingKey, Shape>>,
    cycles: Cell<usize>,
}

impl<'p> Evaluator<'p> {
    pub fn new(project: &'p Project) -> Self {
        Self {
            project,
            stack: RefCell::new(Vec::new()),
            memo: RefCell::new(HashMap::new()),
            cycles: Cell::new(0),
        }
    }

    /// Evaluate the schema bound to `name` in `path`.
    pub fn schema(&self, path: &Path, name: &str) -> Result<Shape> {
        let file = self.project.source(path)?;
        let scope = Scope::new(&file);
        self.binding(&scope, name)
    }

    fn binding(&self, scope: &Scope<'_>, name: &str) -> Result<Shape> {
        if let Some(decl) = scope.file.find_variable(name) {
            let key = (scope.file.path().to_path_buf(), name.to_string());
            if self.stack.borrow().contains(&key) {
                debug!(schema = name, "circular reference evaluates to any");
                self.cycles.set(self.cycles.get() + 1);
                return Ok(Shape::simple(TsType::Any));
            }
            if let Some(shape) = self.memo.borrow().get(&key) {
                return Ok(shape.clone());
            }

            if let Some(annotation) = decl.type_annotation {
                if let Some(shape) = explicit_shape(scope.text(annotation)) {
                    return Ok(shape);
                }
            }
            let Some(value) = decl.value else {
                return Ok(Shape::unknown());
            };

            let cycles_before = self.cycles.get();
            self.stack.borrow_mut().push(key.clone());
            let shape = self.expr(scope, value);
            self.stack.borrow_mut().pop();
            let shape = shape?;
            if self.cycles.get() == cycles_before {
                self.memo.borrow_mut().insert(key, shape.clone());
            }
            return Ok(shape);
        }

        if let Some(import) = scope.file.find_import(name) {
            if let Imported::Named(original) = &import.imported {
                if let Some(target) = self
                    .project
                    .resolve_module(scope.file.path(), &import.specifier)
                {
                    let mut visited = HashSet::new();
                    if let Some(shape) = self.exported(&target, original, &mut visited)? {
                        return Ok(shape);
                    }
                }
            }
            debug!(name, specifier = %import.specifier, "import not followed; treating as any");
            return Ok(Shape::simple(TsType::Any));
        }

        Ok(Shape::unknown())
    }

    /// Evaluate an exported name of a module, following re-exports.
    fn exported(
        &self,
        path: &Path,
        name: &str,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<Option<Shape>> {
        if !visited.insert(path.to_path_buf()) {
            return Ok(None);
        }
        let file = self.project.source(path)?;
        let scope = Scope::new(&file);

        if file
            .find_variable(name)
            .is_some_and(|decl| decl.exported)
        {
            return self.binding(&scope, name).map(Some);
        }
        if let Some(export) = file
            .local_exports()
            .into_iter()
            .find(|e| e.exported_name() == name)
        {
            return self.binding(&scope, &export.name).map(Some);
        }

        for reexport in file.reexports() {
            let (original, specifier) = match &reexport {
                ReExport::Named {
                    name: original,
                    alias,
                    specifier,
                } => {
                    if alias.as_deref().unwrap_or(original) != name {
                        continue;
                    }
                    (original.as_str(), specifier)
                }
                ReExport::Star { specifier } => (name, specifier),
            };
            let Some(target) = self.project.resolve_module(path, specifier) else {
                continue;
            };
            if let Some(shape) = self.exported(&target, original, visited)? {
                return Ok(Some(shape));
            }
        }
        Ok(None)
    }

    fn expr(&self, scope: &Scope<'_>, node: Node<'_>) -> Result<Shape> {
        let node = unwrap_expression(node);
        match node.kind() {
            "identifier" => self.binding(scope, scope.text(node)),
            "call_expression" => self.call(scope, node),
            "member_expression" => self.member(scope, node),
            _ => Ok(Shape::unknown()),
        }
    }

    fn member(&self, scope: &Scope<'_>, node: Node<'_>) -> Result<Shape> {
        let (Some(object), Some(property)) = (
            node.child_by_field_name("object"),
            node.child_by_field_name("property"),
        ) else {
            return Ok(Shape::unknown());
        };
        let property = scope.text(property);

        // `Schemas.User` through `import * as Schemas`
        if object.kind() == "identifier" {
            if let Some(import) = scope.file.find_import(scope.text(object)) {
                if import.imported == Imported::Namespace
                    && !ZOD_MODULES.contains(&import.specifier.as_str())
                {
                    if let Some(target) = self
                        .project
                        .resolve_module(scope.file.path(), &import.specifier)
                    {
                        let mut visited = HashSet::new();
                        if let Some(shape) = self.exported(&target, property, &mut visited)? {
                            return Ok(shape);
                        }
                    }
                    return Ok(Shape::simple(TsType::Any));
                }
            }
        }

        let base = self.expr(scope, object)?;
        Ok(match property {
            "shape" => base,
            "element" => base.element.map(|e| *e).unwrap_or_else(Shape::unknown),
            field => base
                .fields
                .as_ref()
                .and_then(|fields| fields.iter().find(|(name, _)| name == field))
                .map(|(_, shape)| shape.clone())
                .unwrap_or_else(Shape::unknown),
        })
    }

    fn call(&self, scope: &Scope<'_>, node: Node<'_>) -> Result<Shape> {
        let Some(callee) = node.child_by_field_name("function") else {
            return Ok(Shape::unknown());
        };
        let args = call_arguments(node);
        let type_args = node
            .child_by_field_name("type_arguments")
            .map(named_children)
            .unwrap_or_default();

        match callee.kind() {
            "member_expression" => {
                let (Some(object), Some(property)) = (
                    callee.child_by_field_name("object"),
                    callee.child_by_field_name("property"),
                ) else {
                    return Ok(Shape::unknown());
                };
                let method = scope.text(property);

                if scope.is_namespace(object) {
                    return self.builder(scope, method, &args, &type_args);
                }
                if object.kind() == "member_expression" {
                    let root = object.child_by_field_name("object");
                    let group = object
                        .child_by_field_name("property")
                        .map(|p| scope.text(p));
                    if root.is_some_and(|r| scope.is_namespace(r)) {
                        return Ok(match group {
                            Some("coerce") => {
                                let target = self.builder(scope, method, &args, &type_args)?;
                                Shape::split(TsType::Unknown, target.output)
                            }
                            Some("iso") => Shape::simple(TsType::String),
                            _ => Shape::unknown(),
                        });
                    }
                }

                let base = self.expr(scope, object)?;
                self.method(scope, base, method, &args, &type_args)
            }
            "identifier" => {
                let name = scope.text(callee);
                match scope.file.find_import(name) {
                    Some(import) if ZOD_MODULES.contains(&import.specifier.as_str()) => {
                        match import.imported {
                            Imported::Named(original) => {
                                self.builder(scope, &original, &args, &type_args)
                            }
                            _ => Ok(Shape::unknown()),
                        }
                    }
                    _ => Ok(Shape::unknown()),
                }
            }
            _ => Ok(Shape::unknown()),
        }
    }

    fn arg(&self, scope: &Scope<'_>, args: &[Node<'_>], index: usize) -> Result<Shape> {
        match args.get(index) {
            Some(node) => self.expr(scope, *node),
            None => Ok(Shape::unknown()),
        }
    }

    fn builder(
        &self,
        scope: &Scope<'_>,
        name: &str,
        args: &[Node<'_>],
        type_args: &[Node<'_>],
    ) -> Result<Shape> {
        if STRING_BUILDERS.contains(&name) {
            return Ok(Shape::simple(TsType::String));
        }
        if NUMBER_BUILDERS.contains(&name) {
            return Ok(Shape::simple(TsType::Number));
        }

        let shape = match name {
            "bigint" | "int64" | "uint64" => Shape::simple(TsType::BigInt),
            "boolean" => Shape::simple(TsType::Boolean),
            "date" => Shape::simple(TsType::Ref("Date".to_string())),
            "symbol" => Shape::simple(TsType::Symbol),
            "undefined" => Shape::simple(TsType::Undefined).with_optional(true, true),
            "null" => Shape::simple(TsType::Null),
            "void" => Shape::simple(TsType::Void),
            "any" => Shape::simple(TsType::Any),
            "unknown" => Shape::simple(TsType::Unknown),
            "never" => Shape::simple(TsType::Never),
            "file" => Shape::simple(TsType::Ref("File".to_string())),
            "literal" => match args.first().map(|n| unwrap_expression(*n)) {
                Some(node) if node.kind() == "array" => {
                    let values = named_children(node)
                        .into_iter()
                        .filter_map(|n| literal_value(scope, n))
                        .collect();
                    Shape::enumeration(values)
                }
                Some(node) => match literal_value(scope, node) {
                    Some(value) => Shape::enumeration(vec![value]),
                    None => literal_type(scope, node)
                        .map(Shape::simple)
                        .unwrap_or_else(Shape::unknown),
                },
                None => Shape::unknown(),
            },
            "enum" => match args.first().map(|n| unwrap_expression(*n)) {
                Some(node) if node.kind() == "array" => {
                    let values = named_children(node)
                        .into_iter()
                        .filter_map(|n| literal_value(scope, n))
                        .collect();
                    Shape::enumeration(values)
                }
                Some(node) if node.kind() == "object" => {
                    let values = named_children(node)
                        .into_iter()
                        .filter(|n| n.kind() == "pair")
                        .filter_map(|pair| pair.child_by_field_name("value"))
                        .filter_map(|value| literal_value(scope, value))
                        .collect();
                    Shape::enumeration(values)
                }
                Some(node) => Shape::simple(TsType::Ref(scope.text(node).to_string())),
                None => Shape::unknown(),
            },
            "nativeEnum" => match args.first() {
                Some(node) => Shape::simple(TsType::Ref(scope.text(*node).to_string())),
                None => Shape::unknown(),
            },
            "object" | "strictObject" | "looseObject" | "interface" => match args.first() {
                Some(node) => Shape::object(self.object_fields(scope, *node)?),
                None => Shape::object(Vec::new()),
            },
            "array" => Shape::array(self.arg(scope, args, 0)?),
            "tuple" => {
                let items = match args.first().map(|n| unwrap_expression(*n)) {
                    Some(node) if node.kind() == "array" => named_children(node)
                        .into_iter()
                        .map(|n| self.expr(scope, n))
                        .collect::<Result<Vec<_>>>()?,
                    _ => Vec::new(),
                };
                let rest = match args.get(1) {
                    Some(node) => Some(self.expr(scope, *node)?),
                    None => None,
                };
                let side = |input: bool| TsType::Tuple {
                    items: items
                        .iter()
                        .map(|s| if input { s.input.clone() } else { s.output.clone() })
                        .collect(),
                    rest: rest.as_ref().map(|s| {
                        Box::new(if input { s.input.clone() } else { s.output.clone() })
                    }),
                    readonly: false,
                };
                Shape::split(side(true), side(false))
            }
            "record" | "partialRecord" => {
                let key = self.arg(scope, args, 0)?;
                let value = self.arg(scope, args, 1)?;
                record(key, value, name == "partialRecord")
            }
            "map" => {
                let key = self.arg(scope, args, 0)?;
                let value = self.arg(scope, args, 1)?;
                Shape::split(
                    TsType::generic("Map", vec![key.input, value.input]),
                    TsType::generic("Map", vec![key.output, value.output]),
                )
            }
            "set" => self
                .arg(scope, args, 0)?
                .map(|t| TsType::generic("Set", vec![t.clone()])),
            "promise" => self
                .arg(scope, args, 0)?
                .map(|t| TsType::generic("Promise", vec![t.clone()])),
            "union" | "xor" => self.union_of(scope, args.first().copied())?,
            "discriminatedUnion" => {
                let members = args
                    .iter()
                    .copied()
                    .find(|n| matches!(unwrap_expression(*n).kind(), "array" | "identifier"));
                self.union_of(scope, members)?
            }
            "intersection" => {
                let left = self.arg(scope, args, 0)?;
                let right = self.arg(scope, args, 1)?;
                Shape::split(
                    intersection(vec![left.input, right.input]),
                    intersection(vec![left.output, right.output]),
                )
            }
            "optional" => self.arg(scope, args, 0)?.optional(),
            "nullable" => self.arg(scope, args, 0)?.nullable(),
            "nullish" => self.arg(scope, args, 0)?.nullish(),
            "readonly" => self.arg(scope, args, 0)?.map(TsType::readonly),
            "lazy" => match args.first().and_then(|n| callback_result(*n)) {
                Some(body) => self.expr(scope, body)?,
                None => Shape::unknown(),
            },
            "function" => Shape::split(
                TsType::Function(FunctionSide::Inner),
                TsType::Function(FunctionSide::Outer),
            ),
            "instanceof" => match args.first() {
                Some(node) => Shape::simple(TsType::Ref(scope.text(*node).to_string())),
                None => Shape::unknown(),
            },
            "custom" => match type_args.first() {
                Some(ty) => Shape::simple(TsType::Raw(scope.text(*ty).to_string())),
                None => Shape::unknown(),
            },
            "preprocess" => {
                let target = self.arg(scope, args, 1)?;
                Shape::split(TsType::Unknown, target.output)
            }
            "pipe" => {
                let first = self.arg(scope, args, 0)?;
                first.pipe(self.arg(scope, args, 1)?)
            }
            "transform" => {
                let output = match args.first() {
                    Some(callback) => infer_callback(scope.file, *callback, &TsType::Unknown),
                    None => TsType::Unknown,
                };
                Shape::split(TsType::Unknown, output)
            }
            "stringbool" => Shape::split(TsType::String, TsType::Boolean),
            "templateLiteral" => self.template_literal(scope, args.first().copied())?,
            "keyof" => keyof(self.arg(scope, args, 0)?),
            other => {
                debug!(builder = other, "unrecognized builder evaluates to unknown");
                Shape::unknown()
            }
        };
        Ok(shape)
    }

    fn method(
        &self,
        scope: &Scope<'_>,
        base: Shape,
        name: &str,
        args: &[Node<'_>],
        type_args: &[Node<'_>],
    ) -> Result<Shape> {
        let shape = match name {
            "optional" => base.optional(),
            "nullable" => base.nullable(),
            "nullish" => base.nullish(),
            "default" => base.defaulted(),
            "prefault" => base.prefaulted(),
            "nonoptional" => base.required(),
            "array" => Shape::array(base),
            "or" => {
                let other = self.arg(scope, args, 0)?;
                Shape::split(
                    union(vec![base.input, other.input]),
                    union(vec![base.output, other.output]),
                )
            }
            "and" => {
                let other = self.arg(scope, args, 0)?;
                Shape::split(
                    intersection(vec![base.input, other.input]),
                    intersection(vec![base.output, other.output]),
                )
            }
            "transform" => {
                let output = match args.first() {
                    Some(callback) => infer_callback(scope.file, *callback, &base.output),
                    None => TsType::Unknown,
                };
                Shape {
                    optional_in: base.optional_in,
                    ..Shape::split(base.input, output)
                }
            }
            "pipe" => base.pipe(self.arg(scope, args, 0)?),
            "readonly" => base.map(TsType::readonly),
            "brand" => {
                let brand = type_args
                    .first()
                    .and_then(|t| literal_type(scope, *t))
                    .and_then(|t| match t {
                        TsType::Literal(Literal::Str(s)) => Some(s),
                        _ => None,
                    });
                match brand {
                    Some(brand) => Shape {
                        optional_in: base.optional_in,
                        optional_out: base.optional_out,
                        ..Shape::split(
                            base.input,
                            intersection(vec![base.output, TsType::Brand(brand)]),
                        )
                    },
                    None => base,
                }
            }
            "partial" => self.reshape(scope, base, args, |shape, selected| {
                if selected {
                    shape.optional()
                } else {
                    shape
                }
            })?,
            "required" => self.reshape(scope, base, args, |shape, selected| {
                if selected {
                    shape.required()
                } else {
                    shape
                }
            })?,
            "pick" | "omit" => {
                let keys = mask_keys(scope, args.first().copied());
                match base.fields {
                    Some(fields) => Shape::object(
                        fields
                            .into_iter()
                            .filter(|(field, _)| keys.contains(field) == (name == "pick"))
                            .collect(),
                    ),
                    None => Shape::unknown(),
                }
            }
            "extend" | "safeExtend" | "merge" => {
                let additions = match args.first() {
                    Some(node) if unwrap_expression(*node).kind() == "object" => {
                        self.object_fields(scope, *node)?
                    }
                    Some(node) => self.expr(scope, *node)?.fields.unwrap_or_default(),
                    None => Vec::new(),
                };
                let mut fields = base.fields.unwrap_or_default();
                for (field, shape) in additions {
                    match fields.iter_mut().find(|(existing, _)| *existing == field) {
                        Some(slot) => slot.1 = shape,
                        None => fields.push((field, shape)),
                    }
                }
                Shape::object(fields)
            }
            "keyof" => keyof(base),
            "extract" | "exclude" => {
                let selected: Vec<Literal> = match args.first().map(|n| unwrap_expression(*n)) {
                    Some(node) if node.kind() == "array" => named_children(node)
                        .into_iter()
                        .filter_map(|n| literal_value(scope, n))
                        .collect(),
                    _ => Vec::new(),
                };
                match base.options {
                    Some(options) => Shape::enumeration(
                        options
                            .into_iter()
                            .filter(|o| selected.contains(o) == (name == "extract"))
                            .collect(),
                    ),
                    None => base,
                }
            }
            "unwrap" | "removeDefault" => match base.element.clone() {
                Some(element) => *element,
                None => base.required(),
            },
            // refinements, checks, metadata and object strictness keep the type
            _ => base,
        };
        Ok(shape)
    }

    /// Apply `.partial()` / `.required()` with an optional `{ key: true }` mask.
    fn reshape(
        &self,
        scope: &Scope<'_>,
        base: Shape,
        args: &[Node<'_>],
        apply: impl Fn(Shape, bool) -> Shape,
    ) -> Result<Shape> {
        let Some(fields) = base.fields else {
            return Ok(base);
        };
        let mask = args.first().map(|n| mask_keys(scope, Some(*n)));
        Ok(Shape::object(
            fields
                .into_iter()
                .map(|(field, shape)| {
                    let selected = mask.as_ref().map_or(true, |keys| keys.contains(&field));
                    (field, apply(shape, selected))
                })
                .collect(),
        ))
    }

    fn union_of<'f>(&self, scope: &Scope<'f>, members: Option<Node<'f>>) -> Result<Shape> {
        let Some(members) = members else {
            return Ok(Shape::unknown());
        };
        let mut options = Vec::new();
        if !union_options(scope, members, &mut options, &mut HashSet::new()) {
            return Ok(Shape::unknown());
        }
        let shapes = options
            .into_iter()
            .map(|n| self.expr(scope, n))
            .collect::<Result<Vec<_>>>()?;
        Ok(Shape {
            optional_in: shapes.iter().any(|s| s.optional_in),
            optional_out: shapes.iter().any(|s| s.optional_out),
            ..Shape::split(
                union(shapes.iter().map(|s| s.input.clone()).collect()),
                union(shapes.iter().map(|s| s.output.clone()).collect()),
            )
        })
    }

    /// Field schemas of an object literal passed to an object builder.
    fn object_fields(&self, scope: &Scope<'_>, node: Node<'_>) -> Result<Vec<(String, Shape)>> {
        let node = unwrap_expression(node);
        if node.kind() != "object" {
            return Ok(self.expr(scope, node)?.fields.unwrap_or_default());
        }

        let mut fields: Vec<(String, Shape)> = Vec::new();
        let mut push = |name: String, shape: Shape| {
            match fields.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = shape,
                None => fields.push((name, shape)),
            }
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
                    push(property_name(scope, key), self.expr(scope, value)?);
                }
                "shorthand_property_identifier" => {
                    let name = scope.text(member).to_string();
                    let shape = self.binding(scope, &name)?;
                    push(name, shape);
                }
                "method_definition" => {
                    let Some(key) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let shape = match member
                        .child_by_field_name("body")
                        .and_then(block_return_value)
                    {
                        Some(value) => self.expr(scope, value)?,
                        None => Shape::unknown(),
                    };
                    push(property_name(scope, key), shape);
                }
                "spread_element" => {
                    if let Some(inner) = first_named_child(member) {
                        for (name, shape) in self.expr(scope, inner)?.fields.unwrap_or_default() {
                            push(name, shape);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(fields)
    }

    fn template_literal(&self, scope: &Scope<'_>, parts: Option<Node<'_>>) -> Result<Shape> {
        let Some(parts) = parts.map(unwrap_expression) else {
            return Ok(Shape::simple(TsType::String));
        };
        let mut text = String::from("`");
        for part in named_children(parts) {
            if let Some(value) = scope.file.string_value(part) {
                text.push_str(&value);
                continue;
            }
            if matches!(part.kind(), "number" | "true" | "false") {
                text.push_str(scope.text(part));
                continue;
            }
            let shape = self.expr(scope, part)?;
            match shape.output {
                TsType::Literal(Literal::Str(s)) => text.push_str(&s),
                TsType::Literal(lit) => text.push_str(&lit.to_string()),
                other => text.push_str(&format!("${{{}}}", other)),
            }
        }
        text.push('`');
        Ok(Shape::simple(TsType::Raw(text)))
    }
}

/// Flatten a union's option list into `out`. Spread elements and bare
/// identifiers are followed when they name an array literal in the same file.
fn union_options<'f>(
    scope: &Scope<'f>,
    node: Node<'f>,
    out: &mut Vec<Node<'f>>,
    seen: &mut HashSet<String>,
) -> bool {
    let node = unwrap_expression(node);
    match node.kind() {
        "array" => {
            for item in named_children(node) {
                match item.kind() {
                    "comment" => {}
                    "spread_element" => match first_named_child(item) {
                        Some(inner) if union_options(scope, inner, out, seen) => {}
                        _ => out.push(item),
                    },
                    _ => out.push(item),
                }
            }
            true
        }
        "identifier" => {
            let name = scope.text(node);
            if !seen.insert(name.to_string()) {
                return false;
            }
            match scope.file.find_variable(name).and_then(|decl| decl.value) {
                Some(value) => union_options(scope, value, out, seen),
                None => false,
            }
        }
        _ => false,
    }
}

/// Shape for a declaration whose annotation pins the schema type.
fn explicit_shape(annotation: &str) -> Option<Shape> {
    let marker = annotation_marker(annotation)?;
    if !marker.is_explicit() {
        return None;
    }
    let output = marker.arguments.first()?.clone();
    let input = marker.arguments.get(1).cloned().unwrap_or_else(|| output.clone());
    Some(Shape::split(TsType::Raw(input), TsType::Raw(output)))
}

fn record(key: Shape, value: Shape, partial: bool) -> Shape {
    let side = |input: bool| {
        let key_ty = if input { &key.input } else { &key.output };
        let value_ty = if input { &value.input } else { &value.output };
        let literal_keys: Option<Vec<String>> = key_ty
            .members()
            .iter()
            .map(|m| match m {
                TsType::Literal(Literal::Str(s)) => Some(s.clone()),
                TsType::Literal(Literal::Num(n)) => Some(n.clone()),
                _ => None,
            })
            .collect();
        match literal_keys {
            Some(keys) if !keys.is_empty() => TsType::Object(
                keys.into_iter()
                    .map(|k| Property {
                        optional: partial,
                        ty: if partial {
                            union(vec![value_ty.clone(), TsType::Undefined])
                        } else {
                            value_ty.clone()
                        },
                        ..Property::new(k, TsType::Never)
                    })
                    .collect(),
            ),
            _ => TsType::Record {
                key: Box::new(key_ty.clone()),
                value: Box::new(value_ty.clone()),
            },
        }
    };
    Shape::split(side(true), side(false))
}

fn keyof(base: Shape) -> Shape {
    match base.fields {
        Some(fields) => Shape::enumeration(
            fields
                .into_iter()
                .map(|(name, _)| Literal::Str(name))
                .collect(),
        ),
        None => Shape::simple(TsType::Never),
    }
}

/// Keys of a `{ a: true, b: true }` mask argument.
fn mask_keys(scope: &Scope<'_>, mask: Option<Node<'_>>) -> Vec<String> {
    let Some(mask) = mask.map(unwrap_expression) else {
        return Vec::new();
    };
    named_children(mask)
        .into_iter()
        .filter_map(|member| match member.kind() {
            "pair" => member
                .child_by_field_name("key")
                .map(|key| property_name(scope, key)),
            "shorthand_property_identifier" => Some(scope.text(member).to_string()),
            _ => None,
        })
        .collect()
}

fn property_name(scope: &Scope<'_>, key: Node<'_>) -> String {
    if let Some(value) = scope.file.string_value(key) {
        return value;
    }
    if key.kind() == "computed_property_name" {
        if let Some(inner) = first_named_child(key) {
            if let Some(value) = scope.file.string_value(inner) {
                return value;
            }
        }
    }
    scope.text(key).to_string()
}

/// Literal value of a string, number, boolean or negated number node.
fn literal_value(scope: &Scope<'_>, node: Node<'_>) -> Option<Literal> {
    let node = unwrap_expression(node);
    if let Some(value) = scope.file.string_value(node) {
        return Some(Literal::Str(value));
    }
    let text = scope.text(node);
    match node.kind() {
        "number" => match text.strip_suffix('n') {
            Some(digits) if !text.starts_with("0x") => Some(Literal::BigInt(digits.to_string())),
            _ => Some(Literal::Num(text.to_string())),
        },
        "true" => Some(Literal::Bool(true)),
        "false" => Some(Literal::Bool(false)),
        "unary_expression" if text.starts_with('-') => {
            let inner = first_named_child(node)?;
            (inner.kind() == "number").then(|| Literal::Num(format!("-{}", scope.text(inner))))
        }
        _ => None,
    }
}

/// `null`/`undefined` literals and literal type arguments (`"UserId"`).
fn literal_type(scope: &Scope<'_>, node: Node<'_>) -> Option<TsType> {
    let node = if node.kind() == "literal_type" {
        first_named_child(node)?
    } else {
        node
    };
    if let Some(value) = literal_value(scope, node) {
        return Some(TsType::Literal(value));
    }
    match node.kind() {
        "null" => Some(TsType::Null),
        "undefined" => Some(TsType::Undefined),
        "identifier" if scope.text(node) == "undefined" => Some(TsType::Undefined),
        _ => None,
    }
}

/// Named argument nodes of a call, without comments.
pub fn call_arguments(call: Node<'_>) -> Vec<Node<'_>> {
    call.child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default()
        .into_iter()
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Expression returned by `() => expr` or `() => { return expr; }`.
pub fn callback_result(callback: Node<'_>) -> Option<Node<'_>> {
    let callback = unwrap_expression(callback);
    if !matches!(callback.kind(), "arrow_function" | "function_expression" | "function") {
        return None;
    }
    let body = callback.child_by_field_name("body")?;
    if body.kind() == "statement_block" {
        block_return_value(body)
    } else {
        Some(body)
    }
}

/// Argument of the first top-level `return` in a statement block.
pub fn block_return_value(block: Node<'_>) -> Option<Node<'_>> {
    named_children(block)
        .into_iter()
        .find(|statement| statement.kind() == "return_statement")
        .and_then(first_named_child)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(text: &str, name: &str) -> Shape {
        let mut project = Project::new();
        let path = Path::new("/virtual/schemas.ts");
        project.add_source(path, text);
        let evaluator = Evaluator::new(&project);
        evaluator.schema(path, name).unwrap()
    }

    const HEADER: &str = "import { z } from \"zod\";\n";

    #[test]
    fn test_object_with_optional_field() {
        let shape = evaluate(
            &format!("{HEADER}export const User = z.object({{ id: z.string(), age: z.number().optional() }});"),
            "User",
        );
        assert_eq!(shape.input.to_string(), "{ id: string; age?: number | undefined; }");
        assert_eq!(shape.input, shape.output);
    }

    #[test]
    fn test_default_and_transform_split_sides() {
        let shape = evaluate(
            &format!(
                "{HEADER}const S = z.object({{\n  role: z.string().default(\"user\"),\n  tags: z.string().transform((s) => s.split(\",\")),\n}});"
            ),
            "S",
        );
        assert_eq!(
            shape.input.to_string(),
            "{ role?: string | undefined; tags: string; }"
        );
        assert_eq!(shape.output.to_string(), "{ role: string; tags: string[]; }");
    }

    #[test]
    fn test_object_methods() {
        let shape = evaluate(
            &format!(
                "{HEADER}const Base = z.object({{ a: z.string(), b: z.number(), c: z.boolean() }});\nconst S = Base.pick({{ a: true, c: true }}).extend({{ d: z.null() }}).partial();"
            ),
            "S",
        );
        assert_eq!(
            shape.output.to_string(),
            "{ a?: string | undefined; c?: boolean | undefined; d?: null | undefined; }"
        );

        let keys = evaluate(
            &format!("{HEADER}const Base = z.object({{ a: z.string(), b: z.number() }});\nconst K = Base.keyof();"),
            "K",
        );
        assert_eq!(keys.output.to_string(), r#""a" | "b""#);
    }

    #[test]
    fn test_enums_records_and_unions() {
        let shape = evaluate(
            &format!(
                "{HEADER}const Role = z.enum([\"admin\", \"user\"]);\nconst S = z.object({{\n  role: Role,\n  scores: z.record(z.string(), z.number()),\n  flags: z.record(Role, z.boolean()),\n  value: z.union([z.string(), z.number()]).nullish(),\n}});"
            ),
            "S",
        );
        assert_eq!(
            shape.output.to_string(),
            r#"{ role: "admin" | "user"; scores: { [x: string]: number; }; flags: { admin: boolean; user: boolean; }; value?: string | number | null | undefined; }"#
        );
    }

    #[test]
    fn test_union_options_spread_and_bound() {
        let source = format!(
            "{HEADER}const B = z.object({{ k: z.literal(\"b\") }});\nconst C = z.object({{ k: z.literal(\"c\") }});\nconst rest = [C] as const;\nconst Spread = z.discriminatedUnion(\"k\", [...[B]]);\nconst Mixed = z.union([...[B], ...rest, z.null()]);\nconst Bound = z.discriminatedUnion(\"k\", rest);"
        );
        assert_eq!(evaluate(&source, "Spread").output.to_string(), r#"{ k: "b"; }"#);
        assert_eq!(
            evaluate(&source, "Mixed").output.to_string(),
            r#"{ k: "b"; } | { k: "c"; } | null"#
        );
        assert_eq!(evaluate(&source, "Bound").output.to_string(), r#"{ k: "c"; }"#);
    }

    #[test]
    fn test_self_reference_evaluates_to_any() {
        let shape = evaluate(
            &format!(
                "{HEADER}export const Node = z.object({{\n  name: z.string(),\n  get children() {{ return z.array(Node); }},\n}});"
            ),
            "Node",
        );
        assert_eq!(shape.output.to_string(), "{ name: string; children: any[]; }");
    }

    #[test]
    fn test_brand_stays_on_output() {
        let shape = evaluate(
            &format!("{HEADER}const Id = z.string().brand<\"UserId\">();"),
            "Id",
        );
        assert_eq!(shape.input, TsType::String);
        assert_eq!(
            shape.output,
            TsType::Intersection(vec![TsType::String, TsType::Brand("UserId".into())])
        );
    }

    #[test]
    fn test_explicit_annotation_is_trusted() {
        let shape = evaluate(
            &format!("{HEADER}type Tree = {{ children: Tree[] }};\nconst T: z.ZodType<Tree> = z.lazy(() => z.object({{ children: z.array(T) }}));"),
            "T",
        );
        assert_eq!(shape.output, TsType::Raw("Tree".to_string()));
    }

    #[test]
    fn test_imports_are_followed() {
        let mut project = Project::new();
        project.add_source(
            "/virtual/base.ts",
            format!("{HEADER}const Inner = z.object({{ x: z.number() }});\nexport {{ Inner as Point }};"),
        );
        project.add_source("/virtual/index.ts", "export * from \"./base\";");
        project.add_source(
            "/virtual/main.ts",
            format!("{HEADER}import {{ Point }} from \"./index\";\nconst Line = z.object({{ a: Point, b: Point.optional() }});"),
        );
        let evaluator = Evaluator::new(&project);
        let shape = evaluator.schema(Path::new("/virtual/main.ts"), "Line").unwrap();
        assert_eq!(
            shape.output.to_string(),
            "{ a: { x: number; }; b?: { x: number; } | undefined; }"
        );
    }
}
