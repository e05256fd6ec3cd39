//! Type Extraction
//!
//! Orchestrates one file at a time in two passes:
//!
//! 1. **Resolve**: for every schema (and every imported schema it links to),
//!    inject temporary aliases, let the [`TypeOracle`] expand them, and
//!    restore the file before the next schema.
//! 2. **Link**: turn the expanded texts back into named declarations by
//!    substituting references, unions, self-references, native enums and
//!    brands.
//!
//! A schema whose query fails is reported as a [`SchemaDiagnostic`]; its
//! siblings are unaffected.

pub mod postprocess;
pub mod substitute;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::{
    analyze_getters, analyze_references, analyze_union_references, detect, detect_brands,
    find_imported_schemas, has_self_references, resolve_any_types, BrandInfo,
    DescriptionProvider, DetectedSchema, EnumTable, GetterFields, ImportedSchemaInfo,
    SchemaNames, SchemaReferenceInfo, StaticDescriptions, UnionReferenceInfo,
};
use crate::checker::{injection_text, input_alias, output_alias, TypeOracle, ZodChecker};
use crate::checksum::Checksum;
use crate::emit::names::{MappedTypeName, NameMapper};
use crate::error::{ExtractError, Result};
use crate::project::{normalize_path, Project};
use crate::scan;
use crate::source::SourceFile;

use postprocess::{collapse_function_types, render_local_type};
use substitute::{inject_brands, substitute_reference, Wrapping};

// =============================================================================
// Options and results
// =============================================================================

/// Extraction options
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Collapse identical input and output types into one declaration
    pub unify_if_same: bool,
    pub naming: NameMapper,
    /// Read `.describe()` / `.meta()` descriptions
    pub descriptions: bool,
}

/// Resolved types of one schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResult {
    pub schema_name: String,
    pub input_type_text: String,
    pub output_type_text: String,
    pub is_exported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_descriptions: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brands: Option<Vec<BrandInfo>>,
    /// Emitted as a single declaration; other results refer to it by its unified name
    pub unified: bool,
}

impl ExtractResult {
    pub fn has_brands(&self) -> bool {
        self.brands.as_ref().is_some_and(|b| !b.is_empty())
    }
}

/// A schema that could not be extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDiagnostic {
    pub file: PathBuf,
    pub schema: String,
    pub message: String,
    pub hint: String,
}

/// Results of one file
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub results: Vec<ExtractResult>,
    pub diagnostics: Vec<SchemaDiagnostic>,
}

// =============================================================================
// Per-file analysis
// =============================================================================

/// Expanded texts straight from the checker
#[derive(Debug, Clone)]
struct RawTypes {
    input: String,
    output: String,
    /// Local type name inlined from an explicit annotation
    explicit_self: Option<String>,
}

/// Expanded texts of a schema defined in another file
#[derive(Debug, Clone)]
struct ImportedTypes {
    /// Name the schema is emitted under in its own file
    name: String,
    raw: RawTypes,
    branded: bool,
}

type ImportKey = (PathBuf, Checksum, String);

/// A field whose value is another schema
#[derive(Debug, Clone)]
struct FieldLink {
    field_path: String,
    target: String,
    wrapping: Wrapping,
}

struct FileAnalysis {
    schemas: Vec<DetectedSchema>,
    imports: BTreeMap<String, ImportedSchemaInfo>,
    getters: BTreeMap<String, GetterFields>,
    references: BTreeMap<String, Vec<SchemaReferenceInfo>>,
    unions: BTreeMap<String, UnionReferenceInfo>,
    brands: BTreeMap<String, Vec<BrandInfo>>,
    enums: EnumTable,
}

impl FileAnalysis {
    fn new(file: &SourceFile, project: &Project) -> Result<Self> {
        let schemas = detect(file);
        let imports = find_imported_schemas(file, project)?;
        let names = SchemaNames::from_detected(&schemas).with_imports(imports.values());
        Ok(Self {
            getters: analyze_getters(file, &schemas, &names),
            references: analyze_references(file, &schemas, &names),
            unions: analyze_union_references(file, &schemas, &names),
            brands: detect_brands(file, &schemas),
            enums: EnumTable::from_file(file),
            schemas,
            imports,
        })
    }

    fn schema(&self, name: &str) -> Option<&DetectedSchema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    fn resolved_import(&self, name: &str) -> Option<&ImportedSchemaInfo> {
        self.imports.get(name).filter(|info| info.resolved)
    }

    /// Field references get a generated name only when the target is
    /// exported; imported schemas always are.
    fn linkable(&self, target: &str) -> bool {
        self.schema(target).is_some_and(|s| s.is_exported) || self.resolved_import(target).is_some()
    }

    fn field_links(&self, name: &str) -> Vec<FieldLink> {
        let inline = self.references.get(name).into_iter().flatten().map(|r| FieldLink {
            field_path: r.field_path.clone(),
            target: r.referenced_schema.clone(),
            wrapping: Wrapping {
                is_array: r.is_array,
                is_record: r.is_record,
            },
        });
        let getters = self
            .getters
            .get(name)
            .into_iter()
            .flat_map(|fields| fields.values())
            .filter(|g| !g.is_self_reference)
            .map(|g| FieldLink {
                field_path: g.field_path.clone(),
                target: g.referenced_schema.clone(),
                wrapping: Wrapping {
                    is_array: g.is_array,
                    is_record: g.is_record,
                },
            });
        inline
            .chain(getters)
            .filter(|link| self.linkable(&link.target))
            .collect()
    }

    fn union_members(&self, name: &str) -> Option<&[String]> {
        self.unions
            .get(name)
            .map(|u| u.member_schemas.as_slice())
            .filter(|members| !members.is_empty())
    }

    /// Every schema whose generated name may appear in `name`'s text.
    fn targets(&self, name: &str) -> Vec<String> {
        let mut targets: Vec<String> = self
            .field_links(name)
            .into_iter()
            .map(|link| link.target)
            .collect();
        if let Some(members) = self.union_members(name) {
            targets.extend(members.iter().cloned());
        }
        targets
    }
}

/// Everything resolved in pass 1, keyed by the name used inside the file.
#[derive(Default)]
struct Resolved {
    raw: BTreeMap<String, RawTypes>,
    /// Emitted name of each key (differs for imports)
    emitted: BTreeMap<String, String>,
    branded: BTreeSet<String>,
    unified: BTreeMap<String, bool>,
}

impl Resolved {
    fn insert(&mut self, key: &str, emitted: &str, raw: RawTypes, branded: bool) {
        self.raw.insert(key.to_string(), raw);
        self.emitted.insert(key.to_string(), emitted.to_string());
        if branded {
            self.branded.insert(key.to_string());
        }
    }

    fn is_unified(&self, key: &str) -> bool {
        self.unified.get(key).copied().unwrap_or(false)
    }

    /// Greatest fixed point: unified when the raw sides match, nothing is
    /// branded, and every schema the text links to is unified too.
    fn solve_unification(&mut self, analysis: &FileAnalysis, enabled: bool) {
        self.unified = self
            .raw
            .iter()
            .map(|(key, raw)| {
                let same = enabled && raw.input == raw.output && !self.branded.contains(key);
                (key.clone(), same)
            })
            .collect();

        loop {
            let mut changed = false;
            for key in self.raw.keys() {
                if !self.is_unified(key) {
                    continue;
                }
                let blocked = analysis
                    .targets(key)
                    .iter()
                    .any(|target| self.unified.get(target) == Some(&false));
                if blocked {
                    self.unified.insert(key.clone(), false);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Generated name of a resolved key on one side.
    fn type_name(&self, mapper: &NameMapper, key: &str, output: bool) -> Option<String> {
        let emitted = self.emitted.get(key)?;
        let mapped: MappedTypeName = mapper.map(emitted);
        Some(mapped.side(output, self.is_unified(key)).to_string())
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Extracts input/output types of the schemas in a file.
pub struct TypeExtractor<O: TypeOracle = ZodChecker> {
    project: Project,
    options: ExtractOptions,
    oracle: O,
    descriptions: Box<dyn DescriptionProvider>,
    imported: HashMap<ImportKey, ImportedTypes>,
}

impl TypeExtractor<ZodChecker> {
    pub fn new(project: Project, options: ExtractOptions) -> Self {
        Self::with_oracle(project, options, ZodChecker)
    }
}

impl<O: TypeOracle> TypeExtractor<O> {
    pub fn with_oracle(project: Project, options: ExtractOptions, oracle: O) -> Self {
        Self {
            project,
            options,
            oracle,
            descriptions: Box::new(StaticDescriptions),
            imported: HashMap::new(),
        }
    }

    /// Replace the description provider.
    pub fn with_descriptions(mut self, provider: impl DescriptionProvider + 'static) -> Self {
        self.descriptions = Box::new(provider);
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract one schema by name.
    pub fn extract(&mut self, file: &Path, name: &str) -> Result<ExtractResult> {
        let path = normalize_path(file);
        let source = self.project.source(&path)?;
        let schemas = detect(&source);
        if !schemas.iter().any(|s| s.name == name) {
            return Err(ExtractError::SchemaNotFound {
                name: name.to_string(),
                file: path,
                suggestions: suggestions(name, &schemas),
            });
        }

        let mut extraction = self.run(&path, Some(&[name.to_string()]))?;
        if let Some(result) = extraction.results.pop() {
            return Ok(result);
        }
        let message = extraction
            .diagnostics
            .into_iter()
            .find(|d| d.schema == name)
            .map(|d| d.message)
            .unwrap_or_else(|| "no type was produced".to_string());
        Err(ExtractError::CheckerResolution {
            schema: name.to_string(),
            message,
        })
    }

    /// Extract every detected schema of a file, in source order.
    pub fn extract_all(&mut self, file: &Path) -> Result<Extraction> {
        let path = normalize_path(file);
        self.run(&path, None)
    }

    /// Extract the named schemas that exist in a file; absent names are skipped.
    pub fn extract_multiple(&mut self, file: &Path, names: &[String]) -> Result<Extraction> {
        let path = normalize_path(file);
        self.run(&path, Some(names))
    }

    fn run(&mut self, path: &Path, filter: Option<&[String]>) -> Result<Extraction> {
        let before = self.project.checksum(path)?;
        let file = self.project.source(path)?;
        let analysis = FileAnalysis::new(&file, &self.project)?;

        let selected: Vec<&DetectedSchema> = analysis
            .schemas
            .iter()
            .filter(|s| filter.map_or(true, |names| names.contains(&s.name)))
            .collect();
        info!(
            file = %path.display(),
            detected = analysis.schemas.len(),
            selected = selected.len(),
            imports = analysis.imports.len(),
            "extracting schemas"
        );
        for (base, clashing) in self
            .options
            .naming
            .collisions(selected.iter().map(|s| s.name.as_str()))
        {
            warn!(base = %base, schemas = ?clashing, "schemas map to the same type name");
        }

        // Pass 1: resolve raw texts for the selection and everything it links to
        let mut needed: BTreeSet<String> = selected.iter().map(|s| s.name.clone()).collect();
        let mut queue: Vec<String> = needed.iter().cloned().collect();
        while let Some(name) = queue.pop() {
            for target in analysis.targets(&name) {
                if needed.insert(target.clone()) {
                    queue.push(target);
                }
            }
        }

        let mut resolved = Resolved::default();
        let mut diagnostics = Vec::new();
        for schema in analysis.schemas.iter().filter(|s| needed.contains(&s.name)) {
            if resolved.raw.contains_key(&schema.name) {
                continue;
            }
            match raw_types(&mut self.project, &self.oracle, &file, schema) {
                Ok(raw) => {
                    debug!(schema = %schema.name, "resolved");
                    let branded = analysis.brands.contains_key(&schema.name);
                    resolved.insert(&schema.name, &schema.name, raw, branded);
                }
                Err(err) => {
                    warn!(schema = %schema.name, error = %err, "schema skipped");
                    diagnostics.push(SchemaDiagnostic {
                        file: path.to_path_buf(),
                        schema: schema.name.clone(),
                        message: err.detail(),
                        hint: err.hint(),
                    });
                }
            }
        }
        for alias in &needed {
            let Some(info) = analysis.resolved_import(alias) else {
                continue;
            };
            match self.imported_types(info) {
                Ok(Some(types)) => resolved.insert(alias, &types.name, types.raw, types.branded),
                Ok(None) => debug!(import = %alias, "imported schema not found at origin"),
                Err(err) => warn!(import = %alias, error = %err, "imported schema skipped"),
            }
        }

        resolved.solve_unification(&analysis, self.options.unify_if_same);

        // Pass 2: link the selected schemas
        let mut results = Vec::new();
        for schema in selected {
            if !resolved.raw.contains_key(&schema.name) {
                continue;
            }
            let result = self.link(&file, &analysis, &resolved, schema);
            results.push(result);
        }

        let after = self.project.checksum(path)?;
        if after != before {
            return Err(ExtractError::CheckerResolution {
                schema: path.display().to_string(),
                message: format!(
                    "source text changed during extraction ({} → {})",
                    before.short(),
                    after.short()
                ),
            });
        }

        Ok(Extraction {
            results,
            diagnostics,
        })
    }

    fn link(
        &self,
        file: &SourceFile,
        analysis: &FileAnalysis,
        resolved: &Resolved,
        schema: &DetectedSchema,
    ) -> ExtractResult {
        let name = schema.name.as_str();
        let mapper = &self.options.naming;
        let unified = resolved.is_unified(name);
        let own = mapper.map(name);
        let mut sides = match resolved.raw.get(name) {
            Some(raw) => [raw.input.clone(), raw.output.clone()],
            None => [String::new(), String::new()],
        };

        for (index, text) in sides.iter_mut().enumerate() {
            let output = index == 1;

            for link in analysis.field_links(name) {
                let (Some(target), Some(target_name)) = (
                    resolved.raw.get(&link.target),
                    resolved.type_name(mapper, &link.target, output),
                ) else {
                    continue;
                };
                let expanded = if output { &target.output } else { &target.input };
                if let Some(linked) =
                    substitute_reference(text, &link.field_path, expanded, link.wrapping, &target_name)
                {
                    *text = linked;
                }
            }

            if let Some(members) = analysis.union_members(name) {
                let names: Option<Vec<String>> = members
                    .iter()
                    .map(|m| resolved.type_name(mapper, m, output))
                    .collect();
                if let Some(names) = names {
                    *text = names.join(" | ");
                }
            }

            if let Some(fields) = analysis.getters.get(name).filter(|f| has_self_references(f)) {
                *text = resolve_any_types(text, fields, own.side(output, unified));
            }

            *text = analysis.enums.replace_in_fields(text);

            if let Some(local_type) = resolved.raw.get(name).and_then(|r| r.explicit_self.as_deref()) {
                *text = scan::replace_identifier(text, local_type, own.side(output, unified));
            }
        }

        let brands = analysis.brands.get(name).cloned();
        if let Some(brands) = &brands {
            sides[1] = inject_brands(&sides[1], brands);
        }

        let descriptions = if self.options.descriptions {
            self.descriptions.describe(file, schema)
        } else {
            Default::default()
        };

        let [input_type_text, output_type_text] = sides;
        ExtractResult {
            schema_name: name.to_string(),
            input_type_text,
            output_type_text,
            is_exported: schema.is_exported,
            description: descriptions.root,
            field_descriptions: (!descriptions.fields.is_empty()).then_some(descriptions.fields),
            brands,
            unified,
        }
    }

    /// Raw texts of an imported schema, cached by origin file content.
    fn imported_types(&mut self, info: &ImportedSchemaInfo) -> Result<Option<ImportedTypes>> {
        let Some(origin) = info.source_file_path.as_deref() else {
            return Ok(None);
        };
        let key = (
            origin.to_path_buf(),
            self.project.checksum(origin)?,
            info.declaration_name.clone(),
        );
        if let Some(hit) = self.imported.get(&key) {
            debug!(import = %info.local_name, checksum = %key.1.short(), "import cache hit");
            return Ok(Some(hit.clone()));
        }

        let file = self.project.source(origin)?;
        let schemas = detect(&file);
        let Some(schema) = schemas
            .iter()
            .find(|s| s.local_name == info.declaration_name && s.name == info.original_name)
        else {
            return Ok(None);
        };
        let raw = raw_types(&mut self.project, &self.oracle, &file, schema)?;
        let branded = detect_brands(&file, std::slice::from_ref(schema)).contains_key(&schema.name);
        let types = ImportedTypes {
            name: schema.name.clone(),
            raw,
            branded,
        };
        self.imported.insert(key, types.clone());
        Ok(Some(types))
    }
}

/// Query the oracle for one schema; the injection is undone before returning.
fn raw_types<O: TypeOracle>(
    project: &mut Project,
    oracle: &O,
    file: &SourceFile,
    schema: &DetectedSchema,
) -> Result<RawTypes> {
    if let Some(annotation) = &schema.explicit_type_annotation {
        return Ok(explicit_types(file, annotation));
    }

    let namespace = query_namespace(file);
    let injected = project.inject(file.path(), &injection_text(&namespace, &schema.local_name))?;
    let input = oracle.expand_alias(&injected, file.path(), &input_alias(&schema.local_name))?;
    let output = oracle.expand_alias(&injected, file.path(), &output_alias(&schema.local_name))?;
    drop(injected);

    Ok(RawTypes {
        input: collapse_function_types(&input),
        output: collapse_function_types(&output),
        explicit_self: None,
    })
}

/// Types of a schema annotated as `ZodType<T>`, used verbatim on both sides.
///
/// A local interface or alias is inlined so the declaration does not refer
/// to a name the generated file lacks.
fn explicit_types(file: &SourceFile, annotation: &str) -> RawTypes {
    let annotation = annotation.trim();
    if scan::is_identifier(annotation) {
        if let Some(rendered) = render_local_type(file, annotation) {
            return RawTypes {
                input: rendered.clone(),
                output: rendered,
                explicit_self: Some(annotation.to_string()),
            };
        }
    }
    RawTypes {
        input: annotation.to_string(),
        output: annotation.to_string(),
        explicit_self: None,
    }
}

/// Namespace identifier to write the injected queries with.
fn query_namespace(file: &SourceFile) -> String {
    let namespaces = file.zod_namespaces();
    namespaces
        .iter()
        .find(|ns| ns.as_str() != "z")
        .or_else(|| namespaces.iter().next())
        .cloned()
        .unwrap_or_else(|| "z".to_string())
}

/// Closest detected names to a missing one.
fn suggestions(name: &str, schemas: &[DetectedSchema]) -> Vec<String> {
    let matcher = SkimMatcherV2::default().ignore_case();
    let mut scored: Vec<(i64, &str)> = schemas
        .iter()
        .filter_map(|s| {
            matcher
                .fuzzy_match(&s.name, name)
                .map(|score| (score, s.name.as_str()))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(3)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "import { z } from \"zod\";\n";

    fn extractor(path: &str, source: &str, unify: bool) -> TypeExtractor {
        let mut project = Project::new();
        project.add_source(path, format!("{HEADER}{source}"));
        TypeExtractor::new(
            project,
            ExtractOptions {
                unify_if_same: unify,
                descriptions: true,
                ..ExtractOptions::default()
            },
        )
    }

    #[test]
    fn test_extract_simple_object() {
        let mut extractor = extractor(
            "/t/user.ts",
            "export const UserSchema = z.object({ id: z.string(), age: z.number().optional() });",
            false,
        );
        let result = extractor.extract(Path::new("/t/user.ts"), "UserSchema").unwrap();
        assert_eq!(result.input_type_text, "{ id: string; age?: number | undefined; }");
        assert_eq!(result.output_type_text, result.input_type_text);
        assert!(result.is_exported);
        assert!(!result.unified);
    }

    #[test]
    fn test_missing_schema_suggests_close_names() {
        let mut extractor = extractor("/t/a.ts", "export const UserSchema = z.string();", false);
        let err = extractor.extract(Path::new("/t/a.ts"), "UserSchma").unwrap_err();
        match err {
            ExtractError::SchemaNotFound { suggestions, .. } => {
                assert_eq!(suggestions, vec!["UserSchema".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_references_follow_unification() {
        let mut extractor = extractor(
            "/t/refs.ts",
            "export const Tag = z.object({ label: z.string() });\nexport const Post = z.object({ tags: z.array(Tag), main: Tag.optional() });",
            true,
        );
        let extraction = extractor.extract_all(Path::new("/t/refs.ts")).unwrap();
        let post = extraction
            .results
            .iter()
            .find(|r| r.schema_name == "Post")
            .unwrap();
        assert!(post.unified);
        assert_eq!(post.output_type_text, "{ tags: Tag[]; main?: Tag | undefined; }");
    }

    #[test]
    fn test_non_exported_reference_stays_inline() {
        let mut extractor = extractor(
            "/t/inline.ts",
            "const B = z.object({ x: z.number() });\nexport const A = z.object({ b: B });",
            false,
        );
        let a = extractor.extract(Path::new("/t/inline.ts"), "A").unwrap();
        assert_eq!(a.output_type_text, "{ b: { x: number; }; }");
    }

    #[test]
    fn test_transform_blocks_unification_of_dependents() {
        let mut extractor = extractor(
            "/t/split.ts",
            "export const Stamp = z.string().transform((s) => s.length);\nexport const Event = z.object({ at: Stamp });",
            true,
        );
        let extraction = extractor.extract_all(Path::new("/t/split.ts")).unwrap();
        let event = &extraction.results[1];
        assert!(!event.unified);
        assert_eq!(event.input_type_text, "{ at: StampInput; }");
        assert_eq!(event.output_type_text, "{ at: StampOutput; }");
    }

    #[test]
    fn test_explicit_annotation_inlines_local_interface() {
        let mut extractor = extractor(
            "/t/tree.ts",
            "interface Node { value: string; children: Node[] }\nexport const NodeSchema: z.ZodType<Node> = z.lazy(() => z.object({ value: z.string(), children: z.array(NodeSchema) }));",
            false,
        );
        let result = extractor.extract(Path::new("/t/tree.ts"), "NodeSchema").unwrap();
        assert_eq!(
            result.output_type_text,
            "{ value: string; children: NodeSchemaOutput[]; }"
        );
        assert_eq!(
            result.input_type_text,
            "{ value: string; children: NodeSchemaInput[]; }"
        );
    }

    struct FailingOracle;

    impl TypeOracle for FailingOracle {
        fn expand_alias(&self, _project: &Project, _file: &Path, alias: &str) -> Result<String> {
            Err(ExtractError::CheckerResolution {
                schema: alias.to_string(),
                message: "cannot expand".to_string(),
            })
        }
    }

    #[test]
    fn test_resolution_failure_is_reported_once() {
        let mut project = Project::new();
        project.add_source(
            "/t/fail.ts",
            format!("{HEADER}export const A = z.string();\nexport const B = z.number();"),
        );
        let mut extractor =
            TypeExtractor::with_oracle(project, ExtractOptions::default(), FailingOracle);

        let err = extractor.extract(Path::new("/t/fail.ts"), "A").unwrap_err();
        assert_eq!(err.to_string(), "Type resolution failed for A: cannot expand");

        let extraction = extractor.extract_all(Path::new("/t/fail.ts")).unwrap();
        assert!(extraction.results.is_empty());
        assert_eq!(extraction.diagnostics.len(), 2);
        assert_eq!(extraction.diagnostics[0].schema, "A");
        assert_eq!(extraction.diagnostics[0].message, "cannot expand");
    }

    #[test]
    fn test_escaped_quoted_key_is_linked() {
        let mut extractor = extractor(
            "/t/quoted.ts",
            "export const B = z.object({ x: z.number() });\nexport const A = z.object({ \"q\\\"k\": B, 'it\\'s': z.string() });",
            false,
        );
        let a = extractor.extract(Path::new("/t/quoted.ts"), "A").unwrap();
        assert_eq!(a.output_type_text, r#"{ "q\"k": BOutput; "it's": string; }"#);
    }

    #[test]
    fn test_unicode_schema_name_and_key() {
        let mut extractor = extractor(
            "/t/unicode.ts",
            "export const Ü = z.object({ ñ: z.literal(\"日本\"), a: z.string() });",
            false,
        );
        let result = extractor.extract(Path::new("/t/unicode.ts"), "Ü").unwrap();
        assert_eq!(result.output_type_text, r#"{ ñ: "日本"; a: string; }"#);
        assert_eq!(result.input_type_text, result.output_type_text);
    }

    #[test]
    fn test_source_unchanged_after_extraction() {
        let mut extractor = extractor(
            "/t/same.ts",
            "export const A = z.object({ a: z.string() });\nexport const B = z.number();",
            false,
        );
        let path = Path::new("/t/same.ts");
        let before = extractor.project().text(path).unwrap();
        let first = extractor.extract_all(path).unwrap();
        let second = extractor.extract_all(path).unwrap();
        assert_eq!(first.results, second.results);
        assert_eq!(extractor.project().text(path).unwrap(), before);
    }
}
