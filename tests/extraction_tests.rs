//! Extraction Tests
//!
//! Runs the extractor and printer over the `.ts` fixtures and checks the
//! generated declarations.

use std::path::{Path, PathBuf};

use zod_extract::{
    generate, render_file, DeclarationOptions, ExtractConfig, ExtractOptions, ExtractResult,
    NameMapper, NamingConfig, Project, TypeExtractor,
};

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> PathBuf {
    fixtures_path().join(name)
}

fn mapper() -> NameMapper {
    NameMapper::new(NamingConfig {
        remove_suffix: Some("Schema".to_string()),
        ..NamingConfig::default()
    })
}

fn extractor(unify: bool) -> TypeExtractor {
    TypeExtractor::new(
        Project::new(),
        ExtractOptions {
            unify_if_same: unify,
            naming: mapper(),
            descriptions: true,
        },
    )
}

fn extract_all(name: &str, unify: bool) -> Vec<ExtractResult> {
    let extraction = extractor(unify).extract_all(&fixture(name)).unwrap();
    assert!(
        extraction.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        extraction.diagnostics
    );
    extraction.results
}

fn find<'a>(results: &'a [ExtractResult], name: &str) -> &'a ExtractResult {
    results
        .iter()
        .find(|r| r.schema_name == name)
        .unwrap_or_else(|| panic!("no result for {name}"))
}

fn copy_fixtures(names: &[&str]) -> (tempfile::TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let copies = names
        .iter()
        .map(|name| {
            let target = dir.path().join(Path::new(name).file_name().unwrap());
            std::fs::copy(fixture(name), &target).unwrap();
            target
        })
        .collect();
    (dir, copies)
}

// =============================================================================
// Single schemas
// =============================================================================

#[test]
fn test_object_with_optional_field() {
    let results = extract_all("user.ts", false);
    assert_eq!(results.len(), 1);
    let user = &results[0];
    assert_eq!(user.schema_name, "UserSchema");
    assert_eq!(user.input_type_text, "{ id: string; age?: number | undefined; }");
    assert_eq!(user.output_type_text, user.input_type_text);
    assert_eq!(user.description.as_deref(), Some("A registered user"));
}

#[test]
fn test_printed_file_with_description() {
    let results = extract_all("user.ts", false);
    let options = DeclarationOptions {
        format: false,
        ..DeclarationOptions::default()
    };
    let file = render_file(&results, &mapper(), &options);
    assert!(file.starts_with("// Generated by zod-extract. Do not edit.\n"));
    assert!(file.contains("/** A registered user */"));
    assert!(file.contains("export type UserInput = { id: string; age?: number | undefined; };"));
    assert!(file.contains("export type UserOutput = { id: string; age?: number | undefined; };"));
    assert!(!file.contains("$brand"));
}

#[test]
fn test_explicit_annotation_inlines_interface() {
    let results = extract_all("tree.ts", false);
    let tree = find(&results, "TreeSchema");
    assert_eq!(tree.input_type_text, "{ label: string; children: TreeInput[]; }");
    assert_eq!(tree.output_type_text, "{ label: string; children: TreeOutput[]; }");
}

// =============================================================================
// References between schemas
// =============================================================================

#[test]
fn test_transform_splits_dependents() {
    let results = extract_all("events.ts", true);
    let timestamp = find(&results, "TimestampSchema");
    assert_eq!(timestamp.input_type_text, "string");
    assert_eq!(timestamp.output_type_text, "Date");
    assert!(!timestamp.unified);

    let event = find(&results, "EventSchema");
    assert!(!event.unified);
    assert_eq!(event.input_type_text, "{ name: string; at: TimestampInput; }");
    assert_eq!(event.output_type_text, "{ name: string; at: TimestampOutput; }");
}

#[test]
fn test_self_reference_getter_has_no_any() {
    let results = extract_all("category.ts", true);
    let category = find(&results, "CategorySchema");
    assert!(category.unified);
    assert_eq!(category.output_type_text, "{ name: string; children: Category[]; }");
    assert!(!category.input_type_text.contains("any"));
}

#[test]
fn test_mutual_getters_have_no_any() {
    let split = extract_all("library.ts", false);
    let author = find(&split, "AuthorSchema");
    let book = find(&split, "BookSchema");
    assert_eq!(author.output_type_text, "{ name: string; books: BookOutput[]; }");
    assert_eq!(author.input_type_text, "{ name: string; books: BookInput[]; }");
    assert_eq!(
        book.output_type_text,
        "{ title: string; author?: AuthorOutput | undefined; }"
    );
    assert_eq!(
        book.input_type_text,
        "{ title: string; author?: AuthorInput | undefined; }"
    );

    let unified = extract_all("library.ts", true);
    assert_eq!(
        find(&unified, "BookSchema").output_type_text,
        "{ title: string; author?: Author | undefined; }"
    );
    for result in split.iter().chain(&unified) {
        assert!(!result.input_type_text.contains("any"), "{}", result.input_type_text);
        assert!(!result.output_type_text.contains("any"), "{}", result.output_type_text);
    }
}

#[test]
fn test_discriminated_union_keeps_member_order() {
    let results = extract_all("pets.ts", true);
    let pet = find(&results, "PetSchema");
    assert!(pet.unified);
    assert_eq!(pet.output_type_text, "Dog | Cat");

    let split = extract_all("pets.ts", false);
    let pet = find(&split, "PetSchema");
    assert_eq!(pet.input_type_text, "DogInput | CatInput");
    assert_eq!(pet.output_type_text, "DogOutput | CatOutput");
}

#[test]
fn test_only_exported_references_are_named() {
    let results = extract_all("visibility.ts", true);
    let shape = find(&results, "ShapeSchema");
    assert_eq!(
        shape.output_type_text,
        "{ origin: { x: number; y: number; }; size: Size; }"
    );

    let point = find(&results, "PointSchema");
    assert!(!point.is_exported);

    let options = DeclarationOptions {
        unify_if_same: true,
        format: false,
        ..DeclarationOptions::default()
    };
    let file = render_file(&results, &mapper(), &options);
    assert!(file.contains("\ntype Point = { x: number; y: number; };"));
    assert!(file.contains("export type Size = { width: number; };"));
}

#[test]
fn test_reexport_alias_yields_one_declaration() {
    let results = extract_all("aliases.ts", false);
    assert_eq!(results.len(), 1);
    let alias = &results[0];
    assert_eq!(alias.schema_name, "PublicUser");
    assert!(alias.is_exported);

    let file = render_file(&results, &mapper(), &DeclarationOptions::default());
    assert_eq!(file.matches("export type PublicUserInput").count(), 1);
    assert!(!file.contains("UserSchema"));
}

#[test]
fn test_imported_schema_is_referenced_by_name() {
    let results = extract_all("imports/customer.ts", false);
    let customer = find(&results, "CustomerSchema");
    assert_eq!(
        customer.output_type_text,
        "{ name: string; home: AddressOutput; previous: AddressOutput[]; }"
    );
    assert_eq!(
        customer.input_type_text,
        "{ name: string; home: AddressInput; previous: AddressInput[]; }"
    );
}

// =============================================================================
// Brands
// =============================================================================

#[test]
fn test_root_and_field_brands() {
    let results = extract_all("brands.ts", true);

    let id = find(&results, "UserIdSchema");
    assert!(!id.unified);
    assert_eq!(id.input_type_text, "string");
    assert_eq!(id.output_type_text, r#"string & $brand<"UserId">"#);

    let account = find(&results, "AccountSchema");
    assert_eq!(
        account.output_type_text,
        r#"{ email: string & $brand<"Email">; nickname?: string | undefined; }"#
    );
    assert!(!account.input_type_text.contains("$brand"));

    let post = find(&results, "PostSchema");
    assert_eq!(
        post.output_type_text,
        r#"{ tags: (string & $brand<"Tag">)[]; scores?: (number & $brand<"Score">)[] | undefined; }"#
    );
    assert_eq!(
        post.input_type_text,
        "{ tags: string[]; scores?: number[] | undefined; }"
    );

    let options = DeclarationOptions {
        unify_if_same: true,
        ..DeclarationOptions::default()
    };
    let file = render_file(&results, &mapper(), &options);
    assert!(file.contains("import type { $brand } from \"zod\";"));
    assert!(file.contains("export type UserIdOutput = string & $brand<\"UserId\">;"));

    let input_only = DeclarationOptions {
        input_only: true,
        ..DeclarationOptions::default()
    };
    assert!(!render_file(&results, &mapper(), &input_only).contains("$brand"));
}

// =============================================================================
// Batch generation
// =============================================================================

#[test]
fn test_extraction_leaves_sources_untouched() {
    let path = fixture("events.ts");
    let before = std::fs::read(&path).unwrap();

    let mut extractor = extractor(true);
    let first = extractor.extract_all(&path).unwrap();
    let second = extractor.extract_all(&path).unwrap();

    assert_eq!(first.results, second.results);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_generate_is_idempotent() {
    let (dir, files) = copy_fixtures(&["events.ts", "category.ts"]);
    let mut config = ExtractConfig::default();
    config.naming.remove_suffix = Some("Schema".to_string());
    config.declarations.unify_if_same = true;
    config.output.tests = Some("{dir}/{name}.types.test.{ext}".to_string());

    let first = generate(&config, &files).unwrap();
    first.write().unwrap();
    let second = generate(&config, &files).unwrap();
    assert!(second.check().unwrap().is_empty());

    let types = std::fs::read_to_string(dir.path().join("category.types.ts")).unwrap();
    assert!(types.contains("export type Category = {"));
    assert!(types.contains("  children: Category[];"));

    let tests = std::fs::read_to_string(dir.path().join("events.types.test.ts")).unwrap();
    assert!(tests.contains("import { TimestampSchema, EventSchema } from \"./events\";"));
    assert!(tests.contains("import type * as Generated from \"./events.types\";"));
    assert!(tests.contains(
        "expectTypeOf<Generated.EventOutput>().toEqualTypeOf<z.output<typeof EventSchema>>();"
    ));
}

#[test]
fn test_check_reports_stale_output() {
    let (dir, files) = copy_fixtures(&["user.ts"]);
    let config = ExtractConfig::default();
    let generation = generate(&config, &files).unwrap();
    generation.write().unwrap();

    let stale = dir.path().join("user.types.ts");
    let edited = std::fs::read_to_string(&stale).unwrap().replace("age", "years");
    std::fs::write(&stale, edited).unwrap();

    let drifts = generation.check().unwrap();
    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].path, stale);
    assert!(drifts[0].diff.contains("+  age?: number | undefined;"));
    assert!(drifts[0].diff.contains("-  years?: number | undefined;"));
}

#[test]
fn test_filter_selects_schemas() {
    let (_dir, files) = copy_fixtures(&["visibility.ts"]);
    let mut config = ExtractConfig::default();
    config.filter.schemas = vec!["ShapeSchema".to_string()];

    let generation = generate(&config, &files).unwrap();
    let names: Vec<&str> = generation.files[0]
        .results
        .iter()
        .map(|r| r.schema_name.as_str())
        .collect();
    assert_eq!(names, vec!["ShapeSchema"]);
    // referenced exported schemas keep their names even when filtered out
    assert!(generation.files[0]
        .results[0]
        .output_type_text
        .contains("size: SizeSchemaOutput;"));
}
