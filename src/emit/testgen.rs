//! Type-test generation
//!
//! Emits a vitest file asserting that every generated declaration equals
//! `z.input` / `z.output` of the schema it was extracted from.

use super::names::NameMapper;
use super::{DeclarationOptions, GENERATED_HEADER};
use crate::extract::ExtractResult;

const TYPES_NAMESPACE: &str = "Generated";

/// Module specifiers the test file imports from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestImports {
    /// The schema source module
    pub schemas: String,
    /// The generated declarations module
    pub types: String,
}

/// Vitest file for the exported results of one source file.
///
/// Returns `None` when no result is exported.
pub fn render_type_tests(
    suite: &str,
    results: &[ExtractResult],
    mapper: &NameMapper,
    options: &DeclarationOptions,
    imports: &TestImports,
) -> Option<String> {
    let exported: Vec<&ExtractResult> = results.iter().filter(|r| r.is_exported).collect();
    if exported.is_empty() {
        return None;
    }

    let mut schema_names = Vec::new();
    let mut cases = Vec::new();

    for result in &exported {
        let names = mapper.map(&result.schema_name);
        schema_names.push(result.schema_name.clone());

        let mut checks = Vec::new();
        if options.unify_if_same && result.unified {
            checks.push(check(&names.unified_name, "input", &result.schema_name));
            checks.push(check(&names.unified_name, "output", &result.schema_name));
        } else {
            if !options.output_only {
                checks.push(check(&names.input_name, "input", &result.schema_name));
            }
            if !options.input_only {
                checks.push(check(&names.output_name, "output", &result.schema_name));
            }
        }

        cases.push(format!(
            "  it(\"{}\", () => {{\n{}  }});\n",
            result.schema_name,
            checks.concat()
        ));
    }

    let mut output = String::new();
    output.push_str(GENERATED_HEADER);
    output.push('\n');
    output.push_str("import { describe, expectTypeOf, it } from \"vitest\";\n");
    output.push_str("import type { z } from \"zod\";\n");
    output.push_str(&format!(
        "import {{ {} }} from \"{}\";\n",
        schema_names.join(", "),
        imports.schemas
    ));
    // generated names may equal schema names, so types stay namespaced
    output.push_str(&format!(
        "import type * as {TYPES_NAMESPACE} from \"{}\";\n\n",
        imports.types
    ));
    output.push_str(&format!("describe(\"{suite}\", () => {{\n"));
    output.push_str(&cases.join("\n"));
    output.push_str("});\n");
    Some(output)
}

fn check(type_name: &str, side: &str, schema: &str) -> String {
    format!("    expectTypeOf<{TYPES_NAMESPACE}.{type_name}>().toEqualTypeOf<z.{side}<typeof {schema}>>();\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, exported: bool, unified: bool) -> ExtractResult {
        ExtractResult {
            schema_name: name.to_string(),
            input_type_text: "string".into(),
            output_type_text: "string".into(),
            is_exported: exported,
            description: None,
            field_descriptions: None,
            brands: None,
            unified,
        }
    }

    #[test]
    fn test_renders_exported_schemas_only() {
        let imports = TestImports {
            schemas: "../src/user".into(),
            types: "../src/user.types".into(),
        };
        let options = DeclarationOptions {
            unify_if_same: true,
            ..DeclarationOptions::default()
        };
        let file = render_type_tests(
            "user",
            &[result("User", true, true), result("Hidden", false, true), result("Event", true, false)],
            &NameMapper::default(),
            &options,
            &imports,
        )
        .unwrap();

        assert!(file.contains("import { User, Event } from \"../src/user\";"));
        assert!(file.contains("import type * as Generated from \"../src/user.types\";"));
        assert!(file.contains("expectTypeOf<Generated.User>().toEqualTypeOf<z.output<typeof User>>();"));
        assert!(file.contains("expectTypeOf<Generated.EventInput>().toEqualTypeOf<z.input<typeof Event>>();"));
        assert!(!file.contains("Hidden"));
    }

    #[test]
    fn test_nothing_exported() {
        let imports = TestImports {
            schemas: "./a".into(),
            types: "./a.types".into(),
        };
        assert!(render_type_tests(
            "a",
            &[result("A", false, true)],
            &NameMapper::default(),
            &DeclarationOptions::default(),
            &imports
        )
        .is_none());
    }
}
