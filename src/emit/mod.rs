//! Declaration Printing
//!
//! Turns [`ExtractResult`]s into TypeScript declaration text. Printing is a
//! pure function of the results, the name mapper and [`DeclarationOptions`];
//! every decision about names was already made during extraction.

pub mod names;
pub mod pretty;
pub mod testgen;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::extract::ExtractResult;

use names::NameMapper;
use pretty::{doc_comment, format_type};

/// First line of every generated file
pub const GENERATED_HEADER: &str = "// Generated by zod-extract. Do not edit.";

// =============================================================================
// Options
// =============================================================================

/// Which declarations to print and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclarationOptions {
    /// Print only input declarations
    pub input_only: bool,

    /// Print only output declarations
    pub output_only: bool,

    /// Print one declaration when input and output are identical
    pub unify_if_same: bool,

    /// Expand object types over multiple lines
    pub format: bool,

    /// Module the `$brand` helper type is imported from
    pub brand_import: String,
}

impl Default for DeclarationOptions {
    fn default() -> Self {
        Self {
            input_only: false,
            output_only: false,
            unify_if_same: false,
            format: true,
            brand_import: "zod".to_string(),
        }
    }
}

impl DeclarationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.input_only && self.output_only {
            return Err(ExtractError::InvalidOption(
                "input_only and output_only cannot both be set".to_string(),
            ));
        }
        if self.brand_import.trim().is_empty() {
            return Err(ExtractError::InvalidOption(
                "brand_import must name a module".to_string(),
            ));
        }
        Ok(())
    }

    fn prints_output(&self) -> bool {
        !self.input_only
    }

    fn prints_input(&self) -> bool {
        !self.output_only
    }
}

// =============================================================================
// Printing
// =============================================================================

/// Declaration block for one result.
pub fn print_declaration(result: &ExtractResult, mapper: &NameMapper, options: &DeclarationOptions) -> String {
    let names = mapper.map(&result.schema_name);
    let export = if result.is_exported { "export " } else { "" };
    let mut output = String::new();

    if let Some(description) = &result.description {
        output.push_str(&doc_comment(description, ""));
    }

    if options.unify_if_same && result.unified {
        output.push_str(&format!(
            "{export}type {} = {};",
            names.unified_name,
            body(&result.output_type_text, result, options)
        ));
        return output;
    }

    let mut declarations = Vec::new();
    if options.prints_input() {
        declarations.push(format!(
            "{export}type {} = {};",
            names.input_name,
            body(&result.input_type_text, result, options)
        ));
    }
    if options.prints_output() {
        declarations.push(format!(
            "{export}type {} = {};",
            names.output_name,
            body(&result.output_type_text, result, options)
        ));
    }
    output.push_str(&declarations.join("\n"));
    output
}

fn body(text: &str, result: &ExtractResult, options: &DeclarationOptions) -> String {
    if !options.format {
        return text.to_string();
    }
    match &result.field_descriptions {
        Some(descriptions) => format_type(text, descriptions),
        None => format_type(text, &Default::default()),
    }
}

/// Whole generated file for the results of one source file.
pub fn render_file(results: &[ExtractResult], mapper: &NameMapper, options: &DeclarationOptions) -> String {
    let mut output = String::new();
    output.push_str(GENERATED_HEADER);
    output.push('\n');

    let branded = options.prints_output() && results.iter().any(ExtractResult::has_brands);
    if branded {
        output.push_str(&format!(
            "import type {{ $brand }} from \"{}\";\n",
            options.brand_import
        ));
    }

    for result in results {
        output.push('\n');
        output.push_str(&print_declaration(result, mapper, options));
        output.push('\n');
    }
    output
}
