//! Checker Oracle
//!
//! The extractor never computes types itself. It appends temporary aliases to a
//! file (see [`injection_text`]), asks a [`TypeOracle`] to expand each alias to
//! text, and restores the file. [`ZodChecker`] is the built-in oracle: it
//! understands the injected alias shapes and evaluates the schema builder
//! expression they point at.

pub mod eval;
pub mod normalize;
pub mod transform;
pub mod types;

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::project::Project;
use crate::scan;

pub use eval::{Evaluator, Shape};
pub use types::{Literal, Property, TsType};

/// Name of the injected deep-normalize utility
pub const NORMALIZE_ALIAS: &str = "__ZE_DeepNormalize";

const NORMALIZE_UTILITY: &str = "type __ZE_DeepNormalize<T> = T extends Date | RegExp | Promise<any> | Map<any, any> | Set<any> | ((...args: any[]) => any) ? T : T extends readonly any[] ? { [K in keyof T]: __ZE_DeepNormalize<T[K]> } : T extends object ? { [K in keyof T as K extends symbol ? never : K]: __ZE_DeepNormalize<T[K]> } : T;";

static ALIAS_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    let ident = scan::IDENTIFIER_PATTERN;
    Regex::new(&format!(
        r"^(?:(?P<wrap>{ident})<\s*)?(?:{ident}\.)?(?P<side>input|output|infer)<\s*typeof\s+(?P<target>{ident})\s*>\s*(?:>)?$"
    ))
    .expect("valid alias query regex")
});

/// Alias holding the expanded input type of a schema
pub fn input_alias(schema: &str) -> String {
    format!("__ZE_Input_{schema}")
}

/// Alias holding the expanded output type of a schema
pub fn output_alias(schema: &str) -> String {
    format!("__ZE_Output_{schema}")
}

/// Temporary declarations appended to a file to query one schema.
pub fn injection_text(namespace: &str, local_name: &str) -> String {
    format!(
        "{NORMALIZE_UTILITY}\ntype {} = {NORMALIZE_ALIAS}<{namespace}.input<typeof {local_name}>>;\ntype {} = {NORMALIZE_ALIAS}<{namespace}.output<typeof {local_name}>>;",
        input_alias(local_name),
        output_alias(local_name),
    )
}

/// A type checker that can expand a type alias declared in a project file.
pub trait TypeOracle {
    /// Fully expanded text of `alias`, with no truncation and no alias names.
    fn expand_alias(&self, project: &Project, file: &Path, alias: &str) -> Result<String>;
}

/// Built-in oracle that evaluates schema builder expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZodChecker;

impl TypeOracle for ZodChecker {
    fn expand_alias(&self, project: &Project, file: &Path, alias: &str) -> Result<String> {
        let source = project.source(file)?;
        let declaration = source
            .find_type_declaration(alias)
            .filter(|node| node.kind() == "type_alias_declaration")
            .and_then(|node| node.child_by_field_name("value"))
            .ok_or_else(|| ExtractError::CheckerResolution {
                schema: alias.to_string(),
                message: "alias not found after injection".to_string(),
            })?;
        let query = source.node_text(declaration).trim().to_string();

        let captures = ALIAS_QUERY
            .captures(&query)
            .ok_or_else(|| ExtractError::CheckerResolution {
                schema: alias.to_string(),
                message: format!("unsupported alias shape `{query}`"),
            })?;
        let target = &captures["target"];
        let output_side = &captures["side"] != "input";
        let normalize = captures
            .name("wrap")
            .is_some_and(|wrap| wrap.as_str() == NORMALIZE_ALIAS);

        let shape = Evaluator::new(project).schema(file, target)?;
        let ty = if output_side { shape.output } else { shape.input };
        let ty = if normalize {
            normalize::deep_normalize(&ty)
        } else {
            ty
        };
        let text = ty.to_string();
        debug!(alias, %text, "expanded alias");
        Ok(text)
    }
}
