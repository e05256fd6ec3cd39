//! Type Name Mapping
//!
//! Builds the generated type names for a schema name:
//! - Custom overrides (checked before any suffix logic)
//! - Suffix removal (`UserSchema` → `User`)
//! - Input/output suffixes (`UserInput`, `UserOutput`)
//!
//! Mapping is a pure function of the naming configuration. Collisions (two
//! schemas mapping to the same base) are reported, not silently resolved.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::scan;

// =============================================================================
// Naming Configuration
// =============================================================================

/// Naming configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Suffix stripped from schema names before appending type suffixes
    pub remove_suffix: Option<String>,

    /// Appended to the base name of input types
    pub input_suffix: String,

    /// Appended to the base name of output types
    pub output_suffix: String,

    /// Schema name → base name, applied before suffix logic
    pub overrides: BTreeMap<String, String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            remove_suffix: None,
            input_suffix: "Input".to_string(),
            output_suffix: "Output".to_string(),
            overrides: BTreeMap::new(),
        }
    }
}

impl NamingConfig {
    /// Reject configurations that cannot produce valid, distinct names.
    pub fn validate(&self, unify_if_same: bool) -> Result<()> {
        if self.input_suffix == self.output_suffix && !unify_if_same {
            return Err(ExtractError::InvalidOption(format!(
                "input and output suffixes are both `{}`; input and output types would collide",
                self.input_suffix
            )));
        }
        for (schema, base) in &self.overrides {
            if !scan::is_identifier(base) {
                return Err(ExtractError::InvalidOption(format!(
                    "override for `{schema}` is not a valid identifier: `{base}`"
                )));
            }
        }
        for suffix in [&self.input_suffix, &self.output_suffix] {
            if !suffix.is_empty() && !suffix.chars().all(scan::is_ident_char) {
                return Err(ExtractError::InvalidOption(format!(
                    "type suffix `{suffix}` contains characters not allowed in identifiers"
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Mapped Names
// =============================================================================

/// Generated type names for one schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedTypeName {
    pub original_name: String,
    pub input_name: String,
    pub output_name: String,
    /// Name used when input and output collapse into one declaration
    pub unified_name: String,
}

impl MappedTypeName {
    /// Name for one side, honouring unification.
    pub fn side(&self, output: bool, unified: bool) -> &str {
        match (unified, output) {
            (true, _) => &self.unified_name,
            (false, true) => &self.output_name,
            (false, false) => &self.input_name,
        }
    }
}

/// Maps schema names to generated type names.
#[derive(Debug, Clone, Default)]
pub struct NameMapper {
    config: NamingConfig,
}

impl NameMapper {
    pub fn new(config: NamingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Base name before suffixes
    pub fn base_name(&self, schema_name: &str) -> String {
        // layered config sources may lowercase table keys
        let overridden = self.config.overrides.get(schema_name).or_else(|| {
            self.config
                .overrides
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(schema_name))
                .map(|(_, base)| base)
        });
        if let Some(base) = overridden {
            return base.clone();
        }
        match &self.config.remove_suffix {
            Some(suffix) if !suffix.is_empty() => {
                match schema_name.strip_suffix(suffix.as_str()) {
                    Some(stripped) if !stripped.is_empty() => stripped.to_string(),
                    _ => schema_name.to_string(),
                }
            }
            _ => schema_name.to_string(),
        }
    }

    pub fn map(&self, schema_name: &str) -> MappedTypeName {
        let base = self.base_name(schema_name);
        MappedTypeName {
            original_name: schema_name.to_string(),
            input_name: format!("{}{}", base, self.config.input_suffix),
            output_name: format!("{}{}", base, self.config.output_suffix),
            unified_name: base,
        }
    }

    /// Base names claimed by more than one schema.
    pub fn collisions<'a>(&self, schema_names: impl IntoIterator<Item = &'a str>) -> Vec<(String, Vec<String>)> {
        let mut by_base: HashMap<String, Vec<String>> = HashMap::new();
        for name in schema_names {
            by_base
                .entry(self.base_name(name))
                .or_default()
                .push(name.to_string());
        }
        let mut collisions: Vec<(String, Vec<String>)> = by_base
            .into_iter()
            .filter(|(_, schemas)| schemas.len() > 1)
            .collect();
        collisions.sort();
        collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let mapped = NameMapper::default().map("UserSchema");
        assert_eq!(mapped.input_name, "UserSchemaInput");
        assert_eq!(mapped.output_name, "UserSchemaOutput");
        assert_eq!(mapped.unified_name, "UserSchema");
    }

    #[test]
    fn test_suffix_removal_and_overrides() {
        let mapper = NameMapper::new(NamingConfig {
            remove_suffix: Some("Schema".into()),
            overrides: BTreeMap::from([("LegacyThingSchema".to_string(), "Thing".to_string())]),
            ..NamingConfig::default()
        });
        assert_eq!(mapper.map("UserSchema").output_name, "UserOutput");
        assert_eq!(mapper.map("LegacyThingSchema").input_name, "ThingInput");
        // removing the whole name would leave nothing
        assert_eq!(mapper.map("Schema").unified_name, "Schema");
    }

    #[test]
    fn test_collisions_reported() {
        let mapper = NameMapper::new(NamingConfig {
            remove_suffix: Some("Schema".into()),
            ..NamingConfig::default()
        });
        let collisions = mapper.collisions(["UserSchema", "User", "Post"]);
        assert_eq!(
            collisions,
            vec![("User".to_string(), vec!["UserSchema".to_string(), "User".to_string()])]
        );
    }

    #[test]
    fn test_validate() {
        let same = NamingConfig {
            input_suffix: "".into(),
            output_suffix: "".into(),
            ..NamingConfig::default()
        };
        assert!(same.validate(false).is_err());
        assert!(same.validate(true).is_ok());

        let bad_override = NamingConfig {
            overrides: BTreeMap::from([("A".to_string(), "not valid".to_string())]),
            ..NamingConfig::default()
        };
        assert!(bad_override.validate(false).is_err());
    }
}
