//! Configuration management for zod-extract
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (zod-extract.toml)
//! - Environment variables (ZOD_EXTRACT__*)
//!
//! Command-line flags are applied on top by the binary.
//!
//! ## Example config file (zod-extract.toml):
//! ```toml
//! [naming]
//! remove_suffix = "Schema"
//! input_suffix = "Input"
//! output_suffix = "Output"
//!
//! [naming.overrides]
//! LegacyUserSchema = "User"
//!
//! [declarations]
//! unify_if_same = true
//! format = true
//! brand_import = "zod"
//!
//! [output]
//! path = "{dir}/{name}.types.{ext}"
//! tests = "{dir}/{name}.types.test.{ext}"
//!
//! [project]
//! tsconfig = "tsconfig.json"
//!
//! [filter]
//! schemas = ["UserSchema", "PostSchema"]
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::emit::names::NamingConfig;
use crate::emit::DeclarationOptions;
use crate::error::{ExtractError, Result};
use crate::files::OutputTemplate;
use crate::scan;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Generated type names
    #[serde(default)]
    pub naming: NamingConfig,

    /// Which declarations are printed
    #[serde(default)]
    pub declarations: DeclarationOptions,

    /// Where generated files go
    #[serde(default)]
    pub output: OutputConfig,

    /// Type-checker project settings
    #[serde(default)]
    pub project: ProjectConfig,

    /// Schema selection
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path template for generated declarations
    #[serde(default = "default_output_path")]
    pub path: String,

    /// Path template for generated type tests; none are written when unset
    #[serde(default)]
    pub tests: Option<String>,
}

/// Project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// tsconfig.json used to resolve non-relative imports
    #[serde(default)]
    pub tsconfig: Option<PathBuf>,

    /// Read `.describe()` / `.meta()` descriptions into doc comments
    #[serde(default = "default_true")]
    pub descriptions: bool,
}

/// Schema filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Only these schemas are extracted; empty means all
    #[serde(default)]
    pub schemas: Vec<String>,
}

// Default value functions
fn default_output_path() -> String {
    OutputTemplate::DEFAULT_TYPES.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            tests: None,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            tsconfig: None,
            descriptions: true,
        }
    }
}

impl ExtractConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, with an explicit file taking precedence over the
    /// default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["zod-extract.toml", ".zod-extract.toml", "config/zod-extract.toml"];

        for location in config_locations {
            builder = builder.add_source(File::from(Path::new(location)).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "zod-extract", "zod-extract") {
            let xdg_config = config_dir.config_dir().join("zod-extract.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Load from environment variables (ZOD_EXTRACT__SECTION__KEY)
        builder = builder.add_source(
            Environment::with_prefix("ZOD_EXTRACT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("filter.schemas"),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Reject conflicting or malformed settings before any file is read.
    pub fn validate(&self) -> Result<()> {
        self.declarations.validate()?;
        self.naming.validate(self.declarations.unify_if_same)?;
        OutputTemplate::new(self.output.path.clone())?;
        if let Some(tests) = &self.output.tests {
            OutputTemplate::new(tests.clone())?;
            if *tests == self.output.path {
                return Err(ExtractError::InvalidOption(
                    "output.tests and output.path must differ".to_string(),
                ));
            }
        }
        if let Some(name) = self.filter.schemas.iter().find(|n| !scan::is_identifier(n)) {
            return Err(ExtractError::InvalidOption(format!(
                "schema filter entry `{name}` is not an identifier"
            )));
        }
        Ok(())
    }

    /// Configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ExtractError::io(path, e))
    }

    /// Schema filter, `None` when every schema is wanted
    pub fn schema_filter(&self) -> Option<&[String]> {
        (!self.filter.schemas.is_empty()).then_some(self.filter.schemas.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtractConfig::default();
        assert_eq!(config.naming.input_suffix, "Input");
        assert_eq!(config.output.path, "{dir}/{name}.types.{ext}");
        assert!(config.project.descriptions);
        assert!(config.schema_filter().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialize_config() {
        let config = ExtractConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[naming]"));
        assert!(toml_str.contains("[declarations]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[naming]\nremove_suffix = \"Schema\"\n\n[declarations]\nunify_if_same = true\n\n[filter]\nschemas = [\"UserSchema\"]\n",
        )
        .unwrap();

        let config = ExtractConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.naming.remove_suffix.as_deref(), Some("Schema"));
        assert!(config.declarations.unify_if_same);
        assert_eq!(config.schema_filter(), Some(&["UserSchema".to_string()][..]));
    }

    #[test]
    fn test_save_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = ExtractConfig::default();
        config.output.tests = Some(OutputTemplate::DEFAULT_TESTS.to_string());
        config.save(&path).unwrap();
        let loaded = ExtractConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.output.tests, config.output.tests);
    }

    #[test]
    fn test_validate_rejects_conflicts() {
        let mut config = ExtractConfig::default();
        config.declarations.input_only = true;
        config.declarations.output_only = true;
        assert!(config.validate().is_err());

        let mut config = ExtractConfig::default();
        config.filter.schemas = vec!["not a name".into()];
        assert!(config.validate().is_err());

        let mut config = ExtractConfig::default();
        config.filter.schemas = vec!["Ü".into(), "ÉvénementSchema".into()];
        assert!(config.validate().is_ok());

        let mut config = ExtractConfig::default();
        config.output.path = "types.ts".into();
        assert!(config.validate().is_err());
    }
}
