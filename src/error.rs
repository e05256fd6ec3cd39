//! Error types for schema extraction

use std::path::PathBuf;

use thiserror::Error;

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Schema not found: {name} in {}", file.display())]
    SchemaNotFound {
        name: String,
        file: PathBuf,
        /// Close matches among the schemas that do exist
        suggestions: Vec<String>,
    },

    #[error("No schemas found: {0}")]
    NoMatches(String),

    #[error("Type resolution failed for {schema}: {message}")]
    CheckerResolution { schema: String, message: String },

    #[error("Unresolved import `{name}` from `{specifier}` in {}", file.display())]
    UnresolvedImport {
        name: String,
        specifier: String,
        file: PathBuf,
    },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Failed to parse {}", path.display())]
    Parse { path: PathBuf },

    #[error("IO error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl ExtractError {
    /// Build an IO error that remembers the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Message without the variant prefix, for reports that already name the schema
    pub fn detail(&self) -> String {
        match self {
            Self::CheckerResolution { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Short corrective hint shown next to the raw message
    pub fn hint(&self) -> String {
        match self {
            Self::SchemaNotFound { suggestions, .. } if !suggestions.is_empty() => {
                format!("did you mean: {}?", suggestions.join(", "))
            }
            Self::SchemaNotFound { .. } => {
                "check the schema name; only top-level const/let declarations are detected".to_string()
            }
            Self::NoMatches(_) => {
                "check the file patterns and --schemas filter; run with -v to see what was scanned"
                    .to_string()
            }
            Self::CheckerResolution { .. } => {
                "this is an internal error; please report it with the schema source attached"
                    .to_string()
            }
            Self::UnresolvedImport { .. } => {
                "only relative imports are followed; the reference is left inlined".to_string()
            }
            Self::InvalidOption(_) => "run with --help to see the accepted options".to_string(),
            Self::Parse { .. } => "make sure the file is valid TypeScript".to_string(),
            Self::Io { .. } => "check that the path exists and is readable".to_string(),
            Self::Config(_) => {
                "check zod-extract.toml and ZOD_EXTRACT__* environment variables".to_string()
            }
            Self::Json(_) => "check the tsconfig file for syntax errors".to_string(),
            Self::Toml(_) => "the configuration could not be serialized".to_string(),
            Self::Pattern(_) => "quote glob patterns so the shell does not expand them".to_string(),
        }
    }
}
