//! zod-extract
//!
//! Generates standalone TypeScript declarations for the input and output types
//! of Zod schemas, so consumers can use the types without the schema library.
//!
//! ## Features
//!
//! - **Detection**: finds schema declarations, re-export aliases and imports
//! - **Resolution**: expands `z.input` / `z.output` through a [`TypeOracle`]
//! - **Linking**: substitutes named references, unions, recursive getters,
//!   native enums and brands back into the expanded text
//! - **Printing**: formatted declarations with description comments
//!
//! ## Architecture
//!
//! ```text
//! source ──► analysis ──┐
//!                       ├──► extract ──► emit ──► <name>.types.ts
//! project ──► checker ──┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use zod_extract::{ExtractOptions, Project, TypeExtractor};
//!
//! let mut extractor = TypeExtractor::new(Project::new(), ExtractOptions::default());
//! let result = extractor.extract("src/user.ts".as_ref(), "UserSchema")?;
//! println!("{}", result.output_type_text);
//! # Ok::<(), zod_extract::ExtractError>(())
//! ```

pub mod analysis;
pub mod checker;
pub mod checksum;
pub mod config;
pub mod emit;
pub mod error;
pub mod extract;
pub mod files;
pub mod generate;
pub mod project;
pub mod scan;
pub mod source;

pub use analysis::{BrandInfo, DetectedSchema, ImportedSchemaInfo};
pub use checker::{TypeOracle, ZodChecker};
pub use checksum::Checksum;
pub use config::ExtractConfig;
pub use emit::names::{MappedTypeName, NameMapper, NamingConfig};
pub use emit::{print_declaration, render_file, DeclarationOptions};
pub use error::{ExtractError, Result};
pub use extract::{ExtractOptions, ExtractResult, Extraction, SchemaDiagnostic, TypeExtractor};
pub use files::{resolve_files, OutputTemplate};
pub use generate::{generate, Drift, Generation};
pub use project::Project;
pub use source::SourceFile;
