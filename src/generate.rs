//! Batch generation
//!
//! Runs the extractor over a list of files with one configuration, renders the
//! declaration (and optional type-test) files, and writes or checks them.

use std::path::{Path, PathBuf};

use similar::{ChangeTag, TextDiff};
use tracing::{debug, info, warn};

use crate::config::ExtractConfig;
use crate::emit::names::NameMapper;
use crate::emit::render_file;
use crate::emit::testgen::{render_type_tests, TestImports};
use crate::error::{ExtractError, Result};
use crate::extract::{ExtractOptions, ExtractResult, SchemaDiagnostic, TypeExtractor};
use crate::files::{relative_import, OutputTemplate};
use crate::project::Project;

/// One file to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Everything generated from one source file
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub source: PathBuf,
    pub results: Vec<ExtractResult>,
    pub types: OutputFile,
    pub tests: Option<OutputFile>,
}

/// Result of a batch
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<SchemaDiagnostic>,
}

/// A generated file that differs from what is on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub path: PathBuf,
    /// Line diff, `-` for the file on disk and `+` for the generated text
    pub diff: String,
}

impl Generation {
    pub fn outputs(&self) -> impl Iterator<Item = &OutputFile> {
        self.files
            .iter()
            .flat_map(|f| std::iter::once(&f.types).chain(f.tests.as_ref()))
    }

    pub fn result_count(&self) -> usize {
        self.files.iter().map(|f| f.results.len()).sum()
    }

    /// Write every output, creating parent directories.
    pub fn write(&self) -> Result<()> {
        for output in self.outputs() {
            if let Some(parent) = output.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
            }
            std::fs::write(&output.path, &output.contents)
                .map_err(|e| ExtractError::io(&output.path, e))?;
            debug!(path = %output.path.display(), "wrote");
        }
        Ok(())
    }

    /// Outputs whose file on disk is missing or different.
    pub fn check(&self) -> Result<Vec<Drift>> {
        let mut drifts = Vec::new();
        for output in self.outputs() {
            let existing = match std::fs::read_to_string(&output.path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(ExtractError::io(&output.path, e)),
            };
            if existing != output.contents {
                drifts.push(Drift {
                    path: output.path.clone(),
                    diff: line_diff(&existing, &output.contents),
                });
            }
        }
        Ok(drifts)
    }
}

/// Line diff between two texts using the similar crate
pub fn line_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(sign);
        out.push_str(change.as_str().unwrap_or_default());
        if change.missing_newline() {
            out.push('\n');
        }
    }
    out
}

/// Extract and render every file.
///
/// Fails with `NoMatches` when no schema was extracted from any file.
pub fn generate(config: &ExtractConfig, files: &[PathBuf]) -> Result<Generation> {
    config.validate()?;
    if files.is_empty() {
        return Err(ExtractError::NoMatches("no input files".to_string()));
    }

    let project = match &config.project.tsconfig {
        Some(path) => Project::from_tsconfig(path)?,
        None => Project::new(),
    };
    let mapper = NameMapper::new(config.naming.clone());
    let options = ExtractOptions {
        unify_if_same: config.declarations.unify_if_same,
        naming: mapper.clone(),
        descriptions: config.project.descriptions,
    };
    let mut extractor = TypeExtractor::new(project, options);
    let types_template = OutputTemplate::new(config.output.path.clone())?;
    let tests_template = config
        .output
        .tests
        .clone()
        .map(OutputTemplate::new)
        .transpose()?;

    let mut generation = Generation::default();
    for source in files {
        let extraction = match config.schema_filter() {
            Some(names) => extractor.extract_multiple(source, names),
            None => extractor.extract_all(source),
        };
        let extraction = match extraction {
            Ok(extraction) => extraction,
            Err(err) => {
                warn!(file = %source.display(), error = %err, "file skipped");
                generation.diagnostics.push(SchemaDiagnostic {
                    file: source.clone(),
                    schema: String::new(),
                    message: err.to_string(),
                    hint: err.hint(),
                });
                continue;
            }
        };
        generation.diagnostics.extend(extraction.diagnostics);
        if extraction.results.is_empty() {
            debug!(file = %source.display(), "no schemas");
            continue;
        }

        let types_path = types_template.render(source);
        let types = OutputFile {
            contents: render_file(&extraction.results, &mapper, &config.declarations),
            path: types_path.clone(),
        };
        let tests = tests_template.as_ref().and_then(|template| {
            let path = template.render(source);
            let imports = TestImports {
                schemas: relative_import(&path, source),
                types: relative_import(&path, &types_path),
            };
            render_type_tests(
                &suite_name(source),
                &extraction.results,
                &mapper,
                &config.declarations,
                &imports,
            )
            .map(|contents| OutputFile { path, contents })
        });

        info!(
            file = %source.display(),
            schemas = extraction.results.len(),
            output = %types.path.display(),
            "generated"
        );
        generation.files.push(GeneratedFile {
            source: source.clone(),
            results: extraction.results,
            types,
            tests,
        });
    }

    if generation.files.is_empty() {
        let message = match config.schema_filter() {
            Some(names) => format!(
                "none of [{}] found in {} file(s)",
                names.join(", "),
                files.len()
            ),
            None => format!("no schema definitions in {} file(s)", files.len()),
        };
        return Err(ExtractError::NoMatches(message));
    }
    Ok(generation)
}

fn suite_name(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_diff_marks_changes() {
        let diff = line_diff("a\nb\n", "a\nc\n");
        assert_eq!(diff, " a\n-b\n+c\n");
    }

    #[test]
    fn test_generate_write_then_check_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("user.ts");
        std::fs::write(
            &source,
            "import { z } from \"zod\";\nexport const UserSchema = z.object({ id: z.string() });\n",
        )
        .unwrap();

        let config = ExtractConfig::default();
        let generation = generate(&config, std::slice::from_ref(&source)).unwrap();
        assert_eq!(generation.result_count(), 1);
        assert_eq!(generation.files[0].types.path, dir.path().join("user.types.ts"));
        assert!(!generation.check().unwrap().is_empty());

        generation.write().unwrap();
        assert!(generation.check().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&source).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_filter_matching_nothing_is_no_matches() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.ts");
        std::fs::write(&source, "import { z } from \"zod\";\nexport const A = z.string();\n").unwrap();

        let mut config = ExtractConfig::default();
        config.filter.schemas = vec!["Missing".into()];
        let err = generate(&config, &[source]).unwrap_err();
        assert!(matches!(err, ExtractError::NoMatches(_)));
    }
}
