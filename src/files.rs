//! Input file resolution and output path templates

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ExtractError, Result};
use crate::project::normalize_path;

/// Directories never descended into
const SKIP_DIRS: &[&str] = &["node_modules", ".git", "dist", "build"];

/// Extensions of schema source files
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

fn is_source(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        return false;
    }
    path.extension()
        .map(|ext| SOURCE_EXTENSIONS.iter().any(|e| ext == *e))
        .unwrap_or(false)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Resolve files, directories and glob patterns into a sorted, de-duplicated
/// list of absolute source paths.
pub fn resolve_files(patterns: &[String], cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let absolute = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            cwd.join(pattern)
        };

        if is_glob(pattern) {
            let paths = glob::glob(&absolute.to_string_lossy())?;
            for path in paths.filter_map(|p| p.ok()) {
                if path.is_file() && is_source(&path) {
                    files.insert(normalize_path(&path));
                }
            }
        } else if absolute.is_dir() {
            for entry in WalkDir::new(&absolute)
                .into_iter()
                .filter_entry(|e| {
                    !(e.file_type().is_dir()
                        && SKIP_DIRS.iter().any(|d| e.file_name() == *d))
                })
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && is_source(path) {
                    files.insert(normalize_path(path));
                }
            }
        } else if absolute.is_file() {
            files.insert(normalize_path(&absolute));
        } else {
            return Err(ExtractError::io(
                &absolute,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            ));
        }
    }

    Ok(files.into_iter().collect())
}

// =============================================================================
// Output templates
// =============================================================================

/// Output path with `{dir}`, `{name}` and `{ext}` placeholders.
///
/// `{dir}` is the source file's directory, `{name}` its file stem and `{ext}`
/// its extension without the dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    template: String,
}

impl OutputTemplate {
    pub const DEFAULT_TYPES: &'static str = "{dir}/{name}.types.{ext}";
    pub const DEFAULT_TESTS: &'static str = "{dir}/{name}.types.test.{ext}";

    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("{name}") {
            return Err(ExtractError::InvalidOption(format!(
                "output template `{template}` must contain {{name}} so files do not overwrite each other"
            )));
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn render(&self, source: &Path) -> PathBuf {
        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        let name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = source
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ts".to_string());
        PathBuf::from(
            self.template
                .replace("{dir}", &dir.to_string_lossy())
                .replace("{name}", &name)
                .replace("{ext}", &ext),
        )
    }
}

/// Module specifier that imports `target` from a file at `from`.
pub fn relative_import(from: &Path, target: &Path) -> String {
    let from_dir = normalize_path(from.parent().unwrap_or_else(|| Path::new("")));
    let target = normalize_path(target);
    let target = target.with_extension("");

    let from_parts: Vec<Component<'_>> = from_dir.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();
    let common = from_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = vec!["..".to_string(); from_parts.len() - common];
    segments.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    let joined = segments.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_resolve_files_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("schemas/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("schemas/b.ts"), "").unwrap();
        fs::write(root.join("schemas/a.ts"), "").unwrap();
        fs::write(root.join("schemas/nested/c.tsx"), "").unwrap();
        fs::write(root.join("schemas/types.d.ts"), "").unwrap();
        fs::write(root.join("schemas/readme.md"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.ts"), "").unwrap();

        let files = resolve_files(
            &["schemas".to_string(), "schemas/*.ts".to_string(), ".".to_string()],
            root,
        )
        .unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(normalize_path(root)).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["schemas/a.ts", "schemas/b.ts", "schemas/nested/c.tsx"]);
    }

    #[test]
    fn test_missing_plain_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_files(&["missing.ts".to_string()], dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn test_output_template() {
        let template = OutputTemplate::new(OutputTemplate::DEFAULT_TYPES).unwrap();
        assert_eq!(
            template.render(Path::new("/p/src/user.ts")),
            PathBuf::from("/p/src/user.types.ts")
        );
        let flat = OutputTemplate::new("generated/{name}.d.{ext}").unwrap();
        assert_eq!(
            flat.render(Path::new("/p/src/user.tsx")),
            PathBuf::from("generated/user.d.tsx")
        );
        assert!(OutputTemplate::new("out.ts").is_err());
    }

    #[test]
    fn test_relative_import() {
        assert_eq!(
            relative_import(Path::new("/p/src/user.types.test.ts"), Path::new("/p/src/user.ts")),
            "./user"
        );
        assert_eq!(
            relative_import(Path::new("/p/tests/user.test.ts"), Path::new("/p/src/user.types.ts")),
            "../src/user.types"
        );
    }
}
