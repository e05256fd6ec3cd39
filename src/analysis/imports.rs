//! Imported schema resolution
//!
//! Named imports from local modules are traced to the file that actually
//! defines the schema, through `export * from` and `export { x as y } from`
//! chains. A visited set bounds circular module graphs.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::{detect, ImportedSchemaInfo};
use crate::error::Result;
use crate::project::Project;
use crate::source::{Imported, ReExport, SourceFile, ZOD_MODULES};

/// Imported schemas of `file`, keyed by local name.
pub fn find_imported_schemas(
    file: &SourceFile,
    project: &Project,
) -> Result<BTreeMap<String, ImportedSchemaInfo>> {
    let mut result = BTreeMap::new();

    for binding in file.imports() {
        let Imported::Named(original) = &binding.imported else {
            continue;
        };
        if binding.type_only || ZOD_MODULES.contains(&binding.specifier.as_str()) {
            continue;
        }
        let relative = binding.specifier.starts_with('.');
        let Some(module) = project.resolve_module(file.path(), &binding.specifier) else {
            if relative {
                warn!(
                    name = %binding.local,
                    specifier = %binding.specifier,
                    "could not resolve import; reference stays inlined"
                );
                result.insert(
                    binding.local.clone(),
                    ImportedSchemaInfo {
                        local_name: binding.local.clone(),
                        original_name: original.clone(),
                        declaration_name: original.clone(),
                        source_file_path: None,
                        resolved: false,
                    },
                );
            }
            continue;
        };

        let mut visited = HashSet::new();
        let origin = locate(project, &module, original, &mut visited)?;
        let info = match origin {
            Some(origin) => ImportedSchemaInfo {
                local_name: binding.local.clone(),
                original_name: origin.name,
                declaration_name: origin.declaration,
                source_file_path: Some(origin.path),
                resolved: true,
            },
            None => ImportedSchemaInfo {
                local_name: binding.local.clone(),
                original_name: original.clone(),
                declaration_name: original.clone(),
                source_file_path: Some(module),
                resolved: false,
            },
        };
        result.insert(binding.local.clone(), info);
    }
    Ok(result)
}

struct Origin {
    path: PathBuf,
    name: String,
    declaration: String,
}

/// Find the file and declaration behind an exported schema name.
fn locate(
    project: &Project,
    path: &Path,
    name: &str,
    visited: &mut HashSet<PathBuf>,
) -> Result<Option<Origin>> {
    if !visited.insert(path.to_path_buf()) {
        return Ok(None);
    }
    let file = project.source(path)?;

    if let Some(schema) = detect(&file)
        .into_iter()
        .find(|s| s.name == name && s.is_exported)
    {
        return Ok(Some(Origin {
            path: file.path().to_path_buf(),
            name: schema.name,
            declaration: schema.local_name,
        }));
    }

    for reexport in file.reexports() {
        let (original, specifier) = match &reexport {
            ReExport::Named {
                name: original,
                alias,
                specifier,
            } => {
                if alias.as_deref().unwrap_or(original) != name {
                    continue;
                }
                (original.as_str(), specifier)
            }
            ReExport::Star { specifier } => (name, specifier),
        };
        let Some(target) = project.resolve_module(path, specifier) else {
            continue;
        };
        if let Some(found) = locate(project, &target, original, visited)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "import { z } from \"zod\";\n";

    #[test]
    fn test_follows_reexport_chains() {
        let mut project = Project::new();
        project.add_source(
            "/p/models/user.ts",
            format!("{HEADER}const UserSchema = z.object({{ id: z.string() }});\nexport {{ UserSchema as User }};"),
        );
        project.add_source("/p/models/index.ts", "export * from \"./user\";");
        project.add_source("/p/barrel.ts", "export { User as Person } from \"./models\";");
        project.add_source(
            "/p/main.ts",
            format!("{HEADER}import {{ Person }} from \"./barrel\";\nimport {{ helper }} from \"./missing\";\nimport {{ thing }} from \"some-package\";"),
        );

        let main = project.source(Path::new("/p/main.ts")).unwrap();
        let imports = find_imported_schemas(&main, &project).unwrap();

        let person = &imports["Person"];
        assert!(person.resolved);
        assert_eq!(person.original_name, "User");
        assert_eq!(person.declaration_name, "UserSchema");
        assert_eq!(
            person.source_file_path.as_deref(),
            Some(Path::new("/p/models/user.ts"))
        );
        assert!(!imports["helper"].resolved);
        assert!(!imports.contains_key("thing"));
    }

    #[test]
    fn test_circular_reexports_terminate() {
        let mut project = Project::new();
        project.add_source("/c/a.ts", "export * from \"./b\";");
        project.add_source("/c/b.ts", "export * from \"./a\";");
        project.add_source("/c/main.ts", "import { X } from \"./a\";");

        let main = project.source(Path::new("/c/main.ts")).unwrap();
        let imports = find_imported_schemas(&main, &project).unwrap();
        assert!(!imports["X"].resolved);
    }
}
