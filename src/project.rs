//! Project state shared by every checker query
//!
//! The project owns the in-memory text of every file it has seen (read through
//! from disk on first use) plus the optional `tsconfig.json` module settings.
//! Temporary declarations are appended with [`Project::inject`], which returns a
//! guard that puts the original text back when it goes out of scope.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;
use tracing::debug;

use crate::checksum::Checksum;
use crate::error::{ExtractError, Result};
use crate::source::SourceFile;

/// Extensions tried, in order, when resolving a module specifier
const MODULE_EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts"];

/// The subset of `tsconfig.json` used for module resolution
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    #[serde(default)]
    pub compiler_options: CompilerOptions,
    /// Directory the config was loaded from
    #[serde(skip)]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub paths: BTreeMap<String, Vec<String>>,
}

impl TsConfig {
    /// Load a tsconfig, tolerating comments and trailing commas.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
        let mut config: TsConfig = serde_json::from_str(&strip_json_extras(&raw))?;
        config.dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    fn base_dir(&self) -> PathBuf {
        match &self.compiler_options.base_url {
            Some(base) => self.dir.join(base),
            None => self.dir.clone(),
        }
    }

    /// Candidate paths for a non-relative specifier via `baseUrl` and `paths`.
    fn candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let base = self.base_dir();
        let mut out = Vec::new();
        for (pattern, targets) in &self.compiler_options.paths {
            let captured = match pattern.split_once('*') {
                Some((prefix, suffix)) => specifier
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(suffix)),
                None => (pattern == specifier).then_some(""),
            };
            if let Some(captured) = captured {
                for target in targets {
                    out.push(base.join(target.replacen('*', captured, 1)));
                }
            }
        }
        if self.compiler_options.base_url.is_some() {
            out.push(base.join(specifier));
        }
        out
    }
}

/// Remove `//` and `/* */` comments and trailing commas from JSON-with-comments.
fn strip_json_extras(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    let mut in_string = false;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 1;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            ('/', Some('*')) => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
                continue;
            }
            (',', _) => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Lexically normalize a path (drop `.`, fold `..`).
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Single-owner program state queried by the checker.
#[derive(Debug, Default)]
pub struct Project {
    tsconfig: Option<TsConfig>,
    /// In-memory texts; disk reads land here on first use
    texts: RefCell<HashMap<PathBuf, String>>,
    /// Parsed trees keyed by path, invalidated on every text change
    parsed: RefCell<HashMap<PathBuf, Rc<SourceFile>>>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project configured from a tsconfig file.
    pub fn from_tsconfig(path: impl AsRef<Path>) -> Result<Self> {
        let tsconfig = TsConfig::load(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loaded tsconfig");
        Ok(Self {
            tsconfig: Some(tsconfig),
            ..Self::default()
        })
    }

    pub fn tsconfig(&self) -> Option<&TsConfig> {
        self.tsconfig.as_ref()
    }

    /// Register an in-memory file, replacing any previous text.
    pub fn add_source(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.set_text(path.as_ref(), text.into());
    }

    fn set_text(&self, path: &Path, text: String) {
        let path = normalize_path(path);
        self.parsed.borrow_mut().remove(&path);
        self.texts.borrow_mut().insert(path, text);
    }

    /// Current text of a file.
    pub fn text(&self, path: &Path) -> Result<String> {
        let path = normalize_path(path);
        if let Some(text) = self.texts.borrow().get(&path) {
            return Ok(text.clone());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ExtractError::io(&path, e))?;
        self.texts.borrow_mut().insert(path, text.clone());
        Ok(text)
    }

    /// Checksum of a file's current text.
    pub fn checksum(&self, path: &Path) -> Result<Checksum> {
        Ok(Checksum::of(&self.text(path)?))
    }

    /// Parsed view of a file's current text.
    pub fn source(&self, path: &Path) -> Result<Rc<SourceFile>> {
        let path = normalize_path(path);
        if let Some(parsed) = self.parsed.borrow().get(&path) {
            return Ok(Rc::clone(parsed));
        }
        let text = self.text(&path)?;
        let parsed = Rc::new(SourceFile::parse(&path, text)?);
        self.parsed
            .borrow_mut()
            .insert(path, Rc::clone(&parsed));
        Ok(parsed)
    }

    /// Whether a file is known in memory or exists on disk.
    pub fn exists(&self, path: &Path) -> bool {
        let path = normalize_path(path);
        self.texts.borrow().contains_key(&path) || path.is_file()
    }

    /// Resolve an import specifier relative to the importing file.
    ///
    /// Relative specifiers resolve against the importer's directory; bare
    /// specifiers only resolve through tsconfig `paths`/`baseUrl`.
    pub fn resolve_module(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        let bases: Vec<PathBuf> = if specifier.starts_with('.') {
            let dir = from.parent().unwrap_or_else(|| Path::new(""));
            vec![dir.join(specifier)]
        } else {
            self.tsconfig
                .as_ref()
                .map(|config| config.candidates(specifier))
                .unwrap_or_default()
        };

        bases
            .iter()
            .flat_map(|base| module_candidates(base))
            .map(|candidate| normalize_path(&candidate))
            .find(|candidate| self.exists(candidate))
    }

    /// Append temporary text to a file until the returned guard drops.
    pub fn inject(&mut self, path: &Path, appended: &str) -> Result<Injection<'_>> {
        let path = normalize_path(path);
        let original = self.text(&path)?;
        self.set_text(&path, format!("{original}\n{appended}\n"));
        debug!(path = %path.display(), bytes = appended.len(), "injected temporary declarations");
        Ok(Injection {
            project: self,
            path,
            original,
        })
    }
}

fn module_candidates(base: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let raw = base.to_string_lossy();

    // `./user.js` in ESM-style TypeScript refers to `./user.ts`
    for (js, ts) in [(".js", ".ts"), (".jsx", ".tsx"), (".mjs", ".mts")] {
        if let Some(stem) = raw.strip_suffix(js) {
            candidates.push(PathBuf::from(format!("{stem}{ts}")));
        }
    }
    if base.extension().is_some_and(|ext| ext == "ts" || ext == "tsx") {
        candidates.push(base.to_path_buf());
    }
    for ext in MODULE_EXTENSIONS {
        candidates.push(PathBuf::from(format!("{raw}.{ext}")));
    }
    for ext in MODULE_EXTENSIONS {
        candidates.push(base.join(format!("index.{ext}")));
    }
    candidates
}

/// Scoped injection; derefs to the project for queries and restores on drop.
pub struct Injection<'p> {
    project: &'p mut Project,
    path: PathBuf,
    original: String,
}

impl Injection<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for Injection<'_> {
    type Target = Project;

    fn deref(&self) -> &Project {
        self.project
    }
}

impl Drop for Injection<'_> {
    fn drop(&mut self) {
        let original = std::mem::take(&mut self.original);
        self.project.set_text(&self.path, original);
        debug!(path = %self.path.display(), "restored original text");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injection_restores_on_drop() {
        let mut project = Project::new();
        let path = Path::new("/virtual/user.ts");
        project.add_source(path, "export const A = 1;");
        let before = project.checksum(path).unwrap();

        {
            let injected = project.inject(path, "type __Scratch = string;").unwrap();
            let text = injected.text(path).unwrap();
            assert!(text.contains("__Scratch"));
        }

        assert_eq!(project.text(path).unwrap(), "export const A = 1;");
        assert_eq!(project.checksum(path).unwrap(), before);
    }

    #[test]
    fn test_injection_restores_on_early_return() {
        fn inject_then_fail(project: &mut Project, path: &Path) -> Result<()> {
            let injected = project.inject(path, "type __Scratch = number;")?;
            injected.text(Path::new("/virtual/missing.ts"))?;
            Ok(())
        }

        let mut project = Project::new();
        let path = Path::new("/virtual/a.ts");
        project.add_source(path, "const A = 1;");
        assert!(inject_then_fail(&mut project, path).is_err());
        assert_eq!(project.text(path).unwrap(), "const A = 1;");
    }

    #[test]
    fn test_resolve_relative_module() {
        let mut project = Project::new();
        project.add_source("/virtual/src/user.ts", "");
        project.add_source("/virtual/src/models/index.ts", "");
        let from = Path::new("/virtual/src/main.ts");

        assert_eq!(
            project.resolve_module(from, "./user"),
            Some(PathBuf::from("/virtual/src/user.ts"))
        );
        assert_eq!(
            project.resolve_module(from, "./user.js"),
            Some(PathBuf::from("/virtual/src/user.ts"))
        );
        assert_eq!(
            project.resolve_module(from, "./models"),
            Some(PathBuf::from("/virtual/src/models/index.ts"))
        );
        assert_eq!(project.resolve_module(from, "./missing"), None);
        assert_eq!(project.resolve_module(from, "zod"), None);
    }

    #[test]
    fn test_tsconfig_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("tsconfig.json");
        std::fs::write(
            &config_path,
            r#"{
  // comments are allowed
  "compilerOptions": {
    "baseUrl": ".",
    "paths": { "@/*": ["src/*"], },
  },
}"#,
        )
        .unwrap();

        let mut project = Project::from_tsconfig(&config_path).unwrap();
        let target = dir.path().join("src/schemas.ts");
        project.add_source(&target, "");

        let resolved = project.resolve_module(&dir.path().join("main.ts"), "@/schemas");
        assert_eq!(resolved, Some(normalize_path(&target)));
    }

    #[test]
    fn test_strip_json_extras_keeps_strings() {
        let cleaned = strip_json_extras(r#"{ "a": "http://x/*y*/", /* c */ "b": [1, 2,], }"#);
        let value: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value["a"], "http://x/*y*/");
        assert_eq!(value["b"], serde_json::json!([1, 2]));
    }
}
