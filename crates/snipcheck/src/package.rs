//! Package metadata (package.json)
//!
//! Provides the package definition consumed by export resolution, and the
//! upward search that locates it from a working directory.

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the metadata file searched for.
pub const PACKAGE_FILE: &str = "package.json";

/// Errors that can occur while reading package metadata
#[derive(Debug, Error)]
pub enum PackageError {
    /// No package.json in the start directory or any ancestor
    #[error("Failed to find package.json - are you running this inside a NodeJS project? (searched from {0})")]
    NotFound(PathBuf),

    /// Failed to read package.json
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Malformed `exports` entry
    #[error("Invalid exports entry: {0}")]
    InvalidExports(String),
}

/// A node of a package export map.
///
/// Maps keep declaration order; pattern lookup depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    /// A path such as `"./dist/index.js"`
    Path(String),
    /// An explicit `null`, which blocks the entry
    Null,
    /// Conditional keys or subpath patterns
    Map(Vec<(String, ExportTarget)>),
}

impl ExportTarget {
    /// Build a target from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, PackageError> {
        match value {
            Value::String(path) => Ok(ExportTarget::Path(path.clone())),
            Value::Null => Ok(ExportTarget::Null),
            Value::Object(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), ExportTarget::from_value(value)?)))
                .collect::<Result<Vec<_>, _>>()
                .map(ExportTarget::Map),
            // Fallback arrays: the first usable entry wins.
            Value::Array(items) => items
                .iter()
                .find(|item| item.is_string() || item.is_object())
                .map(ExportTarget::from_value)
                .unwrap_or(Ok(ExportTarget::Null)),
            other => Err(PackageError::InvalidExports(other.to_string())),
        }
    }

    /// Build a map target from literal pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ExportTarget)>,
    {
        ExportTarget::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a path target.
    pub fn path(path: impl Into<String>) -> Self {
        ExportTarget::Path(path.into())
    }

    /// Look up a key in a map target.
    pub fn get(&self, key: &str) -> Option<&ExportTarget> {
        match self {
            ExportTarget::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// A map whose keys are subpath patterns rather than conditions.
    pub fn is_subpath_map(&self) -> bool {
        match self {
            ExportTarget::Map(entries) => entries.iter().any(|(k, _)| k.starts_with('.')),
            _ => false,
        }
    }
}

/// Package definition used for self-import localization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDefinition {
    /// Package name, possibly scoped (`@org/name`)
    pub name: String,
    /// Legacy `main` entry
    pub main: Option<String>,
    /// Directory containing package.json
    pub package_root: PathBuf,
    /// `exports` map
    pub exports: Option<ExportTarget>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    name: String,
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    exports: Option<Value>,
}

impl PackageDefinition {
    /// Find package.json in `start_dir` or an ancestor and read it.
    pub fn discover(start_dir: &Path) -> Result<Self, PackageError> {
        let root = find_package_root(start_dir)
            .ok_or_else(|| PackageError::NotFound(start_dir.to_path_buf()))?;
        Self::read(&root)
    }

    /// Read `<package_root>/package.json`.
    pub fn read(package_root: &Path) -> Result<Self, PackageError> {
        let path = package_root.join(PACKAGE_FILE);
        let content = std::fs::read_to_string(&path).map_err(|source| PackageError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&content, package_root)
    }

    /// Parse package.json content for a package living at `package_root`.
    pub fn from_json(content: &str, package_root: &Path) -> Result<Self, PackageError> {
        let raw: RawPackage = serde_json::from_str(content).map_err(|source| PackageError::Parse {
            path: package_root.join(PACKAGE_FILE),
            source,
        })?;
        let exports = raw.exports.as_ref().map(ExportTarget::from_value).transpose()?;

        Ok(PackageDefinition {
            name: raw.name,
            main: raw.main,
            package_root: package_root.to_path_buf(),
            exports,
        })
    }
}

/// Walk up from `start_dir` looking for package.json.
pub fn find_package_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        if current.join(PACKAGE_FILE).is_file() {
            return Some(current.to_path_buf());
        }

        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_main_only() {
        let pkg = PackageDefinition::from_json(
            r#"{ "name": "awesome", "version": "1.0.0", "main": "index.ts" }"#,
            Path::new("/pkg"),
        )
        .unwrap();
        assert_eq!(pkg.name, "awesome");
        assert_eq!(pkg.main.as_deref(), Some("index.ts"));
        assert!(pkg.exports.is_none());
        assert_eq!(pkg.package_root, PathBuf::from("/pkg"));
    }

    #[test]
    fn test_parse_string_exports() {
        let pkg =
            PackageDefinition::from_json(r#"{ "name": "a", "exports": "./main.ts" }"#, Path::new("/pkg"))
                .unwrap();
        assert_eq!(pkg.exports, Some(ExportTarget::path("./main.ts")));
    }

    #[test]
    fn test_parse_keeps_declaration_order() {
        let pkg = PackageDefinition::from_json(
            r#"{
                "name": "a",
                "exports": {
                    "./z/*": "./src/z/*.ts",
                    ".": { "import": "./src/index.ts", "default": null },
                    "./a": "./src/a.ts"
                }
            }"#,
            Path::new("/pkg"),
        )
        .unwrap();

        let exports = pkg.exports.unwrap();
        let ExportTarget::Map(entries) = &exports else {
            panic!("expected a map");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["./z/*", ".", "./a"]);
        assert!(exports.is_subpath_map());
        assert_eq!(
            exports.get("."),
            Some(&ExportTarget::map([
                ("import", ExportTarget::path("./src/index.ts")),
                ("default", ExportTarget::Null),
            ]))
        );
    }

    #[test]
    fn test_parse_fallback_array() {
        let target = ExportTarget::from_value(&serde_json::json!([null, "./a.ts", "./b.ts"])).unwrap();
        assert_eq!(target, ExportTarget::path("./a.ts"));
    }

    #[test]
    fn test_invalid_exports_value() {
        let result = PackageDefinition::from_json(r#"{ "name": "a", "exports": 42 }"#, Path::new("/pkg"));
        assert!(matches!(result, Err(PackageError::InvalidExports(_))));
    }

    #[test]
    fn test_missing_name() {
        let result = PackageDefinition::from_json(r#"{ "main": "index.ts" }"#, Path::new("/pkg"));
        assert!(matches!(result, Err(PackageError::Parse { .. })));
    }

    #[test]
    fn test_discover_from_nested_directory() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join(PACKAGE_FILE), r#"{ "name": "nested", "main": "index.ts" }"#).unwrap();
        let nested = root.join("docs").join("guides");
        fs::create_dir_all(&nested).unwrap();

        let pkg = PackageDefinition::discover(&nested).unwrap();
        assert_eq!(pkg.name, "nested");
        assert_eq!(pkg.package_root, root.to_path_buf());
    }

    #[test]
    fn test_discover_not_found() {
        let temp = tempfile::tempdir().unwrap();
        // Ancestors of a fresh temp dir normally carry no package.json.
        if find_package_root(temp.path()).is_some() {
            return;
        }
        let result = PackageDefinition::discover(temp.path());
        assert!(matches!(result, Err(PackageError::NotFound(_))));
    }
}
