//! Export map resolution
//!
//! Maps a self-import (`my-package` or `my-package/some/path`) to a file
//! inside the package, following the package's `exports` map when present
//! and falling back to `main` otherwise.
//!
//! Lookup order:
//! 1. no `exports`: the root request gets `main`, subpaths are rejected
//! 2. `exports` is a string: it serves the root request only
//! 3. conditional map: the first present condition of [`CONDITIONS`] wins
//!    and resolution recurses into its value
//! 4. subpath map: the exact key wins, then the `*` pattern with the
//!    longest prefix; its captured segment is substituted into the target

use crate::package::{ExportTarget, PackageDefinition};
use thiserror::Error;

/// Conditions honoured in a conditional map, highest priority first.
pub const CONDITIONS: [&str; 5] = ["node-addons", "node", "import", "require", "default"];

/// Suffixes removed from resolved paths. `.d.ts` must come before `.ts`.
const STRIPPED_EXTENSIONS: [&str; 5] = [".d.ts", ".tsx", ".ts", ".jsx", ".js"];

/// Errors that can occur during export resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Neither `main` nor `exports` is declared
    #[error("Failed to find a valid main or exports entry in package.json file")]
    MissingEntry,

    /// No entry serves the requested path
    #[error("Unable to resolve export for path \"{0}\"")]
    Unresolved(String),
}

/// Resolves self-import requests against a package's entry points.
#[derive(Debug, Clone)]
pub struct ExportResolver {
    package_name: String,
    main: Option<String>,
    exports: Option<ExportTarget>,
}

impl ExportResolver {
    /// Create a resolver. Fails when the package declares no entry point.
    pub fn new(
        package_name: impl Into<String>,
        main: Option<String>,
        exports: Option<ExportTarget>,
    ) -> Result<Self, ResolutionError> {
        if main.is_none() && exports.is_none() {
            return Err(ResolutionError::MissingEntry);
        }

        Ok(Self {
            package_name: package_name.into(),
            main,
            exports,
        })
    }

    /// Create a resolver for a package definition.
    pub fn for_package(package: &PackageDefinition) -> Result<Self, ResolutionError> {
        Self::new(
            package.name.clone(),
            package.main.clone(),
            package.exports.clone(),
        )
    }

    /// Name of the package being resolved.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Resolve a request to a path relative to the package root.
    ///
    /// `subpath` is the part after the package name, with or without its
    /// leading slash; `None` or an empty string means the package root.
    /// The returned path has no leading `./` and no source extension.
    pub fn resolve(&self, subpath: Option<&str>) -> Result<String, ResolutionError> {
        let subpath = subpath.map(|s| s.trim_start_matches('/')).unwrap_or("");
        let request = if subpath.is_empty() {
            ".".to_string()
        } else {
            format!("./{}", subpath)
        };

        let resolved = match &self.exports {
            None if request == "." => self.main.clone(),
            None => None,
            Some(exports) => resolve_target(exports, &request),
        };

        resolved
            .map(|path| normalize(&path))
            .ok_or_else(|| self.unresolved(subpath))
    }

    fn unresolved(&self, subpath: &str) -> ResolutionError {
        if subpath.is_empty() {
            ResolutionError::Unresolved(self.package_name.clone())
        } else {
            ResolutionError::Unresolved(format!("{}/{}", self.package_name, subpath))
        }
    }
}

/// Resolve a request against any node of the export map.
fn resolve_target(target: &ExportTarget, request: &str) -> Option<String> {
    match target {
        ExportTarget::Path(path) => (request == ".").then(|| path.clone()),
        ExportTarget::Null => None,
        ExportTarget::Map(entries) if target.is_subpath_map() => resolve_subpath(entries, request),
        ExportTarget::Map(_) => select_condition(target).and_then(|t| resolve_target(t, request)),
    }
}

/// First present, non-null condition in priority order.
fn select_condition(target: &ExportTarget) -> Option<&ExportTarget> {
    CONDITIONS
        .iter()
        .filter_map(|condition| target.get(condition))
        .find(|t| !matches!(t, ExportTarget::Null))
}

fn resolve_subpath(entries: &[(String, ExportTarget)], request: &str) -> Option<String> {
    if let Some((_, target)) = entries.iter().find(|(key, _)| key == request) {
        return resolve_entry(target, None);
    }

    let mut best: Option<(usize, &str, &ExportTarget)> = None;
    for (pattern, target) in entries {
        let Some(captured) = match_pattern(pattern, request) else {
            continue;
        };
        let prefix_len = pattern.find('*').unwrap_or(0);
        if best.map_or(true, |(len, _, _)| prefix_len > len) {
            best = Some((prefix_len, captured, target));
        }
    }

    best.and_then(|(_, captured, target)| resolve_entry(target, Some(captured)))
}

/// Match a request against a single-wildcard pattern, returning the
/// captured segment.
fn match_pattern<'a>(pattern: &str, request: &'a str) -> Option<&'a str> {
    let (prefix, suffix) = pattern.split_once('*')?;
    if suffix.contains('*') {
        return None;
    }
    if request.len() <= prefix.len() + suffix.len() {
        return None;
    }
    if !request.starts_with(prefix) || !request.ends_with(suffix) {
        return None;
    }
    Some(&request[prefix.len()..request.len() - suffix.len()])
}

/// Resolve the value of a matched subpath entry.
fn resolve_entry(target: &ExportTarget, captured: Option<&str>) -> Option<String> {
    match target {
        ExportTarget::Path(path) => Some(match captured {
            Some(segment) => path.replace('*', segment),
            None => path.clone(),
        }),
        ExportTarget::Null => None,
        ExportTarget::Map(_) if target.is_subpath_map() => None,
        ExportTarget::Map(_) => select_condition(target).and_then(|t| resolve_entry(t, captured)),
    }
}

/// Drop the leading `./` and a trailing source extension.
fn normalize(path: &str) -> String {
    let path = path.strip_prefix("./").unwrap_or(path);
    STRIPPED_EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
        .unwrap_or(path)
        .to_string()
}
