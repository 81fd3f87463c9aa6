//! Configuration (snipcheck.toml and compiler options)
//!
//! ```toml
//! files = ["README.md", "docs/*.md"]
//! project = "tsconfig.docs.json"
//! jobs = 4
//!
//! [compiler-options]
//! target = "es2022"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the optional settings file in the package root.
pub const SETTINGS_FILE: &str = "snipcheck.toml";

/// Default TypeScript project file.
pub const DEFAULT_PROJECT: &str = "tsconfig.json";

/// Documentation files checked when none are given.
pub const DEFAULT_FILES: [&str; 1] = ["README.md"];

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the settings file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// Compiler options could not be converted to JSON
    #[error("Invalid compiler options: {0}")]
    CompilerOptions(#[from] serde_json::Error),

    /// Validation error
    #[error("Invalid settings: {0}")]
    Validation(String),
}

/// Options handed to the compiler capability.
///
/// A few options are understood by snipcheck; everything else in
/// `compiler_options` is forwarded verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// tsconfig override, relative to the package root
    pub project: Option<PathBuf>,
    /// Compiler executable
    pub tsc: Option<PathBuf>,
    /// `jsx` compiler option
    pub jsx: Option<String>,
    /// `strict` compiler option
    pub strict: Option<bool>,
    /// Pass-through compiler options
    #[serde(default)]
    pub compiler_options: Map<String, Value>,
}

impl CompilerConfig {
    /// Project file for a package root.
    pub fn project_path(&self, package_root: &Path) -> PathBuf {
        package_root.join(self.project.as_deref().unwrap_or(Path::new(DEFAULT_PROJECT)))
    }

    /// Compiler executable: explicit setting, then the package-local
    /// install, then whatever is on PATH.
    pub fn tsc_command(&self, package_root: &Path) -> PathBuf {
        if let Some(tsc) = &self.tsc {
            // Bare names are looked up on PATH
            if tsc.components().count() == 1 {
                return tsc.clone();
            }
            return package_root.join(tsc);
        }
        let local = package_root.join("node_modules").join(".bin").join("tsc");
        if local.is_file() {
            local
        } else {
            PathBuf::from("tsc")
        }
    }

    /// Options to compile a single snippet with.
    ///
    /// Pass-through options first, then the recognized fields, then the
    /// options every snippet compilation forces.
    pub fn effective_options(&self) -> Map<String, Value> {
        let mut options = self.compiler_options.clone();

        if let Some(jsx) = &self.jsx {
            options.insert("jsx".into(), Value::String(jsx.clone()));
        }
        if let Some(strict) = self.strict {
            options.insert("strict".into(), Value::Bool(strict));
        }

        for (key, value) in [
            ("noEmit", true),
            ("noUnusedLocals", false),
            ("incremental", false),
            ("composite", false),
            ("declaration", false),
            ("declarationMap", false),
            ("sourceMap", false),
        ] {
            options.insert(key.into(), Value::Bool(value));
        }

        options
    }
}

/// Contents of snipcheck.toml.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Documentation files or glob patterns
    #[serde(default)]
    pub files: Vec<String>,
    /// tsconfig override
    pub project: Option<PathBuf>,
    /// Compiler executable
    pub tsc: Option<PathBuf>,
    /// Parallel compilations
    pub jobs: Option<usize>,
    /// Wrap script snippets in an isolating function
    pub wrap: Option<bool>,
    /// `jsx` compiler option
    pub jsx: Option<String>,
    /// `strict` compiler option
    pub strict: Option<bool>,
    /// Pass-through compiler options
    #[serde(default)]
    pub compiler_options: toml::Table,
}

impl Settings {
    /// Load `<package_root>/snipcheck.toml`, or defaults when absent.
    pub fn load(package_root: &Path) -> Result<Self, ConfigError> {
        let path = package_root.join(SETTINGS_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path, source })?;
        Self::from_str(&content)
    }

    /// Parse settings from a string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::Validation("jobs must be at least 1".to_string()));
        }
        if self.files.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "files cannot contain empty entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Compiler configuration described by these settings.
    pub fn compiler_config(&self) -> Result<CompilerConfig, ConfigError> {
        let compiler_options = match serde_json::to_value(&self.compiler_options)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Ok(CompilerConfig {
            project: self.project.clone(),
            tsc: self.tsc.clone(),
            jsx: self.jsx.clone(),
            strict: self.strict,
            compiler_options,
        })
    }

    /// Documentation files, falling back to [`DEFAULT_FILES`].
    pub fn files_or_default(&self) -> Vec<String> {
        if self.files.is_empty() {
            DEFAULT_FILES.iter().map(|f| f.to_string()).collect()
        } else {
            self.files.clone()
        }
    }
}
