//! Snipcheck Library
//!
//! Type-checks the TypeScript snippets embedded in a package's markdown
//! documentation, including:
//! - Fenced code block extraction with ignore annotations
//! - Export map resolution (`main`, conditional and wildcard `exports`)
//! - Self-import localization to the package's own sources
//! - Isolated, optionally parallel compilation of every snippet
//! - Mapping diagnostics back to documentation line numbers

pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exports;
pub mod extract;
pub mod localize;
pub mod orchestrator;
pub mod package;
pub mod tsc;
pub mod workdir;
pub mod wrap;

pub use compiler::{CompileOutcome, CompileRequest, Compiler, Diagnostic};
pub use config::{CompilerConfig, ConfigError, Settings, DEFAULT_FILES, SETTINGS_FILE};
pub use diagnostics::{map_diagnostics, MappedDiagnostics, PathScrubber};
pub use error::{Error, Result};
pub use exports::{ExportResolver, ResolutionError};
pub use extract::{extract_blocks, extract_file, CodeBlock, Dialect, ExtractionError};
pub use localize::ImportLocalizer;
pub use orchestrator::{CompilationError, CompilationResult, RunOptions, SnippetCompiler};
pub use package::{find_package_root, ExportTarget, PackageDefinition, PackageError};
pub use tsc::TscCompiler;
pub use workdir::{WorkdirError, WorkingDirectory};
pub use wrap::{SanitizedSnippet, WrapMode};
