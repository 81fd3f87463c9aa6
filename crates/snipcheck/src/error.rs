//! Run-level errors.

use crate::config::ConfigError;
use crate::exports::ResolutionError;
use crate::extract::ExtractionError;
use crate::package::PackageError;
use crate::workdir::WorkdirError;
use thiserror::Error;

/// Anything that rejects a whole run.
///
/// Failures scoped to one snippet never surface here; they are attached to
/// that snippet's [`CompilationResult`](crate::CompilationResult).
#[derive(Debug, Error)]
pub enum Error {
    /// A documentation file could not be read
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A self-import could not be localized
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// package.json could not be loaded
    #[error(transparent)]
    Package(#[from] PackageError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The working directory could not be created
    #[error(transparent)]
    Workdir(#[from] WorkdirError),
}

/// Result type for run-level operations
pub type Result<T> = std::result::Result<T, Error>;
