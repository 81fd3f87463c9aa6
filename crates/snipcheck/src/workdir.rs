//! Per-run working directory for snippet files.
//!
//! Each run gets a fresh directory under the chosen parent. It is removed
//! when the guard is dropped, whichever way the run ends.

use crate::extract::Dialect;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix of every snippet file name.
pub const SNIPPET_FILE_PREFIX: &str = "block-";

/// Prefix of the per-run directory name.
pub const WORKDIR_PREFIX: &str = "compiled-docs-";

/// Errors that can occur while managing the working directory
#[derive(Debug, Error)]
pub enum WorkdirError {
    /// Failed to create the directory
    #[error("Failed to create working directory in {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Disposable directory owned by one run.
#[derive(Debug)]
pub struct WorkingDirectory {
    dir: Option<TempDir>,
    path: PathBuf,
    next_id: AtomicU64,
}

impl WorkingDirectory {
    /// Create a uniquely named directory inside `parent`.
    pub fn create(parent: &Path) -> Result<Self, WorkdirError> {
        std::fs::create_dir_all(parent).map_err(|source| WorkdirError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
        let dir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir_in(parent)
            .map_err(|source| WorkdirError::Create {
                path: parent.to_path_buf(),
                source,
            })?;
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "created working directory");

        Ok(Self {
            dir: Some(dir),
            path,
            next_id: AtomicU64::new(1),
        })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh snippet file path, `block-<id>.<ext>`. Never reused within
    /// a run.
    pub fn snippet_path(&self, dialect: Dialect) -> PathBuf {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.path
            .join(format!("{}{}.{}", SNIPPET_FILE_PREFIX, id, dialect.extension()))
    }

    /// Remove the directory now, reporting failures.
    pub fn close(mut self) -> std::io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                debug!(path = %self.path.display(), "removing working directory");
                dir.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), error = %e, "failed to remove working directory");
            }
        }
    }
}

/// Compiler project file written next to a snippet file.
pub fn config_path_for(snippet_file: &Path) -> PathBuf {
    snippet_file.with_extension("tsconfig.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_paths_are_unique() {
        let parent = tempfile::tempdir().unwrap();
        let workdir = WorkingDirectory::create(parent.path()).unwrap();

        let a = workdir.snippet_path(Dialect::Ts);
        let b = workdir.snippet_path(Dialect::Tsx);
        assert_ne!(a, b);
        assert!(a.starts_with(workdir.path()));
        assert!(b.to_string_lossy().ends_with(".tsx"));
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SNIPPET_FILE_PREFIX));
    }

    #[test]
    fn test_config_path_for() {
        assert_eq!(
            config_path_for(Path::new("/w/block-3.tsx")),
            PathBuf::from("/w/block-3.tsconfig.json")
        );
    }

    #[test]
    fn test_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let workdir = WorkingDirectory::create(parent.path()).unwrap();
            std::fs::write(workdir.snippet_path(Dialect::Ts), "const a = 1;").unwrap();
            workdir.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_close_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let workdir = WorkingDirectory::create(parent.path()).unwrap();
        let path = workdir.path().to_path_buf();
        workdir.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_runs_get_distinct_directories() {
        let parent = tempfile::tempdir().unwrap();
        let a = WorkingDirectory::create(parent.path()).unwrap();
        let b = WorkingDirectory::create(parent.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
