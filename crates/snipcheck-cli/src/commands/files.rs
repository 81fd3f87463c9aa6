//! Documentation file collection.

use std::path::{Path, PathBuf};
use tracing::warn;

/// Expand input file arguments into documentation file paths.
///
/// Patterns containing glob characters are expanded and sorted; literal
/// paths are kept as given, even when missing, so the run can report
/// them. Relative entries are taken relative to `base`.
pub fn expand_input_files(patterns: &[String], base: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let full = base.join(pattern);
        if !is_glob(pattern) {
            push_unique(&mut files, full);
            continue;
        }

        let full_pattern = full.to_string_lossy();
        let mut matched: Vec<PathBuf> = glob::glob(&full_pattern)?
            .flatten()
            .filter(|path| path.is_file())
            .collect();
        if matched.is_empty() {
            warn!(pattern = %pattern, "pattern matched no files");
        }
        matched.sort();
        for path in matched {
            push_unique(&mut files, path);
        }
    }

    Ok(files)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn push_unique(files: &mut Vec<PathBuf>, path: PathBuf) {
    if !files.contains(&path) {
        files.push(path);
    }
}
