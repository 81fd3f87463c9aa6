//! Code block extraction from markdown documentation.
//!
//! Scans for fenced blocks tagged with a TypeScript dialect:
//! ````markdown
//! ```ts
//! const answer: number = 42;
//! ```
//! ````
//!
//! A block directly preceded by `<!-- snipcheck:ignore -->` (or the legacy
//! `<!-- ts-docs-verifier:ignore -->`) is left out and does not take an
//! index. The scan runs in two phases: annotation positions first, fences
//! second.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Fence delimiter shared by opening and closing lines.
const FENCE: &str = "```";

static IGNORE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*(?:snipcheck|ts-docs-verifier):ignore\s*-->")
        .expect("ignore annotation pattern is valid")
});

/// Errors that can occur while extracting blocks from a file
#[derive(Debug, Error)]
#[error("Error extracting code blocks from {path}: {source}")]
pub struct ExtractionError {
    /// Documentation file that could not be read
    pub path: PathBuf,

    /// Underlying I/O failure
    #[source]
    pub source: std::io::Error,
}

/// Code dialect declared on the opening fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// ```` ```typescript ````
    TypeScript,
    /// ```` ```ts ````
    Ts,
    /// ```` ```tsx ````
    Tsx,
}

impl Dialect {
    /// Recognize a fence info string. Only the first word counts.
    pub fn from_info(info: &str) -> Option<Self> {
        let tag = info.split_whitespace().next()?;
        match tag.to_ascii_lowercase().as_str() {
            "typescript" => Some(Dialect::TypeScript),
            "ts" => Some(Dialect::Ts),
            "tsx" => Some(Dialect::Tsx),
            _ => None,
        }
    }

    /// Whether JSX syntax is allowed.
    pub fn is_jsx(self) -> bool {
        matches!(self, Dialect::Tsx)
    }

    /// File extension used when the snippet is written for compilation.
    pub fn extension(self) -> &'static str {
        if self.is_jsx() {
            "tsx"
        } else {
            "ts"
        }
    }
}

/// A code block extracted from a documentation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Documentation file the block came from
    pub file: PathBuf,
    /// 1-based position among the file's non-ignored blocks
    pub index: usize,
    /// Block body, verbatim, up to the closing fence
    pub source: String,
    /// Declared dialect
    pub dialect: Dialect,
}

/// Read a documentation file and extract its code blocks.
pub fn extract_file(path: &Path) -> Result<Vec<CodeBlock>, ExtractionError> {
    let markdown = std::fs::read_to_string(path).map_err(|source| ExtractionError {
        path: path.to_path_buf(),
        source,
    })?;
    let blocks = extract_blocks(path, &markdown);
    debug!(file = %path.display(), blocks = blocks.len(), "extracted code blocks");
    Ok(blocks)
}

/// Extract all recognized, non-ignored code blocks from markdown content.
pub fn extract_blocks(path: &Path, markdown: &str) -> Vec<CodeBlock> {
    let annotation_ends = find_annotation_ends(markdown);
    let mut blocks = Vec::new();

    for fence in scan_fences(markdown) {
        if is_ignored(markdown, fence.start, &annotation_ends) {
            continue;
        }
        blocks.push(CodeBlock {
            file: path.to_path_buf(),
            index: blocks.len() + 1,
            source: markdown[fence.body.clone()].to_string(),
            dialect: fence.dialect,
        });
    }

    blocks
}

/// A TypeScript region found in the document.
#[derive(Debug)]
struct Fence {
    /// Byte offset of the opening backticks
    start: usize,
    /// Byte range of the body
    body: std::ops::Range<usize>,
    dialect: Dialect,
}

/// Phase one: byte offsets just past every ignore annotation.
fn find_annotation_ends(markdown: &str) -> Vec<usize> {
    IGNORE_ANNOTATION
        .find_iter(markdown)
        .map(|m| m.end())
        .collect()
}

/// Phase two: pair every TypeScript opener with the next fence delimiter.
///
/// Only backticks directly followed by a dialect tag open a region, so
/// stray backticks in prose and fences of other languages are stepped
/// over. The closing delimiter may sit anywhere, including the middle of a
/// line, and a new fence may open right after it on the same line.
fn scan_fences(markdown: &str) -> Vec<Fence> {
    let mut fences = Vec::new();
    let mut pos = 0;

    while let Some(found) = markdown[pos..].find(FENCE) {
        let start = pos + found;
        let info_start = start + FENCE.len();

        // The info string runs to the end of the opening line.
        let Some(newline) = markdown[info_start..].find('\n') else {
            break;
        };
        let Some(dialect) = opener_dialect(&markdown[info_start..info_start + newline]) else {
            pos = info_start;
            continue;
        };
        let body_start = info_start + newline + 1;

        let Some(close) = markdown[body_start..].find(FENCE) else {
            break;
        };
        let body_end = body_start + close;

        fences.push(Fence {
            start,
            body: body_start..body_end,
            dialect,
        });
        pos = body_end + FENCE.len();
    }

    fences
}

/// Dialect of an opening fence; the tag must follow the backticks directly.
fn opener_dialect(info: &str) -> Option<Dialect> {
    if info.starts_with(char::is_whitespace) {
        return None;
    }
    Dialect::from_info(info)
}

/// A fence is ignored when only whitespace separates it from an annotation.
fn is_ignored(markdown: &str, fence_start: usize, annotation_ends: &[usize]) -> bool {
    let preceding = markdown[..fence_start].trim_end().len();
    annotation_ends.binary_search(&preceding).is_ok()
}
