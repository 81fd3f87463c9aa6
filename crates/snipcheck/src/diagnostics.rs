//! Mapping compiler diagnostics back to the original snippet.
//!
//! Offsets point into the transformed text; line numbers reported to the
//! user point into the snippet as written in the documentation. Every
//! mention of the ephemeral snippet file is replaced with
//! `<file> → Code Block <index>`.

use crate::compiler::Diagnostic;
use crate::extract::CodeBlock;
use crate::wrap::{SanitizedSnippet, WrapMode};
use crate::workdir::{config_path_for, SNIPPET_FILE_PREFIX, WORKDIR_PREFIX};
use regex::{NoExpand, Regex};
use std::collections::BTreeSet;
use std::path::Path;

/// Replaces ephemeral file paths with a readable block label.
#[derive(Debug, Clone)]
pub struct PathScrubber {
    exact: Vec<String>,
    pattern: Regex,
    label: String,
}

impl PathScrubber {
    /// Scrubber for the file a block was compiled from.
    pub fn new(snippet_file: &Path, block: &CodeBlock) -> Self {
        // Relative spellings of any snippet file inside a working directory.
        // Package files that merely share the name are left alone.
        let pattern = format!(
            r#"[^\s'"`()\[\]<>]*{}[^\s'"`()\[\]<>/\\]*[/\\]{}\d+(?:\.tsconfig\.json|\.tsx?)"#,
            regex::escape(WORKDIR_PREFIX),
            regex::escape(SNIPPET_FILE_PREFIX)
        );
        // Longest spelling first: the config path extends the snippet path.
        let exact = vec![
            config_path_for(snippet_file).display().to_string(),
            snippet_file.display().to_string(),
        ];
        Self {
            exact,
            pattern: Regex::new(&pattern).expect("snippet file pattern is valid"),
            label: block_label(block),
        }
    }

    /// `<file> → Code Block <index>`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace every snippet file reference in `text`.
    pub fn scrub(&self, text: &str) -> String {
        let mut text = text.to_string();
        for exact in self.exact.iter().filter(|e| !e.is_empty()) {
            text = text.replace(exact.as_str(), &self.label);
        }
        self.pattern
            .replace_all(&text, NoExpand(&self.label))
            .into_owned()
    }
}

/// Human-readable name of a block.
pub fn block_label(block: &CodeBlock) -> String {
    format!("{} → Code Block {}", block.file.display(), block.index)
}

/// Diagnostics translated for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedDiagnostics {
    /// One line per diagnostic, scrubbed
    pub message: String,
    /// Ascending, de-duplicated 1-based lines of the original snippet
    pub lines: Vec<usize>,
    /// Diagnostic codes in report order
    pub codes: Vec<u32>,
}

/// Translate diagnostics for one snippet.
pub fn map_diagnostics(
    diagnostics: &[Diagnostic],
    snippet: &SanitizedSnippet,
    scrubber: &PathScrubber,
) -> MappedDiagnostics {
    let line_count = snippet.original_line_count();
    let mut lines = BTreeSet::new();
    let mut codes = Vec::new();
    let mut messages = Vec::with_capacity(diagnostics.len());

    for diagnostic in diagnostics {
        let line = diagnostic
            .offset
            .map(|offset| original_line(&snippet.transformed, offset, snippet.wrap, line_count));

        let text = scrubber.scrub(&diagnostic.text);
        match line {
            Some(line) => {
                lines.insert(line);
                messages.push(format!("{} (line {}): {}", scrubber.label(), line, text));
            }
            None => messages.push(format!("{}: {}", scrubber.label(), text)),
        }

        if let Some(code) = diagnostic.code {
            codes.push(code);
        }
    }

    if messages.is_empty() {
        messages.push(format!(
            "{}: compilation failed without diagnostics",
            scrubber.label()
        ));
    }

    MappedDiagnostics {
        message: messages.join("\n"),
        lines: lines.into_iter().collect(),
        codes,
    }
}

/// Message for a failure that carries no diagnostics.
pub fn map_generic(message: &str, scrubber: &PathScrubber) -> String {
    format!("{}: {}", scrubber.label(), scrubber.scrub(message))
}

/// 1-based line of the original snippet for an offset into the transformed
/// text. Offsets landing in wrapper lines are clamped to the snippet.
pub fn original_line(transformed: &str, offset: usize, wrap: WrapMode, line_count: usize) -> usize {
    let end = offset.min(transformed.len());
    let newlines = transformed.as_bytes()[..end]
        .iter()
        .filter(|&&b| b == b'\n')
        .count();
    (newlines + 1)
        .saturating_sub(wrap.line_offset())
        .clamp(1, line_count.max(1))
}
