//! Snippet sanitization: localized imports plus an optional isolating
//! wrapper.
//!
//! Script snippets are wrapped in an async arrow function so their
//! top-level declarations cannot clash with globals:
//!
//! ```text
//! (async () => {
//! <snippet>
//! })();
//! ```
//!
//! Snippets with module-level syntax stay unwrapped, since `import`,
//! `export` and ambient declarations are illegal inside a function body.
//! The wrapper adds exactly one line above the snippet; [`WrapMode`] carries
//! that offset so diagnostics map back to the original lines.

use crate::exports::ResolutionError;
use crate::extract::CodeBlock;
use crate::localize::ImportLocalizer;
use regex::Regex;
use std::sync::LazyLock;

const WRAPPER_OPEN: &str = "(async () => {\n";
const WRAPPER_CLOSE: &str = "})();\n";

static MODULE_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*(?:import[\s{*'"]|export[\s{*]|declare\s|namespace\s|module\s|///\s*<reference)"#,
    )
    .expect("module syntax pattern is valid")
});

/// How a snippet was prepared for compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Compiled as written
    Module,
    /// Wrapped in an isolating function
    Isolated,
}

impl WrapMode {
    /// Lines inserted above the original first line.
    pub fn line_offset(self) -> usize {
        match self {
            WrapMode::Module => 0,
            WrapMode::Isolated => 1,
        }
    }
}

/// Whether the source has syntax that must stay at module level.
pub fn has_module_syntax(source: &str) -> bool {
    MODULE_SYNTAX.is_match(source)
}

/// Wrap `source` when allowed and safe.
pub fn wrap(source: &str, enabled: bool) -> (String, WrapMode) {
    if !enabled || has_module_syntax(source) {
        return (source.to_string(), WrapMode::Module);
    }

    let mut wrapped = String::with_capacity(source.len() + WRAPPER_OPEN.len() + WRAPPER_CLOSE.len() + 1);
    wrapped.push_str(WRAPPER_OPEN);
    wrapped.push_str(source);
    if !source.ends_with('\n') {
        wrapped.push('\n');
    }
    wrapped.push_str(WRAPPER_CLOSE);
    (wrapped, WrapMode::Isolated)
}

/// A code block ready for compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedSnippet {
    /// The block as extracted
    pub block: CodeBlock,
    /// Text submitted to the compiler
    pub transformed: String,
    /// Wrapping applied to `transformed`
    pub wrap: WrapMode,
}

impl SanitizedSnippet {
    /// Localize imports, then wrap.
    pub fn new(
        block: CodeBlock,
        localizer: &ImportLocalizer,
        wrap_enabled: bool,
    ) -> Result<Self, ResolutionError> {
        let localized = localizer.localize(&block.source)?;
        let (transformed, wrap) = wrap(&localized, wrap_enabled);
        Ok(Self {
            block,
            transformed,
            wrap,
        })
    }

    /// Number of lines in the original snippet, at least 1.
    pub fn original_line_count(&self) -> usize {
        self.block.source.lines().count().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_syntax_detection() {
        assert!(has_module_syntax("import { a } from 'a'\n"));
        assert!(has_module_syntax("import type { A } from 'a'"));
        assert!(has_module_syntax("import 'polyfill'"));
        assert!(has_module_syntax("const a = 1\nexport { a }"));
        assert!(has_module_syntax("export default 42"));
        assert!(has_module_syntax("  declare const x: number"));
        assert!(has_module_syntax("namespace N {}"));
        assert!(has_module_syntax("/// <reference types=\"node\" />"));

        assert!(!has_module_syntax("const m = await import('a')"));
        assert!(!has_module_syntax("module.exports = {}"));
        assert!(!has_module_syntax("const exported = 1"));
        assert!(!has_module_syntax("// import later\nconst a = 1"));
    }

    #[test]
    fn test_wrap_script() {
        let (text, mode) = wrap("const a = 1;\n", true);
        assert_eq!(mode, WrapMode::Isolated);
        assert_eq!(text, "(async () => {\nconst a = 1;\n})();\n");
    }

    #[test]
    fn test_wrap_without_trailing_newline() {
        let (text, _) = wrap("const a = 1;", true);
        assert_eq!(text, "(async () => {\nconst a = 1;\n})();\n");
    }

    #[test]
    fn test_module_left_unwrapped() {
        let source = "import { a } from 'a'\nconsole.log(a)\n";
        let (text, mode) = wrap(source, true);
        assert_eq!(mode, WrapMode::Module);
        assert_eq!(text, source);
    }

    #[test]
    fn test_wrap_disabled() {
        let (text, mode) = wrap("const a = 1;\n", false);
        assert_eq!(mode, WrapMode::Module);
        assert_eq!(text, "const a = 1;\n");
    }

    #[test]
    fn test_line_offset_matches_wrapper() {
        let (text, mode) = wrap("first\nsecond\n", true);
        let line_of_second = text.lines().position(|l| l == "second").unwrap() + 1;
        assert_eq!(line_of_second - mode.line_offset(), 2);
    }
}
