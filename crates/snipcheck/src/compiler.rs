//! Compiler capability consumed by the orchestrator.
//!
//! snipcheck does not type-check anything itself. A [`Compiler`] receives the
//! transformed snippet, the path it was written to, and the configured
//! options, and answers with a tagged [`CompileOutcome`].

use crate::config::CompilerConfig;
use crate::extract::Dialect;
use std::path::Path;

/// A single snippet submission.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Text to compile
    pub source: &'a str,
    /// Ephemeral file the text was written to
    pub file: &'a Path,
    /// Dialect of the originating block
    pub dialect: Dialect,
    /// Options forwarded from configuration
    pub config: &'a CompilerConfig,
}

/// A compiler-reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Byte offset into the submitted text, when the problem is located in it
    pub offset: Option<usize>,
    /// Numeric diagnostic code (`2322` for `TS2322`)
    pub code: Option<u32>,
    /// Message, e.g. `error TS2322: Type 'string' is not assignable ...`
    pub text: String,
}

impl Diagnostic {
    /// Diagnostic anchored in the submitted text.
    pub fn at(offset: usize, code: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            offset: Some(offset),
            code,
            text: text.into(),
        }
    }

    /// Diagnostic without a position in the submitted text.
    pub fn global(code: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            offset: None,
            code,
            text: text.into(),
        }
    }
}

/// Result of one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// No diagnostics
    Success,
    /// Positioned diagnostics
    Diagnostics(Vec<Diagnostic>),
    /// Failure without structured diagnostics (crash, missing tool, ...)
    Generic(String),
}

/// Something that can compile a snippet.
///
/// Implementations are shared across worker threads; every call must be
/// independent of the others.
pub trait Compiler: Send + Sync {
    /// Compile one snippet.
    fn compile(&self, request: &CompileRequest<'_>) -> CompileOutcome;
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn compile(&self, request: &CompileRequest<'_>) -> CompileOutcome {
        (**self).compile(request)
    }
}

impl<C: Compiler + ?Sized> Compiler for Box<C> {
    fn compile(&self, request: &CompileRequest<'_>) -> CompileOutcome {
        (**self).compile(request)
    }
}
