//! Snippet compilation pipeline.
//!
//! A run reads every documentation file first, so a missing file rejects
//! the run before anything is compiled. Blocks are then localized, wrapped
//! and submitted one by one to the [`Compiler`], either on the calling
//! thread or on a bounded pool of workers pulling from a shared queue.
//! Results always come back in (file, index) order.

use crate::compiler::{CompileOutcome, CompileRequest, Compiler};
use crate::config::{CompilerConfig, DEFAULT_FILES};
use crate::diagnostics::{map_diagnostics, map_generic, PathScrubber};
use crate::error::Result;
use crate::extract::extract_file;
use crate::localize::ImportLocalizer;
use crate::package::PackageDefinition;
use crate::tsc::TscCompiler;
use crate::workdir::WorkingDirectory;
use crate::wrap::SanitizedSnippet;
use crossbeam_deque::{Injector, Steal};
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a snippet failed to compile. Paths are already scrubbed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct CompilationError {
    /// Human-readable message naming the file and block
    pub message: String,
    /// Compiler diagnostic codes, in report order
    pub diagnostic_codes: Vec<u32>,
}

/// Outcome of one snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationResult {
    /// Documentation file
    pub file: PathBuf,
    /// 1-based block index within `file`
    pub index: usize,
    /// Snippet as written in the documentation
    pub snippet: String,
    /// Ascending 1-based lines of `snippet` with errors
    pub lines_with_errors: Vec<usize>,
    /// Present when compilation failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CompilationError>,
}

impl CompilationResult {
    /// Whether the snippet compiled cleanly.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum parallel compilations; 1 compiles on the calling thread
    pub jobs: usize,
    /// Wrap script snippets in an isolating function
    pub wrap: bool,
    /// Parent of the per-run working directory (default: package root)
    pub work_root: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: num_cpus::get(),
            wrap: true,
            work_root: None,
        }
    }
}

/// Compiles the TypeScript snippets of a package's documentation.
pub struct SnippetCompiler<C> {
    package: PackageDefinition,
    compiler: C,
    config: CompilerConfig,
    options: RunOptions,
}

impl SnippetCompiler<TscCompiler> {
    /// Pipeline backed by the TypeScript compiler.
    pub fn with_tsc(package: PackageDefinition, config: CompilerConfig) -> Self {
        let compiler = TscCompiler::new(&package.package_root);
        Self::new(package, compiler, config)
    }
}

impl<C: Compiler> SnippetCompiler<C> {
    /// Create a pipeline with default run options.
    pub fn new(package: PackageDefinition, compiler: C, config: CompilerConfig) -> Self {
        Self {
            package,
            compiler,
            config,
            options: RunOptions::default(),
        }
    }

    /// Replace the run options.
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Package being documented.
    pub fn package(&self) -> &PackageDefinition {
        &self.package
    }

    /// The package's default documentation files.
    pub fn default_files(&self) -> Vec<PathBuf> {
        DEFAULT_FILES
            .iter()
            .map(|file| self.package.package_root.join(file))
            .collect()
    }

    /// Compile the package's default documentation files.
    pub fn run_default(&self) -> Result<Vec<CompilationResult>> {
        self.run(&self.default_files())
    }

    /// Compile every snippet of `files`.
    ///
    /// Rejects the run when a file cannot be read or a self-import cannot
    /// be resolved. Compilation failures are reported per snippet.
    pub fn run(&self, files: &[PathBuf]) -> Result<Vec<CompilationResult>> {
        let mut blocks = Vec::new();
        for file in files {
            blocks.extend(extract_file(file)?);
        }
        if blocks.is_empty() {
            debug!(files = files.len(), "no snippets found");
            return Ok(Vec::new());
        }

        let localizer = ImportLocalizer::new(&self.package)?;
        let snippets = blocks
            .into_iter()
            .map(|block| SanitizedSnippet::new(block, &localizer, self.options.wrap))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let work_root = self
            .options
            .work_root
            .as_deref()
            .unwrap_or(self.package.package_root.as_path());
        let workdir = WorkingDirectory::create(work_root)?;

        let jobs = self.options.jobs.clamp(1, snippets.len());
        info!(snippets = snippets.len(), jobs, "compiling snippets");

        let results = if jobs == 1 {
            snippets
                .iter()
                .map(|snippet| self.compile_snippet(&workdir, snippet))
                .collect()
        } else {
            self.compile_parallel(&workdir, &snippets, jobs)
        };

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(total = results.len(), failed, "compilation finished");

        if let Err(e) = workdir.close() {
            warn!(error = %e, "failed to remove working directory");
        }
        Ok(results)
    }

    fn compile_parallel(
        &self,
        workdir: &WorkingDirectory,
        snippets: &[SanitizedSnippet],
        jobs: usize,
    ) -> Vec<CompilationResult> {
        let injector = Injector::new();
        for (slot, snippet) in snippets.iter().enumerate() {
            injector.push((slot, snippet));
        }
        let slots: Vec<Mutex<Option<CompilationResult>>> =
            snippets.iter().map(|_| Mutex::new(None)).collect();

        std::thread::scope(|scope| {
            for _ in 0..jobs {
                scope.spawn(|| {
                    while let Some((slot, snippet)) = next_job(&injector) {
                        *slots[slot].lock() = Some(self.compile_snippet(workdir, snippet));
                    }
                });
            }
        });

        // Workers drain the queue before the scope joins them, and compiler
        // panics are caught per snippet, so every slot is filled here.
        slots.into_iter().filter_map(Mutex::into_inner).collect()
    }

    fn compile_snippet(
        &self,
        workdir: &WorkingDirectory,
        snippet: &SanitizedSnippet,
    ) -> CompilationResult {
        let file = workdir.snippet_path(snippet.block.dialect);
        let scrubber = PathScrubber::new(&file, &snippet.block);

        let outcome = match std::fs::write(&file, &snippet.transformed) {
            Ok(()) => self.submit(&file, snippet),
            Err(e) => CompileOutcome::Generic(format!("Failed to write {}: {}", file.display(), e)),
        };

        build_result(snippet, outcome, &scrubber)
    }

    fn submit(&self, file: &Path, snippet: &SanitizedSnippet) -> CompileOutcome {
        let request = CompileRequest {
            source: &snippet.transformed,
            file,
            dialect: snippet.block.dialect,
            config: &self.config,
        };
        debug!(
            doc = %snippet.block.file.display(),
            index = snippet.block.index,
            wrap = ?snippet.wrap,
            "compiling snippet"
        );

        panic::catch_unwind(AssertUnwindSafe(|| self.compiler.compile(&request)))
            .unwrap_or_else(|payload| CompileOutcome::Generic(panic_message(payload.as_ref())))
    }
}

fn next_job<T>(injector: &Injector<T>) -> Option<T> {
    loop {
        match injector.steal() {
            Steal::Success(job) => return Some(job),
            Steal::Empty => return None,
            Steal::Retry => continue,
        }
    }
}

fn build_result(
    snippet: &SanitizedSnippet,
    outcome: CompileOutcome,
    scrubber: &PathScrubber,
) -> CompilationResult {
    let (lines_with_errors, error) = match outcome {
        CompileOutcome::Success => (Vec::new(), None),
        CompileOutcome::Diagnostics(diagnostics) => {
            let mapped = map_diagnostics(&diagnostics, snippet, scrubber);
            let error = CompilationError {
                message: mapped.message,
                diagnostic_codes: mapped.codes,
            };
            (mapped.lines, Some(error))
        }
        CompileOutcome::Generic(message) => {
            let error = CompilationError {
                message: map_generic(&message, scrubber),
                diagnostic_codes: Vec::new(),
            };
            (Vec::new(), Some(error))
        }
    };

    CompilationResult {
        file: snippet.block.file.clone(),
        index: snippet.block.index,
        snippet: snippet.block.source.clone(),
        lines_with_errors,
        error,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("compiler panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("compiler panicked: {}", message)
    } else {
        "compiler panicked".to_string()
    }
}
