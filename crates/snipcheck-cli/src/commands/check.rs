//! Compile the documentation snippets and report the result.

use super::files;
use crate::output::{self, Badge, StyledOutput};
use snipcheck::{CompilationResult, PackageDefinition, RunOptions, Settings, SnippetCompiler};
use std::path::{Path, PathBuf};
use termcolor::WriteColor;
use tracing::debug;

/// Arguments for a check run.
pub struct CheckArgs {
    pub input_files: Vec<String>,
    pub project: Option<PathBuf>,
    pub tsc: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub no_wrap: bool,
    pub reporter: String,
    pub color: String,
}

pub fn execute(args: CheckArgs) -> anyhow::Result<()> {
    let color_choice = output::resolve_color_choice(Some(&args.color));
    let mut out = StyledOutput::stdout(color_choice);
    let json = args.reporter == "json";

    let cwd = std::env::current_dir()?;
    let package = PackageDefinition::discover(&cwd)?;
    let settings = Settings::load(&package.package_root)?;
    debug!(package = %package.name, root = %package.package_root.display(), "loaded package");

    let mut config = settings.compiler_config()?;
    if args.project.is_some() {
        config.project = args.project;
    }
    if args.tsc.is_some() {
        config.tsc = args.tsc;
    }

    // Command-line files are relative to the working directory, configured
    // ones to the package root.
    let input_files = if args.input_files.is_empty() {
        let base = package
            .package_root
            .strip_prefix(&cwd)
            .unwrap_or(package.package_root.as_path())
            .to_path_buf();
        files::expand_input_files(&settings.files_or_default(), &base)?
    } else {
        files::expand_input_files(&args.input_files, Path::new(""))?
    };

    let defaults = RunOptions::default();
    let options = RunOptions {
        jobs: args.jobs.or(settings.jobs).unwrap_or(defaults.jobs),
        wrap: !args.no_wrap && settings.wrap.unwrap_or(defaults.wrap),
        work_root: None,
    };

    if !json {
        out.status(
            Badge::Info,
            &format!(
                "Compiling documentation TypeScript code snippets from {}",
                display_list(&input_files)
            ),
        );
        out.flush();
    }

    let pipeline = SnippetCompiler::with_tsc(package, config).with_options(options);
    let results = pipeline.run(&input_files)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_report(&mut out, &results);
    }

    if results.iter().any(|r| !r.is_ok()) {
        std::process::exit(1);
    }

    Ok(())
}

// ── Pretty Reporter ──────────────────────────────────────────────────────

fn print_report<W: WriteColor>(out: &mut StyledOutput<W>, results: &[CompilationResult]) {
    out.status(Badge::Info, &format!("Found {} TypeScript snippets", results.len()));

    let mut failed = false;
    for result in results {
        let Some(error) = &result.error else {
            continue;
        };
        failed = true;

        out.status(
            Badge::Fail,
            &format!(
                "Error compiling example code block {} in file {}:",
                result.index,
                result.file.display()
            ),
        );
        out.line(&indent_message(&error.message));
        out.blank();
        out.heading(" Original code:");
        for (line, faulty) in numbered_lines(&result.snippet, &result.lines_with_errors) {
            out.code_line(&line, faulty);
        }
    }

    if failed {
        out.status(Badge::Fail, "Compilation failed, see above errors");
    } else {
        out.status(Badge::Pass, "All snippets compiled OK");
    }
    out.flush();
}

fn display_list(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|f| f.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Indent an error message under its heading.
fn indent_message(message: &str) -> String {
    format!("  {}", message.lines().collect::<Vec<_>>().join("\n      "))
}

/// Snippet lines prefixed with their number, flagged when they have errors.
fn numbered_lines(snippet: &str, lines_with_errors: &[usize]) -> Vec<(String, bool)> {
    snippet
        .lines()
        .enumerate()
        .map(|(index, line)| {
            let number = index + 1;
            (
                format!("{:>2}| {}", number, line),
                lines_with_errors.contains(&number),
            )
        })
        .collect()
}
