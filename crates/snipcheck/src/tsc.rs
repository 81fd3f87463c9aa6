//! `tsc`-backed compiler.
//!
//! Every snippet gets its own project file next to it
//! (`block-<id>.tsconfig.json`) that extends the package's tsconfig and
//! lists only that snippet. `tsc` runs once per snippet, so submissions
//! share no state and may run in parallel.
//!
//! `rootDir` is pinned to a directory holding both the package and the
//! snippet. An inherited `"rootDir": "src"` would fail every snippet with
//! TS6059.

use crate::compiler::{CompileOutcome, CompileRequest, Compiler, Diagnostic};
use crate::workdir::config_path_for;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::debug;

static LOCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+?)\((?P<line>\d+),(?P<col>\d+)\): (?P<text>(?:error|warning) TS(?P<code>\d+): .*)$")
        .expect("located diagnostic pattern is valid")
});

static GLOBAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<text>(?:error|warning) TS(?P<code>\d+): .*)$")
        .expect("global diagnostic pattern is valid")
});

/// Compiles snippets by running the TypeScript compiler.
#[derive(Debug, Clone)]
pub struct TscCompiler {
    package_root: PathBuf,
}

impl TscCompiler {
    /// Compiler running in `package_root`.
    pub fn new(package_root: impl Into<PathBuf>) -> Self {
        Self {
            package_root: package_root.into(),
        }
    }

    fn write_project(&self, config_path: &Path, request: &CompileRequest<'_>) -> std::io::Result<()> {
        let mut options = request.config.effective_options();
        let base = request.config.project_path(&self.package_root);

        let mut project = Map::new();
        if base.is_file() {
            project.insert("extends".into(), Value::String(base.display().to_string()));
        } else if request.dialect.is_jsx() && !options.contains_key("jsx") {
            options.insert("jsx".into(), Value::String("preserve".into()));
        }
        let snippet_dir = request.file.parent().unwrap_or(Path::new(""));
        let root_dir = common_ancestor(&self.package_root, snippet_dir);
        options.insert("rootDir".into(), Value::String(root_dir.display().to_string()));
        project.insert("compilerOptions".into(), Value::Object(options));
        project.insert("files".into(), json!([request.file.display().to_string()]));
        project.insert("include".into(), json!([]));

        let content = serde_json::to_string_pretty(&Value::Object(project))?;
        std::fs::write(config_path, content)
    }
}

impl Compiler for TscCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> CompileOutcome {
        let config_path = config_path_for(request.file);
        if let Err(e) = self.write_project(&config_path, request) {
            return CompileOutcome::Generic(format!(
                "Failed to write {}: {}",
                config_path.display(),
                e
            ));
        }

        let tsc = request.config.tsc_command(&self.package_root);
        debug!(tsc = %tsc.display(), project = %config_path.display(), "running compiler");

        let output = match Command::new(&tsc)
            .arg("-p")
            .arg(&config_path)
            .arg("--pretty")
            .arg("false")
            .current_dir(&self.package_root)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                return CompileOutcome::Generic(format!("Failed to run {}: {}", tsc.display(), e))
            }
        };

        if output.status.success() {
            return CompileOutcome::Success;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = parse_output(&stdout, request.file, request.source);
        if diagnostics.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return CompileOutcome::Generic(format!(
                "{} exited with {}\n{}{}",
                tsc.display(),
                output.status,
                stdout.trim_end(),
                stderr.trim_end()
            ));
        }

        CompileOutcome::Diagnostics(diagnostics)
    }
}

/// Parse `tsc --pretty false` output.
///
/// Diagnostics located in `snippet_file` get a byte offset into `source`;
/// diagnostics in other files keep their location in the text.
pub fn parse_output(stdout: &str, snippet_file: &Path, source: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    for line in stdout.lines() {
        if let Some(caps) = LOCATED.captures(line) {
            let code = caps["code"].parse().ok();
            if is_same_file(&caps["file"], snippet_file) {
                let line_no = caps["line"].parse().unwrap_or(1);
                let col = caps["col"].parse().unwrap_or(1);
                let offset = line_col_to_offset(source, line_no, col);
                diagnostics.push(Diagnostic::at(offset, code, &caps["text"]));
            } else {
                diagnostics.push(Diagnostic::global(code, line));
            }
        } else if let Some(caps) = GLOBAL.captures(line) {
            diagnostics.push(Diagnostic::global(caps["code"].parse().ok(), &caps["text"]));
        } else if line.starts_with(char::is_whitespace) && !line.trim().is_empty() {
            // Continuation of the previous message
            if let Some(last) = diagnostics.last_mut() {
                last.text.push('\n');
                last.text.push_str(line.trim_end());
            }
        }
    }

    diagnostics
}

/// Deepest directory containing both paths.
fn common_ancestor(a: &Path, b: &Path) -> PathBuf {
    let shared: PathBuf = a
        .components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect();
    if !shared.as_os_str().is_empty() {
        shared
    } else if a.is_absolute() {
        PathBuf::from(Component::RootDir.as_os_str())
    } else {
        PathBuf::from(Component::CurDir.as_os_str())
    }
}

/// Snippet file names are unique within a run, so the name is enough.
fn is_same_file(reported: &str, snippet_file: &Path) -> bool {
    Path::new(reported.trim()).file_name() == snippet_file.file_name()
}

/// Byte offset of a 1-based line and column.
pub fn line_col_to_offset(source: &str, line: usize, col: usize) -> usize {
    let mut start = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let within = text
                .char_indices()
                .nth(col.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            return start + within;
        }
        start += text.len();
    }
    source.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "(async () => {\nconst a: number = 'x';\n})();\n";

    #[test]
    fn test_line_col_to_offset() {
        assert_eq!(line_col_to_offset(SOURCE, 1, 1), 0);
        assert_eq!(line_col_to_offset(SOURCE, 2, 1), 15);
        assert_eq!(line_col_to_offset(SOURCE, 2, 7), 21);
        assert_eq!(line_col_to_offset(SOURCE, 99, 1), SOURCE.len());
        assert_eq!(line_col_to_offset("é\nb", 1, 2), 2);
    }

    #[test]
    fn test_parse_located_diagnostic() {
        let stdout = "compiled-docs-x1/block-4.ts(2,7): error TS2322: Type 'string' is not assignable to type 'number'.\n";
        let diagnostics = parse_output(stdout, Path::new("/pkg/compiled-docs-x1/block-4.ts"), SOURCE);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::at(
                21,
                Some(2322),
                "error TS2322: Type 'string' is not assignable to type 'number'."
            )]
        );
    }

    #[test]
    fn test_parse_continuation_lines() {
        let stdout = "/abs/block-4.ts(2,1): error TS2345: Argument of type 'X' is not assignable.\n  Property 'a' is missing in type 'X'.\n";
        let diagnostics = parse_output(stdout, Path::new("/abs/block-4.ts"), SOURCE);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].text.ends_with("\n  Property 'a' is missing in type 'X'."));
    }

    #[test]
    fn test_parse_foreign_and_global_diagnostics() {
        let stdout = "src/index.ts(10,3): error TS2304: Cannot find name 'foo'.\nerror TS5023: Unknown compiler option 'bogus'.\nFound 2 errors.\n";
        let diagnostics = parse_output(stdout, Path::new("/pkg/w/block-1.ts"), SOURCE);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].offset, None);
        assert_eq!(diagnostics[0].code, Some(2304));
        assert!(diagnostics[0].text.starts_with("src/index.ts(10,3)"));
        assert_eq!(
            diagnostics[1],
            Diagnostic::global(Some(5023), "error TS5023: Unknown compiler option 'bogus'.")
        );
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_output("", Path::new("/pkg/block-1.ts"), SOURCE).is_empty());
    }

    #[test]
    fn test_write_project_without_base_tsconfig() {
        use crate::config::CompilerConfig;
        use crate::extract::Dialect;

        let temp = tempfile::tempdir().unwrap();
        let compiler = TscCompiler::new(temp.path());
        let snippet = temp.path().join("block-1.tsx");
        let config = CompilerConfig::default();
        let request = CompileRequest {
            source: "const el = <div />;\n",
            file: &snippet,
            dialect: Dialect::Tsx,
            config: &config,
        };

        let project_path = config_path_for(&snippet);
        compiler.write_project(&project_path, &request).unwrap();

        let project: Value =
            serde_json::from_str(&std::fs::read_to_string(&project_path).unwrap()).unwrap();
        assert!(project.get("extends").is_none());
        assert_eq!(project["compilerOptions"]["jsx"], json!("preserve"));
        assert_eq!(project["compilerOptions"]["noEmit"], json!(true));
        assert_eq!(project["files"], json!([snippet.display().to_string()]));
        assert_eq!(project["include"], json!([]));
    }

    #[test]
    fn test_write_project_extends_base_tsconfig() {
        use crate::config::CompilerConfig;
        use crate::extract::Dialect;

        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("tsconfig.json"), "{}").unwrap();
        let compiler = TscCompiler::new(temp.path());
        let snippet = temp.path().join("block-2.ts");
        let config = CompilerConfig::default();
        let request = CompileRequest {
            source: "const a = 1;\n",
            file: &snippet,
            dialect: Dialect::Ts,
            config: &config,
        };

        let project_path = config_path_for(&snippet);
        compiler.write_project(&project_path, &request).unwrap();

        let project: Value =
            serde_json::from_str(&std::fs::read_to_string(&project_path).unwrap()).unwrap();
        assert_eq!(
            project["extends"],
            json!(temp.path().join("tsconfig.json").display().to_string())
        );
    }

    #[test]
    fn test_write_project_overrides_root_dir() {
        use crate::config::CompilerConfig;
        use crate::extract::Dialect;

        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("tsconfig.json"),
            r#"{ "compilerOptions": { "rootDir": "src", "outDir": "dist" } }"#,
        )
        .unwrap();
        let work = temp.path().join("compiled-docs-x");
        std::fs::create_dir(&work).unwrap();
        let compiler = TscCompiler::new(temp.path());
        let snippet = work.join("block-1.ts");
        let mut config = CompilerConfig::default();
        config.compiler_options.insert("rootDir".into(), json!("lib"));
        let request = CompileRequest {
            source: "const a = 1;\n",
            file: &snippet,
            dialect: Dialect::Ts,
            config: &config,
        };

        let project_path = config_path_for(&snippet);
        compiler.write_project(&project_path, &request).unwrap();

        let project: Value =
            serde_json::from_str(&std::fs::read_to_string(&project_path).unwrap()).unwrap();
        assert_eq!(
            project["compilerOptions"]["rootDir"],
            json!(temp.path().display().to_string())
        );
    }

    #[test]
    fn test_common_ancestor() {
        assert_eq!(
            common_ancestor(Path::new("/pkg"), Path::new("/pkg/compiled-docs-x")),
            PathBuf::from("/pkg")
        );
        assert_eq!(
            common_ancestor(Path::new("/home/u/pkg"), Path::new("/home/u/work/compiled-docs-x")),
            PathBuf::from("/home/u")
        );
        assert_eq!(common_ancestor(Path::new("/pkg"), Path::new("/tmp/w")), PathBuf::from("/"));
    }
}
