//! Self-import localization.
//!
//! Rewrites module specifiers naming the package itself so that a snippet
//! compiles against the local sources instead of a published copy:
//!
//! ```text
//! import { parse } from "my-package/parser";
//! // becomes
//! import { parse } from "/work/my-package/src/parser";
//! ```
//!
//! Handled forms: `from "<spec>"`, `import "<spec>"`, `import("<spec>")` and
//! `require("<spec>")`. Everything outside the quoted specifier is kept as
//! is, including the quote style and any trailing code.

use crate::exports::{ExportResolver, ResolutionError};
use crate::package::PackageDefinition;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

/// Rewrites imports of one package to local paths.
#[derive(Debug, Clone)]
pub struct ImportLocalizer {
    resolver: ExportResolver,
    package_root: PathBuf,
    pattern: Regex,
}

impl ImportLocalizer {
    /// Create a localizer for a package definition.
    pub fn new(package: &PackageDefinition) -> Result<Self, ResolutionError> {
        let resolver = ExportResolver::for_package(package)?;
        Ok(Self::with_resolver(resolver, &package.package_root))
    }

    /// Create a localizer from an existing resolver.
    pub fn with_resolver(resolver: ExportResolver, package_root: &Path) -> Self {
        let pattern = specifier_pattern(resolver.package_name());
        Self {
            resolver,
            package_root: package_root.to_path_buf(),
            pattern,
        }
    }

    /// Rewrite every self-import in `source`.
    ///
    /// Fails on the first self-import that cannot be resolved.
    pub fn localize(&self, source: &str) -> Result<String, ResolutionError> {
        let mut output = String::with_capacity(source.len());
        let mut last = 0;

        for caps in self.pattern.captures_iter(source) {
            // The regex crate has no backreferences; mismatched quotes are
            // filtered here.
            if caps["open"] != caps["close"] {
                continue;
            }
            let Some(specifier) = caps.name("spec") else {
                continue;
            };

            output.push_str(&source[last..specifier.start()]);
            output.push_str(&self.local_path(&caps)?);
            last = specifier.end();
        }

        output.push_str(&source[last..]);
        Ok(output)
    }

    fn local_path(&self, caps: &Captures<'_>) -> Result<String, ResolutionError> {
        let subpath = caps.name("subpath").map(|m| m.as_str());
        let resolved = self.resolver.resolve(subpath)?;
        let full = self.package_root.join(resolved);
        Ok(full.to_string_lossy().replace('\\', "\\\\"))
    }
}

/// Build the specifier pattern for a package name.
///
/// The name is matched literally and must be followed by either the closing
/// quote or a `/`, so `lib` never matches inside `@lib/lib` or `lib-extra`.
fn specifier_pattern(package_name: &str) -> Regex {
    let pattern = format!(
        r#"(?:\bfrom\s*|\bimport\s*\(?\s*|\brequire\s*\(\s*)(?P<open>['"])(?P<spec>{}(?P<subpath>/[^'"\s]+)?)(?P<close>['"])"#,
        regex::escape(package_name)
    );
    Regex::new(&pattern).expect("escaped package name yields a valid pattern")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::ExportTarget;

    fn localizer(name: &str) -> ImportLocalizer {
        let package = PackageDefinition {
            name: name.to_string(),
            main: Some("index.ts".to_string()),
            package_root: PathBuf::from("/path/to/package"),
            exports: None,
        };
        ImportLocalizer::new(&package).unwrap()
    }

    fn localizer_with_exports(exports: ExportTarget) -> ImportLocalizer {
        let package = PackageDefinition {
            name: "awesome".to_string(),
            main: None,
            package_root: PathBuf::from("/path/to/package"),
            exports: Some(exports),
        };
        ImportLocalizer::new(&package).unwrap()
    }

    #[test]
    fn test_single_quotes() {
        let out = localizer("awesome").localize("import something from 'awesome'").unwrap();
        assert_eq!(out, "import something from '/path/to/package/index'");
    }

    #[test]
    fn test_double_quotes_and_semicolon() {
        let out = localizer("awesome")
            .localize("import something from \"awesome\"; console.log(something)")
            .unwrap();
        assert_eq!(
            out,
            "import something from \"/path/to/package/index\"; console.log(something)"
        );
    }

    #[test]
    fn test_trailing_whitespace_preserved() {
        let out = localizer("awesome").localize("import a from 'awesome'   \n").unwrap();
        assert_eq!(out, "import a from '/path/to/package/index'   \n");
    }

    #[test]
    fn test_other_packages_untouched() {
        let code = "import * as other from \"package\"\n\nconsole.log('Should not be mutated')";
        assert_eq!(localizer("my-package").localize(code).unwrap(), code);
    }

    #[test]
    fn test_lexical_neighbours_untouched() {
        let code = "import a from 'awesome-extra'\nimport b from '@awesome/awesome'\nimport c from 'not-awesome'\nimport d from 'awesomer/x'";
        assert_eq!(localizer("awesome").localize(code).unwrap(), code);
    }

    #[test]
    fn test_plain_strings_untouched() {
        let code = "const name = 'awesome'\nconsole.log(\"awesome\")";
        assert_eq!(localizer("awesome").localize(code).unwrap(), code);
    }

    #[test]
    fn test_scoped_package() {
        let out = localizer("@my-scope/awesome")
            .localize("import something from '@my-scope/awesome'")
            .unwrap();
        assert_eq!(out, "import something from '/path/to/package/index'");
    }

    #[test]
    fn test_regex_characters_in_name() {
        let code = "import a from 'a.b'\nimport c from 'axb'";
        let out = localizer("a.b").localize(code).unwrap();
        assert_eq!(out, "import a from '/path/to/package/index'\nimport c from 'axb'");
    }

    #[test]
    fn test_overlapping_library_and_path_names() {
        let resolver = ExportResolver::new(
            "lib",
            None,
            Some(ExportTarget::map([("./*", ExportTarget::path("./*.ts"))])),
        )
        .unwrap();
        let out = ImportLocalizer::with_resolver(resolver, Path::new("/path/to/package"))
            .localize("import lib from 'lib/lib/lib'")
            .unwrap();
        assert_eq!(out, "import lib from '/path/to/package/lib/lib'");
    }

    #[test]
    fn test_overlapping_scope_and_path_names() {
        let resolver = ExportResolver::new(
            "@lib/lib",
            None,
            Some(ExportTarget::map([("./*", ExportTarget::path("./*.ts"))])),
        )
        .unwrap();
        let out = ImportLocalizer::with_resolver(resolver, Path::new("/path/to/package"))
            .localize("import lib from '@lib/lib/lib/lib'")
            .unwrap();
        assert_eq!(out, "import lib from '/path/to/package/lib/lib'");
    }

    #[test]
    fn test_subpath_through_exports() {
        let localizer = localizer_with_exports(ExportTarget::map([
            (".", ExportTarget::path("./src/index.ts")),
            ("./features/*", ExportTarget::path("./src/features/*.ts")),
        ]));
        let code = "import { a } from 'awesome'\nimport { b } from 'awesome/features/b'\n";
        assert_eq!(
            localizer.localize(code).unwrap(),
            "import { a } from '/path/to/package/src/index'\nimport { b } from '/path/to/package/src/features/b'\n"
        );
    }

    #[test]
    fn test_multiline_import_and_other_forms() {
        let code = "import {\n  a,\n} from 'awesome'\nimport 'awesome'\nconst m = await import('awesome')\nconst r = require(\"awesome\")\nexport * from 'awesome'";
        let out = localizer("awesome").localize(code).unwrap();
        assert_eq!(
            out,
            "import {\n  a,\n} from '/path/to/package/index'\nimport '/path/to/package/index'\nconst m = await import('/path/to/package/index')\nconst r = require(\"/path/to/package/index\")\nexport * from '/path/to/package/index'"
        );
    }

    #[test]
    fn test_mismatched_quotes_untouched() {
        let code = "import a from 'awesome\"";
        assert_eq!(localizer("awesome").localize(code).unwrap(), code);
    }

    #[test]
    fn test_unresolvable_subpath() {
        let err = localizer("awesome")
            .localize("import x from 'awesome/missing'")
            .unwrap_err();
        assert_eq!(err, ResolutionError::Unresolved("awesome/missing".into()));
    }
}
