//! Language detection, line counts and a handful of risky-pattern checks.
//!
//! This is the analyzer the `codepulse` binary runs by default. It reads the
//! whole file, detects the language from the extension, counts lines and a
//! few language constructs with regexes, and flags obviously risky code
//! (`eval(`, `exec(`, hardcoded passwords) as well as oversized files.
//!
//! The output never mentions the file's path: identical content produces an
//! identical document, which is what lets the content cache share it.
//!
//! Output shape:
//!
//! ```json
//! {
//!   "language": "Python", "extension": ".py",
//!   "total_lines": 3, "code_lines": 2, "size": 42,
//!   "constructs": { "functions": 1, "classes": 0, "imports": 0 },
//!   "security_issues": [], "quality_issues": [], "issue_count": 0
//! }
//! ```

use super::Analyzer;
use anyhow::{Context, Result};
use content_inspector::ContentType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::borrow::Cow;
use std::path::Path;

/// Files with more non-blank lines than this get a quality issue
pub const LARGE_FILE_LINES: usize = 500;

/// Files with more bytes than this get a quality issue
pub const LARGE_FILE_BYTES: usize = 10_000;

/// Extension (lowercase, with dot) → display language
const LANGUAGES: &[(&str, &str)] = &[
    (".py", "Python"),
    (".pyw", "Python"),
    (".js", "JavaScript"),
    (".jsx", "JavaScript"),
    (".mjs", "JavaScript"),
    (".ts", "TypeScript"),
    (".tsx", "TypeScript"),
    (".java", "Java"),
    (".cpp", "C++"),
    (".cc", "C++"),
    (".cxx", "C++"),
    (".hpp", "C++"),
    (".h", "C/C++"),
    (".c", "C"),
    (".go", "Go"),
    (".rs", "Rust"),
    (".rb", "Ruby"),
    (".php", "PHP"),
    (".swift", "Swift"),
    (".kt", "Kotlin"),
    (".kts", "Kotlin"),
    (".cs", "C#"),
    (".scala", "Scala"),
    (".r", "R"),
    (".dart", "Dart"),
    (".lua", "Lua"),
    (".sh", "Shell"),
    (".bash", "Shell"),
    (".sql", "SQL"),
    (".html", "HTML"),
    (".htm", "HTML"),
    (".css", "CSS"),
    (".scss", "CSS"),
    (".sass", "CSS"),
    (".json", "JSON"),
    (".yaml", "YAML"),
    (".yml", "YAML"),
    (".xml", "XML"),
    (".md", "Markdown"),
];

/// A named construct counted with a regex
struct ConstructRule {
    /// Key in the `constructs` object
    name: &'static str,
    /// Pattern counted once per match
    regex: Regex,
}

/// Build a rule table from static patterns
fn rules(specs: &[(&'static str, &str)]) -> Vec<ConstructRule> {
    specs
        .iter()
        .filter_map(|&(name, pattern)| {
            Regex::new(pattern)
                .ok()
                .map(|regex| ConstructRule { name, regex })
        })
        .collect()
}

static PYTHON_RULES: Lazy<Vec<ConstructRule>> = Lazy::new(|| {
    rules(&[
        ("functions", r"(?m)^\s*(?:async\s+)?def\s+\w+"),
        ("classes", r"(?m)^\s*class\s+\w+"),
        ("imports", r"(?m)^\s*(?:import|from)\s+[\w.]+"),
    ])
});

static JS_RULES: Lazy<Vec<ConstructRule>> = Lazy::new(|| {
    rules(&[
        (
            "functions",
            r"\bfunction\s+\w+|\b\w+\s*=\s*(?:async\s+)?(?:function|\([^)]*\)\s*=>)",
        ),
        ("classes", r"\bclass\s+\w+"),
        ("imports", r"\bimport\s+.*?from|require\("),
    ])
});

static JAVA_RULES: Lazy<Vec<ConstructRule>> = Lazy::new(|| {
    rules(&[
        ("classes", r"\b(?:public|private|protected)?\s*class\s+\w+"),
        (
            "methods",
            r"\b(?:public|private|protected)\s+(?:static\s+)?[\w<>\[\]]+\s+\w+\s*\(",
        ),
        ("imports", r"\bimport\s+"),
    ])
});

static C_RULES: Lazy<Vec<ConstructRule>> = Lazy::new(|| {
    rules(&[
        ("functions", r"\b[\w:]+\s+\w+\s*\([^)]*\)\s*\{"),
        ("classes", r"\bclass\s+\w+"),
        ("includes", r#"#include\s*[<"]"#),
    ])
});

static GO_RULES: Lazy<Vec<ConstructRule>> = Lazy::new(|| {
    rules(&[
        ("functions", r"\bfunc\s+\w+"),
        ("structs", r"\btype\s+\w+\s+struct"),
        ("imports", r"\bimport\s+"),
    ])
});

static RUST_RULES: Lazy<Vec<ConstructRule>> = Lazy::new(|| {
    rules(&[
        ("functions", r"\bfn\s+\w+"),
        ("structs", r"\bstruct\s+\w+"),
        ("traits", r"\btrait\s+\w+"),
    ])
});

static HARDCODED_PASSWORD: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?i)password\s*=\s*["']"#).ok());

/// Default analyzer used by the CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMetricsAnalyzer;

impl FileMetricsAnalyzer {
    /// Create the analyzer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Display language for a lowercase dotted extension
    #[must_use]
    pub fn language_for(extension: &str) -> &'static str {
        LANGUAGES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map_or("Unknown", |&(_, lang)| lang)
    }

    /// Analyze already-loaded content
    #[must_use]
    pub fn analyze_bytes(path: &Path, bytes: &[u8]) -> Value {
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        if content_inspector::inspect(bytes) == ContentType::BINARY {
            return json!({
                "extension": extension,
                "binary": true,
                "size": bytes.len(),
            });
        }

        let code: Cow<'_, str> = match simdutf8::basic::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => String::from_utf8_lossy(bytes),
        };

        let total_lines = code.split('\n').count();
        let code_lines = code.lines().filter(|l| !l.trim().is_empty()).count();

        let mut constructs = Map::new();
        for rule in construct_rules(&extension) {
            constructs.insert(
                rule.name.to_string(),
                Value::from(rule.regex.find_iter(&code).count()),
            );
        }

        let mut security_issues = Vec::new();
        if code.contains("eval(") {
            security_issues.push("Use of eval() detected");
        }
        if HARDCODED_PASSWORD
            .as_ref()
            .is_some_and(|re| re.is_match(&code))
        {
            security_issues.push("Hardcoded password detected");
        }
        if code.contains("exec(") {
            security_issues.push("Use of exec() detected");
        }

        let mut quality_issues = Vec::new();
        if code_lines > LARGE_FILE_LINES {
            quality_issues.push("Large file (>500 lines)");
        }
        if code.len() > LARGE_FILE_BYTES {
            quality_issues.push("Large file size (>10KB)");
        }

        json!({
            "language": Self::language_for(&extension),
            "extension": extension,
            "total_lines": total_lines,
            "code_lines": code_lines,
            "size": code.len(),
            "constructs": constructs,
            "issue_count": security_issues.len() + quality_issues.len(),
            "security_issues": security_issues,
            "quality_issues": quality_issues,
        })
    }
}

impl Analyzer for FileMetricsAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Value> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::analyze_bytes(path, &bytes))
    }
}

/// Construct rules for an extension (empty for languages without rules)
fn construct_rules(extension: &str) -> &'static [ConstructRule] {
    match extension {
        ".py" | ".pyw" => PYTHON_RULES.as_slice(),
        ".js" | ".jsx" | ".mjs" | ".ts" | ".tsx" => JS_RULES.as_slice(),
        ".java" => JAVA_RULES.as_slice(),
        ".c" | ".cpp" | ".cc" | ".cxx" | ".h" | ".hpp" => C_RULES.as_slice(),
        ".go" => GO_RULES.as_slice(),
        ".rs" => RUST_RULES.as_slice(),
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_python_metrics() {
        let code = b"import os\n\nclass A:\n    def f(self):\n        pass\n\ndef g():\n    pass\n";
        let result = FileMetricsAnalyzer::analyze_bytes(Path::new("/p/mod.py"), code);

        assert_eq!(result["language"], "Python");
        assert_eq!(result["extension"], ".py");
        assert_eq!(result["code_lines"], 6);
        assert_eq!(result["constructs"]["functions"], 2);
        assert_eq!(result["constructs"]["classes"], 1);
        assert_eq!(result["constructs"]["imports"], 1);
        assert_eq!(result["issue_count"], 0);
    }

    #[test]
    fn test_rust_constructs() {
        let code = b"struct S;\ntrait T {}\nfn a() {}\npub fn b() {}\n";
        let result = FileMetricsAnalyzer::analyze_bytes(Path::new("lib.RS"), code);

        assert_eq!(result["language"], "Rust");
        assert_eq!(result["constructs"]["functions"], 2);
        assert_eq!(result["constructs"]["structs"], 1);
        assert_eq!(result["constructs"]["traits"], 1);
    }

    #[test]
    fn test_security_issues() {
        let code = b"password = 'hunter2'\nresult = eval(user_input)\n";
        let result = FileMetricsAnalyzer::analyze_bytes(Path::new("bad.py"), code);

        let issues = result["security_issues"].as_array().cloned().unwrap_or_default();
        assert_eq!(issues.len(), 2);
        assert_eq!(result["issue_count"], 2);
    }

    #[test]
    fn test_large_file_quality_issue() {
        let code = "x = 1\n".repeat(LARGE_FILE_LINES + 1);
        let result = FileMetricsAnalyzer::analyze_bytes(Path::new("big.py"), code.as_bytes());

        assert_eq!(result["quality_issues"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_unknown_language() {
        let result = FileMetricsAnalyzer::analyze_bytes(Path::new("notes"), b"hello\n");
        assert_eq!(result["language"], "Unknown");
        assert_eq!(result["extension"], "");
        assert!(result["constructs"].as_object().is_some_and(Map::is_empty));
    }

    #[test]
    fn test_binary_content() {
        let bytes = [0u8, 159, 146, 150, 0, 1, 2];
        let result = FileMetricsAnalyzer::analyze_bytes(Path::new("blob.bin"), &bytes);
        assert_eq!(result["binary"], true);
        assert_eq!(result["size"], 7);
        assert!(result.get("language").is_none());
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let bytes = b"def f():\n    return '\xff\xfe'\n";
        let result = FileMetricsAnalyzer::analyze_bytes(Path::new("odd.py"), bytes);
        assert_eq!(result["constructs"]["functions"], 1);
    }

    #[test]
    fn test_analyze_reads_file() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("main.go");
        std::fs::write(&path, "package main\nimport \"fmt\"\nfunc main() {}\n")?;

        let result = FileMetricsAnalyzer.analyze(&path)?;
        assert_eq!(result["language"], "Go");
        assert_eq!(result["constructs"]["functions"], 1);
        Ok(())
    }

    #[test]
    fn test_analyze_missing_file_errors() {
        assert!(FileMetricsAnalyzer.analyze(Path::new("/no/such.py")).is_err());
    }
}
