//! File and symbol extraction.
//!
//! [`extract_file`] turns one source file into a [`FileFacts`] bundle: the
//! File record, its symbols, and same-file call/containment edges. It never
//! touches the filesystem and never looks at other files, so it can run on
//! any worker thread.

pub mod detect;
pub mod patterns;
pub mod pool;
pub mod python;
pub mod typescript;

pub use detect::{detect_language, Language};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::diagnostics::{BuildDiagnostic, DiagnosticStage};
use crate::graph::EdgeKind;

/// Kind of symbol extracted from source code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    /// Function defined directly in a class body
    Method,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function, class or method.
///
/// `id` comes from [`crate::graph::ids`]; two declarations with the same id
/// collapse to the later one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symbol {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    /// 1-indexed
    pub start_line: usize,
    /// 1-indexed, inclusive
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// One scanned source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub language: Language,
    /// Raw import targets in source order, unresolved
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    /// Hex SHA-256 of the file bytes
    pub sha: String,
}

/// `calls` or `contains` edge between symbol ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SymbolEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl SymbolEdge {
    pub fn calls(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Calls,
        }
    }

    pub fn contains(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Contains,
        }
    }
}

/// Symbols and edges produced by a syntax-tree extractor.
#[derive(Debug, Clone, Default)]
pub struct SourceFacts {
    pub symbols: Vec<Symbol>,
    pub edges: Vec<SymbolEdge>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

/// Everything extracted from one file.
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub file: FileRecord,
    pub symbols: Vec<Symbol>,
    pub edges: Vec<SymbolEdge>,
    /// Recoverable problems that did not drop the file
    pub diagnostics: Vec<BuildDiagnostic>,
}

/// Hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Extract facts from one file.
///
/// `Err` means the file is dropped from the build: it is not valid UTF-8,
/// or it is Python that does not parse. JavaScript/TypeScript files that the
/// grammar cannot handle keep their pattern-scanned imports/exports and
/// lose only their symbols.
pub fn extract_file(
    rel_path: &str,
    language: Language,
    bytes: &[u8],
) -> Result<FileFacts, BuildDiagnostic> {
    let source = std::str::from_utf8(bytes).map_err(|e| {
        BuildDiagnostic::new(rel_path, DiagnosticStage::Read, format!("not valid UTF-8: {}", e))
    })?;
    let sha = content_hash(bytes);

    match language {
        Language::Python => {
            let facts = python::extract(rel_path, source)
                .map_err(|e| BuildDiagnostic::new(rel_path, DiagnosticStage::Parse, e.to_string()))?;
            Ok(FileFacts {
                file: FileRecord {
                    path: rel_path.to_string(),
                    language,
                    imports: facts.imports,
                    exports: facts.exports,
                    sha,
                },
                symbols: facts.symbols,
                edges: facts.edges,
                diagnostics: Vec::new(),
            })
        }
        Language::JavaScript | Language::TypeScript | Language::Tsx => {
            let scanned = patterns::scan(source);
            let mut diagnostics = Vec::new();
            let (symbols, edges) = match typescript::extract(rel_path, language, source) {
                Ok(facts) => (facts.symbols, facts.edges),
                Err(e) => {
                    diagnostics.push(BuildDiagnostic::new(
                        rel_path,
                        DiagnosticStage::Parse,
                        format!("{}; symbols skipped", e),
                    ));
                    (Vec::new(), Vec::new())
                }
            };
            Ok(FileFacts {
                file: FileRecord {
                    path: rel_path.to_string(),
                    language,
                    imports: scanned.imports,
                    exports: scanned.exports,
                    sha,
                },
                symbols,
                edges,
                diagnostics,
            })
        }
    }
}

/// Text of a node, or `None` if its bytes are not UTF-8.
pub(crate) fn node_text<'a>(node: &tree_sitter::Node, source: &'a [u8]) -> Option<&'a str> {
    node.utf8_text(source).ok()
}

/// 1-indexed line of the first syntax error under `node`, if any.
pub(crate) fn first_error_line(node: &tree_sitter::Node) -> Option<usize> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_error_line(&child) {
            return Some(line);
        }
    }
    Some(node.start_position().row + 1)
}

/// Push `value` unless it is already present, keeping first-seen order.
pub(crate) fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_python_file_record() {
        let source = b"import os\nfrom app.db import session\n\ndef run():\n    helper()\n\ndef helper():\n    pass\n";
        let facts = extract_file("jobs/run.py", Language::Python, source).unwrap();

        assert_eq!(facts.file.path, "jobs/run.py");
        assert_eq!(facts.file.imports, vec!["os", "app.db"]);
        assert_eq!(facts.file.exports, vec!["run", "helper"]);
        assert!(facts
            .edges
            .contains(&SymbolEdge::calls("jobs/run.py::run", "jobs/run.py::helper")));
    }

    #[test]
    fn test_python_syntax_error_drops_file() {
        let err = extract_file("bad.py", Language::Python, b"def broken(:\n    pass\n").unwrap_err();
        assert_eq!(err.stage, DiagnosticStage::Parse);
        assert_eq!(err.path, "bad.py");
    }

    #[test]
    fn test_non_utf8_is_read_diagnostic() {
        let err = extract_file("x.ts", Language::TypeScript, &[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err.stage, DiagnosticStage::Read);
    }

    #[test]
    fn test_script_with_syntax_error_keeps_imports() {
        let source = b"import { a } from './a';\nexport function ok() {}\nfunction (((\n";
        let facts = extract_file("m.ts", Language::TypeScript, source).unwrap();
        assert_eq!(facts.file.imports, vec!["./a"]);
        assert_eq!(facts.file.exports, vec!["ok"]);
        assert!(facts.symbols.is_empty());
        assert_eq!(facts.diagnostics.len(), 1);
    }
}
