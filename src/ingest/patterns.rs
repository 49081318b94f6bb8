//! Declaration-pattern scanning for JavaScript/TypeScript.
//!
//! Imports and exports of script files come from these patterns rather than
//! from the syntax tree; when the grammar cannot produce a tree they are the
//! only facts recorded for the file. No call graph is derived from them.

use once_cell::sync::Lazy;
use regex::Regex;

use super::push_unique;

const IDENT: &str = r"[A-Za-z_$][\w$]*";

static IMPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // import x from 'm' / import { a, b } from "m" / import type { T } from 'm'
        r#"\bimport\s+[^;'"]*?\bfrom\s*['"]([^'"]+)['"]"#,
        // import 'side-effect'
        r#"\bimport\s*['"]([^'"]+)['"]"#,
        // import('lazy')
        r#"\bimport\(\s*['"]([^'"]+)['"]\s*\)"#,
        // require('cjs')
        r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#,
        // export { a } from 'm' / export * from 'm'
        r#"\bexport\s+(?:type\s+)?(?:\*|\{[^}]*\})(?:\s+as\s+\w+)?\s*from\s*['"]([^'"]+)['"]"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static EXPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"\bexport\s+(?:declare\s+)?(?:async\s+)?function\b\s*\*?\s*({IDENT})"),
        format!(r"\bexport\s+(?:declare\s+)?(?:abstract\s+)?class\s+({IDENT})"),
        format!(r"\bexport\s+(?:declare\s+)?(?:const|let|var)\s+({IDENT})"),
        format!(r"\bexport\s+default\s+(?:async\s+)?function\b\s*\*?\s*({IDENT})"),
        format!(r"\bexport\s+default\s+(?:abstract\s+)?class\s+({IDENT})"),
        format!(r"\bexport\s+(?:declare\s+)?(?:interface|type|enum|const\s+enum)\s+({IDENT})"),
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static DEFAULT_EXPORT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(&format!(
        r"\bexport\s+default\s+(?:async\s+)?(?:function\b\s*\*?\s*|(?:abstract\s+)?class\s+)?({IDENT})"
    ))
    .ok()
});

/// Imports and exports found by pattern scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedDeclarations {
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

/// Scan `source` for import targets and exported names.
///
/// Both lists are in source order without duplicates.
pub fn scan(source: &str) -> ScannedDeclarations {
    ScannedDeclarations {
        imports: collect_in_order(&IMPORT_PATTERNS, source),
        exports: collect_in_order(&EXPORT_PATTERNS, source),
    }
}

fn collect_in_order(patterns: &[Regex], source: &str) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = Vec::new();
    for pattern in patterns {
        for caps in pattern.captures_iter(source) {
            if let Some(m) = caps.get(1) {
                hits.push((m.start(), m.as_str().to_string()));
            }
        }
    }
    hits.sort();

    let mut out = Vec::with_capacity(hits.len());
    for (_, value) in hits {
        push_unique(&mut out, value);
    }
    out
}

/// Name and 1-indexed line of the default export.
///
/// Covers `export default function Name`, `export default class Name` and
/// `export default Name`. Anonymous default exports return `None`.
pub fn default_export(source: &str) -> Option<(String, usize)> {
    let pattern = DEFAULT_EXPORT.as_ref()?;
    let caps = pattern.captures(source)?;
    let name = caps.get(1)?;
    if matches!(name.as_str(), "function" | "class" | "async") {
        return None;
    }
    let whole = caps.get(0)?;
    Some((name.as_str().to_string(), line_of(source, whole.start())))
}

/// 1-indexed line containing byte `offset`.
pub fn line_of(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
