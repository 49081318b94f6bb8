//! Language detection from file extension.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Source languages with an extractor.
///
/// `.tsx` gets its own variant because it needs the TSX grammar; it is
/// reported with the same `typescript` tag as `.ts`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    /// Language tag stored on File records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript | Language::Tsx => "typescript",
        }
    }

    /// True for the JavaScript family (js/jsx/ts/tsx).
    pub fn is_script(&self) -> bool {
        !matches!(self, Language::Python)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the language of a file from its extension.
///
/// Returns `None` for anything without an extractor.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "py" => Some(Language::Python),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
        "ts" | "mts" | "cts" => Some(Language::TypeScript),
        "tsx" => Some(Language::Tsx),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect_language(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(detect_language(Path::new("page.jsx")), Some(Language::JavaScript));
        assert_eq!(detect_language(Path::new("route.ts")), Some(Language::TypeScript));
        assert_eq!(detect_language(Path::new("page.tsx")), Some(Language::Tsx));
        assert_eq!(detect_language(Path::new("README.md")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn test_tsx_reports_typescript_tag() {
        assert_eq!(Language::Tsx.as_str(), "typescript");
        assert_eq!(Language::JavaScript.to_string(), "javascript");
    }
}
