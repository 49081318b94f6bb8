//! Keyword seeding from free text.
//!
//! A fixed set of domain patterns picks lowercase keyword stems out of a
//! feature description; every symbol whose name contains a stem becomes a
//! seed.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::graph::GraphSnapshot;

/// Entity nouns, flow words, CRUD verbs. The first group is the stem.
static KEYWORD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(user|auth|payment|order|product|admin|api|service)\w*\b",
        r"(?i)\b(login|register|checkout|cart|profile|dashboard)\b",
        r"(?i)\b(create|update|delete|get|list|search)\w*\b",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Lowercase keyword stems found in `text`, sorted and deduplicated.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    KEYWORD_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Ids of symbols whose name contains any keyword (case-insensitive).
pub fn keyword_seeds(snapshot: &GraphSnapshot, keywords: &BTreeSet<String>) -> Vec<String> {
    if keywords.is_empty() {
        return Vec::new();
    }
    snapshot
        .symbols
        .values()
        .filter(|symbol| {
            let name = symbol.name.to_lowercase();
            keywords.iter().any(|keyword| name.contains(keyword.as_str()))
        })
        .map(|symbol| symbol.id.clone())
        .collect()
}
