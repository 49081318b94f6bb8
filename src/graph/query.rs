//! Read-only queries over a [`GraphSnapshot`].
//!
//! Unknown ids are not errors: they produce empty results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::builder::GraphSnapshot;
use super::Direction;
use crate::ingest::{Symbol, SymbolKind};

/// Direct callers of a symbol (predecessors in the symbol graph), sorted.
pub fn callers(snapshot: &GraphSnapshot, symbol_id: &str) -> Vec<String> {
    snapshot
        .symbol_graph
        .predecessors(symbol_id)
        .map(str::to_string)
        .collect()
}

/// Direct callees of a symbol (successors in the symbol graph), sorted.
pub fn callees(snapshot: &GraphSnapshot, symbol_id: &str) -> Vec<String> {
    snapshot
        .symbol_graph
        .successors(symbol_id)
        .map(str::to_string)
        .collect()
}

/// Every id reachable forward from `symbol_id` within `depth` hops.
///
/// # Arguments
/// * `snapshot` - Built graphs
/// * `symbol_id` - Start node
/// * `depth` - Hop bound; 0 yields an empty set, 1 yields exactly [`callees`]
pub fn transitive_dependencies(snapshot: &GraphSnapshot, symbol_id: &str, depth: usize) -> BTreeSet<String> {
    snapshot
        .symbol_graph
        .reachable(symbol_id, depth, Direction::Outgoing)
}

/// Symbol by id, if extracted.
pub fn symbol<'a>(snapshot: &'a GraphSnapshot, symbol_id: &str) -> Option<&'a Symbol> {
    snapshot.symbols.get(symbol_id)
}

/// One search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolMatch {
    pub symbol_id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: usize,
    /// 1.0 exact, 0.8 prefix, 0.5 substring (case-insensitive)
    pub relevance: f64,
}

const EXACT_RELEVANCE: f64 = 1.0;
const PREFIX_RELEVANCE: f64 = 0.8;
const SUBSTRING_RELEVANCE: f64 = 0.5;

/// Case-insensitive substring search over symbol names.
///
/// Results are ordered by relevance, then symbol id, and truncated to
/// `top_k`. An empty query matches nothing.
pub fn search_symbols(snapshot: &GraphSnapshot, query: &str, top_k: usize) -> Vec<SymbolMatch> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<SymbolMatch> = snapshot
        .symbols
        .values()
        .filter_map(|symbol| {
            let name = symbol.name.to_lowercase();
            let relevance = if name == needle {
                EXACT_RELEVANCE
            } else if name.starts_with(&needle) {
                PREFIX_RELEVANCE
            } else if name.contains(&needle) {
                SUBSTRING_RELEVANCE
            } else {
                return None;
            };
            Some(SymbolMatch {
                symbol_id: symbol.id.clone(),
                name: symbol.name.clone(),
                kind: symbol.kind,
                file: symbol.file_path.clone(),
                line: symbol.start_line,
                relevance,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.relevance
            .total_cmp(&a.relevance)
            .then_with(|| a.symbol_id.cmp(&b.symbol_id))
    });
    matches.truncate(top_k);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use std::fs;
    use tempfile::TempDir;

    fn snapshot() -> (TempDir, GraphSnapshot) {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("orders.py"),
            "def createOrder():\n    validate()\n\ndef validate():\n    pass\n\ndef handleCheckout():\n    createOrder()\n\ndef order():\n    pass\n",
        )
        .unwrap();
        let snapshot = GraphBuilder::new(temp.path()).build().unwrap();
        (temp, snapshot)
    }

    #[test]
    fn test_callers_and_callees() {
        let (_temp, snapshot) = snapshot();
        assert_eq!(
            callers(&snapshot, "orders.py::createOrder"),
            vec!["orders.py::handleCheckout"]
        );
        assert_eq!(
            callees(&snapshot, "orders.py::createOrder"),
            vec!["orders.py::validate"]
        );
        assert!(callers(&snapshot, "nope.py::missing").is_empty());
    }

    #[test]
    fn test_transitive_cutoff() {
        let (_temp, snapshot) = snapshot();
        let id = "orders.py::handleCheckout";
        assert!(transitive_dependencies(&snapshot, id, 0).is_empty());
        let one: Vec<String> = transitive_dependencies(&snapshot, id, 1).into_iter().collect();
        assert_eq!(one, callees(&snapshot, id));
        let two = transitive_dependencies(&snapshot, id, 2);
        assert!(two.contains("orders.py::validate"));
        assert!(!two.contains(id));
    }

    #[test]
    fn test_search_ranking() {
        let (_temp, snapshot) = snapshot();
        let hits = search_symbols(&snapshot, "ORDER", 10);
        let ids: Vec<&str> = hits.iter().map(|h| h.symbol_id.as_str()).collect();
        assert_eq!(ids, vec!["orders.py::order", "orders.py::createOrder"]);
        assert_eq!(hits[0].relevance, EXACT_RELEVANCE);
        assert_eq!(hits[1].relevance, SUBSTRING_RELEVANCE);

        assert_eq!(search_symbols(&snapshot, "order", 1).len(), 1);
        assert!(search_symbols(&snapshot, "  ", 10).is_empty());
    }
}
