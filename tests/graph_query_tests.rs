//! Structural properties of the symbol graph queries.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use blastmap::graph::query::{callees, callers, search_symbols, transitive_dependencies};
use blastmap::{FrameworkKind, GraphBuilder, GraphSnapshot};
use tempfile::TempDir;

const BILLING: &str = r#"class Invoice:
    def total(self):
        return add_tax(subtotal())

def subtotal():
    return 10

def add_tax(amount):
    return round_cents(amount * 1.2)

def round_cents(amount):
    return ping(amount)

def ping(x):
    return pong(x)

def pong(x):
    return ping(x)
"#;

const CHECKOUT: &str = r#"import { charge } from './payments';

export function checkout(cart) {
  const total = sum(cart);
  return charge(total);
}

function sum(cart) {
  return cart.reduce((a, b) => a + b, 0);
}
"#;

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let write = |rel: &str, text: &str| {
        let path = temp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    };
    write("billing/invoice.py", BILLING);
    write("web/checkout.ts", CHECKOUT);
    write("web/payments.ts", "export function charge(amount: number) {\n  return amount;\n}\n");
    temp
}

fn build(root: &Path) -> GraphSnapshot {
    GraphBuilder::new(root)
        .framework(FrameworkKind::FileTreeRouting)
        .build()
        .unwrap()
}

fn node_ids(snapshot: &GraphSnapshot) -> Vec<String> {
    snapshot
        .symbol_graph
        .nodes()
        .map(|(id, _)| id.to_string())
        .collect()
}

#[test]
fn test_callers_and_callees_are_dual() {
    let temp = fixture();
    let snapshot = build(temp.path());
    let nodes = node_ids(&snapshot);
    assert!(!nodes.is_empty());

    for s in &nodes {
        let expected: BTreeSet<String> = nodes
            .iter()
            .filter(|c| callees(&snapshot, c).contains(s))
            .cloned()
            .collect();
        let actual: BTreeSet<String> = callers(&snapshot, s).into_iter().collect();
        assert_eq!(actual, expected, "callers({s}) disagrees with callees");
    }
}

#[test]
fn test_dependency_depth_boundaries() {
    let temp = fixture();
    let snapshot = build(temp.path());

    for s in node_ids(&snapshot) {
        assert!(transitive_dependencies(&snapshot, &s, 0).is_empty());
        let one: BTreeSet<String> = callees(&snapshot, &s).into_iter().collect();
        assert_eq!(transitive_dependencies(&snapshot, &s, 1), one, "depth 1 of {s}");
    }
}

#[test]
fn test_cycles_terminate_and_grow_with_depth() {
    let temp = fixture();
    let snapshot = build(temp.path());
    let start = "billing/invoice.py::add_tax";

    let two = transitive_dependencies(&snapshot, start, 2);
    let many = transitive_dependencies(&snapshot, start, 50);
    assert!(two.is_subset(&many));
    assert!(many.contains("billing/invoice.py::round_cents"));
    assert!(many.contains("billing/invoice.py::ping"));
    assert!(many.contains("billing/invoice.py::pong"));
    assert!(!many.contains(start));
}

#[test]
fn test_unknown_symbol_is_empty() {
    let temp = fixture();
    let snapshot = build(temp.path());

    assert!(callers(&snapshot, "nowhere.py::ghost").is_empty());
    assert!(callees(&snapshot, "nowhere.py::ghost").is_empty());
    assert!(transitive_dependencies(&snapshot, "nowhere.py::ghost", 5).is_empty());
}

#[test]
fn test_rebuild_is_idempotent() {
    let temp = fixture();
    let first = build(temp.path());
    let second = build(temp.path());

    let graphs = |s: &GraphSnapshot| {
        [
            (s.file_graph.node_ids(), s.file_graph.edge_keys()),
            (s.symbol_graph.node_ids(), s.symbol_graph.edge_keys()),
            (s.route_graph.node_ids(), s.route_graph.edge_keys()),
            (s.di_graph.node_ids(), s.di_graph.edge_keys()),
            (s.job_graph.node_ids(), s.job_graph.edge_keys()),
        ]
    };
    assert_eq!(graphs(&first), graphs(&second));
    assert_eq!(first.symbols, second.symbols);
    assert_eq!(first.files, second.files);
}

#[test]
fn test_file_graph_records_imports() {
    let temp = fixture();
    let snapshot = build(temp.path());

    let targets: Vec<&str> = snapshot.file_graph.successors("web/checkout.ts").collect();
    assert!(!targets.is_empty(), "checkout.ts should import payments");
    assert!(targets.iter().any(|t| t.contains("payments")));
}

#[test]
fn test_search_ranks_exact_matches_first() {
    let temp = fixture();
    let snapshot = build(temp.path());

    let hits = search_symbols(&snapshot, "sub", 10);
    assert_eq!(hits[0].symbol_id, "billing/invoice.py::subtotal");

    let hits = search_symbols(&snapshot, "checkout", 10);
    assert_eq!(hits[0].symbol_id, "web/checkout.ts::checkout");
    assert_eq!(hits[0].line, 3);
    assert!(search_symbols(&snapshot, "", 10).is_empty());
    assert!(search_symbols(&snapshot, "c", 1).len() <= 1);
}
