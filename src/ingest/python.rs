//! Python extraction using tree-sitter-python.
//!
//! Symbols: top-level functions and classes, plus the methods defined
//! directly in each class body (with a `contains` edge class → method).
//! Calls: a call whose callee is a bare identifier yields a `calls` edge
//! from the enclosing function or method to `<same file>::<callee>`.
//! Attribute calls (`obj.method()`) and cross-file targets are not resolved.

use anyhow::{anyhow, Result};
use tree_sitter::Node;

use super::pool::with_parser;
use super::{first_error_line, node_text, push_unique, Language, SourceFacts, Symbol, SymbolEdge, SymbolKind};
use crate::graph::ids;

/// Extract symbols, edges, imports and exports from Python source.
///
/// Fails when the source contains syntax errors; the caller drops the file.
pub fn extract(rel_path: &str, source: &str) -> Result<SourceFacts> {
    let tree = with_parser(Language::Python, |parser| parser.parse(source, None))?
        .ok_or_else(|| anyhow!("parser returned no tree"))?;
    let root = tree.root_node();
    if let Some(line) = first_error_line(&root) {
        return Err(anyhow!("syntax error near line {}", line));
    }

    let bytes = source.as_bytes();
    let mut facts = SourceFacts::default();

    collect_imports(&root, bytes, &mut facts.imports);

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let Some(definition) = unwrap_decorated(child) else {
            continue;
        };
        match definition.kind() {
            "function_definition" => {
                if let Some(symbol) = symbol_for(&definition, bytes, rel_path, None) {
                    push_unique(&mut facts.exports, symbol.name.clone());
                    collect_calls(&definition, bytes, rel_path, &symbol.id, &mut facts.edges);
                    facts.symbols.push(symbol);
                }
            }
            "class_definition" => {
                if let Some(class) = symbol_for(&definition, bytes, rel_path, None) {
                    push_unique(&mut facts.exports, class.name.clone());
                    extract_methods(&definition, bytes, rel_path, &class, &mut facts);
                    facts.symbols.push(class);
                }
            }
            _ => {}
        }
    }

    Ok(facts)
}

/// `decorated_definition` → its inner definition; other nodes pass through.
fn unwrap_decorated(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition")
    } else {
        Some(node)
    }
}

fn symbol_for(node: &Node, source: &[u8], rel_path: &str, class: Option<&str>) -> Option<Symbol> {
    let name = node_text(&node.child_by_field_name("name")?, source)?.to_string();
    let (id, kind) = match (node.kind(), class) {
        ("class_definition", _) => (ids::symbol_id(rel_path, &name), SymbolKind::Class),
        (_, Some(class)) => (ids::method_id(rel_path, class, &name), SymbolKind::Method),
        (_, None) => (ids::symbol_id(rel_path, &name), SymbolKind::Function),
    };
    let signature = node
        .child_by_field_name("parameters")
        .and_then(|params| node_text(&params, source))
        .map(str::to_string);

    Some(Symbol {
        id,
        name,
        kind,
        file_path: rel_path.to_string(),
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        signature,
    })
}

fn extract_methods(class_node: &Node, source: &[u8], rel_path: &str, class: &Symbol, facts: &mut SourceFacts) {
    let Some(body) = class_node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for item in body.named_children(&mut cursor) {
        let Some(definition) = unwrap_decorated(item) else {
            continue;
        };
        if definition.kind() != "function_definition" {
            continue;
        }
        if let Some(method) = symbol_for(&definition, source, rel_path, Some(&class.name)) {
            facts.edges.push(SymbolEdge::contains(&class.id, &method.id));
            collect_calls(&definition, source, rel_path, &method.id, &mut facts.edges);
            facts.symbols.push(method);
        }
    }
}

/// Same-file call heuristic: `name(...)` → `<file>::name`.
fn collect_calls(node: &Node, source: &[u8], rel_path: &str, caller: &str, edges: &mut Vec<SymbolEdge>) {
    if node.kind() == "call" {
        if let Some(function) = node.child_by_field_name("function") {
            if function.kind() == "identifier" {
                if let Some(callee) = node_text(&function, source) {
                    let edge = SymbolEdge::calls(caller, ids::symbol_id(rel_path, callee));
                    if !edges.contains(&edge) {
                        edges.push(edge);
                    }
                }
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_calls(&child, source, rel_path, caller, edges);
    }
}

/// Every import in the module, including ones nested in functions.
///
/// `import a.b as c` → `a.b`; `from x.y import z` → `x.y`;
/// relative forms keep their dots (`from . import z` → `.`).
fn collect_imports(node: &Node, source: &[u8], imports: &mut Vec<String>) {
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let target = if name.kind() == "aliased_import" {
                    name.child_by_field_name("name")
                } else {
                    Some(name)
                };
                if let Some(text) = target.and_then(|t| node_text(&t, source)) {
                    push_unique(imports, text.to_string());
                }
            }
            return;
        }
        "import_from_statement" => {
            if let Some(text) = node
                .child_by_field_name("module_name")
                .and_then(|m| node_text(&m, source))
            {
                push_unique(imports, text.to_string());
            }
            return;
        }
        "future_import_statement" => {
            push_unique(imports, "__future__".to_string());
            return;
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_imports(&child, source, imports);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_of(facts: &SourceFacts) -> Vec<&str> {
        facts.symbols.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_functions_and_same_file_calls() {
        let source = r#"
def handleCheckout(cart):
    order = createOrder(cart)
    notify(order)
    return order

def createOrder(cart):
    return db.save(cart)
"#;
        let facts = extract("orders.py", source).unwrap();

        assert_eq!(ids_of(&facts), vec!["orders.py::handleCheckout", "orders.py::createOrder"]);
        assert!(facts
            .edges
            .contains(&SymbolEdge::calls("orders.py::handleCheckout", "orders.py::createOrder")));
        // Unresolved same-file target still gets an edge
        assert!(facts
            .edges
            .contains(&SymbolEdge::calls("orders.py::handleCheckout", "orders.py::notify")));
        // Attribute call is not resolved
        assert!(!facts.edges.iter().any(|e| e.target.ends_with("::save")));
    }

    #[test]
    fn test_class_methods_and_contains() {
        let source = r#"
class OrderService:
    def __init__(self, repo):
        self.repo = repo

    @staticmethod
    def total(items):
        return sum_prices(items)
"#;
        let facts = extract("svc.py", source).unwrap();

        let method = facts
            .symbols
            .iter()
            .find(|s| s.id == "svc.py::OrderService.total")
            .unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.name, "total");
        assert_eq!(method.signature.as_deref(), Some("(items)"));
        assert_eq!(method.start_line, 7);

        assert!(facts
            .edges
            .contains(&SymbolEdge::contains("svc.py::OrderService", "svc.py::OrderService.__init__")));
        assert!(facts
            .edges
            .contains(&SymbolEdge::calls("svc.py::OrderService.total", "svc.py::sum_prices")));
        assert_eq!(facts.exports, vec!["OrderService"]);
    }

    #[test]
    fn test_nested_functions_are_not_symbols() {
        let source = "def outer():\n    def inner():\n        leaf()\n    inner()\n";
        let facts = extract("n.py", source).unwrap();
        assert_eq!(ids_of(&facts), vec!["n.py::outer"]);
        assert!(facts.edges.contains(&SymbolEdge::calls("n.py::outer", "n.py::leaf")));
        assert!(facts.edges.contains(&SymbolEdge::calls("n.py::outer", "n.py::inner")));
    }

    #[test]
    fn test_imports() {
        let source = r#"
import os, sys as system
import app.models.user
from app.db import session
from . import utils
from ..core.auth import login

def f():
    import json
"#;
        let facts = extract("m.py", source).unwrap();
        assert_eq!(
            facts.imports,
            vec!["os", "sys", "app.models.user", "app.db", ".", "..core.auth", "json"]
        );
    }

    #[test]
    fn test_async_and_decorated_functions() {
        let source = "@app.get('/x')\nasync def fetch(id: int) -> dict:\n    return load(id)\n";
        let facts = extract("api.py", source).unwrap();
        let symbol = &facts.symbols[0];
        assert_eq!(symbol.id, "api.py::fetch");
        assert_eq!(symbol.start_line, 2);
        assert_eq!(symbol.signature.as_deref(), Some("(id: int)"));
    }

    #[test]
    fn test_syntax_error() {
        assert!(extract("bad.py", "class :\n").is_err());
    }

    #[test]
    fn test_redeclaration_keeps_both_records_in_order() {
        let facts = extract("d.py", "def a():\n    pass\n\ndef a():\n    pass\n").unwrap();
        assert_eq!(facts.symbols.len(), 2);
        assert_eq!(facts.symbols[1].start_line, 4);
    }
}
