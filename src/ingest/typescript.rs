//! JavaScript/TypeScript symbol extraction using tree-sitter.
//!
//! Covers `.js/.jsx` (JavaScript grammar), `.ts` (TypeScript) and `.tsx`
//! (TSX). Extracts top-level functions (declarations and `const f = () =>`
//! bindings), classes, and class methods with the same id scheme and the
//! same-file call heuristic as the Python extractor. Imports and exports
//! are left to [`super::patterns`].

use anyhow::{anyhow, Result};
use tree_sitter::Node;

use super::pool::with_parser;
use super::{first_error_line, node_text, Language, SourceFacts, Symbol, SymbolEdge, SymbolKind};
use crate::graph::ids;

/// Extract symbols and same-file edges.
///
/// Fails when the grammar reports syntax errors.
pub fn extract(rel_path: &str, language: Language, source: &str) -> Result<SourceFacts> {
    let tree = with_parser(language, |parser| parser.parse(source, None))?
        .ok_or_else(|| anyhow!("parser returned no tree"))?;
    let root = tree.root_node();
    if let Some(line) = first_error_line(&root) {
        return Err(anyhow!("syntax error near line {}", line));
    }

    let mut walker = Walker {
        rel_path,
        source: source.as_bytes(),
        facts: SourceFacts::default(),
    };
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        walker.top_level(child);
    }
    Ok(walker.facts)
}

struct Walker<'a> {
    rel_path: &'a str,
    source: &'a [u8],
    facts: SourceFacts,
}

impl<'a> Walker<'a> {
    fn top_level(&mut self, node: Node) {
        match node.kind() {
            "export_statement" => {
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    self.top_level(declaration);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                let Some(name) = self.name_of(&node) else {
                    return;
                };
                let symbol = self.symbol(&node, &node, name, SymbolKind::Function, None);
                self.collect_calls(&node, &symbol.id);
                self.facts.symbols.push(symbol);
            }
            "class_declaration" | "abstract_class_declaration" => {
                let Some(name) = self.name_of(&node) else {
                    return;
                };
                let class = self.symbol(&node, &node, name, SymbolKind::Class, None);
                self.methods(&node, &class);
                self.facts.symbols.push(class);
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() == "variable_declarator" {
                        self.function_binding(&node, &declarator);
                    }
                }
            }
            _ => {}
        }
    }

    /// `const name = (..) => {..}` or `const name = function (..) {..}`
    fn function_binding(&mut self, statement: &Node, declarator: &Node) {
        let Some(value) = declarator.child_by_field_name("value") else {
            return;
        };
        if !matches!(
            value.kind(),
            "arrow_function" | "function" | "function_expression" | "generator_function"
        ) {
            return;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else {
            return;
        };
        if name_node.kind() != "identifier" {
            return;
        }
        let Some(name) = node_text(&name_node, self.source).map(str::to_string) else {
            return;
        };
        let symbol = self.symbol(statement, &value, name, SymbolKind::Function, None);
        self.collect_calls(&value, &symbol.id);
        self.facts.symbols.push(symbol);
    }

    fn methods(&mut self, class_node: &Node, class: &Symbol) {
        let Some(body) = class_node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() != "method_definition" {
                continue;
            }
            let Some(name) = self.name_of(&member) else {
                continue;
            };
            let method = self.symbol(&member, &member, name, SymbolKind::Method, Some(&class.name));
            self.facts
                .edges
                .push(SymbolEdge::contains(&class.id, &method.id));
            self.collect_calls(&member, &method.id);
            self.facts.symbols.push(method);
        }
    }

    fn name_of(&self, node: &Node) -> Option<String> {
        let name = node.child_by_field_name("name")?;
        node_text(&name, self.source).map(str::to_string)
    }

    /// `span` gives the line range, `callable` the parameter list.
    fn symbol(
        &self,
        span: &Node,
        callable: &Node,
        name: String,
        kind: SymbolKind,
        class: Option<&str>,
    ) -> Symbol {
        let id = match class {
            Some(class) => ids::method_id(self.rel_path, class, &name),
            None => ids::symbol_id(self.rel_path, &name),
        };
        let signature = if kind == SymbolKind::Class {
            None
        } else {
            callable
                .child_by_field_name("parameters")
                .or_else(|| callable.child_by_field_name("parameter"))
                .and_then(|params| node_text(&params, self.source))
                .map(str::to_string)
        };
        Symbol {
            id,
            name,
            kind,
            file_path: self.rel_path.to_string(),
            start_line: span.start_position().row + 1,
            end_line: span.end_position().row + 1,
            signature,
        }
    }

    fn collect_calls(&mut self, node: &Node, caller: &str) {
        if node.kind() == "call_expression" {
            if let Some(function) = node.child_by_field_name("function") {
                if function.kind() == "identifier" {
                    if let Some(callee) = node_text(&function, self.source) {
                        let edge = SymbolEdge::calls(caller, ids::symbol_id(self.rel_path, callee));
                        if !self.facts.edges.contains(&edge) {
                            self.facts.edges.push(edge);
                        }
                    }
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect_calls(&child, caller);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(facts: &'a SourceFacts, id: &str) -> &'a Symbol {
        facts
            .symbols
            .iter()
            .find(|s| s.id == id)
            .unwrap_or_else(|| panic!("missing symbol {id}"))
    }

    #[test]
    fn test_functions_and_calls() {
        let source = r#"
import { db } from './db';

export async function createUser(input: UserInput) {
  validate(input);
  return db.users.insert(input);
}

function validate(input: UserInput): void {}

export const listUsers = async () => {
  return createUser({});
};
"#;
        let facts = extract("src/users.ts", Language::TypeScript, source).unwrap();

        let create = find(&facts, "src/users.ts::createUser");
        assert_eq!(create.kind, SymbolKind::Function);
        assert_eq!(create.start_line, 4);
        assert_eq!(create.signature.as_deref(), Some("(input: UserInput)"));

        find(&facts, "src/users.ts::validate");
        find(&facts, "src/users.ts::listUsers");

        assert!(facts
            .edges
            .contains(&SymbolEdge::calls("src/users.ts::createUser", "src/users.ts::validate")));
        assert!(facts
            .edges
            .contains(&SymbolEdge::calls("src/users.ts::listUsers", "src/users.ts::createUser")));
        assert!(!facts.edges.iter().any(|e| e.target.ends_with("::insert")));
    }

    #[test]
    fn test_class_methods() {
        let source = r#"
@Injectable()
export class OrdersService {
  constructor(private readonly repo: OrdersRepository) {}

  async findAll() {
    return normalize(await this.repo.find());
  }
}
"#;
        let facts = extract("src/orders.service.ts", Language::TypeScript, source).unwrap();

        let class = find(&facts, "src/orders.service.ts::OrdersService");
        assert_eq!(class.kind, SymbolKind::Class);
        assert!(class.signature.is_none());

        let method = find(&facts, "src/orders.service.ts::OrdersService.findAll");
        assert_eq!(method.kind, SymbolKind::Method);
        find(&facts, "src/orders.service.ts::OrdersService.constructor");

        assert!(facts.edges.contains(&SymbolEdge::contains(
            "src/orders.service.ts::OrdersService",
            "src/orders.service.ts::OrdersService.findAll"
        )));
        assert!(facts.edges.contains(&SymbolEdge::calls(
            "src/orders.service.ts::OrdersService.findAll",
            "src/orders.service.ts::normalize"
        )));
    }

    #[test]
    fn test_tsx_component() {
        let source = "export default function UserPage({ params }) {\n  return <Profile id={params.id} />;\n}\n";
        let facts = extract("app/users/[id]/page.tsx", Language::Tsx, source).unwrap();
        find(&facts, "app/users/[id]/page.tsx::UserPage");
    }

    #[test]
    fn test_javascript_grammar() {
        let source = "function a() { b(); }\nclass C { m() { a(); } }\n";
        let facts = extract("x.js", Language::JavaScript, source).unwrap();
        assert!(facts.edges.contains(&SymbolEdge::calls("x.js::a", "x.js::b")));
        assert!(facts.edges.contains(&SymbolEdge::calls("x.js::C.m", "x.js::a")));
    }

    #[test]
    fn test_syntax_error() {
        assert!(extract("bad.ts", Language::TypeScript, "function (((").is_err());
    }
}
