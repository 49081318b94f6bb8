//! In-memory typed directed graphs.
//!
//! Every build produces five [`DiGraph`]s (file, symbol, route, DI, job)
//! sharing the id scheme in [`ids`]. Graphs allow cycles and dangling
//! references; every traversal takes an explicit hop bound.

pub mod builder;
pub mod export;
pub mod filter;
pub mod ids;
pub mod query;

pub use builder::{CancelToken, GraphBuilder, GraphSnapshot};
pub use export::{export_graphs, NodeLinkGraph};
pub use filter::FileFilter;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Node and edge attributes, kept ordered for deterministic export.
pub type Attrs = BTreeMap<String, serde_json::Value>;

/// Edge type tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Imports,
    Calls,
    Contains,
    HandledBy,
    Provides,
    /// Job → declared dependency name
    DependsOn,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Imports => "imports",
            EdgeKind::Calls => "calls",
            EdgeKind::Contains => "contains",
            EdgeKind::HandledBy => "handled_by",
            EdgeKind::Provides => "provides",
            EdgeKind::DependsOn => "depends_on",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow edges source → target
    Outgoing,
    /// Follow edges target → source
    Incoming,
}

/// Borrowed view of one edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRef<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub kind: EdgeKind,
    pub attrs: &'a Attrs,
}

/// Directed graph keyed by string ids.
///
/// At most one edge exists per `(source, target, kind)`; re-adding it
/// merges attributes. Adding an edge registers both endpoints as nodes
/// (attribute-less if they were never added explicitly), so every id that
/// appears in an edge answers neighbour queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiGraph {
    nodes: BTreeMap<String, Attrs>,
    edges: BTreeMap<(String, String, EdgeKind), Attrs>,
    succ: BTreeMap<String, BTreeSet<String>>,
    pred: BTreeMap<String, BTreeSet<String>>,
}

impl DiGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, merging `attrs` into any attributes it already has.
    pub fn add_node(&mut self, id: impl Into<String>, attrs: Attrs) {
        let entry = self.nodes.entry(id.into()).or_default();
        entry.extend(attrs);
    }

    pub fn add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        kind: EdgeKind,
        attrs: Attrs,
    ) {
        let source = source.into();
        let target = target.into();
        self.nodes.entry(source.clone()).or_default();
        self.nodes.entry(target.clone()).or_default();
        self.succ
            .entry(source.clone())
            .or_default()
            .insert(target.clone());
        self.pred
            .entry(target.clone())
            .or_default()
            .insert(source.clone());
        self.edges
            .entry((source, target, kind))
            .or_default()
            .extend(attrs);
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Attrs> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Attrs)> {
        self.nodes.iter().map(|(id, attrs)| (id.as_str(), attrs))
    }

    /// Edges in `(source, target, kind)` order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> {
        self.edges.iter().map(|((source, target, kind), attrs)| EdgeRef {
            source,
            target,
            kind: *kind,
            attrs,
        })
    }

    /// Direct successors, any edge kind. Unknown ids yield nothing.
    pub fn successors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.succ
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Direct predecessors, any edge kind. Unknown ids yield nothing.
    pub fn predecessors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.pred
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Direct successors over edges of one kind.
    pub fn successors_by_kind(&self, id: &str, kind: EdgeKind) -> Vec<&str> {
        self.successors(id)
            .filter(|target| {
                self.edges
                    .contains_key(&(id.to_string(), (*target).to_string(), kind))
            })
            .collect()
    }

    fn neighbours<'a>(&'a self, id: &str, direction: Direction) -> Option<&'a BTreeSet<String>> {
        match direction {
            Direction::Outgoing => self.succ.get(id),
            Direction::Incoming => self.pred.get(id),
        }
    }

    /// Every node reachable from `start` by a walk of 1..=`max_hops` edges.
    ///
    /// Breadth-first; each node is expanded at most once, so cycles
    /// terminate. `start` appears in the result only when a cycle leads back
    /// to it within the bound. `max_hops == 0` yields an empty set.
    pub fn reachable(&self, start: &str, max_hops: usize, direction: Direction) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        if max_hops == 0 || !self.contains_node(start) {
            return result;
        }

        let mut expanded: BTreeSet<&str> = BTreeSet::new();
        expanded.insert(start);
        let mut frontier: Vec<&str> = vec![start];

        for _ in 0..max_hops {
            let mut next = Vec::new();
            for node in frontier {
                let Some(neighbours) = self.neighbours(node, direction) else {
                    continue;
                };
                for neighbour in neighbours {
                    result.insert(neighbour.clone());
                    if expanded.insert(neighbour.as_str()) {
                        next.push(neighbour.as_str());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        result
    }

    /// Sorted node ids, for comparing graphs independent of attributes.
    pub fn node_ids(&self) -> BTreeSet<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Sorted `(source, target, kind)` triples.
    pub fn edge_keys(&self) -> BTreeSet<(String, String, EdgeKind)> {
        self.edges.keys().cloned().collect()
    }
}

/// Build an [`Attrs`] map from `key => value` pairs.
#[macro_export]
macro_rules! attrs {
    () => { $crate::graph::Attrs::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::graph::Attrs::new();
        $( map.insert(($key).to_string(), ::serde_json::json!($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    fn chain() -> DiGraph {
        // a -> b -> c -> a (cycle), c -> d
        let mut g = DiGraph::new();
        g.add_edge("a", "b", EdgeKind::Calls, attrs!());
        g.add_edge("b", "c", EdgeKind::Calls, attrs!());
        g.add_edge("c", "a", EdgeKind::Calls, attrs!());
        g.add_edge("c", "d", EdgeKind::Calls, attrs!());
        g
    }

    #[test]
    fn test_add_edge_registers_endpoints() {
        let mut g = DiGraph::new();
        g.add_edge("x", "y", EdgeKind::Imports, attrs!());
        assert!(g.contains_node("x"));
        assert!(g.contains_node("y"));
        assert!(g.node("y").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_edge_is_collapsed() {
        let mut g = DiGraph::new();
        g.add_edge("x", "y", EdgeKind::Calls, attrs!());
        g.add_edge("x", "y", EdgeKind::Calls, attrs!("weight" => 2));
        g.add_edge("x", "y", EdgeKind::Contains, attrs!());
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.successors("x").count(), 1);
    }

    #[test]
    fn test_add_node_merges_attrs() {
        let mut g = DiGraph::new();
        g.add_node("n", attrs!("name" => "n"));
        g.add_node("n", attrs!("line" => 3));
        let node = g.node("n").unwrap();
        assert_eq!(node.get("name"), Some(&serde_json::json!("n")));
        assert_eq!(node.get("line"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_reachable_zero_hops_is_empty() {
        assert!(chain().reachable("a", 0, Direction::Outgoing).is_empty());
    }

    #[test]
    fn test_reachable_one_hop_is_successors() {
        let g = chain();
        let one: Vec<String> = g.reachable("c", 1, Direction::Outgoing).into_iter().collect();
        assert_eq!(one, vec!["a".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_reachable_includes_start_only_through_cycle() {
        let g = chain();
        assert!(!g.reachable("a", 2, Direction::Outgoing).contains("a"));
        assert!(g.reachable("a", 3, Direction::Outgoing).contains("a"));
    }

    #[test]
    fn test_reachable_terminates_on_cycles_with_large_bound() {
        let g = chain();
        let all = g.reachable("a", 1_000, Direction::Outgoing);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_reachable_incoming() {
        let g = chain();
        let back = g.reachable("d", 2, Direction::Incoming);
        assert!(back.contains("c"));
        assert!(back.contains("b"));
        assert!(!back.contains("a"));
    }

    #[test]
    fn test_unknown_node_has_no_neighbours() {
        let g = chain();
        assert_eq!(g.successors("zzz").count(), 0);
        assert_eq!(g.predecessors("zzz").count(), 0);
        assert!(g.reachable("zzz", 5, Direction::Outgoing).is_empty());
    }

    #[test]
    fn test_successors_by_kind() {
        let mut g = DiGraph::new();
        g.add_edge("C", "C.m", EdgeKind::Contains, attrs!());
        g.add_edge("C", "f", EdgeKind::Calls, attrs!());
        assert_eq!(g.successors_by_kind("C", EdgeKind::Contains), vec!["C.m"]);
    }
}
