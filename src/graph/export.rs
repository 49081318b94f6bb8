//! Node-link JSON export.
//!
//! Each graph is written as
//! `{"directed": true, "multigraph": false, "graph": {}, "nodes": [...], "links": [...]}`
//! with node attributes flattened beside `id` and link attributes beside
//! `source`, `target` and `type`. Nodes and links are emitted in id order so
//! identical graphs serialize identically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::builder::GraphSnapshot;
use super::{Attrs, DiGraph};
use crate::error::Result;
use crate::framework::Route;

/// One node in a node-link document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeLinkNode {
    pub id: String,
    #[serde(flatten)]
    pub attrs: Attrs,
}

/// One link in a node-link document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeLinkLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub attrs: Attrs,
}

/// Serializable form of a [`DiGraph`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeLinkGraph {
    pub directed: bool,
    pub multigraph: bool,
    pub graph: Attrs,
    pub nodes: Vec<NodeLinkNode>,
    pub links: Vec<NodeLinkLink>,
}

impl From<&DiGraph> for NodeLinkGraph {
    fn from(graph: &DiGraph) -> Self {
        Self {
            directed: true,
            multigraph: false,
            graph: Attrs::new(),
            nodes: graph
                .nodes()
                .map(|(id, attrs)| NodeLinkNode {
                    id: id.to_string(),
                    attrs: attrs.clone(),
                })
                .collect(),
            links: graph
                .edges()
                .map(|edge| NodeLinkLink {
                    source: edge.source.to_string(),
                    target: edge.target.to_string(),
                    kind: edge.kind.as_str().to_string(),
                    attrs: edge.attrs.clone(),
                })
                .collect(),
        }
    }
}

/// File names written by [`export_graphs`], in write order.
pub const EXPORT_FILES: &[&str] = &[
    "file_graph.json",
    "symbol_graph.json",
    "route_graph.json",
    "di_graph.json",
    "job_graph.json",
    "routes.json",
];

/// Write all five graphs plus the route table into `dir`.
///
/// Creates `dir` if needed and overwrites existing files.
pub fn export_graphs(snapshot: &GraphSnapshot, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    let graphs = [
        &snapshot.file_graph,
        &snapshot.symbol_graph,
        &snapshot.route_graph,
        &snapshot.di_graph,
        &snapshot.job_graph,
    ];
    for (name, graph) in EXPORT_FILES.iter().zip(graphs) {
        let document = NodeLinkGraph::from(graph);
        fs::write(dir.join(name), serde_json::to_string_pretty(&document)?)?;
    }

    let routes: &BTreeMap<String, Route> = &snapshot.routes;
    fs::write(dir.join("routes.json"), serde_json::to_string_pretty(routes)?)?;

    tracing::info!(dir = %dir.display(), files = EXPORT_FILES.len(), "graphs exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::graph::{EdgeKind, GraphBuilder};
    use tempfile::TempDir;

    #[test]
    fn test_node_link_shape() {
        let mut graph = DiGraph::new();
        graph.add_node("a.py::f", attrs! { "kind" => "function", "line" => 3 });
        graph.add_edge("a.py::f", "a.py::g", EdgeKind::Calls, attrs!());

        let value = serde_json::to_value(NodeLinkGraph::from(&graph)).unwrap();
        assert_eq!(value["directed"], true);
        assert_eq!(value["nodes"][0]["id"], "a.py::f");
        assert_eq!(value["nodes"][0]["kind"], "function");
        assert_eq!(value["nodes"][1]["id"], "a.py::g");
        assert_eq!(value["links"][0]["source"], "a.py::f");
        assert_eq!(value["links"][0]["target"], "a.py::g");
        assert_eq!(value["links"][0]["type"], "calls");
    }

    #[test]
    fn test_export_writes_every_file() {
        let repo = TempDir::new().unwrap();
        std::fs::create_dir_all(repo.path().join("app/health")).unwrap();
        std::fs::write(
            repo.path().join("app/health/route.ts"),
            "export function GET() {}\n",
        )
        .unwrap();
        let snapshot = GraphBuilder::new(repo.path())
            .framework(crate::framework::FrameworkKind::FileTreeRouting)
            .build()
            .unwrap();

        let out = TempDir::new().unwrap();
        export_graphs(&snapshot, out.path()).unwrap();
        for name in EXPORT_FILES {
            assert!(out.path().join(name).is_file(), "{name} missing");
        }

        let routes: BTreeMap<String, Route> =
            serde_json::from_str(&std::fs::read_to_string(out.path().join("routes.json")).unwrap()).unwrap();
        assert_eq!(routes["GET /health"].handler, "route.GET");
    }
}
