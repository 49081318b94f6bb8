//! Impact analysis.
//!
//! [`impact_set`] is the raw traversal: from seed symbol ids it collects
//! callers and the depth-bounded forward and backward reach in the symbol
//! graph, then maps the result onto files, routes and DI consumers.
//! [`engine`] categorizes impact sets into a scored [`BlastRadius`].
//!
//! Route and DI matching are string-containment heuristics: a route is
//! impacted when an impacted symbol's name occurs in its handler string,
//! and a DI edge when an impacted symbol id (or class name) occurs in its
//! provider string. Both can over- and under-match.

pub mod blast_radius;
pub mod engine;
pub mod keywords;

pub use blast_radius::{BlastRadius, RiskLevel};
pub use engine::{BlastRadiusEngine, Breakage, ChangeSpec, ImpactReport};
pub use keywords::{extract_keywords, keyword_seeds};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::graph::{Direction, GraphSnapshot};
use crate::ingest::SymbolKind;

/// Uncategorized impact of a set of seeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImpactSet {
    pub symbols: BTreeSet<String>,
    pub files: BTreeSet<String>,
    /// Route ids (`METHOD path`)
    pub routes: BTreeSet<String>,
    pub di_consumers: BTreeSet<String>,
}

impl ImpactSet {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
            && self.files.is_empty()
            && self.routes.is_empty()
            && self.di_consumers.is_empty()
    }
}

/// Compute the impact set of `seeds` within `depth` hops.
///
/// A seed that is a node of the symbol graph is itself impacted. Unknown
/// seeds contribute nothing.
pub fn impact_set<S: AsRef<str>>(snapshot: &GraphSnapshot, seeds: &[S], depth: usize) -> ImpactSet {
    let graph = &snapshot.symbol_graph;
    let mut impacted = ImpactSet::default();

    for seed in seeds {
        let seed = seed.as_ref();
        if !graph.contains_node(seed) {
            tracing::debug!(seed, "seed not in symbol graph");
            continue;
        }
        impacted.symbols.insert(seed.to_string());
        impacted
            .symbols
            .extend(graph.predecessors(seed).map(str::to_string));
        impacted
            .symbols
            .extend(graph.reachable(seed, depth, Direction::Outgoing));
        impacted
            .symbols
            .extend(graph.reachable(seed, depth, Direction::Incoming));
    }

    let known: Vec<_> = impacted
        .symbols
        .iter()
        .filter_map(|id| snapshot.symbols.get(id))
        .collect();

    impacted.files = known.iter().map(|s| s.file_path.clone()).collect();

    let names: BTreeSet<&str> = known
        .iter()
        .map(|s| s.name.as_str())
        .filter(|name| !name.is_empty())
        .collect();
    impacted.routes = snapshot
        .routes
        .iter()
        .filter(|(_, route)| names.iter().any(|name| route.handler.contains(name)))
        .map(|(id, _)| id.clone())
        .collect();

    let class_names: Vec<&str> = known
        .iter()
        .filter(|s| s.kind == SymbolKind::Class && !s.name.is_empty())
        .map(|s| s.name.as_str())
        .collect();
    impacted.di_consumers = snapshot
        .di_edges
        .iter()
        .filter(|edge| {
            impacted.symbols.iter().any(|id| edge.provider.contains(id.as_str()))
                || class_names.iter().any(|name| edge.provider.contains(name))
        })
        .map(|edge| edge.consumer.clone())
        .collect();

    impacted
}
