//! Query surface for tool-calling clients.
//!
//! [`CodeIntelligence`] answers every query from the published snapshots
//! in its [`RepoRegistry`]. Unknown repositories and symbols come back as
//! [`QueryError::NotFound`] values; nothing here panics on bad input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::framework::{DiEdge, Job, Route};
use crate::graph::builder::BuildStats;
use crate::graph::query::{self, SymbolMatch};
use crate::graph::{CancelToken, GraphSnapshot};
use crate::impact::{self, BlastRadius, BlastRadiusEngine, Breakage, ChangeSpec, ImpactReport, ImpactSet};
use crate::ingest::{FileRecord, Symbol};
use crate::registry::RepoRegistry;

/// Depth used for `dependencies` in [`SymbolDetails`].
pub const SYMBOL_DETAIL_DEPTH: usize = 2;

/// Recoverable query failure, returned as a value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum QueryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },
}

impl QueryError {
    fn repo(name: &str) -> Self {
        QueryError::NotFound {
            kind: "repository".to_string(),
            id: name.to_string(),
        }
    }

    fn symbol(id: &str) -> Self {
        QueryError::NotFound {
            kind: "symbol".to_string(),
            id: id.to_string(),
        }
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Id with whatever the symbol table knows about it.
///
/// Call targets that were never extracted (cross-file or external calls)
/// carry only their id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl SymbolRef {
    fn resolve(snapshot: &GraphSnapshot, id: &str) -> Self {
        let symbol = snapshot.symbols.get(id);
        Self {
            id: id.to_string(),
            name: symbol.map(|s| s.name.clone()),
            file: symbol.map(|s| s.file_path.clone()),
            line: symbol.map(|s| s.start_line),
        }
    }
}

/// A symbol with its immediate neighbourhood.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolDetails {
    pub symbol: Symbol,
    pub callers: Vec<String>,
    pub callees: Vec<String>,
    /// Forward reach within [`SYMBOL_DETAIL_DEPTH`] hops
    pub dependencies: Vec<String>,
}

/// Facade over a registry of built repositories.
pub struct CodeIntelligence {
    registry: RepoRegistry,
    history: BTreeMap<String, Vec<Breakage>>,
}

impl CodeIntelligence {
    pub fn new(registry: RepoRegistry) -> Self {
        Self {
            registry,
            history: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> crate::Result<Self> {
        Ok(Self {
            registry: RepoRegistry::from_config(config)?,
            history: config.history.clone(),
        })
    }

    pub fn registry(&self) -> &RepoRegistry {
        &self.registry
    }

    /// Rebuild one repository and publish its snapshot.
    pub fn build(&self, repo: &str, cancel: &CancelToken) -> crate::Result<BuildStats> {
        Ok(self.registry.build(repo, cancel)?.stats())
    }

    /// Build `repo` unless it already has a snapshot.
    pub fn ensure_built(&self, repo: &str, cancel: &CancelToken) -> crate::Result<()> {
        if self.registry.snapshot(repo).is_none() {
            self.registry.build(repo, cancel)?;
        }
        Ok(())
    }

    fn snapshot(&self, repo: &str) -> QueryResult<Arc<GraphSnapshot>> {
        self.registry.snapshot(repo).ok_or_else(|| QueryError::repo(repo))
    }

    fn depth(&self, requested: Option<usize>) -> usize {
        self.registry.analysis().clamp_depth(requested)
    }

    pub fn search_code(&self, repo: &str, query: &str, top_k: usize) -> QueryResult<Vec<SymbolMatch>> {
        let snapshot = self.snapshot(repo)?;
        Ok(query::search_symbols(&snapshot, query, top_k))
    }

    pub fn get_symbol(&self, repo: &str, symbol_id: &str) -> QueryResult<SymbolDetails> {
        let snapshot = self.snapshot(repo)?;
        let symbol = query::symbol(&snapshot, symbol_id)
            .cloned()
            .ok_or_else(|| QueryError::symbol(symbol_id))?;
        Ok(SymbolDetails {
            symbol,
            callers: query::callers(&snapshot, symbol_id),
            callees: query::callees(&snapshot, symbol_id),
            dependencies: query::transitive_dependencies(&snapshot, symbol_id, SYMBOL_DETAIL_DEPTH)
                .into_iter()
                .collect(),
        })
    }

    pub fn callers(&self, repo: &str, symbol_id: &str) -> QueryResult<Vec<String>> {
        let snapshot = self.snapshot(repo)?;
        Ok(query::callers(&snapshot, symbol_id))
    }

    pub fn callees(&self, repo: &str, symbol_id: &str) -> QueryResult<Vec<String>> {
        let snapshot = self.snapshot(repo)?;
        Ok(query::callees(&snapshot, symbol_id))
    }

    /// Callers with their file and line where known.
    pub fn who_calls(&self, repo: &str, symbol_id: &str) -> QueryResult<Vec<SymbolRef>> {
        let snapshot = self.snapshot(repo)?;
        Ok(query::callers(&snapshot, symbol_id)
            .iter()
            .map(|id| SymbolRef::resolve(&snapshot, id))
            .collect())
    }

    /// Forward reach of `symbol_id`; `depth` defaults and clamps per config.
    pub fn list_dependencies(
        &self,
        repo: &str,
        symbol_id: &str,
        depth: Option<usize>,
    ) -> QueryResult<Vec<SymbolRef>> {
        let snapshot = self.snapshot(repo)?;
        Ok(query::transitive_dependencies(&snapshot, symbol_id, self.depth(depth))
            .iter()
            .map(|id| SymbolRef::resolve(&snapshot, id))
            .collect())
    }

    pub fn impact_set(&self, repo: &str, seeds: &[String], depth: Option<usize>) -> QueryResult<ImpactSet> {
        let snapshot = self.snapshot(repo)?;
        Ok(impact::impact_set(&snapshot, seeds, self.depth(depth)))
    }

    /// Blast radius across `repos`; missing repositories become gaps.
    pub fn blast_radius_of(&self, change: &ChangeSpec, repos: &[String], depth: Option<usize>) -> BlastRadius {
        self.engine().compute(change, repos, self.depth(depth))
    }

    pub fn impact_of(&self, change: &ChangeSpec, repos: &[String], depth: Option<usize>) -> ImpactReport {
        self.engine().report(change, repos, self.depth(depth))
    }

    fn engine(&self) -> BlastRadiusEngine<'_> {
        BlastRadiusEngine::new(&self.registry).with_history(self.history.clone())
    }

    pub fn list_files(&self, repo: &str) -> QueryResult<Vec<FileRecord>> {
        Ok(self.snapshot(repo)?.files.values().cloned().collect())
    }

    pub fn list_symbols(&self, repo: &str) -> QueryResult<Vec<Symbol>> {
        Ok(self.snapshot(repo)?.symbols.values().cloned().collect())
    }

    pub fn list_routes(&self, repo: &str) -> QueryResult<Vec<Route>> {
        Ok(self.snapshot(repo)?.routes.values().cloned().collect())
    }

    pub fn list_di_edges(&self, repo: &str) -> QueryResult<Vec<DiEdge>> {
        Ok(self.snapshot(repo)?.di_edges.clone())
    }

    pub fn list_jobs(&self, repo: &str) -> QueryResult<Vec<Job>> {
        Ok(self.snapshot(repo)?.jobs.values().cloned().collect())
    }
}
