//! Full-rebuild graph construction.
//!
//! A [`GraphBuilder`] owns one analysis run: it scans the repository,
//! extracts every file on a rayon pool, runs the selected framework parser
//! alongside, then assembles the five graphs single-threaded from results
//! sorted by path. Nothing is shared between runs.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::filter::{scan_sources, FileFilter};
use super::{ids, DiGraph, EdgeKind};
use crate::attrs;
use crate::diagnostics::{BuildDiagnostic, DiagnosticStage};
use crate::error::{Error, Result};
use crate::framework::{DiEdge, FrameworkFacts, FrameworkKind, Job, Route};
use crate::ingest::{detect_language, extract_file, FileFacts, FileRecord, Symbol};

/// Shared cancellation flag for in-flight builds.
///
/// Clones observe the same flag, so a signal handler can hold one clone
/// while workers poll another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag (e.g. one registered with a signal handler).
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts reported after a build.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct BuildStats {
    pub files: usize,
    pub symbols: usize,
    pub routes: usize,
    pub di_edges: usize,
    pub jobs: usize,
    pub diagnostics: usize,
    pub skipped_files: usize,
}

/// Immutable result of one build.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub root: PathBuf,
    pub framework: FrameworkKind,
    pub files: BTreeMap<String, FileRecord>,
    pub symbols: BTreeMap<String, Symbol>,
    /// Keyed by route id; later discoveries overwrite earlier ones
    pub routes: BTreeMap<String, Route>,
    pub di_edges: Vec<DiEdge>,
    pub jobs: BTreeMap<String, Job>,
    pub middleware_matchers: Vec<String>,
    pub file_graph: DiGraph,
    pub symbol_graph: DiGraph,
    pub route_graph: DiGraph,
    pub di_graph: DiGraph,
    pub job_graph: DiGraph,
    /// Sorted by `(path, stage)`
    pub diagnostics: Vec<BuildDiagnostic>,
    pub skipped_files: usize,
    pub built_at: DateTime<Utc>,
}

impl GraphSnapshot {
    pub fn stats(&self) -> BuildStats {
        BuildStats {
            files: self.files.len(),
            symbols: self.symbols.len(),
            routes: self.routes.len(),
            di_edges: self.di_edges.len(),
            jobs: self.jobs.len(),
            diagnostics: self.diagnostics.len(),
            skipped_files: self.skipped_files,
        }
    }
}

/// Per-file extraction outcome.
enum Extracted {
    Facts(FileFacts),
    Dropped(BuildDiagnostic),
}

/// Builder for one analysis run.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    root: PathBuf,
    framework: FrameworkKind,
    exclude: Vec<String>,
    workers: usize,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl GraphBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            framework: FrameworkKind::None,
            exclude: Vec::new(),
            workers: 0,
            timeout: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn framework(mut self, framework: FrameworkKind) -> Self {
        self.framework = framework;
        self
    }

    /// Extra repo-relative globs that are never scanned.
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    /// Worker threads for extraction; 0 lets rayon decide.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the build.
    ///
    /// Fails only when the root is missing, the configuration is invalid,
    /// or the run is cancelled or times out. Bad files become diagnostics.
    pub fn build(&self) -> Result<GraphSnapshot> {
        let started = Instant::now();
        if !self.root.is_dir() {
            return Err(Error::RepoRootMissing(self.root.clone()));
        }
        let filter = FileFilter::new(&self.root, &self.exclude)?;
        tracing::info!(
            root = %filter.root().display(),
            framework = %self.framework,
            "graph build started"
        );

        let scan = scan_sources(&filter);
        let deadline = self.timeout.map(|t| started + t);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| Error::Config(format!("cannot start worker pool: {}", e)))?;

        let (extracted, framework_facts) = pool.install(|| {
            rayon::join(
                || {
                    scan.files
                        .par_iter()
                        .map(|path| self.extract_one(&filter, path, deadline))
                        .collect::<Result<Vec<_>>>()
                },
                || {
                    let interrupted = || self.check_interrupt(deadline).is_err();
                    self.framework
                        .parser()
                        .map(|parser| parser.parse(&filter, &interrupted))
                        .unwrap_or_default()
                },
            )
        });
        let extracted = extracted?;
        self.check_interrupt(deadline)?;

        let snapshot = assemble(
            filter.root().to_path_buf(),
            self.framework,
            extracted,
            framework_facts,
            scan.skipped,
        );

        tracing::info!(
            files = snapshot.files.len(),
            symbols = snapshot.symbols.len(),
            routes = snapshot.routes.len(),
            di_edges = snapshot.di_edges.len(),
            jobs = snapshot.jobs.len(),
            diagnostics = snapshot.diagnostics.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "graph build finished"
        );
        Ok(snapshot)
    }

    fn check_interrupt(&self, deadline: Option<Instant>) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled("build cancelled".to_string()));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
            return Err(Error::Cancelled(format!("build exceeded {}s timeout", secs)));
        }
        Ok(())
    }

    fn extract_one(&self, filter: &FileFilter, path: &Path, deadline: Option<Instant>) -> Result<Extracted> {
        self.check_interrupt(deadline)?;

        let rel_path = filter.relative_path(path);
        let Some(language) = detect_language(path) else {
            return Ok(Extracted::Dropped(BuildDiagnostic::new(
                rel_path,
                DiagnosticStage::Other,
                "unsupported language",
            )));
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(path = %rel_path, error = %err, "cannot read source file");
                return Ok(Extracted::Dropped(BuildDiagnostic::new(
                    rel_path,
                    DiagnosticStage::Read,
                    err.to_string(),
                )));
            }
        };

        Ok(match extract_file(&rel_path, language, &bytes) {
            Ok(facts) => {
                for diagnostic in &facts.diagnostics {
                    tracing::warn!(path = %diagnostic.path, message = %diagnostic.message, "partial extraction");
                }
                Extracted::Facts(facts)
            }
            Err(diagnostic) => {
                tracing::warn!(path = %diagnostic.path, message = %diagnostic.message, "file skipped");
                Extracted::Dropped(diagnostic)
            }
        })
    }
}

/// Assemble graphs from extraction results. Single-threaded.
fn assemble(
    root: PathBuf,
    framework: FrameworkKind,
    extracted: Vec<Extracted>,
    framework_facts: FrameworkFacts,
    skipped_files: usize,
) -> GraphSnapshot {
    let mut diagnostics = Vec::new();
    let mut file_facts = Vec::new();
    for outcome in extracted {
        match outcome {
            Extracted::Facts(facts) => file_facts.push(facts),
            Extracted::Dropped(diagnostic) => diagnostics.push(diagnostic),
        }
    }
    file_facts.sort_by(|a, b| a.file.path.cmp(&b.file.path));

    let mut files = BTreeMap::new();
    let mut symbols = BTreeMap::new();
    let mut file_graph = DiGraph::new();
    let mut symbol_graph = DiGraph::new();

    for facts in file_facts {
        let FileFacts {
            file,
            symbols: file_symbols,
            edges,
            diagnostics: file_diagnostics,
        } = facts;

        file_graph.add_node(
            file.path.clone(),
            attrs! {
                "type" => "file",
                "language" => file.language.as_str(),
                "exports" => &file.exports,
                "sha" => &file.sha,
            },
        );
        for target in &file.imports {
            file_graph.add_edge(file.path.clone(), target.clone(), EdgeKind::Imports, attrs!());
        }

        for symbol in file_symbols {
            symbol_graph.add_node(
                symbol.id.clone(),
                attrs! {
                    "type" => "symbol",
                    "name" => &symbol.name,
                    "kind" => symbol.kind.as_str(),
                    "file" => &symbol.file_path,
                    "line" => symbol.start_line,
                },
            );
            symbols.insert(symbol.id.clone(), symbol);
        }
        for edge in edges {
            symbol_graph.add_edge(edge.source, edge.target, edge.kind, attrs!());
        }

        diagnostics.extend(file_diagnostics);
        files.insert(file.path.clone(), file);
    }

    let FrameworkFacts {
        routes: mut found_routes,
        mut di_edges,
        jobs: found_jobs,
        middleware_matchers,
        diagnostics: framework_diagnostics,
    } = framework_facts;
    diagnostics.extend(framework_diagnostics);

    found_routes.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    let mut routes = BTreeMap::new();
    for route in found_routes {
        routes.insert(route.id(), route);
    }
    let mut route_graph = DiGraph::new();
    for (id, route) in &routes {
        route_graph.add_node(
            id.clone(),
            attrs! {
                "type" => "route",
                "method" => &route.method,
                "path" => &route.path,
                "handler" => &route.handler,
                "middleware" => &route.middleware,
                "file" => &route.file_path,
                "line" => route.line,
            },
        );
        route_graph.add_edge(
            id.clone(),
            ids::handler_symbol_id(&route.file_path, &route.handler),
            EdgeKind::HandledBy,
            attrs!(),
        );
    }

    di_edges.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    let mut di_graph = DiGraph::new();
    for edge in &di_edges {
        di_graph.add_edge(
            edge.provider.clone(),
            edge.consumer.clone(),
            EdgeKind::Provides,
            attrs! { "scope" => edge.scope.as_str(), "file" => &edge.file_path },
        );
    }

    let mut jobs = BTreeMap::new();
    for job in found_jobs {
        jobs.insert(ids::job_id(&job.name), job);
    }
    let mut job_graph = DiGraph::new();
    for (id, job) in &jobs {
        job_graph.add_node(
            id.clone(),
            attrs! {
                "type" => "job",
                "schedule" => &job.schedule,
                "handler" => &job.handler,
                "file" => &job.file_path,
            },
        );
        for dependency in &job.dependencies {
            job_graph.add_edge(id.clone(), dependency.clone(), EdgeKind::DependsOn, attrs!());
        }
    }

    diagnostics.sort();

    GraphSnapshot {
        root,
        framework,
        files,
        symbols,
        routes,
        di_edges,
        jobs,
        middleware_matchers,
        file_graph,
        symbol_graph,
        route_graph,
        di_graph,
        job_graph,
        diagnostics,
        skipped_files,
        built_at: Utc::now(),
    }
}
