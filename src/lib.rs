//! blastmap: code graphs and change blast radius for application repositories
//!
//! blastmap walks a repository, extracts files, symbols and call/import
//! relations with tree-sitter, layers framework conventions (file-tree
//! routing, decorator-based controllers, dependency injection, scheduled
//! jobs) on top, and answers impact questions over the resulting graphs.
//!
//! # Position Conventions
//!
//! - **Line positions**: 1-indexed (line 1 is the first line)
//! - **Paths**: relative to the repository root, `/`-separated
//!
//! # Graphs
//!
//! A build produces five directed graphs held in a [`GraphSnapshot`]:
//! files (imports), symbols (calls/contains/inherits), routes
//! (handled_by), dependency injection (provides) and jobs (depends_on).
//! Snapshots are immutable; a rebuild publishes a new one through the
//! [`RepoRegistry`] only when it completes.
//!
//! # Example
//!
//! ```no_run
//! use blastmap::{FrameworkKind, GraphBuilder};
//!
//! let snapshot = GraphBuilder::new("./shop")
//!     .framework(FrameworkKind::FileTreeRouting)
//!     .build()?;
//! println!("{} routes", snapshot.routes.len());
//! # Ok::<(), blastmap::Error>(())
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod framework;
pub mod graph;
pub mod impact;
pub mod ingest;
pub mod output;
pub mod registry;
pub mod service;

pub use config::{AnalysisConfig, Config, RepoConfig};
pub use diagnostics::{BuildDiagnostic, DiagnosticStage, SkipReason};
pub use error::{Error, Result};
pub use framework::{DiEdge, DiScope, FrameworkKind, FrameworkParser, Job, Route};
pub use graph::builder::BuildStats;
pub use graph::{export_graphs, CancelToken, DiGraph, Direction, EdgeKind, FileFilter, GraphBuilder, GraphSnapshot};
pub use impact::{
    extract_keywords, impact_set, BlastRadius, BlastRadiusEngine, Breakage, ChangeSpec, ImpactReport, ImpactSet,
    RiskLevel,
};
pub use ingest::{detect_language, FileRecord, Language, Symbol, SymbolKind};
pub use registry::RepoRegistry;
pub use service::{CodeIntelligence, QueryError, QueryResult, SymbolDetails, SymbolRef};
