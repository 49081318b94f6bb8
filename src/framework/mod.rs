//! Framework convention parsers.
//!
//! Each convention implements [`FrameworkParser`] and turns a repository
//! into routes, DI edges and jobs. Handler and provider names are plain
//! strings; matching them to symbols happens later in impact analysis.
//!
//! New conventions are added as new implementations, selected through
//! [`FrameworkKind`].

pub mod annotation;
pub mod file_tree;
pub mod route_path;
mod source_scan;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::diagnostics::BuildDiagnostic;
use crate::error::Error;
use crate::graph::FileFilter;

pub use annotation::AnnotationParser;
pub use file_tree::FileTreeParser;

/// Method tag for handlers that serve several HTTP methods.
pub const MULTI_METHOD: &str = "GET/POST";

/// HTTP methods recognised as per-method route handlers, in emission order.
pub const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"];

/// A web route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    /// `GET`, `POST`, ... or [`MULTI_METHOD`]
    pub method: String,
    /// Path pattern (`/users/:id`)
    pub path: String,
    /// `<Class>.<method>` or `<file stem>.<export>`
    pub handler: String,
    #[serde(default)]
    pub middleware: Vec<String>,
    pub file_path: String,
    /// 1-indexed
    pub line: usize,
}

impl Route {
    pub fn id(&self) -> String {
        crate::graph::ids::route_id(&self.method, &self.path)
    }
}

/// DI lifetime.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DiScope {
    #[default]
    Singleton,
    Transient,
    Request,
}

impl DiScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiScope::Singleton => "singleton",
            DiScope::Transient => "transient",
            DiScope::Request => "request",
        }
    }
}

impl fmt::Display for DiScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider → consumer injection relation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiEdge {
    /// Injected type or token
    pub provider: String,
    /// Class receiving the injection
    pub consumer: String,
    pub scope: DiScope,
    pub file_path: String,
}

/// Scheduled or queue-triggered job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    /// Cron expression or `every <n>ms`; `None` for queue-triggered jobs
    pub schedule: Option<String>,
    pub handler: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub file_path: String,
}

/// Output of one framework parser run.
#[derive(Debug, Clone, Default)]
pub struct FrameworkFacts {
    pub routes: Vec<Route>,
    pub di_edges: Vec<DiEdge>,
    pub jobs: Vec<Job>,
    /// Patterns declared by a middleware file; not wired into route edges
    pub middleware_matchers: Vec<String>,
    pub diagnostics: Vec<BuildDiagnostic>,
}

/// One framework convention.
pub trait FrameworkParser: Send + Sync {
    /// Tag used in logs.
    fn name(&self) -> &'static str;

    /// Decode the repository under `filter.root()`.
    ///
    /// Never fails as a whole: unreadable or malformed files become
    /// diagnostics in the returned facts. `interrupted` is polled before
    /// each file; once it returns true the facts gathered so far are
    /// returned.
    fn parse(&self, filter: &FileFilter, interrupted: &dyn Fn() -> bool) -> FrameworkFacts;
}

/// Framework selector.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FrameworkKind {
    #[default]
    None,
    /// Directory layout defines routes (Next.js style)
    FileTreeRouting,
    /// Decorators define routes, DI and jobs (NestJS style)
    AnnotationConvention,
}

impl FrameworkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameworkKind::None => "none",
            FrameworkKind::FileTreeRouting => "file-tree-routing",
            FrameworkKind::AnnotationConvention => "annotation-convention",
        }
    }

    /// Parser for this convention, or `None` when no framework is selected.
    pub fn parser(&self) -> Option<Box<dyn FrameworkParser>> {
        match self {
            FrameworkKind::None => None,
            FrameworkKind::FileTreeRouting => Some(Box::new(FileTreeParser)),
            FrameworkKind::AnnotationConvention => Some(Box::new(AnnotationParser)),
        }
    }
}

impl fmt::Display for FrameworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameworkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(FrameworkKind::None),
            "file-tree-routing" | "file-tree" | "nextjs" | "next" => Ok(FrameworkKind::FileTreeRouting),
            "annotation-convention" | "annotation" | "nestjs" | "nest" => {
                Ok(FrameworkKind::AnnotationConvention)
            }
            other => Err(Error::UnknownFramework(other.to_string())),
        }
    }
}
