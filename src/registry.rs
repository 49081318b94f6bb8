//! Named repositories and their current graph snapshots.
//!
//! Each repository holds at most one published [`GraphSnapshot`]. A build
//! runs off to the side and replaces the snapshot pointer only when it
//! succeeds, so readers see either the previous complete snapshot or the
//! new one, never a partial build.

use arc_swap::ArcSwapOption;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AnalysisConfig, Config};
use crate::error::{Error, Result};
use crate::framework::FrameworkKind;
use crate::graph::{CancelToken, GraphBuilder, GraphSnapshot};

struct RepoEntry {
    root: PathBuf,
    framework: FrameworkKind,
    snapshot: ArcSwapOption<GraphSnapshot>,
}

/// Repository name → root, framework and current snapshot.
pub struct RepoRegistry {
    analysis: AnalysisConfig,
    repos: BTreeMap<String, RepoEntry>,
}

impl RepoRegistry {
    pub fn new(analysis: AnalysisConfig) -> Self {
        Self {
            analysis,
            repos: BTreeMap::new(),
        }
    }

    /// Registry with every repository named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new(config.analysis.clone());
        for (name, repo) in &config.repos {
            registry.register(name.clone(), repo.path.clone(), repo.framework_kind()?);
        }
        Ok(registry)
    }

    /// Add or replace a repository; any previous snapshot is dropped.
    pub fn register(&mut self, name: impl Into<String>, root: impl Into<PathBuf>, framework: FrameworkKind) {
        self.repos.insert(
            name.into(),
            RepoEntry {
                root: root.into(),
                framework,
                snapshot: ArcSwapOption::empty(),
            },
        );
    }

    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }

    pub fn contains(&self, name: &str) -> bool {
        self.repos.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repos.keys().map(String::as_str)
    }

    pub fn root(&self, name: &str) -> Option<&Path> {
        self.repos.get(name).map(|entry| entry.root.as_path())
    }

    /// Current snapshot, if the repository is known and has been built.
    pub fn snapshot(&self, name: &str) -> Option<Arc<GraphSnapshot>> {
        self.repos.get(name).and_then(|entry| entry.snapshot.load_full())
    }

    /// Builder configured for `name`.
    pub fn builder(&self, name: &str, cancel: &CancelToken) -> Result<GraphBuilder> {
        let entry = self
            .repos
            .get(name)
            .ok_or_else(|| Error::UnknownRepo(name.to_string()))?;
        Ok(GraphBuilder::new(&entry.root)
            .framework(entry.framework)
            .exclude(self.analysis.exclude.clone())
            .workers(self.analysis.workers)
            .timeout(self.analysis.build_timeout())
            .cancel_token(cancel.clone()))
    }

    /// Rebuild `name` and publish the result.
    ///
    /// On failure the previously published snapshot stays in place.
    pub fn build(&self, name: &str, cancel: &CancelToken) -> Result<Arc<GraphSnapshot>> {
        let builder = self.builder(name, cancel)?;
        let snapshot = Arc::new(builder.build()?);
        self.publish(name, Arc::clone(&snapshot))?;
        Ok(snapshot)
    }

    /// Rebuild every repository; failures are logged and returned per name.
    pub fn build_all(&self, cancel: &CancelToken) -> Vec<(String, Result<Arc<GraphSnapshot>>)> {
        self.repos
            .keys()
            .map(|name| {
                let result = self.build(name, cancel);
                if let Err(err) = &result {
                    tracing::warn!(repo = %name, error = %err, "repository build failed");
                }
                (name.clone(), result)
            })
            .collect()
    }

    /// Replace the published snapshot of `name`.
    pub fn publish(&self, name: &str, snapshot: Arc<GraphSnapshot>) -> Result<()> {
        let entry = self
            .repos
            .get(name)
            .ok_or_else(|| Error::UnknownRepo(name.to_string()))?;
        entry.snapshot.store(Some(snapshot));
        Ok(())
    }
}
