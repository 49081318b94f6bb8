//! TOML configuration.
//!
//! Resolution order: explicit path, then `blastmap.toml` in the working
//! directory, then built-in defaults. `BLASTMAP_*` environment variables
//! override file values; the result is validated before use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::framework::FrameworkKind;
use crate::impact::Breakage;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "blastmap.toml";

/// Traversal and build settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Depth used when a request names none
    #[serde(default = "default_depth")]
    pub default_depth: usize,

    /// Requests above this depth are clamped
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Max raw symbol ids listed under `modules` per repository
    #[serde(default = "default_module_symbol_cap")]
    pub module_symbol_cap: usize,

    /// Extraction threads; 0 = one per CPU
    #[serde(default)]
    pub workers: usize,

    /// 0 disables the timeout
    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,

    /// Repo-relative globs that are never scanned
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_depth() -> usize {
    3
}

fn default_max_depth() -> usize {
    10
}

fn default_module_symbol_cap() -> usize {
    20
}

fn default_build_timeout_secs() -> u64 {
    300
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
            max_depth: default_max_depth(),
            module_symbol_cap: default_module_symbol_cap(),
            workers: 0,
            build_timeout_secs: default_build_timeout_secs(),
            exclude: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Requested depth (or the default) clamped into `[0, max_depth]`.
    pub fn clamp_depth(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_depth).min(self.max_depth)
    }

    pub fn build_timeout(&self) -> Option<std::time::Duration> {
        (self.build_timeout_secs > 0).then(|| std::time::Duration::from_secs(self.build_timeout_secs))
    }
}

/// One named repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoConfig {
    /// Relative paths resolve against the config file's directory
    pub path: PathBuf,

    /// Framework tag (`none`, `file-tree-routing`/`nextjs`,
    /// `annotation-convention`/`nestjs`)
    #[serde(default = "default_framework")]
    pub framework: String,
}

fn default_framework() -> String {
    "none".to_string()
}

impl RepoConfig {
    pub fn framework_kind(&self) -> Result<FrameworkKind> {
        self.framework.parse()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub repos: BTreeMap<String, RepoConfig>,

    /// Past breakages keyed by `<repo>:<symbol id>`
    #[serde(default)]
    pub history: BTreeMap<String, Vec<Breakage>>,
}

impl Config {
    /// Load, apply environment overrides and validate.
    ///
    /// A missing explicit path is an error; a missing default file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (mut config, source) = match path {
            Some(path) => (Self::read_toml_file(path)?, Some(path.to_path_buf())),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    (Self::read_toml_file(local)?, Some(local.to_path_buf()))
                } else {
                    (Self::default(), None)
                }
            }
        };

        if let Some(base) = source.as_deref().and_then(Path::parent) {
            config.resolve_repo_paths(base);
        }
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        match &source {
            Some(path) => tracing::debug!(path = %path.display(), repos = config.repos.len(), "configuration loaded"),
            None => tracing::debug!("no configuration file, using defaults"),
        }
        Ok(config)
    }

    fn read_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&text)?)
    }

    fn resolve_repo_paths(&mut self, base: &Path) {
        for repo in self.repos.values_mut() {
            if repo.path.is_relative() {
                repo.path = base.join(&repo.path);
            }
        }
    }

    /// Override analysis settings from `BLASTMAP_*` variables.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, value: Option<String>) -> Option<T> {
            let value = value?;
            match value.trim().parse() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    tracing::warn!(key, value = %value, "ignoring unparsable environment override");
                    None
                }
            }
        }

        if let Some(depth) = parsed("BLASTMAP_DEFAULT_DEPTH", lookup("BLASTMAP_DEFAULT_DEPTH")) {
            self.analysis.default_depth = depth;
        }
        if let Some(workers) = parsed("BLASTMAP_WORKERS", lookup("BLASTMAP_WORKERS")) {
            self.analysis.workers = workers;
        }
        if let Some(secs) = parsed("BLASTMAP_BUILD_TIMEOUT_SECS", lookup("BLASTMAP_BUILD_TIMEOUT_SECS")) {
            self.analysis.build_timeout_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.analysis.default_depth > self.analysis.max_depth {
            return Err(Error::Config(format!(
                "default_depth {} exceeds max_depth {}",
                self.analysis.default_depth, self.analysis.max_depth
            )));
        }
        for (name, repo) in &self.repos {
            repo.framework_kind()
                .map_err(|e| Error::Config(format!("repository '{}': {}", name, e)))?;
        }
        for pattern in &self.analysis.exclude {
            globset::Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid exclude glob '{}': {}", pattern, e)))?;
        }
        Ok(())
    }
}
