//! Error types for blastmap.
//!
//! Per-file extraction problems are never errors: they are recorded as
//! [`BuildDiagnostic`](crate::diagnostics::BuildDiagnostic)s and the build
//! continues. The variants here cover the conditions that stop a whole
//! operation (bad configuration, missing repository root, cancellation).

use std::path::PathBuf;

/// Errors surfaced by the library API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem error outside of per-file extraction
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is structurally valid TOML but semantically invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("cannot parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// JSON (de)serialization failure during export
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Framework tag not recognised
    #[error("unknown framework tag: {0}")]
    UnknownFramework(String),

    /// Repository root does not exist or is not a directory
    #[error("repository root missing or not a directory: {0}")]
    RepoRootMissing(PathBuf),

    /// Repository name not present in the registry
    #[error("unknown repository: {0}")]
    UnknownRepo(String),

    /// Build interrupted by its cancel token or deadline
    #[error("build cancelled: {0}")]
    Cancelled(String),
}

pub type Result<T> = std::result::Result<T, Error>;
