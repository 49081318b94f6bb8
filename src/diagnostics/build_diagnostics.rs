//! Build diagnostics for structured skip reasons and recoverable failures.
//!
//! A build never aborts because of a single bad file. Every file that is
//! skipped or fails during extraction is recorded here instead, and the
//! list is attached to the resulting snapshot in deterministic order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Reason why a file was skipped during scanning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Internal hard-coded ignore rules (node_modules/, .git/, dist/, etc.)
    IgnoredInternal,
    /// Matched by gitignore-style rules (.gitignore, .ignore)
    IgnoredByGitignore,
    /// Extension not handled by any extractor
    UnsupportedLanguage,
    /// Matched a configured exclude glob
    ExcludedByGlob,
    /// Not a regular file (directory, broken symlink, etc.)
    NotAFile,
}

impl SkipReason {
    /// Stable sort key for deterministic ordering.
    ///
    /// Lower values = higher priority in reporting.
    pub fn sort_key(&self) -> u8 {
        match self {
            SkipReason::IgnoredInternal => 0,
            SkipReason::IgnoredByGitignore => 1,
            SkipReason::UnsupportedLanguage => 2,
            SkipReason::ExcludedByGlob => 3,
            SkipReason::NotAFile => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::IgnoredInternal => "internal ignore rule",
            SkipReason::IgnoredByGitignore => "matched by gitignore",
            SkipReason::UnsupportedLanguage => "language not supported",
            SkipReason::ExcludedByGlob => "excluded by pattern",
            SkipReason::NotAFile => "not a regular file",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Stage in the build pipeline where a recoverable failure occurred.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    /// Failed to read file from filesystem
    Read,
    /// Failed to parse source code
    Parse,
    /// Malformed framework-convention input (route file, decorator, middleware)
    Framework,
    /// Anything not categorized above
    Other,
}

impl DiagnosticStage {
    pub fn sort_key(&self) -> u8 {
        match self {
            DiagnosticStage::Read => 0,
            DiagnosticStage::Parse => 1,
            DiagnosticStage::Framework => 2,
            DiagnosticStage::Other => 3,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticStage::Read => "reading file",
            DiagnosticStage::Parse => "parsing source",
            DiagnosticStage::Framework => "decoding framework conventions",
            DiagnosticStage::Other => "processing",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for DiagnosticStage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticStage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A recoverable failure attached to a single file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildDiagnostic {
    /// Path relative to the repository root
    pub path: String,
    pub stage: DiagnosticStage,
    pub message: String,
}

impl BuildDiagnostic {
    pub fn new(path: impl Into<String>, stage: DiagnosticStage, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stage,
            message: message.into(),
        }
    }

    /// Primary: path. Secondary: stage.
    pub fn sort_key(&self) -> (&str, u8) {
        (&self.path, self.stage.sort_key())
    }

    /// Format for human-readable stderr output.
    ///
    /// Example: "ERROR app/bad.py: parsing source: syntax error"
    pub fn format_stderr(&self) -> String {
        format!("ERROR {}: {}: {}", self.path, self.stage, self.message)
    }
}

impl fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_stderr())
    }
}

impl PartialOrd for BuildDiagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuildDiagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.message.cmp(&other.message))
    }
}
