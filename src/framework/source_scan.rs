//! Source loading shared by the framework parsers.

use std::path::{Path, PathBuf};

use crate::diagnostics::{BuildDiagnostic, DiagnosticStage};
use crate::graph::filter::{scan_sources, FileFilter};

/// A source file selected by a framework parser.
pub(crate) struct SourceFile {
    /// Repo-relative, forward slashes
    pub rel_path: String,
    pub text: String,
}

/// Repo-relative paths of every scannable source file, sorted.
pub(crate) fn list_sources(filter: &FileFilter) -> Vec<(String, PathBuf)> {
    scan_sources(filter)
        .files
        .into_iter()
        .map(|path| (filter.relative_path(&path), path))
        .collect()
}

/// Read one file, turning failures into a diagnostic.
pub(crate) fn read_source(
    rel_path: &str,
    path: &Path,
    diagnostics: &mut Vec<BuildDiagnostic>,
) -> Option<SourceFile> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(SourceFile {
            rel_path: rel_path.to_string(),
            text,
        }),
        Err(err) => {
            tracing::warn!(path = rel_path, error = %err, "cannot read framework source");
            diagnostics.push(BuildDiagnostic::new(
                rel_path,
                DiagnosticStage::Read,
                err.to_string(),
            ));
            None
        }
    }
}

/// Record malformed framework input.
pub(crate) fn malformed(diagnostics: &mut Vec<BuildDiagnostic>, rel_path: &str, message: impl Into<String>) {
    let message = message.into();
    tracing::warn!(path = rel_path, %message, "malformed framework input");
    diagnostics.push(BuildDiagnostic::new(rel_path, DiagnosticStage::Framework, message));
}
