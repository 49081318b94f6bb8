//! File filtering for build-artifact directories, gitignore-style rules and
//! configured exclude globs.
//!
//! Precedence:
//! 1. Hard internal ignores (dependency caches and VCS dirs at any depth,
//!    compiled output directly under the root)
//! 2. Gitignore-style rules (.gitignore, .ignore at the repository root)
//! 3. Language support
//! 4. Configured exclude globs
//!
//! Same inputs always produce the same decision.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path, PathBuf};

use crate::diagnostics::SkipReason;
use crate::error::{Error, Result};
use crate::ingest::detect_language;

/// Directories that are never descended into, at any depth.
pub const INTERNAL_IGNORE_DIRS: &[&str] = &[".git", "node_modules", ".venv", "venv", "__pycache__", ".next"];

/// Compiled-output directories, ignored only as direct children of the root.
/// Deeper directories with these names are ordinary source (`app/build/`).
pub const ROOT_ARTIFACT_DIRS: &[&str] = &["target", "dist", "build"];

/// Filtering state for one repository scan.
pub struct FileFilter {
    root: PathBuf,
    gitignore: Option<Gitignore>,
    exclude_patterns: Vec<globset::GlobMatcher>,
}

impl FileFilter {
    /// Create a filter rooted at `root`.
    ///
    /// `exclude_patterns` are globs matched against the repo-relative path
    /// (forward slashes). An invalid glob is a configuration error.
    pub fn new(root: &Path, exclude_patterns: &[String]) -> Result<Self> {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let gitignore = Self::load_gitignore(&root);

        let mut matchers = Vec::with_capacity(exclude_patterns.len());
        for pattern in exclude_patterns {
            let glob = globset::Glob::new(pattern).map_err(|e| {
                Error::Config(format!("invalid exclude glob '{}': {}", pattern, e))
            })?;
            matchers.push(glob.compile_matcher());
        }

        Ok(Self {
            root,
            gitignore,
            exclude_patterns: matchers,
        })
    }

    /// Root the filter was built for (canonicalized when possible).
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_gitignore(root: &Path) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);
        for name in [".gitignore", ".ignore"] {
            let path = root.join(name);
            if path.exists() {
                if let Some(err) = builder.add(&path) {
                    tracing::warn!(path = %path.display(), error = %err, "malformed ignore file");
                }
            }
        }
        match builder.build() {
            Ok(gitignore) => Some(gitignore),
            Err(err) => {
                tracing::warn!(error = %err, "ignore rules unavailable");
                None
            }
        }
    }

    /// True when a directory must not be descended into.
    pub fn is_pruned_dir(&self, path: &Path) -> bool {
        if path == self.root {
            return false;
        }
        if let Ok(rel_dir) = path.strip_prefix(&self.root) {
            if is_internal_dir(rel_dir) {
                return true;
            }
        }
        self.gitignore_matches(path, true)
    }

    /// Check whether a file should be skipped, returning the reason if so.
    pub fn should_skip(&self, path: &Path) -> Option<SkipReason> {
        if !path.is_file() {
            return Some(SkipReason::NotAFile);
        }

        if self.is_internal_ignore(path) {
            return Some(SkipReason::IgnoredInternal);
        }

        if self.gitignore_matches(path, false) {
            return Some(SkipReason::IgnoredByGitignore);
        }

        if detect_language(path).is_none() {
            return Some(SkipReason::UnsupportedLanguage);
        }

        if !self.exclude_patterns.is_empty() {
            let rel_path = self.relative_path(path);
            if self.exclude_patterns.iter().any(|m| m.is_match(&rel_path)) {
                return Some(SkipReason::ExcludedByGlob);
            }
        }

        None
    }

    fn gitignore_matches(&self, path: &Path, is_dir: bool) -> bool {
        let Some(ref gitignore) = self.gitignore else {
            return false;
        };
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        if gitignore.matched(rel, is_dir).is_ignore() {
            return true;
        }
        // Directory patterns like "generated/" also cover files below them
        let mut current = rel.parent();
        while let Some(ancestor) = current {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            if gitignore.matched(ancestor, true).is_ignore() {
                return true;
            }
            current = ancestor.parent();
        }
        false
    }

    fn is_internal_ignore(&self, path: &Path) -> bool {
        path.strip_prefix(&self.root)
            .ok()
            .and_then(Path::parent)
            .is_some_and(is_internal_dir)
    }

    /// Path relative to root, with forward slashes.
    pub fn relative_path(&self, path: &Path) -> String {
        crate::graph::ids::relative_path(&self.root, path)
            .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/"))
    }
}

/// True when the repo-relative directory `rel_dir` lies in an ignored tree.
fn is_internal_dir(rel_dir: &Path) -> bool {
    rel_dir
        .components()
        .filter_map(|component| match component {
            Component::Normal(dir) => Some(dir.to_string_lossy()),
            _ => None,
        })
        .enumerate()
        .any(|(depth, dir)| {
            INTERNAL_IGNORE_DIRS.contains(&dir.as_ref())
                || (depth == 0 && ROOT_ARTIFACT_DIRS.contains(&dir.as_ref()))
        })
}

/// Result of walking a repository.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Supported source files, sorted by path
    pub files: Vec<PathBuf>,
    /// Files looked at and rejected (pruned directories are not counted)
    pub skipped: usize,
}

/// Walk `filter.root()` and collect every supported source file.
///
/// Build-artifact and gitignored directories are pruned without being
/// entered. The result is sorted so downstream assembly is independent of
/// directory iteration order.
pub fn scan_sources(filter: &FileFilter) -> ScanResult {
    let mut result = ScanResult::default();

    let walker = walkdir::WalkDir::new(filter.root())
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && filter.is_pruned_dir(entry.path())));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "directory walk error");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        match filter.should_skip(entry.path()) {
            None => result.files.push(entry.into_path()),
            Some(reason) => {
                tracing::trace!(path = %entry.path().display(), %reason, "skipped");
                result.skipped += 1;
            }
        }
    }

    result.files.sort();
    result
}
