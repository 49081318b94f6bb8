//! Identity scheme shared by every graph.
//!
//! All string keys are built here so that collision and overwrite
//! semantics stay consistent across extractors:
//!
//! | Entity | Key |
//! |---|---|
//! | File | repo-relative path with `/` separators |
//! | Symbol | `<file>::<name>` |
//! | Method | `<file>::<Class>.<method>` |
//! | Route | `<METHOD> <path>` |
//! | Job | job name |

use std::path::{Component, Path};

/// Separator between file path and qualified name in symbol ids.
pub const SYMBOL_SEPARATOR: &str = "::";

/// Repo-relative path rendered with forward slashes.
///
/// Returns `None` when `path` is not under `root`.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Id of a top-level symbol, or of a same-file callee.
pub fn symbol_id(file: &str, name: &str) -> String {
    format!("{file}{SYMBOL_SEPARATOR}{name}")
}

/// Id of a method inside a class.
pub fn method_id(file: &str, class: &str, method: &str) -> String {
    format!("{file}{SYMBOL_SEPARATOR}{class}.{method}")
}

/// Id of a route.
pub fn route_id(method: &str, path: &str) -> String {
    format!("{method} {path}")
}

/// Synthetic symbol id a route's `handled_by` edge points at.
pub fn handler_symbol_id(file: &str, handler: &str) -> String {
    symbol_id(file, handler)
}

/// Id of a job.
pub fn job_id(name: &str) -> String {
    name.to_string()
}

/// Entry listed under `modules` for an impacted file.
pub fn module_entry(repo: &str, file: &str) -> String {
    format!("{repo}/{file}")
}

/// Entry listed under `modules` for an impacted DI consumer.
pub fn di_module_entry(repo: &str, consumer: &str) -> String {
    format!("{repo}/DI:{consumer}")
}

/// File portion of a symbol id, if it has one.
pub fn symbol_file(id: &str) -> Option<&str> {
    id.split_once(SYMBOL_SEPARATOR).map(|(file, _)| file)
}

/// Qualified name portion of a symbol id (`Class.method`, `func`).
pub fn symbol_local_name(id: &str) -> &str {
    match id.rsplit_once(SYMBOL_SEPARATOR) {
        Some((_, name)) => name,
        None => id,
    }
}
