//! Structured diagnostics for graph builds.
//!
//! Provides deterministic, sortable diagnostic types for skip reasons and
//! recoverable per-file failures.

pub mod build_diagnostics;

pub use build_diagnostics::{BuildDiagnostic, DiagnosticStage, SkipReason};
