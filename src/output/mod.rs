//! CLI output.
//!
//! JSON responses share one envelope carrying a schema version, an
//! execution id and a timestamp so that consumers can parse stably and
//! correlate runs with log lines.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Current JSON output schema version
pub const BLASTMAP_JSON_SCHEMA_VERSION: &str = "1.0.0";

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Human,
    /// Compact JSON, one document per line
    Json,
    /// Indented JSON
    Pretty,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            other => Err(format!("unknown output format '{}' (expected human, json or pretty)", other)),
        }
    }
}

/// Wrapper for all JSON responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    pub schema_version: String,
    pub execution_id: String,
    pub tool: String,
    /// RFC 3339, seconds precision
    pub timestamp: String,
    pub data: T,
    /// Set when results were truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
}

impl<T> JsonResponse<T> {
    pub fn new(data: T, execution_id: &str) -> Self {
        JsonResponse {
            schema_version: BLASTMAP_JSON_SCHEMA_VERSION.to_string(),
            execution_id: execution_id.to_string(),
            tool: "blastmap".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            data,
            partial: None,
        }
    }

    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = Some(partial);
        self
    }
}

/// Error payload for failed commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category
    pub error: String,
    pub message: String,
}

/// Fresh id for one CLI invocation.
pub fn generate_execution_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Render `data` in the envelope to a string.
pub fn render_json<T: Serialize>(data: T, format: OutputFormat, execution_id: &str) -> anyhow::Result<String> {
    let response = JsonResponse::new(data, execution_id);
    Ok(match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(&response)?,
        _ => serde_json::to_string(&response)?,
    })
}

/// Print `data` in the envelope to stdout.
pub fn output_json<T: Serialize>(data: T, format: OutputFormat, execution_id: &str) -> anyhow::Result<()> {
    println!("{}", render_json(data, format, execution_id)?);
    Ok(())
}
