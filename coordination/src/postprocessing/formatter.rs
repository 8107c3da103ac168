//! Output formatting for aggregated results

use std::fmt::Write as _;

use serde::Serialize;

use super::enrichment::EnrichedResult;
use crate::error::{EnsembleError, EnsembleResult};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(EnsembleError::invalid_input(format!(
                "Unsupported output format '{}'. Supported formats: json, text",
                other
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Pretty-printed JSON
pub fn format_to_json<T: Serialize + ?Sized>(value: &T) -> EnsembleResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Plain text: the result line followed by two-decimal scores
pub fn format_to_plain_text(result: &EnrichedResult) -> String {
    let mut out = format!("Result: {}\nDetails:\n", result.aggregation.result);
    for (label, score) in result.aggregation.details.iter() {
        let _ = writeln!(out, "  {}: {:.2}", label, score);
    }
    if let Some(timestamp) = &result.timestamp {
        let _ = writeln!(out, "Timestamp: {}", timestamp);
    }
    if let Some(models) = &result.models {
        out.push_str("Models:\n");
        for (model, weight) in models {
            let _ = writeln!(out, "  {}: {:.2}", model, weight);
        }
    }
    out
}
