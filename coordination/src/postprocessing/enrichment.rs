//! Metadata enrichment of aggregated results
//!
//! Both transforms only add top-level fields and commute.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{AggregationResult, ModelName};

/// Aggregated result with optional generation time and model attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub aggregation: AggregationResult,

    /// ISO-8601 generation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Model -> weight or contribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<BTreeMap<ModelName, f64>>,
}

impl From<AggregationResult> for EnrichedResult {
    fn from(aggregation: AggregationResult) -> Self {
        Self {
            aggregation,
            timestamp: None,
            models: None,
        }
    }
}

/// Attach the current UTC time
pub fn add_timestamp(result: impl Into<EnrichedResult>) -> EnrichedResult {
    add_timestamp_at(result, Utc::now())
}

/// Attach a given time
pub fn add_timestamp_at(result: impl Into<EnrichedResult>, at: DateTime<Utc>) -> EnrichedResult {
    let mut enriched = result.into();
    enriched.timestamp = Some(at.to_rfc3339_opts(SecondsFormat::Micros, true));
    enriched
}

/// Attach a model attribution mapping
pub fn add_model_attribution(
    result: impl Into<EnrichedResult>,
    models: BTreeMap<ModelName, f64>,
) -> EnrichedResult {
    let mut enriched = result.into();
    enriched.models = Some(models);
    enriched
}
