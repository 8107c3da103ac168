//! Post-aggregation passes
//!
//! - `noise_filter`: drop low-confidence candidate labels
//! - `enrichment`: attach timestamps and model attribution
//! - `formatter`: render results as JSON or plain text

pub mod enrichment;
pub mod formatter;
pub mod noise_filter;

pub use enrichment::{add_model_attribution, add_timestamp, add_timestamp_at, EnrichedResult};
pub use formatter::{format_to_json, format_to_plain_text, OutputFormat};
pub use noise_filter::filter_low_confidence;
