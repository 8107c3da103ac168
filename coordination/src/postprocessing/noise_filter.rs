//! Low-confidence filtering of aggregated results

use tracing::debug;

use crate::state::AggregationResult;

/// Drop every candidate label scoring below `threshold`
///
/// The winner holds the maximal score, so it survives whenever anything
/// does and the result only changes when everything is dropped, collapsing
/// to the "Uncertain" sentinel.
pub fn filter_low_confidence(result: &AggregationResult, threshold: f64) -> AggregationResult {
    let kept = result.details.retain(|_, score| score >= threshold);
    let dropped = result.details.len() - kept.len();

    let filtered = AggregationResult::from_details(kept);
    debug!(
        threshold,
        dropped,
        result = %filtered.result,
        "Filtered low-confidence labels"
    );
    filtered
}
