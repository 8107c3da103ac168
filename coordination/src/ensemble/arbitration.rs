//! Disagreement resolution across batched model predictions
//!
//! Item *i* collects the *i*-th prediction of every model. The most
//! frequent label wins when its support fraction is strictly greater than
//! the threshold; otherwise the slot is [`Resolution::NoConsensus`]. Output
//! length always equals the batch length.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{EnsembleError, EnsembleResult};
use crate::state::{BatchPredictions, Label, Resolution};

/// Default consensus threshold
pub const DEFAULT_DISAGREEMENT_THRESHOLD: f64 = 0.2;

/// Resolves per-item consensus under a fixed threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisagreementResolver {
    threshold: f64,
}

impl DisagreementResolver {
    /// Create a resolver; `threshold` must lie in [0, 1]
    pub fn new(threshold: f64) -> EnsembleResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EnsembleError::invalid_input(format!(
                "Disagreement threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Resolve every item of the batch
    pub fn resolve(&self, batch: &BatchPredictions) -> EnsembleResult<Vec<Resolution>> {
        let Some(items) = batch_len(batch)? else {
            return Ok(Vec::new());
        };
        let models = batch.len();

        let resolutions: Vec<Resolution> = (0..items)
            .map(|i| {
                match mode_of(batch.values().map(|preds| &preds[i])) {
                    Some((mode, count)) if count as f64 / models as f64 > self.threshold => {
                        Resolution::Consensus(mode.clone())
                    }
                    _ => Resolution::NoConsensus,
                }
            })
            .collect();

        debug!(
            items,
            models,
            threshold = self.threshold,
            unresolved = no_consensus_items(&resolutions).len(),
            "Resolved batch"
        );
        Ok(resolutions)
    }
}

impl Default for DisagreementResolver {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DISAGREEMENT_THRESHOLD,
        }
    }
}

/// Positions that did not reach consensus
pub fn no_consensus_items(resolutions: &[Resolution]) -> Vec<usize> {
    resolutions
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_consensus())
        .map(|(i, _)| i)
        .collect()
}

/// Common sequence length across models; `None` for an empty batch
pub(crate) fn batch_len(batch: &BatchPredictions) -> EnsembleResult<Option<usize>> {
    let mut models = batch.iter();
    let Some((_, first)) = models.next() else {
        return Ok(None);
    };
    let expected = first.len();
    for (model, preds) in models {
        if preds.len() != expected {
            return Err(EnsembleError::shape_mismatch(
                format!("predictions of model '{}'", model),
                expected,
                preds.len(),
            ));
        }
    }
    Ok(Some(expected))
}

/// Most frequent label and its count; ties go to the smallest label
fn mode_of<'a>(labels: impl Iterator<Item = &'a Label>) -> Option<(&'a Label, usize)> {
    let mut counts: BTreeMap<&Label, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut best: Option<(&Label, usize)> = None;
    for (label, count) in counts {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((label, count)),
        }
    }
    best
}
