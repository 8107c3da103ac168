//! JSON persistence for learned model weights
//!
//! Only weights and the thresholds they were learned under are persisted;
//! model artifacts belong to the model pool.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::ModelName;
use crate::error::{EnsembleError, EnsembleResult};

/// Serializable snapshot of a weight adjuster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    /// Learning rate the weights were updated with
    pub learning_rate: f64,

    /// Decay factor the weights were updated with
    pub decay_factor: f64,

    /// Consensus threshold in effect when saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disagreement_threshold: Option<f64>,

    /// Per-model weights
    pub weights: BTreeMap<ModelName, f64>,

    /// Save timestamp
    pub saved_at: DateTime<Utc>,
}

impl WeightSnapshot {
    /// Create a snapshot stamped with the current time
    pub fn new(learning_rate: f64, decay_factor: f64, weights: BTreeMap<ModelName, f64>) -> Self {
        Self {
            learning_rate,
            decay_factor,
            disagreement_threshold: None,
            weights,
            saved_at: Utc::now(),
        }
    }

    /// Record the consensus threshold alongside the weights
    pub fn with_disagreement_threshold(mut self, threshold: f64) -> Self {
        self.disagreement_threshold = Some(threshold);
        self
    }
}

/// Save a weight snapshot as pretty JSON, creating parent directories
pub fn save_snapshot(snapshot: &WeightSnapshot, path: &Path) -> EnsembleResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), models = snapshot.weights.len(), "Saved weight snapshot");
    Ok(())
}

/// Load a weight snapshot
pub fn load_snapshot(path: &Path) -> EnsembleResult<WeightSnapshot> {
    if !path.exists() {
        return Err(EnsembleError::resource_not_found(path));
    }
    let json = std::fs::read_to_string(path)?;
    let snapshot: WeightSnapshot = serde_json::from_str(&json)?;
    debug!(path = %path.display(), models = snapshot.weights.len(), "Loaded weight snapshot");
    Ok(snapshot)
}
