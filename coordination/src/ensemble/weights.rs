//! Dynamic per-model weight adjustment
//!
//! After each evaluation round a model's weight becomes
//! `weight * decay_factor + learning_rate * performance_score`, starting
//! from 1.0 for unseen models.
//!
//! Weights are not renormalized or clamped. They need not sum to 1 and grow
//! without bound under persistently high scores with `decay_factor` near 1.
//! Callers feeding weights back in as voting confidences must clamp or
//! renormalize them if they need bounded values.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::state::{ModelName, WeightSnapshot};

/// Weight assigned to a model on first observation
pub const INITIAL_WEIGHT: f64 = 1.0;

/// Default learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Default decay factor
pub const DEFAULT_DECAY_FACTOR: f64 = 0.99;

/// Owns the per-model weight map
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicWeightAdjuster {
    weights: BTreeMap<ModelName, f64>,
    learning_rate: f64,
    decay_factor: f64,
}

impl DynamicWeightAdjuster {
    /// Create an adjuster with an empty weight map
    pub fn new(learning_rate: f64, decay_factor: f64) -> Self {
        Self {
            weights: BTreeMap::new(),
            learning_rate,
            decay_factor,
        }
    }

    /// Seed the weight map
    pub fn with_initial_weights(mut self, weights: BTreeMap<ModelName, f64>) -> Self {
        self.weights = weights;
        self
    }

    /// Rebuild an adjuster from a persisted snapshot
    pub fn from_snapshot(snapshot: &WeightSnapshot) -> Self {
        Self::new(snapshot.learning_rate, snapshot.decay_factor)
            .with_initial_weights(snapshot.weights.clone())
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn decay_factor(&self) -> f64 {
        self.decay_factor
    }

    /// Apply one update for `model` and return its new weight
    pub fn update_weight(&mut self, model: &str, performance_score: f64) -> f64 {
        let weight = self
            .weights
            .entry(model.to_string())
            .or_insert(INITIAL_WEIGHT);
        let previous = *weight;
        *weight = previous * self.decay_factor + self.learning_rate * performance_score;

        debug!(
            model,
            previous,
            current = *weight,
            performance_score,
            "Updated model weight"
        );
        *weight
    }

    /// Current weight of `model`, if it has been observed
    pub fn weight(&self, model: &str) -> Option<f64> {
        self.weights.get(model).copied()
    }

    /// Snapshot of all weights
    pub fn get_weights(&self) -> BTreeMap<ModelName, f64> {
        self.weights.clone()
    }

    /// Persistable snapshot of weights and update parameters
    pub fn snapshot(&self) -> WeightSnapshot {
        WeightSnapshot::new(self.learning_rate, self.decay_factor, self.get_weights())
    }
}

impl Default for DynamicWeightAdjuster {
    fn default() -> Self {
        Self::new(DEFAULT_LEARNING_RATE, DEFAULT_DECAY_FACTOR)
    }
}

/// Clonable handle serializing access to one adjuster
///
/// Every update and read takes the same lock, so concurrent evaluation
/// rounds cannot lose updates to a model's weight.
#[derive(Debug, Clone, Default)]
pub struct SharedWeightAdjuster {
    inner: Arc<Mutex<DynamicWeightAdjuster>>,
}

impl SharedWeightAdjuster {
    pub fn new(adjuster: DynamicWeightAdjuster) -> Self {
        Self {
            inner: Arc::new(Mutex::new(adjuster)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DynamicWeightAdjuster> {
        // A panicked writer leaves a fully applied or untouched entry
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply one update under the lock and return `(previous, current)`
    pub fn update_weight(&self, model: &str, performance_score: f64) -> (Option<f64>, f64) {
        let mut adjuster = self.lock();
        let previous = adjuster.weight(model);
        let current = adjuster.update_weight(model, performance_score);
        (previous, current)
    }

    pub fn weight(&self, model: &str) -> Option<f64> {
        self.lock().weight(model)
    }

    pub fn get_weights(&self) -> BTreeMap<ModelName, f64> {
        self.lock().get_weights()
    }

    pub fn snapshot(&self) -> WeightSnapshot {
        self.lock().snapshot()
    }
}

impl From<DynamicWeightAdjuster> for SharedWeightAdjuster {
    fn from(adjuster: DynamicWeightAdjuster) -> Self {
        Self::new(adjuster)
    }
}
