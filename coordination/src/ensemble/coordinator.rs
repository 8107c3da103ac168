//! Ensemble coordinator - wires the pipeline stages together
//!
//! Model pool → ballots → aggregation → noise filter → enrichment, and for
//! batches: consensus resolution → evaluation → weight update. Learned
//! weights scale the next round's ballot confidences.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EnsembleConfig;
use crate::error::{EnsembleError, EnsembleResult};
use crate::evaluation::{MetricsReport, PerformanceMetrics};
use crate::events::{EnsembleEvent, SharedEventBus};
use crate::models::{Features, ModelPool};
use crate::postprocessing::{
    add_model_attribution, add_timestamp, filter_low_confidence, format_to_plain_text,
    EnrichedResult,
};
use crate::state::{
    Ballot, BatchPredictions, Label, ModelName, PredictionRound, Resolution, RoundId,
};

use super::arbitration::{batch_len, no_consensus_items, DisagreementResolver};
use super::weights::{DynamicWeightAdjuster, SharedWeightAdjuster, INITIAL_WEIGHT};

/// Shared reference to EnsembleCoordinator
pub type SharedEnsembleCoordinator = Arc<EnsembleCoordinator>;

/// A model dropped from a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: ModelName,
    pub reason: String,
}

/// Ballots gathered from a model pool for one input
#[derive(Debug, Clone, Default)]
pub struct CollectedBallots {
    pub ballots: Vec<Ballot>,
    pub excluded: Vec<ModelFailure>,
}

/// Batch predictions gathered from a model pool
#[derive(Debug, Clone, Default)]
pub struct CollectedBatch {
    pub batch: BatchPredictions,
    pub excluded: Vec<ModelFailure>,
}

/// Outcome of training every model in a pool
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub trained: Vec<ModelName>,
    /// Models that do not support training
    pub skipped: Vec<ModelName>,
}

/// Everything produced for one prediction round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round_id: RoundId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<EnrichedResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolutions: Option<Vec<Resolution>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<ModelName, MetricsReport>>,

    /// Weights after this round
    pub weights: BTreeMap<ModelName, f64>,
}

impl RoundReport {
    /// Human-readable rendering
    pub fn to_plain_text(&self) -> String {
        let mut out = format!("Round: {}\n", self.round_id);
        if let Some(aggregation) = &self.aggregation {
            out.push_str(&format_to_plain_text(aggregation));
        }
        if let Some(resolutions) = &self.resolutions {
            let items: Vec<String> = resolutions.iter().map(|r| r.to_string()).collect();
            let _ = writeln!(out, "Resolutions: {}", items.join(", "));
        }
        if let Some(metrics) = &self.metrics {
            out.push_str("Metrics:\n");
            for (model, report) in metrics {
                let _ = writeln!(
                    out,
                    "  {}: accuracy={:.2} precision={:.2} recall={:.2} f1={:.2}",
                    model, report.accuracy, report.precision, report.recall, report.f1_score
                );
            }
        }
        if !self.weights.is_empty() {
            out.push_str("Weights:\n");
            for (model, weight) in &self.weights {
                let _ = writeln!(out, "  {}: {:.4}", model, weight);
            }
        }
        out
    }
}

/// Central orchestrator for ensemble rounds
pub struct EnsembleCoordinator {
    config: EnsembleConfig,
    resolver: DisagreementResolver,
    metrics: PerformanceMetrics,
    weights: SharedWeightAdjuster,
    event_bus: Option<SharedEventBus>,
}

impl EnsembleCoordinator {
    /// Create a coordinator with a fresh weight adjuster
    pub fn new(config: EnsembleConfig) -> EnsembleResult<Self> {
        config.validate()?;
        let resolver = DisagreementResolver::new(config.disagreement_threshold)?;
        let weights =
            DynamicWeightAdjuster::new(config.learning_rate, config.decay_factor).into();

        Ok(Self {
            config,
            resolver,
            metrics: PerformanceMetrics::new(),
            weights,
            event_bus: None,
        })
    }

    /// Use an existing (possibly shared or restored) weight adjuster
    pub fn with_weights(mut self, weights: SharedWeightAdjuster) -> Self {
        self.weights = weights;
        self
    }

    /// Publish pipeline events on `bus`
    pub fn with_event_bus(mut self, bus: SharedEventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Create a shared reference to this coordinator
    pub fn shared(self) -> SharedEnsembleCoordinator {
        Arc::new(self)
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn weights(&self) -> &SharedWeightAdjuster {
        &self.weights
    }

    fn publish(&self, event: EnsembleEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }

    fn exclude(&self, model: &str, reason: String) -> ModelFailure {
        warn!(model, reason = %reason, "Excluding model from round");
        self.publish(EnsembleEvent::ModelExcluded {
            model: model.to_string(),
            reason: reason.clone(),
            timestamp: Utc::now(),
        });
        ModelFailure {
            model: model.to_string(),
            reason,
        }
    }

    // =========================================================================
    // Model Pool
    // =========================================================================

    /// Run every model on a single input, dropping models that fail or report
    /// an unusable confidence
    pub fn collect_ballots(&self, pool: &ModelPool, data: &Features) -> CollectedBallots {
        let mut collected = CollectedBallots::default();
        for model in pool.iter() {
            let mut output = match model.predict(data) {
                Ok(output) => output,
                Err(e) => {
                    collected.excluded.push(self.exclude(model.name(), e.to_string()));
                    continue;
                }
            };

            let confidence = output.confidence.unwrap_or(1.0);
            if output.labels.len() != 1 {
                let reason = format!("expected exactly one label, got {}", output.labels.len());
                collected.excluded.push(self.exclude(model.name(), reason));
            } else if !confidence.is_finite() || confidence < 0.0 {
                let reason = format!("confidence must be a non-negative number, got {}", confidence);
                collected.excluded.push(self.exclude(model.name(), reason));
            } else {
                let label = output.labels.remove(0);
                collected
                    .ballots
                    .push(Ballot::new(model.name(), label).with_confidence(confidence));
            }
        }
        collected.ballots = self.weigh_ballots(&collected.ballots);
        collected
    }

    /// Run every model on a batch input, dropping models that fail
    pub fn collect_batch(&self, pool: &ModelPool, data: &Features) -> CollectedBatch {
        let mut collected = CollectedBatch::default();
        for model in pool.iter() {
            match model.predict(data) {
                Ok(output) => {
                    collected
                        .batch
                        .insert(model.name().to_string(), output.labels);
                }
                Err(e) => collected.excluded.push(self.exclude(model.name(), e.to_string())),
            }
        }
        collected
    }

    /// Train every model; untrainable models are skipped, other errors abort
    pub fn train_all(
        &self,
        pool: &mut ModelPool,
        data: &Features,
        labels: Option<&[Label]>,
    ) -> EnsembleResult<TrainingSummary> {
        let mut summary = TrainingSummary::default();
        for model in pool.iter_mut() {
            let name = model.name().to_string();
            info!(model = %name, "Training model");
            match model.train(data, labels) {
                Ok(()) => summary.trained.push(name),
                Err(e) if e.is_not_implemented() => {
                    info!(model = %name, "Model does not support training, skipping");
                    summary.skipped.push(name);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }

    /// Scale ballot confidences by learned weights (1.0 for unseen models)
    pub fn weigh_ballots(&self, ballots: &[Ballot]) -> Vec<Ballot> {
        let weights = self.weights.get_weights();
        ballots
            .iter()
            .map(|ballot| {
                let learned = weights.get(&ballot.model).copied().unwrap_or(INITIAL_WEIGHT);
                let mut weighed = ballot.clone();
                weighed.confidence = Some(ballot.effective_confidence() * learned);
                weighed
            })
            .collect()
    }

    // =========================================================================
    // Aggregation
    // =========================================================================

    /// Aggregate, filter and enrich one round of ballots
    pub fn aggregate(&self, round_id: &str, ballots: &[Ballot]) -> EnsembleResult<EnrichedResult> {
        let mut result = self.config.strategy.aggregate(ballots)?;
        if let Some(threshold) = self.config.noise_threshold {
            result = filter_low_confidence(&result, threshold);
        }

        let mut attribution: BTreeMap<ModelName, f64> = BTreeMap::new();
        for ballot in ballots {
            *attribution.entry(ballot.model.clone()).or_insert(0.0) +=
                ballot.effective_confidence();
        }

        let winner = result.result.clone();
        let mut enriched = add_model_attribution(result, attribution);
        if self.config.attach_timestamp {
            enriched = add_timestamp(enriched);
        }

        info!(
            round_id,
            strategy = %self.config.strategy,
            winner = %winner,
            ballots = ballots.len(),
            "Round aggregated"
        );
        self.publish(EnsembleEvent::RoundAggregated {
            round_id: round_id.to_string(),
            strategy: self.config.strategy,
            winner,
            ballots: ballots.len(),
            timestamp: Utc::now(),
        });
        Ok(enriched)
    }

    /// Collect ballots from the pool and aggregate them under a new round id
    pub fn run_round(&self, pool: &ModelPool, data: &Features) -> EnsembleResult<EnrichedResult> {
        let collected = self.collect_ballots(pool, data);
        if collected.ballots.is_empty() {
            return Err(EnsembleError::invalid_input(format!(
                "All {} models failed; nothing to aggregate",
                collected.excluded.len()
            )));
        }
        self.aggregate(&new_round_id(), &collected.ballots)
    }

    // =========================================================================
    // Batches
    // =========================================================================

    /// Resolve per-item consensus for a batch
    pub fn resolve_batch(
        &self,
        round_id: &str,
        batch: &BatchPredictions,
    ) -> EnsembleResult<Vec<Resolution>> {
        let resolutions = self.resolver.resolve(batch)?;
        let missed = no_consensus_items(&resolutions);
        if !missed.is_empty() {
            warn!(
                round_id,
                items = ?missed,
                threshold = self.resolver.threshold(),
                "No consensus for some items"
            );
            self.publish(EnsembleEvent::ConsensusMissed {
                round_id: round_id.to_string(),
                items: missed,
                threshold: self.resolver.threshold(),
                timestamp: Utc::now(),
            });
        }
        Ok(resolutions)
    }

    /// Evaluate every model against ground truth and update its weight
    ///
    /// All models are evaluated before any weight changes, so a shape error
    /// leaves the weights untouched.
    pub fn evaluate_and_reweight(
        &self,
        ground_truth: &[Label],
        batch: &BatchPredictions,
    ) -> EnsembleResult<BTreeMap<ModelName, MetricsReport>> {
        if batch_len(batch)?.is_none() {
            return Err(EnsembleError::invalid_input(
                "Evaluation requires predictions from at least one model",
            ));
        }

        let mut reports = BTreeMap::new();
        for (model, predictions) in batch {
            let report = self.metrics.evaluate(ground_truth, predictions)?;
            reports.insert(model.clone(), report);
        }

        for (model, report) in &reports {
            let score = report.score(self.config.score_metric);
            let (previous, current) = self.weights.update_weight(model, score);
            debug!(model, score, current, "Reweighted model");
            self.publish(EnsembleEvent::WeightUpdated {
                model: model.clone(),
                previous,
                current,
                performance_score: score,
                timestamp: Utc::now(),
            });
        }

        info!(models = reports.len(), metric = ?self.config.score_metric, "Weights updated");
        Ok(reports)
    }

    // =========================================================================
    // Rounds
    // =========================================================================

    /// Process a prediction round document end to end
    pub fn process_round(&self, round: &PredictionRound) -> EnsembleResult<RoundReport> {
        if round.ballots.is_empty() && round.batch.is_empty() {
            return Err(EnsembleError::invalid_input(
                "Round contains neither ballots nor batch predictions",
            ));
        }
        if round.ground_truth.is_some() && round.batch.is_empty() {
            return Err(EnsembleError::invalid_input(
                "Ground truth requires batch predictions to evaluate",
            ));
        }

        let round_id = round.id.clone().unwrap_or_else(new_round_id);
        debug!(round_id = %round_id, "Processing round");

        let aggregation = if round.ballots.is_empty() {
            None
        } else {
            Some(self.aggregate(&round_id, &self.weigh_ballots(&round.ballots))?)
        };

        let resolutions = if round.batch.is_empty() {
            None
        } else {
            Some(self.resolve_batch(&round_id, &round.batch)?)
        };

        let metrics = match &round.ground_truth {
            Some(truth) => Some(self.evaluate_and_reweight(truth, &round.batch)?),
            None => None,
        };

        Ok(RoundReport {
            round_id,
            aggregation,
            resolutions,
            metrics,
            weights: self.weights.get_weights(),
        })
    }
}

fn new_round_id() -> RoundId {
    uuid::Uuid::new_v4().to_string()
}
