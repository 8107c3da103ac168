//! Ensemble Coordination Library
//!
//! This library combines the predictions of several independent models into
//! one decision and refines how much each model is trusted over time:
//! - Majority and confidence-weighted voting over single-item ballots
//! - Per-item consensus resolution over batched predictions
//! - Dynamic per-model weights driven by evaluation scores
//! - Noise filtering, metadata enrichment and JSON/text rendering
//! - Accuracy, precision, recall and F1 evaluation
//!
//! # Usage
//!
//! ```bash
//! # Aggregate a round document, print JSON
//! ensemble-cli --input round.json --output json
//!
//! # Evaluate a batch, reweight models and persist the weights
//! ensemble-cli --input batch.json --output text --weights ./state/weights.json
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod ensemble;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod models;
pub mod postprocessing;
pub mod state;

pub use config::EnsembleConfig;
pub use error::{EnsembleError, EnsembleResult};

// Re-export key ensemble types
pub use ensemble::{
    majority_vote, weighted_vote, weighted_vote_parallel, DisagreementResolver,
    DynamicWeightAdjuster, EnsembleCoordinator, RoundReport, SharedEnsembleCoordinator,
    SharedWeightAdjuster, VotingStrategy,
};

// Re-export key state types
pub use state::{
    load_snapshot, save_snapshot, AggregationResult, Ballot, BatchPredictions, Label, ModelName,
    PredictionRecord, PredictionRound, Resolution, ScoreTable, WeightSnapshot,
};

// Re-export key event types
pub use events::{EnsembleEvent, EventBus, SharedEventBus};

pub use evaluation::{MetricsReport, PerformanceMetrics, ScoreMetric};
pub use models::{Features, Modality, ModelOutput, ModelPool, Predictor};
pub use postprocessing::{
    add_model_attribution, add_timestamp, filter_low_confidence, format_to_json,
    format_to_plain_text, EnrichedResult, OutputFormat,
};
