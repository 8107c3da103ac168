//! Ensemble state: core data types and weight persistence
//!
//! - `types`: labels, ballots, score tables, prediction rounds
//! - `store`: JSON snapshots of learned weights and thresholds
//!
//! # Usage
//!
//! ```ignore
//! use ensemble_coordination::state::{load_snapshot, save_snapshot};
//!
//! let snapshot = adjuster.snapshot();
//! save_snapshot(&snapshot, Path::new("state/weights.json"))?;
//! let restored = load_snapshot(Path::new("state/weights.json"))?;
//! ```

pub mod store;
pub mod types;

// Re-export core types
pub use store::{load_snapshot, save_snapshot, WeightSnapshot};
pub use types::{
    AggregationResult, Ballot, BatchPredictions, Label, ModelName, PredictionRecord,
    PredictionRound, Resolution, RoundId, ScoreTable, UNCERTAIN_LABEL,
};
