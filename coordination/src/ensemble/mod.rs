//! Ensemble aggregation and confidence adjustment
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       Model Pool                          │
//! │  • Opaque predictors (train / predict)                    │
//! └─────────────────────────┬─────────────────────────────────┘
//!                           │ ballots / batch predictions
//!                           ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                 EnsembleCoordinator                        │
//! │  • Excludes failing models                                 │
//! │  • Scales confidences by learned weights                   │
//! │  • Filters, enriches and reports                           │
//! └─────────────────────────┬─────────────────────────────────┘
//!                           │
//!           ┌───────────────┼───────────────┐
//!           ▼               ▼               ▼
//!     ┌───────────┐   ┌───────────┐   ┌───────────┐
//!     │  Voting   │   │Arbitration│   │  Weights  │
//!     │           │   │(consensus)│   │ (adjuster)│
//!     └───────────┘   └───────────┘   └───────────┘
//! ```
//!
//! # Components
//!
//! - **Voting**: majority and confidence-weighted aggregation
//! - **Arbitration**: per-item consensus over batched predictions
//! - **Weights**: decayed, performance-driven per-model weights
//! - **Coordinator**: runs a round through every stage and publishes events

pub mod arbitration;
pub mod coordinator;
pub mod voting;
pub mod weights;

pub use arbitration::{no_consensus_items, DisagreementResolver, DEFAULT_DISAGREEMENT_THRESHOLD};
pub use coordinator::{
    CollectedBallots, CollectedBatch, EnsembleCoordinator, ModelFailure, RoundReport,
    SharedEnsembleCoordinator, TrainingSummary,
};
pub use voting::{majority_vote, weighted_vote, weighted_vote_parallel, VotingStrategy};
pub use weights::{
    DynamicWeightAdjuster, SharedWeightAdjuster, DEFAULT_DECAY_FACTOR, DEFAULT_LEARNING_RATE,
    INITIAL_WEIGHT,
};
