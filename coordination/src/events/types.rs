//! Event types emitted by the ensemble pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ensemble::voting::VotingStrategy;
use crate::state::{Label, ModelName, RoundId};

/// Ensemble pipeline events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnsembleEvent {
    /// Ballots were aggregated into one result
    RoundAggregated {
        round_id: RoundId,
        strategy: VotingStrategy,
        winner: Label,
        ballots: usize,
        timestamp: DateTime<Utc>,
    },

    /// A model failed and was dropped from the round
    ModelExcluded {
        model: ModelName,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Some batch items did not reach consensus
    ConsensusMissed {
        round_id: RoundId,
        items: Vec<usize>,
        threshold: f64,
        timestamp: DateTime<Utc>,
    },

    /// A model's weight was updated after evaluation
    WeightUpdated {
        model: ModelName,
        previous: Option<f64>,
        current: f64,
        performance_score: f64,
        timestamp: DateTime<Utc>,
    },
}

impl EnsembleEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            EnsembleEvent::RoundAggregated { .. } => "round_aggregated",
            EnsembleEvent::ModelExcluded { .. } => "model_excluded",
            EnsembleEvent::ConsensusMissed { .. } => "consensus_missed",
            EnsembleEvent::WeightUpdated { .. } => "weight_updated",
        }
    }

    /// Get the round this event belongs to, if any
    pub fn round_id(&self) -> Option<&RoundId> {
        match self {
            EnsembleEvent::RoundAggregated { round_id, .. } => Some(round_id),
            EnsembleEvent::ConsensusMissed { round_id, .. } => Some(round_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = EnsembleEvent::WeightUpdated {
            model: "svm".to_string(),
            previous: None,
            current: 1.04,
            performance_score: 0.5,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"weight_updated""#));

        let back: EnsembleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "weight_updated");
        assert!(back.round_id().is_none());
    }

    #[test]
    fn test_round_id_accessor() {
        let event = EnsembleEvent::ConsensusMissed {
            round_id: "r-1".to_string(),
            items: vec![2],
            threshold: 0.6,
            timestamp: Utc::now(),
        };
        assert_eq!(event.round_id().map(String::as_str), Some("r-1"));
    }
}
