//! Voting strategies for combining per-model predictions
//!
//! Both strategies are pure functions of their inputs. Ties always go to
//! the label seen first.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EnsembleError, EnsembleResult};
use crate::state::{AggregationResult, Ballot, Label, PredictionRecord, ScoreTable};

/// Aggregation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingStrategy {
    /// One vote per prediction, confidences ignored
    Majority,
    /// Votes scaled by normalized confidence
    #[default]
    Weighted,
}

impl VotingStrategy {
    /// Aggregate a round of ballots with this strategy
    pub fn aggregate(&self, ballots: &[Ballot]) -> EnsembleResult<AggregationResult> {
        let outcome = match self {
            VotingStrategy::Majority => {
                let records: Vec<PredictionRecord> = ballots.iter().map(Ballot::to_record).collect();
                majority_vote(&records)
            }
            VotingStrategy::Weighted => weighted_vote(ballots),
        }?;

        debug!(
            strategy = %self,
            ballots = ballots.len(),
            winner = %outcome.result,
            "Aggregated ballots"
        );
        Ok(outcome)
    }
}

impl std::fmt::Display for VotingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Majority => write!(f, "majority"),
            Self::Weighted => write!(f, "weighted"),
        }
    }
}

impl std::str::FromStr for VotingStrategy {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "majority" => Ok(Self::Majority),
            "weighted" => Ok(Self::Weighted),
            other => Err(EnsembleError::invalid_input(format!(
                "Unknown voting strategy '{}'. Supported: majority, weighted",
                other
            ))),
        }
    }
}

/// Majority voting: every (key, value) pair across all records is one vote
///
/// `details` holds raw vote counts.
pub fn majority_vote(records: &[PredictionRecord]) -> EnsembleResult<AggregationResult> {
    let mut votes = ScoreTable::new();
    for record in records {
        for label in record.labels() {
            votes.accumulate(label, 1.0);
        }
    }

    if votes.is_empty() {
        return Err(EnsembleError::invalid_input(
            "Majority voting requires at least one prediction",
        ));
    }

    Ok(AggregationResult::from_details(votes))
}

/// Confidence-weighted voting over explicit (label, confidence) ballots
///
/// Each ballot contributes `confidence / total` to its label, so with
/// positive confidences the details sum to 1.0.
pub fn weighted_vote(ballots: &[Ballot]) -> EnsembleResult<AggregationResult> {
    if ballots.is_empty() {
        return Err(EnsembleError::invalid_input(
            "Weighted voting requires at least one ballot",
        ));
    }

    for ballot in ballots {
        let confidence = ballot.effective_confidence();
        if !confidence.is_finite() || confidence < 0.0 {
            return Err(EnsembleError::invalid_input(format!(
                "Confidence for model '{}' must be a non-negative number, got {}",
                ballot.model, confidence
            )));
        }
    }

    let total: f64 = ballots.iter().map(Ballot::effective_confidence).sum();
    if total == 0.0 {
        return Err(EnsembleError::division_by_zero(
            "Total confidence across ballots is zero",
        ));
    }

    let mut scores = ScoreTable::new();
    for ballot in ballots {
        scores.accumulate(&ballot.label, ballot.effective_confidence() / total);
    }

    Ok(AggregationResult::from_details(scores))
}

/// Weighted voting over parallel label and confidence sequences
///
/// Pairs `labels[i]` with `confidences[i]`; prefer [`weighted_vote`] with
/// explicit ballots.
pub fn weighted_vote_parallel(
    labels: &[Label],
    confidences: &[f64],
) -> EnsembleResult<AggregationResult> {
    if labels.len() != confidences.len() {
        return Err(EnsembleError::invalid_input(format!(
            "Got {} predictions but {} confidences",
            labels.len(),
            confidences.len()
        )));
    }

    let ballots: Vec<Ballot> = labels
        .iter()
        .zip(confidences)
        .enumerate()
        .map(|(i, (label, confidence))| {
            Ballot::new(format!("model-{}", i), label.clone()).with_confidence(*confidence)
        })
        .collect();

    weighted_vote(&ballots)
}
