//! Classification metrics against ground truth
//!
//! Precision, recall and F1 are averaged over every class present in either
//! input, weighted by the class's support in the ground truth. A class with
//! no predicted or no true instances scores 0 for the undefined ratio.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, EnsembleResult};
use crate::state::Label;

/// Metric values for one evaluation, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

impl MetricsReport {
    /// Value of the selected metric
    pub fn score(&self, metric: ScoreMetric) -> f64 {
        match metric {
            ScoreMetric::Accuracy => self.accuracy,
            ScoreMetric::Precision => self.precision,
            ScoreMetric::Recall => self.recall,
            ScoreMetric::F1 => self.f1_score,
        }
    }
}

/// Which metric summarizes a model's round as its performance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    Accuracy,
    Precision,
    Recall,
    #[default]
    F1,
}

impl std::str::FromStr for ScoreMetric {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accuracy" => Ok(Self::Accuracy),
            "precision" => Ok(Self::Precision),
            "recall" => Ok(Self::Recall),
            "f1" | "f1_score" => Ok(Self::F1),
            other => Err(EnsembleError::invalid_input(format!(
                "Unknown score metric '{}'. Supported: accuracy, precision, recall, f1",
                other
            ))),
        }
    }
}

/// Per-class confusion counts
#[derive(Debug, Default, Clone, Copy)]
struct ClassCounts {
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
}

impl ClassCounts {
    fn support(&self) -> usize {
        self.true_positive + self.false_negative
    }

    fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    fn recall(&self) -> f64 {
        ratio(self.true_positive, self.support())
    }

    fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Stateless metrics evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceMetrics;

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate predictions against ground truth
    pub fn evaluate(
        &self,
        true_labels: &[Label],
        predictions: &[Label],
    ) -> EnsembleResult<MetricsReport> {
        if true_labels.len() != predictions.len() {
            return Err(EnsembleError::shape_mismatch(
                "predictions vs ground truth",
                true_labels.len(),
                predictions.len(),
            ));
        }
        if true_labels.is_empty() {
            return Err(EnsembleError::invalid_input(
                "Cannot evaluate an empty set of predictions",
            ));
        }

        let mut per_class: BTreeMap<&Label, ClassCounts> = BTreeMap::new();
        for (truth, predicted) in true_labels.iter().zip(predictions) {
            if truth == predicted {
                per_class.entry(truth).or_default().true_positive += 1;
            } else {
                per_class.entry(truth).or_default().false_negative += 1;
                per_class.entry(predicted).or_default().false_positive += 1;
            }
        }

        let correct = true_labels
            .iter()
            .zip(predictions)
            .filter(|(t, p)| t == p)
            .count();
        let total_support: usize = per_class.values().map(ClassCounts::support).sum();
        let weighted = |metric: fn(&ClassCounts) -> f64| -> f64 {
            if total_support == 0 {
                return 0.0;
            }
            per_class
                .values()
                .map(|c| metric(c) * c.support() as f64)
                .sum::<f64>()
                / total_support as f64
        };

        Ok(MetricsReport {
            accuracy: ratio(correct, true_labels.len()),
            precision: weighted(ClassCounts::precision),
            recall: weighted(ClassCounts::recall),
            f1_score: weighted(ClassCounts::f1),
        })
    }
}
