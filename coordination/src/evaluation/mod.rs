//! Evaluation of model predictions against ground truth

pub mod metrics;

pub use metrics::{MetricsReport, PerformanceMetrics, ScoreMetric};
