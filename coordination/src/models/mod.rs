//! Model pool seam
//!
//! Models are opaque predictors. The ensemble only needs `train` and
//! `predict`; feature extraction happens upstream and reaches models as an
//! opaque [`Features`] value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EnsembleError, EnsembleResult};
use crate::state::Label;

/// Opaque feature representation produced by a preprocessing service
pub type Features = serde_json::Value;

/// Output of one model's prediction call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// One label per input item
    pub labels: Vec<Label>,
    /// Model-reported confidence for the whole call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ModelOutput {
    pub fn new(labels: Vec<Label>) -> Self {
        Self {
            labels,
            confidence: None,
        }
    }

    /// Single-item output
    pub fn single(label: impl Into<Label>) -> Self {
        Self::new(vec![label.into()])
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// A trainable, opaque predictor
pub trait Predictor: Send + Sync {
    /// Unique model name
    fn name(&self) -> &str;

    /// Fit the model; models that cannot be trained keep the default
    fn train(&mut self, _data: &Features, _labels: Option<&[Label]>) -> EnsembleResult<()> {
        Err(EnsembleError::not_implemented(format!(
            "Model '{}' does not support training",
            self.name()
        )))
    }

    /// Predict labels for `data`
    fn predict(&self, data: &Features) -> EnsembleResult<ModelOutput>;
}

/// Ordered set of uniquely named predictors
#[derive(Default)]
pub struct ModelPool {
    models: Vec<Box<dyn Predictor>>,
}

impl ModelPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model; names must be unique
    pub fn register(&mut self, model: Box<dyn Predictor>) -> EnsembleResult<()> {
        if self.models.iter().any(|m| m.name() == model.name()) {
            return Err(EnsembleError::invalid_input(format!(
                "Model '{}' is already registered",
                model.name()
            )));
        }
        self.models.push(model);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_model(mut self, model: Box<dyn Predictor>) -> EnsembleResult<Self> {
        self.register(model)?;
        Ok(self)
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Predictor> {
        self.models.iter().map(|m| m.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Predictor>> {
        self.models.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl std::fmt::Debug for ModelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPool")
            .field("models", &self.names())
            .finish()
    }
}

/// Input modality, detected from a raw input's file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Image,
    Tabular,
}

impl Modality {
    /// Detect the modality of a raw input file
    pub fn from_path(path: &Path) -> EnsembleResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("txt") => Ok(Self::Text),
            Some("jpg") | Some("png") => Ok(Self::Image),
            Some("csv") => Ok(Self::Tabular),
            _ => Err(EnsembleError::invalid_input(
                "Unsupported file format. Supported formats: .txt, .jpg, .png, .csv",
            )),
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Tabular => write!(f, "tabular"),
        }
    }
}
