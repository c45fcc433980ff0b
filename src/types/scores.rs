//! Score data structures produced by the scorer and the ensemble combiner

use serde::Serialize;

/// Probability of the positive class per record, index-aligned with the record table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreVector {
    /// Name of the classifier that produced the scores
    pub model: String,
    values: Vec<f64>,
}

impl ScoreVector {
    pub fn new(model: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            model: model.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Derived ensemble columns, one entry per record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleResult {
    pub svm: Vec<f64>,
    pub xgb: Vec<f64>,
    /// `svm + xgb`, in [0, 2]
    pub ensemble_score: Vec<f64>,
    /// `max(svm, xgb)`
    pub ensemble_max: Vec<f64>,
    /// 1 when `ensemble_max` reaches the threshold
    pub ensemble_binary: Vec<u8>,
}

/// A single record's ensemble outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleRow {
    pub svm: f64,
    pub xgb: f64,
    pub ensemble_score: f64,
    pub ensemble_max: f64,
    pub ensemble_binary: u8,
}

impl EnsembleResult {
    pub fn len(&self) -> usize {
        self.svm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.svm.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<EnsembleRow> {
        Some(EnsembleRow {
            svm: *self.svm.get(idx)?,
            xgb: *self.xgb.get(idx)?,
            ensemble_score: *self.ensemble_score.get(idx)?,
            ensemble_max: *self.ensemble_max.get(idx)?,
            ensemble_binary: *self.ensemble_binary.get(idx)?,
        })
    }

    pub fn positives(&self) -> usize {
        self.ensemble_binary.iter().filter(|&&b| b == 1).count()
    }
}

/// Aggregate view of an ensemble result, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EnsembleSummary {
    pub records: usize,
    pub positives: usize,
    pub mean_score: f64,
    /// Mean absolute difference between the two classifiers
    pub mean_disagreement: f64,
}
