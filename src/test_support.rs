//! Mock classifiers and fixtures shared by unit tests

use crate::feature_extractor::FeatureView;
use crate::models::inference::Classifier;
use crate::schema::{all_feature_columns, SVM_SCHEMA, XGB_SCHEMA};
use crate::types::record::{RecordTable, ID_COLUMNS};
use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Random view with the SVM schema's width; column 0 holds the row index.
pub fn random_view(n: usize, seed: u64) -> FeatureView {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Array2::<f32>::zeros((n, SVM_SCHEMA.width()));
    for (row, mut values) in data.rows_mut().into_iter().enumerate() {
        values[0] = row as f32;
        for value in values.iter_mut().skip(1) {
            *value = rng.gen_range(0.0..1.0);
        }
    }
    FeatureView::new(SVM_SCHEMA, data)
}

/// Deterministic logistic model over every column but the first.
pub struct LogisticClassifier {
    name: String,
    calls: AtomicUsize,
}

impl LogisticClassifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(batch
            .rows()
            .into_iter()
            .map(|row| {
                let z: f64 = row
                    .iter()
                    .skip(1)
                    .enumerate()
                    .map(|(j, &x)| (x as f64 - 0.5) * (j as f64 + 1.0) / 10.0)
                    .sum();
                1.0 / (1.0 + (-z).exp())
            })
            .collect())
    }
}

/// Returns the first column of each row as its probability.
pub struct FirstColumnClassifier(pub &'static str);

impl Classifier for FirstColumnClassifier {
    fn name(&self) -> &str {
        self.0
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        Ok(batch.rows().into_iter().map(|row| row[0] as f64).collect())
    }
}

/// Returns the same value for every row.
pub struct ConstantClassifier {
    name: String,
    value: f64,
}

impl ConstantClassifier {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

impl Classifier for ConstantClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        Ok(vec![self.value; batch.nrows()])
    }
}

/// Fails on any batch containing a row whose first column equals `row`.
pub struct FailingClassifier {
    row: f32,
    calls: AtomicUsize,
}

impl FailingClassifier {
    pub fn on_row(row: usize) -> Self {
        Self {
            row: row as f32,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if batch.rows().into_iter().any(|row| row[0] == self.row) {
            bail!("refusing to score row {}", self.row);
        }
        Ok(vec![0.5; batch.nrows()])
    }
}

/// Table with every feature column; each row's first SVM and XGB feature
/// (`eSTR`, `RAD21`) are set to the given pair, everything else to 0.
pub fn scored_table(pairs: &[(f64, f64)]) -> RecordTable {
    let features = all_feature_columns();
    let header = ID_COLUMNS
        .iter()
        .chain(features.iter())
        .map(|s| s.to_string())
        .collect();
    let mut table = RecordTable::new(header).unwrap();

    for (i, &(svm, xgb)) in pairs.iter().enumerate() {
        let values: Vec<String> = features
            .iter()
            .map(|&column| {
                if column == SVM_SCHEMA.columns[0] {
                    svm.to_string()
                } else if column == XGB_SCHEMA.columns[0] {
                    xgb.to_string()
                } else {
                    "0".to_string()
                }
            })
            .collect();
        let line = format!(
            "chr{}\t{}\t{}\tCAG\tS{}\tGENE{}\t{}",
            i + 1,
            1000 * i,
            1000 * i + 30,
            i,
            i,
            values.join("\t")
        );
        table.push_row(line).unwrap();
    }
    table
}
