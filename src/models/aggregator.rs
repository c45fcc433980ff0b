//! Ensemble combination of the SVM and XGBoost scores

use crate::error::{Result, ScoringError};
use crate::types::scores::{EnsembleResult, EnsembleSummary, ScoreVector};

/// Default decision threshold on the ensemble max.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Combines two per-record score vectors into ensemble columns.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleCombiner {
    /// Inclusive threshold on `max(svm, xgb)` for a positive call
    threshold: f64,
}

impl EnsembleCombiner {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Combine index-aligned SVM and XGBoost scores.
    pub fn combine(&self, svm: &ScoreVector, xgb: &ScoreVector) -> Result<EnsembleResult> {
        if svm.len() != xgb.len() {
            return Err(ScoringError::LengthMismatch {
                left: "svm",
                left_len: svm.len(),
                right: "xgb",
                right_len: xgb.len(),
            });
        }

        let n = svm.len();
        let mut result = EnsembleResult {
            svm: Vec::with_capacity(n),
            xgb: Vec::with_capacity(n),
            ensemble_score: Vec::with_capacity(n),
            ensemble_max: Vec::with_capacity(n),
            ensemble_binary: Vec::with_capacity(n),
        };

        for (&s, &x) in svm.values().iter().zip(xgb.values()) {
            let max = s.max(x);
            result.svm.push(s);
            result.xgb.push(x);
            result.ensemble_score.push(s + x);
            result.ensemble_max.push(max);
            result.ensemble_binary.push(u8::from(max >= self.threshold));
        }

        Ok(result)
    }

    /// Positives, mean score, and mean model disagreement of a result.
    pub fn summarize(result: &EnsembleResult) -> EnsembleSummary {
        let records = result.len();
        if records == 0 {
            return EnsembleSummary::default();
        }

        let mean_score = result.ensemble_score.iter().sum::<f64>() / records as f64;
        let mean_disagreement = result
            .svm
            .iter()
            .zip(&result.xgb)
            .map(|(s, x)| (s - x).abs())
            .sum::<f64>()
            / records as f64;

        EnsembleSummary {
            records,
            positives: result.positives(),
            mean_score,
            mean_disagreement,
        }
    }
}

impl Default for EnsembleCombiner {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors(svm: &[f64], xgb: &[f64]) -> (ScoreVector, ScoreVector) {
        (
            ScoreVector::new("svm", svm.to_vec()),
            ScoreVector::new("xgb", xgb.to_vec()),
        )
    }

    #[test]
    fn test_two_record_example() {
        let (svm, xgb) = vectors(&[0.2, 0.9], &[0.4, 0.3]);
        let result = EnsembleCombiner::default().combine(&svm, &xgb).unwrap();

        assert!((result.ensemble_score[0] - 0.6).abs() < 1e-12);
        assert!((result.ensemble_score[1] - 1.2).abs() < 1e-12);
        assert_eq!(result.ensemble_max, vec![0.4, 0.9]);
        assert_eq!(result.ensemble_binary, vec![0, 1]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let (svm, xgb) = vectors(&[0.5, 0.0, 0.4999999], &[0.0, 0.5, 0.0]);
        let result = EnsembleCombiner::default().combine(&svm, &xgb).unwrap();

        assert_eq!(result.ensemble_max[0], 0.5);
        assert_eq!(result.ensemble_binary, vec![1, 1, 0]);
    }

    #[test]
    fn test_arithmetic_over_grid() {
        let steps: Vec<f64> = (0..=20).map(|i| i as f64 / 20.0).collect();
        let mut svm = Vec::new();
        let mut xgb = Vec::new();
        for &s in &steps {
            for &x in &steps {
                svm.push(s);
                xgb.push(x);
            }
        }
        let (svm_v, xgb_v) = vectors(&svm, &xgb);
        let result = EnsembleCombiner::default().combine(&svm_v, &xgb_v).unwrap();

        for i in 0..svm.len() {
            assert_eq!(result.ensemble_score[i], svm[i] + xgb[i]);
            assert_eq!(result.ensemble_max[i], svm[i].max(xgb[i]));
            let expected = if svm[i].max(xgb[i]) >= 0.5 { 1 } else { 0 };
            assert_eq!(result.ensemble_binary[i], expected);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let (svm, xgb) = vectors(&[0.1, 0.2], &[0.3]);
        match EnsembleCombiner::default().combine(&svm, &xgb) {
            Err(ScoringError::LengthMismatch {
                left_len,
                right_len,
                ..
            }) => {
                assert_eq!(left_len, 2);
                assert_eq!(right_len, 1);
            }
            other => panic!("expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_vectors() {
        let (svm, xgb) = vectors(&[], &[]);
        let result = EnsembleCombiner::default().combine(&svm, &xgb).unwrap();
        assert!(result.is_empty());
        assert_eq!(EnsembleCombiner::summarize(&result), EnsembleSummary::default());
    }

    #[test]
    fn test_summary() {
        let (svm, xgb) = vectors(&[0.2, 0.9], &[0.4, 0.3]);
        let result = EnsembleCombiner::default().combine(&svm, &xgb).unwrap();
        let summary = EnsembleCombiner::summarize(&result);

        assert_eq!(summary.records, 2);
        assert_eq!(summary.positives, 1);
        assert!((summary.mean_score - 0.9).abs() < 1e-12);
        assert!((summary.mean_disagreement - 0.4).abs() < 1e-12);
    }
}
