//! Batch scoring of feature views.
//!
//! Rows `[0, n)` are split into consecutive ranges of at most `batch_size`
//! rows. Each range is scored with one classifier call and written back at the
//! same index range of a pre-sized output, so the result never depends on the
//! batch size.

use crate::error::{Result, ScoringError};
use crate::feature_extractor::FeatureView;
use crate::metrics::RunMetrics;
use crate::models::inference::Classifier;
use crate::types::scores::ScoreVector;
use anyhow::anyhow;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Half-open row ranges covering `[0, n)` in order.
pub fn batch_ranges(n: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    (0..n)
        .step_by(batch_size.max(1))
        .map(move |start| start..(start + batch_size).min(n))
}

/// Scores feature views in fixed-size batches.
#[derive(Clone)]
pub struct BatchScorer {
    batch_size: usize,
    verbose_progress: bool,
    metrics: Arc<RunMetrics>,
}

impl BatchScorer {
    pub fn new(batch_size: usize, metrics: Arc<RunMetrics>) -> Result<Self> {
        if batch_size == 0 {
            return Err(ScoringError::InvalidBatchSize);
        }
        Ok(Self {
            batch_size,
            verbose_progress: false,
            metrics,
        })
    }

    /// Log every batch at info level instead of debug.
    pub fn with_verbose_progress(mut self, verbose: bool) -> Self {
        self.verbose_progress = verbose;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of classifier calls needed for `n` rows.
    pub fn num_batches(&self, n: usize) -> usize {
        n.div_ceil(self.batch_size)
    }

    /// Score every row of `view` on the calling thread, one batch at a time.
    pub fn score(&self, view: &FeatureView, model: &dyn Classifier) -> Result<ScoreVector> {
        let n = view.n_rows();
        let num_batches = self.num_batches(n);
        debug!(model = %model.name(), schema = %view.schema(), rows = n, "Scoring feature view");
        let mut scores = vec![0.0; n];

        for (k, range) in batch_ranges(n, self.batch_size).enumerate() {
            self.log_batch(model.name(), k, num_batches, &range);
            let probs = self.score_batch(view, model, range.clone())?;
            scores[range].copy_from_slice(&probs);
        }

        Ok(ScoreVector::new(model.name(), scores))
    }

    /// Score every row of `view` with up to `workers` batches in flight.
    ///
    /// Each task scores one range and hands back its probabilities; the results
    /// are copied into disjoint ranges of the pre-sized output. No new batch is
    /// started once any batch has failed.
    pub async fn score_concurrent(
        &self,
        view: Arc<FeatureView>,
        model: Arc<dyn Classifier>,
        workers: usize,
    ) -> Result<ScoreVector> {
        let n = view.n_rows();
        let num_batches = self.num_batches(n);
        debug!(model = %model.name(), schema = %view.schema(), rows = n, workers, "Scoring feature view concurrently");
        let mut scores = vec![0.0; n];

        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let failed = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for (k, range) in batch_ranges(n, self.batch_size).enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ScoringError::Worker(e.to_string()))?;

            // set before the failing task releases its permit
            if failed.load(Ordering::Acquire) {
                break;
            }

            self.log_batch(model.name(), k, num_batches, &range);

            let scorer = self.clone();
            let view = view.clone();
            let model = model.clone();
            let failed = failed.clone();
            tasks.spawn_blocking(move || {
                let probs = scorer.score_batch(&view, model.as_ref(), range.clone());
                if probs.is_err() {
                    failed.store(true, Ordering::Release);
                }
                drop(permit);
                probs.map(|probs| (range, probs))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (range, probs) = joined.map_err(|e| ScoringError::Worker(e.to_string()))??;
            scores[range].copy_from_slice(&probs);
        }

        Ok(ScoreVector::new(model.name(), scores))
    }

    /// Score one range and check the classifier kept its side of the contract.
    fn score_batch(
        &self,
        view: &FeatureView,
        model: &dyn Classifier,
        range: Range<usize>,
    ) -> Result<Vec<f64>> {
        let started = Instant::now();
        let batch = view.rows(range.clone());

        let failure = |cause: anyhow::Error| ScoringError::ScoringFailure {
            model: model.name().to_string(),
            range: range.clone(),
            cause,
        };

        let probs = model.predict_proba(batch).map_err(failure)?;

        if probs.len() != range.len() {
            return Err(failure(anyhow!(
                "classifier returned {} probabilities for {} rows",
                probs.len(),
                range.len()
            )));
        }
        if let Some((offset, p)) = probs
            .iter()
            .enumerate()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(failure(anyhow!(
                "row {} has probability {} outside [0, 1]",
                range.start + offset,
                p
            )));
        }

        self.metrics
            .record_batch(model.name(), range.len(), started.elapsed());
        Ok(probs)
    }

    fn log_batch(&self, model: &str, k: usize, num_batches: usize, range: &Range<usize>) {
        if self.verbose_progress {
            info!(
                model = %model,
                "Batch {}/{}: Processing rows {} to {}...",
                k + 1,
                num_batches,
                range.start,
                range.end - 1
            );
        } else {
            debug!(model = %model, batch = k + 1, batches = num_batches, rows = ?range, "Scoring batch");
        }
    }
}
