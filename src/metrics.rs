//! Run metrics and statistics for the scoring pipeline.

use crate::types::scores::EnsembleResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for one scoring run
pub struct RunMetrics {
    /// Rows scored, summed over both classifiers
    pub rows_scored: AtomicU64,
    /// Classifier calls made
    pub batches_scored: AtomicU64,
    /// Records called positive by the ensemble
    pub positives: AtomicU64,
    /// Batch latencies per model (in microseconds)
    batch_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Wall time per pipeline stage, in completion order
    stage_times: RwLock<Vec<(String, Duration)>>,
    /// Ensemble max distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Per-record model agreement, `1 - |svm - xgb|`
    agreement_sum: RwLock<(f64, u64)>,
    start_time: Instant,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            rows_scored: AtomicU64::new(0),
            batches_scored: AtomicU64::new(0),
            positives: AtomicU64::new(0),
            batch_times: RwLock::new(HashMap::new()),
            stage_times: RwLock::new(Vec::new()),
            score_buckets: RwLock::new([0; 10]),
            agreement_sum: RwLock::new((0.0, 0)),
            start_time: Instant::now(),
        }
    }

    /// Record one classifier call
    pub fn record_batch(&self, model: &str, rows: usize, duration: Duration) {
        self.rows_scored.fetch_add(rows as u64, Ordering::Relaxed);
        self.batches_scored.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.batch_times.write() {
            times
                .entry(model.to_string())
                .or_default()
                .push(duration.as_micros() as u64);
        }
    }

    /// Record the wall time of a pipeline stage
    pub fn record_stage(&self, stage: &str, duration: Duration) {
        if let Ok(mut stages) = self.stage_times.write() {
            stages.push((stage.to_string(), duration));
        }
    }

    /// Record the distribution of an ensemble result
    pub fn record_ensemble(&self, result: &EnsembleResult) {
        self.positives
            .fetch_add(result.positives() as u64, Ordering::Relaxed);

        if let Ok(mut buckets) = self.score_buckets.write() {
            for &max in &result.ensemble_max {
                let bucket = ((max * 10.0) as usize).min(9);
                buckets[bucket] += 1;
            }
        }

        if let Ok(mut agreement) = self.agreement_sum.write() {
            for (s, x) in result.svm.iter().zip(&result.xgb) {
                agreement.0 += 1.0 - (s - x).abs().min(1.0);
                agreement.1 += 1;
            }
        }
    }

    /// Batch latency statistics per model
    pub fn get_model_stats(&self) -> HashMap<String, ModelStats> {
        let Ok(times) = self.batch_times.read() else {
            return HashMap::new();
        };
        let mut stats = HashMap::new();

        for (model, model_times) in times.iter() {
            if model_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = model_times.clone();
            sorted.sort_unstable();

            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();

            stats.insert(
                model.clone(),
                ModelStats {
                    calls: count as u64,
                    mean_us: sum / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
                },
            );
        }

        stats
    }

    pub fn get_stage_times(&self) -> Vec<(String, Duration)> {
        self.stage_times
            .read()
            .map(|stages| stages.clone())
            .unwrap_or_default()
    }

    /// Mean model agreement over all recorded records, 0 when none
    pub fn get_avg_agreement(&self) -> f64 {
        match self.agreement_sum.read() {
            Ok(agreement) if agreement.1 > 0 => agreement.0 / agreement.1 as f64,
            _ => 0.0,
        }
    }

    /// Rows scored per second since the run started
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.rows_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let rows = self.rows_scored.load(Ordering::Relaxed);
        let batches = self.batches_scored.load(Ordering::Relaxed);
        let positives = self.positives.load(Ordering::Relaxed);
        let score_dist = self.get_score_distribution();
        let records: u64 = score_dist.iter().sum();
        let positive_rate = if records > 0 {
            (positives as f64 / records as f64) * 100.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            RExPRT ENSEMBLE SCORING - RUN SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Rows Scored: {:>10}  │  Batches: {:>6}  │  {:>9.1} rows/s ║",
            rows,
            batches,
            self.get_throughput()
        );
        info!(
            "║ Records: {:>10}  │  Positive: {:>8} ({:>5.1}%)             ║",
            records, positives, positive_rate
        );
        info!(
            "║ Model Agreement: {:>5.1}% (higher = models agree more)        ║",
            self.get_avg_agreement() * 100.0
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Stage Times:                                                 ║");
        for (stage, duration) in self.get_stage_times() {
            info!("║   {:<20} {:>10.3?}", stage, duration);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Ensemble Max Distribution:                                   ║");
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if records > 0 {
                (count as f64 / records as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>8} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let model_stats = self.get_model_stats();
        if !model_stats.is_empty() {
            info!("Batch Scoring Times (μs):");
            for (model, stats) in &model_stats {
                info!(
                    "  {}: mean={} p50={} p99={} (calls={})",
                    model, stats.mean_us, stats.p50_us, stats.p99_us, stats.calls
                );
            }
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Model-specific batch statistics
#[derive(Debug)]
pub struct ModelStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}
