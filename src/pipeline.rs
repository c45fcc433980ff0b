//! End-to-end scoring run: load table, build feature views, score both
//! classifiers, combine, write.

use crate::config::AppConfig;
use crate::error::Result;
use crate::feature_extractor::{FeatureView, FeatureViewBuilder};
use crate::metrics::RunMetrics;
use crate::models::{Classifier, EnsembleCombiner, ModelPair};
use crate::reader::TableReader;
use crate::schema::{SVM_SCHEMA, XGB_SCHEMA};
use crate::scorer::BatchScorer;
use crate::types::record::RecordTable;
use crate::types::scores::{EnsembleResult, EnsembleSummary, ScoreVector};
use crate::writer::{OutputPaths, ResultWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Tunables of a scoring run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub workers: usize,
    /// Score batches concurrently instead of in one loop
    pub parallel: bool,
    pub threshold: f64,
    pub verbose_progress: bool,
    pub enable_timing: bool,
    /// Read and write buffer size in KiB
    pub io_buffer_size: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.memory.ml_batch_size,
            workers: config.workers(),
            parallel: config.performance.parallel_batches,
            threshold: config.detection.threshold,
            verbose_progress: config.logging.verbose_progress,
            enable_timing: config.logging.enable_timing,
            io_buffer_size: config.memory.io_buffer_size,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Scores a record table with the SVM and XGBoost classifiers.
pub struct EnsemblePipeline {
    models: ModelPair,
    builder: FeatureViewBuilder,
    scorer: BatchScorer,
    combiner: EnsembleCombiner,
    reader: TableReader,
    writer: ResultWriter,
    workers: usize,
    parallel: bool,
    enable_timing: bool,
    metrics: Arc<RunMetrics>,
}

impl EnsemblePipeline {
    pub fn new(models: ModelPair, options: PipelineOptions, metrics: Arc<RunMetrics>) -> Result<Self> {
        let scorer = BatchScorer::new(options.batch_size, metrics.clone())?
            .with_verbose_progress(options.verbose_progress);

        Ok(Self {
            models,
            builder: FeatureViewBuilder::new(),
            scorer,
            combiner: EnsembleCombiner::new(options.threshold),
            reader: TableReader::new(options.io_buffer_size),
            writer: ResultWriter::new(options.io_buffer_size),
            workers: options.workers.max(1),
            parallel: options.parallel,
            enable_timing: options.enable_timing,
            metrics,
        })
    }

    /// Read `input`, score it, and write both outputs.
    pub async fn run(&self, input: &Path, outputs: &OutputPaths) -> Result<EnsembleSummary> {
        let started = Instant::now();
        let table = self.reader.read_path(input)?;
        self.finish_stage("load table", started);

        let result = self.score_table(&table).await?;

        let started = Instant::now();
        self.writer.write(&table, &result, outputs)?;
        self.finish_stage("write outputs", started);

        let summary = EnsembleCombiner::summarize(&result);
        info!(
            records = summary.records,
            positives = summary.positives,
            mean_score = summary.mean_score,
            "Scoring complete"
        );
        Ok(summary)
    }

    /// Score every record and combine the two classifiers.
    ///
    /// Both feature schemas are resolved against the header before any
    /// classifier is called.
    pub async fn score_table(&self, table: &RecordTable) -> Result<EnsembleResult> {
        let started = Instant::now();
        self.builder.check_columns(table, &SVM_SCHEMA)?;
        self.builder.check_columns(table, &XGB_SCHEMA)?;

        let svm_view = self.builder.build(table, &SVM_SCHEMA)?;
        let xgb_view = self.builder.build(table, &XGB_SCHEMA)?;
        self.finish_stage("build features", started);

        info!(
            records = table.len(),
            batch_size = self.scorer.batch_size(),
            batches = self.scorer.num_batches(table.len()),
            parallel = self.parallel,
            threshold = self.combiner.threshold(),
            "Scoring {} tandem repeats",
            table.len()
        );

        let started = Instant::now();
        let svm = self.score_view(svm_view, &self.models.svm).await?;
        self.finish_stage("score svm", started);

        let started = Instant::now();
        let xgb = self.score_view(xgb_view, &self.models.xgb).await?;
        self.finish_stage("score xgb", started);

        let started = Instant::now();
        let result = self.combiner.combine(&svm, &xgb)?;
        self.metrics.record_ensemble(&result);
        self.finish_stage("combine", started);

        Ok(result)
    }

    async fn score_view(&self, view: FeatureView, model: &Arc<dyn Classifier>) -> Result<ScoreVector> {
        if self.parallel && self.workers > 1 {
            self.scorer
                .score_concurrent(Arc::new(view), model.clone(), self.workers)
                .await
        } else {
            self.scorer.score(&view, model.as_ref())
        }
    }

    fn finish_stage(&self, stage: &str, started: Instant) {
        let elapsed = started.elapsed();
        self.metrics.record_stage(stage, elapsed);
        if self.enable_timing {
            info!(stage = stage, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "Stage finished");
        } else {
            debug!(stage = stage, elapsed = ?elapsed, "Stage finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoringError;
    use crate::test_support::{scored_table, FailingClassifier, FirstColumnClassifier, LogisticClassifier};
    use crate::types::record::ID_COLUMNS;

    fn options(batch_size: usize, parallel: bool) -> PipelineOptions {
        PipelineOptions {
            batch_size,
            workers: 3,
            parallel,
            ..PipelineOptions::default()
        }
    }

    fn first_column_pipeline(batch_size: usize, parallel: bool) -> EnsemblePipeline {
        let models = ModelPair::new(
            Arc::new(FirstColumnClassifier("svm")),
            Arc::new(FirstColumnClassifier("xgb")),
        );
        EnsemblePipeline::new(models, options(batch_size, parallel), Arc::new(RunMetrics::new())).unwrap()
    }

    fn assert_all_close(got: &[f64], want: &[f64]) {
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            assert!((g - w).abs() < 1e-6, "{:?} != {:?}", got, want);
        }
    }

    #[tokio::test]
    async fn test_two_record_example() {
        let table = scored_table(&[(0.2, 0.4), (0.9, 0.3)]);

        for parallel in [false, true] {
            let result = first_column_pipeline(1, parallel).score_table(&table).await.unwrap();
            assert_all_close(&result.ensemble_score, &[0.6, 1.2]);
            assert_all_close(&result.ensemble_max, &[0.4, 0.9]);
            assert_eq!(result.ensemble_binary, vec![0, 1]);
        }
    }

    #[tokio::test]
    async fn test_missing_column_scores_nothing() {
        let features: Vec<String> = crate::schema::all_feature_columns()
            .into_iter()
            .filter(|&c| c != "gerp")
            .map(str::to_string)
            .collect();
        let header = ID_COLUMNS.iter().map(|s| s.to_string()).chain(features).collect();
        let table = RecordTable::new(header).unwrap();

        let svm = Arc::new(LogisticClassifier::new("svm"));
        let xgb = Arc::new(FailingClassifier::on_row(0));
        let pipeline = EnsemblePipeline::new(
            ModelPair::new(svm.clone(), xgb.clone()),
            options(10, false),
            Arc::new(RunMetrics::new()),
        )
        .unwrap();

        match pipeline.score_table(&table).await {
            Err(ScoringError::MissingColumn { column }) => assert_eq!(column, "gerp"),
            other => panic!("expected MissingColumn, got {:?}", other.map(|r| r.len())),
        }
        assert_eq!(svm.calls(), 0);
        assert_eq!(xgb.calls(), 0);
    }

    #[tokio::test]
    async fn test_rows_keep_order_across_batches() {
        let pairs: Vec<(f64, f64)> = (0..23)
            .map(|i| (i as f64 / 32.0, (22 - i) as f64 / 32.0))
            .collect();
        let table = scored_table(&pairs);

        let sequential = first_column_pipeline(4, false).score_table(&table).await.unwrap();
        let concurrent = first_column_pipeline(4, true).score_table(&table).await.unwrap();

        let svm: Vec<f64> = pairs.iter().map(|p| p.0).collect();
        let xgb: Vec<f64> = pairs.iter().map(|p| p.1).collect();
        for result in [&sequential, &concurrent] {
            assert_eq!(result.len(), 23);
            assert_all_close(&result.svm, &svm);
            assert_all_close(&result.xgb, &xgb);
        }
    }

    #[tokio::test]
    async fn test_run_writes_both_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("final_annotated.txt");
        let table = scored_table(&[(0.2, 0.4), (0.9, 0.3)]);
        let mut text = table.header().join("\t");
        for idx in 0..table.len() {
            text.push('\n');
            text.push_str(table.line(idx).unwrap());
        }
        std::fs::write(&input, text).unwrap();

        let outputs = OutputPaths {
            full: dir.path().join("full.txt"),
            scores: dir.path().join("scores.txt"),
        };
        let summary = first_column_pipeline(10, false).run(&input, &outputs).await.unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.positives, 1);

        let scores = std::fs::read_to_string(&outputs.scores).unwrap();
        let lines: Vec<&str> = scores.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("chr1\t0\t30\tCAG\tS0\tGENE0\t"));
        let fields: Vec<&str> = lines[2].split('\t').collect();
        assert_eq!(fields.len(), 11);
        assert_eq!(fields[9], "1");
        let max: f64 = fields[10].parse().unwrap();
        assert!((max - 0.9).abs() < 1e-6);

        let full = std::fs::read_to_string(&outputs.full).unwrap();
        assert_eq!(full.lines().count(), 3);
        assert!(full.lines().next().unwrap().ends_with("ensembleScore\tensembleMax\tensembleBinary"));
    }

    #[tokio::test]
    async fn test_empty_table_writes_headers_only() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.txt");
        std::fs::write(&input, scored_table(&[]).header().join("\t")).unwrap();

        let outputs = OutputPaths {
            full: dir.path().join("full.txt"),
            scores: dir.path().join("scores.txt"),
        };
        let summary = first_column_pipeline(10, true).run(&input, &outputs).await.unwrap();

        assert_eq!(summary.records, 0);
        assert_eq!(std::fs::read_to_string(&outputs.full).unwrap().lines().count(), 1);
        assert_eq!(std::fs::read_to_string(&outputs.scores).unwrap().lines().count(), 1);
    }
}
