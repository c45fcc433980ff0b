//! Command line arguments of `rexprt-score`

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use clap::Parser;
use std::path::PathBuf;

/// Score annotated tandem repeats with the RExPRT SVM and XGBoost ensemble.
#[derive(Parser, Debug, Clone)]
#[command(name = "rexprt-score", version, about, long_about = None)]
pub struct Args {
    /// Configuration file (TOML or YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Annotated tandem repeat table
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Full output: every input column plus the score columns
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Reduced output: identifying columns plus the score columns
    #[arg(long)]
    pub scores_output: Option<PathBuf>,

    /// SVM classifier artifact (ONNX)
    #[arg(long)]
    pub svm_model: Option<PathBuf>,

    /// XGBoost classifier artifact (ONNX)
    #[arg(long)]
    pub xgb_model: Option<PathBuf>,

    /// Rows per classifier call
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Number of scoring workers
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Score batches concurrently
    #[arg(long)]
    pub parallel: bool,
}

impl Args {
    /// Override configuration values with the ones given on the command line.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(input) = &self.input {
            config.io.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.io.full_output = output.clone();
        }
        if let Some(scores) = &self.scores_output {
            config.io.scores_output = scores.clone();
        }
        if let Some(path) = &self.svm_model {
            config.models.svm_path = path.clone();
        }
        if let Some(path) = &self.xgb_model {
            config.models.xgb_path = path.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.memory.ml_batch_size = batch_size;
        }
        if let Some(threads) = self.threads {
            config.cpu.min_cores = threads;
            config.cpu.max_cores = threads;
        }
        if self.parallel {
            config.performance.parallel_batches = true;
        }
    }
}
