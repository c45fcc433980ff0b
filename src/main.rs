//! RExPRT Ensemble Scorer - Main Entry Point
//!
//! Reads an annotated tandem repeat table, scores it with the SVM and XGBoost
//! classifiers, and writes the full and reduced score tables.

use anyhow::{Context, Result};
use clap::Parser;
use rexprt_scorer::{
    cli::Args,
    config::{AppConfig, LoggingConfig},
    metrics::RunMetrics,
    models::ModelPair,
    pipeline::{EnsemblePipeline, PipelineOptions},
    writer::OutputPaths,
    ScoringError,
};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_from_path(&args.config)?;
    args.apply(&mut config);
    config.validate()?;

    init_logging(&config.logging)?;

    info!("Starting RExPRT ensemble scoring");
    info!(config = %args.config.display(), "Configuration loaded");

    let logs_to_file = config.logging.enable_logging;
    if let Err(e) = run(config).await {
        let stage = failed_stage(&e);
        error!(stage = stage, error = %format!("{:#}", e), "Scoring run failed");
        if logs_to_file {
            eprintln!("{}", failure_message(stage, &e));
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    let metrics = Arc::new(RunMetrics::new());
    let options = PipelineOptions::from_config(&config);
    info!(
        batch_size = options.batch_size,
        workers = options.workers,
        parallel = options.parallel,
        threshold = options.threshold,
        "Pipeline configured"
    );

    let models = ModelPair::load(&config.models)?;
    info!(
        svm = %config.models.svm_path.display(),
        xgb = %config.models.xgb_path.display(),
        "Classifiers loaded"
    );

    let pipeline = EnsemblePipeline::new(models, options, metrics.clone())?;
    let outputs = OutputPaths {
        full: config.io.full_output.clone(),
        scores: config.io.scores_output.clone(),
    };

    let summary = pipeline.run(&config.io.input, &outputs).await?;
    info!(
        summary = %serde_json::to_string(&summary).context("Failed to serialize run summary")?,
        "Run summary"
    );

    if config.logging.enable_timing {
        metrics.print_summary();
    }

    Ok(())
}

/// Pipeline stage a run error came from.
fn failed_stage(e: &anyhow::Error) -> &'static str {
    e.downcast_ref::<ScoringError>()
        .map(ScoringError::stage)
        .unwrap_or("startup")
}

/// Terminal line for a failed run when the log goes to a file.
fn failure_message(stage: &str, e: &anyhow::Error) -> String {
    format!("rexprt-score: {} failed: {:#}", stage, e)
}

/// Install the global subscriber: stderr by default, `log_file` when file logging is on.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("rexprt_scorer={}", logging.level).parse()?)
        .add_directive(format!("rexprt_score={}", logging.level).parse()?);

    let writer = if logging.enable_logging {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&logging.log_file)
            .with_context(|| format!("Failed to open log file {}", logging.log_file.display()))?;
        BoxMakeWriter::new(Mutex::new(file))
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!logging.enable_logging);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
