//! RExPRT Ensemble Scorer Library
//!
//! Batch scoring of annotated tandem repeats with an SVM and an XGBoost
//! classifier, combined into ensemble pathogenicity scores.

pub mod cli;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod reader;
pub mod schema;
pub mod scorer;
pub mod types;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use error::{Result, ScoringError};
pub use feature_extractor::{FeatureView, FeatureViewBuilder};
pub use models::{Classifier, EnsembleCombiner, ModelLoader, ModelPair};
pub use pipeline::{EnsemblePipeline, PipelineOptions};
pub use scorer::BatchScorer;
pub use types::{EnsembleResult, RecordTable, ScoreVector, TandemRepeatRecord};
pub use writer::{OutputPaths, ResultWriter};
