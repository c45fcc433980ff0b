//! Classifier loading, inference, and ensemble combination

pub mod aggregator;
pub mod inference;
pub mod loader;

pub use aggregator::EnsembleCombiner;
pub use inference::{Classifier, OnnxClassifier, PositiveClass};
pub use loader::ModelLoader;

use crate::config::ModelsConfig;
use crate::error::Result;
use crate::schema::{SVM_SCHEMA, XGB_SCHEMA};
use std::sync::Arc;

/// The two classifiers of the ensemble, shared read-only for the run.
#[derive(Clone)]
pub struct ModelPair {
    pub svm: Arc<dyn Classifier>,
    pub xgb: Arc<dyn Classifier>,
}

impl ModelPair {
    pub fn new(svm: Arc<dyn Classifier>, xgb: Arc<dyn Classifier>) -> Self {
        Self { svm, xgb }
    }

    /// Load both ONNX artifacts named in the configuration.
    pub fn load(config: &ModelsConfig) -> Result<Self> {
        let loader = ModelLoader::new(config.onnx_threads, config.positive_class_index);
        let svm = loader.load(&config.svm_path, &SVM_SCHEMA)?;
        let xgb = loader.load(&config.xgb_path, &XGB_SCHEMA)?;

        Ok(Self::new(Arc::new(svm), Arc::new(xgb)))
    }
}
