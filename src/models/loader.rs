//! ONNX model loader

use crate::error::{Result, ScoringError};
use crate::models::inference::{OnnxClassifier, PositiveClass};
use crate::schema::{DeclaredSchema, FeatureSchema};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Loader for classifier artifacts exported to ONNX
pub struct ModelLoader {
    /// Number of intra-op threads per ONNX session
    onnx_threads: usize,
    /// Positive-class column used when an artifact declares none
    positive_class_index: usize,
}

impl ModelLoader {
    pub fn new(onnx_threads: usize, positive_class_index: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
            positive_class_index,
        }
    }

    /// Location of the schema sidecar for an artifact: `<artifact>.schema.json`.
    pub fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(".schema.json");
        PathBuf::from(name)
    }

    /// Read and check an artifact's schema sidecar, if one exists.
    pub fn read_sidecar(&self, path: &Path, schema: &FeatureSchema) -> Result<Option<DeclaredSchema>> {
        let sidecar = Self::sidecar_path(path);
        if !sidecar.is_file() {
            return Ok(None);
        }

        let corrupt = |reason: String| ScoringError::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::fs::read_to_string(&sidecar)
            .map_err(|e| corrupt(format!("cannot read schema sidecar {}: {}", sidecar.display(), e)))?;
        let declared: DeclaredSchema = serde_json::from_str(&text)
            .map_err(|e| corrupt(format!("invalid schema sidecar {}: {}", sidecar.display(), e)))?;

        schema.check(&declared).map_err(corrupt)?;
        if let Some(idx) = declared.positive_class_index {
            if idx > 1 {
                return Err(corrupt(format!(
                    "schema sidecar declares positive class index {} for a binary classifier",
                    idx
                )));
            }
        }

        Ok(Some(declared))
    }

    /// Load a classifier artifact for `schema`.
    pub fn load<P: AsRef<Path>>(&self, path: P, schema: &FeatureSchema) -> Result<OnnxClassifier> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ScoringError::ArtifactNotFound {
                path: path.to_path_buf(),
            });
        }

        let declared = self.read_sidecar(path, schema)?;
        let positive_class = match declared.as_ref().and_then(|d| d.positive_class_index) {
            Some(idx) => PositiveClass::Declared(idx),
            None => {
                warn!(
                    model = %schema.name,
                    path = %path.display(),
                    positive_class_index = self.positive_class_index,
                    "Artifact does not declare its positive class; using configured index"
                );
                PositiveClass::Configured(self.positive_class_index)
            }
        };

        info!(model = %schema.name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = self
            .open_session(path)
            .map_err(|e| ScoringError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| ScoringError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: "model graph has no inputs".to_string(),
            })?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let output_name = probability_output(&output_names).ok_or_else(|| {
            ScoringError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: format!("no probability output among {:?}", output_names),
            }
        })?;

        info!(
            model = %schema.name,
            input = %input_name,
            output = %output_name,
            positive_class = ?positive_class,
            "Model loaded successfully"
        );

        Ok(OnnxClassifier::new(
            schema.name,
            path,
            session,
            input_name,
            output_name,
            positive_class,
        ))
    }

    fn open_session(&self, path: &Path) -> anyhow::Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)?;
        Ok(session)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self {
            onnx_threads: 1,
            positive_class_index: 1,
        }
    }
}

/// Pick the probability output of a classifier graph.
///
/// Converted scikit-learn and XGBoost classifiers expose a label output
/// followed by a probability output.
fn probability_output(names: &[String]) -> Option<String> {
    if let Some(name) = names.iter().find(|n| n.contains("prob")) {
        return Some(name.clone());
    }
    match names {
        [only] => Some(only.clone()),
        [first, second] if first.contains("label") => Some(second.clone()),
        _ => None,
    }
}
