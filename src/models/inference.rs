//! Classifier abstraction and the ONNX Runtime implementation

use anyhow::{anyhow, bail, Context, Result};
use ndarray::ArrayView2;
use ort::memory::Allocator;
use ort::session::Session;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, trace};

/// A trained binary classifier used as an opaque scoring function.
///
/// Implementations must be safe to call from several threads at once; the
/// batch scorer may fan batches out across workers.
pub trait Classifier: Send + Sync {
    /// Short model name used in logs and errors.
    fn name(&self) -> &str;

    /// Probability of the positive class for every row of `batch`, in row order.
    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Vec<f64>>;
}

/// Where the positive-class probability came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositiveClass {
    /// Declared by the artifact's schema sidecar
    Declared(usize),
    /// Taken from configuration because the artifact declares nothing
    Configured(usize),
}

impl PositiveClass {
    pub fn index(&self) -> usize {
        match self {
            PositiveClass::Declared(idx) | PositiveClass::Configured(idx) => *idx,
        }
    }
}

/// Classifier backed by an ONNX Runtime session.
pub struct OnnxClassifier {
    name: String,
    path: PathBuf,
    /// `Session::run` needs exclusive access, so concurrent calls serialize here
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    positive_class: PositiveClass,
}

impl OnnxClassifier {
    pub(crate) fn new(
        name: &str,
        path: &Path,
        session: Session,
        input_name: String,
        output_name: String,
        positive_class: PositiveClass,
    ) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            session: Mutex::new(session),
            input_name,
            output_name,
            positive_class,
        }
    }

    /// Extract probabilities from `seq(map(int64, float))`, reading the
    /// positive class key.
    fn from_sequence_map(&self, output: &ort::value::DynValue, rows: usize) -> Result<Vec<f64>> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;
        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        if maps.len() != rows {
            bail!("expected {} probability maps, got {}", rows, maps.len());
        }

        let class_id = self.positive_class.index() as i64;
        maps.iter()
            .enumerate()
            .map(|(row, map)| {
                let kv_pairs = map.try_extract_key_values::<i64, f32>()?;
                class_probability(&kv_pairs, class_id, row)
            })
            .collect()
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Vec<f64>> {
        let rows = batch.nrows();
        let shape = vec![rows as i64, batch.ncols() as i64];
        let features: Vec<f32> = batch.iter().copied().collect();
        let input_tensor =
            Tensor::from_array((shape, features)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| anyhow!("model output '{}' missing", self.output_name))?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            trace!(model = %self.name, dims = ?dims, "Extracting from tensor");
            return positive_probabilities(&dims, data, rows, self.positive_class.index());
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            debug!(model = %self.name, rows = rows, "Extracting from seq(map)");
            return self.from_sequence_map(output, rows);
        }

        bail!(
            "output '{}' of {} is neither a probability tensor nor a probability map",
            self.output_name,
            self.path.display()
        )
    }
}

/// Positive-class column of a `[rows, 2]` probability tensor.
fn positive_probabilities(dims: &[i64], data: &[f32], rows: usize, index: usize) -> Result<Vec<f64>> {
    if dims.len() != 2 || dims[0] != rows as i64 || dims[1] != 2 {
        bail!(
            "expected probability tensor of shape [{}, 2], got {:?}",
            rows,
            dims
        );
    }
    if index > 1 {
        bail!("positive class index {} is outside a two-class output", index);
    }

    Ok(data.chunks_exact(2).map(|pair| pair[index] as f64).collect())
}

/// Probability stored under `class_id` in one row's class map.
fn class_probability(kv_pairs: &[(i64, f32)], class_id: i64, row: usize) -> Result<f64> {
    kv_pairs
        .iter()
        .find(|(key, _)| *key == class_id)
        .map(|(_, prob)| *prob as f64)
        .ok_or_else(|| anyhow!("row {}: probability map has no entry for class {}", row, class_id))
}
