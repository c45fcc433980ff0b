//! Configuration management for the scoring pipeline

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default configuration location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cpu: CpuConfig,
    pub memory: MemoryConfig,
    pub performance: PerformanceConfig,
    pub models: ModelsConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
    pub io: IoConfig,
}

/// CPU limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub max_cores: usize,
    pub min_cores: usize,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            max_cores: 96,
            min_cores: 1,
        }
    }
}

/// Memory settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Rows scored per classifier call
    pub ml_batch_size: usize,
    /// Read/write buffer size in KiB
    pub io_buffer_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ml_batch_size: 10_000,
            io_buffer_size: 256,
        }
    }
}

/// Performance settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Score batches on several workers instead of one loop
    pub parallel_batches: bool,
}

/// Classifier artifacts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub svm_path: PathBuf,
    pub xgb_path: PathBuf,
    /// Number of threads for ONNX inference per model
    pub onnx_threads: usize,
    /// Probability column of the positive class for artifacts that declare none
    pub positive_class_index: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            svm_path: PathBuf::from("data/SVM.onnx"),
            xgb_path: PathBuf::from("data/XGB.onnx"),
            onnx_threads: 1,
            positive_class_index: 1,
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Inclusive threshold on the ensemble max for a positive call
    pub threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
    /// Log every batch at info level
    pub verbose_progress: bool,
    /// Write logs to `log_file` instead of stderr
    pub enable_logging: bool,
    pub log_file: PathBuf,
    /// Log stage timings and the metrics summary
    pub enable_timing: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            verbose_progress: true,
            enable_logging: false,
            log_file: PathBuf::from("rexprt.log"),
            enable_timing: true,
        }
    }
}

/// Input and output tables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input: PathBuf,
    /// All input columns plus the five score columns
    pub full_output: PathBuf,
    /// Identifying columns plus the five score columns
    pub scores_output: PathBuf,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("final_annotated.txt"),
            full_output: PathBuf::from("TRsAnnotated_RExPRTscoresDups.txt"),
            scores_output: PathBuf::from("RExPRT_scoresDups.txt"),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, layered with `REXPRT__*` environment variables.
    ///
    /// A missing file falls back to defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = Config::builder();

        if path.is_file() {
            builder = builder.add_source(File::from(path));
        } else {
            warn!(path = %path.display(), "Configuration file not found, using defaults");
        }

        let config = builder
            .add_source(
                Environment::with_prefix("REXPRT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.memory.ml_batch_size == 0 {
            bail!("memory.ml_batch_size must be at least 1");
        }
        if self.cpu.min_cores == 0 {
            bail!("cpu.min_cores must be at least 1");
        }
        if self.cpu.min_cores > self.cpu.max_cores {
            bail!(
                "cpu.min_cores ({}) exceeds cpu.max_cores ({})",
                self.cpu.min_cores,
                self.cpu.max_cores
            );
        }
        if !(0.0..=1.0).contains(&self.detection.threshold) {
            bail!(
                "detection.threshold must lie in [0, 1], got {}",
                self.detection.threshold
            );
        }
        if self.models.positive_class_index > 1 {
            bail!(
                "models.positive_class_index must be 0 or 1, got {}",
                self.models.positive_class_index
            );
        }
        Ok(())
    }

    /// Scoring workers: available cores clamped to the configured limits.
    pub fn workers(&self) -> usize {
        num_cpus::get().clamp(self.cpu.min_cores, self.cpu.max_cores.max(self.cpu.min_cores))
    }
}
