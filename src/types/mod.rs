//! Type definitions for the scoring pipeline

pub mod record;
pub mod scores;

pub use record::{RecordTable, TandemRepeatRecord, DERIVED_COLUMNS, ID_COLUMNS};
pub use scores::{EnsembleResult, EnsembleRow, EnsembleSummary, ScoreVector};
