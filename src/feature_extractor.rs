//! Feature view construction for classifier inference.
//!
//! Projects the record table onto the fixed column order each classifier was
//! trained on. Column presence is checked for a schema before any value is
//! parsed, so a missing column surfaces before scoring work starts.

use crate::error::{Result, ScoringError};
use crate::schema::FeatureSchema;
use crate::types::record::RecordTable;
use ndarray::{s, Array2, ArrayView2};
use std::ops::Range;
use tracing::debug;

/// Markers read as missing values (NaN) rather than rejected.
const MISSING_MARKERS: [&str; 6] = ["", "NA", "NaN", "nan", "N/A", "null"];

/// Row-major `f32` feature matrix in a schema's column order.
#[derive(Debug, Clone)]
pub struct FeatureView {
    schema: FeatureSchema,
    data: Array2<f32>,
}

impl FeatureView {
    pub fn new(schema: FeatureSchema, data: Array2<f32>) -> Self {
        Self { schema, data }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Sub-matrix for a half-open row range.
    pub fn rows(&self, range: Range<usize>) -> ArrayView2<'_, f32> {
        self.data.slice(s![range, ..])
    }

    pub fn as_array(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }
}

/// Builds [`FeatureView`]s from a record table.
pub struct FeatureViewBuilder;

impl FeatureViewBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the table position of every schema column, in schema order.
    pub fn check_columns(&self, table: &RecordTable, schema: &FeatureSchema) -> Result<Vec<usize>> {
        schema
            .columns
            .iter()
            .map(|&column| {
                table
                    .column_index(column)
                    .ok_or_else(|| ScoringError::MissingColumn {
                        column: column.to_string(),
                    })
            })
            .collect()
    }

    /// Extract the feature matrix for `schema`.
    pub fn build(&self, table: &RecordTable, schema: &FeatureSchema) -> Result<FeatureView> {
        let indices = self.check_columns(table, schema)?;
        let mut data = Array2::<f32>::zeros((table.len(), schema.width()));

        for (row_idx, (fields, mut out)) in table.rows().zip(data.rows_mut()).enumerate() {
            for ((&col_idx, &column), slot) in indices.iter().zip(schema.columns).zip(out.iter_mut()) {
                let raw = fields[col_idx];
                *slot = parse_feature(raw).ok_or_else(|| ScoringError::InvalidFeatureType {
                    column: column.to_string(),
                    row: row_idx,
                    value: raw.to_string(),
                })?;
            }
        }

        debug!(schema = %schema, rows = table.len(), "Feature view built");
        Ok(FeatureView::new(*schema, data))
    }
}

impl Default for FeatureViewBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_feature(raw: &str) -> Option<f32> {
    let value = raw.trim();
    if MISSING_MARKERS.contains(&value) {
        return Some(f32::NAN);
    }
    value.parse::<f32>().ok()
}
