//! Tandem-repeat record table

use crate::error::{Result, ScoringError};
use std::collections::HashMap;

/// Identifying columns every record table must carry, in output order.
pub const ID_COLUMNS: [&str; 6] = ["chr", "start", "end", "motif", "sampleID", "gene"];

/// Columns appended by the scorer. An input carrying any of these is rejected.
pub const DERIVED_COLUMNS: [&str; 5] = ["SVM", "XGB", "ensembleScore", "ensembleMax", "ensembleBinary"];

/// One row of the record table, borrowed from its original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TandemRepeatRecord<'a> {
    pub chr: &'a str,
    pub start: u64,
    pub end: u64,
    pub motif: &'a str,
    pub sample_id: &'a str,
    pub gene: &'a str,
}

/// In-memory table of annotated tandem repeats.
///
/// Rows keep their original tab-separated text so pass-through columns are
/// emitted unchanged. Coordinates are parsed once on insertion.
#[derive(Debug, Clone)]
pub struct RecordTable {
    header: Vec<String>,
    columns: HashMap<String, usize>,
    id_index: [usize; 6],
    rows: Vec<String>,
    coords: Vec<(u64, u64)>,
}

impl RecordTable {
    /// Create an empty table from a header, validating required and reserved columns.
    pub fn new(header: Vec<String>) -> Result<Self> {
        let mut columns = HashMap::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            if DERIVED_COLUMNS.contains(&name.as_str()) {
                return Err(ScoringError::ReservedColumn(name.clone()));
            }
            if columns.insert(name.clone(), idx).is_some() {
                return Err(ScoringError::DuplicateColumn(name.clone()));
            }
        }

        let mut id_index = [0; 6];
        for (slot, name) in id_index.iter_mut().zip(ID_COLUMNS) {
            *slot = *columns
                .get(name)
                .ok_or_else(|| ScoringError::MissingColumn {
                    column: name.to_string(),
                })?;
        }

        Ok(Self {
            header,
            columns,
            id_index,
            rows: Vec::new(),
            coords: Vec::new(),
        })
    }

    /// Append a raw tab-separated row.
    ///
    /// Returns a human-readable reason when the row is ragged or its
    /// coordinates are not unsigned integers; the caller adds file context.
    pub fn push_row(&mut self, line: String) -> std::result::Result<(), String> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != self.header.len() {
            return Err(format!(
                "expected {} fields, found {}",
                self.header.len(),
                fields.len()
            ));
        }

        let start = parse_coordinate(fields[self.id_index[1]], "start")?;
        let end = parse_coordinate(fields[self.id_index[2]], "end")?;

        self.coords.push((start, end));
        self.rows.push(line);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Position of a column in the header, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Original text of row `idx`.
    pub fn line(&self, idx: usize) -> Option<&str> {
        self.rows.get(idx).map(String::as_str)
    }

    /// Iterate over rows as split fields, in table order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows.iter().map(|line| line.split('\t').collect())
    }

    /// Text of the identifying columns of row `idx`, in `ID_COLUMNS` order.
    pub fn id_fields(&self, idx: usize) -> Option<[&str; 6]> {
        let line = self.rows.get(idx)?;
        let fields: Vec<&str> = line.split('\t').collect();
        Some(self.id_index.map(|i| fields[i]))
    }

    /// Identifying view of row `idx`.
    pub fn record(&self, idx: usize) -> Option<TandemRepeatRecord<'_>> {
        let [chr, _, _, motif, sample_id, gene] = self.id_fields(idx)?;
        let (start, end) = self.coords[idx];

        Some(TandemRepeatRecord {
            chr,
            start,
            end,
            motif,
            sample_id,
            gene,
        })
    }
}

fn parse_coordinate(value: &str, name: &str) -> std::result::Result<u64, String> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("{} coordinate '{}' is not an unsigned integer", name, value))
}
