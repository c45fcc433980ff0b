//! Result tables writer.
//!
//! Both outputs are staged in temporary files next to their destinations and
//! only renamed into place once both are complete.

use crate::error::{Result, ScoringError};
use crate::types::record::{RecordTable, DERIVED_COLUMNS, ID_COLUMNS};
use crate::types::scores::EnsembleResult;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Score columns of the reduced output, in order.
pub const REDUCED_SCORE_COLUMNS: [&str; 5] = ["SVM", "XGB", "ensembleScore", "ensembleBinary", "ensembleMax"];

/// Destinations of the two output tables.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    /// All input columns plus the score columns
    pub full: PathBuf,
    /// Identifying columns plus the score columns
    pub scores: PathBuf,
}

/// Writes scored tables as tab-separated text.
pub struct ResultWriter {
    buffer_capacity: usize,
}

impl ResultWriter {
    /// Create a writer with a buffer of `buffer_kib` KiB per output.
    pub fn new(buffer_kib: usize) -> Self {
        Self {
            buffer_capacity: buffer_kib.max(1) * 1024,
        }
    }

    /// Write both outputs.
    ///
    /// Both are fully staged before either is renamed into place, so a failure
    /// while writing leaves both destinations untouched. If renaming the
    /// reduced output fails, the full output has already replaced its
    /// destination.
    pub fn write(&self, table: &RecordTable, result: &EnsembleResult, paths: &OutputPaths) -> Result<()> {
        check_lengths(table, result)?;

        let full = self.stage(&paths.full, |w| write_full(w, table, result))?;
        let scores = self.stage(&paths.scores, |w| write_reduced(w, table, result))?;

        persist(full, &paths.full)?;
        persist(scores, &paths.scores)?;

        info!(
            full = %paths.full.display(),
            scores = %paths.scores.display(),
            records = table.len(),
            "Scored tables written"
        );
        Ok(())
    }

    /// Write one output into a temporary file in the destination's directory.
    fn stage<F>(&self, path: &Path, body: F) -> Result<NamedTempFile>
    where
        F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> io::Result<()>,
    {
        let io_err = |source: io::Error| ScoringError::IoWrite {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(io_err)?;

        let mut tmp = NamedTempFile::new_in(&parent).map_err(io_err)?;
        {
            let mut writer = BufWriter::with_capacity(self.buffer_capacity, &mut tmp);
            body(&mut writer).map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;

        Ok(tmp)
    }
}

impl Default for ResultWriter {
    fn default() -> Self {
        Self::new(256)
    }
}

fn check_lengths(table: &RecordTable, result: &EnsembleResult) -> Result<()> {
    if table.len() != result.len() {
        return Err(ScoringError::LengthMismatch {
            left: "record table",
            left_len: table.len(),
            right: "ensemble result",
            right_len: result.len(),
        });
    }
    Ok(())
}

fn persist(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| ScoringError::IoWrite {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Original header and rows followed by `SVM, XGB, ensembleScore, ensembleMax, ensembleBinary`.
pub fn write_full<W: Write>(out: &mut W, table: &RecordTable, result: &EnsembleResult) -> io::Result<()> {
    writeln!(out, "{}\t{}", table.header().join("\t"), DERIVED_COLUMNS.join("\t"))?;

    for idx in 0..table.len() {
        let (Some(line), Some(row)) = (table.line(idx), result.row(idx)) else {
            break;
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            line, row.svm, row.xgb, row.ensemble_score, row.ensemble_max, row.ensemble_binary
        )?;
    }
    Ok(())
}

/// Identifying columns followed by `SVM, XGB, ensembleScore, ensembleBinary, ensembleMax`.
pub fn write_reduced<W: Write>(out: &mut W, table: &RecordTable, result: &EnsembleResult) -> io::Result<()> {
    writeln!(out, "{}\t{}", ID_COLUMNS.join("\t"), REDUCED_SCORE_COLUMNS.join("\t"))?;

    for idx in 0..table.len() {
        let (Some(ids), Some(row)) = (table.id_fields(idx), result.row(idx)) else {
            break;
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            ids.join("\t"),
            row.svm,
            row.xgb,
            row.ensemble_score,
            row.ensemble_binary,
            row.ensemble_max
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&str]) -> RecordTable {
        let header = ID_COLUMNS
            .iter()
            .chain(["gerp"].iter())
            .map(|s| s.to_string())
            .collect();
        let mut table = RecordTable::new(header).unwrap();
        for row in rows {
            table.push_row(row.to_string()).unwrap();
        }
        table
    }

    fn result(svm: &[f64], xgb: &[f64]) -> EnsembleResult {
        let ensemble_max: Vec<f64> = svm.iter().zip(xgb).map(|(s, x)| s.max(*x)).collect();
        EnsembleResult {
            svm: svm.to_vec(),
            xgb: xgb.to_vec(),
            ensemble_score: svm.iter().zip(xgb).map(|(s, x)| s + x).collect(),
            ensemble_binary: ensemble_max.iter().map(|&m| u8::from(m >= 0.5)).collect(),
            ensemble_max,
        }
    }

    fn paths(dir: &Path) -> OutputPaths {
        OutputPaths {
            full: dir.join("TRsAnnotated_RExPRTscoresDups.txt"),
            scores: dir.join("RExPRT_scoresDups.txt"),
        }
    }

    #[test]
    fn test_full_layout() {
        let table = table(&["chr1\t10\t40\tCAG\tS1\tHTT\t1.5"]);
        let mut out = Vec::new();
        write_full(&mut out, &table, &result(&[0.25], &[0.5])).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "chr\tstart\tend\tmotif\tsampleID\tgene\tgerp\tSVM\tXGB\tensembleScore\tensembleMax\tensembleBinary"
        );
        assert_eq!(lines[1], "chr1\t10\t40\tCAG\tS1\tHTT\t1.5\t0.25\t0.5\t0.75\t0.5\t1");
    }

    #[test]
    fn test_reduced_layout() {
        let table = table(&[
            "chr1\t10\t40\tCAG\tS1\tHTT\t1.5",
            "chr1\t10\t40\tCAG\tS1\tHTT\t1.5",
        ]);
        let mut out = Vec::new();
        write_reduced(&mut out, &table, &result(&[0.25, 0.25], &[0.125, 0.125])).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "chr\tstart\tend\tmotif\tsampleID\tgene\tSVM\tXGB\tensembleScore\tensembleBinary\tensembleMax"
        );
        // duplicates pass through
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "chr1\t10\t40\tCAG\tS1\tHTT\t0.25\t0.125\t0.375\t0\t0.25");
        assert_eq!(lines[1], lines[2]);
    }

    #[test]
    fn test_identifying_columns_keep_input_text() {
        let table = table(&["chr1\t+100\t0130\tCAG\tS1\tHTT\t1.5"]);
        let result = result(&[0.25], &[0.125]);

        let mut full = Vec::new();
        write_full(&mut full, &table, &result).unwrap();
        let mut reduced = Vec::new();
        write_reduced(&mut reduced, &table, &result).unwrap();

        let full = String::from_utf8(full).unwrap();
        let reduced = String::from_utf8(reduced).unwrap();
        let full_row = full.lines().nth(1).unwrap();
        let reduced_row = reduced.lines().nth(1).unwrap();
        assert!(full_row.starts_with("chr1\t+100\t0130\tCAG\tS1\tHTT\t"));
        assert!(reduced_row.starts_with("chr1\t+100\t0130\tCAG\tS1\tHTT\t"));
    }

    #[test]
    fn test_empty_outputs_have_headers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());

        ResultWriter::default()
            .write(&table(&[]), &EnsembleResult::default(), &paths)
            .unwrap();

        let full = std::fs::read_to_string(&paths.full).unwrap();
        let scores = std::fs::read_to_string(&paths.scores).unwrap();
        assert_eq!(full.lines().count(), 1);
        assert_eq!(scores.lines().count(), 1);
        assert!(scores.starts_with("chr\tstart"));
    }

    #[test]
    fn test_length_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());

        let err = ResultWriter::default()
            .write(&table(&["chr1\t10\t40\tCAG\tS1\tHTT\t1.5"]), &EnsembleResult::default(), &paths)
            .unwrap_err();

        assert!(matches!(err, ScoringError::LengthMismatch { .. }));
        assert!(!paths.full.exists());
        assert!(!paths.scores.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_second_output_leaves_first_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let paths = OutputPaths {
            full: dir.path().join("full.txt"),
            // parent is a regular file, so staging fails
            scores: blocker.join("scores.txt"),
        };

        let err = ResultWriter::default()
            .write(&table(&[]), &EnsembleResult::default(), &paths)
            .unwrap_err();

        assert!(matches!(err, ScoringError::IoWrite { .. }));
        assert!(!paths.full.exists());
    }
}
