//! Tab-separated record table reader

use crate::error::{Result, ScoringError};
use crate::types::record::RecordTable;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Reader for annotated tandem-repeat tables.
pub struct TableReader {
    /// Read buffer capacity in bytes
    buffer_capacity: usize,
}

impl TableReader {
    /// Create a reader with a buffer of `buffer_kib` KiB.
    pub fn new(buffer_kib: usize) -> Self {
        Self {
            buffer_capacity: buffer_kib.max(1) * 1024,
        }
    }

    /// Read a table from disk.
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> Result<RecordTable> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ScoringError::IoRead {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Loading tandem repeat table");
        let table = self.read(file, path)?;
        info!(records = table.len(), columns = table.header().len(), "Loaded {} tandem repeats", table.len());

        Ok(table)
    }

    /// Read a table from any byte source; `path` is only used for error context.
    pub fn read<R: Read>(&self, source: R, path: &Path) -> Result<RecordTable> {
        let reader = BufReader::with_capacity(self.buffer_capacity, source);
        let mut lines = reader.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line.map_err(|source| ScoringError::IoRead {
                        path: path.to_path_buf(),
                        source,
                    })?;
                    let line = trim_line_end(&line);
                    if !line.is_empty() {
                        break line.split('\t').map(str::to_string).collect::<Vec<_>>();
                    }
                }
                None => {
                    return Err(ScoringError::MalformedTable {
                        path: path.to_path_buf(),
                        line: 1,
                        reason: "missing header row".to_string(),
                    })
                }
            }
        };

        let mut table = RecordTable::new(header)?;

        for (idx, line) in lines {
            let mut line = line.map_err(|source| ScoringError::IoRead {
                path: path.to_path_buf(),
                source,
            })?;
            let trimmed_len = trim_line_end(&line).len();
            line.truncate(trimmed_len);
            if line.is_empty() {
                continue;
            }

            table
                .push_row(line)
                .map_err(|reason| ScoringError::MalformedTable {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason,
                })?;
        }

        debug!(path = %path.display(), rows = table.len(), "Table parsed");
        Ok(table)
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new(256)
    }
}

fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
