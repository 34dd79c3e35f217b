//! Tab-delimited benchmark log reader.
//!
//! Splits each non-empty line into fields. Fields are kept as text; the
//! stride indexer decides what each position means.

use std::path::{Path, PathBuf};

use crate::error::{ReportError, Result};

/// One tab-split line of a log.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Fields in column order.
    pub fields: Vec<String>,
}

impl RawRow {
    /// Field at `column`, if the row is long enough.
    pub fn field(&self, column: usize) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// All rows of one log file, in file order.
#[derive(Debug, Clone)]
pub struct LogRows {
    /// Path the rows were read from.
    pub path: PathBuf,
    /// Non-empty rows.
    pub rows: Vec<RawRow>,
}

/// Read `path` into rows, skipping blank lines.
pub fn read_log(path: &Path) -> Result<LogRows> {
    let text =
        std::fs::read_to_string(path).map_err(|e| ReportError::io("reading", path, e))?;
    Ok(parse_rows(path, &text))
}

/// Split log `text` into rows. `path` is recorded for diagnostics only.
pub fn parse_rows(path: &Path, text: &str) -> LogRows {
    let rows = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| RawRow {
            line: idx + 1,
            fields: line
                .trim_end_matches('\r')
                .split('\t')
                .map(str::to_string)
                .collect(),
        })
        .collect();

    LogRows {
        path: path.to_path_buf(),
        rows,
    }
}
