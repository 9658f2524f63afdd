//! Observable table ingest.
//!
//! This module turns the simulator's per-size text files into `ObservableTable`s.
//!
//! Design goals:
//! - **Strict schema**: every non-empty line is exactly 5 numeric fields
//! - **Line-level errors**: a bad row fails that file with its 1-based line number
//! - **Order preserving**: rows come back exactly as read (no sort, no dedup)
//! - **Per-size isolation**: in a batch, one bad file never stops the others

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::domain::{ObservableTable, SizeKey, TABLE_COLUMNS};
use crate::error::DataError;

/// A per-size failure recorded during a batch load.
#[derive(Debug)]
pub struct LoadFailure {
    pub size: SizeKey,
    pub error: DataError,
}

/// Batch output: the tables that loaded plus the sizes that did not.
#[derive(Debug, Default)]
pub struct BatchLoad {
    pub tables: BTreeMap<SizeKey, ObservableTable>,
    pub failures: Vec<LoadFailure>,
}

/// Load one whitespace-delimited observable file.
///
/// The file handle lives only for the duration of this call.
pub fn load_table(path: &Path) -> Result<ObservableTable, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_table(BufReader::new(file), path)?;
    log::debug!("loaded {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// Parse a table from any buffered reader. `path` is only used for error context.
pub fn read_table<R: BufRead>(reader: R, path: &Path) -> Result<ObservableTable, DataError> {
    let mut rows = Vec::new();

    for (idx, bytes) in reader.split(b'\n').enumerate() {
        let line_no = idx + 1;
        let bytes = bytes.map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line = std::str::from_utf8(&bytes).map_err(|_| DataError::MalformedRow {
            path: path.to_path_buf(),
            line: line_no,
            reason: "invalid UTF-8".to_string(),
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let row = parse_row(line).map_err(|reason| DataError::MalformedRow {
            path: path.to_path_buf(),
            line: line_no,
            reason,
        })?;
        rows.push(row);
    }

    Ok(ObservableTable::from_rows(rows))
}

fn parse_row(line: &str) -> Result<[f64; TABLE_COLUMNS], String> {
    let mut row = [0.0; TABLE_COLUMNS];
    let mut count = 0usize;

    for token in line.split_whitespace() {
        if count < TABLE_COLUMNS {
            row[count] = token
                .parse::<f64>()
                .map_err(|_| format!("non-numeric token '{token}' in column {}", count + 1))?;
        }
        count += 1;
    }

    if count != TABLE_COLUMNS {
        return Err(format!("expected {TABLE_COLUMNS} fields, found {count}"));
    }
    Ok(row)
}

/// File name used by the simulator driver for a given size.
pub fn size_file_name(size: SizeKey) -> String {
    format!("test_L{}.txt", size.0)
}

/// Parse the size out of a `test_L<size>.txt` file name.
///
/// Leading zeros are rejected so that two files can never map to the same size.
pub fn size_from_file_name(path: &Path) -> Option<SizeKey> {
    let name = path.file_name()?.to_str()?;
    let digits = name.strip_prefix("test_L")?.strip_suffix(".txt")?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().map(SizeKey)
}

/// List the `test_L<size>.txt` files in `dir`, keyed by size.
pub fn discover_size_files(dir: &Path) -> Result<BTreeMap<SizeKey, PathBuf>, DataError> {
    let io_err = |source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut out = BTreeMap::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(size) = size_from_file_name(&path) {
            out.insert(size, path);
        }
    }
    Ok(out)
}

/// Load every size independently (in parallel).
pub fn load_tables(files: &BTreeMap<SizeKey, PathBuf>) -> BatchLoad {
    let results: Vec<(SizeKey, Result<ObservableTable, DataError>)> = files
        .par_iter()
        .map(|(&size, path)| (size, load_table(path)))
        .collect();

    let mut batch = BatchLoad::default();
    for (size, result) in results {
        match result {
            Ok(table) => {
                batch.tables.insert(size, table);
            }
            Err(error) => {
                log::warn!("L={size}: {error}");
                batch.failures.push(LoadFailure { size, error });
            }
        }
    }
    batch
}
