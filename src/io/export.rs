//! Export aggregated series and tables.
//!
//! - long-format CSV of every size's observables (easy to consume in
//!   spreadsheets or downstream scripts)
//! - simulator-format text tables (used by the synthetic data generator)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data::Aggregate;
use crate::domain::{Observable, ObservableTable};
use crate::error::AppError;

/// Write all series as CSV, one row per (size, sweep row).
///
/// Header: `size,row,temperature,magnetization,energy,heat_capacity,susceptibility`.
pub fn write_series_csv(path: &Path, aggregate: &Aggregate) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec!["size", "row", "temperature"];
    header.extend(Observable::ALL.iter().map(|o| o.file_stem()));
    wtr.write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for size in aggregate.sizes() {
        let temps = aggregate.temperatures(size).unwrap_or(&[]);
        for (row, &t) in temps.iter().enumerate() {
            let mut record = vec![size.to_string(), row.to_string(), format!("{t}")];
            for obs in Observable::ALL {
                let v = aggregate
                    .values(obs, size)
                    .and_then(|vals| vals.get(row))
                    .map(|v| format!("{v}"))
                    .unwrap_or_default();
                record.push(v);
            }
            wtr.write_record(&record)
                .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
        }
    }

    wtr.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write a table in the simulator's layout: `T\tM\tE\tC\tChi\t` per row.
pub fn write_table(path: &Path, table: &ObservableTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create table '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    for row in table.rows() {
        for v in row {
            write!(out, "{v}\t").map_err(|e| AppError::new(2, format!("Failed to write table row: {e}")))?;
        }
        writeln!(out).map_err(|e| AppError::new(2, format!("Failed to write table row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush table '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::data::aggregate;
    use crate::domain::SizeKey;
    use crate::io::ingest::load_table;

    #[test]
    fn series_csv_is_long_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = BTreeMap::new();
        tables.insert(
            SizeKey(4),
            ObservableTable::from_rows(vec![[2.5, 0.5, -1.0, 0.25, 0.125], [2.0, 0.75, -1.5, 0.5, 0.25]]),
        );
        tables.insert(SizeKey(8), ObservableTable::from_rows(vec![[1.0, 1.0, -2.0, 0.0, 0.0]]));
        let agg = aggregate(&tables).unwrap();

        let path = dir.path().join("series.csv");
        write_series_csv(&path, &agg).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "size,row,temperature,magnetization,energy,heat_capacity,susceptibility"
        );
        assert_eq!(lines[1], "4,0,2.5,0.5,-1,0.25,0.125");
        assert_eq!(lines[3], "8,0,1,1,-2,0,0");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn written_table_loads_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_L4.txt");
        let table = ObservableTable::from_rows(vec![[5.0, 0.01, -0.2, 0.1, 0.02], [4.9, 0.02, -0.25, 0.11, 0.03]]);

        write_table(&path, &table).unwrap();
        assert_eq!(load_table(&path).unwrap(), table);
    }
}
