//! CSV price table adapter.
//!
//! One file per symbol, `{SYMBOL}.csv`. The first column is the timestamp,
//! every other column is numeric. `open`/`high`/`low`/`close` headers are
//! matched case-insensitively; indicator columns keep their header as-is.
//! Empty cells load as `NaN`.

use crate::domain::error::TraderError;
use crate::domain::price_table::{PRICE_COLUMNS, PriceTable, parse_timestamp};
use crate::ports::price_source::PriceSource;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn column_name(header: &str) -> String {
        let header = header.trim();
        PRICE_COLUMNS
            .iter()
            .find(|c| c.eq_ignore_ascii_case(header))
            .map(|c| c.to_string())
            .unwrap_or_else(|| header.to_string())
    }

    fn parse_cell(value: &str, column: &str, line: usize) -> Result<f64, TraderError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(f64::NAN);
        }
        value.parse().map_err(|e| TraderError::Data {
            reason: format!("invalid {} value '{}' on line {}: {}", column, value, line, e),
        })
    }
}

impl PriceSource for CsvAdapter {
    fn load_table(&self, symbol: &str) -> Result<PriceTable, TraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| TraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| TraderError::Data {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        if headers.len() < 2 {
            return Err(TraderError::Data {
                reason: format!("{} has no value columns", path.display()),
            });
        }
        let names: Vec<String> = headers.iter().skip(1).map(Self::column_name).collect();

        let mut rows: Vec<(chrono::NaiveDateTime, Vec<f64>)> = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| TraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let ts_str = record.get(0).ok_or_else(|| TraderError::Data {
                reason: format!("missing timestamp on line {}", line),
            })?;
            let ts = parse_timestamp(ts_str)?;

            let values = names
                .iter()
                .enumerate()
                .map(|(j, name)| Self::parse_cell(record.get(j + 1).unwrap_or(""), name, line))
                .collect::<Result<Vec<f64>, TraderError>>()?;
            rows.push((ts, values));
        }

        rows.sort_by_key(|(ts, _)| *ts);

        let timestamps = rows.iter().map(|(ts, _)| *ts).collect();
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(j, name)| (name, rows.iter().map(|(_, v)| v[j]).collect()))
            .collect();
        PriceTable::new(timestamps, columns)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
