//! Time-indexed price table.
//!
//! A `PriceTable` is a columnar view of OHLC prices plus any number of
//! precomputed indicator columns, keyed by a strictly increasing timestamp
//! index. Boolean signal columns produced by the criteria evaluator live
//! alongside the numeric ones and are replaced, never duplicated.
//!
//! `NaN` marks "no value" in numeric columns (for example the warm-up rows of
//! a rolling statistic).

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::error::TraderError;
use crate::domain::ohlcv::OhlcvBar;

pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";

pub const PRICE_COLUMNS: [&str; 4] = [OPEN, HIGH, LOW, CLOSE];

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a timestamp in `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S` or plain
/// `%Y-%m-%d` (midnight) form.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, TraderError> {
    let value = value.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TraderError::Data {
            reason: format!("invalid timestamp '{}'", value),
        })
}

#[derive(Debug, Clone)]
pub struct PriceTable {
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<(String, Vec<f64>)>,
    signals: Vec<(String, Vec<bool>)>,
}

impl PriceTable {
    /// Build a table, checking that the index is strictly increasing, every
    /// column is aligned with it and the four price columns are present.
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, TraderError> {
        if let Some(pair) = timestamps.windows(2).find(|w| w[0] >= w[1]) {
            return Err(TraderError::InvalidTable {
                reason: format!(
                    "timestamps must be strictly increasing ({} followed by {})",
                    pair[0], pair[1]
                ),
            });
        }

        let mut table = Self {
            timestamps,
            columns: Vec::with_capacity(columns.len()),
            signals: Vec::new(),
        };

        for (name, values) in columns {
            if table.has_column(&name) {
                return Err(TraderError::InvalidTable {
                    reason: format!("duplicate column '{}'", name),
                });
            }
            table.insert_column(name, values)?;
        }

        for required in PRICE_COLUMNS {
            if !table.has_column(required) {
                return Err(TraderError::MissingColumn {
                    column: required.to_string(),
                });
            }
        }

        Ok(table)
    }

    pub fn from_bars(bars: &[OhlcvBar]) -> Result<Self, TraderError> {
        let timestamps = bars.iter().map(|b| b.timestamp).collect();
        let columns = vec![
            (OPEN.to_string(), bars.iter().map(|b| b.open).collect()),
            (HIGH.to_string(), bars.iter().map(|b| b.high).collect()),
            (LOW.to_string(), bars.iter().map(|b| b.low).collect()),
            (CLOSE.to_string(), bars.iter().map(|b| b.close).collect()),
        ];
        Self::new(timestamps, columns)
    }

    /// Builder form of [`insert_column`](Self::insert_column).
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self, TraderError> {
        self.insert_column(name.to_string(), values)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&[f64], TraderError> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| TraderError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Add a numeric column, replacing any existing column of the same name.
    pub fn insert_column(&mut self, name: String, values: Vec<f64>) -> Result<(), TraderError> {
        self.check_aligned(&name, values.len())?;
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = values,
            None => self.columns.push((name, values)),
        }
        Ok(())
    }

    pub fn signal(&self, name: &str) -> Option<&[bool]> {
        self.signals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|(name, _)| name.as_str())
    }

    /// Add a boolean signal column, replacing any existing one of the same name.
    pub fn set_signal(&mut self, name: String, values: Vec<bool>) -> Result<(), TraderError> {
        self.check_aligned(&name, values.len())?;
        match self.signals.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = values,
            None => self.signals.push((name, values)),
        }
        Ok(())
    }

    /// Row index of `ts`, if it is part of the index.
    pub fn position(&self, ts: NaiveDateTime) -> Option<usize> {
        self.timestamps.binary_search(&ts).ok()
    }

    /// Rows at or after `ts`.
    pub fn truncate_from(&self, ts: NaiveDateTime) -> PriceTable {
        let start = self.timestamps.partition_point(|t| *t < ts);
        self.slice(start, self.len())
    }

    /// Table without its first `n` rows.
    pub fn skip_rows(&self, n: usize) -> PriceTable {
        self.slice(n.min(self.len()), self.len())
    }

    /// Rows inside the inclusive `[start, end]` window; `None` leaves that side open.
    pub fn between(&self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> PriceTable {
        let lo = start.map_or(0, |s| self.timestamps.partition_point(|t| *t < s));
        let hi = end.map_or(self.len(), |e| self.timestamps.partition_point(|t| *t <= e));
        self.slice(lo, hi.max(lo))
    }

    pub fn bar(&self, index: usize) -> Option<OhlcvBar> {
        let timestamp = *self.timestamps.get(index)?;
        let value = |name: &str| self.column(name).ok().map(|c| c[index]);
        Some(OhlcvBar {
            timestamp,
            open: value(OPEN)?,
            high: value(HIGH)?,
            low: value(LOW)?,
            close: value(CLOSE)?,
        })
    }

    /// Price rows from `entry` through `exit`, both inclusive.
    pub fn bars_between(&self, entry: NaiveDateTime, exit: NaiveDateTime) -> Vec<OhlcvBar> {
        let lo = self.timestamps.partition_point(|t| *t < entry);
        let hi = self.timestamps.partition_point(|t| *t <= exit);
        (lo..hi.max(lo)).filter_map(|i| self.bar(i)).collect()
    }

    fn check_aligned(&self, name: &str, len: usize) -> Result<(), TraderError> {
        if len != self.len() {
            return Err(TraderError::InvalidTable {
                reason: format!(
                    "column '{}' has {} values, index has {} rows",
                    name,
                    len,
                    self.len()
                ),
            });
        }
        Ok(())
    }

    fn slice(&self, start: usize, end: usize) -> PriceTable {
        PriceTable {
            timestamps: self.timestamps[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(n, v)| (n.clone(), v[start..end].to_vec()))
                .collect(),
            signals: self
                .signals
                .iter()
                .map(|(n, v)| (n.clone(), v[start..end].to_vec()))
                .collect(),
        }
    }
}
